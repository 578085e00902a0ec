//! Cluster coordination configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Largest accepted channel/queue capacity.
const MAX_CAPACITY: usize = 65_536;

/// Heartbeat, election, mailbox polling and client fan-out settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// YAML file holding this node's persistent id
    #[serde(default = "default_node_file")]
    pub node_file: PathBuf,

    /// Seconds between node check-ins (and election checks)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Seconds between mailbox polls
    #[serde(default = "default_event_poll_interval")]
    pub event_poll_interval_secs: u64,

    /// Seconds without a master check-in after which the master is presumed dead
    #[serde(default = "default_master_missing_after")]
    pub master_missing_after_secs: u64,

    /// Per-client outbound queue length; pushes beyond it are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Capacity of each of the hub's inbound channels
    #[serde(default = "default_hub_channel_capacity")]
    pub hub_channel_capacity: usize,
}

impl ClusterConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_secs(self.event_poll_interval_secs)
    }

    /// Master threshold in the signed form the election compares with.
    pub fn master_missing_after(&self) -> i64 {
        i64::try_from(self.master_missing_after_secs).unwrap_or(i64::MAX)
    }

    /// Validate cluster configuration
    ///
    /// The master threshold must cover at least three heartbeats so that a
    /// single late check-in never triggers an election.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::ZeroInterval("heartbeat_interval_secs"));
        }
        if self.event_poll_interval_secs == 0 {
            return Err(ValidationError::ZeroInterval("event_poll_interval_secs"));
        }
        if self.master_missing_after_secs < self.heartbeat_interval_secs.saturating_mul(3) {
            return Err(ValidationError::MasterThresholdTooShort {
                missing_after: self.master_missing_after_secs,
                heartbeat: self.heartbeat_interval_secs,
            });
        }
        if i32::try_from(self.master_missing_after_secs).is_err() {
            return Err(ValidationError::OutOfRange {
                field: "master_missing_after_secs",
                value: self.master_missing_after_secs,
                max: i32::MAX as u64,
            });
        }
        if !(1..=MAX_CAPACITY).contains(&self.outbound_queue_capacity) {
            return Err(ValidationError::InvalidCapacity("outbound_queue_capacity"));
        }
        if !(1..=MAX_CAPACITY).contains(&self.hub_channel_capacity) {
            return Err(ValidationError::InvalidCapacity("hub_channel_capacity"));
        }
        if self.node_file.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("CLUSTER__NODE_FILE"));
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_file: default_node_file(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            event_poll_interval_secs: default_event_poll_interval(),
            master_missing_after_secs: default_master_missing_after(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            hub_channel_capacity: default_hub_channel_capacity(),
        }
    }
}

fn default_node_file() -> PathBuf {
    PathBuf::from("data/node.yaml")
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_event_poll_interval() -> u64 {
    5
}

fn default_master_missing_after() -> u64 {
    180
}

fn default_outbound_queue_capacity() -> usize {
    64
}

fn default_hub_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_config_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.heartbeat_interval_secs, 60);
        assert_eq!(config.event_poll_interval_secs, 5);
        assert_eq!(config.master_missing_after_secs, 180);
        assert_eq!(config.outbound_queue_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations() {
        let config = ClusterConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(60));
        assert_eq!(config.event_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.master_missing_after(), 180);
    }

    #[test]
    fn test_threshold_shorter_than_three_heartbeats_is_rejected() {
        let config = ClusterConfig {
            heartbeat_interval_secs: 60,
            master_missing_after_secs: 179,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MasterThresholdTooShort { .. })
        ));
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let config = ClusterConfig {
            event_poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = ClusterConfig {
            outbound_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidCapacity(_))));
    }

    #[test]
    fn test_threshold_beyond_i32_is_out_of_range() {
        let config = ClusterConfig {
            master_missing_after_secs: u64::from(u32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange {
                field: "master_missing_after_secs",
                ..
            })
        ));
    }
}
