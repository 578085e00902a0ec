//! Domain layer - cluster vocabulary with no infrastructure dependencies.

pub mod cluster;
pub mod foundation;
