//! Cluster Hub - multi-node coordination and real-time client fan-out
//!
//! Nodes of one application share a PostgreSQL database. Through it they
//! register themselves, elect a single master for cluster-wide scheduled
//! work, and exchange durable node events (configuration, schema and login
//! changes). Each node applies those events locally and pushes the
//! resulting notifications to its WebSocket clients.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
