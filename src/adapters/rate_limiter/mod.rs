//! Rate limiter adapters.
//!
//! Implementations of the LoginRateLimiter port.
//!
//! ## Available Adapters
//!
//! - `InMemoryLoginRateLimiter` - Per-process fixed-window counters
//!
//! Counters are process-local on purpose: a host hammering one node is
//! locked out on that node, and the limits themselves come from instance
//! settings so every node applies the same budget.

mod in_memory;

pub use in_memory::InMemoryLoginRateLimiter;
