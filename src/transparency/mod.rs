//! Transparency reporting for the trigram sensor.
//!
//! Exposes session counters so a user can always see what was captured,
//! filtered, and persisted.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
