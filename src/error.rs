use std::io;
use thiserror::Error;

/// Recoverable setup failures.
///
/// Dispatch itself never fails: invariant violations (bad handler or sender
/// ids, todo-list overflow) panic, and budget exhaustion is ordinary control
/// flow.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid value `{value}` for {key}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("message manager is already attached to a background-work scheduler")]
    AlreadyRegistered,

    #[error("message manager has been shut down")]
    ShutDown,
}
