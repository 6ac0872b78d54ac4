use thiserror::Error;

use crate::models::Source;

/// Errors raised by the unification core.
///
/// Only `EmptyCluster` is an internal invariant breach. The others describe
/// bad input and are absorbed per record by the unifier.
#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("malformed {origin} record {record}: {reason}")]
    MalformedRecord {
        origin: Source,
        record: String,
        reason: &'static str,
    },

    #[error("merge resolver called with an empty cluster")]
    EmptyCluster,

    #[error("unparseable duration: {0:?}")]
    UnparseableDuration(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, UnifyError>;
