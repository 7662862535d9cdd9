use crate::comm::Rank;

#[derive(Debug, thiserror::Error)]
pub enum LifeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("board file error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("could not decode {what} from rank {rank}: {reason}")]
    Decode {
        what: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("protocol violation from rank {rank}: {reason}")]
    Protocol { rank: Rank, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, LifeError>;
