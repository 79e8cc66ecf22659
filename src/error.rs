use miette::Diagnostic;

/// Result type alias using [`ContourError`]
pub type Result<T> = std::result::Result<T, ContourError>;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Failures at the boundaries of the crate: exchange between ranks and archive I/O
///
/// Violated preconditions on the slices themselves are programmer errors and panic instead.
pub enum ContourError {
    /// A peer hung up before the exchange completed
    #[error("rank {rank} is no longer reachable")]
    #[diagnostic(code(keldysh::exchange::disconnected))]
    Disconnected {
        /// The unreachable rank
        rank: usize,
    },
    /// A received buffer does not fit the receiving slice
    #[error("received {found} entries, the slice holds {expected}")]
    #[diagnostic(code(keldysh::exchange::payload_length))]
    PayloadLength {
        /// The length of the receiving buffer
        expected: usize,
        /// The length of the received buffer
        found: usize,
    },
    /// A rank outside the group was addressed
    #[error("rank {rank} is outside a group of {size}")]
    #[diagnostic(code(keldysh::exchange::rank))]
    Rank {
        /// The addressed rank
        rank: usize,
        /// The number of ranks in the group
        size: usize,
    },
    /// Reading or writing an archive failed
    #[error("IO Failure: {0}")]
    #[diagnostic(code(keldysh::io_error))]
    Io(#[from] std::io::Error),
    /// An archive could not be encoded or decoded
    #[error(transparent)]
    #[diagnostic(code(keldysh::persist::encoding))]
    Encode(#[from] postcard::Error),
    /// The file does not start with the archive header
    #[error("not a time slice archive: {0}")]
    #[diagnostic(code(keldysh::persist::format))]
    Format(String),
    /// The archive holds no group of the requested name
    #[error("the archive holds no group named {0:?}")]
    #[diagnostic(code(keldysh::persist::missing_group))]
    MissingGroup(String),
    /// A stored record is inconsistent with its own header
    #[error("record for tstp {tstp} is malformed: {reason}")]
    #[diagnostic(code(keldysh::persist::malformed))]
    MalformedRecord {
        /// The outer time of the record
        tstp: isize,
        /// What is inconsistent
        reason: String,
    },
}
