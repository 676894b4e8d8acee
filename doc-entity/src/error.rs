use crate::key::Key;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A write or query was issued before a kind was configured.
    #[error("no kind specified for {0}")]
    MissingKind(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The store rejected a mutation that contradicts its current state,
    /// such as an insert over an existing key. Never retried here.
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("identifier already bound on key {0}")]
    AlreadyBound(Key),
    /// Transport failures and malformed store responses.
    #[error("store error: {0}")]
    Store(String),
}
