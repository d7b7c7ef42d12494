use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by registry operations.
///
/// Conversion itself never fails: a converter that cannot parse its input
/// returns `None` and the registry moves on to the next candidate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("converter type name cannot be empty")]
    InvalidName,
    #[error("no converter for type \"{name}\"")]
    NotFound { name: String },
}
