use thiserror::Error;

/// Errors surfaced by table construction and by the page pool.
///
/// Contract violations inside a [`Buckets`](crate::hash_table::Buckets)
/// implementation are not represented here; those trip `debug_assert!`s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor or config parameter is out of range.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// The pool could not hand out the requested pages.
    ///
    /// A table that hits this during growth must not be used afterwards.
    #[error("cannot allocate {requested} pages: {in_use} in use, limit {limit}")]
    AllocationFailure {
        /// Pages asked for by this request.
        requested: usize,
        /// Pages outstanding when the request was refused.
        in_use: usize,
        /// Pool budget. Both this and `requested` are `usize::MAX` when the
        /// size computation itself overflowed.
        limit: usize,
    },
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow() -> Self {
        Error::AllocationFailure {
            requested: usize::MAX,
            in_use: 0,
            limit: usize::MAX,
        }
    }
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
