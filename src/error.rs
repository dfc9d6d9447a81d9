use thiserror::Error;

use crate::partition::Partition;

/// Error returned by a [`crate::consumer::LogConsumer`] operation.
///
/// `Timeout` is retryable: the reader absorbs it and tries again on the next
/// `restore` call. `Fatal` is not: it propagates straight out of the reader.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("log consumer timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ConsumerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConsumerError::Timeout(_))
    }
}

/// Error surfaced by [`crate::reader::ChangelogReader::restore`].
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("log consumer failure: {0}")]
    Consumer(#[from] ConsumerError),

    /// A structural invariant was violated: a non-empty subscription at
    /// initialize time, or `restored_offset` overshooting `end_offset + 1`.
    /// Not retryable.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The store sink rejected a record. Fatal to the owning partition.
    #[error("store sink failed for partition {partition}: {source}")]
    Sink {
        partition: Partition,
        #[source]
        source: anyhow::Error,
    },
}
