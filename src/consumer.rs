use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::error::ConsumerError;
use crate::partition::Partition;

/// A single record returned by [`LogConsumer::poll`].
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    pub partition: Partition,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

/// Metadata about a topic known to the cluster: the partition indices it has.
pub type TopicMetadata = HashMap<String, Vec<i32>>;

/// The contract [`crate::reader::ChangelogReader`] depends on. Kept deliberately
/// small and flat per-operation rather than mirroring the underlying broker
/// client's full surface area.
///
/// Implementations must never hold a topic-pattern subscription: the reader
/// only ever manages explicit assignments, and a non-empty `subscription()`
/// at initialize time is a programmer error (see
/// [`crate::reader::ChangelogReader::restore`]).
pub trait LogConsumer {
    /// Topics the consumer is subscribed to via pattern/topic subscription.
    /// Must be empty for the reader's exclusive-assignment model to hold.
    fn subscription(&self) -> Result<HashSet<String>, ConsumerError>;

    /// Replace the consumer's assignment with exactly `partitions`.
    fn assign(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError>;

    /// The consumer's current assignment.
    fn assignment(&self) -> Result<HashSet<Partition>, ConsumerError>;

    /// Seek the given partition (which must already be assigned) to `offset`.
    fn seek(&mut self, partition: &Partition, offset: i64) -> Result<(), ConsumerError>;

    /// Seek the given partitions to the earliest available offset.
    fn seek_to_beginning(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError>;

    /// The next offset the consumer would read from `partition`.
    fn position(&self, partition: &Partition) -> Result<i64, ConsumerError>;

    /// One bounded poll. May return an empty batch.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<ConsumerRecord>, ConsumerError>;

    /// The exclusive end offset for each of `partitions`, as of this call.
    /// Partitions absent from the returned map could not be resolved and
    /// should be retried later.
    fn end_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError>;

    /// The earliest available offset for each of `partitions`, as of this
    /// call. Used as the `starting_offset` baseline for partitions with no
    /// checkpoint instead of reading `position()` back after
    /// `seek_to_beginning`: a logical seek is not guaranteed to have
    /// resolved into a concrete numeric offset by the time `position()` is
    /// next called. Partitions absent from the returned map could not be
    /// resolved and should be retried later.
    fn beginning_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError>;

    /// Topics currently known to the cluster, with their partition indices.
    fn list_topics(&self) -> Result<TopicMetadata, ConsumerError>;
}
