use crate::offsets::{effective_limit, UNBOUNDED};
use crate::partition::Partition;
use crate::sink::StoreSink;

/// Per-partition restoration state. Holds the parameters and counters
/// described in the data model and forwards applied records to its sink.
///
/// A `Restorer` is created by the caller and handed to
/// [`crate::reader::ChangelogReader::register`], which takes ownership of it
/// for the rest of its lifetime.
pub struct Restorer {
    partition: Partition,
    store_name: String,
    persistent: bool,
    checkpoint_offset: Option<i64>,
    offset_limit: i64,
    starting_offset: i64,
    restored_offset: i64,
    restored_count: u64,
    sink: Box<dyn StoreSink>,
}

impl Restorer {
    /// `checkpoint_offset = None` means no prior checkpoint. `offset_limit =
    /// None` means unbounded.
    pub fn new(
        partition: Partition,
        store_name: impl Into<String>,
        persistent: bool,
        checkpoint_offset: Option<i64>,
        offset_limit: Option<i64>,
        sink: Box<dyn StoreSink>,
    ) -> Self {
        let starting_offset = checkpoint_offset.unwrap_or(0);
        Self {
            partition,
            store_name: store_name.into(),
            persistent,
            checkpoint_offset,
            offset_limit: offset_limit.unwrap_or(UNBOUNDED),
            starting_offset,
            restored_offset: starting_offset,
            restored_count: 0,
            sink,
        }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn checkpoint_offset(&self) -> Option<i64> {
        self.checkpoint_offset
    }

    pub fn offset_limit(&self) -> i64 {
        self.offset_limit
    }

    pub fn starting_offset(&self) -> i64 {
        self.starting_offset
    }

    pub fn restored_offset(&self) -> i64 {
        self.restored_offset
    }

    pub fn restored_count(&self) -> u64 {
        self.restored_count
    }

    /// Allowed only during reinit: the prior checkpoint was untrusted and a
    /// fresh one is being established after a seek-to-beginning.
    pub fn set_checkpoint_offset(&mut self, offset: i64) {
        self.checkpoint_offset = Some(offset);
    }

    pub fn set_starting_offset(&mut self, offset: i64) {
        assert!(
            offset >= self.starting_offset,
            "starting_offset must be monotonic: {} -> {}",
            self.starting_offset,
            offset
        );
        self.starting_offset = offset;
        if self.restored_offset < offset {
            self.restored_offset = offset;
        }
    }

    pub fn set_restored_offset(&mut self, offset: i64) {
        assert!(
            offset >= self.restored_offset,
            "restored_offset must be monotonic: {} -> {}",
            self.restored_offset,
            offset
        );
        self.restored_offset = offset;
    }

    /// Reader-internal completion pruning (initialize-phase steps that
    /// decide a partition needs no replay at all): unlike
    /// [`Self::set_restored_offset`] this does not assert monotonicity,
    /// since it establishes the initial baseline rather than recording
    /// progress.
    pub(crate) fn prune_complete(&mut self, restored_offset: i64) {
        self.restored_offset = restored_offset;
        if self.starting_offset > restored_offset {
            self.starting_offset = restored_offset;
        }
    }

    /// Forwards one record to the sink and bumps `restored_count`. Does not
    /// itself advance `restored_offset` — the reader does that once per
    /// batch, after establishing the new consumer position.
    pub fn restore(&mut self, key: &[u8], value: Option<&[u8]>) -> anyhow::Result<()> {
        self.sink.restore(key, value)?;
        self.restored_count += 1;
        Ok(())
    }

    /// True iff `current_offset` has reached `min(end_offset, offset_limit)`.
    /// Ties favor completion.
    pub fn has_completed(&self, current_offset: i64, end_offset: i64) -> bool {
        current_offset >= effective_limit(end_offset, self.offset_limit)
    }
}
