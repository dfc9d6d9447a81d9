use std::collections::HashSet;

use crate::partition::Partition;

/// The task-scheduler-side collaborator the reader consults during the
/// initialize phase to resolve checkpoint-less partitions.
pub trait RestoringTask {
    /// Partitions this task owns as changelogs.
    fn change_log_partitions(&self) -> HashSet<Partition>;

    /// Partitions this task owns as source-as-changelog inputs.
    fn source_partitions(&self) -> HashSet<Partition>;

    /// Whether this task's stores are transactional (exactly-once). A
    /// transactional store with no checkpoint is untrusted and must be
    /// rebuilt from scratch rather than resumed.
    fn exactly_once_enabled(&self) -> bool;

    /// Drop and recreate the local store for `partition`. Called only when
    /// a transactional store has no checkpoint to resume from.
    fn reinitialize_state_store(&mut self, partition: &Partition) -> anyhow::Result<()>;

    /// True if this task owns `partition` either as a changelog or as a
    /// source-as-changelog input.
    fn owns(&self, partition: &Partition) -> bool {
        self.change_log_partitions().contains(partition)
            || self.source_partitions().contains(partition)
    }
}
