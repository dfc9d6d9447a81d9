use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::consumer::{ConsumerRecord, LogConsumer, TopicMetadata};
use crate::error::{ConsumerError, ReaderError};
use crate::partition::Partition;
use crate::restorer::Restorer;
use crate::task::RestoringTask;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Orchestrates many [`Restorer`]s on a single shared [`LogConsumer`].
///
/// A single `restore` call performs at most one initialization pass plus
/// one bounded poll; the scheduler is expected to call it repeatedly until
/// every registered partition reports completion.
pub struct ChangelogReader<C: LogConsumer> {
    consumer: C,
    poll_timeout: Duration,
    registered: HashMap<Partition, Restorer>,
    needs_initializing: HashSet<Partition>,
    needs_restoring: HashSet<Partition>,
    end_offsets: HashMap<Partition, i64>,
    partition_info: TopicMetadata,
}

impl<C: LogConsumer> ChangelogReader<C> {
    pub fn new(consumer: C) -> Self {
        Self::with_poll_timeout(consumer, DEFAULT_POLL_TIMEOUT)
    }

    pub fn with_poll_timeout(consumer: C, poll_timeout: Duration) -> Self {
        Self {
            consumer,
            poll_timeout,
            registered: HashMap::new(),
            needs_initializing: HashSet::new(),
            needs_restoring: HashSet::new(),
            end_offsets: HashMap::new(),
            partition_info: HashMap::new(),
        }
    }

    /// Idempotent per partition: registering a partition already known to
    /// the reader does not replace its `Restorer`. Always (re-)marks the
    /// partition as needing initialization.
    ///
    /// There is no built-in deadline on a partition that never appears in
    /// the cluster's metadata — it will sit in the needs-initializing set
    /// forever. Imposing a timeout on that is the caller's responsibility.
    pub fn register(&mut self, restorer: Restorer) {
        let partition = restorer.partition().clone();
        self.registered.entry(partition.clone()).or_insert(restorer);
        self.needs_initializing.insert(partition);
    }

    /// A single non-blocking pass: one initialization pass (if needed) plus
    /// one bounded poll. Returns the set of partitions that are now
    /// complete.
    pub fn restore(
        &mut self,
        restoring_tasks: &mut [&mut dyn RestoringTask],
    ) -> Result<HashSet<Partition>, ReaderError> {
        if !self.needs_initializing.is_empty() {
            self.initialize(restoring_tasks)?;
        }

        if self.needs_restoring.is_empty() {
            self.consumer
                .assign(&HashSet::new())
                .map_err(ReaderError::from)?;
            return Ok(self.completed());
        }

        let snapshot: HashSet<Partition> = self.needs_restoring.clone();
        let records = self
            .consumer
            .poll(self.poll_timeout)
            .map_err(ReaderError::from)?;

        let mut by_partition: HashMap<Partition, Vec<ConsumerRecord>> = HashMap::new();
        for record in records {
            if snapshot.contains(&record.partition) {
                by_partition
                    .entry(record.partition.clone())
                    .or_default()
                    .push(record);
            }
        }

        for partition in &snapshot {
            let batch = by_partition.remove(partition).unwrap_or_default();
            self.apply_records(partition, &batch)?;
        }

        if self.needs_restoring.is_empty() {
            self.consumer
                .assign(&HashSet::new())
                .map_err(ReaderError::from)?;
        }

        Ok(self.completed())
    }

    /// `registered` minus everything still pending (`needs_restoring` or
    /// `needs_initializing`): every partition that either never needed
    /// replay or has finished it.
    ///
    /// A partition mid-transactional-reinit is back in `needs_initializing`
    /// but not yet in `needs_restoring`; excluding both sets (rather than
    /// just `needs_restoring`) keeps it from being reported complete before
    /// it has actually replayed anything.
    pub fn completed(&self) -> HashSet<Partition> {
        self.registered
            .keys()
            .filter(|p| !self.needs_restoring.contains(*p) && !self.needs_initializing.contains(*p))
            .cloned()
            .collect()
    }

    /// Current `restored_offset` for every persistent `Restorer`.
    /// In-memory-only stores are excluded: their progress needs no durable
    /// checkpoint.
    pub fn restored_offsets(&self) -> HashMap<Partition, i64> {
        self.registered
            .values()
            .filter(|r| r.persistent())
            .map(|r| (r.partition().clone(), r.restored_offset()))
            .collect()
    }

    /// Clears all internal bookkeeping unconditionally. Used when the
    /// owning thread loses all of its tasks in a rebalance; the consumer's
    /// assignment is the caller's responsibility afterward.
    pub fn reset(&mut self) {
        self.registered.clear();
        self.needs_initializing.clear();
        self.needs_restoring.clear();
        self.end_offsets.clear();
        self.partition_info.clear();
    }

    fn initialize(
        &mut self,
        restoring_tasks: &mut [&mut dyn RestoringTask],
    ) -> Result<(), ReaderError> {
        let subscription = self.consumer.subscription().map_err(ReaderError::from)?;
        if !subscription.is_empty() {
            let msg = format!(
                "log consumer must have no topic-pattern subscription during initialize, found {subscription:?}"
            );
            log::error!("{msg}");
            return Err(ReaderError::IllegalState(msg));
        }

        match self.consumer.list_topics() {
            Ok(meta) => self.partition_info = meta,
            Err(e) if e.is_timeout() => {
                log::debug!("metadata refresh timed out, retrying next call: {e}");
                return Ok(());
            }
            Err(e) => return Err(ReaderError::from(e)),
        }

        let initializable: HashSet<Partition> = self
            .needs_initializing
            .iter()
            .filter(|p| {
                self.partition_info
                    .get(&p.topic)
                    .map(|indices| indices.contains(&p.index))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if initializable.is_empty() {
            return Ok(());
        }

        let end_offsets = match self.consumer.end_offsets(&initializable) {
            Ok(map) => map,
            Err(ConsumerError::Timeout(msg)) => {
                log::debug!("end-offset fetch timed out, retrying next call: {msg}");
                return Ok(());
            }
            Err(e) => return Err(ReaderError::from(e)),
        };

        let beginning_offsets = match self.consumer.beginning_offsets(&initializable) {
            Ok(map) => map,
            Err(ConsumerError::Timeout(msg)) => {
                log::debug!("beginning-offset fetch timed out, retrying next call: {msg}");
                return Ok(());
            }
            Err(e) => return Err(ReaderError::from(e)),
        };

        let mut survivors: HashSet<Partition> = HashSet::new();
        for p in &initializable {
            self.needs_initializing.remove(p);

            let Some(&end) = end_offsets.get(p) else {
                // consumer returned no entry for this partition; retry next call
                self.needs_initializing.insert(p.clone());
                continue;
            };
            self.end_offsets.insert(p.clone(), end);

            let restorer = self
                .registered
                .get_mut(p)
                .expect("initializable partition must be registered");
            let checkpoint = restorer.checkpoint_offset();

            if checkpoint.map(|c| c >= end).unwrap_or(false) {
                restorer.prune_complete(checkpoint.unwrap());
                continue;
            }
            if restorer.offset_limit() == 0 || end == 0 {
                restorer.prune_complete(0);
                continue;
            }
            survivors.insert(p.clone());
        }

        if !survivors.is_empty() {
            self.start_restoration(survivors, &beginning_offsets, restoring_tasks)?;
        }
        Ok(())
    }

    fn start_restoration(
        &mut self,
        survivors: HashSet<Partition>,
        beginning_offsets: &HashMap<Partition, i64>,
        restoring_tasks: &mut [&mut dyn RestoringTask],
    ) -> Result<(), ReaderError> {
        let current = self.consumer.assignment().map_err(ReaderError::from)?;
        let new_assignment: HashSet<Partition> = current.union(&survivors).cloned().collect();
        self.consumer
            .assign(&new_assignment)
            .map_err(ReaderError::from)?;

        let mut deferred: HashSet<Partition> = HashSet::new();
        for p in &survivors {
            let checkpoint = self
                .registered
                .get(p)
                .expect("survivor must be registered")
                .checkpoint_offset();
            match checkpoint {
                Some(offset) => {
                    self.consumer.seek(p, offset).map_err(ReaderError::from)?;
                    let position = self.consumer.position(p).map_err(ReaderError::from)?;
                    self.registered
                        .get_mut(p)
                        .expect("survivor must be registered")
                        .set_starting_offset(position);
                }
                None => {
                    deferred.insert(p.clone());
                }
            }
        }

        if !deferred.is_empty() {
            self.consumer
                .seek_to_beginning(&deferred)
                .map_err(ReaderError::from)?;
        }

        let mut reinitialized: HashSet<Partition> = HashSet::new();
        for p in &deferred {
            // Not `consumer.position(p)`: a logical seek-to-beginning is not
            // guaranteed to have resolved into a concrete numeric offset by
            // the time `position()` is next called, so the low watermark
            // fetched alongside `end_offsets` is used instead.
            let position = *beginning_offsets.get(p).unwrap_or_else(|| {
                log::warn!("no beginning offset known for partition {p}, assuming 0");
                &0
            });
            let owning_task = restoring_tasks.iter_mut().find(|t| t.owns(p));
            match owning_task {
                Some(task) if task.exactly_once_enabled() => {
                    task.reinitialize_state_store(p)
                        .map_err(|source| ReaderError::Sink {
                            partition: p.clone(),
                            source,
                        })?;
                    self.registered
                        .get_mut(p)
                        .expect("survivor must be registered")
                        .set_checkpoint_offset(position);
                    self.needs_initializing.insert(p.clone());
                    reinitialized.insert(p.clone());
                }
                // Non-transactional owner, or no owning task found among the
                // tasks passed this round: resume from the post-seek position.
                _ => {
                    self.registered
                        .get_mut(p)
                        .expect("survivor must be registered")
                        .set_starting_offset(position);
                }
            }
        }

        for p in survivors.difference(&reinitialized) {
            self.needs_restoring.insert(p.clone());
        }
        Ok(())
    }

    fn apply_records(
        &mut self,
        partition: &Partition,
        batch: &[ConsumerRecord],
    ) -> Result<(), ReaderError> {
        let end_offset = *self
            .end_offsets
            .get(partition)
            .expect("end_offset must be known for a partition being restored");

        let mut new_offset: Option<i64> = None;
        {
            let restorer = self
                .registered
                .get_mut(partition)
                .expect("restoring partition must be registered");
            for record in batch {
                if restorer.has_completed(record.offset, end_offset) {
                    new_offset = Some(record.offset);
                    break;
                }
                if let Some(key) = &record.key {
                    restorer
                        .restore(key, record.value.as_deref())
                        .map_err(|source| ReaderError::Sink {
                            partition: partition.clone(),
                            source,
                        })?;
                }
            }
        }

        let new_offset = match new_offset {
            Some(o) => o,
            None => self.consumer.position(partition).map_err(ReaderError::from)?,
        };

        let restorer = self
            .registered
            .get_mut(partition)
            .expect("restoring partition must be registered");
        restorer.set_restored_offset(new_offset);

        if restorer.has_completed(new_offset, end_offset) {
            if new_offset > end_offset + 1 {
                let msg = format!(
                    "restored_offset {new_offset} overshoots end_offset+1 {} for partition {partition}",
                    end_offset + 1
                );
                log::error!("{msg}");
                return Err(ReaderError::IllegalState(msg));
            }
            self.needs_restoring.remove(partition);
        }
        Ok(())
    }
}
