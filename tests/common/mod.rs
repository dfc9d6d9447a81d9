use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use changelog_restore::consumer::{ConsumerRecord, LogConsumer, TopicMetadata};
use changelog_restore::error::ConsumerError;
use changelog_restore::partition::Partition;
use changelog_restore::sink::StoreSink;
use changelog_restore::task::RestoringTask;

/// Records a single changelog partition would contain: `count` records with
/// a big-endian offset as the key and `value` as the payload.
pub fn filled_partition(count: i64, value: &[u8]) -> Vec<(Option<Vec<u8>>, Option<Vec<u8>>)> {
    (0..count)
        .map(|o| (Some(o.to_be_bytes().to_vec()), Some(value.to_vec())))
        .collect()
}

/// A control/marker record: null key, never handed to the sink.
pub fn marker_record(value: &[u8]) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    (None, Some(value.to_vec()))
}

/// An in-memory stand-in for a Kafka broker, driven entirely by
/// [`LogConsumer`] calls. One poll returns at most one record, round-robin
/// across assigned partitions, mirroring the one-message-per-poll shape of
/// the real `rdkafka` adapter.
#[derive(Default)]
pub struct FakeConsumer {
    topics: HashMap<String, HashMap<i32, Vec<(Option<Vec<u8>>, Option<Vec<u8>>)>>>,
    assignment: HashSet<Partition>,
    positions: HashMap<Partition, i64>,
    round_robin_cursor: usize,
    metadata_timeouts_remaining: Cell<u32>,
    end_offset_timeouts_remaining: Cell<u32>,
    fake_subscription: HashSet<String>,
}

impl FakeConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(
        mut self,
        topic: &str,
        index: i32,
        records: Vec<(Option<Vec<u8>>, Option<Vec<u8>>)>,
    ) -> Self {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(index, records);
        self
    }

    /// Makes the next `n` `list_topics` calls report a timeout instead of
    /// refreshing metadata.
    pub fn fail_next_metadata_fetches(self, n: u32) -> Self {
        self.metadata_timeouts_remaining.set(n);
        self
    }

    /// Makes the next `n` `end_offsets` calls report a timeout.
    pub fn fail_next_end_offset_fetches(self, n: u32) -> Self {
        self.end_offset_timeouts_remaining.set(n);
        self
    }

    /// Simulates a leftover topic-pattern subscription, which the reader
    /// must refuse to initialize against.
    pub fn with_fake_subscription(mut self, topic: &str) -> Self {
        self.fake_subscription.insert(topic.to_string());
        self
    }

    fn len(&self, partition: &Partition) -> Option<i64> {
        self.topics
            .get(&partition.topic)
            .and_then(|parts| parts.get(&partition.index))
            .map(|records| records.len() as i64)
    }
}

impl LogConsumer for FakeConsumer {
    fn subscription(&self) -> Result<HashSet<String>, ConsumerError> {
        Ok(self.fake_subscription.clone())
    }

    fn assign(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError> {
        self.assignment = partitions.clone();
        Ok(())
    }

    fn assignment(&self) -> Result<HashSet<Partition>, ConsumerError> {
        Ok(self.assignment.clone())
    }

    fn seek(&mut self, partition: &Partition, offset: i64) -> Result<(), ConsumerError> {
        self.positions.insert(partition.clone(), offset);
        Ok(())
    }

    fn seek_to_beginning(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError> {
        for p in partitions {
            self.positions.insert(p.clone(), 0);
        }
        Ok(())
    }

    fn position(&self, partition: &Partition) -> Result<i64, ConsumerError> {
        self.positions.get(partition).copied().ok_or_else(|| {
            ConsumerError::Fatal(anyhow::anyhow!("no position tracked for {partition}"))
        })
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<ConsumerRecord>, ConsumerError> {
        let mut ordered: Vec<Partition> = self.assignment.iter().cloned().collect();
        ordered.sort();
        if ordered.is_empty() {
            return Ok(Vec::new());
        }

        for i in 0..ordered.len() {
            let idx = (self.round_robin_cursor + i) % ordered.len();
            let partition = &ordered[idx];
            let position = *self.positions.get(partition).unwrap_or(&0);
            let end = self.len(partition).unwrap_or(0);
            if position < end {
                let (key, value) = self.topics[&partition.topic][&partition.index]
                    [position as usize]
                    .clone();
                self.positions.insert(partition.clone(), position + 1);
                self.round_robin_cursor = (idx + 1) % ordered.len();
                return Ok(vec![ConsumerRecord {
                    partition: partition.clone(),
                    offset: position,
                    key,
                    value,
                }]);
            }
        }
        Ok(Vec::new())
    }

    fn end_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError> {
        let remaining = self.end_offset_timeouts_remaining.get();
        if remaining > 0 {
            self.end_offset_timeouts_remaining.set(remaining - 1);
            return Err(ConsumerError::Timeout("fake end_offsets timeout".into()));
        }
        Ok(partitions
            .iter()
            .filter_map(|p| self.len(p).map(|end| (p.clone(), end)))
            .collect())
    }

    fn beginning_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError> {
        Ok(partitions
            .iter()
            .filter_map(|p| self.len(p).map(|_| (p.clone(), 0)))
            .collect())
    }

    fn list_topics(&self) -> Result<TopicMetadata, ConsumerError> {
        let remaining = self.metadata_timeouts_remaining.get();
        if remaining > 0 {
            self.metadata_timeouts_remaining.set(remaining - 1);
            return Err(ConsumerError::Timeout("fake list_topics timeout".into()));
        }
        Ok(self
            .topics
            .iter()
            .map(|(topic, parts)| (topic.clone(), parts.keys().copied().collect()))
            .collect())
    }
}

/// Records every `(key, value)` pair handed to the sink, in order.
#[derive(Default, Clone)]
pub struct RecordingSink {
    pub applied: std::rc::Rc<std::cell::RefCell<Vec<(Vec<u8>, Option<Vec<u8>>)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied_count(&self) -> usize {
        self.applied.borrow().len()
    }
}

impl StoreSink for RecordingSink {
    fn restore(&mut self, key: &[u8], value: Option<&[u8]>) -> anyhow::Result<()> {
        self.applied
            .borrow_mut()
            .push((key.to_vec(), value.map(|v| v.to_vec())));
        Ok(())
    }
}

/// A task the reader can consult to resolve checkpoint-less partitions.
pub struct FakeTask {
    pub changelog_partitions: HashSet<Partition>,
    pub source_partitions: HashSet<Partition>,
    pub exactly_once: bool,
    pub reinit_calls: Vec<Partition>,
}

impl FakeTask {
    pub fn new(changelog_partitions: HashSet<Partition>, exactly_once: bool) -> Self {
        Self {
            changelog_partitions,
            source_partitions: HashSet::new(),
            exactly_once,
            reinit_calls: Vec::new(),
        }
    }
}

impl RestoringTask for FakeTask {
    fn change_log_partitions(&self) -> HashSet<Partition> {
        self.changelog_partitions.clone()
    }

    fn source_partitions(&self) -> HashSet<Partition> {
        self.source_partitions.clone()
    }

    fn exactly_once_enabled(&self) -> bool {
        self.exactly_once
    }

    fn reinitialize_state_store(&mut self, partition: &Partition) -> anyhow::Result<()> {
        self.reinit_calls.push(partition.clone());
        Ok(())
    }
}
