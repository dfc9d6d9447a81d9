use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message as RdMessage;
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};

use crate::config::ConsumerConfig;
use crate::consumer::{ConsumerRecord, LogConsumer, TopicMetadata};
use crate::error::ConsumerError;
use crate::partition::Partition;
use crate::security::configure_security;

/// [`LogConsumer`] backed by a real `rdkafka::consumer::BaseConsumer`.
pub struct RdKafkaConsumer {
    inner: BaseConsumer,
    metadata_timeout: Duration,
}

impl RdKafkaConsumer {
    pub fn new(config: &ConsumerConfig) -> anyhow::Result<Self> {
        let mut cc = ClientConfig::new();
        cc.set("bootstrap.servers", &config.bootstrap_servers);
        cc.set("group.id", &config.group_id);
        // The reader owns offsets itself; never let librdkafka store or commit them.
        cc.set("enable.auto.offset.store", "false");
        cc.set("enable.auto.commit", "false");
        cc.set("enable.partition.eof", "false");
        cc.set("auto.offset.reset", "earliest");
        configure_security(&mut cc, config);

        let inner: BaseConsumer = cc.create()?;
        Ok(Self {
            inner,
            metadata_timeout: Duration::from_secs(config.metadata_timeout_secs),
        })
    }

    fn classify(err: KafkaError) -> ConsumerError {
        if err.rdkafka_error_code() == Some(RDKafkaErrorCode::OperationTimedOut) {
            ConsumerError::Timeout(err.to_string())
        } else {
            ConsumerError::Fatal(anyhow::anyhow!(err))
        }
    }

    fn offset_value(offset: Offset) -> Option<i64> {
        match offset {
            Offset::Offset(o) => Some(o),
            Offset::Beginning | Offset::End | Offset::Stored | Offset::Invalid => None,
            Offset::OffsetTail(_) => None,
        }
    }
}

impl LogConsumer for RdKafkaConsumer {
    fn subscription(&self) -> Result<HashSet<String>, ConsumerError> {
        let tpl = self.inner.subscription().map_err(Self::classify)?;
        Ok(tpl
            .elements()
            .iter()
            .map(|e| e.topic().to_string())
            .collect())
    }

    fn assign(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError> {
        let mut tpl = TopicPartitionList::new();
        for p in partitions {
            tpl.add_partition(&p.topic, p.index);
        }
        self.inner.assign(&tpl).map_err(Self::classify)
    }

    fn assignment(&self) -> Result<HashSet<Partition>, ConsumerError> {
        let tpl = self.inner.assignment().map_err(Self::classify)?;
        Ok(tpl
            .elements()
            .iter()
            .map(|e| Partition::new(e.topic(), e.partition()))
            .collect())
    }

    fn seek(&mut self, partition: &Partition, offset: i64) -> Result<(), ConsumerError> {
        self.inner
            .seek(
                &partition.topic,
                partition.index,
                Offset::Offset(offset),
                self.metadata_timeout,
            )
            .map_err(Self::classify)
    }

    fn seek_to_beginning(&mut self, partitions: &HashSet<Partition>) -> Result<(), ConsumerError> {
        for p in partitions {
            self.inner
                .seek(&p.topic, p.index, Offset::Beginning, self.metadata_timeout)
                .map_err(Self::classify)?;
        }
        Ok(())
    }

    fn position(&self, partition: &Partition) -> Result<i64, ConsumerError> {
        let tpl = self.inner.position().map_err(Self::classify)?;
        tpl.elements()
            .iter()
            .find(|e| e.topic() == partition.topic && e.partition() == partition.index)
            .and_then(|e| Self::offset_value(e.offset()))
            .ok_or_else(|| {
                ConsumerError::Fatal(anyhow::anyhow!(
                    "no position reported for partition {partition}"
                ))
            })
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<ConsumerRecord>, ConsumerError> {
        match self.inner.poll(timeout) {
            None => Ok(Vec::new()),
            Some(Ok(msg)) => Ok(vec![ConsumerRecord {
                partition: Partition::new(msg.topic(), msg.partition()),
                offset: msg.offset(),
                key: msg.key().map(|k| k.to_vec()),
                value: msg.payload().map(|v| v.to_vec()),
            }]),
            Some(Err(e)) => Err(Self::classify(e)),
        }
    }

    fn end_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError> {
        let mut out = HashMap::with_capacity(partitions.len());
        for p in partitions {
            let (_low, high) = self
                .inner
                .fetch_watermarks(&p.topic, p.index, self.metadata_timeout)
                .map_err(Self::classify)?;
            out.insert(p.clone(), high);
        }
        Ok(out)
    }

    fn beginning_offsets(
        &self,
        partitions: &HashSet<Partition>,
    ) -> Result<HashMap<Partition, i64>, ConsumerError> {
        let mut out = HashMap::with_capacity(partitions.len());
        for p in partitions {
            let (low, _high) = self
                .inner
                .fetch_watermarks(&p.topic, p.index, self.metadata_timeout)
                .map_err(Self::classify)?;
            out.insert(p.clone(), low);
        }
        Ok(out)
    }

    fn list_topics(&self) -> Result<TopicMetadata, ConsumerError> {
        let md = self
            .inner
            .client()
            .fetch_metadata(None, self.metadata_timeout)
            .map_err(Self::classify)?;
        Ok(md
            .topics()
            .iter()
            .map(|t| {
                (
                    t.name().to_string(),
                    t.partitions().iter().map(|p| p.id()).collect(),
                )
            })
            .collect())
    }
}
