pub mod config;
pub mod consumer;
pub mod error;
pub mod offsets;
pub mod partition;
pub mod rdkafka_consumer;
pub mod reader;
pub mod restorer;
pub mod security;
pub mod sink;
pub mod task;

pub use config::ConsumerConfig;
pub use consumer::{ConsumerRecord, LogConsumer};
pub use error::{ConsumerError, ReaderError};
pub use partition::Partition;
pub use rdkafka_consumer::RdKafkaConsumer;
pub use reader::ChangelogReader;
pub use restorer::Restorer;
pub use sink::StoreSink;
pub use task::RestoringTask;
