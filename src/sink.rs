/// The local key-value store backing a single changelog partition.
///
/// Implementations materialize records to disk (or memory); a `None` value
/// is a tombstone and is the store's concern to interpret, not the reader's.
pub trait StoreSink {
    fn restore(&mut self, key: &[u8], value: Option<&[u8]>) -> anyhow::Result<()>;
}
