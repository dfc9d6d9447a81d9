//! Sentinel offset conventions shared by [`crate::restorer::Restorer`] and
//! [`crate::reader::ChangelogReader`].

/// `offset_limit` value meaning "no limit imposed".
pub const UNBOUNDED: i64 = i64::MAX;

/// Returns the effective stopping point for a partition: the lesser of the
/// changelog's end offset and any externally imposed limit.
pub fn effective_limit(end_offset: i64, offset_limit: i64) -> i64 {
    end_offset.min(offset_limit)
}
