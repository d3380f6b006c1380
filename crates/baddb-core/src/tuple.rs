//! Per-key version history with timestamp-gated visibility.
//!
//! Each primary key owns a [`Tuple`]: the current version and at most one
//! predecessor. Deletions are tombstone versions like any other write, which
//! is what lets a stale read observe an item that a consistent read already
//! sees as deleted.

use chrono::{DateTime, Utc};

use baddb_model::Entry;

/// One stored version of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryWrapper {
    /// The entry body. For tombstones this holds only the key attributes.
    pub entry: Entry,
    /// Whether this version marks a deletion.
    pub is_deleted: bool,
    /// Commit time of the version.
    pub created_at: DateTime<Utc>,
}

impl EntryWrapper {
    /// Creates a live version.
    #[must_use]
    pub fn live(entry: Entry, created_at: DateTime<Utc>) -> Self {
        Self {
            entry,
            is_deleted: false,
            created_at,
        }
    }

    /// Creates a tombstone version carrying only the given key attributes.
    #[must_use]
    pub fn tombstone(key_attributes: Entry, created_at: DateTime<Utc>) -> Self {
        Self {
            entry: key_attributes,
            is_deleted: true,
            created_at,
        }
    }
}

/// Maximum number of versions retained per primary key.
pub const MAX_VERSIONS: usize = 2;

/// The version history of one primary key: current version plus at most one
/// predecessor, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    versions: Vec<EntryWrapper>,
}

impl Tuple {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained versions (0, 1, or 2).
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns `true` if no version has ever been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The newest version, if any.
    #[must_use]
    pub fn newest(&self) -> Option<&EntryWrapper> {
        self.versions.last()
    }

    /// The retained versions, oldest first.
    #[must_use]
    pub fn versions(&self) -> &[EntryWrapper] {
        &self.versions
    }

    /// Appends a version, dropping the oldest once the bound is exceeded.
    pub fn push(&mut self, wrapper: EntryWrapper) {
        self.versions.push(wrapper);
        if self.versions.len() > MAX_VERSIONS {
            self.versions.remove(0);
        }
    }

    /// Selects the version a read observes.
    ///
    /// A consistent base-table read sees the newest version unconditionally.
    /// Every other read sees the newest version committed strictly before
    /// `read_ts`. The caller maps a tombstone (or no candidate) to
    /// "not present".
    #[must_use]
    pub fn visible(
        &self,
        read_ts: DateTime<Utc>,
        consistent_read: bool,
        is_gsi: bool,
    ) -> Option<&EntryWrapper> {
        if consistent_read && !is_gsi {
            return self.newest();
        }
        self.versions
            .iter()
            .rev()
            .find(|w| w.created_at < read_ts)
    }
}
