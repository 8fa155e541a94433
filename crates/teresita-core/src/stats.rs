//! Bookkeeping for a single collection load.

/// What happened to one manifest entry during a collection load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Fetched, validated and kept
    Loaded,
    /// Valid but `published: false`, left out of the collection
    Unpublished,
    /// Fetch or validation failed
    Failed,
}

/// Statistics for one collection load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub unpublished: usize,
    pub failed: usize,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Loaded => self.loaded += 1,
            EntryOutcome::Unpublished => self.unpublished += 1,
            EntryOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of manifest entries processed.
    pub fn total(&self) -> usize {
        self.loaded + self.unpublished + self.failed
    }

    /// Entries that were fetched and parsed, published or not.
    pub fn valid(&self) -> usize {
        self.loaded + self.unpublished
    }
}
