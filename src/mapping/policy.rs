//! Fetch and cascade policy

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle operations that may propagate to associated entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cascade {
    None,
    Refresh,
    Save,
    Delete,
    All,
}

/// When an association is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Eager,
    #[default]
    Lazy,
}

/// Fetch and cascade directive of a traversal step
///
/// Unset parts defer to whatever they are combined with. A policy that is
/// entirely unset behaves as lazy fetching without cascading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingPolicy {
    fetch: Option<FetchMode>,
    cascade: Option<BTreeSet<Cascade>>,
}

impl MappingPolicy {
    /// Policy with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Eager fetching, cascade unset
    pub fn eager() -> Self {
        Self::new().with_fetch(FetchMode::Eager)
    }

    /// Cascade every lifecycle operation, fetch unset
    pub fn cascade_all() -> Self {
        Self::new().with_cascade([Cascade::All])
    }

    pub fn with_fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn with_cascade(mut self, cascade: impl IntoIterator<Item = Cascade>) -> Self {
        self.cascade = Some(cascade.into_iter().collect());
        self
    }

    /// Declared fetch mode, if any
    pub fn declared_fetch(&self) -> Option<FetchMode> {
        self.fetch
    }

    /// Declared cascade set, if any
    pub fn declared_cascade(&self) -> Option<&BTreeSet<Cascade>> {
        self.cascade.as_ref()
    }

    /// Effective fetch mode
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch.unwrap_or_default()
    }

    pub fn is_eager(&self) -> bool {
        self.fetch_mode() == FetchMode::Eager
    }

    /// True when `cascade` (or `ALL`) is in the effective cascade set
    pub fn should_cascade(&self, cascade: Cascade) -> bool {
        match &self.cascade {
            Some(set) => set.contains(&Cascade::All) || set.contains(&cascade),
            None => false,
        }
    }

    /// Effective policy for a nested step whose own declaration is `child`.
    ///
    /// An `ALL` cascade on either side is kept; otherwise the child's own
    /// cascade declaration applies, and an undeclared child does not cascade.
    /// A lazy fetch on either side is kept; otherwise an unset child fetch
    /// defers to this policy. The operation is associative, so a chain of
    /// combinations gives the same result whichever way it is grouped.
    pub fn combine_with(&self, child: &MappingPolicy) -> MappingPolicy {
        let fetch = if self.fetch == Some(FetchMode::Lazy) || child.fetch == Some(FetchMode::Lazy)
        {
            Some(FetchMode::Lazy)
        } else {
            child.fetch.or(self.fetch)
        };

        let has_all = |c: &Option<BTreeSet<Cascade>>| {
            c.as_ref().map_or(false, |set| set.contains(&Cascade::All))
        };
        let cascade = if has_all(&self.cascade) || has_all(&child.cascade) {
            Some(BTreeSet::from([Cascade::All]))
        } else {
            child.cascade.clone()
        };

        MappingPolicy { fetch, cascade }
    }
}
