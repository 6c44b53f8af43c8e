//! Shopper profile - what the engine needs to know about an authenticated user.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::foundation::UserId;

/// Read-only facts about an authenticated shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopperProfile {
    pub user_id: UserId,
    /// Orders that reached a completed state.
    pub completed_orders: u32,
    /// Segment tags, lowercased.
    pub segments: BTreeSet<String>,
}

impl ShopperProfile {
    /// A shopper with no order history and no segments.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            completed_orders: 0,
            segments: BTreeSet::new(),
        }
    }

    pub fn with_completed_orders(mut self, completed_orders: u32) -> Self {
        self.completed_orders = completed_orders;
        self
    }

    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.segments = normalize_segments(segments);
        self
    }

    /// True if any of `wanted` is among this shopper's segments.
    pub fn in_any_segment(&self, wanted: &BTreeSet<String>) -> bool {
        !self.segments.is_disjoint(wanted)
    }
}

/// Trims and lowercases segment tags, dropping blanks.
pub fn normalize_segments<I, S>(segments: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
