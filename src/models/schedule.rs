use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// one event out of a feed block's "items"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItem {
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub time: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub channel: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub quality: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub channel: u32,
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub group: String,
    pub quality: String,
    pub language: String,
}

impl ScheduledEvent {
    /// group, then start, then name, then channel
    pub fn sort_key(&self) -> (&str, DateTime<FixedOffset>, &str, u32) {
        (self.group.as_str(), self.start, self.name.as_str(), self.channel)
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            // keeps Ord consistent with Eq, the key alone ignores quality and language
            .then_with(|| self.quality.cmp(&other.quality))
            .then_with(|| self.language.cmp(&other.language))
    }
}
