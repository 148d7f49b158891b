use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    models::{FeedItem, ScheduledEvent, UNKNOWN_CATEGORY, pad_channel},
    server::utils::{
        fetch_utils::DynRemoteFetcher,
        m3u_utils::{M3uPlaylist, fill_template},
    },
};

/// how the feed writes times, the offset is either on the string or implied by the provider
pub const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FEED_TIME_WITH_OFFSET_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// builds /sports.m3u8, today's events from the feed in a stable order
pub struct EventScheduler {
    fetcher: DynRemoteFetcher,
    feed_url: String,
    logo_url_template: String,
    playback_base: String,
    feed_offset: FixedOffset,
}

impl EventScheduler {
    pub fn new(
        fetcher: DynRemoteFetcher,
        feed_url: String,
        logo_url_template: String,
        playback_base: String,
        feed_offset: FixedOffset,
    ) -> Self {
        Self {
            fetcher,
            feed_url,
            logo_url_template,
            playback_base,
            feed_offset,
        }
    }

    /// `now` decides both which day is "today" and the timezone labels are printed in
    pub async fn build_sports_playlist(
        &self,
        label_pattern: &str,
        now: DateTime<FixedOffset>,
    ) -> String {
        let Some(feed) = self.fetcher.fetch_json(&self.feed_url).await else {
            warn!("feed unavailable, serving an empty sports playlist");
            return M3uPlaylist::new().finish();
        };

        let events = self.collect_events(&feed, now);
        info!(
            "{} events scheduled for {}",
            events.len(),
            now.format("%Y-%m-%d")
        );

        self.render(&events, label_pattern, *now.offset())
    }

    /// today's events, sorted
    pub fn collect_events(&self, feed: &Value, now: DateTime<FixedOffset>) -> Vec<ScheduledEvent> {
        let Some(blocks) = feed.as_object() else {
            warn!("feed is not an object, no events to schedule");
            return Vec::new();
        };

        let today = now.date_naive();

        let mut events: Vec<ScheduledEvent> = blocks
            .values()
            .filter_map(|block| block.get("items").and_then(Value::as_array))
            .flatten()
            .filter_map(|raw| serde_json::from_value::<FeedItem>(raw.clone()).ok())
            .filter_map(|item| self.to_event(item))
            .filter(|event| event.start.with_timezone(now.offset()).date_naive() == today)
            .collect();

        events.sort();
        events
    }

    pub fn render(
        &self,
        events: &[ScheduledEvent],
        label_pattern: &str,
        offset: FixedOffset,
    ) -> String {
        let mut playlist = M3uPlaylist::new();

        // the nonce only keeps two events on the same channel from collapsing into one entry in
        // the player, it means nothing across requests
        for (nonce, event) in events.iter().enumerate() {
            let channel = event.channel.to_string();
            let logo = fill_template(&self.logo_url_template, &[("channel", channel.as_str())]);
            let title = Self::event_title(event, label_pattern, offset);

            playlist.push_entry(
                &[
                    ("group-title", event.group.as_str()),
                    ("tvg-id", channel.as_str()),
                    ("tvg-logo", logo.as_str()),
                ],
                &title,
                &format!(
                    "{}/playlist.m3u8?ch={}&nonce={}",
                    self.playback_base,
                    pad_channel(&channel),
                    nonce
                ),
            );
        }

        playlist.finish()
    }

    /// "<start formatted with pattern><name> (QUALITY/LANGUAGE)"
    pub fn event_title(event: &ScheduledEvent, label_pattern: &str, offset: FixedOffset) -> String {
        let start = event.start.with_timezone(&offset);

        let mut title = String::new();
        if write!(title, "{}", start.format(label_pattern)).is_err() {
            // chrono refuses unknown specifiers, the pattern goes out as typed
            debug!("label pattern {:?} didn't format, using it verbatim", label_pattern);
            title = label_pattern.to_string();
        }

        title.push_str(&event.name.replace(',', ""));
        title.push_str(&Self::quality_suffix(&event.quality, &event.language));
        title
    }

    pub fn quality_suffix(quality: &str, language: &str) -> String {
        let tags: Vec<&str> = [quality.trim(), language.trim()]
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect();

        if tags.is_empty() {
            String::new()
        } else {
            format!(" ({})", tags.join("/").to_uppercase())
        }
    }

    pub fn parse_feed_time(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let raw = raw.trim();

        if let Ok(time) = DateTime::parse_from_str(raw, FEED_TIME_WITH_OFFSET_FORMAT) {
            return Some(time);
        }

        let naive = NaiveDateTime::parse_from_str(raw, FEED_TIME_FORMAT).ok()?;
        self.feed_offset.from_local_datetime(&naive).single()
    }

    fn to_event(&self, item: FeedItem) -> Option<ScheduledEvent> {
        let Some(start) = self.parse_feed_time(&item.time) else {
            debug!("skipping {:?}, unparseable time {:?}", item.name, item.time);
            return None;
        };

        let Ok(channel) = item.channel.trim().parse::<u32>() else {
            debug!("skipping {:?}, bad channel {:?}", item.name, item.channel);
            return None;
        };

        let category = item.category.trim();

        Some(ScheduledEvent {
            channel,
            name: item.name,
            start,
            group: if category.is_empty() {
                UNKNOWN_CATEGORY.to_string()
            } else {
                category.to_string()
            },
            quality: item.quality,
            language: item.language,
        })
    }
}
