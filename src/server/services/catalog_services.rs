use serde_json::Value;
use tracing::{info, warn};

use crate::{
    models::{
        ALWAYS_ON_GROUP, ChannelEntry, ChannelIndexEntry, FeedChannel, LIVE_EVENTS_GROUP,
        pad_channel,
    },
    server::utils::{
        fetch_utils::DynRemoteFetcher,
        m3u_utils::{M3uPlaylist, fill_template},
    },
};

const EMPTY_NAME: &str = "Empty";

/// builds /playlist.m3u8 out of the channel index and the feed
pub struct CatalogAssembler {
    fetcher: DynRemoteFetcher,
    channels_url: String,
    feed_url: String,
    logo_url_template: String,
    playback_base: String,
}

impl CatalogAssembler {
    pub fn new(
        fetcher: DynRemoteFetcher,
        channels_url: String,
        feed_url: String,
        logo_url_template: String,
        playback_base: String,
    ) -> Self {
        Self {
            fetcher,
            channels_url,
            feed_url,
            logo_url_template,
            playback_base,
        }
    }

    pub async fn build_playlist(&self) -> String {
        let (index, feed) = tokio::join!(
            self.fetcher.fetch_json(&self.channels_url),
            self.fetcher.fetch_json(&self.feed_url)
        );

        let Some(index) = index else {
            warn!("channel index unavailable, serving an empty playlist");
            return M3uPlaylist::new().finish();
        };

        if feed.is_none() {
            // names and logos still come out of the index, just without the feed's overrides
            warn!("feed unavailable, building playlist from the channel index alone");
        }

        let entries = self.assemble(&index, feed.as_ref());
        info!("assembled playlist with {} channels", entries.len());

        self.render(&entries)
    }

    /// joins index entries with their feed block on channel number, index order is kept
    pub fn assemble(&self, index: &Value, feed: Option<&Value>) -> Vec<ChannelEntry> {
        let Some(index) = index.as_object() else {
            warn!("channel index is not an object, ignoring it");
            return Vec::new();
        };

        index
            .iter()
            .filter_map(|(key, value)| {
                let entry: ChannelIndexEntry = match serde_json::from_value(value.clone()) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("skipping channel {}: {}", key, e);
                        return None;
                    }
                };

                let Ok(number) = entry.channum.trim().parse::<u32>() else {
                    warn!("skipping channel {} with bad number {:?}", key, entry.channum);
                    return None;
                };

                let feed_channel = feed
                    .and_then(|feed| feed.get(number.to_string()))
                    .and_then(|block| serde_json::from_value::<FeedChannel>(block.clone()).ok())
                    .unwrap_or_default();

                Some(ChannelEntry {
                    number,
                    external_id: entry.xmltvid.clone(),
                    name: format!("{}.", Self::display_name(&entry, &feed_channel)),
                    logo: self.logo(number, &feed_channel),
                    group: if entry.always_on {
                        ALWAYS_ON_GROUP
                    } else {
                        LIVE_EVENTS_GROUP
                    },
                })
            })
            .collect()
    }

    pub fn render(&self, entries: &[ChannelEntry]) -> String {
        let mut playlist = M3uPlaylist::new();

        for entry in entries {
            let channel = pad_channel(&entry.number.to_string());
            playlist.push_entry(
                &[
                    ("group-title", entry.group),
                    ("tvg-id", entry.external_id.as_str()),
                    ("tvg-logo", entry.logo.as_str()),
                ],
                &entry.name,
                &format!("{}/playlist.m3u8?ch={}", self.playback_base, channel),
            );
        }

        playlist.finish()
    }

    // feed names look like "07 - ESPN", the index name wins when it has one
    fn display_name(entry: &ChannelIndexEntry, feed: &FeedChannel) -> String {
        let index_name = entry.channame.trim();
        if !index_name.is_empty() {
            return index_name.to_string();
        }

        let feed_name: String = feed.name.chars().skip(5).collect();
        let feed_name = feed_name.trim();
        if feed_name.is_empty() {
            EMPTY_NAME.to_string()
        } else {
            feed_name.to_string()
        }
    }

    fn logo(&self, number: u32, feed: &FeedChannel) -> String {
        if feed.img.ends_with("png") {
            feed.img.clone()
        } else {
            fill_template(
                &self.logo_url_template,
                &[("channel", number.to_string().as_str())],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::server::utils::fetch_utils::MockRemoteFetcher;

    fn assembler() -> CatalogAssembler {
        CatalogAssembler::new(
            Arc::new(MockRemoteFetcher::new()),
            "https://guide.example/channels.json".to_string(),
            "https://guide.example/feed.json".to_string(),
            "https://logos.example/{channel}.png".to_string(),
            "http://127.0.0.1:8080".to_string(),
        )
    }

    #[test]
    fn keeps_upstream_order() {
        let index = json!({
            "30": {"channum": "30", "channame": "Thirty", "xmltvid": "c30", "24/7": true},
            "2": {"channum": "2", "channame": "Two", "xmltvid": "c2", "24/7": false},
            "11": {"channum": 11, "channame": "Eleven", "xmltvid": "c11", "24/7": 1},
        });

        let numbers: Vec<u32> = assembler()
            .assemble(&index, None)
            .iter()
            .map(|e| e.number)
            .collect();
        assert_eq!(numbers, vec![30, 2, 11]);
    }

    #[test]
    fn falls_back_to_feed_names_and_placeholders() {
        let index = json!({
            "a": {"channum": "4", "channame": "  ", "xmltvid": "c4"},
            "b": {"channum": "5", "channame": "", "xmltvid": "c5"},
        });
        let feed = json!({
            "4": {"name": "04 - Sky Sports  ", "img": "https://img.example/4.png"},
            "5": {"name": "05 - ", "img": "https://img.example/5.jpg"},
        });

        let entries = assembler().assemble(&index, Some(&feed));
        assert_eq!(entries[0].name, "Sky Sports.");
        assert_eq!(entries[0].logo, "https://img.example/4.png");
        assert_eq!(entries[0].group, LIVE_EVENTS_GROUP);
        assert_eq!(entries[1].name, "Empty.");
        assert_eq!(entries[1].logo, "https://logos.example/5.png");
    }

    #[test]
    fn skips_entries_without_a_number() {
        let index = json!({
            "a": {"channum": "x", "channame": "Broken"},
            "b": {"channum": "8", "channame": "Fine", "24/7": true},
        });

        let entries = assembler().assemble(&index, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].group, ALWAYS_ON_GROUP);
    }

    #[test]
    fn renders_padded_playback_urls() {
        let entries = vec![ChannelEntry {
            number: 3,
            external_id: "I3.abc".to_string(),
            name: "ABC.".to_string(),
            logo: "https://logos.example/3.png".to_string(),
            group: ALWAYS_ON_GROUP,
        }];

        assert_eq!(
            assembler().render(&entries),
            "#EXTM3U\n\
             #EXTINF:-1 group-title=\"24/7\" tvg-id=\"I3.abc\" tvg-logo=\"https://logos.example/3.png\",ABC.\n\
             http://127.0.0.1:8080/playlist.m3u8?ch=03\n"
        );
    }
}
