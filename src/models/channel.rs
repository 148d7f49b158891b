use serde::Deserialize;

/// one entry of the channel index, keyed by an arbitrary id upstream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelIndexEntry {
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub channum: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub channame: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub xmltvid: String,
    #[serde(rename = "24/7", default, deserialize_with = "super::deserialize_lenient_bool")]
    pub always_on: bool,
}

/// per channel block of the feed document, keyed by channel number
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedChannel {
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub img: String,
}

pub const ALWAYS_ON_GROUP: &str = "24/7";
pub const LIVE_EVENTS_GROUP: &str = "Live Events";

/// a channel ready to be written into the playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub number: u32,
    pub external_id: String,
    pub name: String,
    pub logo: String,
    pub group: &'static str,
}
