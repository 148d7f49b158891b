pub mod auth;
pub mod channel;
pub mod schedule;

pub use auth::*;
pub use channel::*;
pub use schedule::*;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// the provider is not consistent about quoting numbers, "7" and 7 both show up for the same
/// field depending on which document you're reading
pub(crate) fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// same story for flags, true / "true" / 1 / "1"
pub(crate) fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True" | "TRUE"),
        _ => false,
    })
}

/// zero pads channel numbers below 10, the provider's stream names are always two digits
pub fn pad_channel(channel: &str) -> String {
    let channel = channel.trim();
    if channel.len() == 1 {
        format!("0{}", channel)
    } else {
        channel.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_single_digit_channels() {
        assert_eq!(pad_channel("1"), "01");
        assert_eq!(pad_channel("9"), "09");
    }

    #[test]
    fn leaves_wide_channels_alone() {
        assert_eq!(pad_channel("10"), "10");
        assert_eq!(pad_channel("150"), "150");
        // already padded input stays the same so urls built from our own playlists are stable
        assert_eq!(pad_channel("07"), "07");
    }
}
