use std::fmt::Write;

pub const M3U_HEADER: &str = "#EXTM3U";

/// extended m3u writer, just enough of the format for the players we care about
///
/// attributes are written in the order they're given, players are picky about this more often
/// than they should be
#[derive(Debug, Clone)]
pub struct M3uPlaylist {
    body: String,
    entries: usize,
}

impl M3uPlaylist {
    pub fn new() -> Self {
        Self {
            body: format!("{}\n", M3U_HEADER),
            entries: 0,
        }
    }

    pub fn push_entry(&mut self, attributes: &[(&str, &str)], title: &str, url: &str) {
        self.body.push_str("#EXTINF:-1");
        for (key, value) in attributes {
            // quotes would end the attribute early, nothing upstream needs them
            let _ = write!(self.body, " {}=\"{}\"", key, value.replace('"', "'"));
        }
        let _ = writeln!(self.body, ",{}", title);
        let _ = writeln!(self.body, "{}", url);
        self.entries += 1;
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> String {
        self.body
    }
}

impl Default for M3uPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

/// fills `{channel}` style placeholders
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_playlist_is_just_the_header() {
        let playlist = M3uPlaylist::new();
        assert!(playlist.is_empty());
        assert_eq!(playlist.finish(), "#EXTM3U\n");
    }

    #[test]
    fn writes_attributes_in_order() {
        let mut playlist = M3uPlaylist::new();
        playlist.push_entry(
            &[("group-title", "24/7"), ("tvg-id", "I1.espn")],
            "ESPN.",
            "http://127.0.0.1:8080/playlist.m3u8?ch=01",
        );
        assert_eq!(playlist.len(), 1);
        assert_eq!(
            playlist.finish(),
            "#EXTM3U\n#EXTINF:-1 group-title=\"24/7\" tvg-id=\"I1.espn\",ESPN.\nhttp://127.0.0.1:8080/playlist.m3u8?ch=01\n"
        );
    }

    #[test]
    fn fills_every_placeholder() {
        let url = fill_template(
            "https://{server}.example.tv/{service}/ch{channel}q{quality}.stream",
            &[
                ("server", "dnae1"),
                ("service", "viewstvn"),
                ("channel", "07"),
                ("quality", "1"),
            ],
        );
        assert_eq!(url, "https://dnae1.example.tv/viewstvn/ch07q1.stream");
    }
}
