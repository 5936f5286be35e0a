use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::error::PlaylistError;
use crate::playlist::Playlist;

lazy_static! {
    static ref EXTINF_REGEX: Regex =
        Regex::new(r"^#EXTINF:-1\s*([^,]*),([^\n\t]+)").expect("Regular expression error");
    static ref ATTRIBUTE_REGEX: Regex =
        Regex::new(r#"([A-Za-z0-9_-]+)="([^"]*)""#).expect("Regular expression error");
}

/// Metadata of the last `#EXTINF` line, applied to every url line that follows it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingDirective {
    pub name: String,
    pub logo_url: String,
    pub group: String,
}

#[derive(Debug, PartialEq)]
pub enum Line<'a> {
    Directive(PendingDirective),
    Url(&'a str),
    /// Comments, unknown tags, malformed `#EXTINF` and blank lines
    Ignored,
}

/// `key="value"` pairs of a directive's argument text. The first occurrence of
/// a key wins.
pub fn parse_attributes(args: &str) -> HashMap<&str, &str> {
    let mut attributes = HashMap::new();
    for (_, [key, value]) in ATTRIBUTE_REGEX.captures_iter(args).map(|c| c.extract()) {
        attributes.entry(key).or_insert(value);
    }
    attributes
}

pub fn classify(line: &str) -> Line<'_> {
    if line.starts_with('#') {
        let Some(caps) = EXTINF_REGEX.captures(line) else {
            return Line::Ignored;
        };
        let attributes = parse_attributes(&caps[1]);
        // Absent attributes reset to empty, they never inherit the previous directive.
        return Line::Directive(PendingDirective {
            name: caps[2].trim_end_matches('\r').to_string(),
            logo_url: attributes.get("tvg-logo").copied().unwrap_or_default().to_string(),
            group: attributes.get("group-title").copied().unwrap_or_default().to_string(),
        });
    }

    let url = line.trim_end_matches(['\r', '\n']);
    if url.is_empty() {
        Line::Ignored
    } else {
        Line::Url(url)
    }
}

/// Single forward pass over playlist text. Returns the playlist and the number
/// of committed entries.
pub fn parse_reader<R: BufRead>(mut reader: R) -> Result<(Playlist, usize), PlaylistError> {
    let mut playlist = Playlist::new();
    let mut pending = PendingDirective::default();
    let mut total_entries = 0;
    let mut bytes = Vec::new();

    loop {
        bytes.clear();
        if reader.read_until(b'\n', &mut bytes)? == 0 {
            break;
        }
        // Latin-1 names and other stray bytes become U+FFFD instead of failing the load.
        let buffer = String::from_utf8_lossy(&bytes);

        match classify(&buffer) {
            Line::Directive(directive) => pending = directive,
            Line::Url(url) => {
                playlist.add_entry(&pending.group, &pending.name, &pending.logo_url, url)?;
                total_entries += 1;
            }
            Line::Ignored => debug!("Skipping playlist line: {}", buffer.trim_end()),
        }
    }

    Ok((playlist, total_entries))
}

pub fn parse_str(content: &str) -> Result<(Playlist, usize), PlaylistError> {
    parse_reader(content.as_bytes())
}

pub fn load(path: impl AsRef<Path>) -> Result<(Playlist, usize), PlaylistError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PlaylistError::FileNotFound(path.to_path_buf()),
        _ => PlaylistError::Io(e),
    })?;

    let (playlist, total) = parse_reader(BufReader::new(file))?;
    info!(
        "Loaded {} channels in {} groups from {}",
        total,
        playlist.groups().len(),
        path.display()
    );
    Ok((playlist, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_single_channel() {
        let data = "#EXTINF:-1 tvg-logo=\"http://x/l.png\" group-title=\"News\",CNN\nhttp://stream/cnn.ts\n";
        let (playlist, total) = parse_str(data).unwrap();
        assert_eq!(total, 1);
        assert_eq!(playlist.groups().len(), 1);

        let group = &playlist.groups()[0];
        assert_eq!(group.name(), "News");
        assert_eq!(group.len(), 1);
        let entry = &group.entries()[0];
        assert_eq!(entry.name(), "CNN");
        assert_eq!(entry.logo_url(), "http://x/l.png");
        assert_eq!(entry.url(), "http://stream/cnn.ts");
    }

    #[test]
    fn test_parse_m3u() {
        let data = r#"#EXTM3U
#EXTINF:-1 tvg-id="das.erste" tvg-logo="http://logos/ard.png" group-title="Public",Das Erste
#EXTVLCOPT:network-caching=1000
http://streams/ard.m3u8
#EXTINF:-1 group-title="Private" tvg-logo="http://logos/rtl.png",RTL
http://streams/rtl.m3u8
# just a comment
#EXTINF:-1 tvg-logo="http://logos/zdf.png" group-title="Public",ZDF
http://streams/zdf.m3u8
"#;
        let (playlist, total) = parse_str(data).unwrap();
        assert_eq!(total, 3);

        let pairs: Vec<(&str, &str, &str)> = playlist
            .groups()
            .iter()
            .flat_map(|g| g.entries().iter().map(move |e| (g.name(), e.name(), e.url())))
            .collect();
        assert_eq!(
            pairs,
            [
                ("Public", "Das Erste", "http://streams/ard.m3u8"),
                ("Public", "ZDF", "http://streams/zdf.m3u8"),
                ("Private", "RTL", "http://streams/rtl.m3u8"),
            ]
        );
        assert_eq!(playlist.groups()[1].entries()[0].logo_url(), "http://logos/rtl.png");
    }

    #[test]
    fn test_consecutive_urls_share_directive() {
        let data = "#EXTINF:-1 tvg-logo=\"http://l/a.png\" group-title=\"Movies\",Cinema\nhttp://s/a1\nhttp://s/a2\n";
        let (playlist, total) = parse_str(data).unwrap();
        assert_eq!(total, 2);
        let group = playlist.find_group("Movies").unwrap();
        assert_eq!(group.len(), 2);
        for entry in group.entries() {
            assert_eq!(entry.name(), "Cinema");
            assert_eq!(entry.logo_url(), "http://l/a.png");
        }
        assert_eq!(group.entries()[1].url(), "http://s/a2");
    }

    #[test]
    fn test_url_before_any_directive_uses_empty_group() {
        let (playlist, total) = parse_str("http://s/orphan\n").unwrap();
        assert_eq!(total, 1);
        let group = playlist.find_group("").unwrap();
        assert_eq!(group.entries()[0].name(), "");
        assert_eq!(group.entries()[0].logo_url(), "");
    }

    #[test]
    fn test_missing_attributes_reset_to_empty() {
        let data = "#EXTINF:-1 tvg-logo=\"http://l/a.png\" group-title=\"News\",A\nhttp://s/a\n#EXTINF:-1 tvg-id=\"b\",B\nhttp://s/b\n";
        let (playlist, total) = parse_str(data).unwrap();
        assert_eq!(total, 2);
        let names: Vec<_> = playlist.groups().iter().map(|g| g.name()).collect();
        assert_eq!(names, ["News", ""]);
        let b = &playlist.find_group("").unwrap().entries()[0];
        assert_eq!(b.name(), "B");
        assert_eq!(b.logo_url(), "");
    }

    #[test]
    fn test_missing_logo_does_not_take_group_value() {
        let data = "#EXTINF:-1 group-title=\"Kids\",KiKA\nhttp://s/kika\n";
        let (playlist, _) = parse_str(data).unwrap();
        let entry = &playlist.find_group("Kids").unwrap().entries()[0];
        assert_eq!(entry.logo_url(), "");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let data = "#EXTM3U\r\n#EXTINF:-1 group-title=\"News\",CNN\r\nhttp://s/cnn\r\n\r\n";
        let (playlist, total) = parse_str(data).unwrap();
        assert_eq!(total, 1);
        let entry = &playlist.find_group("News").unwrap().entries()[0];
        assert_eq!(entry.name(), "CNN");
        assert_eq!(entry.url(), "http://s/cnn");
    }

    #[test]
    fn test_other_directives_are_ignored() {
        assert_eq!(classify("#EXTM3U\n"), Line::Ignored);
        assert_eq!(classify("#EXTINF:0,Other duration\n"), Line::Ignored);
        assert_eq!(classify("#EXTINF:-1 group-title=\"x\"\n"), Line::Ignored);
        assert_eq!(classify("\n"), Line::Ignored);
        assert_eq!(classify("rtsp://box/1\r\n"), Line::Url("rtsp://box/1"));
    }

    #[test]
    fn test_display_name_stops_at_tab() {
        match classify("#EXTINF:-1   tvg-logo=\"\"  ,Name\tjunk\n") {
            Line::Directive(d) => {
                assert_eq!(d.name, "Name");
                assert_eq!(d.logo_url, "");
                assert_eq!(d.group, "");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_latin1_name_does_not_abort_load() {
        let mut data = b"#EXTINF:-1 group-title=\"News\",CNN\nhttp://s/cnn\n".to_vec();
        data.extend_from_slice(b"#EXTINF:-1 group-title=\"DE\",M\xFCnchen TV\nhttp://s/muc\n");
        let (playlist, total) = parse_reader(&data[..]).unwrap();
        assert_eq!(total, 2);
        assert_eq!(playlist.find_group("News").unwrap().entries()[0].name(), "CNN");
        let muc = &playlist.find_group("DE").unwrap().entries()[0];
        assert_eq!(muc.name(), "M\u{FFFD}nchen TV");
        assert_eq!(muc.url(), "http://s/muc");
    }

    #[test]
    fn test_entry_count_matches_url_lines() {
        let cases: &[(&str, usize)] = &[
            ("", 0),
            ("\n\n\n", 0),
            ("#EXTM3U\n# comment\n#EXTVLCOPT:network-caching=1000\n", 0),
            ("http://s/orphan\n", 1),
            ("http://s/a\n\nhttp://s/b\n", 2),
            ("#EXTINF:-1 group-title=\"A\",One\nhttp://s/1\nhttp://s/2\nhttp://s/3\n", 3),
            (
                "http://s/early\n#EXTM3U\n\n#EXTINF:-1 group-title=\"A\",One\r\nhttp://s/1\r\n# note\n\r\nhttp://s/2\n#EXTINF:-1,Two\nhttp://s/3",
                4,
            ),
        ];

        for (input, expected) in cases {
            let counted = input
                .lines()
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .count();
            assert_eq!(counted, *expected, "input {:?}", input);

            let (playlist, total) = parse_str(input).unwrap();
            assert_eq!(total, *expected, "input {:?}", input);
            assert_eq!(playlist.entry_count(), total, "input {:?}", input);
        }
    }

    #[test]
    fn test_first_attribute_occurrence_wins() {
        let attributes = parse_attributes(r#"group-title="A" tvg-logo="http://l/1.png" group-title="B""#);
        assert_eq!(attributes["group-title"], "A");
        assert_eq!(attributes["tvg-logo"], "http://l/1.png");
    }

    #[test]
    fn test_empty_input() {
        let (playlist, total) = parse_str("").unwrap();
        assert_eq!(total, 0);
        assert!(playlist.groups().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#EXTINF:-1 group-title=\"News\",CNN\nhttp://s/cnn\n").unwrap();
        let (playlist, total) = load(file.path()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(playlist.entry_count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("nope.m3u")).unwrap_err();
        assert!(matches!(err, PlaylistError::FileNotFound(_)));
    }
}
