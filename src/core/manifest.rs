//! Adaptive-streaming manifest parsing. The extractors hand over fetched
//! manifest text and get back normalized format and subtitle records.

use crate::core::metadata::{Subtitle, VideoFormat};
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Splits an HLS master playlist into its variant streams. Subtitle
/// renditions declared via `#EXT-X-MEDIA` become subtitle groups keyed by
/// their declared language.
pub fn parse_m3u8_variants(
    text: &str,
    manifest_url: &str,
    video_id: &str,
) -> (Vec<VideoFormat>, HashMap<String, Vec<Subtitle>>) {
    let mut formats = Vec::new();
    let mut subtitles: HashMap<String, Vec<Subtitle>> = HashMap::new();

    // Attributes of the most recent #EXT-X-STREAM-INF line, waiting for the
    // variant URI on the following line.
    let mut pending: Option<HashMap<String, String>> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending = Some(parse_attribute_list(rest));
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA:") {
            let attrs = parse_attribute_list(rest);
            if attrs.get("TYPE").map(String::as_str) == Some("SUBTITLES") {
                if let Some(uri) = attrs.get("URI") {
                    let lang = attrs
                        .get("LANGUAGE")
                        .cloned()
                        .unwrap_or_else(|| "und".to_string());
                    subtitles.entry(lang).or_default().push(Subtitle {
                        url: resolve_uri(manifest_url, uri),
                        ext: "vtt".to_string(),
                        name: attrs.get("NAME").cloned(),
                    });
                }
            }
        } else if line.is_empty() || line.starts_with('#') {
            continue;
        } else if let Some(attrs) = pending.take() {
            formats.push(variant_format(&attrs, line, manifest_url, video_id));
        }
    }

    (formats, subtitles)
}

fn variant_format(
    attrs: &HashMap<String, String>,
    uri: &str,
    manifest_url: &str,
    video_id: &str,
) -> VideoFormat {
    let bandwidth = attrs
        .get("BANDWIDTH")
        .and_then(|b| b.parse::<u64>().ok())
        .filter(|b| *b > 0);

    let format_id = match bandwidth {
        Some(b) => format!("hls-{}", b / 1000),
        None => format!("hls-{video_id}"),
    };

    let mut format = VideoFormat::new(format_id, resolve_uri(manifest_url, uri));
    format.ext = Some("mp4".to_string());
    format.tbr = bandwidth.map(|b| b as f64 / 1000.0);

    if let Some(resolution) = attrs.get("RESOLUTION") {
        if let Some((w, h)) = resolution.split_once('x') {
            format.width = w.parse().ok();
            format.height = h.parse().ok();
        }
    }
    if let Some(frame_rate) = attrs.get("FRAME-RATE") {
        format.fps = frame_rate.parse().ok();
    }
    if let Some(codecs) = attrs.get("CODECS") {
        let (vcodec, acodec) = split_codecs(codecs);
        format.vcodec = vcodec;
        format.acodec = acodec;
    }

    format
}

/// Pulls `Representation` entries out of a DASH MPD. The representations keep
/// the manifest URL; segment resolution happens at download time.
pub fn parse_mpd_representations(
    text: &str,
    manifest_url: &str,
    video_id: &str,
) -> (Vec<VideoFormat>, HashMap<String, Vec<Subtitle>>) {
    let representation = Regex::new(r"<Representation\b([^>/]*)/?>").expect("static pattern");

    let mut formats = Vec::new();
    for caps in representation.captures_iter(text) {
        let attrs = parse_xml_attributes(&caps[1]);

        let bandwidth = attrs
            .get("bandwidth")
            .and_then(|b| b.parse::<u64>().ok())
            .filter(|b| *b > 0);

        let format_id = match (attrs.get("id"), bandwidth) {
            (Some(id), _) if !id.is_empty() => format!("dash-{id}"),
            (_, Some(b)) => format!("dash-{}", b / 1000),
            _ => format!("dash-{video_id}"),
        };

        let mut format = VideoFormat::new(format_id, manifest_url.to_string());
        format.ext = Some("mp4".to_string());
        format.tbr = bandwidth.map(|b| b as f64 / 1000.0);
        format.width = attrs.get("width").and_then(|w| w.parse().ok()).filter(|w| *w > 0);
        format.height = attrs.get("height").and_then(|h| h.parse().ok()).filter(|h| *h > 0);
        format.fps = attrs.get("frameRate").and_then(|f| f.parse().ok());
        if let Some(codecs) = attrs.get("codecs") {
            let (vcodec, acodec) = split_codecs(codecs);
            format.vcodec = vcodec;
            format.acodec = acodec;
        }

        formats.push(format);
    }

    (formats, HashMap::new())
}

/// HLS attribute lists: comma-separated KEY=VALUE pairs where values may be
/// quoted strings containing commas.
fn parse_attribute_list(attrs: &str) -> HashMap<String, String> {
    let pair = Regex::new(r#"([A-Z0-9-]+)=("[^"]*"|[^",]*)"#).expect("static pattern");
    pair.captures_iter(attrs)
        .map(|caps| {
            let value = caps[2].trim_matches('"').to_string();
            (caps[1].to_string(), value)
        })
        .collect()
}

fn parse_xml_attributes(attrs: &str) -> HashMap<String, String> {
    let pair = Regex::new(r#"([A-Za-z:_][A-Za-z0-9:_.-]*)="([^"]*)""#).expect("static pattern");
    pair.captures_iter(attrs)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

fn split_codecs(codecs: &str) -> (Option<String>, Option<String>) {
    let mut vcodec = None;
    let mut acodec = None;
    for part in codecs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let is_audio = ["mp4a", "ac-3", "ec-3", "opus", "flac", "vorbis"]
            .iter()
            .any(|prefix| part.starts_with(prefix));
        if is_audio {
            acodec.get_or_insert_with(|| part.to_string());
        } else {
            vcodec.get_or_insert_with(|| part.to_string());
        }
    }
    (vcodec, acodec)
}

fn resolve_uri(manifest_url: &str, uri: &str) -> String {
    Url::parse(manifest_url)
        .and_then(|base| base.join(uri))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_PLAYLIST: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",URI="subs/en.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720,CODECS="avc1.64001f,mp4a.40.2",FRAME-RATE=29.970
variant_720.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
variant_360.m3u8
"#;

    #[test]
    fn master_playlist_yields_one_format_per_variant() {
        let (formats, subs) = parse_m3u8_variants(
            MASTER_PLAYLIST,
            "https://cdn.example.com/vod/master.m3u8",
            "RWL07e",
        );

        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].format_id, "hls-2000");
        assert_eq!(formats[0].width, Some(1280));
        assert_eq!(formats[0].height, Some(720));
        assert_eq!(formats[0].vcodec.as_deref(), Some("avc1.64001f"));
        assert_eq!(formats[0].acodec.as_deref(), Some("mp4a.40.2"));
        assert_eq!(formats[0].fps, Some(29.97));
        assert_eq!(
            formats[0].url,
            "https://cdn.example.com/vod/variant_720.m3u8"
        );
        assert_eq!(formats[1].format_id, "hls-800");

        assert_eq!(subs["en"].len(), 1);
        assert_eq!(subs["en"][0].ext, "vtt");
        assert_eq!(subs["en"][0].name.as_deref(), Some("English"));
        assert_eq!(subs["en"][0].url, "https://cdn.example.com/vod/subs/en.m3u8");
    }

    #[test]
    fn junk_playlist_yields_nothing() {
        let (formats, subs) = parse_m3u8_variants("not a playlist", "https://x/m.m3u8", "id");
        assert!(formats.is_empty());
        assert!(subs.is_empty());
    }

    #[test]
    fn mpd_representations_become_formats() {
        let mpd = r#"<?xml version="1.0"?>
<MPD><Period><AdaptationSet mimeType="video/mp4">
<Representation id="video=2000" bandwidth="2000000" width="1280" height="720" codecs="avc1.64001f"/>
<Representation id="audio=128" bandwidth="128000" codecs="mp4a.40.2"/>
</AdaptationSet></Period></MPD>"#;

        let (formats, subs) =
            parse_mpd_representations(mpd, "https://cdn.example.com/vod/manifest.mpd", "RWL07e");

        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].format_id, "dash-video=2000");
        assert_eq!(formats[0].width, Some(1280));
        assert_eq!(formats[0].vcodec.as_deref(), Some("avc1.64001f"));
        assert_eq!(formats[1].acodec.as_deref(), Some("mp4a.40.2"));
        assert_eq!(formats[1].vcodec, None);
        assert!(subs.is_empty());
    }
}
