use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub formats: Vec<VideoFormat>,
    pub thumbnails: Vec<Thumbnail>,
    pub subtitles: HashMap<String, Vec<Subtitle>>,
    /// Publication time as seconds since the Unix epoch, when the provider
    /// reports a parseable date.
    pub timestamp: Option<i64>,
}

/// One playable representation of the video: a specific
/// codec/resolution/bitrate/container combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFormat {
    pub format_id: String,
    pub url: String,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Video bitrate in bits per second, as reported by the provider.
    pub vbr: Option<f64>,
    /// Total bitrate in Kbit/s, for manifest-derived variants.
    pub tbr: Option<f64>,
    pub fps: Option<f64>,
    pub language: Option<String>,
    /// Higher values are preferred by format selection; 10 marks audio in
    /// the locale the embed URL asked for.
    pub language_preference: Option<i32>,
    /// Negative values push a format away from default selection.
    pub preference: Option<i32>,
}

impl VideoFormat {
    /// Baseline record with every optional field unset. Mapping code fills
    /// fields in explicitly; absent provider data stays `None` rather than
    /// getting a per-call-site fallback.
    pub fn new(format_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            url: url.into(),
            ext: None,
            vcodec: None,
            acodec: None,
            width: None,
            height: None,
            vbr: None,
            tbr: None,
            fps: None,
            language: None,
            language_preference: None,
            preference: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub id: String,
    pub url: String,
    /// Ordinal rank, 0-based in provider document order.
    pub preference: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Thumbnail {
    /// Dimensions are kept only when positive; providers use 0 for "unknown".
    pub fn ranked(
        id: impl Into<String>,
        url: impl Into<String>,
        preference: u32,
        width: Option<u64>,
        height: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            preference,
            width: width.filter(|w| *w > 0).map(|w| w as u32),
            height: height.filter(|h| *h > 0).map(|h| h as u32),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtitle {
    pub url: String,
    pub ext: String,
    /// Provider-specific track label, e.g. the original locale tag.
    pub name: Option<String>,
}

impl Subtitle {
    pub fn ttml(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ext: "ttml".to_string(),
            name: Some(name.into()),
        }
    }
}

/// Union of subtitle groups: groups are merged by language key and entries
/// within a group are concatenated. Duplicates are kept as-is.
pub fn merge_subtitles(
    target: &mut HashMap<String, Vec<Subtitle>>,
    extra: HashMap<String, Vec<Subtitle>>,
) {
    for (lang, entries) in extra {
        target.entry(lang).or_default().extend(entries);
    }
}

/// Stable sort, worst format first. Selection code takes from the back, so
/// deprioritized entries (negative `preference`) sink to the front and
/// locale-matching audio rises to the back. The bitrate tiebreak compares
/// everything in Kbit/s: `vbr` is stored in bits/s, `tbr` already in Kbit/s.
pub fn sort_formats(formats: &mut [VideoFormat]) {
    formats.sort_by_key(|f| {
        (
            f.preference.unwrap_or(0),
            f.language_preference.unwrap_or(-1),
            f.height.unwrap_or(0),
            f.vbr.map(|v| v / 1000.0).or(f.tbr).unwrap_or(0.0) as i64,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: &str) -> VideoFormat {
        VideoFormat::new(id, format!("https://example.com/{id}"))
    }

    #[test]
    fn sort_puts_deprioritized_formats_first() {
        let mut described = format("mp4_h264_Descriptive_Audio");
        described.preference = Some(-2);
        described.height = Some(1080);

        let mut main = format("mp4_h264");
        main.height = Some(720);

        let mut formats = vec![described, main];
        sort_formats(&mut formats);

        assert_eq!(formats[0].format_id, "mp4_h264_Descriptive_Audio");
        assert_eq!(formats[1].format_id, "mp4_h264");
    }

    #[test]
    fn sort_prefers_matching_language_over_resolution() {
        let mut foreign = format("hls-4000");
        foreign.height = Some(1080);

        let mut local = format("mp4_h264");
        local.height = Some(720);
        local.language_preference = Some(10);

        let mut formats = vec![local, foreign];
        sort_formats(&mut formats);

        assert_eq!(formats.last().unwrap().format_id, "mp4_h264");
    }

    #[test]
    fn sort_compares_bitrates_in_one_unit() {
        // Progressive files report bits/s, manifest variants Kbit/s; at equal
        // height the faster stream must still win.
        let mut file = format("mp4_h264");
        file.height = Some(720);
        file.vbr = Some(800_000.0);

        let mut variant = format("hls-3500");
        variant.height = Some(720);
        variant.tbr = Some(3500.0);

        let mut formats = vec![file, variant];
        sort_formats(&mut formats);

        assert_eq!(formats.last().unwrap().format_id, "hls-3500");
        assert_eq!(formats[0].format_id, "mp4_h264");
    }

    #[test]
    fn merge_concatenates_groups_without_dedup() {
        let mut target = HashMap::new();
        target.insert("en".to_string(), vec![Subtitle::ttml("https://a/x", "en-US")]);

        let mut extra = HashMap::new();
        extra.insert("en".to_string(), vec![Subtitle::ttml("https://a/x", "en-GB")]);
        extra.insert("fr".to_string(), vec![Subtitle::ttml("https://a/y", "fr-FR")]);

        merge_subtitles(&mut target, extra);

        assert_eq!(target["en"].len(), 2);
        assert_eq!(target["fr"].len(), 1);
    }

    #[test]
    fn thumbnail_drops_zero_dimensions() {
        let thumb = Thumbnail::ranked("vid_small", "https://a/t.jpg", 0, Some(0), Some(180));
        assert_eq!(thumb.width, None);
        assert_eq!(thumb.height, Some(180));
    }
}
