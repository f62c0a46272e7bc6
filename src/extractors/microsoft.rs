//! Extractor for Microsoft videoplayer embed pages
//! (`https://www.microsoft.com/<locale>/videoplayer/embed/<id>`).
//!
//! The embed page itself is never scraped; every piece of metadata comes from
//! one JSON document served by the video CMS backend. Extraction is a single
//! request/transform pass: resolve locale and id from the URL, fetch the
//! document, map streams, captions and thumbnails into the shared schema.

use crate::core::manifest::{parse_m3u8_variants, parse_mpd_representations};
use crate::core::{
    merge_subtitles, sort_formats, ExtractError, Extractor, Subtitle, Thumbnail, VideoFormat,
    VideoMetadata,
};
use crate::utils::{determine_ext, unified_timestamp};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

const VIDEO_API_BASE: &str = "https://prod-video-cms-rt-microsoft-com.akamaized.net/vhs/api/videos";

/// Locale and video id carried by an embed URL. Parsed once, then read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRef {
    pub locale: String,
    pub id: String,
}

/// Closed set of stream kinds the backend is known to publish. Resolved once
/// per stream name instead of comparing literals at every decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Hls,
    Dash,
    SmoothStreaming,
    Generic,
}

impl StreamKind {
    fn classify(stream_name: &str) -> Self {
        match stream_name {
            "apple_HTTP_Live_Streaming" => Self::Hls,
            "mPEG_DASH" => Self::Dash,
            "smooth_Streaming" => Self::SmoothStreaming,
            _ => Self::Generic,
        }
    }
}

pub struct MicrosoftExtractor {
    client: reqwest::Client,
    valid_url: Regex,
    generic_stream: Regex,
}

impl MicrosoftExtractor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            valid_url: Regex::new(
                r"^https?://(?:www\.)?microsoft\.com/(?P<locale>[^/]*)/videoplayer/embed/(?P<id>[A-Za-z0-9]+)",
            )
            .expect("static pattern"),
            generic_stream: Regex::new(
                r"^(?P<codec>[^_]+)_(?P<width>\d+)_(?P<height>\d+)_(?P<bitrate>\d+)kbps$",
            )
            .expect("static pattern"),
        }
    }

    /// Resolves the embed reference from the URL, or fails with
    /// [`ExtractError::PatternMismatch`].
    pub fn match_embed_url(&self, url: &Url) -> Result<EmbedRef, ExtractError> {
        let caps = self
            .valid_url
            .captures(url.as_str())
            .ok_or_else(|| ExtractError::PatternMismatch(url.to_string()))?;

        Ok(EmbedRef {
            locale: caps["locale"].to_string(),
            id: caps["id"].to_string(),
        })
    }

    async fn run_extract(&self, url: &Url) -> Result<VideoMetadata, ExtractError> {
        let embed = self.match_embed_url(url)?;
        tracing::debug!("resolved embed: locale={} id={}", embed.locale, embed.id);

        let api_url = format!("{VIDEO_API_BASE}/{}", embed.id);
        let document: Value = self
            .client
            .get(&api_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Adaptive-streaming manifests need their own fetches before mapping
        // can run; everything else in the document is mapped offline.
        let mut manifests = HashMap::new();
        if let Some(streams) = document.get("streams").and_then(Value::as_object) {
            for (stream_name, stream) in streams {
                let kind = StreamKind::classify(stream_name);
                if !matches!(kind, StreamKind::Hls | StreamKind::Dash) {
                    continue;
                }
                let Some(stream_url) = stream.get("url").and_then(Value::as_str) else {
                    continue;
                };
                tracing::debug!("fetching {:?} manifest from {}", kind, stream_url);
                let text = self
                    .client
                    .get(stream_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                manifests.insert(stream_name.clone(), text);
            }
        }

        self.map_document(&embed, &document, &manifests)
    }

    /// Maps a backend metadata document into the shared schema. Pure with
    /// respect to the network: manifest bodies for HLS/DASH streams are
    /// supplied by the caller, keyed by stream name.
    pub fn map_document(
        &self,
        embed: &EmbedRef,
        document: &Value,
        manifests: &HashMap<String, String>,
    ) -> Result<VideoMetadata, ExtractError> {
        let mut formats = Vec::new();
        let mut subtitles: HashMap<String, Vec<Subtitle>> = HashMap::new();

        if let Some(captions) = document.get("captions").and_then(Value::as_object) {
            for (locale_tag, caption) in captions {
                self.map_caption(locale_tag, caption, &mut subtitles);
            }
        }

        if let Some(streams) = document.get("streams").and_then(Value::as_object) {
            for (stream_name, stream) in streams {
                let Some(stream_url) = stream.get("url").and_then(Value::as_str) else {
                    tracing::debug!("stream {} has no url, skipping", stream_name);
                    continue;
                };

                match StreamKind::classify(stream_name) {
                    StreamKind::Hls => {
                        if let Some(text) = manifests.get(stream_name) {
                            let (f, s) = parse_m3u8_variants(text, stream_url, &embed.id);
                            formats.extend(f);
                            merge_subtitles(&mut subtitles, s);
                        }
                    }
                    StreamKind::Dash => {
                        if let Some(text) = manifests.get(stream_name) {
                            let (f, s) = parse_mpd_representations(text, stream_url, &embed.id);
                            formats.extend(f);
                            merge_subtitles(&mut subtitles, s);
                        }
                    }
                    StreamKind::SmoothStreaming => {
                        // Known limitation: Smooth Streaming manifests are not
                        // resolved into formats.
                        tracing::debug!("ignoring smooth streaming stream for {}", embed.id);
                    }
                    StreamKind::Generic => {
                        formats.push(self.map_generic_stream(stream_name, stream, stream_url));
                    }
                }
            }
        }

        let snippet = document
            .get("snippet")
            .filter(|s| !s.is_null())
            .ok_or(ExtractError::MissingField("snippet"))?;

        let thumbnails = map_thumbnails(&embed.id, snippet)?;

        annotate_language_preferences(&mut formats, &embed.locale);
        sort_formats(&mut formats);

        let timestamp = snippet
            .get("activeStartDate")
            .and_then(Value::as_str)
            .and_then(unified_timestamp);

        Ok(VideoMetadata {
            id: embed.id.clone(),
            title: snippet
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            formats,
            thumbnails,
            subtitles,
            timestamp,
        })
    }

    /// Caption tracks are grouped under the language part of their locale tag
    /// ("en-US" and "en-GB" both land in group "en"). A tag with no region
    /// part is used as the group key unchanged.
    fn map_caption(
        &self,
        locale_tag: &str,
        caption: &Value,
        subtitles: &mut HashMap<String, Vec<Subtitle>>,
    ) {
        let Some(url) = caption.get("url").and_then(Value::as_str) else {
            return;
        };
        let lang = locale_tag.split('-').next().unwrap_or(locale_tag);
        subtitles
            .entry(lang.to_string())
            .or_default()
            .push(Subtitle::ttml(url, locale_tag));
    }

    /// Single-file streams are named `<codec>_<width>_<height>_<bitrate>kbps`
    /// when the backend knows the encoding; the name supplies defaults that
    /// explicit descriptor fields override.
    fn map_generic_stream(&self, stream_name: &str, stream: &Value, stream_url: &str) -> VideoFormat {
        let mut codec = "unknown".to_string();
        let mut width = 0u32;
        let mut height = 0u32;

        if let Some(caps) = self.generic_stream.captures(stream_name) {
            codec = caps["codec"].to_string();
            width = caps["width"].parse().unwrap_or(0);
            height = caps["height"].parse().unwrap_or(0);
        }

        if let Some(w) = stream.get("widthPixels").and_then(Value::as_u64) {
            width = w as u32;
        }
        if let Some(h) = stream.get("heightPixels").and_then(Value::as_u64) {
            height = h as u32;
        }

        let mut format = VideoFormat::new(codec.clone(), stream_url);

        if codec != "unknown" {
            format.vcodec = Some(codec);
        }
        if width > 0 {
            format.width = Some(width);
        }
        if height > 0 {
            format.height = Some(height);
        }

        if let Some(ext) = determine_ext(stream_url) {
            format.format_id = format!("{}_{}", ext, format.format_id);
            format.ext = Some(ext);
        }

        if let Some(audio_type) = stream.get("audioType").and_then(Value::as_str) {
            format.format_id = format!("{}_{}", format.format_id, audio_type);
            format.acodec = Some(audio_type.to_string());
        }

        if let Some(bitrate) = stream
            .get("bitrateBps")
            .and_then(Value::as_f64)
            .filter(|b| *b > 0.0)
        {
            format.vbr = Some(bitrate);
        }

        if let Some(fps) = stream
            .get("frameRateFps")
            .and_then(Value::as_f64)
            .filter(|f| *f > 0.0)
        {
            format.fps = Some(fps);
        }

        format.language = stream
            .get("language")
            .and_then(Value::as_str)
            .map(str::to_string);

        format
    }
}

fn map_thumbnails(video_id: &str, snippet: &Value) -> Result<Vec<Thumbnail>, ExtractError> {
    let thumbnails = snippet
        .get("thumbnails")
        .and_then(Value::as_object)
        .ok_or(ExtractError::MissingField("snippet.thumbnails"))?;

    let mut records = Vec::new();
    for (size_label, thumbnail) in thumbnails {
        // A descriptor without a url has nothing to show; skip it, like
        // url-less captions and streams.
        let Some(url) = thumbnail.get("url").and_then(Value::as_str) else {
            continue;
        };
        records.push(Thumbnail::ranked(
            format!("{video_id}_{size_label}"),
            url,
            records.len() as u32,
            thumbnail.get("width").and_then(Value::as_u64),
            thumbnail.get("height").and_then(Value::as_u64),
        ));
    }
    Ok(records)
}

/// Audio in the locale the URL asked for gets a strong positive hint.
/// Otherwise, described-audio tracks (either a `dau-` language tag or a
/// `Descriptive_Audio` marker in the format id) are pushed away from default
/// selection, since most viewers don't want them picked automatically.
fn annotate_language_preferences(formats: &mut [VideoFormat], url_locale: &str) {
    for format in formats {
        let lang = format.language.as_deref();
        if lang == Some(url_locale) {
            format.language_preference = Some(10);
        } else if lang.is_some_and(|l| l.starts_with("dau-"))
            || format.format_id.contains("Descriptive_Audio")
        {
            format.preference = Some(-2);
        }
    }
}

impl Default for MicrosoftExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for MicrosoftExtractor {
    fn name(&self) -> &'static str {
        "Microsoft"
    }

    fn suitable(&self, url: &Url) -> bool {
        self.valid_url.is_match(url.as_str())
    }

    async fn extract(&mut self, url: &Url) -> Result<VideoMetadata> {
        Ok(self.run_extract(url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_known_stream_names() {
        assert_eq!(
            StreamKind::classify("apple_HTTP_Live_Streaming"),
            StreamKind::Hls
        );
        assert_eq!(StreamKind::classify("mPEG_DASH"), StreamKind::Dash);
        assert_eq!(
            StreamKind::classify("smooth_Streaming"),
            StreamKind::SmoothStreaming
        );
        assert_eq!(
            StreamKind::classify("h264_1280_720_2000kbps"),
            StreamKind::Generic
        );
    }

    #[test]
    fn generic_stream_name_parses_into_defaults() {
        let extractor = MicrosoftExtractor::new();
        let caps = extractor
            .generic_stream
            .captures("h264_1280_720_2000kbps")
            .unwrap();
        assert_eq!(&caps["codec"], "h264");
        assert_eq!(&caps["width"], "1280");
        assert_eq!(&caps["height"], "720");
        assert_eq!(&caps["bitrate"], "2000");
    }

    #[test]
    fn generic_stream_name_rejects_other_shapes() {
        let extractor = MicrosoftExtractor::new();
        assert!(extractor.generic_stream.captures("audio_only").is_none());
        assert!(extractor
            .generic_stream
            .captures("h264_1280_720_2000kbps_extra")
            .is_none());
    }
}
