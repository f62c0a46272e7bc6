use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::PathBuf;

/// Container extension derived from a URL path, when the last path segment
/// carries a plausible one. Query strings and fragments are ignored.
pub fn determine_ext(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;

    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_ascii_lowercase())
    } else {
        None
    }
}

/// Permissive date-string parsing: providers report timestamps in a handful
/// of loosely standardized layouts. Offset-less values are taken as UTC.
/// Returns epoch seconds, or `None` when nothing matches.
pub fn unified_timestamp(date_str: &str) -> Option<i64> {
    let trimmed = date_str.trim().trim_end_matches(" UTC").trim_end_matches(" GMT");

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp());
    }

    const DATETIME_LAYOUTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for layout in DATETIME_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(parsed.and_utc().timestamp());
        }
    }

    const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%B %d, %Y", "%b %d, %Y"];
    for layout in DATE_LAYOUTS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, layout) {
            return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
        }
    }

    None
}

pub fn sanitize_filename(filename: &str) -> String {
    // Remove or replace characters that are invalid in filenames
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn generate_output_filename(template: &str, metadata: &crate::core::VideoMetadata) -> PathBuf {
    // Formats are sorted worst-to-best; the last one decides the extension.
    let ext = metadata
        .formats
        .last()
        .and_then(|f| f.ext.as_deref())
        .unwrap_or("mp4");

    // Simple template replacement
    let filename = template
        .replace("%(title)s", &sanitize_filename(&metadata.title))
        .replace("%(id)s", &metadata.id)
        .replace("%(ext)s", ext);

    PathBuf::from(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hello/world"), "hello-world");
        assert_eq!(sanitize_filename("test<>file"), "test__file");
        assert_eq!(sanitize_filename("normal_file.mp4"), "normal_file.mp4");
    }

    #[test]
    fn test_determine_ext() {
        assert_eq!(
            determine_ext("https://cdn.example.com/videos/clip.mp4"),
            Some("mp4".to_string())
        );
        assert_eq!(
            determine_ext("https://cdn.example.com/videos/clip.MP4?token=abc"),
            Some("mp4".to_string())
        );
        // Dots in the host must not leak an "extension" out of a bare path.
        assert_eq!(determine_ext("https://cdn.example.com/videos/clip"), None);
        assert_eq!(determine_ext("https://cdn.example.com/a.verylongext"), None);
    }

    #[test]
    fn test_unified_timestamp_layouts() {
        assert_eq!(unified_timestamp("2021-09-14T22:25:16Z"), Some(1631658316));
        assert_eq!(
            unified_timestamp("2021-09-14T22:25:16+00:00"),
            Some(1631658316)
        );
        // No offset: treated as UTC.
        assert_eq!(unified_timestamp("2021-09-14T22:25:16"), Some(1631658316));
        assert_eq!(unified_timestamp("2021-09-14 22:25:16"), Some(1631658316));
        assert_eq!(unified_timestamp("2021-09-14"), Some(1631577600));
    }

    #[test]
    fn test_unified_timestamp_rejects_junk() {
        assert_eq!(unified_timestamp("not a date"), None);
        assert_eq!(unified_timestamp(""), None);
    }
}
