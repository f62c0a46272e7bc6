pub mod downloader;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod metadata;

pub use downloader::Downloader;
pub use error::ExtractError;
pub use extractor::{Extractor, ExtractorEngine};
pub use metadata::{
    merge_subtitles, sort_formats, Subtitle, Thumbnail, VideoFormat, VideoMetadata,
};
