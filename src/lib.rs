pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod utils;

pub use crate::core::{Downloader, ExtractError, ExtractorEngine, VideoFormat, VideoMetadata};
pub use crate::extractors::MicrosoftExtractor;
