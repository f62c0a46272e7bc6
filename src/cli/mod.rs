use crate::config::Config;
use crate::core::{Downloader, ExtractorEngine};
use crate::extractors::MicrosoftExtractor;
use crate::utils::generate_output_filename;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msvid-dl")]
#[command(about = "Microsoft videoplayer embed metadata extractor and downloader")]
#[command(version)]
pub struct Cli {
    /// Embed URL to extract
    #[arg(value_name = "URL")]
    pub url: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: String,

    /// Output filename template
    #[arg(short = 't', long)]
    pub output_template: Option<String>,

    /// Print extracted metadata as JSON and skip the download
    #[arg(long)]
    pub skip_download: bool,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let mut extractor_engine = ExtractorEngine::new();
        extractor_engine.register_extractor(Box::new(MicrosoftExtractor::new()));

        println!("Extracting video information...");
        let metadata = extractor_engine.extract(&self.url).await?;

        if self.skip_download {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            return Ok(());
        }

        println!("Title: {}", metadata.title);
        if let Some(timestamp) = metadata.timestamp {
            println!("Published: {} (epoch seconds)", timestamp);
        }
        println!("Available formats: {}", metadata.formats.len());
        for (i, format) in metadata.formats.iter().rev().enumerate().take(5) {
            let resolution = match (format.width, format.height) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                _ => "unknown".to_string(),
            };
            println!(
                "  {}: {} - {} ({})",
                i + 1,
                format.format_id,
                resolution,
                format.ext.as_deref().unwrap_or("unknown")
            );
        }
        if !metadata.subtitles.is_empty() {
            let mut langs: Vec<&String> = metadata.subtitles.keys().collect();
            langs.sort();
            println!(
                "Subtitles: {}",
                langs.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            );
        }

        let template = self
            .output_template
            .as_deref()
            .unwrap_or("%(title)s.%(ext)s");
        let filename = generate_output_filename(template, &metadata);
        let output_dir = if self.output == "." {
            config.output_dir.clone()
        } else {
            PathBuf::from(&self.output)
        };
        let output_path = output_dir.join(filename);

        println!("Output file: {}", output_path.display());

        let downloader = Downloader::new();

        println!("Starting download...");
        downloader.download(&metadata, output_path).await?;

        println!("Download completed!");

        Ok(())
    }
}
