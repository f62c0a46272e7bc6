use crate::core::{VideoFormat, VideoMetadata};
use anyhow::Result;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn download(&self, metadata: &VideoMetadata, output_path: PathBuf) -> Result<()> {
        let format = self.select_best_format(&metadata.formats)?;

        info!("Downloading: {} - {}", metadata.title, format.format_id);
        debug!("URL: {}", format.url);

        self.download_format(format, output_path).await?;

        Ok(())
    }

    /// Formats arrive sorted worst-to-best, so selection walks from the back.
    /// Muxed formats (video and audio codec both known) win over
    /// video-or-audio-only ones.
    pub fn select_best_format<'a>(&self, formats: &'a [VideoFormat]) -> Result<&'a VideoFormat> {
        let best = formats
            .iter()
            .rev()
            .find(|f| f.vcodec.is_some() && f.acodec.is_some())
            .or_else(|| formats.last());

        best.ok_or_else(|| anyhow::anyhow!("No suitable format found"))
    }

    async fn download_format(&self, format: &VideoFormat, output_path: PathBuf) -> Result<()> {
        // Partial file on disk means a previous attempt got interrupted.
        let resume_from = if output_path.exists() {
            match tokio::fs::metadata(&output_path).await {
                Ok(metadata) => {
                    let size = metadata.len();
                    info!("Found partial file, resuming from {} bytes", size);
                    Some(size)
                }
                Err(_) => None,
            }
        } else {
            None
        };

        const MAX_RETRIES: u32 = 3;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self
                .client
                .get(&format.url)
                .header("Accept", "*/*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Referer", "https://www.microsoft.com/");

            if let Some(resume_pos) = resume_from {
                request = request.header("Range", format!("bytes={}-", resume_pos));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!("Request failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() || status.as_u16() == 206 {
                return self.perform_download(response, output_path, resume_from).await;
            } else if status.as_u16() == 403 && attempt < MAX_RETRIES {
                warn!(
                    "HTTP 403 error (attempt {}), retrying in {} seconds...",
                    attempt,
                    2_u64.pow(attempt)
                );
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
                continue;
            } else {
                anyhow::bail!("Failed to download after {} attempts: HTTP {}", attempt, status);
            }
        }
    }

    async fn perform_download(
        &self,
        response: reqwest::Response,
        output_path: PathBuf,
        resume_from: Option<u64>,
    ) -> Result<()> {
        let total_size = response.content_length();
        let mut downloaded = resume_from.unwrap_or(0);

        let mut file = if resume_from.is_some() {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&output_path)
                .await?;
            file.seek(std::io::SeekFrom::End(0)).await?;
            file
        } else {
            File::create(&output_path).await?
        };

        let mut stream = response.bytes_stream();

        let expected_total = match (total_size, resume_from) {
            (Some(size), Some(partial)) => Some(size + partial),
            (Some(size), None) => Some(size),
            _ => None,
        };

        let mut last_reported = downloaded;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await?;

            // Progress once per ~4 MiB, not per chunk.
            if downloaded - last_reported >= 4 * 1024 * 1024 {
                last_reported = downloaded;
                match expected_total {
                    Some(total) => info!(
                        "Progress: {}% ({}/{} bytes)",
                        downloaded * 100 / total.max(1),
                        downloaded,
                        total
                    ),
                    None => info!("Downloaded: {} bytes", downloaded),
                }
            }
        }

        file.flush().await?;
        info!("Downloaded to: {}", output_path.display());

        Ok(())
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}
