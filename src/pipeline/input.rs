//! Input resolution: read a local PDF or download one from a URL.
//!
//! pdfium loads documents straight from memory, so both paths end in a byte
//! buffer; nothing is staged on disk. Whether the bytes are really a PDF is
//! the extractor's call (it reports [`crate::error::ExtractionError::Unreadable`]).

use crate::error::MindmapError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the PDF named by `input` (a path or an HTTP/HTTPS URL).
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<Vec<u8>, MindmapError> {
    if input.trim().is_empty() {
        return Err(MindmapError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, MindmapError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(MindmapError::PermissionDenied { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MindmapError::FileNotFound { path })
        }
        Err(_) if path.is_dir() => Err(MindmapError::InvalidInput {
            input: path_str.to_string(),
        }),
        Err(_) => Err(MindmapError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, MindmapError> {
    info!("Downloading PDF from: {}", url);

    if reqwest::Url::parse(url).is_err() {
        return Err(MindmapError::InvalidInput {
            input: url.to_string(),
        });
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MindmapError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let timeout_or = |e: reqwest::Error| {
        if e.is_timeout() {
            MindmapError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            MindmapError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(timeout_or)?;

    if !response.status().is_success() {
        return Err(MindmapError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(timeout_or)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
