//! File and archive helpers: base64 encoding of uploads, download naming,
//! and bundling results into a single ZIP.
//!
//! "Downloading" writes into a directory chosen by the caller (the configured
//! download directory for the CLI). The HTTP API serves the same bytes instead.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Local, NaiveDate, Utc};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::models::GeneratedImage;

/// File and archive errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to extract base64 content from file.")]
    MissingContent,

    #[error("Invalid image encoding: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Download directory unavailable ({}): {source}", path.display())]
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Encode raw file bytes into the transportable text form sent to the service.
pub fn encode_file(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Encode bytes as a `data:` URL.
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, encode_file(bytes))
}

/// Strip a `data:<mime>;base64,` header, if present, leaving the base64 payload.
pub fn strip_data_url_header(encoded: &str) -> Result<&str, ArchiveError> {
    let content = if encoded.starts_with("data:") {
        encoded
            .split_once(',')
            .map(|(_, content)| content)
            .ok_or(ArchiveError::MissingContent)?
    } else {
        encoded
    };

    if content.is_empty() {
        return Err(ArchiveError::MissingContent);
    }
    Ok(content)
}

/// Decode a base64 payload (with or without a `data:` header) back to bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>, ArchiveError> {
    let content = strip_data_url_header(encoded.trim())?;
    Ok(BASE64.decode(content.as_bytes())?)
}

/// Format a date as `DDMonYYYY`, e.g. `05Mar2024`.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%d%b%Y").to_string()
}

/// The calendar date of a timestamp in the user's local time zone.
pub fn local_date(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

/// Today's local date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Name for the result at zero-based `index`, e.g. `003_05Mar2024.png`.
pub fn download_file_name(index: usize, date: NaiveDate) -> String {
    format!("{:03}_{}.png", index + 1, date_stamp(date))
}

/// Name of the bulk export, e.g. `AI_Story_05Mar2024.zip`.
pub fn archive_file_name(today: NaiveDate) -> String {
    format!("AI_Story_{}.zip", date_stamp(today))
}

/// Bundle all images into an in-memory ZIP archive.
///
/// Entries are named by position and each image's own creation date. Every
/// image is decoded before anything is returned, so a bad entry yields an
/// error and no archive at all.
pub fn bundle(images: &[GeneratedImage]) -> Result<Vec<u8>, ArchiveError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (index, image) in images.iter().enumerate() {
        let bytes = decode(&image.image_base64)?;
        let name = download_file_name(index, local_date(&image.created_at));
        zip.start_file(name, options)?;
        zip.write_all(&bytes).map_err(zip::result::ZipError::Io)?;
    }

    let cursor = zip.finish()?;
    tracing::debug!("Bundled {} image(s) into archive", images.len());
    Ok(cursor.into_inner())
}

/// Write one image into `dir` under `file_name`.
pub fn trigger_download(
    dir: &Path,
    image: &GeneratedImage,
    file_name: &str,
) -> Result<PathBuf, ArchiveError> {
    let bytes = decode(&image.image_base64)?;
    write_download(dir, file_name, &bytes)
}

/// Bundle all images and write the archive into `dir`.
pub fn bundle_and_download(
    dir: &Path,
    images: &[GeneratedImage],
    today: NaiveDate,
) -> Result<PathBuf, ArchiveError> {
    let bytes = bundle(images)?;
    write_download(dir, &archive_file_name(today), &bytes)
}

/// Write `bytes` to `dir/file_name`, removing any partial file on failure.
fn write_download(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ArchiveError> {
    ensure_dir(dir)?;

    let path = dir.join(file_name);
    if let Err(source) = fs::write(&path, bytes) {
        let _ = fs::remove_file(&path);
        return Err(ArchiveError::Write { path, source });
    }

    tracing::info!("Saved {}", path.display());
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dir).map_err(|source| ArchiveError::Unavailable {
        path: dir.to_path_buf(),
        source,
    })?;

    if !dir.is_dir() {
        return Err(ArchiveError::Unavailable {
            path: dir.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }
    Ok(())
}
