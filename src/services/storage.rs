// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report files on local disk, served under `/uploads`.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Accepted extensions with the MIME types allowed for each.
const ALLOWED: &[(&str, &[&str])] = &[
    ("jpeg", &["image/jpeg"]),
    ("jpg", &["image/jpeg"]),
    ("png", &["image/png"]),
    ("pdf", &["application/pdf"]),
];

/// Public URL prefix for stored files.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A report file written to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ReportStorage {
    root: PathBuf,
}

impl ReportStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercased extension if both it and the declared MIME type are accepted.
    pub fn validate(original_name: &str, content_type: Option<&str>) -> Result<String, AppError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let mimes = ALLOWED
            .iter()
            .find(|(allowed, _)| *allowed == ext)
            .map(|(_, mimes)| *mimes)
            .ok_or_else(|| AppError::BadRequest("Images and PDFs only!".to_string()))?;

        match content_type {
            Some(ct) if !mimes.contains(&ct) => {
                Err(AppError::BadRequest("Images and PDFs only!".to_string()))
            }
            _ => Ok(ext),
        }
    }

    /// Write the bytes under a fresh `file-{millis}-{suffix}.{ext}` name.
    pub async fn save(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, AppError> {
        let ext = Self::validate(original_name, content_type)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cannot create upload dir: {}", e)))?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "file-{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            &suffix[..8],
            ext
        );

        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store upload: {}", e)))?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored report file");

        Ok(StoredFile {
            url: format!("{}/{}", PUBLIC_PREFIX, file_name),
            file_name,
        })
    }
}
