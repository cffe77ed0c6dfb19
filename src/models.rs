use crate::error::HashError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Algorithm {
    #[default]
    Sha3_256,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Sha3_256 => "SHA3-256",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha3-256" | "sha3_256" | "sha3256" => Ok(Algorithm::Sha3_256),
            _ => Err(HashError::AlgorithmUnavailable { name: s.to_string() }),
        }
    }
}

/// What the caller knows about a file before any bytes are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed { reason: String },
}

/// One processed file. Built once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashRecord {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub last_modified: Option<DateTime<Utc>>,
    pub algorithm: Algorithm,
    pub digest: Option<String>,
    pub status: RecordStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
}

impl HashRecord {
    pub fn success(
        meta: FileMetadata,
        algorithm: Algorithm,
        digest: String,
        summary: Option<String>,
    ) -> Self {
        Self::build(meta, algorithm, Some(digest), RecordStatus::Success, summary)
    }

    pub fn failed(meta: FileMetadata, algorithm: Algorithm, reason: impl fmt::Display) -> Self {
        let status = RecordStatus::Failed {
            reason: reason.to_string(),
        };
        Self::build(meta, algorithm, None, status, None)
    }

    fn build(
        meta: FileMetadata,
        algorithm: Algorithm,
        digest: Option<String>,
        status: RecordStatus,
        summary: Option<String>,
    ) -> Self {
        HashRecord {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: meta.name,
            size: meta.size,
            mime_type: meta.mime_type,
            last_modified: meta.last_modified,
            algorithm,
            digest,
            status,
            created_at: Utc::now(),
            summary,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}
