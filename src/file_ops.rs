use crate::hashers::FileSource;
use crate::models::FileMetadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const UNKNOWN_MIME: &str = "unknown";

/// A file on local disk, read by byte range.
///
/// The length is captured at open time; the file is expected not to change
/// while it is being hashed.
pub struct LocalFile {
    file: File,
    size: u64,
    position: u64,
}

impl LocalFile {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(LocalFile {
            file,
            size,
            position: 0,
        })
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset != self.position {
            self.file.seek(SeekFrom::Start(offset)).await?;
            self.position = offset;
        }
        let n = self.file.read(buf).await?;
        self.position += n as u64;
        Ok(n)
    }
}

impl FileMetadata {
    /// Collect name, size, type and modification time for `path`.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let md = tokio::fs::metadata(path).await?;
        if md.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();
        let last_modified = md.modified().ok().map(DateTime::<Utc>::from);
        Ok(FileMetadata {
            mime_type: guess_mime(path).to_string(),
            name,
            size: md.len(),
            last_modified,
        })
    }
}

/// Best-effort MIME type from the file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return UNKNOWN_MIME;
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "wasm" => "application/wasm",
        "exe" | "dll" | "bin" | "iso" => "application/octet-stream",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => UNKNOWN_MIME,
    }
}
