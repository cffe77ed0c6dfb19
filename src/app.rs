use crate::config::{process_env, EnvSource, Settings};
use crate::error::{HashError, Result};
use crate::file_ops::{guess_mime, LocalFile};
use crate::hashers::ChunkedHasher;
use crate::history::History;
use crate::models::{FileMetadata, HashRecord};
use crate::summarizer::{summarizer_from_config, SummaryRequest};
use crate::utils::format_bytes;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives one file at a time through hash then summary, and keeps the
/// session history.
pub struct FingerprintApp {
    settings: Settings,
    hasher: ChunkedHasher,
    history: History,
    progress: u8,
    is_processing: bool,
    env: EnvSource,
}

impl FingerprintApp {
    /// Fails with `AlgorithmUnavailable` if the configured algorithm is
    /// unknown, before any file is touched.
    pub fn new(settings: Settings) -> Result<Self> {
        let hasher = ChunkedHasher::from_name(&settings.algorithm)?
            .with_chunk_size(settings.chunk_size);
        Ok(FingerprintApp {
            settings,
            hasher,
            history: History::new(),
            progress: 0,
            is_processing: false,
            env: process_env(),
        })
    }

    /// Read summarizer overrides from `env` instead of the process
    /// environment.
    pub fn with_env_source(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Progress of the current (or last successful) operation.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Hash `path`, ask for a summary, and record the outcome.
    ///
    /// A hashing failure still produces a `Failed` record in the history,
    /// resets progress to zero, and is returned to the caller. Summary
    /// failures never surface here.
    pub async fn process_file<F>(
        &mut self,
        path: &Path,
        cancel: CancellationToken,
        on_progress: F,
    ) -> Result<HashRecord>
    where
        F: FnMut(u8) + Send,
    {
        self.progress = 0;
        self.is_processing = true;
        let outcome = self.run(path, cancel, on_progress).await;
        self.is_processing = false;

        match outcome {
            Ok(record) => {
                info!(file = %record.file_name, "file processed");
                self.history.push(record.clone());
                Ok(record)
            }
            Err((meta, e)) => {
                warn!(path = %path.display(), error = %e, "hashing failed");
                self.progress = 0;
                self.history
                    .push(HashRecord::failed(meta, self.hasher.algorithm(), &e));
                Err(e)
            }
        }
    }

    async fn run<F>(
        &mut self,
        path: &Path,
        cancel: CancellationToken,
        mut on_progress: F,
    ) -> core::result::Result<HashRecord, (FileMetadata, HashError)>
    where
        F: FnMut(u8) + Send,
    {
        let meta = match FileMetadata::from_path(path).await {
            Ok(meta) => meta,
            Err(e) => return Err((placeholder_meta(path), e.into())),
        };
        let mut file = match LocalFile::open(path).await {
            Ok(file) => file,
            Err(e) => return Err((meta, e.into())),
        };

        let hasher = self.hasher.clone().with_cancellation(cancel);
        let progress = &mut self.progress;
        let hashed = hasher
            .hash_with_progress(&mut file, |pct| {
                *progress = pct;
                on_progress(pct);
            })
            .await;
        drop(file);

        let digest = match hashed {
            Ok(digest) => digest,
            Err(e) => return Err((meta, e)),
        };

        // credentials are re-read for every request
        let summarizer = summarizer_from_config(&self.settings.summarizer, &(self.env)());
        let request = SummaryRequest {
            name: meta.name.clone(),
            formatted_size: format_bytes(meta.size, 2),
            mime_type: meta.mime_type.clone(),
            digest: digest.clone(),
        };
        let summary = summarizer.summarize(&request).await;

        Ok(HashRecord::success(meta, hasher.algorithm(), digest, summary))
    }
}

fn placeholder_meta(path: &Path) -> FileMetadata {
    FileMetadata {
        name: path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string(),
        size: 0,
        mime_type: guess_mime(path).to_string(),
        last_modified: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use crate::summarizer::FALLBACK_SUMMARY;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn no_env() -> EnvSource {
        Arc::new(HashMap::<String, String>::new)
    }

    fn offline_settings() -> Settings {
        let mut settings = Settings::default();
        settings.summarizer.enabled = false;
        settings
    }

    #[test]
    fn unknown_algorithm_rejected_up_front() {
        let mut settings = offline_settings();
        settings.algorithm = "crc32".to_string();
        let err = FingerprintApp::new(settings).err().unwrap();
        assert!(matches!(err, HashError::AlgorithmUnavailable { .. }));
    }

    #[tokio::test]
    async fn successful_run_records_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let mut app = FingerprintApp::new(offline_settings()).unwrap();
        let mut seen = Vec::new();
        let rec = app
            .process_file(&path, CancellationToken::new(), |p| seen.push(p))
            .await
            .unwrap();

        assert_eq!(
            rec.digest.as_deref(),
            Some("3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532")
        );
        assert_eq!(rec.file_name, "abc.txt");
        assert_eq!(rec.mime_type, "text/plain");
        assert_eq!(rec.size, 3);
        assert!(rec.summary.is_none());
        assert_eq!(seen, vec![100]);
        assert_eq!(app.progress(), 100);
        assert!(!app.is_processing());
        assert_eq!(app.history().latest().unwrap().id, rec.id);
    }

    #[tokio::test]
    async fn missing_file_records_failure_and_resets_progress() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok.bin");
        std::fs::write(&ok, vec![7u8; 10]).unwrap();

        let mut app = FingerprintApp::new(offline_settings()).unwrap();
        app.process_file(&ok, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(app.progress(), 100);

        let err = app
            .process_file(&dir.path().join("gone.bin"), CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, HashError::Io(_)));
        assert_eq!(app.progress(), 0);

        let latest = app.history().latest().unwrap();
        assert_eq!(latest.file_name, "gone.bin");
        assert!(latest.digest.is_none());
        assert!(matches!(latest.status, RecordStatus::Failed { .. }));
        assert_eq!(app.history().len(), 2);
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![1u8; 4096]).unwrap();

        let mut settings = offline_settings();
        settings.chunk_size = 1024;
        let mut app = FingerprintApp::new(settings).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = app.process_file(&path, token, |_| {}).await.unwrap_err();
        assert!(matches!(err, HashError::Cancelled));
        assert_eq!(app.progress(), 0);
        assert!(!app.history().latest().unwrap().is_success());
    }

    #[tokio::test]
    async fn summary_failure_still_yields_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{}").unwrap();

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let mut settings = Settings::default();
        settings.summarizer.api_key = Some("k".to_string());
        settings.summarizer.endpoint = server.url();
        let mut app = FingerprintApp::new(settings).unwrap().with_env_source(no_env());

        let rec = app
            .process_file(&path, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert!(rec.is_success());
        assert!(rec.digest.is_some());
        assert_eq!(rec.summary.as_deref(), Some(FALLBACK_SUMMARY));
    }

    #[tokio::test]
    async fn credentials_are_read_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"notes").unwrap();

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", mockito::Matcher::Any)
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "rotated".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Plain notes."}]}}]}"#)
            .create_async()
            .await;

        let url = server.url();
        let key = Arc::new(std::sync::Mutex::new(None::<String>));
        let current = key.clone();
        let env: EnvSource = Arc::new(move || {
            let mut env = HashMap::new();
            env.insert("FILEPRINT_SUMMARY_ENDPOINT".to_string(), url.clone());
            if let Some(k) = current.lock().unwrap().clone() {
                env.insert("GEMINI_API_KEY".to_string(), k);
            }
            env
        });
        let mut app = FingerprintApp::new(Settings::default())
            .unwrap()
            .with_env_source(env);

        let first = app
            .process_file(&path, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(first.summary.as_deref(), Some(FALLBACK_SUMMARY));

        *key.lock().unwrap() = Some("rotated".to_string());
        let second = app
            .process_file(&path, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(second.summary.as_deref(), Some("Plain notes."));
    }

    #[tokio::test]
    async fn clear_history_empties_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        std::fs::write(&path, b"x").unwrap();

        let mut app = FingerprintApp::new(offline_settings()).unwrap();
        app.process_file(&path, CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert!(!app.history().is_empty());
        app.clear_history();
        assert!(app.history().is_empty());
    }
}
