use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::time::sleep;

use crate::config::PollConfig;
use crate::gemini::{FileProvider, FileState, ProviderError, RemoteFile};

/// Request-level failure taxonomy for the upload-and-transcribe flow. The
/// HTTP layer maps each variant to a user-facing status and message.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("error uploading file: {0}")]
    Upload(#[source] anyhow::Error),
    #[error("transcription service is currently unavailable")]
    ServiceUnavailable,
    #[error("remote processing failed; the file may be corrupt or in an unsupported format")]
    ProcessingFailed,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Phases of the status-polling state machine.
enum PollState {
    /// Job still processing; wait the fixed poll interval, then re-fetch.
    Polling,
    /// Last fetch hit a transient provider error; wait the backoff delay,
    /// then retry the fetch itself.
    Backoff,
    /// Job reached a ready state.
    Done,
    /// Job reached the remote FAILED state.
    Failed,
}

/// Drives a single uploaded file through the remote service's asynchronous
/// processing pipeline: submit, then poll until the job leaves PROCESSING.
///
/// One poller per request; handles are never shared. There is no overall
/// timeout and no mid-poll cancellation: a job that reports PROCESSING
/// forever without erroring is polled forever. Only transient (5xx) fetch
/// failures are bounded, by the retry ceiling.
pub struct RemoteJobPoller<'a, P: ?Sized> {
    provider: &'a P,
    config: PollConfig,
}

impl<'a, P: FileProvider + ?Sized> RemoteJobPoller<'a, P> {
    pub fn new(provider: &'a P, config: PollConfig) -> Self {
        Self { provider, config }
    }

    /// Spools the request body to a scoped temp file and submits it to the
    /// remote service. The temp file is removed on every exit path when the
    /// guard drops.
    pub async fn upload(
        &self,
        data: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<RemoteFile, TranscribeError> {
        let suffix = filename
            .rsplit('.')
            .next()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let spool = tempfile::Builder::new()
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| TranscribeError::Upload(e.into()))?;
        tokio::fs::write(spool.path(), data)
            .await
            .map_err(|e| TranscribeError::Upload(e.into()))?;
        debug!("spooled {} bytes to {:?}", data.len(), spool.path());

        let uploaded = self
            .provider
            .upload_file(spool.path(), filename, mime_type)
            .await
            .map_err(|e| TranscribeError::Upload(e.into()))?;

        info!("uploaded {filename} as {} ({:?})", uploaded.name, uploaded.state);
        Ok(uploaded)
    }

    /// Polls the job until it leaves PROCESSING, retrying transient status
    /// fetch failures with exponential backoff (1s, 2s, 4s) up to the
    /// configured ceiling. Returns the refreshed handle once ready.
    pub async fn await_ready(&self, uploaded: &RemoteFile) -> Result<RemoteFile, TranscribeError> {
        let mut file = self.provider.get_file(&uploaded.name).await?;
        let mut retries: u32 = 0;
        let mut state = PollState::Polling;

        loop {
            state = match state {
                PollState::Polling => match file.state {
                    FileState::Active => PollState::Done,
                    FileState::Failed => PollState::Failed,
                    FileState::Processing => {
                        debug!(
                            "{} still processing, next poll in {:?}",
                            file.name, self.config.poll_interval
                        );
                        sleep(self.config.poll_interval).await;
                        match self.fetch_counting_retries(&uploaded.name, &mut retries).await? {
                            Some(next) => {
                                file = next;
                                PollState::Polling
                            }
                            None => PollState::Backoff,
                        }
                    }
                },
                PollState::Backoff => {
                    let delay = self.config.initial_retry_delay * 2u32.pow(retries - 1);
                    warn!(
                        "transient provider error, retrying status fetch in {delay:?} (attempt {retries}/{})",
                        self.config.max_retries
                    );
                    sleep(delay).await;
                    match self.fetch_counting_retries(&uploaded.name, &mut retries).await? {
                        Some(next) => {
                            file = next;
                            PollState::Polling
                        }
                        None => PollState::Backoff,
                    }
                }
                PollState::Done => {
                    info!("{} is ready for generation", file.name);
                    return Ok(file);
                }
                PollState::Failed => {
                    error!("remote processing failed for {}", file.name);
                    return Err(TranscribeError::ProcessingFailed);
                }
            };
        }
    }

    /// One status fetch with retry accounting: success resets the counter,
    /// a transient failure under the ceiling returns `None` (caller backs
    /// off), a transient failure past the ceiling is terminal, and any
    /// other failure propagates immediately.
    async fn fetch_counting_retries(
        &self,
        name: &str,
        retries: &mut u32,
    ) -> Result<Option<RemoteFile>, TranscribeError> {
        match self.provider.get_file(name).await {
            Ok(file) => {
                *retries = 0;
                Ok(Some(file))
            }
            Err(e) if e.is_transient() => {
                *retries += 1;
                if *retries > self.config.max_retries {
                    error!(
                        "status fetch for {name} still failing after {} retries: {e}",
                        self.config.max_retries
                    );
                    Err(TranscribeError::ServiceUnavailable)
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                error!("unrecoverable error while polling {name}: {e}");
                Err(TranscribeError::Provider(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::TextChunkStream;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn remote(state: FileState) -> RemoteFile {
        RemoteFile {
            name: "files/abc123".to_string(),
            uri: "https://generativelanguage.googleapis.com/v1beta/files/abc123".to_string(),
            state,
        }
    }

    fn server_error() -> ProviderError {
        ProviderError::Status {
            endpoint: "files.get",
            status: 500,
            message: "500 Internal Server Error".to_string(),
        }
    }

    /// Scripted provider: `get_file` pops pre-arranged responses in order.
    struct MockProvider {
        statuses: Mutex<VecDeque<Result<RemoteFile, ProviderError>>>,
        seen_upload_path: Mutex<Option<(PathBuf, bool)>>,
        fail_upload: bool,
    }

    impl MockProvider {
        fn scripted(statuses: Vec<Result<RemoteFile, ProviderError>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                seen_upload_path: Mutex::new(None),
                fail_upload: false,
            }
        }
    }

    #[async_trait]
    impl FileProvider for MockProvider {
        async fn upload_file(
            &self,
            path: &Path,
            _display_name: &str,
            _mime_type: &str,
        ) -> Result<RemoteFile, ProviderError> {
            *self.seen_upload_path.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
            if self.fail_upload {
                return Err(server_error());
            }
            Ok(remote(FileState::Processing))
        }

        async fn get_file(&self, _name: &str) -> Result<RemoteFile, ProviderError> {
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra status fetch")
        }

        async fn generate_stream(
            &self,
            _file: &RemoteFile,
            _mime_type: &str,
            _prompt: &str,
        ) -> Result<TextChunkStream, ProviderError> {
            unreachable!("poller tests never generate")
        }
    }

    fn poller(provider: &MockProvider) -> RemoteJobPoller<'_, MockProvider> {
        RemoteJobPoller::new(provider, PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn two_processing_polls_then_ready() {
        let provider = MockProvider::scripted(vec![
            Ok(remote(FileState::Processing)),
            Ok(remote(FileState::Processing)),
            Ok(remote(FileState::Active)),
        ]);
        let start = Instant::now();

        let ready = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap();

        assert_eq!(ready.state, FileState::Active);
        // Exactly two 5-second poll delays, nothing else.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn three_transient_errors_back_off_then_resume() {
        let provider = MockProvider::scripted(vec![
            Ok(remote(FileState::Processing)),
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(remote(FileState::Active)),
        ]);
        let start = Instant::now();

        let ready = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap();

        assert_eq!(ready.state, FileState::Active);
        // One poll delay plus the 1s/2s/4s backoff ladder.
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 1 + 2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_consecutive_transient_error_exceeds_the_ceiling() {
        let provider = MockProvider::scripted(vec![
            Ok(remote(FileState::Processing)),
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
        ]);
        let start = Instant::now();

        let err = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::ServiceUnavailable));
        // The ceiling fires on the fourth failure, with no further backoff.
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 1 + 2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_resets_the_retry_counter() {
        let provider = MockProvider::scripted(vec![
            Ok(remote(FileState::Processing)),
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(remote(FileState::Processing)),
            Err(server_error()),
            Ok(remote(FileState::Active)),
        ]);

        let ready = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap();

        // Three failures, a success, then one more failure: the counter
        // restarted, so the ceiling never fired.
        assert_eq!(ready.state, FileState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_fetch_error_is_fatal_immediately() {
        let provider = MockProvider::scripted(vec![
            Ok(remote(FileState::Processing)),
            Err(ProviderError::Status {
                endpoint: "files.get",
                status: 403,
                message: "permission denied".to_string(),
            }),
        ]);

        let err = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::Provider(_)));
    }

    #[tokio::test]
    async fn remote_failed_state_is_processing_failed() {
        let provider = MockProvider::scripted(vec![Ok(remote(FileState::Failed))]);

        let err = poller(&provider)
            .await_ready(&remote(FileState::Processing))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscribeError::ProcessingFailed));
    }

    #[tokio::test]
    async fn upload_spools_to_a_temp_file_that_is_released() {
        let provider = MockProvider::scripted(vec![]);

        let uploaded = poller(&provider)
            .upload(b"media bytes", "talk.mp3", "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(uploaded.state, FileState::Processing);

        let (path, existed_during_upload) =
            provider.seen_upload_path.lock().unwrap().take().unwrap();
        assert!(existed_during_upload);
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
        // Guard dropped on return; the spool file is gone.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn upload_failure_is_released_and_reported() {
        let provider = MockProvider {
            statuses: Mutex::new(VecDeque::new()),
            seen_upload_path: Mutex::new(None),
            fail_upload: true,
        };

        let err = poller(&provider)
            .upload(b"media bytes", "talk.mp3", "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::Upload(_)));

        let (path, _) = provider.seen_upload_path.lock().unwrap().take().unwrap();
        assert!(!path.exists());
    }
}
