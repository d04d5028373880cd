use crate::error::ProgressError;
use crate::ports::progress::{ProgressReporter, StatusHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

#[derive(Default)]
struct Transcript {
    next_id: i64,
    live: Option<StatusHandle>,
    current: Option<String>,
    lines: Vec<String>,
}

/// Keeps every status text in order; used by the HTTP inbound adapter,
/// which returns the transcript once the run is over.
#[derive(Default)]
pub struct TranscriptProgress {
    inner: Mutex<Transcript>,
}

impl TranscriptProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text ever shown, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    /// Text of the message still on screen, if any.
    pub fn current(&self) -> Option<String> {
        self.inner.lock().current.clone()
    }
}

#[async_trait]
impl ProgressReporter for TranscriptProgress {
    async fn create(&self, text: &str) -> Result<StatusHandle, ProgressError> {
        let mut t = self.inner.lock();
        t.next_id += 1;
        let handle = StatusHandle(t.next_id);
        t.live = Some(handle);
        t.current = Some(text.to_string());
        t.lines.push(text.to_string());
        info!(status = text, "Status");
        Ok(handle)
    }

    async fn edit(&self, handle: StatusHandle, text: &str) -> Result<(), ProgressError> {
        let mut t = self.inner.lock();
        if t.live != Some(handle) {
            return Err(ProgressError::Gone);
        }
        t.current = Some(text.to_string());
        t.lines.push(text.to_string());
        info!(status = text, "Status");
        Ok(())
    }

    async fn delete(&self, handle: StatusHandle) -> Result<(), ProgressError> {
        let mut t = self.inner.lock();
        if t.live != Some(handle) {
            return Err(ProgressError::Gone);
        }
        t.live = None;
        t.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transcript_records_in_order() {
        let progress = TranscriptProgress::new();
        let handle = progress.create("one").await.unwrap();
        progress.edit(handle, "two").await.unwrap();
        assert_eq!(progress.current().as_deref(), Some("two"));

        progress.delete(handle).await.unwrap();
        assert_eq!(progress.current(), None);
        assert_eq!(progress.lines(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_deleted_message_is_gone() {
        let progress = TranscriptProgress::new();
        let handle = progress.create("one").await.unwrap();
        progress.delete(handle).await.unwrap();
        assert!(matches!(progress.edit(handle, "x").await, Err(ProgressError::Gone)));
        assert!(matches!(progress.delete(handle).await, Err(ProgressError::Gone)));
    }
}
