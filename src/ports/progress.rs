use crate::error::ProgressError;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Opaque id of a status message on the chat side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusHandle(pub i64);

/// A single mutable status message shown to the requester.
///
/// All three operations may report [`ProgressError::Gone`] when the message
/// was removed on the other side; callers treat that as a no-op.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn create(&self, text: &str) -> Result<StatusHandle, ProgressError>;
    async fn edit(&self, handle: StatusHandle, text: &str) -> Result<(), ProgressError>;
    async fn delete(&self, handle: StatusHandle) -> Result<(), ProgressError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    None,
    Active(StatusHandle),
}

/// The status line of one pipeline run. Owned by the run, never shared.
pub struct StatusLine<'a> {
    reporter: &'a dyn ProgressReporter,
    state: ProgressState,
}

impl<'a> StatusLine<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            state: ProgressState::None,
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Create the message on first use, edit it afterwards.
    pub async fn update(&mut self, text: &str) {
        match self.state {
            ProgressState::None => match self.reporter.create(text).await {
                Ok(handle) => self.state = ProgressState::Active(handle),
                Err(e) => warn!(error = %e, "Could not send status message"),
            },
            ProgressState::Active(handle) => match self.reporter.edit(handle, text).await {
                Ok(()) => {}
                Err(ProgressError::Gone) => {
                    debug!("Status message already gone");
                    self.state = ProgressState::None;
                }
                Err(e) => warn!(error = %e, "Could not edit status message"),
            },
        }
    }

    pub async fn clear(&mut self) {
        if let ProgressState::Active(handle) = self.state {
            match self.reporter.delete(handle).await {
                Ok(()) | Err(ProgressError::Gone) => {}
                Err(e) => warn!(error = %e, "Could not delete status message"),
            }
            self.state = ProgressState::None;
        }
    }
}
