use crate::domain::media::FetchResult;
use crate::error::PipelineError;
use crate::ports::progress::ProgressReporter;
use async_trait::async_trait;

/// Inbound side: what the chat transport asks of the service.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Fetch, check and deliver the media behind `url`.
    async fn handle(
        &self,
        url: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FetchResult, PipelineError>;

    /// Re-encode a previously sent video so the recipient's client can play it.
    async fn reprocess(
        &self,
        url: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FetchResult, PipelineError>;
}
