use crate::domain::media::MediaKind;
use crate::error::DeliveryError;
use async_trait::async_trait;
use std::path::PathBuf;

/// An artifact ready for the chat transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub kind: MediaKind,
    pub files: Vec<PathBuf>,
    /// Already cut to the transport's caption limit
    pub caption: Option<String>,
}

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, outbound: &Outbound) -> Result<(), DeliveryError>;
}
