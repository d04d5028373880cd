use crate::domain::media::MediaKind;
use crate::error::DeliveryError;
use crate::ports::delivery::{Delivery, Outbound};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Serialize)]
struct Manifest<'a> {
    kind: MediaKind,
    caption: Option<&'a str>,
    files: Vec<String>,
}

/// Drops each artifact into `<root>/<uuid>/` together with a `message.json`
/// describing how it would be sent.
#[derive(Clone, Debug)]
pub struct OutboxDelivery {
    root: PathBuf,
}

impl OutboxDelivery {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Delivery for OutboxDelivery {
    async fn send(&self, outbound: &Outbound) -> Result<(), DeliveryError> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let mut names = Vec::with_capacity(outbound.files.len());
        for file in &outbound.files {
            let name = file
                .file_name()
                .ok_or_else(|| DeliveryError::Transport(format!("{:?} has no file name", file)))?;
            tokio::fs::copy(file, dir.join(name)).await?;
            names.push(name.to_string_lossy().into_owned());
        }

        let manifest = Manifest {
            kind: outbound.kind,
            caption: outbound.caption.as_deref(),
            files: names,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        tokio::fs::write(dir.join("message.json"), json).await?;

        info!(kind = ?outbound.kind, files = outbound.files.len(), dir = ?dir, "Delivered to outbox");
        Ok(())
    }
}
