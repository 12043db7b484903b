use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::automation::{EnrichmentRequest, EnrichmentRequester, IntegrationInvoker};
use crate::error::{AutomationError, AutomationResult};

const QUEUE_CAPACITY: usize = 1024;

/// Accepts enrichment requests onto a bounded channel. A background worker
/// forwards them to the enrichment integration; callers never wait for it.
#[derive(Debug, Clone)]
pub struct ChannelEnrichmentQueue {
    sender: mpsc::Sender<EnrichmentRequest>,
}

impl ChannelEnrichmentQueue {
    pub fn spawn(invoker: Arc<dyn IntegrationInvoker>, integration_id: String) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(invoker, integration_id, QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        invoker: Arc<dyn IntegrationInvoker>,
        integration_id: String,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(receiver, invoker, integration_id));
        (Self { sender }, worker)
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<EnrichmentRequest>,
    invoker: Arc<dyn IntegrationInvoker>,
    integration_id: String,
) {
    info!("Enrichment worker started");

    while let Some(request) = receiver.recv().await {
        let data = serde_json::json!({
            "leadId": request.lead_id,
            "provider": request.provider,
            "metadata": request.metadata,
        });

        match invoker.invoke(&integration_id, &request.provider, &data).await {
            Ok(_) => info!("Enrichment via {} requested for lead {}", request.provider, request.lead_id),
            Err(e) => error!("Enrichment for lead {} failed: {}", request.lead_id, e),
        }
    }

    info!("Enrichment worker stopped");
}

#[async_trait]
impl EnrichmentRequester for ChannelEnrichmentQueue {
    async fn request(&self, request: EnrichmentRequest) -> AutomationResult<()> {
        self.sender
            .try_send(request)
            .map_err(|e| AutomationError::Enrichment(e.to_string()))
    }
}
