// Side-effect doubles for rule tests and workflow previews
//
// Every intent is recorded and nothing leaves the process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::collaborators::{
    EnrichmentRequest, EnrichmentRequester, IntegrationInvoker, Notification, NotificationSender,
    SideEffects,
};
use crate::error::AutomationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationCall {
    pub integration_id: String,
    pub action: String,
    pub data: serde_json::Value,
}

/// What a dry run would have done
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedIntents {
    pub notifications: Vec<Notification>,
    pub integrations: Vec<IntegrationCall>,
    pub enrichments: Vec<EnrichmentRequest>,
}

type Intents = Arc<Mutex<RecordedIntents>>;

pub struct DryRunSender(Intents);

#[async_trait]
impl NotificationSender for DryRunSender {
    async fn send(&self, notification: &Notification) -> AutomationResult<()> {
        self.0.lock().await.notifications.push(notification.clone());
        Ok(())
    }
}

pub struct DryRunInvoker(Intents);

#[async_trait]
impl IntegrationInvoker for DryRunInvoker {
    async fn invoke(
        &self,
        integration_id: &str,
        action: &str,
        data: &serde_json::Value,
    ) -> AutomationResult<serde_json::Value> {
        self.0.lock().await.integrations.push(IntegrationCall {
            integration_id: integration_id.to_string(),
            action: action.to_string(),
            data: data.clone(),
        });
        Ok(serde_json::json!({
            "dryRun": true,
            "integrationId": integration_id,
            "action": action,
        }))
    }
}

pub struct DryRunEnrichment(Intents);

#[async_trait]
impl EnrichmentRequester for DryRunEnrichment {
    async fn request(&self, request: EnrichmentRequest) -> AutomationResult<()> {
        self.0.lock().await.enrichments.push(request);
        Ok(())
    }
}

/// One dry run: hand out its side effects, read back the intents.
#[derive(Clone, Default)]
pub struct DryRun {
    intents: Intents,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side_effects(&self) -> SideEffects {
        SideEffects::new(
            Arc::new(DryRunSender(self.intents.clone())),
            Arc::new(DryRunInvoker(self.intents.clone())),
            Arc::new(DryRunEnrichment(self.intents.clone())),
        )
    }

    pub async fn intents(&self) -> RecordedIntents {
        self.intents.lock().await.clone()
    }
}
