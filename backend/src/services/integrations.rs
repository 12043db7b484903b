use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::automation::IntegrationInvoker;
use crate::config::IntegrationConfig;
use crate::error::{AutomationError, AutomationResult};

/// Calls integrations over HTTP: `POST {base_url}/integrations/{id}/{action}`
/// with the step data as JSON body.
#[derive(Debug, Clone)]
pub struct HttpIntegrationInvoker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIntegrationInvoker {
    pub fn new(config: &IntegrationConfig) -> AutomationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AutomationError::Integration {
                integration: "http".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, integration_id: &str, action: &str) -> String {
        format!("{}/integrations/{}/{}", self.base_url, integration_id, action)
    }
}

#[async_trait]
impl IntegrationInvoker for HttpIntegrationInvoker {
    async fn invoke(
        &self,
        integration_id: &str,
        action: &str,
        data: &serde_json::Value,
    ) -> AutomationResult<serde_json::Value> {
        let failed = |message: String| AutomationError::Integration {
            integration: integration_id.to_string(),
            message,
        };

        let url = self.url(integration_id, action);
        debug!("Invoking integration {} action {} at {}", integration_id, action, url);

        let response = self
            .client
            .post(&url)
            .json(data)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| failed(e.to_string()))?;

        if !status.is_success() {
            warn!("Integration {} action {} returned {}", integration_id, action, status);
            return Err(failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        // Non-JSON bodies are kept as text
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| {
            serde_json::json!({
                "status_code": status.as_u16(),
                "response_body": body,
            })
        }))
    }
}
