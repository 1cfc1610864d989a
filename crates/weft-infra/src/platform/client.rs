//! REST client for the automation platform.
//!
//! Implements the collaborator contract the execution tools depend on:
//! workflow listing/creation/update, credential listing, and the node-type
//! catalog. Authentication uses the platform's API-key header; the key is
//! wrapped in [`secrecy::SecretString`].

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use weft_types::workflow::WorkflowDefinition;

use super::types::{
    CreatedWorkflow, CredentialSummary, ListEnvelope, NodeTypeDescription, WorkflowSummary,
};

/// Errors from platform API calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("authentication failed (check the platform API key)")]
    Unauthorized,

    #[error("platform returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Deserialization(String),
}

/// Client for an n8n-compatible automation platform API.
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl PlatformClient {
    /// The API-key header the platform expects.
    const API_KEY_HEADER: &'static str = "X-N8N-API-KEY";

    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// The platform's base URL (used to build credential setup links).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, PlatformError> {
        let response = self
            .client
            .get(self.url(path))
            .header(Self::API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => PlatformError::Unauthorized,
                _ => PlatformError::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }
        response
            .json()
            .await
            .map_err(|e| PlatformError::Deserialization(e.to_string()))
    }

    /// List all workflows.
    pub async fn get_workflows(&self) -> Result<Vec<WorkflowSummary>, PlatformError> {
        let envelope: ListEnvelope<WorkflowSummary> = self.get_json("/api/v1/workflows").await?;
        Ok(envelope.data)
    }

    /// Fetch one workflow as raw JSON.
    pub async fn get_workflow(&self, id: &str) -> Result<serde_json::Value, PlatformError> {
        self.get_json(&format!("/api/v1/workflows/{id}")).await
    }

    /// Create a workflow from a normalized definition.
    pub async fn create_workflow(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<CreatedWorkflow, PlatformError> {
        let response = self
            .client
            .post(self.url("/api/v1/workflows"))
            .header(Self::API_KEY_HEADER, self.api_key.expose_secret())
            .json(definition)
            .send()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    /// Replace an existing workflow's definition.
    pub async fn update_workflow(
        &self,
        id: &str,
        definition: &WorkflowDefinition,
    ) -> Result<CreatedWorkflow, PlatformError> {
        let response = self
            .client
            .put(self.url(&format!("/api/v1/workflows/{id}")))
            .header(Self::API_KEY_HEADER, self.api_key.expose_secret())
            .json(definition)
            .send()
            .await
            .map_err(|e| PlatformError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    /// List stored credentials.
    pub async fn list_credentials(&self) -> Result<Vec<CredentialSummary>, PlatformError> {
        let envelope: ListEnvelope<CredentialSummary> =
            self.get_json("/api/v1/credentials").await?;
        Ok(envelope.data)
    }

    /// Fetch the node-type catalog.
    pub async fn get_node_types(&self) -> Result<Vec<NodeTypeDescription>, PlatformError> {
        self.get_json("/types/nodes.json").await
    }
}
