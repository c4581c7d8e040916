//! Libris API client: implements [`DocGenerator`] over HTTP.
//!
//! The generator is opaque to the rest of the pipeline. This client posts the loaded config
//! together with the API key and reads back the rendered HTML.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use docs_publish_core::config::DocConfig;
use docs_publish_core::contract::{DocGenerator, GeneratedDocs};
use docs_publish_core::generate::GenerateError;
use docs_publish_core::inputs::ActionSettings;

/// Default Libris API base URL.
pub const DEFAULT_LIBRIS_API_BASE: &str = "https://api.libris.dev/v1";

pub struct LibrisClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl std::fmt::Debug for LibrisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibrisClient")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    api_key: &'a str,
    config: &'a Value,
    html: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LibrisErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

impl LibrisClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ActionSettings) -> Self {
        let client = Self::new(
            &settings.libris_api_key,
            settings
                .libris_api_url
                .as_deref()
                .unwrap_or(DEFAULT_LIBRIS_API_BASE),
        );
        tracing::info!(
            api_key_set = !client.api_key.is_empty(),
            api_base = %client.api_base,
            "Initialized LibrisClient from settings"
        );
        client
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.api_base)
    }
}

#[async_trait]
impl DocGenerator for LibrisClient {
    async fn generate(
        &self,
        config: &DocConfig,
        with_html: bool,
    ) -> Result<GeneratedDocs, GenerateError> {
        let url = self.generate_url();
        tracing::info!(%url, with_html, "Requesting documentation from Libris");

        let body = GenerateBody {
            api_key: &self.api_key,
            config: config.as_json(),
            html: with_html,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Libris request failed");
                GenerateError::Generator(format!("request to {url} failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<LibrisErrorResponse>().await {
                Ok(err) => err.message,
                Err(_) => "Unknown error".to_string(),
            };
            tracing::error!(status = status.as_u16(), %message, "Libris returned an error");
            return Err(GenerateError::Generator(format!(
                "Libris API returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to decode Libris response");
            GenerateError::Generator(format!("invalid response body: {e}"))
        })?;
        tracing::info!(
            html_bytes = parsed.html.as_ref().map(|h| h.len()).unwrap_or(0),
            "Libris generation finished"
        );
        Ok(GeneratedDocs { html: parsed.html })
    }
}
