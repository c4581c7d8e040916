//! High-level pipeline: generate → publish for one action run.
//!
//! Takes already validated [`ActionSettings`] plus the two collaborators, so the whole run can be
//! exercised with mocks. The first fatal error aborts the run and is returned once.

use thiserror::Error;
use tracing::{error, info};

use crate::contract::{DocGenerator, HostingApi};
use crate::generate::{generate_html, GenerateError};
use crate::inputs::{ActionSettings, ConfigError};
use crate::publish::{publish, PublishError, PublishReport};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub async fn generate_and_publish<G, H>(
    settings: &ActionSettings,
    generator: &G,
    host: &H,
) -> Result<PublishReport, ActionError>
where
    G: DocGenerator + ?Sized,
    H: HostingApi + ?Sized,
{
    info!(
        owner = %settings.owner,
        repo = %settings.repo,
        branch = %settings.branch,
        output = %settings.output_path,
        "[RUN] Starting documentation publish"
    );

    let html = generate_html(generator, &settings.abs_config_path(), &settings.config_path)
        .await
        .map_err(|e| {
            error!(error = %e, "[RUN][ERROR] Generation step failed");
            e
        })?;

    let request = settings.publish_request(html.into_bytes())?;
    let report = publish(host, &request).await.map_err(|e| {
        error!(error = %e, "[RUN][ERROR] Publish step failed");
        e
    })?;

    info!(?report, "[RUN] Documentation published");
    Ok(report)
}
