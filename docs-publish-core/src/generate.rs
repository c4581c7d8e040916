//! Generation step: load the user's documentation config and ask the generator for HTML.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::config::DocConfig;
use crate::contract::DocGenerator;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Defined config path \"{configured}\" does not exist (full path {}). Current working directory: \n{listing}", absolute.display())]
    ConfigMissing {
        configured: String,
        absolute: PathBuf,
        listing: String,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Documentation generator failed: {0}")]
    Generator(String),

    #[error("Documentation generator returned no HTML")]
    MissingHtml,
}

/// Runs the generation step and returns the generated HTML.
///
/// `configured` is the path as the user wrote it; it only appears in diagnostics.
pub async fn generate_html<G>(
    generator: &G,
    config_path: &Path,
    configured: &str,
) -> Result<String, GenerateError>
where
    G: DocGenerator + ?Sized,
{
    info!(config_path = %config_path.display(), "[GENERATE] Generating documentation");

    if !config_path.exists() {
        let listing = working_dir_listing();
        error!(
            config_path = %config_path.display(),
            configured = configured,
            "[GENERATE][ERROR] Config path does not exist"
        );
        return Err(GenerateError::ConfigMissing {
            configured: configured.to_string(),
            absolute: config_path.to_path_buf(),
            listing,
        });
    }

    let mut config = DocConfig::load(config_path).map_err(|e| {
        error!(error = %e, "[GENERATE][ERROR] Failed to load config");
        e
    })?;
    config.trace_loaded();
    config.reset_output();

    let docs = generator.generate(&config, true).await.map_err(|e| {
        error!(error = %e, "[GENERATE][ERROR] Generator call failed");
        e
    })?;

    match docs.html {
        Some(html) => {
            info!(html_len = html.len(), "[GENERATE] Documentation generated");
            Ok(html)
        }
        None => {
            error!("[GENERATE][ERROR] Generator response carried no HTML");
            Err(GenerateError::MissingHtml)
        }
    }
}

/// One ` - name` line per entry of the current working directory.
fn working_dir_listing() -> String {
    let entries = std::env::current_dir().and_then(fs::read_dir);
    match entries {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| format!(" - {}", entry.file_name().to_string_lossy()))
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!(" (unable to list: {e})"),
    }
}
