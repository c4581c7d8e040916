/// # docs-publish CLI Interface (Module)
///
/// Command parsing and orchestration for the `docs-publish` binary. Every flag can also be
/// supplied through the `INPUT_*` variable the GitHub Actions runner sets for action inputs.
///
/// All business logic (settings validation, generation, publishing) lives in
/// [`docs-publish-core`]; this module only wires the real HTTP clients into it.
///
/// [`docs-publish-core`]: ../../docs_publish_core/
use crate::github::GitHubClient;
use crate::libris::LibrisClient;
use crate::load_config::load_settings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use docs_publish_core::inputs::ActionInputs;
use docs_publish_core::pipeline::generate_and_publish;
use docs_publish_core::publish::PublishReport;

/// CLI for docs-publish: generate documentation and publish it to a branch.
#[derive(Parser)]
#[clap(
    name = "docs-publish",
    version,
    about = "Generate documentation with Libris and publish the HTML to a GitHub branch"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the documentation and commit it to the target branch
    Publish {
        /// Path to the documentation config, relative to the workspace
        #[clap(long, env = "INPUT_CONFIG")]
        config: String,
        /// Destination path of the HTML file inside the repository
        #[clap(long, env = "INPUT_OUTPUT")]
        output: String,
        /// Target branch; defaults to the branch of GITHUB_REF
        #[clap(long, env = "INPUT_BRANCH")]
        branch: Option<String>,
        /// Create a missing branch as an orphan holding only the file ("true", "1", ...)
        #[clap(long, env = "INPUT_ORPHAN")]
        orphan: Option<String>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<PublishReport> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish {
            config,
            output,
            branch,
            orphan,
        } => {
            let settings = load_settings(ActionInputs {
                config,
                output,
                branch,
                orphan,
            })?;
            tracing::info!(command = "publish", "Starting documentation publish");

            let host = GitHubClient::from_settings(&settings);
            let generator = LibrisClient::from_settings(&settings);

            match generate_and_publish(&settings, &generator, &host).await {
                Ok(report) => {
                    tracing::info!(command = "publish", ?report, "Publish complete");
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!(command = "publish", error = %e, "Publish failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

/// Escape a message for the data part of a workflow command (`::error::{data}`).
///
/// The runner reads one command per line, so line breaks and `%` must be percent-encoded.
pub fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
