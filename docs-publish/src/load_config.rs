/// `load_config` module: turns the action inputs plus the runner environment into validated
/// [`ActionSettings`].
///
/// This is the only place where the CLI reads the process environment. The lookup is injectable
/// so tests can hand in a fabricated environment instead of mutating the real one.
///
/// # Errors
/// Failures are surfaced as `anyhow::Error` carrying the [`ConfigError`] message, which names the
/// missing variable or input. No network activity happens before this succeeds.
use anyhow::Result;
use docs_publish_core::inputs::{ActionInputs, ActionSettings};
use std::env;
use tracing::{error, info};

/// Resolves settings from the real process environment.
pub fn load_settings(inputs: ActionInputs) -> Result<ActionSettings> {
    load_settings_from(inputs, |name| env::var(name).ok())
}

pub fn load_settings_from<F>(inputs: ActionInputs, lookup: F) -> Result<ActionSettings>
where
    F: Fn(&str) -> Option<String>,
{
    info!(
        config = %inputs.config,
        output = %inputs.output,
        branch = ?inputs.branch,
        orphan = ?inputs.orphan,
        "Loading action settings"
    );

    match ActionSettings::resolve(inputs, lookup) {
        Ok(settings) => {
            info!(settings = ?settings, "Action settings loaded");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, "Failed to load action settings");
            Err(anyhow::anyhow!(e))
        }
    }
}
