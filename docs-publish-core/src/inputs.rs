//! Action inputs and process settings.
//!
//! Everything the runner environment provides is gathered into [`ActionSettings`] once,
//! through an injected lookup function, so the rest of the pipeline never reads the
//! process environment.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{error, info};

use crate::publish::PublishRequest;

pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const LIBRIS_API_KEY_VAR: &str = "LIBRIS_API_KEY";
pub const GITHUB_REPOSITORY_VAR: &str = "GITHUB_REPOSITORY";
pub const GITHUB_WORKSPACE_VAR: &str = "GITHUB_WORKSPACE";
pub const GITHUB_REF_VAR: &str = "GITHUB_REF";
pub const GITHUB_API_URL_VAR: &str = "GITHUB_API_URL";
pub const LIBRIS_API_URL_VAR: &str = "LIBRIS_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Define environment variable \"{0}\" using your repository secrets.")]
    MissingSecret(&'static str),

    #[error("Environment variable \"{0}\" is not set; it is provided by the workflow runner.")]
    MissingEnv(&'static str),

    #[error("Define input parameter \"{0}\" of type \"string\".")]
    MissingInput(&'static str),

    #[error("Invalid value for \"{name}\": {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Raw action inputs as the harness hands them over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInputs {
    pub config: String,
    pub output: String,
    pub branch: Option<String>,
    pub orphan: Option<String>,
}

/// Fully validated settings for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct ActionSettings {
    pub github_token: String,
    pub libris_api_key: String,
    pub owner: String,
    pub repo: String,
    pub workspace: PathBuf,
    /// Config path exactly as the user supplied it.
    pub config_path: String,
    /// Normalized destination path.
    pub output_path: String,
    pub branch: String,
    pub orphan: bool,
    pub github_api_url: Option<String>,
    pub libris_api_url: Option<String>,
}

// Keep secrets out of logs.
impl std::fmt::Debug for ActionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSettings")
            .field("github_token_set", &!self.github_token.is_empty())
            .field("libris_api_key_set", &!self.libris_api_key.is_empty())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("workspace", &self.workspace)
            .field("config_path", &self.config_path)
            .field("output_path", &self.output_path)
            .field("branch", &self.branch)
            .field("orphan", &self.orphan)
            .field("github_api_url", &self.github_api_url)
            .field("libris_api_url", &self.libris_api_url)
            .finish()
    }
}

impl ActionSettings {
    /// Validate inputs against the environment visible through `lookup`.
    ///
    /// Secrets are checked first, so a misconfigured workflow fails before anything else runs.
    pub fn resolve<F>(inputs: ActionInputs, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let github_token = required_secret(&lookup, GITHUB_TOKEN_VAR)?;
        let libris_api_key = required_secret(&lookup, LIBRIS_API_KEY_VAR)?;

        if inputs.config.trim().is_empty() {
            error!("Input parameter 'config' is empty");
            return Err(ConfigError::MissingInput("config"));
        }

        let output_path = normalize_output_path(&inputs.output);
        if output_path.is_empty() {
            error!(raw = %inputs.output, "Input parameter 'output' is empty after normalization");
            return Err(ConfigError::MissingInput("output"));
        }

        let git_ref = non_empty(&lookup, GITHUB_REF_VAR);
        let branch = resolve_branch(inputs.branch.as_deref(), git_ref.as_deref())?;
        let orphan = inputs.orphan.as_deref().map(parse_orphan).unwrap_or(false);

        let repository = non_empty(&lookup, GITHUB_REPOSITORY_VAR)
            .ok_or(ConfigError::MissingEnv(GITHUB_REPOSITORY_VAR))?;
        let (owner, repo) = parse_repository(&repository)?;

        let workspace = non_empty(&lookup, GITHUB_WORKSPACE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let settings = ActionSettings {
            github_token,
            libris_api_key,
            owner,
            repo,
            workspace,
            config_path: inputs.config,
            output_path,
            branch,
            orphan,
            github_api_url: non_empty(&lookup, GITHUB_API_URL_VAR),
            libris_api_url: non_empty(&lookup, LIBRIS_API_URL_VAR),
        };
        info!(?settings, "Action settings resolved");
        Ok(settings)
    }

    /// Config path resolved against the workspace root.
    pub fn abs_config_path(&self) -> PathBuf {
        self.workspace.join(&self.config_path)
    }

    pub fn publish_request(&self, content: Vec<u8>) -> Result<PublishRequest, ConfigError> {
        PublishRequest::new(
            &self.owner,
            &self.repo,
            &self.branch,
            &self.output_path,
            content,
            self.orphan,
        )
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty())
}

fn required_secret<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, name) {
        Some(value) => {
            info!(var = name, len = value.len(), "Secret found in env");
            Ok(value)
        }
        None => {
            error!(var = name, "Required secret missing from env");
            Err(ConfigError::MissingSecret(name))
        }
    }
}

fn duplicate_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/{2,}").expect("static regex"))
}

/// Trim the input, collapse repeated `/` and strip any leading `.` and `/` characters.
pub fn normalize_output_path(raw: &str) -> String {
    let collapsed = duplicate_separators().replace_all(raw.trim(), "/");
    collapsed
        .trim_start_matches(&['.', '/'][..])
        .to_string()
}

/// `"true"`, `"True"`, `"TRUE"` and `"1"` are truthy; anything else is false.
pub fn parse_orphan(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "True" | "TRUE" | "1")
}

/// Branch name of a `refs/heads/...` ref. Other refs are returned unchanged.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

/// Explicit input wins; otherwise fall back to the checked-out ref.
pub fn resolve_branch(input: Option<&str>, git_ref: Option<&str>) -> Result<String, ConfigError> {
    if let Some(branch) = input.map(str::trim).filter(|b| !b.is_empty()) {
        return Ok(branch.to_string());
    }
    match git_ref.map(branch_from_ref).filter(|b| !b.is_empty()) {
        Some(branch) => Ok(branch.to_string()),
        None => Err(ConfigError::Invalid {
            name: "branch",
            reason: format!("no branch given and {GITHUB_REF_VAR} does not name one"),
        }),
    }
}

/// Split `owner/repo`.
pub fn parse_repository(repository: &str) -> Result<(String, String), ConfigError> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ConfigError::Invalid {
            name: GITHUB_REPOSITORY_VAR,
            reason: format!("expected \"owner/repo\", got \"{repository}\""),
        }),
    }
}
