#![allow(unused)]

//! # contract: collaborator interfaces for generation and publishing
//!
//! This module defines the two traits the pipeline talks to:
//! - [`HostingApi`]: the seven source-control hosting calls the publisher needs
//!   (read ref, create ref, read branch head, create tree, create commit, read file, write file).
//! - [`DocGenerator`]: the opaque documentation generator that turns a config into HTML.
//!
//! ## Error classification
//! Hosting calls return a closed [`HostingError`]. Exactly one variant,
//! [`HostingError::NotFound`], is a branching signal for the publisher; every other
//! variant is fatal and travels up unchanged.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` (`MockHostingApi`, `MockDocGenerator`).
//! - [`crate::memory::MemoryHost`] is a stateful in-memory [`HostingApi`] for scenario tests.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use mockall::{automock, predicate::*};

use crate::config::DocConfig;
use crate::generate::GenerateError;

/// Errors from hosting API operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostingError {
    /// The requested ref, commit or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid or expired token, or insufficient permissions.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The host refused the write (validation failure, stale revision token, ref already exists).
    #[error("rejected by host ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Any other unsuccessful API response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl HostingError {
    /// True for the single recoverable condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostingError::NotFound(_))
    }
}

/// A named branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub head_commit_sha: String,
}

/// A commit created on, or read from, the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
}

/// A tree created on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRef {
    pub sha: String,
}

/// Regular (non-executable) file mode for tree entries.
pub const BLOB_MODE: &str = "100644";

/// One blob to place in a new tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    pub base64_content: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, content: &[u8]) -> Self {
        Self {
            path: path.into(),
            mode: BLOB_MODE.to_string(),
            base64_content: STANDARD.encode(content),
        }
    }

    pub fn decoded_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        decode_payload(&self.base64_content)
    }
}

/// Minimal data needed to create a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub message: String,
    pub tree_sha: String,
    /// Empty for a root (orphan) commit.
    pub parents: Vec<String>,
}

/// A file at a path on a branch.
///
/// When read from the host, `prior_revision_id` holds the current revision token.
/// When written, it is the token to replace; `None` asks the host to create the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub path: String,
    pub prior_revision_id: Option<String>,
    pub base64_content: String,
}

impl FileBlob {
    pub fn new(path: impl Into<String>, content: &[u8], prior_revision_id: Option<String>) -> Self {
        Self {
            path: path.into(),
            prior_revision_id,
            base64_content: STANDARD.encode(content),
        }
    }

    /// Decoded file bytes. Tolerates the line breaks some hosts insert into base64 payloads.
    pub fn decoded_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        decode_payload(&self.base64_content)
    }
}

fn decode_payload(base64_content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = base64_content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

/// A create-or-update write of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub branch: String,
    pub message: String,
    pub blob: FileBlob,
}

/// Trait for the hosting service calls the publisher is allowed to make.
///
/// Implemented by the real GitHub client, by `MockHostingApi` and by
/// [`crate::memory::MemoryHost`]. All calls are awaited one at a time by the publisher.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Read `refs/heads/{branch}`.
    async fn get_ref(&self, branch: &str) -> Result<BranchRef, HostingError>;

    /// Create `refs/heads/{branch}` pointing at `sha`.
    async fn create_ref(&self, branch: &str, sha: &str) -> Result<BranchRef, HostingError>;

    /// Read the head commit of an existing branch.
    async fn get_branch_head(&self, branch: &str) -> Result<CommitRef, HostingError>;

    /// Create a tree containing exactly the given entries (no base tree).
    async fn create_tree(&self, entries: Vec<TreeEntry>) -> Result<TreeRef, HostingError>;

    /// Create a commit object.
    async fn create_commit(&self, commit: NewCommit) -> Result<CommitRef, HostingError>;

    /// Read a file's metadata and content at `path` on `branch`.
    async fn get_file(&self, path: &str, branch: &str) -> Result<FileBlob, HostingError>;

    /// Create or update a file. Returns the stored blob with its new revision token.
    async fn put_file(&self, write: FileWrite) -> Result<FileBlob, HostingError>;
}

/// Output of the documentation generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedDocs {
    pub html: Option<String>,
}

/// Trait for the opaque documentation generator.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocGenerator: Send + Sync {
    /// Generate documentation for a loaded config, asking for inline HTML when `with_html` is set.
    async fn generate(
        &self,
        config: &DocConfig,
        with_html: bool,
    ) -> Result<GeneratedDocs, GenerateError>;
}
