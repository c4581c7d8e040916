//! In-memory hosting service for deterministic scenario tests.
//!
//! [`MemoryHost`] keeps branches, commits and trees in memory and enforces the same
//! rules the real host does where the publisher depends on them: refs cannot be created
//! twice, and a file update must carry the current revision token.
//!
//! # Example
//!
//! ```
//! use docs_publish_core::memory::MemoryHost;
//! use docs_publish_core::publish::{publish, PublishRequest};
//!
//! # tokio_test_block_on(async {
//! let host = MemoryHost::new().with_branch("main", &[("README.md", b"# docs".as_slice())]);
//! let request = PublishRequest::new("acme", "docs", "gh-pages", "index.html", b"<html></html>".to_vec(), true).unwrap();
//! publish(&host, &request).await.unwrap();
//!
//! assert_eq!(host.branch_files("gh-pages"), vec!["index.html".to_string()]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::contract::{
    BranchRef, CommitRef, FileBlob, FileWrite, HostingApi, HostingError, NewCommit, TreeEntry,
    TreeRef,
};

/// In-memory host. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    inner: Arc<Mutex<MemoryHostInner>>,
}

#[derive(Debug, Default)]
struct MemoryHostInner {
    /// Branch name to head commit sha.
    branches: BTreeMap<String, String>,
    commits: HashMap<String, StoredCommit>,
    /// Tree sha to files by path.
    trees: HashMap<String, BTreeMap<String, StoredFile>>,
    next_id: u64,
    fail_on: Option<(HostOperationKind, HostingError)>,
    operations: Vec<HostOperation>,
}

#[derive(Debug, Clone)]
struct StoredCommit {
    tree_sha: String,
    parents: Vec<String>,
    message: String,
}

#[derive(Debug, Clone)]
struct StoredFile {
    revision: String,
    content: Vec<u8>,
}

/// Which trait method an operation was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOperationKind {
    GetRef,
    CreateRef,
    GetBranchHead,
    CreateTree,
    CreateCommit,
    GetFile,
    PutFile,
}

/// Recorded call, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOperation {
    GetRef { branch: String },
    CreateRef { branch: String, sha: String },
    GetBranchHead { branch: String },
    CreateTree { paths: Vec<String> },
    CreateCommit { tree_sha: String, parents: Vec<String> },
    GetFile { path: String, branch: String },
    PutFile { path: String, branch: String, prior_revision_id: Option<String> },
}

impl HostOperation {
    pub fn kind(&self) -> HostOperationKind {
        match self {
            HostOperation::GetRef { .. } => HostOperationKind::GetRef,
            HostOperation::CreateRef { .. } => HostOperationKind::CreateRef,
            HostOperation::GetBranchHead { .. } => HostOperationKind::GetBranchHead,
            HostOperation::CreateTree { .. } => HostOperationKind::CreateTree,
            HostOperation::CreateCommit { .. } => HostOperationKind::CreateCommit,
            HostOperation::GetFile { .. } => HostOperationKind::GetFile,
            HostOperation::PutFile { .. } => HostOperationKind::PutFile,
        }
    }
}

fn not_found(what: impl Into<String>) -> HostingError {
    HostingError::NotFound(what.into())
}

fn unprocessable(message: impl Into<String>) -> HostingError {
    HostingError::Rejected {
        status: 422,
        message: message.into(),
    }
}

impl MemoryHost {
    /// An empty host with no branches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch whose head is a root commit holding `files`.
    pub fn with_branch(self, name: &str, files: &[(&str, &[u8])]) -> Self {
        {
            let mut inner = self.state();
            let mut tree = BTreeMap::new();
            for (path, content) in files {
                let revision = inner.next_sha("blob");
                tree.insert(
                    path.to_string(),
                    StoredFile {
                        revision,
                        content: content.to_vec(),
                    },
                );
            }
            let tree_sha = inner.next_sha("tree");
            inner.trees.insert(tree_sha.clone(), tree);
            let commit_sha = inner.next_sha("commit");
            inner.commits.insert(
                commit_sha.clone(),
                StoredCommit {
                    tree_sha,
                    parents: Vec::new(),
                    message: "Initial commit".to_string(),
                },
            );
            inner.branches.insert(name.to_string(), commit_sha);
        }
        self
    }

    /// Make every call of `kind` fail with `error`.
    pub fn fail_on(self, kind: HostOperationKind, error: HostingError) -> Self {
        self.state().fail_on = Some((kind, error));
        self
    }

    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    pub fn operations(&self) -> Vec<HostOperation> {
        self.state().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Number of recorded calls of `kind`.
    pub fn count(&self, kind: HostOperationKind) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    pub fn branch_head(&self, branch: &str) -> Option<String> {
        self.state().branches.get(branch).cloned()
    }

    pub fn commit_parents(&self, sha: &str) -> Option<Vec<String>> {
        self.state().commits.get(sha).map(|c| c.parents.clone())
    }

    pub fn commit_message(&self, sha: &str) -> Option<String> {
        self.state().commits.get(sha).map(|c| c.message.clone())
    }

    /// Paths present at the head of `branch`, sorted.
    pub fn branch_files(&self, branch: &str) -> Vec<String> {
        let inner = self.state();
        inner
            .head_tree(branch)
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn file_content(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let inner = self.state();
        inner
            .head_tree(branch)
            .and_then(|tree| tree.get(path))
            .map(|file| file.content.clone())
    }

    fn state(&self) -> MutexGuard<'_, MemoryHostInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and return the configured failure, if any.
    fn enter(&self, op: HostOperation) -> Result<MutexGuard<'_, MemoryHostInner>, HostingError> {
        let mut inner = self.state();
        let kind = op.kind();
        inner.operations.push(op);
        let failure = match &inner.fail_on {
            Some((failing, error)) if *failing == kind => Some(error.clone()),
            _ => None,
        };
        match failure {
            Some(error) => Err(error),
            None => Ok(inner),
        }
    }
}

impl MemoryHostInner {
    fn next_sha(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn head_tree(&self, branch: &str) -> Option<&BTreeMap<String, StoredFile>> {
        let head = self.branches.get(branch)?;
        let commit = self.commits.get(head)?;
        self.trees.get(&commit.tree_sha)
    }
}

fn invalid_content(e: base64::DecodeError) -> HostingError {
    unprocessable(format!("content is not valid Base64: {e}"))
}

#[async_trait]
impl HostingApi for MemoryHost {
    async fn get_ref(&self, branch: &str) -> Result<BranchRef, HostingError> {
        let inner = self.enter(HostOperation::GetRef {
            branch: branch.to_string(),
        })?;
        match inner.branches.get(branch) {
            Some(head) => Ok(BranchRef {
                name: branch.to_string(),
                head_commit_sha: head.clone(),
            }),
            None => Err(not_found(format!("refs/heads/{branch}"))),
        }
    }

    async fn create_ref(&self, branch: &str, sha: &str) -> Result<BranchRef, HostingError> {
        let mut inner = self.enter(HostOperation::CreateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
        })?;
        if inner.branches.contains_key(branch) {
            return Err(unprocessable("Reference already exists"));
        }
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist"));
        }
        inner.branches.insert(branch.to_string(), sha.to_string());
        Ok(BranchRef {
            name: branch.to_string(),
            head_commit_sha: sha.to_string(),
        })
    }

    async fn get_branch_head(&self, branch: &str) -> Result<CommitRef, HostingError> {
        let inner = self.enter(HostOperation::GetBranchHead {
            branch: branch.to_string(),
        })?;
        inner
            .branches
            .get(branch)
            .map(|sha| CommitRef { sha: sha.clone() })
            .ok_or_else(|| not_found(format!("refs/heads/{branch}")))
    }

    async fn create_tree(&self, entries: Vec<TreeEntry>) -> Result<TreeRef, HostingError> {
        let mut inner = self.enter(HostOperation::CreateTree {
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        })?;
        let mut tree = BTreeMap::new();
        for entry in entries {
            let content = entry.decoded_content().map_err(invalid_content)?;
            let revision = inner.next_sha("blob");
            tree.insert(entry.path, StoredFile { revision, content });
        }
        let sha = inner.next_sha("tree");
        inner.trees.insert(sha.clone(), tree);
        Ok(TreeRef { sha })
    }

    async fn create_commit(&self, commit: NewCommit) -> Result<CommitRef, HostingError> {
        let mut inner = self.enter(HostOperation::CreateCommit {
            tree_sha: commit.tree_sha.clone(),
            parents: commit.parents.clone(),
        })?;
        if !inner.trees.contains_key(&commit.tree_sha) {
            return Err(unprocessable("Tree SHA does not exist"));
        }
        if let Some(missing) = commit.parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(unprocessable(format!("Parent SHA {missing} does not exist")));
        }
        let sha = inner.next_sha("commit");
        inner.commits.insert(
            sha.clone(),
            StoredCommit {
                tree_sha: commit.tree_sha,
                parents: commit.parents,
                message: commit.message,
            },
        );
        Ok(CommitRef { sha })
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<FileBlob, HostingError> {
        let inner = self.enter(HostOperation::GetFile {
            path: path.to_string(),
            branch: branch.to_string(),
        })?;
        let tree = inner
            .head_tree(branch)
            .ok_or_else(|| not_found(format!("No commit found for the ref {branch}")))?;
        let file = tree.get(path).ok_or_else(|| not_found(path.to_string()))?;
        Ok(FileBlob {
            path: path.to_string(),
            prior_revision_id: Some(file.revision.clone()),
            base64_content: STANDARD.encode(&file.content),
        })
    }

    async fn put_file(&self, write: FileWrite) -> Result<FileBlob, HostingError> {
        let mut inner = self.enter(HostOperation::PutFile {
            path: write.blob.path.clone(),
            branch: write.branch.clone(),
            prior_revision_id: write.blob.prior_revision_id.clone(),
        })?;
        let head = inner
            .branches
            .get(&write.branch)
            .cloned()
            .ok_or_else(|| not_found(format!("Branch {} not found", write.branch)))?;
        let mut tree = inner.head_tree(&write.branch).cloned().unwrap_or_default();

        let current = tree.get(&write.blob.path).map(|f| f.revision.clone());
        match (current.as_deref(), write.blob.prior_revision_id.as_deref()) {
            (None, None) => {}
            (Some(current), Some(token)) if current == token => {}
            (Some(_), None) => return Err(unprocessable("\"sha\" wasn't supplied.")),
            (_, Some(token)) => {
                return Err(HostingError::Rejected {
                    status: 409,
                    message: format!("{} does not match {token}", write.blob.path),
                })
            }
        }

        let content = write.blob.decoded_content().map_err(invalid_content)?;
        let revision = inner.next_sha("blob");
        tree.insert(
            write.blob.path.clone(),
            StoredFile {
                revision: revision.clone(),
                content,
            },
        );
        let tree_sha = inner.next_sha("tree");
        inner.trees.insert(tree_sha.clone(), tree);
        let commit_sha = inner.next_sha("commit");
        inner.commits.insert(
            commit_sha.clone(),
            StoredCommit {
                tree_sha,
                parents: vec![head],
                message: write.message,
            },
        );
        inner.branches.insert(write.branch, commit_sha);

        Ok(FileBlob {
            path: write.blob.path,
            prior_revision_id: Some(revision),
            base64_content: write.blob.base64_content,
        })
    }
}
