//! Transcript persistence for tool operations.
//!
//! Adapters hand a finished transcript to an [`ArtifactStore`]; the
//! store decides where it lands. Saving is always best effort from the
//! tool's point of view.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// A human-readable record of one tool operation.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub request_id: String,
    pub file_name: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the artifact, returning where it was stored.
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf, ArtifactError>;
}

/// Writes artifacts to `<root>/<request_id>/<file_name>`, creating
/// parent directories as needed.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the target path and verify no component escapes the root.
    fn resolve(&self, artifact: &Artifact) -> Result<PathBuf, ArtifactError> {
        for part in [&artifact.request_id, &artifact.file_name] {
            if part.is_empty() || part.contains("..") || part.contains('/') || part.contains('\\') {
                return Err(ArtifactError::InvalidPath(part.clone()));
            }
        }
        Ok(self.root.join(&artifact.request_id).join(&artifact.file_name))
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf, ArtifactError> {
        let path = self.resolve(artifact)?;

        debug!(
            path = %path.display(),
            bytes = artifact.content.len(),
            description = %artifact.description,
            "writing artifact"
        );

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArtifactError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, &artifact.content)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

/// Replace every run of path-hostile characters or whitespace with `_`.
pub fn safe_file_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        let hostile = matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_whitespace();
        if hostile {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
