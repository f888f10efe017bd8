// Comment repository
//
// One `<videoName>.json` document per video under the comments root:
// {"comments": [...]}. Saves append to whatever is already there.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use walkdir::WalkDir;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StoredComments {
    #[serde(default)]
    pub comments: Vec<Value>,
}

/// Every stored video, keyed by video name.
pub type CommentIndex = BTreeMap<String, StoredComments>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create comments directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read existing comments from {path:?}: {reason}")]
    ReadExisting { path: PathBuf, reason: String },
    #[error("failed to save comments to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read comments from {path:?}: {reason}")]
    ReadIndex { path: PathBuf, reason: String },
}

impl StorageError {
    /// Message safe to hand back to HTTP clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            StorageError::CreateDir { .. } => "Failed to create comments directory",
            StorageError::ReadExisting { .. } => "Failed to read existing comments",
            StorageError::Write { .. } => "Failed to save comments",
            StorageError::ReadIndex { .. } => "Failed to read comments",
        }
    }
}

/// Video names become file names, so anything that could escape the
/// comments root is refused.
pub fn is_valid_video_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
        && !name.starts_with('.')
}

pub struct CommentRepository {
    root: PathBuf,
    /// Serializes read-modify-write cycles so concurrent saves never drop comments.
    write_lock: Mutex<()>,
}

impl CommentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, video_name: &str) -> PathBuf {
        self.root.join(format!("{}.json", video_name))
    }

    fn read_document(path: &Path) -> Result<StoredComments, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    /// Append `comments` to the video's document. Returns the stored total.
    pub async fn append(&self, video_name: &str, comments: Vec<Value>) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;

        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|source| StorageError::CreateDir {
                path: self.root.clone(),
                source,
            })?;
            tracing::info!("Created comments directory {:?}", self.root);
        }

        let path = self.file_path(video_name);
        let mut document = if path.exists() {
            Self::read_document(&path).map_err(|reason| StorageError::ReadExisting {
                path: path.clone(),
                reason,
            })?
        } else {
            tracing::debug!("No existing comments for {}", video_name);
            StoredComments::default()
        };

        let added = comments.len();
        document.comments.extend(comments);

        let content = serde_json::to_string_pretty(&document).map_err(|e| StorageError::Write {
            path: path.clone(),
            source: e.into(),
        })?;
        fs::write(&path, content).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Appended {} comments for {} ({} stored)",
            added,
            video_name,
            document.comments.len()
        );
        Ok(document.comments.len())
    }

    pub fn load(&self, video_name: &str) -> Result<StoredComments, StorageError> {
        let path = self.file_path(video_name);
        if !path.exists() {
            return Ok(StoredComments::default());
        }
        Self::read_document(&path).map_err(|reason| StorageError::ReadIndex { path, reason })
    }

    pub fn load_index(&self) -> Result<CommentIndex, StorageError> {
        let mut index = CommentIndex::new();
        if !self.root.exists() {
            return Ok(index);
        }

        let documents = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            });

        for entry in documents {
            let path = entry.path();
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let document = Self::read_document(path).map_err(|reason| StorageError::ReadIndex {
                path: path.to_path_buf(),
                reason,
            })?;
            index.insert(name.to_string(), document);
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_name_validation() {
        assert!(is_valid_video_name("match_final"));
        assert!(is_valid_video_name("video_20240309_140507"));
        assert!(!is_valid_video_name(""));
        assert!(!is_valid_video_name("../etc/passwd"));
        assert!(!is_valid_video_name("a/b"));
        assert!(!is_valid_video_name("a\\b"));
        assert!(!is_valid_video_name(".hidden"));
    }

    #[tokio::test]
    async fn test_append_accumulates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CommentRepository::new(dir.path().join("comment-json"));

        let total = repo.append("clip", vec![json!({"text": "a"})]).await.unwrap();
        assert_eq!(total, 1);
        let total = repo
            .append("clip", vec![json!({"text": "b"}), json!({"text": "c"})])
            .await
            .unwrap();
        assert_eq!(total, 3);

        let stored = repo.load("clip").unwrap();
        let texts: Vec<&str> = stored
            .comments
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        let raw = fs::read_to_string(repo.root().join("clip.json")).unwrap();
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["comments"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_index_covers_every_video() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CommentRepository::new(dir.path());
        repo.append("one", vec![json!({"text": "x"})]).await.unwrap();
        repo.append("two", vec![json!({"text": "y"})]).await.unwrap();
        fs::write(dir.path().join("readme.txt"), "not comments").unwrap();

        let index = repo.load_index().unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(index["two"].comments[0]["text"], "y");
    }

    #[test]
    fn test_missing_root_is_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CommentRepository::new(dir.path().join("nope"));
        assert!(repo.load_index().unwrap().is_empty());
        assert!(repo.load("anything").unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CommentRepository::new(dir.path());
        fs::write(dir.path().join("clip.json"), "{ not json").unwrap();

        let err = repo.append("clip", vec![json!({"text": "a"})]).await.unwrap_err();
        assert!(matches!(err, StorageError::ReadExisting { .. }));
        assert_eq!(err.public_message(), "Failed to read existing comments");
        assert_eq!(
            fs::read_to_string(dir.path().join("clip.json")).unwrap(),
            "{ not json"
        );
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = std::sync::Arc::new(CommentRepository::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.append("shared", vec![json!({"text": format!("c{}", i)})])
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(repo.load("shared").unwrap().comments.len(), 8);
    }
}
