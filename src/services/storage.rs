use crate::error::AppError;
use crate::metadata::PhotoRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Metadata entry holding operator-supplied, comma-separated labels.
pub const CUSTOM_LABELS_KEY: &str = "customlabels";

const SIDECAR_SUFFIX: &str = ".meta.json";

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Raw operator label metadata; `None` when the photo carries none.
    async fn custom_labels(&self, photo: &PhotoRef) -> Result<Option<String>, AppError>;
}

/// Photos stored as `<root>/<container>/<key>`, with user metadata in a JSON
/// sidecar `<key>.meta.json`.
pub struct LocalPhotoStore {
    root: PathBuf,
}

impl LocalPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn container_dir(&self, container: &str) -> Result<PathBuf, AppError> {
        let dir = self.root.join(safe_relative(container)?);
        Ok(dir)
    }

    pub fn photo_path(&self, photo: &PhotoRef) -> Result<PathBuf, AppError> {
        Ok(self.container_dir(&photo.container)?.join(safe_relative(&photo.object_key)?))
    }
}

fn safe_relative(part: &str) -> Result<&Path, AppError> {
    let path = Path::new(part);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if part.is_empty() || escapes {
        return Err(AppError::NotFound(part.to_string()));
    }
    Ok(path)
}

fn sidecar_path(photo_path: &Path) -> PathBuf {
    let mut name = photo_path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn custom_labels(&self, photo: &PhotoRef) -> Result<Option<String>, AppError> {
        let path = self.photo_path(photo)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(AppError::NotFound(photo.to_string()));
        }

        let sidecar = sidecar_path(&path);
        let raw = match tokio::fs::read_to_string(&sidecar).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::trace!("No metadata sidecar for {}", photo);
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Could not read metadata for {}: {}", photo, e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<HashMap<String, serde_json::Value>>(&raw) {
            Ok(metadata) => Ok(metadata
                .get(CUSTOM_LABELS_KEY)
                .and_then(|v| v.as_str())
                .map(str::to_string)),
            Err(e) => {
                log::warn!("Ignoring malformed metadata for {}: {}", photo, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LocalPhotoStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join("bucket1").join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        let store = LocalPhotoStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn reads_custom_labels_from_sidecar() {
        let (_dir, store) = store_with(&[
            ("img1.jpg", "jpeg"),
            ("img1.jpg.meta.json", r#"{"customlabels": "Alice,birthday"}"#),
        ]);

        let labels = store.custom_labels(&PhotoRef::new("bucket1", "img1.jpg")).await.unwrap();
        assert_eq!(labels.as_deref(), Some("Alice,birthday"));
    }

    #[tokio::test]
    async fn missing_or_malformed_metadata_is_none() {
        let (_dir, store) = store_with(&[
            ("plain.jpg", "jpeg"),
            ("broken.jpg", "jpeg"),
            ("broken.jpg.meta.json", "{not json"),
            ("other.jpg", "jpeg"),
            ("other.jpg.meta.json", r#"{"camera": "x100"}"#),
        ]);

        for key in ["plain.jpg", "broken.jpg", "other.jpg"] {
            let labels = store.custom_labels(&PhotoRef::new("bucket1", key)).await.unwrap();
            assert!(labels.is_none(), "{} should have no custom labels", key);
        }
    }

    #[tokio::test]
    async fn missing_photo_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let err = store
            .custom_labels(&PhotoRef::new("bucket1", "nope.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn rejects_keys_leaving_the_container() {
        let store = LocalPhotoStore::new("/photos");
        assert!(store.photo_path(&PhotoRef::new("bucket1", "../secret.jpg")).is_err());
        assert!(store.photo_path(&PhotoRef::new("bucket1", "/etc/passwd")).is_err());
        assert_eq!(
            store.photo_path(&PhotoRef::new("bucket1", "2024/img1.jpg")).unwrap(),
            PathBuf::from("/photos/bucket1/2024/img1.jpg")
        );
    }
}
