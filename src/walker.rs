use crate::error::AppError;
use crate::metadata::PhotoRef;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

/// Sends every photo under `container_dir` with an allowed extension, keyed
/// by its `/`-separated path relative to the container.
pub fn start_walking(
    container: &str,
    container_dir: &Path,
    allowed_extensions: &HashSet<String>,
    photos_tx: crossbeam_channel::Sender<PhotoRef>,
) -> Result<usize, AppError> {
    log::info!("Starting photo discovery in {:?}", container_dir);
    log::debug!("Configured allowed extensions: {:?}", allowed_extensions);

    let mut sent = 0;
    for entry in WalkDir::new(container_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            log::trace!("Skipping file with no extension: {:?}", path);
            continue;
        };
        if !allowed_extensions.contains(&ext.to_lowercase()) {
            log::trace!("Skipping file due to unsupported extension: {:?}", path);
            continue;
        }
        let Ok(relative) = path.strip_prefix(container_dir) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        log::debug!("Sending photo to indexer: {}", key);
        photos_tx.send(PhotoRef::new(container, key))?;
        sent += 1;
    }

    log::info!("Photo discovery complete, {} photos found.", sent);
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_photos_with_allowed_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("2024")).unwrap();
        for name in ["a.JPG", "2024/b.png", "a.JPG.meta.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let allowed: HashSet<String> = ["jpg", "png"].iter().map(|s| s.to_string()).collect();
        let (tx, rx) = crossbeam_channel::unbounded();

        let sent = start_walking("bucket1", dir.path(), &allowed, tx).unwrap();

        let photos: Vec<PhotoRef> = rx.iter().collect();
        assert_eq!(sent, 2);
        assert_eq!(
            photos,
            vec![
                PhotoRef::new("bucket1", "2024/b.png"),
                PhotoRef::new("bucket1", "a.JPG"),
            ]
        );
    }
}
