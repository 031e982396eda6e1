use crate::config::StorageConfig;
use std::io;
use std::path::{Path, PathBuf};

/// Upload and result directories on local disk. Files are never cleaned up.
#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
    result_dir: PathBuf,
    plotted_dir: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            result_dir: config.result_dir.clone(),
            plotted_dir: config.plotted_dir.clone(),
        }
    }

    /// Create the three directories if they don't already exist.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.upload_dir, &self.result_dir, &self.plotted_dir] {
            std::fs::create_dir_all(dir)?;
            tracing::debug!(dir = %dir.display(), "Storage directory ready");
        }
        Ok(())
    }

    pub fn upload_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }

    pub fn mask_path(&self, stem: &str) -> (String, PathBuf) {
        let name = mask_file_name(stem);
        let path = self.result_dir.join(&name);
        (name, path)
    }

    pub fn plotted_path(&self, stem: &str) -> (String, PathBuf) {
        let name = plotted_file_name(stem);
        let path = self.plotted_dir.join(&name);
        (name, path)
    }

    /// Look a processed file up by bare name, masks first, then overlays.
    pub async fn find_processed(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_file_name(name) {
            return None;
        }

        for dir in [&self.result_dir, &self.plotted_dir] {
            let candidate = dir.join(name);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Reduce a client-supplied file name to its last path component.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    is_plain_file_name(name).then(|| name.to_string())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

pub fn mask_file_name(stem: &str) -> String {
    format!("mask_{stem}.png")
}

pub fn plotted_file_name(stem: &str) -> String {
    format!("plotted_{stem}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path) -> Storage {
        Storage::new(&StorageConfig {
            upload_dir: root.join("uploads"),
            result_dir: root.join("results"),
            plotted_dir: root.join("plotedresults"),
        })
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scene.png").as_deref(), Some("scene.png"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\tile 7.jpg").as_deref(),
            Some("tile 7.jpg")
        );
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name("uploads/"), None);
        assert_eq!(sanitize_file_name(".."), None);
    }

    #[test]
    fn test_output_names_use_stem() {
        assert_eq!(file_stem("delta.tile.png"), "delta.tile");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(mask_file_name("delta"), "mask_delta.png");
        assert_eq!(plotted_file_name("delta"), "plotted_delta.png");
    }

    #[tokio::test]
    async fn test_find_processed_prefers_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        storage.ensure_dirs().unwrap();

        let (name, mask_path) = storage.mask_path("a");
        std::fs::write(&mask_path, b"mask").unwrap();
        std::fs::write(dir.path().join("plotedresults").join(&name), b"other").unwrap();

        assert_eq!(storage.find_processed(&name).await, Some(mask_path));

        let (plotted, plotted_path) = storage.plotted_path("a");
        std::fs::write(&plotted_path, b"plot").unwrap();
        assert_eq!(storage.find_processed(&plotted).await, Some(plotted_path));

        assert_eq!(storage.find_processed("missing.png").await, None);
    }

    #[tokio::test]
    async fn test_find_processed_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        storage.ensure_dirs().unwrap();
        std::fs::write(storage.upload_path("secret.png"), b"x").unwrap();

        assert_eq!(storage.find_processed("../uploads/secret.png").await, None);
        assert_eq!(storage.find_processed("..").await, None);
        assert_eq!(storage.find_processed("").await, None);
    }
}
