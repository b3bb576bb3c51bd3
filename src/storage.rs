use std::path::{Path, PathBuf};

use crate::source::DEFAULT_SOURCE_ZIP;

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub source_dir: PathBuf,
    pub db_path: PathBuf,
    pub meta_path: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        let source_dir = data_dir.join("source");
        let db_path = data_dir.join("drg.sqlite");
        let meta_path = data_dir.join("meta.json");

        Self {
            source_dir,
            db_path,
            meta_path,
        }
    }

    pub fn default_source(&self) -> PathBuf {
        self.source_dir.join(DEFAULT_SOURCE_ZIP)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.source_dir)?;
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

pub fn file_present_nonempty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(m) => m.is_file() && m.len() > 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_data_dir() {
        let paths = StoragePaths::new("/srv/drg");
        assert_eq!(paths.db_path, PathBuf::from("/srv/drg/drg.sqlite"));
        assert_eq!(paths.meta_path, PathBuf::from("/srv/drg/meta.json"));
        assert_eq!(
            paths.default_source(),
            PathBuf::from("/srv/drg/source").join(DEFAULT_SOURCE_ZIP)
        );
    }

    #[test]
    fn empty_files_do_not_count_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.sqlite");
        std::fs::write(&empty, b"").unwrap();
        let full = dir.path().join("full.sqlite");
        std::fs::write(&full, b"x").unwrap();

        assert!(!file_present_nonempty(&empty));
        assert!(file_present_nonempty(&full));
        assert!(!file_present_nonempty(&dir.path().join("missing")));
        assert!(!file_present_nonempty(dir.path()));
    }
}
