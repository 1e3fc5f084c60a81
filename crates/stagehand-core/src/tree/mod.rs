//! Local configuration tree: discovery, filters and syntax validation.

pub mod filters;
pub mod validator;

use std::path::{Path, PathBuf};

use anyhow::Context;

pub use filters::{
    GITIGNORE_TEMPLATE, PROTECTED_PATHS, SECRETS_FILE, STAGING_EXCLUDES, promotion_excludes,
    staging_excludes,
};
pub use validator::{FileCheck, TreeValidation, validate_file, validate_tree};

/// Extensions recognized as configuration documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A local configuration directory. Read-only for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTree {
    root: PathBuf,
}

impl ConfigTree {
    /// Open an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.exists() {
            anyhow::bail!("Config path does not exist: {}", root.display());
        }
        if !root.is_dir() {
            anyhow::bail!("Config path is not a directory: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Top-level documents to syntax-check, sorted by name, secrets excluded.
    pub fn documents(&self) -> anyhow::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read directory: {}", self.root.display()))?;

        let mut documents = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read directory entries: {}", self.root.display())
            })?;
            let path = entry.path();
            if !path.is_file() || !is_document(&path) {
                continue;
            }
            if path.file_name().is_some_and(|n| n == SECRETS_FILE) {
                continue;
            }
            documents.push(path);
        }
        documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(documents)
    }

    pub fn has_secrets(&self) -> bool {
        self.root.join(SECRETS_FILE).is_file()
    }
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

/// Count documents below `root`, recursively.
pub fn count_documents(root: &Path) -> anyhow::Result<usize> {
    let mut count = 0;
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read directory: {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat file: {}", entry.path().display()))?;
        if ty.is_dir() {
            count += count_documents(&entry.path())?;
        } else if ty.is_file() && is_document(&entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn documents_skip_secrets_and_other_extensions() {
        let temp = TempDir::new().unwrap();
        for name in ["z.yaml", "a.yml", "secrets.yaml", "notes.txt"] {
            std::fs::write(temp.path().join(name), "a: 1\n").unwrap();
        }
        std::fs::create_dir(temp.path().join("packages.yaml")).unwrap();

        let tree = ConfigTree::open(temp.path()).unwrap();
        let names: Vec<_> = tree
            .documents()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.yml", "z.yaml"]);
        assert!(tree.has_secrets());
    }

    #[test]
    fn open_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let err = ConfigTree::open(temp.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn counts_nested_documents() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("packages/lights")).unwrap();
        std::fs::write(temp.path().join("configuration.yaml"), "").unwrap();
        std::fs::write(temp.path().join("packages/lights/hall.yaml"), "").unwrap();
        std::fs::write(temp.path().join("packages/readme.md"), "").unwrap();
        assert_eq!(count_documents(temp.path()).unwrap(), 2);
    }
}
