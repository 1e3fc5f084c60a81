//! Structural YAML checks for a local configuration tree.
//!
//! Documents are parsed, never resolved: include/secret/env directives are
//! accepted as opaque tagged nodes so a missing include target or an unset
//! variable does not turn into a syntax error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use super::ConfigTree;

/// Tags the controller's loader understands.
pub const KNOWN_TAGS: &[&str] = &[
    "include",
    "include_dir_list",
    "include_dir_named",
    "include_dir_merge_list",
    "include_dir_merge_named",
    "secret",
    "env_var",
];

const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Outcome for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    pub file: String,
    pub path: PathBuf,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome for a whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeValidation {
    pub files: Vec<FileCheck>,
}

impl TreeValidation {
    pub fn all_valid(&self) -> bool {
        self.files.iter().all(|f| f.valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileCheck> {
        self.files.iter().filter(|f| !f.valid)
    }

    pub fn error_count(&self) -> usize {
        self.failures().count()
    }
}

/// Validate every document of the tree; a bad file never stops the others.
pub fn validate_tree(tree: &ConfigTree) -> anyhow::Result<TreeValidation> {
    let documents = tree.documents()?;
    let files = documents.iter().map(|path| validate_file(path)).collect();
    Ok(TreeValidation { files })
}

/// Validate a single document.
pub fn validate_file(path: &Path) -> FileCheck {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let error = match std::fs::read_to_string(path) {
        Ok(content) => check_document(&content).err(),
        Err(e) => Some(format!("Read error: {}", e)),
    };

    if let Some(message) = &error {
        tracing::debug!(file = %file, error = %message, "document failed syntax check");
    }

    FileCheck {
        file,
        path: path.to_path_buf(),
        valid: error.is_none(),
        error,
    }
}

/// Parse document text, returning a human-readable error on failure.
pub fn check_document(content: &str) -> Result<(), String> {
    if is_blank_document(content) {
        return Ok(());
    }
    let value: Value = serde_yaml_ng::from_str(content).map_err(|e| e.to_string())?;
    check_tags(&value)
}

fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn check_tags(value: &Value) -> Result<(), String> {
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            if tag.starts_with("!!") || tag.starts_with(CORE_TAG_PREFIX) {
                return check_tags(&tagged.value);
            }
            let name = tag.trim_start_matches('!');
            if !KNOWN_TAGS.contains(&name) {
                return Err(format!(
                    "could not determine a constructor for the tag '!{}'",
                    name
                ));
            }
            // Directive arguments are opaque; nothing inside needs checking.
            Ok(())
        }
        Value::Sequence(items) => items.iter().try_for_each(check_tags),
        Value::Mapping(map) => map.iter().try_for_each(|(key, value)| {
            check_tags(key)?;
            check_tags(value)
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_controller_directives() {
        let doc = r#"
homeassistant:
  name: Home
  customize: !include customize.yaml
  packages: !include_dir_named packages
automation: !include automations.yaml
automation split: !include_dir_merge_list automations/
sensor: !include_dir_list sensors
script: !include_dir_merge_named scripts
http:
  api_password: !secret http_password
  base_url: !env_var BASE_URL
"#;
        check_document(doc).unwrap();
    }

    #[test]
    fn rejects_unknown_tag() {
        let err = check_document("value: !python/name:os.system\n").unwrap_err();
        assert!(err.contains("constructor"), "{err}");
    }

    #[test]
    fn rejects_nested_mapping_on_one_line() {
        let doc = "automation:\n  alias: a: b\n";
        assert!(check_document(doc).is_err());
    }

    #[test]
    fn rejects_unclosed_flow_sequence() {
        assert!(check_document("list: [1, 2\n").is_err());
    }

    #[test]
    fn blank_and_comment_only_documents_are_valid() {
        check_document("").unwrap();
        check_document("# nothing here\n\n").unwrap();
        check_document("---\n# only a marker\n").unwrap();
    }

    #[test]
    fn unreadable_file_is_reported() {
        let check = validate_file(Path::new("/definitely/not/here.yaml"));
        assert!(!check.valid);
        assert!(check.error.unwrap().starts_with("Read error"));
        assert_eq!(check.file, "here.yaml");
    }
}
