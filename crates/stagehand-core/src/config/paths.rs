//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "stagehand.toml";

/// Default location of stagehand.toml (`<config_dir>/stagehand/stagehand.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stagehand").join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_absolute_paths_alone() {
        assert_eq!(expand_home(Path::new("/srv/ha")), PathBuf::from("/srv/ha"));
    }

    #[test]
    fn expands_tilde_prefix() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home(Path::new("~/ha-config")), home.join("ha-config"));
    }

    #[test]
    fn does_not_expand_tilde_user() {
        assert_eq!(
            expand_home(Path::new("~other/ha")),
            PathBuf::from("~other/ha")
        );
    }
}
