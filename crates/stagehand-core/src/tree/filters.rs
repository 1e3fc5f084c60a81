//! Path filter sets used by every transfer.
//!
//! The protected set is a compile-time constant on purpose: nothing read from
//! configuration or the command line can shrink it.

/// Name of the secrets document that never leaves the controller.
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Paths on the controller that survive every promotion unmodified.
///
/// Also used as the exclude list when pulling production into a fresh local
/// repository.
pub const PROTECTED_PATHS: &[&str] = &[
    ".storage/",
    "backups/",
    SECRETS_FILE,
    "*.db",
    "*.db-shm",
    "*.db-wal",
    "home-assistant.log*",
    "*.log",
    "tts/",
    "deps/",
    "__pycache__/",
    ".cloud/",
    ".ha_run.lock",
    ".HA_VERSION",
];

/// Local paths that are never pushed to the scratch directory.
pub const STAGING_EXCLUDES: &[&str] = &[
    ".git/",
    ".gitignore",
    SECRETS_FILE,
    ".storage/",
    "backups/",
    "*.db",
    "*.log",
    "*.log.*",
    "home-assistant.log*",
    "tts/",
    "deps/",
    "__pycache__/",
];

/// `.gitignore` written into a freshly bootstrapped local repository.
pub const GITIGNORE_TEMPLATE: &str = "\
# Home Assistant - files that should NOT be in git

# Secrets (never commit)
secrets.yaml

# Device state and registries (managed by the controller)
.storage/

# Databases
*.db
*.db-shm
*.db-wal

# Logs
*.log
*.log.*
home-assistant.log*

# Backups
backups/

# Cache and generated files
tts/
deps/
__pycache__/
*.pyc

# Cloud config
.cloud/

# Runtime files
.ha_run.lock
.HA_VERSION

# macOS
.DS_Store
";

/// Protected patterns followed by caller patterns, duplicates dropped.
///
/// The result always starts with every entry of [`PROTECTED_PATHS`] in order.
pub fn promotion_excludes<S: AsRef<str>>(extra: &[S]) -> Vec<String> {
    let mut excludes: Vec<String> = PROTECTED_PATHS.iter().map(|p| p.to_string()).collect();
    for pattern in extra {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() || excludes.iter().any(|e| e == pattern) {
            continue;
        }
        excludes.push(pattern.to_string());
    }
    excludes
}

pub fn staging_excludes() -> Vec<String> {
    STAGING_EXCLUDES.iter().map(|p| p.to_string()).collect()
}
