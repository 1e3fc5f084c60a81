//! Stagehand Core Library
//!
//! Staged deployment of a local Home Assistant configuration tree to a
//! remote controller: local validation, staging over ssh/rsync, backup,
//! promotion, controller-side verification and reload.

pub mod commands;
pub mod config;
pub mod controller;
pub mod deploy;
pub mod remote;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tree;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        BackupSettings, ConfigError, ConfigStore, ControllerSettings, RemoteSettings,
        StagehandConfig,
    };

    // Transports
    pub use crate::controller::{ApiError, ControllerApi, HttpController};
    pub use crate::remote::{RemoteExecutor, SshExecutor, TransportError};

    // Pipeline
    pub use crate::deploy::{
        DeployOptions, DeployPipeline, DeploymentReport, StepName, StepOutcome, StepResult,
    };

    // Local tree
    pub use crate::tree::{ConfigTree, TreeValidation};
}
