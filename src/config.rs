// ABOUTME: Configuration and constants for the Flow driver
// This module holds version info and the filesystem sandbox's default policy

use std::path::PathBuf;

pub const VERSION: &str = "0.1.0";

// ============================================================================
// I/O Sandboxing Configuration
// ============================================================================

/// Filesystem sandbox configuration. There is no `NetConfig` counterpart —
/// Flow has no network builtins, so a binding it would enable doesn't
/// exist for it to guard.
#[derive(Debug, Clone)]
pub struct FsConfig {
    pub allowed_paths: Vec<PathBuf>,
    pub max_file_size: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            allowed_paths: vec![PathBuf::from("./data"), PathBuf::from("./scripts")],
            // Default max file size: 10MB
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fs_config_has_a_size_limit() {
        let cfg = FsConfig::default();
        assert!(cfg.max_file_size > 0);
        assert!(!cfg.allowed_paths.is_empty());
    }
}
