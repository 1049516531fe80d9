// ABOUTME: Sandboxed filesystem access for read_file/write_file, using cap-std capability security

use cap_std::fs::Dir;

/// Error type for sandbox operations.
#[derive(Debug, Clone)]
pub enum SandboxError {
    PathNotAllowed(String),
    FileNotFound(String),
    FileTooLarge(String),
    IoError(String),
}

impl std::fmt::Display for SandboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxError::PathNotAllowed(path) => {
                write!(f, "access denied: {} is not in allowed paths", path)
            }
            SandboxError::FileNotFound(path) => write!(f, "file not found: {}", path),
            SandboxError::FileTooLarge(msg) => write!(f, "file too large: {}", msg),
            SandboxError::IoError(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for SandboxError {}

impl From<SandboxError> for crate::error::RuntimeError {
    fn from(err: SandboxError) -> Self {
        crate::error::RuntimeError::io("filesystem", err.to_string())
    }
}

/// Capability-scoped filesystem sandbox. `read_file`/`write_file` can only
/// reach paths under one of `fs_roots`; `cap_std::fs::Dir` rejects `..` and
/// absolute paths by construction, on top of the manual checks below.
pub struct Sandbox {
    fs_roots: Vec<Dir>,
    max_file_size: usize,
}

impl Sandbox {
    pub fn new(allowed_paths: Vec<String>, max_file_size: usize) -> Result<Self, SandboxError> {
        let mut fs_roots = Vec::new();
        for path in &allowed_paths {
            std::fs::create_dir_all(path)
                .map_err(|e| SandboxError::IoError(format!("cannot create {}: {}", path, e)))?;
            let dir = Dir::open_ambient_dir(path, cap_std::ambient_authority())
                .map_err(|e| SandboxError::IoError(format!("cannot open {}: {}", path, e)))?;
            fs_roots.push(dir);
        }
        Ok(Sandbox {
            fs_roots,
            max_file_size,
        })
    }

    fn validate_path(path: &str) -> Result<(), SandboxError> {
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(SandboxError::PathNotAllowed(path.to_string()));
        }
        if path.contains("..") {
            return Err(SandboxError::PathNotAllowed(path.to_string()));
        }
        Ok(())
    }

    fn root_for_read(&self, path: &str) -> Result<&Dir, SandboxError> {
        for root in &self.fs_roots {
            if root.metadata(path).is_ok() {
                return Ok(root);
            }
        }
        self.fs_roots
            .first()
            .ok_or_else(|| SandboxError::PathNotAllowed(path.to_string()))
    }

    fn root_for_write(&self) -> Result<&Dir, SandboxError> {
        self.fs_roots
            .first()
            .ok_or_else(|| SandboxError::PathNotAllowed("<no sandbox root>".to_string()))
    }

    pub fn read_to_string(&self, path: &str) -> Result<String, SandboxError> {
        Self::validate_path(path)?;
        let root = self.root_for_read(path)?;
        root.read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SandboxError::FileNotFound(path.to_string())
            } else {
                SandboxError::IoError(format!("cannot read {}: {}", path, e))
            }
        })
    }

    pub fn write_string(&self, path: &str, contents: &str) -> Result<(), SandboxError> {
        Self::validate_path(path)?;
        if contents.len() > self.max_file_size {
            return Err(SandboxError::FileTooLarge(format!(
                "{} bytes exceeds limit of {} bytes",
                contents.len(),
                self.max_file_size
            )));
        }
        let root = self.root_for_write()?;
        root.write(path, contents)
            .map_err(|e| SandboxError::IoError(format!("cannot write {}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;

    fn test_sandbox() -> (Sandbox, PathBuf) {
        let dir = PathBuf::from(format!(
            "{}/flow-sandbox-test-{}",
            std::env::temp_dir().display(),
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let sandbox = Sandbox::new(vec![dir.to_string_lossy().to_string()], 1_000_000).unwrap();
        (sandbox, dir)
    }

    #[test]
    #[serial]
    fn write_then_read_round_trips() {
        let (sandbox, dir) = test_sandbox();
        sandbox.write_string("a.txt", "hello").unwrap();
        assert_eq!(sandbox.read_to_string("a.txt").unwrap(), "hello");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn absolute_paths_are_rejected() {
        let (sandbox, dir) = test_sandbox();
        let result = sandbox.read_to_string("/etc/passwd");
        assert!(matches!(result, Err(SandboxError::PathNotAllowed(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn path_traversal_is_rejected() {
        let (sandbox, dir) = test_sandbox();
        let result = sandbox.read_to_string("../../etc/passwd");
        assert!(matches!(result, Err(SandboxError::PathNotAllowed(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn oversized_write_is_rejected() {
        let (sandbox, dir) = test_sandbox();
        let sandbox = Sandbox::new(vec![dir.to_string_lossy().to_string()], 4).unwrap();
        let result = sandbox.write_string("big.txt", "too long");
        assert!(matches!(result, Err(SandboxError::FileTooLarge(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
