//! Lazy executable resolution
//!
//! Definitions may reference tools that are installed after the registry
//! is built, so resolution happens right before each spawn:
//! - bare names are searched on `PATH`
//! - relative paths are joined onto the tool's working directory
//! - the target must be a regular file and, on Unix, carry an execute bit

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why an executable could not be located
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("executable not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("executable '{name}' not found on PATH")]
    NotOnPath { name: String },

    #[error("not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("not executable: {}", .path.display())]
    NotExecutable { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve `program` to an absolute executable path
pub async fn resolve_executable(
    program: &Path,
    working_dir: &Path,
) -> Result<PathBuf, ResolveError> {
    if is_bare_name(program) {
        return search_path(program, std::env::var_os("PATH").as_deref()).await;
    }

    let candidate = if program.is_absolute() {
        program.to_path_buf()
    } else {
        working_dir.join(program)
    };

    check_executable(&candidate).await
}

/// Search a `PATH`-style list for `name`
pub async fn search_path(name: &Path, path_var: Option<&OsStr>) -> Result<PathBuf, ResolveError> {
    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(path_var) {
            let candidate = dir.join(name);
            if let Ok(found) = check_executable(&candidate).await {
                return Ok(found);
            }
        }
    }

    Err(ResolveError::NotOnPath {
        name: name.display().to_string(),
    })
}

fn is_bare_name(program: &Path) -> bool {
    let mut components = program.components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    ) && !program.to_string_lossy().contains(std::path::MAIN_SEPARATOR)
}

async fn check_executable(path: &Path) -> Result<PathBuf, ResolveError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ResolveError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ResolveError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if !metadata.is_file() {
        return Err(ResolveError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ResolveError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_absolute_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let err = resolve_executable(&missing, temp.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_directory_is_not_executable() {
        let temp = TempDir::new().unwrap();
        let err = resolve_executable(temp.path(), temp.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotAFile { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_path_uses_working_dir() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "tool.sh", 0o755);

        let resolved = resolve_executable(Path::new("./tool.sh"), temp.path()).await.unwrap();
        assert_eq!(resolved.canonicalize().unwrap(), script.canonicalize().unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_execute_bit() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "plain.sh", 0o644);

        let err = resolve_executable(&script, temp.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotExecutable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_search_path_finds_first_match() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_script(second.path(), "scanner", 0o755);

        let path_var = std::env::join_paths([first.path(), second.path()]).unwrap();
        let found = search_path(Path::new("scanner"), Some(&path_var)).await.unwrap();
        assert_eq!(found, second.path().join("scanner"));
    }

    #[tokio::test]
    async fn test_search_path_reports_name() {
        let err = search_path(Path::new("no-such-tool-xyz"), None).await.unwrap_err();
        assert!(err.to_string().contains("no-such-tool-xyz"));
    }
}
