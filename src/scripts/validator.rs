use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Extensions a script may have, compared case-insensitively
const ALLOWED_EXTENSIONS: &[&str] = &["sh", "js", "cjs"];

/// Why a script path was refused
#[derive(Debug, Error)]
pub enum PathRejection {
    #[error("script path must be absolute: {0}")]
    NotAbsolute(PathBuf),
    #[error("script must live under the home, working or temp directory: {0}")]
    OutsideTrustedDirs(PathBuf),
    #[error("script must have a .sh, .js or .cjs extension: {0}")]
    DisallowedExtension(PathBuf),
    #[error("cannot resolve script directory {path}: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decides which script paths may run: absolute, inside a trusted
/// directory, and with an allowed extension.
#[derive(Debug, Clone)]
pub struct ScriptPathValidator {
    trusted_dirs: Vec<PathBuf>,
}

impl ScriptPathValidator {
    pub fn new(trusted_dirs: Vec<PathBuf>) -> Self {
        Self { trusted_dirs }
    }

    /// Home, working and temp directories of this process
    pub fn from_environment() -> Self {
        let mut trusted = Vec::new();
        trusted.extend(dirs::home_dir());
        trusted.extend(std::env::current_dir().ok());
        trusted.push(std::env::temp_dir());
        Self::new(trusted)
    }

    /// Lexical check, no filesystem access. Containment is by path
    /// component after normalizing `.` and `..`.
    pub fn validate(&self, path: &Path) -> Result<(), PathRejection> {
        if !path.is_absolute() {
            return Err(PathRejection::NotAbsolute(path.to_path_buf()));
        }

        let normalized = normalize(path);
        let dir = normalized.parent().unwrap_or(&normalized);
        if !self
            .trusted_dirs
            .iter()
            .any(|trusted| dir.starts_with(normalize(trusted)))
        {
            return Err(PathRejection::OutsideTrustedDirs(path.to_path_buf()));
        }

        check_extension(&normalized)
    }

    /// [`validate`](Self::validate), then the same containment check again on
    /// real paths so a symlink cannot point outside the trusted directories.
    /// Use this for anything that came from configuration.
    pub fn validate_resolved(&self, path: &Path) -> Result<(), PathRejection> {
        self.validate(path)?;

        let normalized = normalize(path);
        let resolved = match std::fs::canonicalize(&normalized) {
            Ok(real) => real,
            // A missing file is reported by the caller, but its directory still has to resolve
            Err(_) => {
                let dir = normalized.parent().unwrap_or(&normalized);
                let real_dir =
                    std::fs::canonicalize(dir).map_err(|source| PathRejection::Unresolvable {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                match normalized.file_name() {
                    Some(name) => real_dir.join(name),
                    None => real_dir,
                }
            }
        };

        let real_dir = resolved.parent().unwrap_or(&resolved);
        let contained = self.trusted_dirs.iter().any(|trusted| {
            std::fs::canonicalize(trusted)
                .is_ok_and(|real_trusted| real_dir.starts_with(real_trusted))
        });
        if !contained {
            return Err(PathRejection::OutsideTrustedDirs(path.to_path_buf()));
        }

        check_extension(&resolved)
    }
}

fn check_extension(path: &Path) -> Result<(), PathRejection> {
    let allowed = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)));
    if allowed {
        Ok(())
    } else {
        Err(PathRejection::DisallowedExtension(path.to_path_buf()))
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
