pub mod env;
pub mod runner;
pub mod validator;

pub use env::ScriptEnvironment;
pub use runner::ScriptRunner;
pub use validator::ScriptPathValidator;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Program used to run a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpreter {
    /// bash, or cmd on Windows
    Shell,
    Node,
}

impl Interpreter {
    /// Guess from the file extension, defaulting to the shell
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("js") || ext.eq_ignore_ascii_case("cjs") => {
                Interpreter::Node
            }
            _ => Interpreter::Shell,
        }
    }
}

/// One script to run, built fresh from config for each execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    pub path: PathBuf,
    pub interpreter: Interpreter,
    pub enabled: bool,
}

impl ScriptDescriptor {
    pub fn new(path: impl Into<PathBuf>, interpreter: Option<Interpreter>, enabled: bool) -> Self {
        let path = path.into();
        let interpreter = interpreter.unwrap_or_else(|| Interpreter::for_path(&path));
        Self {
            path,
            interpreter,
            enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpreter_from_extension() {
        assert_eq!(Interpreter::for_path(Path::new("/a/hook.sh")), Interpreter::Shell);
        assert_eq!(Interpreter::for_path(Path::new("/a/hook.js")), Interpreter::Node);
        assert_eq!(Interpreter::for_path(Path::new("/a/hook.CJS")), Interpreter::Node);
        assert_eq!(Interpreter::for_path(Path::new("/a/hook")), Interpreter::Shell);
    }

    #[test]
    fn test_explicit_interpreter_wins() {
        let descriptor = ScriptDescriptor::new("/a/hook.js", Some(Interpreter::Shell), true);
        assert_eq!(descriptor.interpreter, Interpreter::Shell);
    }
}
