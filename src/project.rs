use std::path::{Component, Path, PathBuf};

/// Directory the AI tool keeps per-project session state in
const SESSION_MARKERS: &[&str] = &[".claude"];

/// Path segments that never name a project
const NOISE_SEGMENTS: &[&str] = &["tmp", "temp", "__pycache__", "node_modules"];

/// Directory names too generic to identify a project
const GENERIC_NAMES: &[&str] = &[
    "home",
    "tmp",
    "temp",
    "desktop",
    "documents",
    "downloads",
    "users",
    "user",
    "workspace",
    "projects",
];

/// Directory names that are usually somebody's home
const USER_NAMES: &[&str] = &["admin", "root", "developer", "user"];

const CURRENT_PROJECT: &str = "Current Project";
const UNKNOWN_PROJECT: &str = "Unknown Project";

/// Human-readable identity of the project an event belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub name: String,
    pub path: PathBuf,
}

impl ProjectContext {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    fn unknown() -> Self {
        Self::new(UNKNOWN_PROJECT, "/")
    }
}

/// Derives a [`ProjectContext`] from a path hint or the working directory.
#[derive(Debug, Clone)]
pub struct ProjectResolver {
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

impl ProjectResolver {
    pub fn new(home: Option<PathBuf>, cwd: Option<PathBuf>) -> Self {
        Self { home, cwd }
    }

    pub fn from_environment() -> Self {
        Self::new(dirs::home_dir(), std::env::current_dir().ok())
    }

    /// Resolve from a file path such as a session transcript.
    /// - `<project>/.claude/...` -> `<project>`, unless that is the home directory
    /// - otherwise the deepest directory that is not noise or a session id
    /// - otherwise the working directory
    pub fn resolve(&self, hint: &Path) -> ProjectContext {
        let components: Vec<Component> = hint.components().collect();

        for (i, component) in components.iter().enumerate() {
            if !is_marker(component) || i == 0 {
                continue;
            }
            let Component::Normal(name) = components[i - 1] else {
                continue;
            };
            let project_path: PathBuf = components[..i].iter().collect();
            if self.home.as_deref() == Some(project_path.as_path()) {
                // Global session, the transcript says nothing about the project
                return self.resolve_working_dir();
            }
            return ProjectContext::new(name.to_string_lossy(), project_path);
        }

        let last_is_file = hint.is_file() || looks_like_file(components.last());
        let mut candidates = components.len();
        if last_is_file {
            candidates = candidates.saturating_sub(1);
        }

        for i in (1..candidates).rev() {
            let Component::Normal(segment) = components[i] else {
                continue;
            };
            let segment = segment.to_string_lossy();
            if is_noise(&segment) || looks_like_session_id(&segment) {
                continue;
            }
            let project_path: PathBuf = components[..=i].iter().collect();
            return ProjectContext::new(segment, project_path);
        }

        self.resolve_working_dir()
    }

    /// Resolve from the process working directory.
    pub fn resolve_working_dir(&self) -> ProjectContext {
        match &self.cwd {
            Some(cwd) => self.resolve_dir(cwd),
            None => ProjectContext::unknown(),
        }
    }

    /// Resolve from a directory by its basename, walking up past generic or
    /// user-like names.
    pub fn resolve_dir(&self, dir: &Path) -> ProjectContext {
        let Some(basename) = dir.file_name() else {
            return ProjectContext::new(CURRENT_PROJECT, dir);
        };
        let basename = basename.to_string_lossy();
        if !self.is_generic(&basename) {
            return ProjectContext::new(basename, dir);
        }

        for ancestor in dir.ancestors().skip(1) {
            let Some(name) = ancestor.file_name() else {
                break;
            };
            let name = name.to_string_lossy();
            if !name.is_empty() && !self.is_generic(&name) {
                return ProjectContext::new(name, ancestor);
            }
        }

        ProjectContext::new(CURRENT_PROJECT, dir)
    }

    fn is_generic(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if GENERIC_NAMES.contains(&lower.as_str()) || USER_NAMES.contains(&lower.as_str()) {
            return true;
        }
        // The current user's login name is as generic as any
        self.home
            .as_deref()
            .and_then(Path::file_name)
            .is_some_and(|home_name| home_name.to_string_lossy().to_lowercase() == lower)
    }
}

fn is_marker(component: &Component) -> bool {
    match component {
        Component::Normal(name) => SESSION_MARKERS.iter().any(|m| name == m),
        _ => false,
    }
}

/// Noise: scratch and dependency directories, plus anything hidden (`.git`, `.claude`)
fn is_noise(segment: &str) -> bool {
    segment.starts_with('.') || NOISE_SEGMENTS.contains(&segment)
}

/// Long opaque tokens are session ids, not project names
fn looks_like_session_id(segment: &str) -> bool {
    segment.len() > 20
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn looks_like_file(component: Option<&Component>) -> bool {
    match component {
        Some(Component::Normal(name)) => Path::new(name).extension().is_some(),
        _ => false,
    }
}
