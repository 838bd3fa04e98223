use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static UNSAFE_DIR_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-\s\.]").unwrap());

const DESKTOP_CANDIDATES: [&str; 2] = ["Desktop", "Scrivania"];
const FALLBACK_DIR_NAME: &str = "Report";

/// Folder name for a model, safe on every common filesystem.
pub fn sanitize_dir_name(model: &str) -> String {
    let safe = UNSAFE_DIR_CHARS.replace_all(model.trim(), "_");
    if safe.is_empty() {
        FALLBACK_DIR_NAME.to_string()
    } else {
        safe.into_owned()
    }
}

/// A `Desktop` or `Scrivania` folder under `home` when there is one, `home` otherwise.
pub fn desktop_dir_in(home: &Path) -> PathBuf {
    DESKTOP_CANDIDATES
        .iter()
        .map(|c| home.join(c))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| home.to_path_buf())
}

/// Folder that holds the per-model output folders: the platform desktop when
/// it exists, otherwise a desktop-like folder under home, otherwise `.`.
pub fn default_base_dir() -> PathBuf {
    dirs::desktop_dir()
        .filter(|p| p.is_dir())
        .or_else(|| {
            dirs::home_dir()
                .filter(|home| home.is_dir())
                .map(|home| desktop_dir_in(&home))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Output folder that follows the model name until someone picks one.
///
/// Once overridden it never goes back to following the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDir {
    Derived(PathBuf),
    Overridden(PathBuf),
}

impl OutputDir {
    /// `<desktop>/<sanitized model>`.
    pub fn derived(model: &str) -> Self {
        Self::derived_in(&default_base_dir(), model)
    }

    pub fn derived_in(base: &Path, model: &str) -> Self {
        OutputDir::Derived(base.join(sanitize_dir_name(model)))
    }

    /// Re-derives the folder for a new model name; an override is left alone.
    pub fn on_model_change(&mut self, model: &str) {
        if let OutputDir::Derived(path) = self {
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            *path = base.join(sanitize_dir_name(model));
        }
    }

    pub fn override_with(&mut self, path: impl Into<PathBuf>) {
        *self = OutputDir::Overridden(path.into());
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, OutputDir::Overridden(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            OutputDir::Derived(path) | OutputDir::Overridden(path) => path,
        }
    }
}
