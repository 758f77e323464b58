/// Centralized platform-specific path computation
///
/// Provides consistent config locations across Windows, macOS, and Linux following
/// the XDG Base Directory specification on Unix-like systems, plus the lexical path
/// helpers used to key the dependency graph and to confine file reads to a project.
use std::path::{Component, Path, PathBuf};

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            // Linux/Unix - follow XDG Base Directory specification
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// Get default project-specific config directory
    ///
    /// Returns: {config_dir}/deepfix
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join("deepfix")
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/deepfix/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonical key for a file path: the real path when it exists, otherwise an
/// absolute, lexically normalized path
pub fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_lexically(&absolute)
}

/// Join `candidate` onto `root`, refusing anything that escapes the root
///
/// Absolute candidates are accepted only when they already live under the root.
pub fn confine_to_root(root: &Path, candidate: &str) -> Option<PathBuf> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    let root = canonical_key(root);
    let raw = Path::new(trimmed);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };

    let normalized = normalize_lexically(&joined);
    if !normalized.starts_with(&root) {
        return None;
    }

    // Symlinks may still point outside; check the resolved location when it exists
    match normalized.canonicalize() {
        Ok(real) if !real.starts_with(&root) => None,
        _ => Some(normalized),
    }
}

/// Render `path` relative to `root` with forward slashes, if it lives under it
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let root = canonical_key(root);
    let path = canonical_key(path);
    path.strip_prefix(&root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_not_empty() {
        let dir = PlatformPaths::config_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_default_config_path() {
        let path = PlatformPaths::default_config_path();
        assert!(path.to_string_lossy().contains("deepfix"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_config_dir_with_xdg_config_home() {
        let original = env::var("XDG_CONFIG_HOME").ok();

        unsafe {
            env::set_var("XDG_CONFIG_HOME", "/custom/config");
        }
        let dir = PlatformPaths::config_dir();
        assert_eq!(dir, PathBuf::from("/custom/config"));

        unsafe {
            match original {
                Some(val) => env::set_var("XDG_CONFIG_HOME", val),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
        }
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d.py")),
            PathBuf::from("/a/c/d.py")
        );
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_canonical_key_missing_file_is_absolute() {
        let key = canonical_key(Path::new("does/not/exist.py"));
        assert!(key.is_absolute());
        assert!(key.ends_with("does/not/exist.py"));
    }

    #[test]
    fn test_confine_to_root_rejects_escapes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();

        assert!(confine_to_root(dir.path(), "app.py").is_some());
        assert!(confine_to_root(dir.path(), "./src/../app.py").is_some());
        assert!(confine_to_root(dir.path(), "../outside.py").is_none());
        assert!(confine_to_root(dir.path(), "/etc/passwd").is_none());
        assert!(confine_to_root(dir.path(), "  ").is_none());
    }

    #[test]
    fn test_confine_accepts_absolute_inside_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().canonicalize().unwrap().join("main.go");
        std::fs::write(&file, "package main\n").unwrap();

        let confined = confine_to_root(dir.path(), &file.to_string_lossy()).unwrap();
        assert_eq!(confined, file);
    }

    #[test]
    fn test_relative_to() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();

        let rel = relative_to(dir.path(), &dir.path().join("src/lib.rs"));
        assert_eq!(rel.as_deref(), Some("src/lib.rs"));
        assert_eq!(relative_to(dir.path(), Path::new("/nowhere/x.rs")), None);
    }
}
