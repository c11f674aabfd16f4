//! Storage root configuration.

use std::path::{Path, PathBuf};

/// Default storage root, relative to the working directory.
pub const DEFAULT_STORE_ROOT: &str = "kb_store";
/// Environment variable overriding the storage root.
pub const STORE_ROOT_ENV: &str = "KB_STORE_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads `KB_STORE_ROOT`, falling back to `kb_store`.
    ///
    /// Blank values are ignored.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(STORE_ROOT_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, DEFAULT_STORE_ROOT};
    use std::path::Path;

    #[test]
    fn env_value_overrides_default_root() {
        let config = StoreConfig::from_env_value(Some(" /srv/kb "));
        assert_eq!(config.root(), Path::new("/srv/kb"));
    }

    #[test]
    fn blank_or_missing_env_uses_default_root() {
        assert_eq!(
            StoreConfig::from_env_value(Some("  ")).root(),
            Path::new(DEFAULT_STORE_ROOT)
        );
        assert_eq!(
            StoreConfig::from_env_value(None).root(),
            Path::new(DEFAULT_STORE_ROOT)
        );
    }
}
