//! Configuration for hoard.
//!
//! Sources, lowest priority first: built-in defaults, one configuration file
//! (TOML, YAML or JSON, picked by extension), then `HOARD_`-prefixed
//! environment variables. Relative paths are resolved against the directory of
//! the configuration file, or the working directory when there is none.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "HOARD_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding content-addressed files.
    pub storage_dir: PathBuf,
    /// SQLite database file for upload metadata.
    pub database: PathBuf,
    /// Exact MIME types accepted on ingest.
    pub allowed_types: Vec<String>,
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Self {
            storage_dir: data.join("objects"),
            database: data.join("hoard.sqlite"),
            allowed_types: ["image/png", "image/jpeg", "image/gif", "image/webp", "application/pdf"]
                .map(String::from)
                .to_vec(),
            log_level: "info".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "hoard")
}

/// Platform data directory, or a relative `.hoard` when the platform has none.
fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from(".hoard"), |dirs| dirs.data_dir().to_path_buf())
}

/// `hoard.toml` in the platform configuration directory, if there is one.
pub fn default_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("hoard.toml"))
}

impl Config {
    /// Load from `file` (or the default file, when it exists) and the
    /// environment, then resolve and validate.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_file().filter(|path| path.is_file()),
        };
        let base = match file.as_deref().and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().or_raise(|| ErrorKind::WorkingDirectory)?,
        };
        let config = Self::extract(Self::figment(file.as_deref())?)?;
        tracing::debug!(file = ?file, "configuration loaded");
        config.resolve(&base).validate()
    }

    /// Layer defaults, `file` and the environment, without extracting.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Load)
    }

    /// Make relative paths absolute against `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        if self.storage_dir.is_relative() {
            self.storage_dir = base.join(&self.storage_dir);
        }
        if self.database.is_relative() {
            self.database = base.join(&self.database);
        }
        self
    }

    pub fn validate(self) -> Result<Self> {
        if self.allowed_types.is_empty() {
            exn::bail!(ErrorKind::Invalid("allowed_types must list at least one type"));
        }
        if self.allowed_types.iter().any(|mime| mime.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("allowed_types must not contain blank entries"));
        }
        if !self.storage_dir.is_absolute() || !self.database.is_absolute() {
            exn::bail!(ErrorKind::Invalid("storage_dir and database must be absolute paths"));
        }
        if self.log_level.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("log_level must not be empty"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid_once_resolved() {
        let config = Config::default().resolve(Path::new("/srv")).validate().unwrap();
        assert!(config.allowed_types.contains(&"image/png".to_string()));
        assert_eq!(config.log_level, "info");
    }

    #[rstest]
    #[case("hoard.toml", "allowed_types = [\"image/png\"]\nlog_level = \"debug\"\n")]
    #[case("hoard.yaml", "allowed_types:\n  - image/png\nlog_level: debug\n")]
    #[case("hoard.yml", "allowed_types: [image/png]\nlog_level: debug\n")]
    #[case("hoard.json", "{\"allowed_types\": [\"image/png\"], \"log_level\": \"debug\"}")]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load(Some(Path::new(name))).unwrap();
            assert_eq!(config.allowed_types, vec!["image/png".to_string()]);
            assert_eq!(config.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_relative_paths_resolve_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hoard.toml");
        std::fs::write(&file, "storage_dir = \"objects\"\ndatabase = \"/var/lib/hoard.sqlite\"\n").unwrap();
        let config = Config::load(Some(&file)).unwrap();
        assert_eq!(config.storage_dir, dir.path().join("objects"));
        assert_eq!(config.database, PathBuf::from("/var/lib/hoard.sqlite"));
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("hoard.toml", "log_level = \"debug\"\nallowed_types = [\"image/png\"]\n")?;
            jail.set_env("HOARD_LOG_LEVEL", "trace");
            jail.set_env("HOARD_ALLOWED_TYPES", "[image/gif, image/jpeg]");
            let config = Config::load(Some(Path::new("hoard.toml"))).unwrap();
            assert_eq!(config.log_level, "trace");
            assert_eq!(config.allowed_types, vec!["image/gif".to_string(), "image/jpeg".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_empty_allow_list_is_invalid() {
        Jail::expect_with(|jail| {
            jail.create_file("hoard.toml", "allowed_types = []\n")?;
            let err = Config::load(Some(Path::new("hoard.toml"))).unwrap_err();
            assert!(matches!(*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/hoard.toml"))).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(PathBuf::from("/nonexistent/hoard.toml")));
    }

    #[test]
    fn test_unsupported_format() {
        let err = Config::figment(Some(Path::new("hoard.ini"))).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(PathBuf::from("hoard.ini")));
    }

    #[test]
    fn test_malformed_value() {
        Jail::expect_with(|jail| {
            jail.create_file("hoard.toml", "[allowed_types]\npng = 1\n")?;
            let err = Config::load(Some(Path::new("hoard.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
            Ok(())
        });
    }
}
