//! Configuration management for the ARKI server

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default upload ceiling: 32 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// The one rasterization resolution used by the flatten strategy.
/// Rendering and the `dpi` reported to clients both read this value.
pub const DEFAULT_FLATTEN_DPI: u32 = 200;

pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_OWNER_PASSWORD: &str = "arki-owner";

/// Accepted range for `FLATTEN_DPI`
const DPI_RANGE: std::ops::RangeInclusive<u32> = 72..=600;

/// Configuration errors, reported once at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("pdfium library not found at {0}")]
    EngineNotFound(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Where sanitized uploads are written
    pub upload_dir: PathBuf,
    /// Where transformed artifacts are published for download
    pub processed_dir: PathBuf,
    /// Parent of the per-invocation scratch directories
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the pdfium shared library, or the directory containing it.
    /// `None` only in defaults; `from_env` requires it.
    pub pdfium_library_path: Option<PathBuf>,
    pub flatten_dpi: u32,
    pub timeout_secs: u64,
    pub owner_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                processed_dir: PathBuf::from("processed"),
                scratch_dir: env::temp_dir(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            pipeline: PipelineConfig {
                pdfium_library_path: None,
                flatten_dpi: DEFAULT_FLATTEN_DPI,
                timeout_secs: DEFAULT_PIPELINE_TIMEOUT_SECS,
                owner_password: DEFAULT_OWNER_PASSWORD.to_string(),
            },
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// `PDFIUM_LIBRARY_PATH` is mandatory; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let flatten_dpi = parse_or(&var, "FLATTEN_DPI", defaults.pipeline.flatten_dpi)?;
        if !DPI_RANGE.contains(&flatten_dpi) {
            return Err(ConfigError::Invalid {
                name: "FLATTEN_DPI",
                value: flatten_dpi.to_string(),
                reason: format!("must be between {} and {}", DPI_RANGE.start(), DPI_RANGE.end()),
            });
        }

        let timeout_secs = parse_or(&var, "PIPELINE_TIMEOUT_SECS", defaults.pipeline.timeout_secs)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PIPELINE_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let pdfium_library_path = var("PDFIUM_LIBRARY_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("PDFIUM_LIBRARY_PATH"))?;

        Ok(Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or(defaults.server.host),
                port: parse_or(&var, "PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                upload_dir: var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                processed_dir: var("PROCESSED_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.processed_dir),
                scratch_dir: var("SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.scratch_dir),
                max_upload_bytes: parse_or(
                    &var,
                    "MAX_UPLOAD_BYTES",
                    defaults.storage.max_upload_bytes,
                )?,
            },
            pipeline: PipelineConfig {
                pdfium_library_path: Some(pdfium_library_path),
                flatten_dpi,
                timeout_secs,
                owner_password: var("OWNER_PASSWORD").unwrap_or(defaults.pipeline.owner_password),
            },
        })
    }
}

impl PipelineConfig {
    /// Resolve the configured engine path to the pdfium library file.
    ///
    /// Accepts either the library file itself or a directory holding the
    /// platform-named library (`libpdfium.so`, `pdfium.dll`, ...).
    pub fn resolve_pdfium_library(&self) -> Result<PathBuf, ConfigError> {
        let configured = self
            .pdfium_library_path
            .as_deref()
            .ok_or(ConfigError::Missing("PDFIUM_LIBRARY_PATH"))?;
        resolve_library_path(configured)
    }
}

fn resolve_library_path(configured: &Path) -> Result<PathBuf, ConfigError> {
    let candidate = if configured.is_dir() {
        pdfium_render::prelude::Pdfium::pdfium_platform_library_name_at_path(configured)
    } else {
        configured.to_path_buf()
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(ConfigError::EngineNotFound(candidate))
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_engine_path_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PDFIUM_LIBRARY_PATH")));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[("PDFIUM_LIBRARY_PATH", "/opt/pdfium")])).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.max_upload_bytes, 32 * 1024 * 1024);
        assert_eq!(config.pipeline.flatten_dpi, 200);
        assert_eq!(config.pipeline.timeout_secs, 120);
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.storage.processed_dir, PathBuf::from("processed"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PDFIUM_LIBRARY_PATH", "/opt/pdfium"),
            ("PORT", "8080"),
            ("FLATTEN_DPI", "300"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("OWNER_PASSWORD", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pipeline.flatten_dpi, 300);
        assert_eq!(config.storage.max_upload_bytes, 1024);
        assert_eq!(config.pipeline.owner_password, "s3cret");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("PDFIUM_LIBRARY_PATH", "/opt/pdfium"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_dpi_out_of_range_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("PDFIUM_LIBRARY_PATH", "/opt/pdfium"),
            ("FLATTEN_DPI", "5000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FLATTEN_DPI", .. }));
    }

    #[test]
    fn test_missing_library_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = PipelineConfig {
            pdfium_library_path: Some(dir.path().to_path_buf()),
            ..Config::default().pipeline
        };

        let err = pipeline.resolve_pdfium_library().unwrap_err();
        assert!(matches!(err, ConfigError::EngineNotFound(_)));
    }

    #[test]
    fn test_library_file_resolved_in_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let lib = pdfium_render::prelude::Pdfium::pdfium_platform_library_name_at_path(dir.path());
        std::fs::write(&lib, b"").unwrap();

        let pipeline = PipelineConfig {
            pdfium_library_path: Some(dir.path().to_path_buf()),
            ..Config::default().pipeline
        };

        assert_eq!(pipeline.resolve_pdfium_library().unwrap(), lib);
    }
}
