use std::fs;
use std::path::Path;

use serde::Deserialize;

use hypermedia_base::{ErrorKind, HypermediaError, HypermediaResult, ResultExt};

use crate::format::OutputFormat;

pub const DEFAULT_VENDOR: &str = "vnd.hypermedia.api";

/// Output settings, usually read from `hypermedia.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Vendor part of generated media types, e.g. `vnd.acme.api`.
    pub vendor: String,
    /// Serialization format of response bodies.
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
            format: OutputFormat::Json,
        }
    }
}

pub fn parse_config(text: &str) -> HypermediaResult<OutputConfig> {
    toml::from_str(text).map_err(|err| Box::new(HypermediaError::config(err.to_string())))
}

pub fn load_config(path: &Path) -> HypermediaResult<OutputConfig> {
    let text = fs::read_to_string(path).map_err(|source| {
        Box::new(HypermediaError::new(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    parse_config(&text).with_context(|| format!("Failed to load {}", path.display()))
}
