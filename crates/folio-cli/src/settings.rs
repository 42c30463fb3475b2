//! Binary settings loaded from `folio.toml`
//!
//! ```toml
//! log_filter = "folio=debug"
//! json_logs = false
//! instruction_limit = 100000
//! memory_limit = 8388608
//! ```

use anyhow::Context;
use folio_expr::{EngineLimits, DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MEMORY_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of the `folio` binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioSettings {
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Expression instruction budget
    pub instruction_limit: u32,
    /// Expression memory limit in bytes
    pub memory_limit: usize,
}

impl FolioSettings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from TOML
    ///
    /// # Errors
    /// Returns error if the document is malformed
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        toml::from_str(toml).context("invalid settings")
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With JSON log output
    #[inline]
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// With expression instruction budget
    #[inline]
    #[must_use]
    pub fn with_instruction_limit(mut self, limit: u32) -> Self {
        self.instruction_limit = limit;
        self
    }

    /// With expression memory limit
    #[inline]
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Expression engine limits
    #[must_use]
    pub fn engine_limits(&self) -> EngineLimits {
        EngineLimits::default()
            .with_instructions(self.instruction_limit)
            .with_memory_bytes(self.memory_limit)
    }
}

impl Default for FolioSettings {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            json_logs: false,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn partial_documents_keep_defaults() {
        let settings = FolioSettings::from_toml_str("json_logs = true").unwrap();
        assert_eq!(settings, FolioSettings::new().with_json_logs(true));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FolioSettings::from_toml_str("colour = true").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_filter = \"folio=debug\"\ninstruction_limit = 500").unwrap();

        let settings = FolioSettings::load(file.path()).unwrap();
        assert_eq!(settings.log_filter, "folio=debug");
        assert_eq!(settings.engine_limits().instructions, 500);
        assert_eq!(settings.engine_limits().memory_bytes, DEFAULT_MEMORY_LIMIT);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = FolioSettings::load(Path::new("/nonexistent/folio.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/folio.toml"));
    }
}
