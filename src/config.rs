//! Submission settings, read from a TOML file and overridden by flags.
//!
//! ```toml
//! target = "https://example.org/submission"
//! ceiling = 10000000
//! encoding = "auto"          # auto | structured | manual
//! document_field = "xml_submission_file"
//! attachment_field = "mediaFiles"
//! timeout_secs = 600
//!
//! [headers]
//! Cookie = "JSESSIONID=..."
//! ```

use crate::error::{Result, SubmitError};
use crate::submission::{BatchPlanner, EncodingChoice, FieldNames, SessionOptions, DEFAULT_CEILING};
use crate::transport::http::header_map;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubmitConfig {
    pub target: Option<String>,
    pub ceiling: u64,
    pub encoding: EncodingChoice,
    pub document_field: String,
    pub attachment_field: String,
    pub headers: BTreeMap<String, String>,
    /// Whole-request timeout for the HTTP client. Unset means none.
    pub timeout_secs: Option<u64>,
    /// Headers added from the command line, after the file's.
    #[serde(skip)]
    pub extra_headers: Vec<(String, String)>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        let fields = FieldNames::default();
        Self {
            target: None,
            ceiling: DEFAULT_CEILING,
            encoding: EncodingChoice::Auto,
            document_field: fields.document,
            attachment_field: fields.attachment,
            headers: BTreeMap::new(),
            timeout_secs: None,
            extra_headers: Vec::new(),
        }
    }
}

impl SubmitConfig {
    /// `<config dir>/batchpost/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("batchpost").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SubmitError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
            .map_err(|e| SubmitError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// An explicit path must exist; the default file is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// File headers first, then command-line ones.
    pub fn all_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(self.extra_headers.iter().cloned())
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let target = self
            .target
            .as_deref()
            .ok_or_else(|| SubmitError::Config("no target URL given".to_string()))?;
        let url = reqwest::Url::parse(target)
            .map_err(|e| SubmitError::Config(format!("invalid target URL '{}': {}", target, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SubmitError::Config(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        if self.ceiling == 0 {
            return Err(SubmitError::Config(
                "ceiling must be at least 1 byte".to_string(),
            ));
        }
        if self.document_field.is_empty() || self.attachment_field.is_empty() {
            return Err(SubmitError::Config(
                "form field names must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(SubmitError::Config(
                "timeout_secs must be positive".to_string(),
            ));
        }

        header_map(&self.all_headers()).map_err(|e| SubmitError::Config(format!("{:#}", e)))?;
        Ok(())
    }

    /// Validate and turn into session options starting at the first
    /// attachment.
    pub fn session_options(&self) -> Result<SessionOptions> {
        self.validate()?;
        Ok(SessionOptions {
            target: self.target.clone().unwrap_or_default(),
            headers: self.all_headers(),
            planner: BatchPlanner::new(self.ceiling)?,
            encoding: self.encoding,
            fields: FieldNames {
                document: self.document_field.clone(),
                attachment: self.attachment_field.clone(),
            },
            start_index: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn with_target() -> SubmitConfig {
        SubmitConfig {
            target: Some("http://localhost:8080/submission".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full_file() {
        let config = SubmitConfig::parse(
            r#"
            target = "https://example.org/submission"
            ceiling = 5000
            encoding = "manual"
            attachment_field = "datafile"
            timeout_secs = 30

            [headers]
            Cookie = "JSESSIONID=abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.ceiling, 5000);
        assert_eq!(config.encoding, EncodingChoice::Manual);
        assert_eq!(config.document_field, "xml_submission_file");
        assert_eq!(config.attachment_field, "datafile");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.all_headers(),
            vec![("Cookie".to_string(), "JSESSIONID=abc".to_string())]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = SubmitConfig::parse("").unwrap();
        assert_eq!(config, SubmitConfig::default());
        assert_eq!(config.ceiling, DEFAULT_CEILING);
        assert_eq!(config.encoding, EncodingChoice::Auto);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(SubmitConfig::parse("chunk_size = 5").is_err());
    }

    #[test]
    fn test_validation() {
        with_target().validate().unwrap();

        assert!(SubmitConfig::default().validate().is_err());

        let mut config = with_target();
        config.ceiling = 0;
        assert!(matches!(config.validate(), Err(SubmitError::Config(_))));

        let mut config = with_target();
        config.target = Some("ftp://example.org/x".to_string());
        assert!(config.validate().is_err());

        let mut config = with_target();
        config.target = Some("not a url".to_string());
        assert!(config.validate().is_err());

        let mut config = with_target();
        config.document_field.clear();
        assert!(config.validate().is_err());

        let mut config = with_target();
        config.extra_headers.push(("Bad Name".to_string(), "x".to_string()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_headers_follow_file_headers() {
        let mut config = with_target();
        config
            .headers
            .insert("Cookie".to_string(), "a=1".to_string());
        config
            .extra_headers
            .push(("Cookie".to_string(), "b=2".to_string()));

        let options = config.session_options().unwrap();
        assert_eq!(
            options.headers,
            vec![
                ("Cookie".to_string(), "a=1".to_string()),
                ("Cookie".to_string(), "b=2".to_string())
            ]
        );
        assert_eq!(options.planner.ceiling(), DEFAULT_CEILING);
    }

    #[test]
    fn test_load_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "ceiling = \"big\"").unwrap();

        let err = SubmitConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));

        let missing = SubmitConfig::load_or_default(Some(&tmp.path().join("nope.toml")));
        assert!(missing.is_err());
    }
}
