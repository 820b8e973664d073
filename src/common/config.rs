//! Connection settings and verbosity
//!
//! The test document names the remote endpoints; the command line may
//! override any of them.

use reqwest::Url;
use tracing::level_filters::LevelFilter;

use super::{Error, Result};
use crate::testing::TestDocument;

/// Command-line overrides for the document's connection fields
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub cx1_url: Option<String>,
    pub iam_url: Option<String>,
    pub tenant: Option<String>,
    pub proxy_url: Option<String>,
}

/// Fully resolved connection settings for the remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Base URL of the platform API
    pub cx1_url: String,
    /// Base URL of the identity provider
    pub iam_url: String,
    /// Tenant (IAM realm) name
    pub tenant: String,
    /// Optional HTTP(S) proxy
    pub proxy_url: Option<String>,
}

impl ConnectionSettings {
    /// Merge document fields with command-line overrides
    pub fn resolve(document: &TestDocument, overrides: &ConnectionOverrides) -> Result<Self> {
        let cx1_url = pick(&overrides.cx1_url, &document.cx1_url);
        let iam_url = pick(&overrides.iam_url, &document.iam_url);
        let tenant = pick(&overrides.tenant, &document.tenant);
        let proxy_url = pick(&overrides.proxy_url, &document.proxy_url);

        let cx1_url = require_url("Cx1URL", cx1_url)?;
        let iam_url = require_url("IAMURL", iam_url)?;

        if tenant.is_empty() {
            return Err(Error::Config(
                "Tenant is not set in the test document or on the command line".to_string(),
            ));
        }

        let proxy_url = if proxy_url.is_empty() {
            None
        } else {
            Url::parse(&proxy_url).map_err(|e| {
                Error::Config(format!(
                    "Failed to parse specified proxy address {}: {}",
                    proxy_url, e
                ))
            })?;
            Some(proxy_url)
        };

        Ok(Self {
            cx1_url,
            iam_url,
            tenant,
            proxy_url,
        })
    }
}

fn pick(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .unwrap_or(fallback)
        .trim()
        .to_string()
}

fn require_url(field: &str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(Error::Config(format!(
            "{} is not set in the test document or on the command line",
            field
        )));
    }
    Url::parse(&value).map_err(|e| Error::Config(format!("Invalid {} '{}': {}", field, value, e)))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Map a document `LogLevel` value to a level filter
///
/// Returns `None` for an empty value. Unknown names are a config error.
pub fn parse_log_level(value: &str) -> Result<Option<LevelFilter>> {
    let level = match value.trim().to_uppercase().as_str() {
        "" => return Ok(None),
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "FATAL" => LevelFilter::ERROR,
        other => {
            return Err(Error::Config(format!("Unknown LogLevel '{}'", other)));
        }
    };
    Ok(Some(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> TestDocument {
        serde_yaml::from_str(
            r#"
Cx1URL: https://eu.ast.example.net/
IAMURL: https://eu.iam.example.net
Tenant: acme
Tests: []
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_document_values_are_used() {
        let settings =
            ConnectionSettings::resolve(&document(), &ConnectionOverrides::default()).unwrap();
        assert_eq!(settings.cx1_url, "https://eu.ast.example.net");
        assert_eq!(settings.iam_url, "https://eu.iam.example.net");
        assert_eq!(settings.tenant, "acme");
        assert_eq!(settings.proxy_url, None);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConnectionOverrides {
            cx1_url: Some("https://us.ast.example.net".to_string()),
            iam_url: None,
            tenant: Some("other".to_string()),
            proxy_url: Some("http://127.0.0.1:8080".to_string()),
        };
        let settings = ConnectionSettings::resolve(&document(), &overrides).unwrap();
        assert_eq!(settings.cx1_url, "https://us.ast.example.net");
        assert_eq!(settings.iam_url, "https://eu.iam.example.net");
        assert_eq!(settings.tenant, "other");
        assert_eq!(settings.proxy_url.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_missing_tenant_is_rejected() {
        let mut doc = document();
        doc.tenant.clear();
        let err = ConnectionSettings::resolve(&doc, &ConnectionOverrides::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let overrides = ConnectionOverrides {
            proxy_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(ConnectionSettings::resolve(&document(), &overrides).is_err());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("").unwrap(), None);
        assert_eq!(parse_log_level("debug").unwrap(), Some(LevelFilter::DEBUG));
        assert_eq!(parse_log_level("WARNING").unwrap(), Some(LevelFilter::WARN));
        assert_eq!(parse_log_level("Fatal").unwrap(), Some(LevelFilter::ERROR));
        assert!(parse_log_level("loud").is_err());
    }
}
