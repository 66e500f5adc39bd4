//! Navigation preflight
//!
//! Before the first capture the target URL is checked for reachability. If it
//! does not answer, the fallback URL is tried, and if that fails too a local
//! placeholder page is written and recorded instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

/// File name of the generated placeholder page
pub const PLACEHOLDER_FILE_NAME: &str = "placeholder.html";

/// Which page the recording actually shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// The requested URL answered
    Primary { url: String },
    /// The requested URL failed; `url` is the fallback URL or the placeholder page
    Fallback { url: String, reason: String },
}

impl NavigationOutcome {
    /// URL frames should be captured from
    pub fn url(&self) -> &str {
        match self {
            NavigationOutcome::Primary { url } | NavigationOutcome::Fallback { url, .. } => url,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, NavigationOutcome::Fallback { .. })
    }
}

/// Resolves the page to record
#[derive(Debug, Clone)]
pub struct Navigator {
    client: reqwest::Client,
    fallback_url: Option<String>,
    placeholder_dir: PathBuf,
    title: String,
}

impl Navigator {
    /// `title` is shown on the placeholder page; the page is written into
    /// `placeholder_dir` only when needed
    pub fn new(fallback_url: Option<String>, placeholder_dir: PathBuf, title: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PREFLIGHT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            fallback_url,
            placeholder_dir,
            title: title.to_string(),
        }
    }

    /// Check one URL. http(s) URLs must answer with a success or redirect
    /// status; file URLs must point at an existing file; anything else is
    /// passed through unchecked.
    pub async fn check(&self, url: &str) -> std::result::Result<(), String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
            let status = response.status();
            if status.is_success() || status.is_redirection() {
                Ok(())
            } else {
                Err(format!("HTTP {}", status.as_u16()))
            }
        } else if let Some(path) = url.strip_prefix("file://") {
            if Path::new(path).is_file() {
                Ok(())
            } else {
                Err(format!("file not found: {}", path))
            }
        } else {
            Ok(())
        }
    }

    /// Pick the page to record: primary, then fallback, then placeholder
    pub async fn resolve(&self, url: &str) -> Result<NavigationOutcome> {
        let primary_error = match self.check(url).await {
            Ok(()) => {
                tracing::debug!(url = %url, "Navigation preflight passed");
                return Ok(NavigationOutcome::Primary { url: url.to_string() });
            }
            Err(e) => e,
        };

        tracing::warn!(url = %url, error = %primary_error, "Target page unreachable");

        if let Some(fallback) = &self.fallback_url {
            match self.check(fallback).await {
                Ok(()) => {
                    tracing::info!(url = %fallback, "Recording fallback page");
                    return Ok(NavigationOutcome::Fallback {
                        url: fallback.clone(),
                        reason: primary_error,
                    });
                }
                Err(e) => {
                    tracing::warn!(url = %fallback, error = %e, "Fallback page unreachable");
                }
            }
        }

        let placeholder = self.write_placeholder(url, &primary_error).await?;
        tracing::info!(path = %placeholder.display(), "Recording placeholder page");

        Ok(NavigationOutcome::Fallback {
            url: format!("file://{}", placeholder.display()),
            reason: primary_error,
        })
    }

    async fn write_placeholder(&self, url: &str, reason: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.placeholder_dir).await?;
        let path = self.placeholder_dir.join(PLACEHOLDER_FILE_NAME);
        tokio::fs::write(&path, placeholder_html(&self.title, url, reason)).await?;
        // Browsers want absolute file URLs
        Ok(std::fs::canonicalize(&path).unwrap_or(path))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Static page shown when neither the target nor the fallback is reachable
pub fn placeholder_html(title: &str, url: &str, reason: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ margin: 0; height: 100vh; display: flex; align-items: center; justify-content: center;
         font-family: sans-serif; background: #0f172a; color: #e2e8f0; }}
  main {{ text-align: center; }}
  p {{ color: #94a3b8; }}
</style>
</head>
<body>
<main>
  <h1>{title}</h1>
  <p>Live view unavailable: {url}</p>
  <p>{reason}</p>
</main>
</body>
</html>
"#,
        title = escape_html(title),
        url = escape_html(url),
        reason = escape_html(reason),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_escapes_input() {
        let html = placeholder_html("<Demo>", "http://x?a=1&b=2", "HTTP 503");
        assert!(html.contains("&lt;Demo&gt;"));
        assert!(html.contains("a=1&amp;b=2"));
        assert!(!html.contains("<Demo>"));
    }

    #[tokio::test]
    async fn test_unknown_scheme_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let navigator = Navigator::new(None, dir.path().to_path_buf(), "Demo");
        let outcome = navigator.resolve("about:blank").await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Primary { url: "about:blank".to_string() });
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback.html");
        std::fs::write(&fallback, "<html></html>").unwrap();
        let fallback_url = format!("file://{}", fallback.display());

        let navigator = Navigator::new(Some(fallback_url.clone()), dir.path().to_path_buf(), "Demo");
        let outcome = navigator.resolve("file:///definitely/missing.html").await.unwrap();

        assert!(outcome.is_fallback());
        assert_eq!(outcome.url(), fallback_url);
    }

    #[tokio::test]
    async fn test_placeholder_written_when_everything_fails() {
        let dir = tempfile::tempdir().unwrap();
        let navigator = Navigator::new(
            Some("file:///also/missing.html".to_string()),
            dir.path().to_path_buf(),
            "Dashboard demo",
        );

        let outcome = navigator.resolve("file:///definitely/missing.html").await.unwrap();
        match &outcome {
            NavigationOutcome::Fallback { url, reason } => {
                assert!(url.starts_with("file://"));
                assert!(url.ends_with(PLACEHOLDER_FILE_NAME));
                assert!(reason.contains("file not found"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let html = std::fs::read_to_string(dir.path().join(PLACEHOLDER_FILE_NAME)).unwrap();
        assert!(html.contains("Dashboard demo"));
    }
}
