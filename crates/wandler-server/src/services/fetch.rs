// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote source fetch — downloads a PDF named by URL for conversion.
//
// Only http and https are accepted. A response must look like a PDF (by
// declared type, URL path, or magic bytes) and then actually parse as one
// before it reaches a converter.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, instrument};
use wandler_core::error::{Result, WandlerError};
use wandler_document::pdf::reader::{load_document, looks_like_pdf};

const FALLBACK_NAME: &str = "document.pdf";

/// A downloaded source document.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl RemoteFetcher {
    /// `timeout` bounds both connecting and the whole transfer.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("wandler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WandlerError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, max_bytes })
    }

    #[instrument(skip(self))]
    pub async fn fetch_pdf(&self, source: &str) -> Result<RemoteDocument> {
        let url = parse_source(source)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| WandlerError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WandlerError::Fetch(format!("{url} returned {status}")));
        }
        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(WandlerError::Fetch(format!(
                "{url} is larger than the {} byte limit",
                self.max_bytes
            )));
        }

        let declared_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WandlerError::Fetch(format!("{url}: {e}")))?;
        if bytes.len() > self.max_bytes {
            return Err(WandlerError::Fetch(format!(
                "{url} is larger than the {} byte limit",
                self.max_bytes
            )));
        }

        let path_pdf = url.path().to_ascii_lowercase().ends_with(".pdf");
        if !(declared_pdf || path_pdf || looks_like_pdf(&bytes)) {
            return Err(WandlerError::Fetch(format!("{url} did not return a PDF")));
        }
        load_document(&bytes)
            .map_err(|e| WandlerError::Fetch(format!("{url} is not a readable PDF: {e}")))?;

        let name = document_name(&url);
        info!(%name, bytes = bytes.len(), "remote document fetched");
        Ok(RemoteDocument {
            name,
            bytes: bytes.to_vec(),
        })
    }
}

/// Accept only absolute http(s) URLs.
pub fn parse_source(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WandlerError::Validation("pdf_path is required".into()));
    }
    let url = Url::parse(raw).map_err(|_| {
        WandlerError::Validation(format!(
            "'{raw}' is not a URL; local file paths are not accepted"
        ))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        "file" => Err(WandlerError::Validation(
            "local file paths are not accepted".into(),
        )),
        other => Err(WandlerError::Validation(format!(
            "unsupported URL scheme '{other}', use http or https"
        ))),
    }
}

fn document_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| FALLBACK_NAME.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_web_urls_are_sources() {
        assert!(parse_source("https://example.com/a.pdf").is_ok());
        assert!(parse_source(" http://example.com/report ").is_ok());
        for rejected in ["", "/tmp/a.pdf", "file:///tmp/a.pdf", "ftp://host/a.pdf", "a.pdf"] {
            assert!(
                matches!(parse_source(rejected), Err(WandlerError::Validation(_))),
                "{rejected:?}"
            );
        }
    }

    #[test]
    fn names_come_from_the_last_path_segment() {
        let url = Url::parse("https://example.com/files/q3-report.pdf?x=1").unwrap();
        assert_eq!(document_name(&url), "q3-report.pdf");
        let bare = Url::parse("https://example.com/").unwrap();
        assert_eq!(document_name(&bare), FALLBACK_NAME);
    }
}
