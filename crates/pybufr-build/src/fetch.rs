//! HTTP access to the library download site.

use std::io::Write;

use crate::error::{InstallError, InstallResult};

/// Fetches remote documents.
pub trait Fetcher {
    /// Fetches `url` as text.
    fn fetch_text(&self, url: &str) -> InstallResult<String>;

    /// Fetches `url` and streams the body into `dest`.
    fn fetch_to(&self, url: &str, dest: &mut dyn Write) -> InstallResult<u64>;
}

/// Fetcher backed by `ureq`. No retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> InstallResult<String> {
        let mut response = ureq::get(url)
            .call()
            .map_err(|e| InstallError::fetch_failed(url, e))?;
        if response.status() != 200 {
            return Err(InstallError::fetch_failed(
                url,
                format!("HTTP {}", response.status()),
            ));
        }
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| InstallError::fetch_failed(url, e))
    }

    fn fetch_to(&self, url: &str, dest: &mut dyn Write) -> InstallResult<u64> {
        let response = ureq::get(url)
            .call()
            .map_err(|e| InstallError::fetch_failed(url, e))?;
        if response.status() != 200 {
            return Err(InstallError::fetch_failed(
                url,
                format!("HTTP {}", response.status()),
            ));
        }
        let (_parts, body) = response.into_parts();
        let mut reader = body.into_reader();
        std::io::copy(&mut reader, dest).map_err(|e| InstallError::fetch_failed(url, e))
    }
}
