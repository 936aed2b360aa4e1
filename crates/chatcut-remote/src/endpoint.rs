//! Remote endpoint normalization.
//!
//! Turns whatever the user pasted into the plugin into a canonical base URL
//! plus the transport policy for that host. Pure: no I/O happens here.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::error::{RemoteError, RemoteResult};

/// Header that tells the tunnel to skip its browser warning page.
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Domain suffixes of tunnel providers whose certificates the local trust
/// store rejects and which interpose an HTML warning page.
const TUNNEL_SUFFIXES: &[&str] = &[
    "ngrok-free.app",
    "ngrok-free.dev",
    "ngrok.app",
    "ngrok.dev",
    "ngrok.io",
];

/// Canonical remote base URL and its transport policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    base_url: String,
    verify_tls: bool,
    headers: Vec<(String, String)>,
}

impl RemoteEndpoint {
    /// Normalize a user-supplied base URL.
    pub fn normalize(raw: &str) -> RemoteResult<Self> {
        let trimmed = raw.trim();
        let (scheme, rest) = split_scheme(trimmed);
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Err(RemoteError::invalid_request("Colab URL is empty"));
        }

        let host = Url::parse(&format!("https://{}", rest))
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .ok_or_else(|| RemoteError::invalid_request(format!("Invalid Colab URL: {}", raw)))?;

        if is_tunnel_host(&host) {
            Ok(Self {
                base_url: format!("https://{}", rest),
                verify_tls: false,
                headers: vec![(TUNNEL_BYPASS_HEADER.to_string(), "true".to_string())],
            })
        } else {
            Ok(Self {
                base_url: format!("{}://{}", scheme.unwrap_or("https"), rest),
                verify_tls: true,
                headers: Vec::new(),
            })
        }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Extra headers sent with every request.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Join an API path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Resolve a download URL that may be absolute or base-relative.
    pub fn resolve(&self, download_url: &str) -> String {
        let lower = download_url.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            download_url.to_string()
        } else {
            self.url(download_url)
        }
    }

    /// HTTP client honouring this endpoint's transport policy.
    pub fn http_client(&self, user_agent: &str, connect_timeout: Duration) -> RemoteResult<Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RemoteError::invalid_request(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RemoteError::invalid_request(e.to_string()))?;
            headers.insert(name, value);
        }

        Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.verify_tls)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(RemoteError::Network)
    }
}

fn split_scheme(url: &str) -> (Option<&'static str>, &str) {
    let lower = url.to_lowercase();
    if lower.starts_with("https://") {
        (Some("https"), &url["https://".len()..])
    } else if lower.starts_with("http://") {
        (Some("http"), &url["http://".len()..])
    } else {
        (None, url)
    }
}

fn is_tunnel_host(host: &str) -> bool {
    TUNNEL_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_forces_https_and_disables_verification() {
        let ep = RemoteEndpoint::normalize("http://abc-123.ngrok-free.app/").unwrap();
        assert_eq!(ep.base_url(), "https://abc-123.ngrok-free.app");
        assert!(!ep.verify_tls());
        assert_eq!(
            ep.headers(),
            &[(TUNNEL_BYPASS_HEADER.to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_tunnel_without_scheme() {
        let ep = RemoteEndpoint::normalize("  xyz.ngrok-free.dev  ").unwrap();
        assert_eq!(ep.base_url(), "https://xyz.ngrok-free.dev");
        assert!(!ep.verify_tls());
    }

    #[test]
    fn test_other_hosts_default_to_https() {
        let ep = RemoteEndpoint::normalize("worker.example.com//").unwrap();
        assert_eq!(ep.base_url(), "https://worker.example.com");
        assert!(ep.verify_tls());
        assert!(ep.headers().is_empty());
    }

    #[test]
    fn test_other_hosts_keep_explicit_scheme() {
        let ep = RemoteEndpoint::normalize("http://127.0.0.1:8000/").unwrap();
        assert_eq!(ep.base_url(), "http://127.0.0.1:8000");
        assert!(ep.verify_tls());
    }

    #[test]
    fn test_lookalike_host_is_not_tunnel() {
        let ep = RemoteEndpoint::normalize("https://notngrok-free.app.evil.com").unwrap();
        assert!(ep.verify_tls());
    }

    #[test]
    fn test_is_deterministic() {
        let a = RemoteEndpoint::normalize("HTTPS://Abc.Ngrok-Free.App").unwrap();
        let b = RemoteEndpoint::normalize("HTTPS://Abc.Ngrok-Free.App").unwrap();
        assert_eq!(a, b);
        assert!(!a.verify_tls());
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(RemoteEndpoint::normalize("   ").is_err());
        assert!(RemoteEndpoint::normalize("https:///").is_err());
    }

    #[test]
    fn test_url_and_resolve() {
        let ep = RemoteEndpoint::normalize("https://w.example.com").unwrap();
        assert_eq!(ep.url("/progress/ab12"), "https://w.example.com/progress/ab12");
        assert_eq!(ep.resolve("/d/x.mp4"), "https://w.example.com/d/x.mp4");
        assert_eq!(ep.resolve("download/x.mp4"), "https://w.example.com/download/x.mp4");
        assert_eq!(
            ep.resolve("https://cdn.example.com/x.mp4"),
            "https://cdn.example.com/x.mp4"
        );
    }
}
