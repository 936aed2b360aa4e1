//! Detection of tunnel interstitial pages.
//!
//! Free tunnel tiers answer the first request from an unknown client with an
//! HTML warning page and a 200 status. This is a fingerprint check, not an
//! HTML parser.

/// Markers of an HTML document, matched case-insensitively.
const HTML_MARKERS: &[&str] = &["<!doctype html", "<html"];

/// Phrases that appear on the tunnel's own warning page.
const WARNING_PHRASES: &[&str] = &["warning", "browser", "potential threat"];

/// Whether a non-JSON body is an HTML page (tunnel warning or otherwise).
pub fn is_interstitial_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    looks_like_html(&lower) || mentions_tunnel_warning(&lower)
}

fn looks_like_html(lower: &str) -> bool {
    HTML_MARKERS.iter().any(|m| lower.contains(m))
}

fn mentions_tunnel_warning(lower: &str) -> bool {
    lower.contains("ngrok") && WARNING_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngrok_warning_page() {
        let page = r#"<!DOCTYPE html>
<html class="h-full" lang="en-US" dir="ltr">
<head><title>ngrok</title></head>
<body><p>You are about to visit abc.ngrok-free.app. This website is served for free through ngrok.com.
You should only visit this website if you trust whoever sent the link to you.</p>
<button>Visit Site</button></body></html>"#;
        assert!(is_interstitial_page(page));
    }

    #[test]
    fn test_html_marker_case_insensitive() {
        assert!(is_interstitial_page("<HTML><BODY>gateway</BODY></HTML>"));
        assert!(is_interstitial_page("  <!DocType HTML>\n<p>x</p>"));
    }

    #[test]
    fn test_plain_text_warning_without_html() {
        assert!(is_interstitial_page(
            "ngrok: potential threat detected, confirm in your browser"
        ));
    }

    #[test]
    fn test_non_html_bodies() {
        assert!(!is_interstitial_page("Internal Server Error"));
        assert!(!is_interstitial_page("{\"job_id\": "));
        assert!(!is_interstitial_page("ngrok tunnel ok"));
        assert!(!is_interstitial_page(""));
    }
}
