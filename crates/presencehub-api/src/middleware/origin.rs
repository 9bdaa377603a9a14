//! Origin checks for the websocket handshake.

use axum::http::HeaderMap;
use axum::http::header::{HOST, ORIGIN};

use presencehub_core::config::app::ServerConfig;

/// Whether a handshake's `Origin` may open the websocket endpoint.
///
/// Requests without an `Origin` header (non-browser clients) pass. A browser
/// origin passes when it is the server's own (its authority matches `Host`)
/// or is listed in `allowed_origins`.
pub fn origin_allowed(headers: &HeaderMap, config: &ServerConfig) -> bool {
    let Some(origin) = headers.get(ORIGIN) else {
        return true;
    };
    if config.allows_any_origin() {
        return true;
    }
    let Ok(origin) = origin.to_str() else {
        return false;
    };

    if config
        .allowed_origins
        .iter()
        .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
    {
        return true;
    }

    same_origin(origin, headers)
}

fn same_origin(origin: &str, headers: &HeaderMap) -> bool {
    let Some(authority) = origin.split_once("://").map(|(_, rest)| rest) else {
        // "null" and other opaque origins
        return false;
    };
    headers
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .is_some_and(|host| host.eq_ignore_ascii_case(authority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(origin: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("chat.example.com:8080"));
        if let Some(origin) = origin {
            headers.insert(ORIGIN, HeaderValue::from_static(origin));
        }
        headers
    }

    fn config(allowed: &[&str]) -> ServerConfig {
        ServerConfig {
            allowed_origins: allowed.iter().map(|o| o.to_string()).collect(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_same_origin_and_missing_origin_pass() {
        let config = config(&[]);
        assert!(origin_allowed(&headers(None), &config));
        assert!(origin_allowed(&headers(Some("http://chat.example.com:8080")), &config));
        assert!(origin_allowed(&headers(Some("https://CHAT.example.com:8080")), &config));
    }

    #[test]
    fn test_foreign_origin_rejected_unless_listed() {
        let foreign = headers(Some("http://evil.example"));
        assert!(!origin_allowed(&foreign, &config(&[])));
        assert!(!origin_allowed(&headers(Some("null")), &config(&[])));
        assert!(!origin_allowed(&headers(Some("http://chat.example.com")), &config(&[])));

        assert!(origin_allowed(&foreign, &config(&["http://evil.example/"])));
        assert!(origin_allowed(&foreign, &config(&["*"])));
    }
}
