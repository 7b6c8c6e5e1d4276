use orch_domain::config::ValidationConfig;

/// A single security response header (name, value) pair.
pub struct SecurityHeader {
    pub name: &'static str,
    pub value: String,
}

/// Build the full set of security headers for a response (spec §4.3).
/// `is_tls` gates HSTS, which must never be sent over plain HTTP.
/// `is_websocket_upgrade` strips the headers that don't make sense on a
/// 101 Switching Protocols response.
pub fn security_headers(
    config: &ValidationConfig,
    is_tls: bool,
    is_websocket_upgrade: bool,
    is_api_response: bool,
) -> Vec<SecurityHeader> {
    if is_websocket_upgrade {
        return Vec::new();
    }

    let mut headers = vec![
        SecurityHeader {
            name: "Content-Security-Policy",
            value: concat!(
                "default-src 'self'; ",
                "script-src 'self' 'unsafe-inline' 'unsafe-eval'; ",
                "style-src 'self' 'unsafe-inline'; ",
                "img-src 'self' data: https:; ",
                "font-src 'self' data:; ",
                "connect-src 'self' ws: wss:; ",
                "frame-src 'none'; ",
                "object-src 'none'; ",
                "base-uri 'self'"
            )
            .to_string(),
        },
        SecurityHeader {
            name: "X-Frame-Options",
            value: "DENY".to_string(),
        },
        SecurityHeader {
            name: "X-Content-Type-Options",
            value: "nosniff".to_string(),
        },
        SecurityHeader {
            name: "X-XSS-Protection",
            value: "1; mode=block".to_string(),
        },
        SecurityHeader {
            name: "Referrer-Policy",
            value: "strict-origin-when-cross-origin".to_string(),
        },
        SecurityHeader {
            name: "Permissions-Policy",
            value: concat!(
                "camera=(), microphone=(), geolocation=(), ",
                "payment=(), usb=(), magnetometer=(), ",
                "gyroscope=(), accelerometer=()"
            )
            .to_string(),
        },
        SecurityHeader {
            name: "X-Download-Options",
            value: "noopen".to_string(),
        },
        SecurityHeader {
            name: "Cross-Origin-Embedder-Policy",
            value: "require-corp".to_string(),
        },
        SecurityHeader {
            name: "Cross-Origin-Opener-Policy",
            value: "same-origin".to_string(),
        },
        SecurityHeader {
            name: "Cross-Origin-Resource-Policy",
            value: "same-origin".to_string(),
        },
    ];

    if is_tls && config.hsts_enabled {
        headers.push(SecurityHeader {
            name: "Strict-Transport-Security",
            value: "max-age=31536000; includeSubDomains; preload".to_string(),
        });
    }

    if is_api_response {
        headers.push(SecurityHeader {
            name: "Cache-Control",
            value: "no-cache, no-store, must-revalidate".to_string(),
        });
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_upgrade_gets_no_headers() {
        let config = ValidationConfig::from_env();
        assert!(security_headers(&config, false, true, false).is_empty());
    }

    #[test]
    fn hsts_only_sent_over_tls() {
        let config = ValidationConfig::from_env();
        let plain = security_headers(&config, false, false, false);
        assert!(!plain.iter().any(|h| h.name == "Strict-Transport-Security"));

        let tls = security_headers(&config, true, false, false);
        assert!(tls.iter().any(|h| h.name == "Strict-Transport-Security"));
    }

    #[test]
    fn api_responses_get_no_cache_header() {
        let config = ValidationConfig::from_env();
        let headers = security_headers(&config, false, false, true);
        assert!(headers.iter().any(|h| h.name == "Cache-Control"));
    }
}
