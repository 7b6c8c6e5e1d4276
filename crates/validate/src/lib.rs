//! Request validation & security headers (spec §4.3).

mod headers;
mod patterns;

pub use headers::{security_headers, SecurityHeader};
pub use patterns::{PatternFamilies, PatternFamily};

use orch_domain::config::ValidationConfig;
use orch_domain::error::Error;
use orch_domain::trace::TraceEvent;

pub struct Validator {
    config: ValidationConfig,
    patterns: PatternFamilies,
}

#[derive(Debug, Clone, Copy)]
pub enum RejectReason {
    RequestTooLarge,
    JsonTooLarge,
    TooManyQueryParams,
    TooManyHeaders,
    HeaderTooLarge,
    UnsupportedContentType,
    BlockedUserAgent,
    PatternMatch(PatternFamily),
}

impl RejectReason {
    pub fn status_code(self) -> u16 {
        match self {
            RejectReason::RequestTooLarge | RejectReason::JsonTooLarge => 413,
            RejectReason::UnsupportedContentType => 415,
            _ => 400,
        }
    }
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            patterns: PatternFamilies::new(),
        }
    }

    fn enabled_families(&self) -> Vec<PatternFamily> {
        let mut families = Vec::new();
        if self.config.sql_injection_protection {
            families.push(PatternFamily::Sql);
        }
        if self.config.xss_protection {
            families.push(PatternFamily::Xss);
        }
        if self.config.path_traversal_protection {
            families.push(PatternFamily::PathTraversal);
        }
        if self.config.command_injection_protection {
            families.push(PatternFamily::Command);
        }
        families
    }

    pub fn check_size(&self, body_len: usize, is_json: bool) -> Result<(), RejectReason> {
        if body_len > self.config.max_request_size_bytes {
            return Err(RejectReason::RequestTooLarge);
        }
        if is_json && body_len > self.config.max_json_size_bytes {
            return Err(RejectReason::JsonTooLarge);
        }
        Ok(())
    }

    pub fn check_headers(&self, header_count: usize, max_header_value_len: usize) -> Result<(), RejectReason> {
        if header_count > self.config.max_headers {
            return Err(RejectReason::TooManyHeaders);
        }
        if max_header_value_len > self.config.max_header_size_bytes {
            return Err(RejectReason::HeaderTooLarge);
        }
        Ok(())
    }

    pub fn check_query_params(&self, count: usize) -> Result<(), RejectReason> {
        if count > self.config.max_query_params {
            return Err(RejectReason::TooManyQueryParams);
        }
        Ok(())
    }

    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<(), RejectReason> {
        match content_type {
            None => Ok(()),
            Some(ct) => {
                let base = ct.split(';').next().unwrap_or(ct).trim();
                if self.config.allowed_content_types.contains(base) {
                    Ok(())
                } else {
                    Err(RejectReason::UnsupportedContentType)
                }
            }
        }
    }

    pub fn check_user_agent(&self, user_agent: Option<&str>) -> Result<(), RejectReason> {
        if let Some(ua) = user_agent {
            let lower = ua.to_ascii_lowercase();
            if self
                .config
                .blocked_user_agent_substrings
                .iter()
                .any(|blocked| lower.contains(blocked.as_str()))
            {
                return Err(RejectReason::BlockedUserAgent);
            }
        }
        Ok(())
    }

    /// Scan a single string field against every enabled pattern family.
    pub fn scan_str(&self, value: &str) -> Result<(), RejectReason> {
        if let Some(family) = self.patterns.first_match(value, &self.enabled_families()) {
            return Err(RejectReason::PatternMatch(family));
        }
        Ok(())
    }

    /// Recursively scan a JSON value's keys and leaf strings (spec §4.3).
    pub fn scan_json(&self, value: &serde_json::Value) -> Result<(), RejectReason> {
        match value {
            serde_json::Value::String(s) => self.scan_str(s),
            serde_json::Value::Array(items) => {
                for item in items {
                    self.scan_json(item)?;
                }
                Ok(())
            }
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    self.scan_str(k)?;
                    self.scan_json(v)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Convert a rejection into the crate-wide [`Error`], logging the
    /// matched family (never surfaced to the client — spec §4.3: "no
    /// pattern disclosure").
    pub fn to_error(&self, client_ip: &str, path: &str, reason: RejectReason) -> Error {
        if let RejectReason::PatternMatch(family) = reason {
            TraceEvent::ValidationRejected {
                client_ip: client_ip.to_string(),
                path: path.to_string(),
                pattern_family: family.as_str().to_string(),
            }
            .emit();
        }
        Error::ValidationError("invalid input detected".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(ValidationConfig::from_env())
    }

    #[test]
    fn rejects_oversized_request() {
        let v = validator();
        assert!(v.check_size(v.config.max_request_size_bytes + 1, false).is_err());
        assert!(v.check_size(v.config.max_request_size_bytes, false).is_ok());
    }

    #[test]
    fn rejects_unsupported_content_type() {
        let v = validator();
        assert!(v.check_content_type(Some("application/octet-stream")).is_err());
        assert!(v.check_content_type(Some("application/json; charset=utf-8")).is_ok());
    }

    #[test]
    fn rejects_blocked_user_agent() {
        let v = validator();
        assert!(v.check_user_agent(Some("Googlebot/2.1")).is_err());
        assert!(v.check_user_agent(Some("Mozilla/5.0")).is_ok());
    }

    #[test]
    fn scans_nested_json_values_and_keys() {
        let v = validator();
        let payload = serde_json::json!({"comment": "'; DROP TABLE users; --"});
        assert!(v.scan_json(&payload).is_err());

        let clean = serde_json::json!({"message": "hello there"});
        assert!(v.scan_json(&clean).is_ok());
    }

    #[test]
    fn query_param_cap_enforced() {
        let v = validator();
        assert!(v.check_query_params(v.config.max_query_params).is_ok());
        assert!(v.check_query_params(v.config.max_query_params + 1).is_err());
    }
}
