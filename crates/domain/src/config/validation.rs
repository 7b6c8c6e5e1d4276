// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request validation & security headers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

use super::env_helpers::{env_bool, env_usize};

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub max_request_size_bytes: usize,
    pub max_json_size_bytes: usize,
    pub max_query_params: usize,
    pub max_headers: usize,
    pub max_header_size_bytes: usize,
    pub allowed_content_types: HashSet<String>,
    pub blocked_user_agent_substrings: HashSet<String>,
    pub blocked_file_extensions: HashSet<String>,
    pub sql_injection_protection: bool,
    pub xss_protection: bool,
    pub path_traversal_protection: bool,
    pub command_injection_protection: bool,
    pub hsts_enabled: bool,
}

impl ValidationConfig {
    pub fn from_env() -> Self {
        Self {
            max_request_size_bytes: env_usize("MAX_REQUEST_SIZE_MB", 10) * 1024 * 1024,
            max_json_size_bytes: env_usize("MAX_JSON_SIZE_MB", 1) * 1024 * 1024,
            max_query_params: env_usize("MAX_QUERY_PARAMS", 50),
            max_headers: env_usize("MAX_HEADERS", 100),
            max_header_size_bytes: env_usize("MAX_HEADER_SIZE_BYTES", 8192),
            allowed_content_types: [
                "application/json",
                "application/x-www-form-urlencoded",
                "multipart/form-data",
                "text/plain",
                "audio/wav",
                "audio/mpeg",
                "audio/mp4",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_user_agent_substrings: [
                "bot", "crawler", "spider", "scraper", "scanner",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_file_extensions: [
                ".exe", ".bat", ".cmd", ".com", ".pif", ".scr", ".vbs", ".js", ".jar", ".php",
                ".asp", ".jsp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            sql_injection_protection: env_bool("ENABLE_SQL_INJECTION_PROTECTION", true),
            xss_protection: env_bool("ENABLE_XSS_PROTECTION", true),
            path_traversal_protection: env_bool("ENABLE_PATH_TRAVERSAL_PROTECTION", true),
            command_injection_protection: env_bool("ENABLE_COMMAND_INJECTION_PROTECTION", true),
            hsts_enabled: env_bool("ENABLE_HSTS", true),
        }
    }
}
