use regex::{Regex, RegexSet};

/// Precompiled pattern families (spec §4.3), built once at startup —
/// matching the teacher's startup-time `regex::RegexSet` precompilation
/// idiom rather than compiling a regex per request.
pub struct PatternFamilies {
    sql: RegexSet,
    xss: RegexSet,
    path_traversal: RegexSet,
    command: RegexSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    Sql,
    Xss,
    PathTraversal,
    Command,
}

impl PatternFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternFamily::Sql => "sql",
            PatternFamily::Xss => "xss",
            PatternFamily::PathTraversal => "path_traversal",
            PatternFamily::Command => "command",
        }
    }
}

fn compile(patterns: &[&str]) -> RegexSet {
    RegexSet::new(patterns).expect("pattern family must compile")
}

impl PatternFamilies {
    pub fn new() -> Self {
        Self {
            sql: compile(&[
                r"(?i)\bunion\b.*\bselect\b",
                r"(?i)\bdrop\b.*\btable\b",
                r"(?i)\binsert\b.*\binto\b",
                r"(?i)\bdelete\b.*\bfrom\b",
                r"(?i)\bupdate\b.*\bset\b",
                r"(?i)\bselect\b.*\bfrom\b",
                r"(?i)\bor\b.*\b1\s*=\s*1\b",
                r"(?i)\band\b.*\b1\s*=\s*1\b",
                r"(?i)'.*\bor\b.*'",
                r"--",
                r"(?s)/\*.*\*/",
            ]),
            xss: compile(&[
                r"(?is)<script[^>]*>.*?</script>",
                r"(?i)javascript:",
                r"(?i)on\w+\s*=",
                r"(?i)<iframe[^>]*>",
                r"(?i)<object[^>]*>",
                r"(?i)<embed[^>]*>",
                r"(?i)<link[^>]*>",
                r"(?i)<meta[^>]*>",
            ]),
            path_traversal: compile(&[
                r"(?i)\.\./",
                r"(?i)\.\.\\",
                r"(?i)%2e%2e%2f",
                r"(?i)%2e%2e%5c",
                r"(?i)\.\.%2f",
                r"(?i)\.\.%5c",
            ]),
            command: compile(&[
                r"[;&|`]",
                r"\$\([^)]*\)",
                r"`[^`]*`",
                r"(?i)\|\s*(cat|ls|pwd|whoami|id|uname)",
            ]),
        }
    }

    /// Check `value` against every family enabled in `enabled`, returning
    /// the first family that matches (spec §4.3: any match rejects, no
    /// pattern disclosure to the client beyond the family name in logs).
    pub fn first_match(&self, value: &str, enabled: &[PatternFamily]) -> Option<PatternFamily> {
        for family in enabled {
            let set = match family {
                PatternFamily::Sql => &self.sql,
                PatternFamily::Xss => &self.xss,
                PatternFamily::PathTraversal => &self.path_traversal,
                PatternFamily::Command => &self.command,
            };
            if set.is_match(value) {
                return Some(*family);
            }
        }
        None
    }
}

impl Default for PatternFamilies {
    fn default() -> Self {
        Self::new()
    }
}

/// Used for the `/api/voice/audio/{filename}` path-segment check: reject
/// any served-audio filename containing a traversal sequence or separator.
pub fn filename_is_safe(name: &str) -> bool {
    static TRAVERSAL: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = TRAVERSAL.get_or_init(|| Regex::new(r"(\.\.|[/\\])").unwrap());
    !re.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_families() -> Vec<PatternFamily> {
        vec![
            PatternFamily::Sql,
            PatternFamily::Xss,
            PatternFamily::PathTraversal,
            PatternFamily::Command,
        ]
    }

    #[test]
    fn detects_sql_union_select() {
        let p = PatternFamilies::new();
        assert_eq!(
            p.first_match("1 UNION SELECT password FROM users", &all_families()),
            Some(PatternFamily::Sql)
        );
    }

    #[test]
    fn detects_script_tag() {
        let p = PatternFamilies::new();
        assert_eq!(
            p.first_match("<script>alert(1)</script>", &all_families()),
            Some(PatternFamily::Xss)
        );
    }

    #[test]
    fn detects_path_traversal() {
        let p = PatternFamilies::new();
        assert_eq!(
            p.first_match("../../etc/passwd", &all_families()),
            Some(PatternFamily::PathTraversal)
        );
    }

    #[test]
    fn detects_command_injection() {
        let p = PatternFamilies::new();
        assert_eq!(
            p.first_match("foo; rm -rf /", &all_families()),
            Some(PatternFamily::Command)
        );
    }

    #[test]
    fn benign_input_has_no_match() {
        let p = PatternFamilies::new();
        assert_eq!(
            p.first_match("What are the pros and cons of starting a business?", &all_families()),
            None
        );
    }

    #[test]
    fn filename_rejects_traversal() {
        assert!(!filename_is_safe("../../etc/passwd"));
        assert!(filename_is_safe("response-abc123.wav"));
    }
}
