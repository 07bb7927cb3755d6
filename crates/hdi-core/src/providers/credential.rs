//! API key validation, run once per provider at startup

/// Keys this short cannot be real vendor keys
pub const MIN_KEY_LENGTH: usize = 10;

/// Substrings left behind by `.env` templates and unexpanded config values
const PLACEHOLDER_MARKERS: &[&str] = &["your_", "api_key_here", "${", "changeme"];

/// A credential that passed [`Credential::parse`]
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Accept `raw` only if it is non-empty, longer than [`MIN_KEY_LENGTH`]
    /// and free of placeholder markers.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() <= MIN_KEY_LENGTH {
            return None;
        }
        let lower = trimmed.to_lowercase();
        if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", mask_secret(&self.0))
    }
}

/// Mask a secret for Debug output and logs.
/// Shows the first 3 and last 4 chars of keys longer than 7 chars.
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}
