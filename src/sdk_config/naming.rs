//! Company-name derived identifiers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::spec::SpecFingerprint;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Normalize a company name into a repository namespace.
///
/// Lowercase, whitespace to `-`, anything outside `[a-z0-9-]` dropped, dash
/// runs collapsed and trimmed. May return an empty string.
///
/// # Examples
/// ```
/// use sdkforge::sdk_config::naming::normalize_company_name;
///
/// assert_eq!(normalize_company_name("Acme Corp"), "acme-corp");
/// assert_eq!(normalize_company_name("  Foo & Bar, Inc. "), "foo-bar-inc");
/// ```
pub fn normalize_company_name(company_name: &str) -> String {
    let lowered = company_name.trim().to_lowercase();
    let dashed = WHITESPACE.replace_all(&lowered, "-");
    let cleaned = DISALLOWED.replace_all(&dashed, "");
    DASH_RUNS
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string()
}

/// Organization id: the alphanumeric namespace followed by six digits.
///
/// The digits come from the spec fingerprint, so the same spec always maps
/// to the same organization.
pub fn organization_id(namespace: &str, fingerprint: &SpecFingerprint) -> String {
    let base: String = namespace.chars().filter(char::is_ascii_alphanumeric).collect();
    let seed = fingerprint
        .as_str()
        .get(..8)
        .and_then(|prefix| u32::from_str_radix(prefix, 16).ok())
        .unwrap_or_default();
    format!("{base}{}", 100_000 + seed % 900_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("Acme"), "acme");
        assert_eq!(normalize_company_name("Acme   Rocket\tWorks"), "acme-rocket-works");
        assert_eq!(normalize_company_name("--Acme--Co--"), "acme-co");
        assert_eq!(normalize_company_name("ACME_2024"), "acme2024");
        assert_eq!(normalize_company_name("!!!"), "");
    }

    #[test]
    fn test_organization_id_is_deterministic() {
        let fingerprint = SpecFingerprint::from_hex("000186a0ffff".to_string());
        let first = organization_id("acme-corp", &fingerprint);
        assert_eq!(first, organization_id("acme-corp", &fingerprint));
        assert!(first.starts_with("acmecorp"));
        assert_eq!(first.len(), "acmecorp".len() + 6);
        // 0x000186a0 = 100000 -> 100000 + 100000
        assert_eq!(first, "acmecorp200000");
    }
}
