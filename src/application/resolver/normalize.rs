//! Identifier text normalization and parsing.

use std::sync::OnceLock;

use regex::Regex;

/// Lowercase, trim, collapse inner whitespace and drop a leading "the ".
#[must_use]
pub fn normalize(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match collapsed.strip_prefix("the ") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => collapsed,
    }
}

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\bid\s*=\s*(\d+)").ok())
        .as_ref()
}

/// A canonical id typed directly: bare digits, `id=123`, or a link
/// carrying `id=123`.
#[must_use]
pub fn parse_identifier(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse().ok().filter(|id| *id > 0);
    }
    let captures = id_pattern()?.captures(trimmed)?;
    captures
        .get(1)?
        .as_str()
        .parse()
        .ok()
        .filter(|id| *id > 0)
}

/// Whether `candidate` (a name or acronym) matches normalized input.
#[must_use]
pub fn name_matches(normalized_input: &str, candidate: Option<&str>) -> bool {
    candidate.is_some_and(|c| !c.trim().is_empty() && normalize(c) == normalized_input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize("  The   Knights  Radiant "), "knights radiant");
        assert_eq!(normalize("CYBERTR0N"), "cybertr0n");
        assert_eq!(normalize("Theocracy"), "theocracy");
        assert_eq!(normalize("the"), "the");
    }

    #[test]
    fn parses_bare_and_embedded_ids() {
        assert_eq!(parse_identifier("9445"), Some(9445));
        assert_eq!(parse_identifier(" id=9445 "), Some(9445));
        assert_eq!(parse_identifier("ID = 12"), Some(12));
        assert_eq!(
            parse_identifier("https://politicsandwar.com/alliance/id=9445"),
            Some(9445)
        );
        assert_eq!(
            parse_identifier("https://politicsandwar.com/nation/id=1234&display=war"),
            Some(1234)
        );
    }

    #[test]
    fn rejects_names_and_zero() {
        assert_eq!(parse_identifier("Cybertr0n"), None);
        assert_eq!(parse_identifier("0"), None);
        assert_eq!(parse_identifier("grid=5"), None);
        assert_eq!(parse_identifier(""), None);
    }

    #[test]
    fn acronym_match_is_case_insensitive() {
        assert!(name_matches("cyb", Some("CYB")));
        assert!(!name_matches("cyb", None));
        assert!(!name_matches("", Some("  ")));
    }
}
