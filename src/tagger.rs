//! Per-chunk metadata derivation: affected roles and workflow gate type.
//!
//! Role detection scans chunk content for fixed keywords (case-sensitive
//! substring matches). Gate detection looks only at the section title,
//! case-insensitively, against an ordered priority list; the first match
//! wins, so a title naming several gates resolves the same way every run.

/// Keyword → role table. Keywords are matched case-sensitively so prose
/// like "planning ahead" does not tag the PLANNING role.
const ROLE_KEYWORDS: &[(&str, &str)] = &[
    ("Requirements", "REQUIREMENTS"),
    ("Architect", "ARCHITECTURE"),
    ("Planning", "PLANNING"),
    ("Frontend", "FRONTEND"),
    ("Backend", "BACKEND"),
    ("QA", "QA"),
    ("Security", "SECURITY"),
    ("Documentation", "DOCUMENTATION"),
    ("DevOps", "DEVOPS"),
];

/// Fallback role applied when no keyword matches.
pub const ROLE_ALL: &str = "ALL";

/// Detect the roles a chunk's policy applies to. Never returns an empty
/// set: chunks mentioning no role keyword affect everyone.
pub fn detect_roles(content: &str) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for (keyword, role) in ROLE_KEYWORDS {
        if content.contains(keyword) {
            roles.push((*role).to_string());
        }
    }
    if roles.is_empty() {
        roles.push(ROLE_ALL.to_string());
    }
    roles
}

/// Detect the workflow gate a section describes, from its title only.
///
/// The priority order is fixed; a title matching several keywords always
/// resolves to the earliest entry.
pub fn detect_gate_type(section: &str) -> Option<&'static str> {
    let lower = section.to_lowercase();
    if lower.contains("qa") {
        return Some("qa");
    }
    if lower.contains("security") {
        return Some("security");
    }
    if lower.contains("documentation") {
        return Some("documentation");
    }
    if lower.contains("planning") || lower.contains("approval") {
        return Some("planning");
    }
    if lower.contains("release") {
        return Some("release");
    }
    if lower.contains("audit") {
        return Some("audit");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_roles_from_content() {
        let roles = detect_roles("The QA team and Backend owners must sign off.");
        assert_eq!(roles, vec!["BACKEND".to_string(), "QA".to_string()]);
    }

    #[test]
    fn test_role_matching_is_case_sensitive() {
        let roles = detect_roles("careful planning of backend work");
        assert_eq!(roles, vec![ROLE_ALL.to_string()]);
    }

    #[test]
    fn test_no_match_defaults_to_all() {
        let roles = detect_roles("General conduct rules.");
        assert_eq!(roles, vec![ROLE_ALL.to_string()]);
        assert!(!roles.is_empty());
    }

    #[test]
    fn test_repeated_keyword_contributes_once() {
        let roles = detect_roles("QA checks, then more QA checks, then final QA.");
        assert_eq!(roles, vec!["QA".to_string()]);
    }

    #[test]
    fn test_gate_from_title_case_insensitive() {
        assert_eq!(detect_gate_type("Release Checklist"), Some("release"));
        assert_eq!(detect_gate_type("SECURITY REVIEW"), Some("security"));
        assert_eq!(detect_gate_type("General Notes"), None);
    }

    #[test]
    fn test_gate_priority_qa_beats_release() {
        // Title matches both "qa" and "release"; priority picks qa.
        assert_eq!(detect_gate_type("QA Release Gate"), Some("qa"));
    }

    #[test]
    fn test_gate_priority_security_beats_audit() {
        assert_eq!(detect_gate_type("Security Audit"), Some("security"));
    }

    #[test]
    fn test_approval_maps_to_planning() {
        assert_eq!(detect_gate_type("Change Approval Board"), Some("planning"));
    }

    #[test]
    fn test_gate_detection_is_deterministic() {
        for _ in 0..10 {
            assert_eq!(detect_gate_type("Documentation Release Audit"), Some("documentation"));
        }
    }
}
