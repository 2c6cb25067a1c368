//! Constraint-marker sniffing shared by the regex dialects.
//!
//! All checks are case-insensitive substring tests, so any text containing
//! e.g. `pk` counts as a primary-key marker.

/// `primary key`, `pk`, `[pk]`.
pub fn is_primary_key(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("primary key") || lower.contains("pk") || lower.contains("[pk]") || lower == "pk"
}

/// `not null`, `nn`, `[nn]`.
pub fn is_not_null(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("not null") || lower.contains("nn") || lower.contains("[nn]") || lower == "nn"
}

/// `foreign key`, `fk`, `references`, `ref:`.
pub fn is_foreign_key(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("foreign key")
        || lower.contains("fk")
        || lower.contains("[fk]")
        || lower == "fk"
        || lower.contains("references")
        || lower.contains("ref:")
        || lower.contains("[ref:")
}

/// Strip single and double quotes anywhere in a member, then trim.
pub(crate) fn unquote(member: &str) -> String {
    member.trim().replace(['\'', '"'], "").trim().to_string()
}
