/// Role names no custom role may take, in normalized form (spaces removed,
/// lowercase). Covers every supported locale.
pub const RESERVED_ROLE_NAMES: &[&str] = &[
    "administrator",
    "moderator",
    "standarduser",
    "commonmember",
    "администратор",
    "модератор",
    "обычныйпользователь",
];

/// Default retention for trashed kanban elements, in days.
pub const DEFAULT_TRASH_RETENTION_DAYS: i64 = 30;

/// Pages remembered per user for the "recently seen" listing.
pub const MAX_VISIT_MARKS: usize = 20;

/// Env var overriding the trash retention period.
pub const ENV_TRASH_RETENTION_DAYS: &str = "TRELLIS_TRASH_RETENTION_DAYS";

/// Env var overriding the SQLite database location.
pub const ENV_DB_PATH: &str = "TRELLIS_DB_PATH";

/// Normalize a role name for collision checks: whitespace removed, lowercase.
pub fn normalize_role_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a role name collides with a built-in role in any locale.
pub fn is_reserved_role_name(name: &str) -> bool {
    let normalized = normalize_role_name(name);
    RESERVED_ROLE_NAMES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_ignore_case_and_spacing() {
        assert!(is_reserved_role_name("Moderator"));
        assert!(is_reserved_role_name("  moDERator "));
        assert!(is_reserved_role_name("Standard User"));
        assert!(is_reserved_role_name("Обычный пользователь"));
        assert!(!is_reserved_role_name("Reviewer"));
    }
}
