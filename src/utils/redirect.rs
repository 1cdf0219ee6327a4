//! Validation of post-login redirect targets.

/// Returns `next` if it is a safe local path, otherwise `/dashboard`.
///
/// Only absolute paths on this site are accepted; scheme-relative (`//host`)
/// and backslash tricks are rejected so a login link cannot bounce users to
/// another origin.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/dashboard".to_string(),
    }
}
