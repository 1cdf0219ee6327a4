//! Role and ownership checks shared by the authoring services.

use serde_json::json;
use uuid::Uuid;

use crate::domain::entities::Profile;
use crate::error::AppError;

/// Fails unless the actor may author content (coach or admin).
pub fn require_author(actor: &Profile) -> Result<(), AppError> {
    if actor.can_author() {
        return Ok(());
    }
    Err(AppError::forbidden(
        "Only coaches can do this",
        json!({ "role": actor.role.as_str() }),
    ))
}

/// Fails unless the actor owns the content or is an admin.
pub fn require_manager(actor: &Profile, owner_id: &Uuid) -> Result<(), AppError> {
    if actor.can_manage(owner_id) {
        return Ok(());
    }
    Err(AppError::forbidden(
        "You do not manage this content",
        json!({ "user_id": actor.id }),
    ))
}

/// Owner filter for listings: admins see everything.
pub fn owner_scope(actor: &Profile) -> Option<Uuid> {
    if actor.is_admin() {
        None
    } else {
        Some(actor.id)
    }
}

/// Trims a form value and drops it if nothing is left.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
