//! Profile role management.
//!
//! Identity accounts are managed in the identity provider; these commands
//! only touch the `profiles` table.

use ict_assets_core::{Role, UserId};
use ict_assets_dashboard::db::ProfileRepository;

use super::{CommandError, connect};

/// Parse the `set-role` arguments.
///
/// The role must be one of the stored literals; unlike the web flows an
/// unknown value is rejected rather than falling back to staff.
fn parse_args(user_id: &str, role: &str) -> Result<(UserId, Role), CommandError> {
    let id = uuid::Uuid::parse_str(user_id.trim())
        .map(UserId::new)
        .map_err(|_| CommandError::InvalidUserId(user_id.to_owned()))?;
    let role = role
        .trim()
        .parse::<Role>()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;
    Ok((id, role))
}

/// Set a user's role, creating the profile row when missing.
pub async fn set_role(user_id: &str, role: &str) -> Result<(), CommandError> {
    let (id, role) = parse_args(user_id, role)?;

    let pool = connect().await?;
    ProfileRepository::new(&pool).upsert_role(id, role).await?;

    tracing::info!(user_id = %id, role = role.as_str(), "Role updated");
    Ok(())
}

/// Log every profile with its role.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let profiles = ProfileRepository::new(&pool).list_all().await?;

    for profile in &profiles {
        tracing::info!(
            user_id = %profile.id,
            role = profile.role.as_str(),
            name = profile.name().unwrap_or("-"),
            created_at = %profile.created_at.format("%Y-%m-%d"),
            "profile"
        );
    }
    tracing::info!(count = profiles.len(), "Listed profiles");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let (id, role) =
            parse_args("6f1c2d4e-0000-4000-8000-000000000001", "admin_assistant").unwrap();
        assert_eq!(id.to_string(), "6f1c2d4e-0000-4000-8000-000000000001");
        assert_eq!(role, Role::AdminAssistant);
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(matches!(
            parse_args("not-a-uuid", "staff"),
            Err(CommandError::InvalidUserId(_))
        ));
        assert!(matches!(
            parse_args("6f1c2d4e-0000-4000-8000-000000000001", "superuser"),
            Err(CommandError::InvalidRole(_))
        ));
    }
}
