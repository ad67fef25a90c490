//! Role routing conventions shared by the core types and the dashboard
//! guard. No server or database needed.

use ict_assets_core::{Role, role_to_path};
use ict_assets_dashboard::middleware::{GuardDecision, guard_decision};

#[test]
fn test_stored_role_literals_land_on_their_own_area() {
    for role in Role::ALL {
        let home = role_to_path(Some(role.as_str()));
        assert_eq!(home, role.base_path());
        assert_eq!(guard_decision(Some(role), home), GuardDecision::Allow);
    }
}

#[test]
fn test_unknown_profile_roles_are_treated_as_staff() {
    for raw in [None, Some(""), Some("ADMIN"), Some("superuser"), Some(" admin ")] {
        let role = Role::normalize(raw);
        assert_eq!(role, Role::Staff, "{raw:?}");
        assert_eq!(
            guard_decision(Some(role), "/admin/users"),
            GuardDecision::Redirect("/staff")
        );
    }
}

#[test]
fn test_only_managers_share_manager_pages() {
    let managers: Vec<_> = Role::ALL.into_iter().filter(|r| r.is_manager()).collect();
    assert_eq!(managers, vec![Role::Admin, Role::AdminAssistant]);
}

#[test]
fn test_anonymous_requests_never_pass_a_protected_prefix() {
    for role in Role::ALL {
        let page = format!("{}/notifications", role.base_path());
        assert_eq!(guard_decision(None, &page), GuardDecision::RedirectLogin);
    }
}
