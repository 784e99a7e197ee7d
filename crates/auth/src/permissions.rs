//! Permission engine: pure functions over a static role/resource/action matrix.
//!
//! Absence of an entry means denial (default-deny). The `Manage` action
//! subsumes every other action for the (role, resource) it is granted on.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Protected resource classes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Tasks,
    Users,
    Comments,
    AuditLog,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Tasks,
        Resource::Users,
        Resource::Comments,
        Resource::AuditLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Tasks => "tasks",
            Resource::Users => "users",
            Resource::Comments => "comments",
            Resource::AuditLog => "audit_log",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a role may perform on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The static permission matrix.
///
/// One source of truth for role grants; call sites go through
/// [`has_permission`] rather than comparing role strings ad hoc.
const fn granted_actions(role: Role, resource: Resource) -> &'static [Action] {
    use Action::*;

    match (role, resource) {
        (Role::Admin, _) => &[Create, Read, Update, Delete, Manage],

        (Role::Manager, Resource::Tasks) => &[Create, Read, Update, Delete],
        (Role::Manager, Resource::Users) => &[Read],
        (Role::Manager, Resource::Comments) => &[Create, Read, Update, Delete],
        (Role::Manager, Resource::AuditLog) => &[Read],

        (Role::Editor, Resource::Tasks) => &[Create, Read, Update],
        (Role::Editor, Resource::Comments) => &[Create, Read, Update],

        (Role::Viewer, Resource::Tasks) => &[Read],
        (Role::Viewer, Resource::Comments) => &[Read],

        _ => &[],
    }
}

/// Whether `role` may perform `action` on `resource`.
///
/// True on an explicit grant or when `Manage` is granted for the pair
/// (manage subsumes all actions). Deterministic, no I/O.
pub fn has_permission(role: Role, resource: Resource, action: Action) -> bool {
    let granted = granted_actions(role, resource);
    granted.contains(&action) || granted.contains(&Action::Manage)
}

/// Whether `role` has a non-empty action set for `resource`.
pub fn has_any_permission(role: Role, resource: Resource) -> bool {
    !granted_actions(role, resource).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn viewer_cannot_delete_tasks() {
        assert!(!has_permission(Role::Viewer, Resource::Tasks, Action::Delete));
    }

    #[test]
    fn admin_can_delete_tasks() {
        assert!(has_permission(Role::Admin, Resource::Tasks, Action::Delete));
    }

    #[test]
    fn editor_cannot_delete_tasks() {
        assert!(!has_permission(Role::Editor, Resource::Tasks, Action::Delete));
    }

    #[test]
    fn editor_has_no_user_grants() {
        assert!(!has_any_permission(Role::Editor, Resource::Users));
        for action in Action::ALL {
            assert!(!has_permission(Role::Editor, Resource::Users, action));
        }
    }

    #[test]
    fn manager_reads_but_does_not_mutate_users() {
        assert!(has_permission(Role::Manager, Resource::Users, Action::Read));
        assert!(!has_permission(Role::Manager, Resource::Users, Action::Update));
        assert!(!has_permission(Role::Manager, Resource::Users, Action::Delete));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(&Role::ALL[..])
    }

    fn any_resource() -> impl Strategy<Value = Resource> {
        proptest::sample::select(&Resource::ALL[..])
    }

    fn any_action() -> impl Strategy<Value = Action> {
        proptest::sample::select(&Action::ALL[..])
    }

    proptest! {
        /// Manage subsumption: wherever `Manage` is granted, every action
        /// is allowed for that (role, resource).
        #[test]
        fn manage_subsumes_all_actions(
            role in any_role(),
            resource in any_resource(),
            action in any_action(),
        ) {
            if has_permission(role, resource, Action::Manage) {
                prop_assert!(has_permission(role, resource, action));
            }
        }

        /// A grant on any action implies a non-empty action set.
        #[test]
        fn grant_implies_any_permission(
            role in any_role(),
            resource in any_resource(),
            action in any_action(),
        ) {
            if has_permission(role, resource, action) {
                prop_assert!(has_any_permission(role, resource));
            }
        }

        /// Viewers never mutate anything.
        #[test]
        fn viewer_is_read_only(resource in any_resource()) {
            for action in [Action::Create, Action::Update, Action::Delete, Action::Manage] {
                prop_assert!(!has_permission(Role::Viewer, resource, action));
            }
        }
    }
}
