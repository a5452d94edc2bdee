//! Property-based tests for permission evaluation

use proptest::prelude::*;
use xfboard::backend::permissions::{role_satisfies, PermissionMatrix, RoleName, Verb};

const TEMPLATES: [&str; 8] = [
    "/board/:id",
    "/board/:id/columns",
    "/board/:id/columns/:columnId",
    "/board/:id/tasks/:taskId",
    "/board/:id/chat",
    "/workspace/:id/members",
    "/workspace/:id/settings",
    "/system",
];

const VERBS: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

fn role() -> impl Strategy<Value = RoleName> {
    prop::sample::select(RoleName::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_higher_roles_keep_every_permission(
        template in prop::sample::select(TEMPLATES.to_vec()),
        verb in prop::sample::select(VERBS.to_vec()),
        a in role(),
        b in role(),
    ) {
        let matrix = PermissionMatrix::default_rules();
        let (low, high) = if a.rank() <= b.rank() { (a, b) } else { (b, a) };
        if matrix.allows(low, template, verb) {
            prop_assert!(matrix.allows(high, template, verb));
        }
    }

    #[test]
    fn test_role_satisfies_is_monotone(
        allowed in prop::collection::vec(role(), 0..5),
        a in role(),
        b in role(),
    ) {
        let (low, high) = if a.rank() <= b.rank() { (a, b) } else { (b, a) };
        if role_satisfies(low, &allowed) {
            prop_assert!(role_satisfies(high, &allowed));
        }
        if allowed.is_empty() {
            prop_assert!(!role_satisfies(high, &allowed));
        }
    }

    #[test]
    fn test_missing_rules_deny(role in role(), suffix in "[a-z]{1,12}") {
        let matrix = PermissionMatrix::default_rules();
        let template = format!("/unlisted/{}", suffix);
        prop_assert!(!matrix.allows(role, &template, Verb::Get));
    }
}
