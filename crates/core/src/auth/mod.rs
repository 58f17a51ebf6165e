//! Password hashing and the authorization gate.

mod password;

pub use password::{PasswordError, hash_password, verify_password};

use fxgate_shared::Role;

/// Decides whether a set of verified roles grants a required role.
///
/// Plain membership, no precedence: an account holding only `Editor` is
/// denied operations that require `Viewer`. Each protected operation
/// declares exactly one required role.
#[must_use]
pub fn authorize(roles: &[Role], required: Role) -> bool {
    roles.contains(&required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[Role::Viewer], Role::Viewer, true)]
    #[case(&[Role::Viewer], Role::Editor, false)]
    #[case(&[Role::Editor], Role::Editor, true)]
    #[case(&[Role::Viewer, Role::Editor], Role::Editor, true)]
    #[case(&[], Role::Viewer, false)]
    fn membership_decides(#[case] roles: &[Role], #[case] required: Role, #[case] allowed: bool) {
        assert_eq!(authorize(roles, required), allowed);
    }

    #[test]
    fn editor_does_not_imply_viewer() {
        // No hierarchy: editor-only accounts cannot use viewer routes.
        assert!(!authorize(&[Role::Editor], Role::Viewer));
    }
}
