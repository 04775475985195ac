// src/models/user.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Role of the caller, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    /// Resolves the effective role from the token's role claim and the admin allowlist.
    ///
    /// Unknown claim values fall back to `Student`.
    pub fn resolve(claim_role: &str, user_id: &str, admin_user_ids: &[String]) -> Role {
        if admin_user_ids.iter().any(|id| id == user_id) {
            return Role::Admin;
        }
        match claim_role.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "instructor" | "teacher" => Role::Instructor,
            _ => Role::Student,
        }
    }
}

/// The authenticated caller: an opaque user id plus its resolved role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins and instructors may author quizzes and see unpublished listings.
    pub fn is_elevated(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Instructor)
    }

    pub fn require_elevated(&self) -> Result<(), AppError> {
        if !self.is_elevated() {
            return Err(AppError::Forbidden(
                "Only instructors or admins can perform this action".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_claim() {
        assert_eq!(Role::resolve("admin", "u1", &[]), Role::Admin);
        assert_eq!(Role::resolve("Instructor", "u1", &[]), Role::Instructor);
        assert_eq!(Role::resolve("student", "u1", &[]), Role::Student);
        assert_eq!(Role::resolve("something-else", "u1", &[]), Role::Student);
    }

    #[test]
    fn test_allowlist_overrides_claim() {
        let admins = vec!["u1".to_string()];
        assert_eq!(Role::resolve("student", "u1", &admins), Role::Admin);
        assert_eq!(Role::resolve("student", "u2", &admins), Role::Student);
    }

    #[test]
    fn test_require_elevated() {
        let student = AuthUser { id: "s".into(), role: Role::Student };
        let instructor = AuthUser { id: "t".into(), role: Role::Instructor };
        assert!(matches!(student.require_elevated(), Err(AppError::Forbidden(_))));
        assert!(instructor.require_elevated().is_ok());
    }
}
