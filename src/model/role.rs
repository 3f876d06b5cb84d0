use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Hr,
    AccountManager,
    OtApprover,
    OtViewer,
    /// Employee self-service login; never assigned to a staff user.
    Employee,
}

impl Role {
    pub fn is_staff(self) -> bool {
        self != Role::Employee
    }

    pub fn is_hr_or_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }

    /// Roles a staff user may be created with.
    pub fn assignable(value: &str) -> Option<Self> {
        value.parse::<Role>().ok().filter(|r| r.is_staff())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snake_case_names() {
        assert_eq!("ot_approver".parse::<Role>().unwrap(), Role::OtApprover);
        assert_eq!(Role::AccountManager.as_ref(), "account_manager");
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn employee_role_is_not_assignable_to_staff() {
        assert_eq!(Role::assignable("hr"), Some(Role::Hr));
        assert_eq!(Role::assignable("employee"), None);
    }
}
