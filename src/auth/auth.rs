use crate::{
    auth::role_cache::Principal,
    error::{AppError, AppResult},
    model::role::Role,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// The authenticated caller, placed in request extensions by
/// `auth_middleware` after the token and access profile were checked.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
    /// Email for staff users, employee code for employees
    pub subject: String,
    pub role: Role,
    pub can_access_salary: bool,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AppError::Unauthorized("Missing authentication".into()).into())),
        }
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> AppResult<()> {
        if self.role.is_hr_or_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("HR/Admin only"))
        }
    }

    pub fn require_any(&self, roles: &[Role]) -> AppResult<()> {
        if self.role == Role::Admin || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden("Insufficient role"))
        }
    }

    /// Admins always see pay data; other staff need the salary flag.
    pub fn has_salary_access(&self) -> bool {
        self.role == Role::Admin || (self.role.is_staff() && self.can_access_salary)
    }

    pub fn require_salary_access(&self) -> AppResult<()> {
        if self.has_salary_access() {
            Ok(())
        } else {
            Err(AppError::forbidden("Salary access required"))
        }
    }

    /// Returns true if the caller is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Staff user id, if the caller is a staff user.
    pub fn user_id(&self) -> Option<u64> {
        (!self.is_employee()).then_some(self.principal.id)
    }

    pub fn employee_id(&self) -> Option<u64> {
        self.principal.employee_id()
    }

    pub fn require_employee(&self) -> AppResult<u64> {
        self.employee_id()
            .ok_or_else(|| AppError::forbidden("Employee login required"))
    }

    pub fn require_staff(&self) -> AppResult<u64> {
        self.user_id()
            .ok_or_else(|| AppError::forbidden("Staff login required"))
    }

    /// Employees may only read their own records; HR and admins read anyone's.
    pub fn require_self_or_hr(&self, employee_id: u64) -> AppResult<()> {
        if self.employee_id() == Some(employee_id) || self.role.is_hr_or_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to view this employee"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(principal: Principal, role: Role, salary: bool) -> AuthUser {
        AuthUser {
            principal,
            subject: "test".to_string(),
            role,
            can_access_salary: salary,
        }
    }

    #[test]
    fn salary_access_rules() {
        assert!(caller(Principal::user(1), Role::Admin, false).has_salary_access());
        assert!(caller(Principal::user(2), Role::Hr, true).has_salary_access());
        assert!(!caller(Principal::user(3), Role::Hr, false).has_salary_access());
        assert!(!caller(Principal::employee(4), Role::Employee, true).has_salary_access());
    }

    #[test]
    fn employees_only_see_themselves() {
        let employee = caller(Principal::employee(10), Role::Employee, false);
        assert!(employee.require_self_or_hr(10).is_ok());
        assert!(employee.require_self_or_hr(11).is_err());
        assert_eq!(employee.user_id(), None);
        assert!(employee.require_staff().is_err());

        let hr = caller(Principal::user(5), Role::Hr, false);
        assert!(hr.require_self_or_hr(11).is_ok());
        assert_eq!(hr.employee_id(), None);
    }

    #[test]
    fn admin_passes_role_lists() {
        let admin = caller(Principal::user(1), Role::Admin, false);
        assert!(admin.require_any(&[Role::AccountManager]).is_ok());
        let viewer = caller(Principal::user(2), Role::OtViewer, false);
        assert!(viewer.require_any(&[Role::AccountManager, Role::Hr]).is_err());
    }
}
