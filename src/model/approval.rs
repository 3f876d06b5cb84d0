//! Multi-stage approval shared by overtime and fund requests.
//!
//! Status only moves forward: `pending → stage1_approved → stage2_approved →
//! final`, or to `rejected` from any non-terminal stage. Who may act depends on
//! the request kind and the current stage.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    #[strum(serialize = "stage1_approved")]
    #[serde(rename = "stage1_approved")]
    Stage1Approved,
    #[strum(serialize = "stage2_approved")]
    #[serde(rename = "stage2_approved")]
    Stage2Approved,
    Final,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ApprovalStatus::Final | ApprovalStatus::Rejected)
    }

    fn next(self) -> Option<Self> {
        match self {
            ApprovalStatus::Pending => Some(ApprovalStatus::Stage1Approved),
            ApprovalStatus::Stage1Approved => Some(ApprovalStatus::Stage2Approved),
            ApprovalStatus::Stage2Approved => Some(ApprovalStatus::Final),
            ApprovalStatus::Final | ApprovalStatus::Rejected => None,
        }
    }

    /// Column prefix recording who moved the request into this status.
    pub fn actor_column(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "created",
            ApprovalStatus::Stage1Approved => "stage1",
            ApprovalStatus::Stage2Approved => "stage2",
            ApprovalStatus::Final => "final",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Overtime,
    Fund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// The acting staff member, as far as approval rules care.
#[derive(Debug, Clone, Copy)]
pub struct Approver {
    pub role: Role,
    /// True when the actor is the designated approver of the employee's
    /// overtime group.
    pub is_group_approver: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Request already {0}")]
    AlreadyProcessed(ApprovalStatus),
    #[error("{role} cannot act on a {kind} request at stage {status}")]
    NotPermitted {
        role: Role,
        kind: &'static str,
        status: ApprovalStatus,
    },
}

impl RequestKind {
    fn name(self) -> &'static str {
        match self {
            RequestKind::Overtime => "overtime",
            RequestKind::Fund => "fund",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            RequestKind::Overtime => "overtime_requests",
            RequestKind::Fund => "fund_requests",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestKind::Overtime => "Overtime request",
            RequestKind::Fund => "Fund request",
        }
    }

    /// Whether `approver` may act on a request currently at `status`.
    pub fn can_act(self, status: ApprovalStatus, approver: Approver) -> bool {
        let role = approver.role;
        if role == Role::Admin {
            return !status.is_terminal();
        }
        match (self, status) {
            (RequestKind::Overtime, ApprovalStatus::Pending) => {
                role == Role::OtApprover && approver.is_group_approver
            }
            (RequestKind::Overtime, ApprovalStatus::Stage1Approved) => role == Role::Hr,
            (RequestKind::Overtime, ApprovalStatus::Stage2Approved) => role == Role::AccountManager,
            (RequestKind::Fund, ApprovalStatus::Pending) => role == Role::AccountManager,
            (RequestKind::Fund, ApprovalStatus::Stage1Approved) => role == Role::Hr,
            (RequestKind::Fund, ApprovalStatus::Stage2Approved) => false,
            (_, ApprovalStatus::Final | ApprovalStatus::Rejected) => false,
        }
    }

    /// Applies `action` and returns the new status.
    pub fn transition(
        self,
        status: ApprovalStatus,
        action: ApprovalAction,
        approver: Approver,
    ) -> Result<ApprovalStatus, ApprovalError> {
        if status.is_terminal() {
            return Err(ApprovalError::AlreadyProcessed(status));
        }
        if !self.can_act(status, approver) {
            return Err(ApprovalError::NotPermitted {
                role: approver.role,
                kind: self.name(),
                status,
            });
        }
        match action {
            ApprovalAction::Reject => Ok(ApprovalStatus::Rejected),
            ApprovalAction::Approve => status
                .next()
                .ok_or(ApprovalError::AlreadyProcessed(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_role(role: Role) -> Approver {
        Approver {
            role,
            is_group_approver: false,
        }
    }

    #[test]
    fn overtime_walks_all_stages() {
        let kind = RequestKind::Overtime;
        let group_approver = Approver {
            role: Role::OtApprover,
            is_group_approver: true,
        };

        let s1 = kind
            .transition(ApprovalStatus::Pending, ApprovalAction::Approve, group_approver)
            .unwrap();
        assert_eq!(s1, ApprovalStatus::Stage1Approved);

        let s2 = kind
            .transition(s1, ApprovalAction::Approve, as_role(Role::Hr))
            .unwrap();
        assert_eq!(s2, ApprovalStatus::Stage2Approved);

        let done = kind
            .transition(s2, ApprovalAction::Approve, as_role(Role::AccountManager))
            .unwrap();
        assert_eq!(done, ApprovalStatus::Final);
    }

    #[test]
    fn approver_of_another_group_cannot_act() {
        let err = RequestKind::Overtime
            .transition(
                ApprovalStatus::Pending,
                ApprovalAction::Approve,
                as_role(Role::OtApprover),
            )
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotPermitted { .. }));
    }

    #[test]
    fn viewers_never_approve() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Stage1Approved,
            ApprovalStatus::Stage2Approved,
        ] {
            assert!(!RequestKind::Overtime.can_act(status, as_role(Role::OtViewer)));
        }
    }

    #[test]
    fn stages_cannot_be_skipped() {
        // HR acts on stage 2, not on a pending request
        assert!(
            RequestKind::Fund
                .transition(ApprovalStatus::Pending, ApprovalAction::Approve, as_role(Role::Hr))
                .is_err()
        );
    }

    #[test]
    fn fund_final_release_is_admin_only() {
        let kind = RequestKind::Fund;
        assert!(!kind.can_act(ApprovalStatus::Stage2Approved, as_role(Role::Hr)));
        assert_eq!(
            kind.transition(
                ApprovalStatus::Stage2Approved,
                ApprovalAction::Approve,
                as_role(Role::Admin)
            ),
            Ok(ApprovalStatus::Final)
        );
    }

    #[test]
    fn reject_is_terminal() {
        let rejected = RequestKind::Fund
            .transition(
                ApprovalStatus::Pending,
                ApprovalAction::Reject,
                as_role(Role::AccountManager),
            )
            .unwrap();
        assert_eq!(rejected, ApprovalStatus::Rejected);

        assert_eq!(
            RequestKind::Fund.transition(rejected, ApprovalAction::Approve, as_role(Role::Admin)),
            Err(ApprovalError::AlreadyProcessed(ApprovalStatus::Rejected))
        );
    }

    #[test]
    fn status_strings_match_storage() {
        assert_eq!(ApprovalStatus::Stage1Approved.as_ref(), "stage1_approved");
        assert_eq!(
            "stage2_approved".parse::<ApprovalStatus>().unwrap(),
            ApprovalStatus::Stage2Approved
        );
        assert_eq!(
            serde_json::to_value(ApprovalStatus::Stage1Approved).unwrap(),
            serde_json::json!("stage1_approved")
        );
    }
}
