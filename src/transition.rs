//! Transition table and the request/result values exchanged with the engine
use super::audit::{AuditState, Role, TimeStamp};
use super::error::ReasonCode;
use super::guard::{Guard, GuardWarning};

/// States reachable in one step from `state`. Terminal states have none.
pub fn allowed_targets(state: AuditState) -> &'static [AuditState] {
    use AuditState::*;

    match state {
        Draft => &[Scheduled, Cancelled],
        Scheduled => &[InProgress, Cancelled],
        InProgress => &[ReportDraft, Cancelled],
        ReportDraft => &[ClientReview, Cancelled],
        // ReportDraft: returned to the lead auditor for correction
        ClientReview => &[SubmittedToBody, ReportDraft],
        SubmittedToBody => &[TechnicalReview, Cancelled],
        // SubmittedToBody: review incomplete, sent back to the body
        TechnicalReview => &[DecisionPending, SubmittedToBody],
        DecisionPending => &[Decided, Cancelled],
        Decided | Cancelled => &[],
    }
}

pub fn is_allowed(from: AuditState, to: AuditState) -> bool {
    allowed_targets(from).contains(&to)
}

/// Every structurally valid edge, in table order
pub fn all_edges() -> impl Iterator<Item = (AuditState, AuditState)> {
    AuditState::ALL
        .into_iter()
        .flat_map(|from| allowed_targets(from).iter().map(move |to| (from, *to)))
}

/// A single request to move an audit between states. Built per call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub audit_id: String,
    pub from_state: AuditState,
    pub to_state: AuditState,
    pub actor_role: Role,
    pub planned_duration_hours: Option<f64>,
}

impl TransitionRequest {
    pub fn new(
        audit_id: impl Into<String>,
        from_state: AuditState,
        to_state: AuditState,
        actor_role: Role,
    ) -> Self {
        Self {
            audit_id: audit_id.into(),
            from_state,
            to_state,
            actor_role,
            planned_duration_hours: None,
        }
    }
    pub fn with_planned_hours(mut self, hours: f64) -> Self {
        self.planned_duration_hours = Some(hours);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    Accepted {
        new_state: AuditState,
        timestamp: TimeStamp,
        evaluated_guards: Vec<Guard>,
        warnings: Vec<GuardWarning>,
    },
    Rejected {
        /// `None` when the request failed the transition table or was
        /// inconsistent with the facts, rather than a named guard.
        failed_guard: Option<Guard>,
        reason_code: ReasonCode,
        message: String,
    },
}

impl TransitionResult {
    pub(crate) fn rejected(
        failed_guard: Option<Guard>,
        reason_code: ReasonCode,
        message: impl Into<String>,
    ) -> Self {
        TransitionResult::Rejected {
            failed_guard,
            reason_code,
            message: message.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, TransitionResult::Accepted { .. })
    }

    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            TransitionResult::Accepted { .. } => None,
            TransitionResult::Rejected { reason_code, .. } => Some(*reason_code),
        }
    }

    pub fn new_state(&self) -> Option<AuditState> {
        match self {
            TransitionResult::Accepted { new_state, .. } => Some(*new_state),
            TransitionResult::Rejected { .. } => None,
        }
    }
}
