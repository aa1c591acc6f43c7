//! Named preconditions attached to transition edges
//!
//! Guards are evaluated in [`Guard::EVALUATION_ORDER`] so the first failing
//! guard, and therefore the reason code a caller sees, is stable.
use super::audit::{AuditFacts, AuditState, AuditType};
use super::duration::{ComplexityFactors, DurationPolicy};
use super::error::ReasonCode;
use super::roles::RoleMatrix;
use super::transition::TransitionRequest;
use std::fmt;

/// Declaration order is evaluation order. `ScheduleDefined` runs after every
/// eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Guard {
    NotTerminal,
    RoleAllowed,
    Stage1Completed,
    ActiveCertificationExists,
    NoOpenMajorNc,
    DurationMeetsMinimum,
    ScheduleDefined,
}

/// Non-fatal flags raised by guards that pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardWarning {
    /// No planned duration was supplied, so the minimum could not be checked
    DurationNotSupplied,
}

impl GuardWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardWarning::DurationNotSupplied => "DURATION_NOT_SUPPLIED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Pass,
    PassWithWarning(GuardWarning),
    Fail { reason: ReasonCode, message: String },
}

impl GuardOutcome {
    fn fail(reason: ReasonCode, message: impl Into<String>) -> Self {
        GuardOutcome::Fail {
            reason,
            message: message.into(),
        }
    }
}

/// Policy a guard may consult besides the facts and the request.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub roles: &'a RoleMatrix,
    pub duration: &'a DurationPolicy,
}

impl Guard {
    pub const EVALUATION_ORDER: [Guard; 7] = [
        Guard::NotTerminal,
        Guard::RoleAllowed,
        Guard::Stage1Completed,
        Guard::ActiveCertificationExists,
        Guard::NoOpenMajorNc,
        Guard::DurationMeetsMinimum,
        Guard::ScheduleDefined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Guard::NotTerminal => "NotTerminal",
            Guard::RoleAllowed => "RoleAllowed",
            Guard::ScheduleDefined => "ScheduleDefined",
            Guard::Stage1Completed => "Stage1Completed",
            Guard::ActiveCertificationExists => "ActiveCertificationExists",
            Guard::NoOpenMajorNc => "NoOpenMajorNC",
            Guard::DurationMeetsMinimum => "DurationMeetsMinimum",
        }
    }

    /// Whether this guard is bound to the `from -> to` edge for an audit of this type.
    pub fn applies_to(&self, audit_type: AuditType, from: AuditState, to: AuditState) -> bool {
        use AuditState::*;

        match self {
            Guard::NotTerminal | Guard::RoleAllowed => true,
            Guard::ScheduleDefined => (from, to) == (Draft, Scheduled),
            Guard::Stage1Completed => {
                (from, to) == (Draft, Scheduled) && audit_type == AuditType::InitialStage2
            }
            Guard::ActiveCertificationExists => {
                (from, to) == (Draft, Scheduled)
                    && matches!(
                        audit_type,
                        AuditType::Surveillance | AuditType::Recertification
                    )
            }
            Guard::NoOpenMajorNc => (from, to) == (ClientReview, SubmittedToBody),
            Guard::DurationMeetsMinimum => (from, to) == (Scheduled, InProgress),
        }
    }

    pub fn evaluate(
        &self,
        ctx: &GuardContext<'_>,
        facts: &AuditFacts,
        request: &TransitionRequest,
    ) -> GuardOutcome {
        match self {
            Guard::NotTerminal => {
                if request.from_state.is_terminal() {
                    return GuardOutcome::fail(
                        ReasonCode::TerminalState,
                        format!("audit is {} and cannot change state", request.from_state),
                    );
                }
                GuardOutcome::Pass
            }
            Guard::RoleAllowed => {
                if ctx
                    .roles
                    .is_permitted(request.from_state, request.to_state, request.actor_role)
                {
                    return GuardOutcome::Pass;
                }
                GuardOutcome::fail(
                    ReasonCode::RoleDenied,
                    format!(
                        "role {} may not move an audit from {} to {}",
                        request.actor_role, request.from_state, request.to_state
                    ),
                )
            }
            Guard::ScheduleDefined => match facts.scheduled {
                Some(range) if range.is_ordered() => GuardOutcome::Pass,
                Some(range) => GuardOutcome::fail(
                    ReasonCode::InvalidInput,
                    format!("scheduled end {} precedes start {}", range.end, range.start),
                ),
                None => GuardOutcome::fail(
                    ReasonCode::InvalidInput,
                    "audit has no scheduled date range",
                ),
            },
            Guard::Stage1Completed => {
                if facts.stage1_completed {
                    return GuardOutcome::Pass;
                }
                GuardOutcome::fail(
                    ReasonCode::Stage1Missing,
                    "stage 2 requires a completed stage 1 audit for the same scope",
                )
            }
            Guard::ActiveCertificationExists => {
                if facts.active_certification {
                    return GuardOutcome::Pass;
                }
                GuardOutcome::fail(
                    ReasonCode::NoActiveCertification,
                    "organization has no active certification",
                )
            }
            Guard::NoOpenMajorNc => {
                let open = facts.open_major_nonconformities();
                if open == 0 {
                    return GuardOutcome::Pass;
                }
                GuardOutcome::fail(
                    ReasonCode::OpenMajorNc,
                    format!("{open} major nonconformities are not closed"),
                )
            }
            Guard::DurationMeetsMinimum => {
                let Some(planned) = request.planned_duration_hours else {
                    return GuardOutcome::PassWithWarning(GuardWarning::DurationNotSupplied);
                };
                let factors = ComplexityFactors::from(facts);
                match ctx.duration.validate(
                    planned,
                    facts.employee_count,
                    facts.audit_type.is_initial_certification(),
                    &factors,
                ) {
                    Ok(result) if result.is_valid => GuardOutcome::Pass,
                    Ok(result) => {
                        GuardOutcome::fail(ReasonCode::DurationBelowMinimum, result.recommendation)
                    }
                    Err(err) => GuardOutcome::fail(err.reason_code(), err.to_string()),
                }
            }
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Guards bound to an edge, in evaluation order
pub fn guards_for_edge(audit_type: AuditType, from: AuditState, to: AuditState) -> Vec<Guard> {
    Guard::EVALUATION_ORDER
        .into_iter()
        .filter(|guard| guard.applies_to(audit_type, from, to))
        .collect()
}
