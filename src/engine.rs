//! Decides whether a requested transition may happen
//!
//! The engine never mutates anything: it reads the facts and the request and
//! returns a [`TransitionResult`] for the caller to persist. Time comes from an
//! injected [`Clock`] so identical inputs produce identical results.
use super::audit::{AuditFacts, TimeStamp};
use super::duration::DurationPolicy;
use super::error::ReasonCode;
use super::guard::{Guard, GuardContext, GuardOutcome, guards_for_edge};
use super::roles::RoleMatrix;
use super::transition::{self, TransitionRequest, TransitionResult};
use tracing::debug;

pub trait Clock {
    fn now(&self) -> TimeStamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp {
        TimeStamp::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub TimeStamp);

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowEngine<C: Clock = SystemClock> {
    roles: RoleMatrix,
    duration: DurationPolicy,
    clock: C,
}

impl WorkflowEngine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for WorkflowEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> WorkflowEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            roles: RoleMatrix::default(),
            duration: DurationPolicy::default(),
            clock,
        }
    }
    pub fn set_roles(mut self, roles: RoleMatrix) -> Self {
        self.roles = roles;
        self
    }
    pub fn set_duration_policy(mut self, policy: DurationPolicy) -> Self {
        self.duration = policy;
        self
    }
    pub fn roles(&self) -> &RoleMatrix {
        &self.roles
    }
    pub fn duration_policy(&self) -> &DurationPolicy {
        &self.duration
    }
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Evaluate `request` against `facts`.
    ///
    /// Order: terminal check, transition table, request/facts consistency, then
    /// the edge's guards. The first failure is returned and nothing after it is
    /// evaluated.
    pub fn attempt_transition(
        &self,
        facts: &AuditFacts,
        request: &TransitionRequest,
    ) -> TransitionResult {
        let result = self.decide(facts, request);

        if let TransitionResult::Rejected {
            failed_guard,
            reason_code,
            message,
        } = &result
        {
            debug!(
                audit_id = %request.audit_id,
                from = %request.from_state,
                to = %request.to_state,
                role = %request.actor_role,
                guard = ?failed_guard,
                reason = %reason_code,
                "transition rejected: {message}"
            );
        }

        result
    }

    fn decide(&self, facts: &AuditFacts, request: &TransitionRequest) -> TransitionResult {
        if request.from_state.is_terminal() {
            return TransitionResult::rejected(
                Some(Guard::NotTerminal),
                ReasonCode::TerminalState,
                format!("audit is {} and cannot change state", request.from_state),
            );
        }

        if !transition::is_allowed(request.from_state, request.to_state) {
            return TransitionResult::rejected(
                None,
                ReasonCode::InvalidTransition,
                format!(
                    "{} is not reachable from {}",
                    request.to_state, request.from_state
                ),
            );
        }

        if let Some(message) = inconsistency(facts, request) {
            return TransitionResult::rejected(None, ReasonCode::InvalidInput, message);
        }

        let ctx = GuardContext {
            roles: &self.roles,
            duration: &self.duration,
        };
        let guards = guards_for_edge(facts.audit_type, request.from_state, request.to_state);
        let mut warnings = vec![];

        for guard in &guards {
            match guard.evaluate(&ctx, facts, request) {
                GuardOutcome::Pass => debug!(guard = %guard, "guard passed"),
                GuardOutcome::PassWithWarning(warning) => {
                    debug!(guard = %guard, warning = warning.as_str(), "guard passed with warning");
                    warnings.push(warning);
                }
                GuardOutcome::Fail { reason, message } => {
                    return TransitionResult::rejected(Some(*guard), reason, message);
                }
            }
        }

        TransitionResult::Accepted {
            new_state: request.to_state,
            timestamp: self.clock.now(),
            evaluated_guards: guards,
            warnings,
        }
    }
}

// The request must describe the audit it is evaluated against. This is not a
// staleness check: the store guarantees the facts are current.
fn inconsistency(facts: &AuditFacts, request: &TransitionRequest) -> Option<String> {
    if facts.audit_id != request.audit_id {
        return Some(format!(
            "request for {} evaluated against facts of {}",
            request.audit_id, facts.audit_id
        ));
    }
    if facts.current_state != request.from_state {
        return Some(format!(
            "request moves from {} but the audit is {}",
            request.from_state, facts.current_state
        ));
    }
    match request.planned_duration_hours {
        Some(hours) if !hours.is_finite() || hours < 0.0 => {
            Some(format!("planned duration {hours} is not a valid number of hours"))
        }
        _ => None,
    }
}
