//! Service layer tying the engine to its collaborators
use super::audit::{AuditFacts, AuditState, Role};
use super::duration::{ComplexityFactors, DurationResult};
use super::engine::{Clock, SystemClock, WorkflowEngine};
use super::error::{ReasonCode, StoreError};
use super::guard::Guard;
use super::history::{TransitionHistory, TransitionHistoryEntry};
use super::sampling::{SampleSizeResult, SamplingRiskFactors, calculate_sample_size};
use super::store::{RecordStore, RoleProvider};
use super::transition::{TransitionRequest, TransitionResult};
use anyhow::Context;
use tracing::info;

pub struct WorkflowService<S, R, C: Clock = SystemClock> {
    store: S,
    roles: R,
    engine: WorkflowEngine<C>,
}

impl<S: RecordStore, R: RoleProvider, C: Clock> WorkflowService<S, R, C> {
    pub fn new(store: S, roles: R, engine: WorkflowEngine<C>) -> Self {
        Self {
            store,
            roles,
            engine,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a new audit in the store
    pub fn open_audit(&self, facts: AuditFacts) -> anyhow::Result<AuditFacts> {
        self.store
            .insert_audit_facts(&facts)
            .with_context(|| format!("failed to open audit {}", facts.audit_id))?;

        info!(audit_id = %facts.audit_id, audit_type = ?facts.audit_type, "audit opened");
        Ok(facts)
    }

    /// Ask to move an audit to `to_state` on behalf of `actor` acting as `role`.
    ///
    /// Business rejections come back as `Ok(TransitionResult::Rejected)`; `Err`
    /// is reserved for collaborator failures, in which case neither the state
    /// nor the history changed. Every other attempt leaves exactly one history
    /// entry, committed together with the state change it describes. Losing a
    /// race to a concurrent transition is recorded as an `INVALID_INPUT`
    /// rejection.
    pub fn request_transition(
        &self,
        audit_id: &str,
        actor: &str,
        role: Role,
        to_state: AuditState,
        planned_duration_hours: Option<f64>,
    ) -> anyhow::Result<TransitionResult> {
        let facts = self
            .store
            .get_audit_facts(audit_id)
            .with_context(|| format!("failed to load facts for audit {audit_id}"))?;

        let mut request = TransitionRequest::new(audit_id, facts.current_state, to_state, role);
        request.planned_duration_hours = planned_duration_hours;

        let result = if self.roles.roles_of(actor).contains(&role) {
            self.engine.attempt_transition(&facts, &request)
        } else {
            TransitionResult::rejected(
                Some(Guard::RoleAllowed),
                ReasonCode::RoleDenied,
                format!("actor {actor} does not hold role {role}"),
            )
        };

        let entry = TransitionHistoryEntry::record(&request, &result, self.engine.clock().now());
        let (result, head) = match self.store.commit_transition(entry, result.new_state()) {
            Ok(head) => (result, head),
            Err(StoreError::StaleState { found, .. }) => {
                let lost = TransitionResult::rejected(
                    None,
                    ReasonCode::InvalidInput,
                    format!("audit {audit_id} moved to {found} before the transition was stored"),
                );
                let entry =
                    TransitionHistoryEntry::record(&request, &lost, self.engine.clock().now());
                let head = self
                    .store
                    .commit_transition(entry, None)
                    .with_context(|| format!("failed to record lost race for audit {audit_id}"))?;
                (lost, head)
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to commit transition of audit {audit_id}")));
            }
        };

        info!(
            audit_id,
            actor,
            from = %request.from_state,
            to = %request.to_state,
            accepted = result.is_accepted(),
            reason = ?result.reason_code(),
            head = %head,
            "transition recorded"
        );

        Ok(result)
    }

    pub fn history(&self, audit_id: &str) -> anyhow::Result<TransitionHistory> {
        self.store
            .history(audit_id)
            .with_context(|| format!("failed to load history for audit {audit_id}"))
    }

    /// Minimum sites to sample for the audit's current facts
    pub fn sample_size(&self, audit_id: &str) -> anyhow::Result<SampleSizeResult> {
        let facts = self.store.get_audit_facts(audit_id)?;
        let result = calculate_sample_size(
            facts.site_count,
            facts.audit_type.is_initial_certification(),
            &SamplingRiskFactors::from(&facts),
        )?;
        Ok(result)
    }

    /// Check a planned duration for the audit without attempting a transition
    pub fn duration_check(
        &self,
        audit_id: &str,
        planned_hours: f64,
    ) -> anyhow::Result<DurationResult> {
        let facts = self.store.get_audit_facts(audit_id)?;
        let result = self.engine.duration_policy().validate(
            planned_hours,
            facts.employee_count,
            facts.audit_type.is_initial_certification(),
            &ComplexityFactors::from(&facts),
        )?;
        Ok(result)
    }
}
