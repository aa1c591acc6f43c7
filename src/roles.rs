//! Per-edge permitted roles consumed by the `RoleAllowed` guard
use super::audit::{AuditState, Role};
use super::transition;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMatrix {
    edges: BTreeMap<(AuditState, AuditState), BTreeSet<Role>>,
}

impl Default for RoleMatrix {
    fn default() -> Self {
        use AuditState::*;
        use Role::*;

        let defaults: [((AuditState, AuditState), &[Role]); 16] = [
            ((Draft, Scheduled), &[BodyAdmin]),
            ((Draft, Cancelled), &[BodyAdmin]),
            ((Scheduled, InProgress), &[LeadAuditor]),
            ((Scheduled, Cancelled), &[BodyAdmin]),
            ((InProgress, ReportDraft), &[LeadAuditor, Auditor]),
            ((InProgress, Cancelled), &[BodyAdmin]),
            ((ReportDraft, ClientReview), &[LeadAuditor]),
            ((ReportDraft, Cancelled), &[BodyAdmin]),
            ((ClientReview, SubmittedToBody), &[LeadAuditor]),
            ((ClientReview, ReportDraft), &[LeadAuditor, ClientRepresentative]),
            ((SubmittedToBody, TechnicalReview), &[TechnicalReviewer, BodyAdmin]),
            ((SubmittedToBody, Cancelled), &[BodyAdmin]),
            ((TechnicalReview, DecisionPending), &[TechnicalReviewer]),
            ((TechnicalReview, SubmittedToBody), &[TechnicalReviewer]),
            ((DecisionPending, Decided), &[BodyAdmin]),
            ((DecisionPending, Cancelled), &[BodyAdmin]),
        ];

        let edges = defaults
            .into_iter()
            .map(|(edge, roles)| (edge, roles.iter().copied().collect()))
            .collect();

        Self { edges }
    }
}

impl RoleMatrix {
    /// Roles permitted on `from -> to`. Empty for edges outside the transition table.
    pub fn permitted(&self, from: AuditState, to: AuditState) -> BTreeSet<Role> {
        self.edges.get(&(from, to)).cloned().unwrap_or_default()
    }

    pub fn is_permitted(&self, from: AuditState, to: AuditState, role: Role) -> bool {
        self.edges
            .get(&(from, to))
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Replace the role set of a single edge.
    pub fn set_edge(
        &mut self,
        from: AuditState,
        to: AuditState,
        roles: impl IntoIterator<Item = Role>,
    ) -> anyhow::Result<()> {
        if !transition::is_allowed(from, to) {
            anyhow::bail!("cannot assign roles to {from} -> {to}: not in the transition table");
        }
        let roles: BTreeSet<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            anyhow::bail!("edge {from} -> {to} must permit at least one role");
        }
        self.edges.insert((from, to), roles);
        Ok(())
    }
}
