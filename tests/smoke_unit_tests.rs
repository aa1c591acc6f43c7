//! Smoke Screen Unit tests for the audit workflow components
//!
//! These tests span the public API and exercise each component in isolation
//! from the persistence scenarios. They are intended as smoke-screen tests and
//! mostly cover the happy path plus the documented rejection codes.

use audit_workflow::{
    AuditFacts, AuditState, AuditType, FixedClock, Guard, GuardWarning, ReasonCode, Role,
    TimeStamp, TransitionHistory, TransitionHistoryEntry, TransitionRequest, TransitionResult,
    WorkflowEngine,
    audit::{FindingCategory, VerificationStatus},
    history::Outcome,
    roles::RoleMatrix,
    transition,
    utils::new_uuid_to_bech32,
};

fn engine() -> WorkflowEngine<FixedClock> {
    WorkflowEngine::with_clock(FixedClock(
        TimeStamp::new_with(2025, 4, 1, 9, 0, 0).unwrap(),
    ))
}

fn schedule(facts: AuditFacts) -> AuditFacts {
    facts.set_schedule(
        TimeStamp::new_with(2025, 4, 14, 8, 0, 0).unwrap(),
        TimeStamp::new_with(2025, 4, 16, 17, 0, 0).unwrap(),
    )
}

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Generated identifiers carry the requested human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let encoded = new_uuid_to_bech32("audit_").unwrap();
        assert!(encoded.starts_with("audit_1"));
        assert!(encoded.len() > 10);
    }

    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }

    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("audit_").unwrap();
        let id2 = new_uuid_to_bech32("audit_").unwrap();
        assert_ne!(id1, id2);
    }
}

// TRANSITION TABLE TESTS
#[cfg(test)]
mod transition_tests {
    use super::*;

    #[test]
    fn linear_path_is_allowed() {
        let path = [
            AuditState::Draft,
            AuditState::Scheduled,
            AuditState::InProgress,
            AuditState::ReportDraft,
            AuditState::ClientReview,
            AuditState::SubmittedToBody,
            AuditState::TechnicalReview,
            AuditState::DecisionPending,
            AuditState::Decided,
        ];
        for pair in path.windows(2) {
            assert!(transition::is_allowed(pair[0], pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    /// Client review and technical review are the only states that may move back
    #[test]
    fn returns_for_correction() {
        assert!(transition::is_allowed(AuditState::ClientReview, AuditState::ReportDraft));
        assert!(transition::is_allowed(
            AuditState::TechnicalReview,
            AuditState::SubmittedToBody
        ));
        assert!(!transition::is_allowed(AuditState::ReportDraft, AuditState::InProgress));
    }

    /// Client review and technical review cannot be cancelled
    #[test]
    fn review_states_cannot_cancel() {
        assert!(!transition::is_allowed(AuditState::ClientReview, AuditState::Cancelled));
        assert!(!transition::is_allowed(AuditState::TechnicalReview, AuditState::Cancelled));
    }
}

// ENGINE TESTS
#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn draft_to_decided_is_invalid() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Draft,
            AuditState::Decided,
            Role::BodyAdmin,
        );

        match engine().attempt_transition(&facts, &request) {
            TransitionResult::Rejected {
                failed_guard,
                reason_code,
                ..
            } => {
                assert_eq!(failed_guard, None);
                assert_eq!(reason_code, ReasonCode::InvalidTransition);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_is_terminal() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1)
            .set_state(AuditState::Cancelled);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Cancelled,
            AuditState::Draft,
            Role::BodyAdmin,
        );

        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::TerminalState));
    }

    #[test]
    fn stage2_without_stage1_is_rejected() {
        let facts = schedule(AuditFacts::new_with(
            "audit_smoke".into(),
            AuditType::InitialStage2,
        ));
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Draft,
            AuditState::Scheduled,
            Role::BodyAdmin,
        );

        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::Stage1Missing));

        let facts = facts.set_stage1_completed(true);
        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.new_state(), Some(AuditState::Scheduled));
    }

    #[test]
    fn surveillance_requires_active_certification() {
        // no schedule either, but eligibility is reported first
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::Surveillance);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Draft,
            AuditState::Scheduled,
            Role::BodyAdmin,
        );

        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::NoActiveCertification));
    }

    /// Role failures win over rule failures because RoleAllowed runs first
    #[test]
    fn role_is_checked_before_business_rules() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::Recertification);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Draft,
            AuditState::Scheduled,
            Role::Auditor,
        );

        match engine().attempt_transition(&facts, &request) {
            TransitionResult::Rejected {
                failed_guard,
                reason_code,
                ..
            } => {
                assert_eq!(failed_guard, Some(Guard::RoleAllowed));
                assert_eq!(reason_code, ReasonCode::RoleDenied);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn open_major_blocks_submission_until_closed() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::Surveillance)
            .set_state(AuditState::ClientReview)
            .add_finding(FindingCategory::Major, VerificationStatus::Open)
            .add_finding(FindingCategory::Minor, VerificationStatus::Open);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::ClientReview,
            AuditState::SubmittedToBody,
            Role::LeadAuditor,
        );

        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::OpenMajorNc));

        // minor findings alone do not block
        let mut closed = facts.clone();
        closed.findings[0].status = VerificationStatus::Closed;
        let result = engine().attempt_transition(&closed, &request);
        assert!(result.is_accepted());
    }

    #[test]
    fn missing_planned_duration_passes_with_warning() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1)
            .set_state(AuditState::Scheduled)
            .set_employee_count(100);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Scheduled,
            AuditState::InProgress,
            Role::LeadAuditor,
        );

        match engine().attempt_transition(&facts, &request) {
            TransitionResult::Accepted {
                warnings,
                timestamp,
                ..
            } => {
                assert_eq!(warnings, vec![GuardWarning::DurationNotSupplied]);
                assert_eq!(timestamp, TimeStamp::new_with(2025, 4, 1, 9, 0, 0).unwrap());
            }
            other => panic!("expected acceptance, got {other:?}"),
        }

        let enough = request.clone().with_planned_hours(21.0);
        assert!(engine().attempt_transition(&facts, &enough).is_accepted());
    }

    #[test]
    fn negative_planned_duration_is_invalid_input() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1)
            .set_state(AuditState::Scheduled);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Scheduled,
            AuditState::InProgress,
            Role::LeadAuditor,
        )
        .with_planned_hours(-4.0);

        let result = engine().attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::InvalidInput));
    }

    #[test]
    fn custom_role_matrix_is_honoured() {
        let mut roles = RoleMatrix::default();
        roles
            .set_edge(
                AuditState::InProgress,
                AuditState::ReportDraft,
                [Role::LeadAuditor],
            )
            .unwrap();
        let engine = engine().set_roles(roles);

        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1)
            .set_state(AuditState::InProgress);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::InProgress,
            AuditState::ReportDraft,
            Role::Auditor,
        );

        let result = engine.attempt_transition(&facts, &request);
        assert_eq!(result.reason_code(), Some(ReasonCode::RoleDenied));
    }
}

// HISTORY TESTS
#[cfg(test)]
mod history_tests {
    use super::*;

    #[test]
    fn records_rejections_with_reason() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::Draft,
            AuditState::Decided,
            Role::BodyAdmin,
        );
        let result = engine().attempt_transition(&facts, &request);
        let at = TimeStamp::new_with(2025, 4, 1, 9, 5, 0).unwrap();

        let entry = TransitionHistoryEntry::record(&request, &result, at);

        assert_eq!(entry.outcome, Outcome::Rejected);
        assert_eq!(entry.reason_code, Some(ReasonCode::InvalidTransition));
        assert_eq!(entry.timestamp, at);
    }

    #[test]
    fn accepted_entries_use_result_timestamp() {
        let facts = AuditFacts::new_with("audit_smoke".into(), AuditType::InitialStage1)
            .set_state(AuditState::InProgress);
        let request = TransitionRequest::new(
            "audit_smoke",
            AuditState::InProgress,
            AuditState::ReportDraft,
            Role::LeadAuditor,
        );
        let result = engine().attempt_transition(&facts, &request);

        let entry = TransitionHistoryEntry::record(&request, &result, TimeStamp::now());
        let mut history = TransitionHistory::new("audit_smoke".into());
        history.append(entry.clone()).unwrap();

        assert_eq!(entry.outcome, Outcome::Accepted);
        assert_eq!(entry.reason_code, None);
        assert_eq!(entry.timestamp, TimeStamp::new_with(2025, 4, 1, 9, 0, 0).unwrap());
        assert!(history.verify().is_ok());
    }

    #[test]
    fn history_cbor_roundtrip() {
        let mut history = TransitionHistory::new("audit_smoke".into());
        for minute in 0..3 {
            history
                .append(TransitionHistoryEntry {
                    audit_id: "audit_smoke".into(),
                    from_state: AuditState::Draft,
                    to_state: AuditState::Scheduled,
                    actor_role: Role::Auditor,
                    outcome: Outcome::Rejected,
                    timestamp: TimeStamp::new_with(2025, 4, 1, 9, minute, 0).unwrap(),
                    reason_code: Some(ReasonCode::RoleDenied),
                })
                .unwrap();
        }

        let cbor = minicbor::to_vec(&history).unwrap();
        let decoded: TransitionHistory = minicbor::decode(&cbor).unwrap();

        assert_eq!(history, decoded);
        assert!(decoded.verify().is_ok());
    }
}
