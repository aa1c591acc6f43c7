//! Reason codes and error types for the workflow engine and its collaborators
use super::audit::AuditState;
use std::fmt;

/// Closed taxonomy of rejection reasons. Callers branch on these codes to render
/// a message or re-offer a corrected request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    minicbor::Encode,
    minicbor::Decode,
)]
pub enum ReasonCode {
    #[n(0)]
    InvalidTransition,
    #[n(1)]
    TerminalState,
    #[n(2)]
    RoleDenied,
    #[n(3)]
    OpenMajorNc,
    #[n(4)]
    Stage1Missing,
    #[n(5)]
    NoActiveCertification,
    #[n(6)]
    DurationBelowMinimum,
    #[n(7)]
    InvalidInput,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 8] = [
        ReasonCode::InvalidTransition,
        ReasonCode::TerminalState,
        ReasonCode::RoleDenied,
        ReasonCode::OpenMajorNc,
        ReasonCode::Stage1Missing,
        ReasonCode::NoActiveCertification,
        ReasonCode::DurationBelowMinimum,
        ReasonCode::InvalidInput,
    ];

    /// Stable wire code, e.g. `OPEN_MAJOR_NC`
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InvalidTransition => "INVALID_TRANSITION",
            ReasonCode::TerminalState => "TERMINAL_STATE",
            ReasonCode::RoleDenied => "ROLE_DENIED",
            ReasonCode::OpenMajorNc => "OPEN_MAJOR_NC",
            ReasonCode::Stage1Missing => "STAGE1_MISSING",
            ReasonCode::NoActiveCertification => "NO_ACTIVE_CERTIFICATION",
            ReasonCode::DurationBelowMinimum => "DURATION_BELOW_MINIMUM",
            ReasonCode::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input errors raised by the numeric policy calculators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("total site count must be at least 1")]
    ZeroSites,
    #[error("high-risk site count {high_risk} exceeds total site count {total}")]
    HighRiskExceedsSites { high_risk: u32, total: u32 },
    #[error("employee count must be at least 1")]
    ZeroEmployees,
    #[error("planned duration must be a finite, non-negative number of hours (got {0})")]
    InvalidPlannedHours(f64),
    #[error("unknown {field} value: {value:?}")]
    UnknownLevel { field: &'static str, value: String },
}

impl WorkflowError {
    /// Every calculator error is an `INVALID_INPUT` outcome at the boundary
    pub fn reason_code(&self) -> ReasonCode {
        ReasonCode::InvalidInput
    }
}

/// Misuse of the append-only transition history.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("entry for audit {found} cannot be appended to the history of {expected}")]
    ForeignAudit { expected: String, found: String },
    #[error("entry timestamp precedes the last recorded transition")]
    OutOfOrder,
    #[error("history chain broken at sequence {0}")]
    BrokenChain(u64),
    #[error("failed to encode history entry: {0}")]
    Encode(String),
}

/// Failures of the Record Store collaborator.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("audit {0} not found")]
    NotFound(String),
    #[error("audit {0} already exists")]
    AlreadyExists(String),
    #[error("stale state for audit {audit_id}: expected {expected}, found {found}")]
    StaleState {
        audit_id: String,
        expected: AuditState,
        found: AuditState,
    },
    #[error("storage failure: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl<E: fmt::Display> From<minicbor::encode::Error<E>> for StoreError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        StoreError::Encode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_unique() {
        let mut codes: Vec<_> = ReasonCode::ALL.iter().map(|c| c.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), ReasonCode::ALL.len());
    }

    #[test]
    fn calculator_errors_map_to_invalid_input() {
        assert_eq!(WorkflowError::ZeroSites.reason_code(), ReasonCode::InvalidInput);
        assert_eq!(
            WorkflowError::InvalidPlannedHours(-1.0).reason_code(),
            ReasonCode::InvalidInput
        );
    }
}
