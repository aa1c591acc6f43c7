//! Audit snapshot types consumed by the workflow engine
use super::error::WorkflowError;
use super::utils::new_uuid_to_bech32;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a certification audit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum AuditState {
    #[n(0)]
    Draft,
    #[n(1)]
    Scheduled,
    #[n(2)]
    InProgress,
    #[n(3)]
    ReportDraft,
    #[n(4)]
    ClientReview,
    #[n(5)]
    SubmittedToBody,
    #[n(6)]
    TechnicalReview,
    #[n(7)]
    DecisionPending,
    #[n(8)]
    Decided,
    #[n(9)]
    Cancelled,
}

impl AuditState {
    pub const ALL: [AuditState; 10] = [
        AuditState::Draft,
        AuditState::Scheduled,
        AuditState::InProgress,
        AuditState::ReportDraft,
        AuditState::ClientReview,
        AuditState::SubmittedToBody,
        AuditState::TechnicalReview,
        AuditState::DecisionPending,
        AuditState::Decided,
        AuditState::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditState::Decided | AuditState::Cancelled)
    }
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditState::Draft => "draft",
            AuditState::Scheduled => "scheduled",
            AuditState::InProgress => "in_progress",
            AuditState::ReportDraft => "report_draft",
            AuditState::ClientReview => "client_review",
            AuditState::SubmittedToBody => "submitted_to_body",
            AuditState::TechnicalReview => "technical_review",
            AuditState::DecisionPending => "decision_pending",
            AuditState::Decided => "decided",
            AuditState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum AuditType {
    #[n(0)]
    InitialStage1,
    #[n(1)]
    InitialStage2,
    #[n(2)]
    Surveillance,
    #[n(3)]
    Recertification,
    #[n(4)]
    Transfer,
    #[n(5)]
    Special,
}

impl AuditType {
    /// Initial certification audits use the full sampling and duration formulas;
    /// every other type uses the reduced surveillance variants.
    pub fn is_initial_certification(&self) -> bool {
        matches!(self, AuditType::InitialStage1 | AuditType::InitialStage2)
    }
}

impl FromStr for AuditType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial_stage1" => Ok(AuditType::InitialStage1),
            "initial_stage2" => Ok(AuditType::InitialStage2),
            "surveillance" => Ok(AuditType::Surveillance),
            "recertification" => Ok(AuditType::Recertification),
            "transfer" => Ok(AuditType::Transfer),
            "special" => Ok(AuditType::Special),
            other => Err(WorkflowError::UnknownLevel {
                field: "audit type",
                value: other.into(),
            }),
        }
    }
}

/// Roles supplied by the identity provider.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[n(0)]
    BodyAdmin,
    #[n(1)]
    LeadAuditor,
    #[n(2)]
    Auditor,
    #[n(3)]
    TechnicalReviewer,
    #[n(4)]
    ClientRepresentative,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::BodyAdmin,
        Role::LeadAuditor,
        Role::Auditor,
        Role::TechnicalReviewer,
        Role::ClientRepresentative,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::BodyAdmin => "body_admin",
            Role::LeadAuditor => "lead_auditor",
            Role::Auditor => "auditor",
            Role::TechnicalReviewer => "technical_reviewer",
            Role::ClientRepresentative => "client_representative",
        };
        f.write_str(name)
    }
}

/// Three-level scale shared by scope variation and the sampling risk factors.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum ScopeVariation {
    #[default]
    #[n(0)]
    Low,
    #[n(1)]
    Moderate,
    #[n(2)]
    High,
}

impl FromStr for ScopeVariation {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ScopeVariation::Low),
            "moderate" => Ok(ScopeVariation::Moderate),
            "high" => Ok(ScopeVariation::High),
            other => Err(WorkflowError::UnknownLevel {
                field: "scope variation",
                value: other.into(),
            }),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum ProcessComplexity {
    #[n(0)]
    Simple,
    #[default]
    #[n(1)]
    Standard,
    #[n(2)]
    Complex,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum RegulatoryLevel {
    #[n(0)]
    Low,
    #[default]
    #[n(1)]
    Standard,
    #[n(2)]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum FindingCategory {
    #[n(0)]
    Major,
    #[n(1)]
    Minor,
    #[n(2)]
    Observation,
    #[n(3)]
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum VerificationStatus {
    #[n(0)]
    Open,
    #[n(1)]
    ResponseSubmitted,
    #[n(2)]
    Verified,
    #[n(3)]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Finding {
    #[n(0)]
    pub category: FindingCategory,
    #[n(1)]
    pub status: VerificationStatus,
}

impl Finding {
    pub fn new(category: FindingCategory, status: VerificationStatus) -> Self {
        Self { category, status }
    }
    pub fn is_open(&self) -> bool {
        self.status != VerificationStatus::Closed
    }
}

/// Open/closed counts per finding category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindingBreakdown {
    pub major_open: u32,
    pub major_closed: u32,
    pub minor_open: u32,
    pub minor_closed: u32,
    pub observations: u32,
    pub opportunities: u32,
}

/// Risk attributes of the organization under audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct RiskProfile {
    #[n(0)]
    pub high_risk_site_count: u32,
    #[n(1)]
    pub scope_variation: ScopeVariation,
    #[n(2)]
    pub prior_major_nc_count: u32,
    #[n(3)]
    pub process_complexity: ProcessComplexity,
    #[n(4)]
    pub regulatory_environment: RegulatoryLevel,
    #[n(5)]
    pub outsourced_processes: bool,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    /// Builds a UTC timestamp, `None` if the fields do not form a valid instant
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct DateRange {
    #[n(0)]
    pub start: TimeStamp,
    #[n(1)]
    pub end: TimeStamp,
}

impl DateRange {
    pub fn new(start: TimeStamp, end: TimeStamp) -> Self {
        Self { start, end }
    }
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

/// Read-only snapshot of an audit and the facts about related records that the
/// guards need. Produced by the record store, never mutated by the engine.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct AuditFacts {
    #[n(0)]
    pub audit_id: String, // bech32, hrp "audit_"
    #[n(1)]
    pub current_state: AuditState,
    #[n(2)]
    pub audit_type: AuditType,
    #[n(3)]
    pub scheduled: Option<DateRange>,
    #[n(4)]
    pub findings: Vec<Finding>,
    #[n(5)]
    pub stage1_completed: bool,
    #[n(6)]
    pub active_certification: bool,
    #[n(7)]
    pub site_count: u32,
    #[n(8)]
    pub employee_count: u32,
    #[n(9)]
    pub risk: RiskProfile,
}

impl AuditFacts {
    /// A fresh draft audit with a generated identifier
    pub fn new(audit_type: AuditType) -> anyhow::Result<Self> {
        Ok(Self::new_with(new_uuid_to_bech32("audit_")?, audit_type))
    }
    pub fn new_with(audit_id: String, audit_type: AuditType) -> Self {
        Self {
            audit_id,
            current_state: AuditState::Draft,
            audit_type,
            scheduled: None,
            findings: vec![],
            stage1_completed: false,
            active_certification: false,
            site_count: 1,
            employee_count: 1,
            risk: RiskProfile::default(),
        }
    }
    pub fn set_state(mut self, state: AuditState) -> Self {
        self.current_state = state;
        self
    }
    pub fn set_schedule(mut self, start: TimeStamp, end: TimeStamp) -> Self {
        self.scheduled = Some(DateRange::new(start, end));
        self
    }
    pub fn add_finding(mut self, category: FindingCategory, status: VerificationStatus) -> Self {
        self.findings.push(Finding::new(category, status));
        self
    }
    pub fn set_stage1_completed(mut self, completed: bool) -> Self {
        self.stage1_completed = completed;
        self
    }
    pub fn set_active_certification(mut self, active: bool) -> Self {
        self.active_certification = active;
        self
    }
    pub fn set_site_count(mut self, sites: u32) -> Self {
        self.site_count = sites;
        self
    }
    pub fn set_employee_count(mut self, employees: u32) -> Self {
        self.employee_count = employees;
        self
    }
    pub fn set_risk(mut self, risk: RiskProfile) -> Self {
        self.risk = risk;
        self
    }

    /// Nonconformities with category `major` whose verification is not closed
    pub fn open_major_nonconformities(&self) -> u32 {
        self.findings
            .iter()
            .filter(|f| f.category == FindingCategory::Major && f.is_open())
            .count() as u32
    }

    pub fn finding_breakdown(&self) -> FindingBreakdown {
        let mut breakdown = FindingBreakdown::default();
        for finding in &self.findings {
            match (finding.category, finding.is_open()) {
                (FindingCategory::Major, true) => breakdown.major_open += 1,
                (FindingCategory::Major, false) => breakdown.major_closed += 1,
                (FindingCategory::Minor, true) => breakdown.minor_open += 1,
                (FindingCategory::Minor, false) => breakdown.minor_closed += 1,
                (FindingCategory::Observation, _) => breakdown.observations += 1,
                (FindingCategory::Opportunity, _) => breakdown.opportunities += 1,
            }
        }
        breakdown
    }
}
