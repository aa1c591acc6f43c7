//! Minimum audit duration (IAF MD5 style)
use super::audit::{AuditFacts, ProcessComplexity, RegulatoryLevel, ScopeVariation};
use super::error::WorkflowError;
use super::utils::round_to_hundredths;

/// Headcount above which base hours grow by a fixed step per 2,000 employees.
pub const LARGE_ORGANIZATION_THRESHOLD: u32 = 10_500;
const LARGE_ORGANIZATION_STEP_EMPLOYEES: u32 = 2_000;
const LARGE_ORGANIZATION_STEP_HOURS: f64 = 14.0;

pub const MIN_MULTIPLIER: f64 = 0.8;
pub const MAX_MULTIPLIER: f64 = 1.3;
pub const DEFAULT_WARNING_BAND: f64 = 0.10;

// (upper bound of the employee bracket, base auditor-hours)
const BASE_HOURS: [(u32, f64); 23] = [
    (5, 4.5),
    (10, 6.0),
    (15, 7.5),
    (25, 9.0),
    (45, 12.0),
    (65, 15.0),
    (85, 18.0),
    (125, 21.0),
    (175, 24.0),
    (275, 27.0),
    (425, 30.0),
    (625, 33.0),
    (875, 36.0),
    (1_175, 39.0),
    (1_550, 42.0),
    (2_025, 45.0),
    (2_675, 48.0),
    (3_450, 51.0),
    (4_350, 54.0),
    (5_450, 57.0),
    (6_800, 60.0),
    (8_500, 63.0),
    (10_500, 66.0),
];

/// Factors that scale the base hours up or down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplexityFactors {
    pub site_count: u32,
    pub scope_variation: ScopeVariation,
    pub process_complexity: ProcessComplexity,
    pub regulatory_environment: RegulatoryLevel,
    pub outsourced_processes: bool,
    pub prior_major_nc_count: u32,
}

impl From<&AuditFacts> for ComplexityFactors {
    fn from(facts: &AuditFacts) -> Self {
        Self {
            site_count: facts.site_count,
            scope_variation: facts.risk.scope_variation,
            process_complexity: facts.risk.process_complexity,
            regulatory_environment: facts.risk.regulatory_environment,
            outsourced_processes: facts.risk.outsourced_processes,
            prior_major_nc_count: facts.risk.prior_major_nc_count,
        }
    }
}

impl ComplexityFactors {
    /// Signed sum of the factor percentages, before clamping
    pub fn adjustment_percent(&self) -> i32 {
        let extra_sites = self.site_count.saturating_sub(1).min(3) as i32;
        let mut percent = extra_sites * 5;

        percent += match self.scope_variation {
            ScopeVariation::High => 10,
            ScopeVariation::Moderate => 5,
            ScopeVariation::Low => 0,
        };
        percent += match self.process_complexity {
            ProcessComplexity::Complex => 15,
            ProcessComplexity::Simple => -10,
            ProcessComplexity::Standard => 0,
        };
        percent += match self.regulatory_environment {
            RegulatoryLevel::High => 10,
            RegulatoryLevel::Low => -5,
            RegulatoryLevel::Standard => 0,
        };
        if self.outsourced_processes {
            percent += 8;
        }
        if self.prior_major_nc_count > 3 {
            percent += 10;
        }
        percent
    }

    /// Aggregate multiplier, always within `[0.8, 1.3]`
    pub fn multiplier(&self) -> f64 {
        (1.0 + f64::from(self.adjustment_percent()) / 100.0).clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Compliant,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationResult {
    pub is_valid: bool,
    pub required_minimum: f64,
    pub severity: Severity,
    pub recommendation: String,
    pub base_hours: f64,
    pub multiplier: f64,
}

/// Base auditor-hours for an organization of `employee_count` people.
pub fn base_hours(employee_count: u32) -> f64 {
    if let Some((_, hours)) = BASE_HOURS.iter().find(|(upper, _)| employee_count <= *upper) {
        return *hours;
    }

    let (_, at_threshold) = BASE_HOURS[BASE_HOURS.len() - 1];
    let steps =
        (employee_count - LARGE_ORGANIZATION_THRESHOLD).div_ceil(LARGE_ORGANIZATION_STEP_EMPLOYEES);
    at_threshold + LARGE_ORGANIZATION_STEP_HOURS * f64::from(steps)
}

/// Minimum hours after complexity and the surveillance reduction.
pub fn required_minimum(
    employee_count: u32,
    is_initial_certification: bool,
    factors: &ComplexityFactors,
) -> Result<f64, WorkflowError> {
    if employee_count == 0 {
        return Err(WorkflowError::ZeroEmployees);
    }
    let mut hours = base_hours(employee_count) * factors.multiplier();
    if !is_initial_certification {
        hours = hours * 2.0 / 3.0;
    }
    Ok(round_to_hundredths(hours))
}

/// Severity thresholds for duration checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPolicy {
    /// Fraction below the minimum still reported as a warning rather than critical
    pub warning_band: f64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            warning_band: DEFAULT_WARNING_BAND,
        }
    }
}

impl DurationPolicy {
    pub fn validate(
        &self,
        planned_hours: f64,
        employee_count: u32,
        is_initial_certification: bool,
        factors: &ComplexityFactors,
    ) -> Result<DurationResult, WorkflowError> {
        if !planned_hours.is_finite() || planned_hours < 0.0 {
            return Err(WorkflowError::InvalidPlannedHours(planned_hours));
        }
        let required = required_minimum(employee_count, is_initial_certification, factors)?;

        let (severity, recommendation) = if planned_hours >= required {
            (
                Severity::Compliant,
                format!("Planned {planned_hours:.2} h meets the minimum of {required:.2} h"),
            )
        } else {
            let shortfall = required - planned_hours;
            if planned_hours >= required * (1.0 - self.warning_band) {
                (
                    Severity::Warning,
                    format!(
                        "Planned {planned_hours:.2} h is {shortfall:.2} h short of the \
                         {required:.2} h minimum; extend the plan"
                    ),
                )
            } else {
                (
                    Severity::Critical,
                    format!(
                        "Planned {planned_hours:.2} h is far below the {required:.2} h \
                         minimum; replan the audit with at least {shortfall:.2} additional hours"
                    ),
                )
            }
        };

        Ok(DurationResult {
            is_valid: severity == Severity::Compliant,
            required_minimum: required,
            severity,
            recommendation,
            base_hours: base_hours(employee_count),
            multiplier: factors.multiplier(),
        })
    }
}

/// Checks a planned duration against the minimum using the default 10% warning band.
pub fn validate_duration(
    planned_hours: f64,
    employee_count: u32,
    is_initial_certification: bool,
    factors: &ComplexityFactors,
) -> Result<DurationResult, WorkflowError> {
    DurationPolicy::default().validate(
        planned_hours,
        employee_count,
        is_initial_certification,
        factors,
    )
}
