//! Multi-site sample size (IAF MD1 style)
//!
//! The base sample is the square root of the site count, rounded up for initial
//! certification and rounded to nearest for surveillance. Risk factors then add
//! sites on top, and the total never exceeds the number of sites in scope.
use super::audit::{AuditFacts, ScopeVariation};
use super::error::WorkflowError;
use super::utils::round_to_hundredths;

/// Risk inputs that raise the sample above the square-root base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingRiskFactors {
    pub high_risk_site_count: u32,
    pub previous_findings_count: u32,
    pub scope_variation: ScopeVariation,
}

impl From<&AuditFacts> for SamplingRiskFactors {
    fn from(facts: &AuditFacts) -> Self {
        Self {
            high_risk_site_count: facts.risk.high_risk_site_count,
            previous_findings_count: facts.risk.prior_major_nc_count,
            scope_variation: facts.risk.scope_variation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSizeResult {
    pub minimum_sites: u32,
    pub base_calculation: u32,
    pub risk_adjustment: u32,
    pub coverage_percentage: f64,
    pub justification: String,
    pub risk_factor_descriptions: Vec<String>,
}

/// Minimum number of sites to visit. Fails only for an empty scope or a
/// high-risk count larger than the scope.
pub fn calculate_sample_size(
    total_sites: u32,
    is_initial_certification: bool,
    risk: &SamplingRiskFactors,
) -> Result<SampleSizeResult, WorkflowError> {
    if total_sites == 0 {
        return Err(WorkflowError::ZeroSites);
    }
    if risk.high_risk_site_count > total_sites {
        return Err(WorkflowError::HighRiskExceedsSites {
            high_risk: risk.high_risk_site_count,
            total: total_sites,
        });
    }

    if total_sites == 1 {
        return Ok(SampleSizeResult {
            minimum_sites: 1,
            base_calculation: 1,
            risk_adjustment: 0,
            coverage_percentage: 100.0,
            justification: "Single-site organization: the only site is audited".into(),
            risk_factor_descriptions: vec![],
        });
    }

    let n = u64::from(total_sites);
    let base = if is_initial_certification {
        ceil_sqrt(n)
    } else {
        // ceil(sqrt(n) - 0.5) is the least k with (2k + 1)^2 >= 4n
        (ceil_sqrt(4 * n) / 2).max(1)
    };
    // base <= ceil(sqrt(u32::MAX)), so it fits
    let base = base as u32;

    let mut descriptions = vec![];
    let mut adjustment = 0u32;

    let uncovered_high_risk = risk.high_risk_site_count.saturating_sub(base).min(base);
    if uncovered_high_risk > 0 {
        adjustment += uncovered_high_risk;
        descriptions.push(format!(
            "{} high-risk sites exceed the base sample: +{} sites",
            risk.high_risk_site_count, uncovered_high_risk
        ));
    }

    if risk.previous_findings_count >= 3 {
        adjustment += 1;
        descriptions.push(format!(
            "{} previous major findings: +1 site",
            risk.previous_findings_count
        ));
    }

    let scope_extra = match risk.scope_variation {
        ScopeVariation::High => base.div_ceil(10),
        ScopeVariation::Moderate => base.div_ceil(20),
        ScopeVariation::Low => 0,
    };
    if scope_extra > 0 {
        adjustment += scope_extra;
        descriptions.push(format!(
            "{:?} scope variation across sites: +{} sites",
            risk.scope_variation, scope_extra
        ));
    }

    let minimum_sites = base.saturating_add(adjustment).min(total_sites);
    let coverage_percentage =
        round_to_hundredths(f64::from(minimum_sites) / f64::from(total_sites) * 100.0);

    let formula = if is_initial_certification {
        format!("Initial certification: ceil(sqrt({total_sites})) = {base}")
    } else {
        format!("Surveillance: ceil(sqrt({total_sites}) - 0.5) = {base}")
    };
    let justification = format!(
        "{formula} base sites, risk adjustment +{adjustment}; \
         {minimum_sites} of {total_sites} sites sampled ({coverage_percentage:.2}% coverage)"
    );

    Ok(SampleSizeResult {
        minimum_sites,
        base_calculation: base,
        risk_adjustment: adjustment,
        coverage_percentage,
        justification,
        risk_factor_descriptions: descriptions,
    })
}

fn ceil_sqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    if root * root == n { root } else { root + 1 }
}
