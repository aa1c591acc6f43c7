//! Certification audit workflow engine.
//!
//! Guards every lifecycle transition of an audit against the transition table
//! and the business rules bound to each edge, and computes the IAF sampling and
//! duration minimums those rules depend on.

pub mod audit;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod guard;
pub mod history;
pub mod roles;
pub mod sampling;
pub mod service;
pub mod store;
pub mod transition;
pub mod utils;

pub use audit::{AuditFacts, AuditState, AuditType, Role, TimeStamp};
pub use duration::{ComplexityFactors, DurationResult, Severity, validate_duration};
pub use engine::{Clock, FixedClock, SystemClock, WorkflowEngine};
pub use error::{ReasonCode, WorkflowError};
pub use guard::{Guard, GuardWarning};
pub use history::{TransitionHistory, TransitionHistoryEntry};
pub use sampling::{SampleSizeResult, SamplingRiskFactors, calculate_sample_size};
pub use transition::{TransitionRequest, TransitionResult};
