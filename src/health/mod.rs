//! Health monitoring of the dashboard's remote data store
//!
//! ## Modules
//!
//! - `types`: `HealthCheck`, `SystemHealth`, `HealthSummary`
//! - `probes`: the four read-only surface probes
//! - `remediation`: problem detection and the remediation dispatch table
//! - `monitor`: cached single-flight checks and throttled auto-fix

pub mod monitor;
pub mod probes;
pub mod remediation;
pub mod types;

pub use monitor::{AutoFixReport, HealthError, HealthMonitor};
pub use remediation::{ProblemKind, Remediation, RemediationOutcome, RemediationTable};
pub use types::{HealthCheck, HealthStatus, HealthSummary, Surface, SystemHealth};
