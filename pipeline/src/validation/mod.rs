//! The two validation passes run on a reshaped dataset.
//!
//! - [`structural`] - conformance to the DSD, checked by the registry
//! - [`quality`] - VTL data-quality rules, run by the rule engine
//!
//! Both return their findings as data. A dataset that breaks the DSD or the
//! rules still yields `Ok`; only local I/O and service failures are errors.

pub mod quality;
pub mod structural;

pub use quality::{quality_validation, rule_log_file_name, RuleEngineClient};
pub use structural::{structural_validation, STRUCTURAL_LOG_FILE};
