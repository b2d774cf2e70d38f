//! C.A.R.E. framework signals derived from the transcript
//!
//! - Pillar and stakeholder role definitions
//! - Keyword coverage scoring per pillar
//! - Suggested-question coverage matching
//! - Red-flag detection

mod coverage;
mod pillar;
mod questions;
mod red_flags;
mod role;

pub use coverage::{CoverageReport, CoverageScorer, CoverageState, PillarCoverage};
pub use pillar::{Pillar, PillarKey};
pub use questions::{Question, QuestionCoverage};
pub use red_flags::{RedFlagAlert, RedFlagDetector, RedFlagRule};
pub use role::StakeholderRole;
