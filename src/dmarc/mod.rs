//! DMARC (Domain-based Message Authentication, Reporting, and Conformance)
//! record checks per RFC 7489.

mod lookup;
mod types;
mod validate;

pub use lookup::{build_report, check_dmarc, DmarcReport};
pub use types::{AlignmentMode, DmarcField, DmarcRecord, DmarcTag, FailureOption, Policy};
pub use validate::{is_dmarc_record, validate_dmarc, DmarcAnalysis};
