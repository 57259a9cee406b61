//! SPF (Sender Policy Framework) record checks per RFC 7208.

mod lookup;
mod mechanism;
mod validate;

pub use lookup::{build_report, check_spf, SpfReport};
pub use mechanism::{tokenize, MechanismKind, Qualifier, SpfMechanism};
pub use validate::{is_spf_record, validate_spf, SpfAnalysis, LOOKUP_WARNING_THRESHOLD, MAX_DNS_LOOKUPS};
