//! DKIM (DomainKeys Identified Mail) key record checks per RFC 6376.

mod key;
mod lookup;
mod validate;

pub use key::{estimate_rsa_bits, DkimKeyRecord, DkimTag, KeyType};
pub use lookup::{build_report, check_dkim, select_key_record, DkimReport, DkimSource};
pub use validate::{validate_dkim, DkimAnalysis};
