//! Email authentication record checks: SPF, DKIM, DMARC.
//!
//! Each check fetches the relevant DNS records through a `DnsResolver`,
//! validates them and returns a serializable report with a list of issues
//! and a Pass/Warning/Fail status. A missing record is a normal report;
//! only DNS infrastructure failures surface as `CheckError`.

pub mod checker;
pub mod common;
pub mod config;
pub mod dkim;
pub mod dmarc;
pub mod error;
pub mod spf;

pub use checker::{AuthChecker, CheckOutcome, DomainReport};
pub use common::dns::{DnsError, DnsResolver, HickoryResolver};
pub use common::issue::{Issue, Severity, Status};
pub use config::CheckerConfig;
pub use error::CheckError;
