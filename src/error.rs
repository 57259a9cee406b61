use thiserror::Error;

use crate::common::dns::DnsError;

/// A check could not reach a verdict because DNS itself failed.
///
/// "No record published" is never reported through this type; that is a
/// normal report with `found == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("DNS lookup for {name} failed: {source}")]
    Dns {
        name: String,
        #[source]
        source: DnsError,
    },
}

impl CheckError {
    pub(crate) fn dns(name: &str, source: DnsError) -> Self {
        CheckError::Dns { name: name.to_string(), source }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckError::Dns { source: DnsError::Timeout, .. })
    }
}
