//! Common infrastructure shared across SPF, DKIM, and DMARC.

pub mod dns;
pub mod domain;
pub mod issue;
pub mod tags;
