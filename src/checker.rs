use serde::Serialize;
use tracing::{debug, warn};

use crate::common::dns::DnsResolver;
use crate::common::domain::normalize;
use crate::dkim::{self, DkimReport};
use crate::dmarc::{self, DmarcReport};
use crate::error::CheckError;
use crate::spf::{self, SpfReport};

// ---------------------------------------------------------------------------
// CheckOutcome / DomainReport
// ---------------------------------------------------------------------------

/// Per-protocol result inside a combined report. A DNS failure in one
/// protocol does not hide the results of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CheckOutcome<T> {
    Completed(T),
    DnsFailure { message: String },
}

impl<T> CheckOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            CheckOutcome::Completed(report) => Some(report),
            CheckOutcome::DnsFailure { .. } => None,
        }
    }

    pub fn is_dns_failure(&self) -> bool {
        matches!(self, CheckOutcome::DnsFailure { .. })
    }
}

impl<T> From<Result<T, CheckError>> for CheckOutcome<T> {
    fn from(result: Result<T, CheckError>) -> Self {
        match result {
            Ok(report) => CheckOutcome::Completed(report),
            Err(e) => {
                warn!(error = %e, "check aborted by DNS failure");
                CheckOutcome::DnsFailure { message: e.to_string() }
            }
        }
    }
}

/// SPF, DMARC and (when a selector is given) DKIM for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    pub domain: String,
    pub spf: CheckOutcome<SpfReport>,
    pub dmarc: CheckOutcome<DmarcReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dkim: Option<CheckOutcome<DkimReport>>,
}

impl DomainReport {
    pub fn has_dns_failure(&self) -> bool {
        self.spf.is_dns_failure()
            || self.dmarc.is_dns_failure()
            || self.dkim.as_ref().is_some_and(CheckOutcome::is_dns_failure)
    }
}

// ---------------------------------------------------------------------------
// AuthChecker
// ---------------------------------------------------------------------------

/// Runs record checks against a single resolver.
pub struct AuthChecker<R: DnsResolver> {
    resolver: R,
}

impl<R: DnsResolver> AuthChecker<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub async fn check_spf(&self, domain: &str) -> Result<SpfReport, CheckError> {
        spf::check_spf(&self.resolver, domain).await
    }

    pub async fn check_dmarc(&self, domain: &str) -> Result<DmarcReport, CheckError> {
        dmarc::check_dmarc(&self.resolver, domain).await
    }

    pub async fn check_dkim(&self, domain: &str, selector: &str) -> Result<DkimReport, CheckError> {
        dkim::check_dkim(&self.resolver, domain, selector).await
    }

    /// Run every applicable check concurrently.
    pub async fn check_all(&self, domain: &str, selector: Option<&str>) -> DomainReport {
        let domain = normalize(domain);
        debug!(domain = %domain, selector = ?selector, "running all checks");

        let dkim = async {
            match selector {
                Some(sel) => Some(self.check_dkim(&domain, sel).await),
                None => None,
            }
        };
        let (spf, dmarc, dkim) = tokio::join!(self.check_spf(&domain), self.check_dmarc(&domain), dkim);

        DomainReport {
            spf: spf.into(),
            dmarc: dmarc.into(),
            dkim: dkim.map(CheckOutcome::from),
            domain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dns::{DnsError, MockResolver};
    use crate::common::issue::Status;

    fn healthy_domain() -> MockResolver {
        let resolver = MockResolver::new();
        resolver.add_txt("example.com", vec!["v=spf1 include:_spf.google.com -all".into()]);
        resolver.add_txt(
            "_dmarc.example.com",
            vec!["v=DMARC1; p=reject; rua=mailto:dmarc@example.com".into()],
        );
        resolver
    }

    #[tokio::test]
    async fn check_all_without_selector() {
        let checker = AuthChecker::new(healthy_domain());
        let report = checker.check_all("Example.COM", None).await;

        assert_eq!(report.domain, "example.com");
        assert_eq!(report.spf.completed().unwrap().status, Status::Pass);
        assert_eq!(report.dmarc.completed().unwrap().status, Status::Pass);
        assert!(report.dkim.is_none());
        assert!(!report.has_dns_failure());
    }

    #[tokio::test]
    async fn check_all_with_missing_dkim() {
        let checker = AuthChecker::new(healthy_domain());
        let report = checker.check_all("example.com", Some("default")).await;

        let dkim = report.dkim.as_ref().unwrap().completed().unwrap();
        assert!(!dkim.found);
        assert_eq!(dkim.status, Status::Fail);
    }

    #[tokio::test]
    async fn dns_failure_is_isolated() {
        let resolver = healthy_domain();
        resolver.add_txt_err("_dmarc.example.com", DnsError::Timeout);
        let checker = AuthChecker::new(resolver);

        let report = checker.check_all("example.com", None).await;
        assert!(report.spf.completed().is_some());
        assert!(report.dmarc.is_dns_failure());
        assert!(report.has_dns_failure());
    }

    #[tokio::test]
    async fn single_checks_delegate() {
        let checker = AuthChecker::new(healthy_domain());
        assert!(checker.check_spf("example.com").await.unwrap().found);
        assert!(checker.check_dmarc("example.com").await.unwrap().found);
        assert!(!checker.check_dkim("example.com", "s1").await.unwrap().found);
    }

    #[tokio::test]
    async fn json_tags_outcomes() {
        let resolver = healthy_domain();
        resolver.add_txt_err("example.com", DnsError::ServFail);
        let checker = AuthChecker::new(resolver);

        let report = checker.check_all("example.com", None).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["spf"]["outcome"], "dnsFailure");
        assert!(json["spf"]["message"].as_str().unwrap().contains("example.com"));
        assert_eq!(json["dmarc"]["outcome"], "completed");
        assert_eq!(json["dmarc"]["found"], true);
        assert!(json.get("dkim").is_none());
    }
}
