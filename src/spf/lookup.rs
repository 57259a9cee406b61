use serde::Serialize;
use tracing::{debug, warn};

use crate::common::dns::{found_or_empty, DnsResolver};
use crate::common::domain::normalize;
use crate::common::issue::{aggregate_status, Issue, Status};
use crate::error::CheckError;

use super::mechanism::SpfMechanism;
use super::validate::{is_spf_record, validate_spf};

/// Result of an SPF check for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpfReport {
    pub domain: String,
    pub found: bool,
    pub record: Option<String>,
    /// Every `v=spf1` record published, only set when there is more than one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_records: Option<Vec<String>>,
    pub mechanisms: Vec<SpfMechanism>,
    pub dns_lookup_count: usize,
    pub valid: bool,
    pub issues: Vec<Issue>,
    pub status: Status,
}

/// Query the domain's TXT records and validate the SPF record found there.
///
/// - No TXT record matching `v=spf1` → `found == false`, status Fail
/// - Multiple matching records → all kept, status forced to Fail
/// - Timeout or resolver failure → `Err(CheckError::Dns)`
pub async fn check_spf<R: DnsResolver>(resolver: &R, domain: &str) -> Result<SpfReport, CheckError> {
    let domain = normalize(domain);
    debug!(domain = %domain, "checking SPF");

    let txt_records = found_or_empty(resolver.query_txt(&domain).await).map_err(|e| {
        warn!(domain = %domain, error = %e, "SPF TXT lookup failed");
        CheckError::dns(&domain, e)
    })?;

    let spf_records: Vec<String> = txt_records
        .iter()
        .map(|s| s.trim())
        .filter(|s| is_spf_record(s))
        .map(str::to_string)
        .collect();

    Ok(build_report(domain, spf_records))
}

/// Assemble a report from the `v=spf1` records published at `domain`.
pub fn build_report(domain: String, spf_records: Vec<String>) -> SpfReport {
    let Some(first) = spf_records.first().cloned() else {
        let issues = vec![Issue::error(format!("No SPF record found for {}", domain))];
        let status = aggregate_status(&issues, false);
        return SpfReport {
            domain,
            found: false,
            record: None,
            all_records: None,
            mechanisms: Vec::new(),
            dns_lookup_count: 0,
            valid: false,
            issues,
            status,
        };
    };

    let analysis = validate_spf(&first);
    let multiple = spf_records.len() > 1;

    let mut issues = Vec::with_capacity(analysis.issues.len() + 1);
    if multiple {
        issues.push(Issue::error(format!(
            "{} SPF records found; a domain must publish exactly one, receivers will return permerror",
            spf_records.len()
        )));
    }
    issues.extend(analysis.issues);

    let status = aggregate_status(&issues, multiple);
    SpfReport {
        domain,
        found: true,
        record: Some(first),
        all_records: multiple.then_some(spf_records),
        mechanisms: analysis.mechanisms,
        dns_lookup_count: analysis.dns_lookup_count,
        valid: analysis.is_valid && !multiple,
        issues,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dns::{DnsError, MockResolver};
    use crate::common::issue::Severity;

    #[tokio::test]
    async fn check_spf_filters_non_spf_records() {
        let resolver = MockResolver::new();
        resolver.add_txt(
            "example.com",
            vec![
                "google-site-verification=abc123".into(),
                "  v=spf1 mx -all ".into(),
                "some other txt record".into(),
            ],
        );
        let report = check_spf(&resolver, "Example.com.").await.unwrap();
        assert_eq!(report.domain, "example.com");
        assert!(report.found);
        assert_eq!(report.record.as_deref(), Some("v=spf1 mx -all"));
        assert!(report.all_records.is_none());
        assert_eq!(report.mechanisms.len(), 2);
        assert_eq!(report.dns_lookup_count, 1);
        assert!(report.valid);
        assert_eq!(report.status, Status::Pass);
    }

    #[tokio::test]
    async fn check_spf_no_record() {
        let resolver = MockResolver::new();
        resolver.add_txt("example.com", vec!["not-spf".into()]);
        let report = check_spf(&resolver, "example.com").await.unwrap();
        assert!(!report.found);
        assert_eq!(report.status, Status::Fail);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn check_spf_nxdomain_is_not_found() {
        let resolver = MockResolver::new();
        let report = check_spf(&resolver, "nonexistent.example.com").await.unwrap();
        assert!(!report.found);
        assert_eq!(report.status, Status::Fail);

        resolver.add_txt_err("empty.example.com", DnsError::NoRecords);
        let report = check_spf(&resolver, "empty.example.com").await.unwrap();
        assert!(!report.found);
    }

    #[tokio::test]
    async fn check_spf_timeout_is_distinct_from_absent() {
        let resolver = MockResolver::new();
        resolver.add_txt_err("example.com", DnsError::Timeout);
        let err = check_spf(&resolver, "example.com").await.unwrap_err();
        assert!(err.is_timeout());

        resolver.add_txt_err("example.com", DnsError::ServFail);
        let err = check_spf(&resolver, "example.com").await.unwrap_err();
        assert_eq!(
            err,
            CheckError::Dns { name: "example.com".into(), source: DnsError::ServFail }
        );
    }

    #[tokio::test]
    async fn two_records_force_fail() {
        let resolver = MockResolver::new();
        resolver.add_txt("example.com", vec!["v=spf1 -all".into(), "v=spf1 mx -all".into()]);
        let report = check_spf(&resolver, "example.com").await.unwrap();
        assert!(report.found);
        assert_eq!(report.status, Status::Fail);
        assert!(!report.valid);
        assert_eq!(
            report.all_records,
            Some(vec!["v=spf1 -all".to_string(), "v=spf1 mx -all".to_string()])
        );
        assert_eq!(report.record.as_deref(), Some("v=spf1 -all"));
    }

    #[test]
    fn report_json_shape() {
        let report = build_report("example.com".into(), vec!["v=spf1 include:_spf.example.net ~all".into()]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dnsLookupCount"], 1);
        assert_eq!(json["status"], "pass");
        assert_eq!(json["mechanisms"][1]["qualifier"], "~");
        assert_eq!(json["issues"][0]["severity"], "info");
        assert!(json.get("allRecords").is_none());
    }
}
