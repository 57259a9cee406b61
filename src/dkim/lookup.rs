use serde::Serialize;
use tracing::{debug, warn};

use crate::common::dns::{found_or_empty, DnsError, DnsResolver};
use crate::common::domain::{dkim_hostname, normalize};
use crate::common::issue::{aggregate_status, Issue, Status};
use crate::error::CheckError;

use super::key::DkimKeyRecord;
use super::validate::validate_dkim;

/// Where the key record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DkimSource {
    /// TXT at `<selector>._domainkey.<domain>`.
    Txt,
    /// TXT at the CNAME target of that name.
    Cname,
}

/// Result of a DKIM check for one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimReport {
    pub domain: String,
    pub selector: String,
    pub hostname: String,
    pub found: bool,
    pub record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DkimSource>,
    pub cname_target: Option<String>,
    pub parsed: Option<DkimKeyRecord>,
    pub issues: Vec<Issue>,
    pub status: Status,
}

/// Pick the key record among the TXT strings at one name: the first one
/// that looks like a key (`p=` or a `v=DKIM1` prefix, any case), else the first one.
pub fn select_key_record(records: &[String]) -> Option<&String> {
    records
        .iter()
        .find(|r| {
            let lower = r.trim_start().to_ascii_lowercase();
            lower.contains("p=") || lower.starts_with("v=dkim1")
        })
        .or_else(|| records.first())
}

/// Resolve and validate the key published for `selector` at `domain`.
///
/// TXT and CNAME at the DKIM hostname are queried concurrently. When the TXT
/// query yields nothing usable and a CNAME exists, the TXT lookup is repeated
/// at the CNAME target.
pub async fn check_dkim<R: DnsResolver>(
    resolver: &R,
    domain: &str,
    selector: &str,
) -> Result<DkimReport, CheckError> {
    let domain = normalize(domain);
    let selector = selector.trim().to_string();
    let hostname = dkim_hostname(&selector, &domain);
    debug!(hostname = %hostname, "checking DKIM");

    let (txt, cname) = tokio::join!(resolver.query_txt(&hostname), resolver.query_cname(&hostname));
    let txt = found_or_empty(txt);
    let cname = found_or_empty(cname);

    let cname_target = cname
        .as_ref()
        .ok()
        .and_then(|targets| targets.first())
        .cloned();

    let mut resolved = match &txt {
        Ok(records) => select_key_record(records).map(|r| (r.clone(), DkimSource::Txt)),
        Err(_) => None,
    };

    if resolved.is_none() {
        if let Some(target) = &cname_target {
            debug!(hostname = %hostname, target = %target, "no key at selector, following CNAME");
            let records = found_or_empty(resolver.query_txt(target).await).map_err(|e| {
                warn!(target = %target, error = %e, "DKIM TXT lookup at CNAME target failed");
                CheckError::dns(target, e)
            })?;
            resolved = select_key_record(&records).map(|r| (r.clone(), DkimSource::Cname));
        }
    }

    let Some((record, source)) = resolved else {
        for result in [&txt, &cname] {
            if let Err(e) = result {
                warn!(hostname = %hostname, error = %e, "DKIM lookup failed");
                return Err(CheckError::dns(&hostname, e.clone()));
            }
        }
        return Ok(not_found(domain, selector, hostname, cname_target));
    };

    if let Err(e) = &cname {
        log_ignored_failure(&hostname, e);
    }

    Ok(build_report(domain, selector, hostname, record, source, cname_target))
}

fn log_ignored_failure(hostname: &str, e: &DnsError) {
    warn!(hostname, error = %e, "DKIM CNAME lookup failed, key found via TXT");
}

fn not_found(domain: String, selector: String, hostname: String, cname_target: Option<String>) -> DkimReport {
    let issues = vec![Issue::error(format!("No DKIM record found at {}", hostname))];
    let status = aggregate_status(&issues, false);
    DkimReport {
        domain,
        selector,
        hostname,
        found: false,
        record: None,
        source: None,
        cname_target,
        parsed: None,
        issues,
        status,
    }
}

/// Assemble a report for a key record that was found.
pub fn build_report(
    domain: String,
    selector: String,
    hostname: String,
    record: String,
    source: DkimSource,
    cname_target: Option<String>,
) -> DkimReport {
    let analysis = validate_dkim(&record);

    let mut issues = Vec::with_capacity(analysis.issues.len() + 1);
    if let (DkimSource::Cname, Some(target)) = (source, &cname_target) {
        issues.push(Issue::info(format!("DKIM record is delegated via CNAME to {}", target)));
    }
    issues.extend(analysis.issues);

    let status = aggregate_status(&issues, false);
    DkimReport {
        domain,
        selector,
        hostname,
        found: true,
        record: Some(record),
        source: Some(source),
        cname_target,
        parsed: Some(analysis.parsed),
        issues,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dns::MockResolver;
    use crate::common::issue::Severity;
    use base64::Engine;

    fn key_2048() -> String {
        base64::engine::general_purpose::STANDARD.encode(vec![0x30u8; 294])
    }

    const HOST: &str = "sel._domainkey.example.com";

    #[test]
    fn select_prefers_key_like_records() {
        let records = vec![
            "unrelated text".to_string(),
            "V=DKIM1; k=rsa".to_string(),
            "p=abc".to_string(),
        ];
        assert_eq!(select_key_record(&records).unwrap(), "V=DKIM1; k=rsa");

        let records = vec!["unrelated".to_string(), "K=rsa; P=abc".to_string()];
        assert_eq!(select_key_record(&records).unwrap(), "K=rsa; P=abc");

        let records = vec!["first".to_string(), "second".to_string()];
        assert_eq!(select_key_record(&records).unwrap(), "first");
        assert!(select_key_record(&[]).is_none());
    }

    #[tokio::test]
    async fn found_via_txt() {
        let resolver = MockResolver::new();
        resolver.add_txt(HOST, vec![format!("v=DKIM1; k=rsa; p={}", key_2048())]);

        let report = check_dkim(&resolver, "Example.com", "sel").await.unwrap();
        assert!(report.found);
        assert_eq!(report.hostname, HOST);
        assert_eq!(report.source, Some(DkimSource::Txt));
        assert!(report.cname_target.is_none());
        assert_eq!(report.status, Status::Pass);
        assert_eq!(report.parsed.unwrap().estimated_key_bits, Some(2048));
    }

    #[tokio::test]
    async fn revoked_key_fails() {
        let resolver = MockResolver::new();
        resolver.add_txt(HOST, vec!["v=DKIM1; k=rsa; p=".into()]);

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(report.found);
        let errors: Vec<_> = report.issues.iter().filter(|i| i.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("revoked"));
        assert_eq!(report.status, Status::Fail);
    }

    #[tokio::test]
    async fn follows_cname_when_txt_is_empty() {
        let resolver = MockResolver::new();
        resolver.add_cname(HOST, "sel.dkim.provider.net");
        resolver.add_txt("sel.dkim.provider.net", vec![format!("v=DKIM1; p={}", key_2048())]);

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(report.found);
        assert_eq!(report.source, Some(DkimSource::Cname));
        assert_eq!(report.cname_target.as_deref(), Some("sel.dkim.provider.net"));
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert!(report.issues[0].message.contains("sel.dkim.provider.net"));
        assert_eq!(report.status, Status::Pass);
    }

    #[tokio::test]
    async fn cname_advisory_comes_first_even_with_errors() {
        let resolver = MockResolver::new();
        resolver.add_cname(HOST, "sel.dkim.provider.net");
        resolver.add_txt("sel.dkim.provider.net", vec!["v=DKIM1; p=".into()]);

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert_eq!(report.issues[1].severity, Severity::Error);
        assert_eq!(report.status, Status::Fail);
    }

    #[tokio::test]
    async fn direct_txt_key_has_no_cname_advisory() {
        let resolver = MockResolver::new();
        resolver.add_txt(HOST, vec![format!("v=DKIM1; k=rsa; p={}", key_2048())]);
        resolver.add_cname(HOST, "sel.provider.net");

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert_eq!(report.source, Some(DkimSource::Txt));
        assert_eq!(report.cname_target.as_deref(), Some("sel.provider.net"));
        assert!(report.issues.iter().all(|i| !i.message.contains("CNAME")));
        assert_eq!(report.status, Status::Pass);
    }

    #[tokio::test]
    async fn not_found() {
        let resolver = MockResolver::new();
        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(!report.found);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains(HOST));
        assert_eq!(report.status, Status::Fail);
        assert!(report.source.is_none());
    }

    #[tokio::test]
    async fn cname_target_without_record_is_not_found() {
        let resolver = MockResolver::new();
        resolver.add_cname(HOST, "gone.provider.net");

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(!report.found);
        assert_eq!(report.cname_target.as_deref(), Some("gone.provider.net"));
    }

    #[tokio::test]
    async fn txt_timeout_is_reported() {
        let resolver = MockResolver::new();
        resolver.add_txt_err(HOST, DnsError::Timeout);

        let err = check_dkim(&resolver, "example.com", "sel").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn txt_timeout_recovered_through_cname() {
        let resolver = MockResolver::new();
        resolver.add_txt_err(HOST, DnsError::Timeout);
        resolver.add_cname(HOST, "sel.dkim.provider.net");
        resolver.add_txt("sel.dkim.provider.net", vec![format!("p={}", key_2048())]);

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(report.found);
        assert_eq!(report.source, Some(DkimSource::Cname));
    }

    #[tokio::test]
    async fn cname_failure_without_txt_is_reported() {
        let resolver = MockResolver::new();
        resolver.add_txt_err(HOST, DnsError::NoRecords);
        resolver.add_cname_err(HOST, DnsError::ServFail);

        let err = check_dkim(&resolver, "example.com", "sel").await.unwrap_err();
        assert_eq!(err, CheckError::Dns { name: HOST.into(), source: DnsError::ServFail });
    }

    #[tokio::test]
    async fn cname_failure_ignored_when_txt_found() {
        let resolver = MockResolver::new();
        resolver.add_txt(HOST, vec![format!("p={}", key_2048())]);
        resolver.add_cname_err(HOST, DnsError::Timeout);

        let report = check_dkim(&resolver, "example.com", "sel").await.unwrap();
        assert!(report.found);
        assert_eq!(report.source, Some(DkimSource::Txt));
    }

    #[tokio::test]
    async fn cname_target_timeout_is_reported() {
        let resolver = MockResolver::new();
        resolver.add_cname(HOST, "sel.dkim.provider.net");
        resolver.add_txt_err("sel.dkim.provider.net", DnsError::Timeout);

        let err = check_dkim(&resolver, "example.com", "sel").await.unwrap_err();
        assert_eq!(
            err,
            CheckError::Dns { name: "sel.dkim.provider.net".into(), source: DnsError::Timeout }
        );
    }

    #[test]
    fn report_json_shape() {
        let report = build_report(
            "example.com".into(),
            "sel".into(),
            HOST.into(),
            "v=DKIM1; k=ed25519; p=MCowBQYDK2VwAyEA".into(),
            DkimSource::Txt,
            None,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "txt");
        assert!(json["cnameTarget"].is_null());
        assert_eq!(json["parsed"]["keyType"], "ed25519");
        assert!(json["parsed"]["estimatedKeyBits"].is_null());
        assert_eq!(json["parsed"]["tags"][0], serde_json::json!(["v", "DKIM1"]));
    }
}
