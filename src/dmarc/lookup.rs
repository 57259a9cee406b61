use serde::Serialize;
use tracing::{debug, warn};

use crate::common::dns::{found_or_empty, DnsResolver};
use crate::common::domain::{dmarc_hostname, normalize};
use crate::common::issue::{aggregate_status, Issue, Status};
use crate::error::CheckError;

use super::types::{DmarcField, DmarcRecord};
use super::validate::{is_dmarc_record, validate_dmarc};

/// Result of a DMARC check for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmarcReport {
    pub domain: String,
    pub found: bool,
    pub raw_record: Option<String>,
    /// Every `v=DMARC1` record published, only set when there is more than one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_records: Option<Vec<String>>,
    pub fields: Vec<DmarcField>,
    pub policy_explanation: Option<String>,
    pub record: Option<DmarcRecord>,
    pub issues: Vec<Issue>,
    pub status: Status,
}

/// Fetch and validate the DMARC record at `_dmarc.<domain>`.
pub async fn check_dmarc<R: DnsResolver>(resolver: &R, domain: &str) -> Result<DmarcReport, CheckError> {
    let domain = normalize(domain);
    let hostname = dmarc_hostname(&domain);
    debug!(hostname = %hostname, "checking DMARC");

    let txt_records = found_or_empty(resolver.query_txt(&hostname).await).map_err(|e| {
        warn!(hostname = %hostname, error = %e, "DMARC TXT lookup failed");
        CheckError::dns(&hostname, e)
    })?;

    let dmarc_records: Vec<String> = txt_records
        .iter()
        .map(|s| s.trim())
        .filter(|s| is_dmarc_record(s))
        .map(str::to_string)
        .collect();

    Ok(build_report(domain, dmarc_records))
}

/// Assemble a report from the `v=DMARC1` records published for `domain`.
pub fn build_report(domain: String, dmarc_records: Vec<String>) -> DmarcReport {
    let Some(first) = dmarc_records.first().cloned() else {
        let issues = vec![Issue::error(format!("No DMARC record found at {}", dmarc_hostname(&domain)))];
        let status = aggregate_status(&issues, false);
        return DmarcReport {
            domain,
            found: false,
            raw_record: None,
            all_records: None,
            fields: Vec::new(),
            policy_explanation: None,
            record: None,
            issues,
            status,
        };
    };

    let analysis = validate_dmarc(&first);
    let multiple = dmarc_records.len() > 1;

    let mut issues = Vec::with_capacity(analysis.issues.len() + 1);
    if multiple {
        issues.push(Issue::error(format!(
            "{} DMARC records found; receivers ignore DMARC when more than one is published",
            dmarc_records.len()
        )));
    }
    issues.extend(analysis.issues);

    let status = aggregate_status(&issues, multiple);
    DmarcReport {
        domain,
        found: true,
        raw_record: Some(first),
        all_records: multiple.then_some(dmarc_records),
        fields: analysis.fields,
        policy_explanation: analysis.policy_explanation,
        record: Some(analysis.record),
        issues,
        status,
    }
}
