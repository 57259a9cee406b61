use crate::common::issue::Issue;
use crate::common::tags::TagRecord;

use super::types::{AlignmentMode, DmarcField, DmarcRecord, DmarcTag, FailureOption, Policy};

/// Parsed record, per-tag explanations and findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmarcAnalysis {
    pub record: DmarcRecord,
    pub fields: Vec<DmarcField>,
    pub policy_explanation: Option<String>,
    pub issues: Vec<Issue>,
}

/// Check if a TXT record is a DMARC record: a case-insensitive `v=DMARC1`
/// followed by the end of the record, `;` or whitespace.
pub fn is_dmarc_record(txt: &str) -> bool {
    let lower = txt.trim().to_ascii_lowercase();
    match lower.strip_prefix("v=dmarc1") {
        Some(rest) => rest.is_empty() || rest.starts_with(';') || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Validate a DMARC record.
///
/// A record without the `v=DMARC1` prefix gets an error, but its tags are
/// still parsed and checked.
pub fn validate_dmarc(raw: &str) -> DmarcAnalysis {
    let mut issues = Vec::new();
    if !is_dmarc_record(raw) {
        issues.push(Issue::error("Record does not start with \"v=DMARC1\""));
    }

    let (tags, tag_issues) = TagRecord::parse(raw);
    issues.extend(tag_issues);

    let mut record = DmarcRecord::default();
    let mut fields = Vec::with_capacity(tags.len());

    for (key, value) in tags.iter() {
        let tag = DmarcTag::from_key(key);
        let description = match tag {
            DmarcTag::Version => "Protocol version".to_string(),
            DmarcTag::Policy => match Policy::parse(value) {
                Some(policy) => {
                    record.policy = Some(policy);
                    if policy == Policy::None {
                        issues.push(Issue::warning(
                            "Policy is \"none\": failing mail is only monitored, not blocked",
                        ));
                    }
                    policy.describe().to_string()
                }
                None => {
                    issues.push(Issue::error(format!(
                        "Invalid policy \"{}\"; expected none, quarantine or reject",
                        value
                    )));
                    "Invalid policy".to_string()
                }
            },
            DmarcTag::SubdomainPolicy => {
                record.subdomain_policy = Policy::parse(value);
                describe_policy(record.subdomain_policy)
            }
            DmarcTag::NonExistentSubdomainPolicy => {
                record.non_existent_subdomain_policy = Policy::parse(value);
                describe_policy(record.non_existent_subdomain_policy)
            }
            DmarcTag::AggregateReportUris => {
                record.rua = split_uris(value);
                format!("Aggregate reports are sent to {}", record.rua.join(", "))
            }
            DmarcTag::FailureReportUris => {
                record.ruf = split_uris(value);
                format!("Failure reports are sent to {}", record.ruf.join(", "))
            }
            DmarcTag::DkimAlignment => {
                let mode = AlignmentMode::parse(value);
                record.dkim_alignment = mode.unwrap_or(AlignmentMode::Relaxed);
                describe_alignment(mode)
            }
            DmarcTag::SpfAlignment => {
                let mode = AlignmentMode::parse(value);
                record.spf_alignment = mode.unwrap_or(AlignmentMode::Relaxed);
                describe_alignment(mode)
            }
            DmarcTag::Percent => describe_pct(value, &mut record, &mut issues),
            DmarcTag::FailureOptions => {
                record.failure_options = value
                    .split(':')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                record
                    .failure_options
                    .iter()
                    .map(|code| match FailureOption::parse(code) {
                        Some(opt) => opt.describe().to_string(),
                        None => code.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            }
            DmarcTag::ReportFormat => format!("Failure reports use the {} format", value),
            DmarcTag::ReportInterval => match value.parse::<u32>() {
                Ok(seconds) => {
                    record.report_interval = seconds;
                    describe_interval(seconds)
                }
                Err(_) => "Unrecognized interval".to_string(),
            },
            DmarcTag::Unknown => "Unknown tag".to_string(),
        };

        fields.push(DmarcField {
            tag: key.to_string(),
            name: tag.label().to_string(),
            value: value.to_string(),
            description,
        });
    }

    if !tags.contains("p") {
        issues.push(Issue::error("Missing required policy tag (p=)"));
    }
    if !tags.contains("rua") && !tags.contains("ruf") {
        issues.push(Issue::warning(
            "No reporting configured (rua/ruf); you will not receive DMARC reports",
        ));
    }

    let policy_explanation = record.policy.map(|p| p.describe().to_string());
    DmarcAnalysis { record, fields, policy_explanation, issues }
}

fn describe_interval(seconds: u32) -> String {
    let hours = seconds as f64 / 3600.0;
    let unit = if hours == 1.0 { "hour" } else { "hours" };
    format!("Aggregate reports every {} {}", hours, unit)
}

fn split_uris(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn describe_policy(policy: Option<Policy>) -> String {
    policy
        .map(|p| p.describe().to_string())
        .unwrap_or_else(|| "Unrecognized policy".to_string())
}

fn describe_alignment(mode: Option<AlignmentMode>) -> String {
    mode.map(|m| m.describe().to_string())
        .unwrap_or_else(|| "Unrecognized alignment mode".to_string())
}

fn describe_pct(value: &str, record: &mut DmarcRecord, issues: &mut Vec<Issue>) -> String {
    match value.parse::<i64>() {
        Ok(n) if (0..=100).contains(&n) => {
            record.percent = n as u8;
            if n < 100 {
                issues.push(Issue::info(format!(
                    "Policy applies to only {}% of failing mail; raise pct to 100 once reports look clean",
                    n
                )));
            }
            format!("Policy applies to {}% of failing mail", n)
        }
        Ok(n) => {
            issues.push(Issue::warning(format!("pct={} is outside the range 0-100", n)));
            "Out of range".to_string()
        }
        Err(_) => {
            issues.push(Issue::warning(format!("pct=\"{}\" is not an integer", value)));
            "Unrecognized percentage".to_string()
        }
    }
}
