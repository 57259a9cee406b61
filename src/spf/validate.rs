use std::net::{Ipv4Addr, Ipv6Addr};

use crate::common::issue::Issue;

use super::mechanism::{tokenize, MechanismKind, Qualifier, SpfMechanism};

/// RFC 7208 Section 4.6.4 limit on lookup-causing terms.
pub const MAX_DNS_LOOKUPS: usize = 10;
/// From here on a record is one edit away from breaking.
pub const LOOKUP_WARNING_THRESHOLD: usize = 8;

/// Outcome of validating a single SPF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfAnalysis {
    pub mechanisms: Vec<SpfMechanism>,
    pub dns_lookup_count: usize,
    pub issues: Vec<Issue>,
    pub is_valid: bool,
}

/// Check if a TXT record is an SPF record (case-insensitive v=spf1 prefix).
pub fn is_spf_record(txt: &str) -> bool {
    let lower = txt.trim().to_ascii_lowercase();
    lower == "v=spf1" || lower.starts_with("v=spf1 ")
}

/// Validate one SPF record. The record is not evaluated against any sender,
/// only checked for structure and policy strength.
pub fn validate_spf(record: &str) -> SpfAnalysis {
    let record = record.trim();
    if !is_spf_record(record) {
        return SpfAnalysis {
            mechanisms: Vec::new(),
            dns_lookup_count: 0,
            issues: vec![Issue::error("Record does not start with \"v=spf1\"")],
            is_valid: false,
        };
    }

    let mechanisms = tokenize(record);
    let mut issues = Vec::new();
    let mut is_valid = true;

    for m in &mechanisms {
        match m.kind {
            MechanismKind::Unknown => {
                issues.push(Issue::warning(format!("Unknown mechanism \"{}\"", m)));
            }
            MechanismKind::Ip4 if !is_ip4_network(&m.value) => {
                issues.push(Issue::warning(format!("Invalid IPv4 address or network \"{}\"", m.value)));
            }
            MechanismKind::Ip6 if !is_ip6_network(&m.value) => {
                issues.push(Issue::warning(format!("Invalid IPv6 address or network \"{}\"", m.value)));
            }
            _ => {}
        }
    }

    let dns_lookup_count = mechanisms.iter().filter(|m| m.kind.counts_dns_lookup()).count();
    if dns_lookup_count > MAX_DNS_LOOKUPS {
        issues.push(Issue::error(format!(
            "Record requires {} DNS lookups, which exceeds the limit of {}; evaluation will fail with permerror",
            dns_lookup_count, MAX_DNS_LOOKUPS
        )));
        is_valid = false;
    } else if dns_lookup_count >= LOOKUP_WARNING_THRESHOLD {
        issues.push(Issue::warning(format!(
            "Record requires {} DNS lookups, close to the limit of {}",
            dns_lookup_count, MAX_DNS_LOOKUPS
        )));
    }

    let all_index = mechanisms.iter().position(|m| m.kind == MechanismKind::All);
    match all_index {
        Some(i) => {
            match mechanisms[i].qualifier {
                Qualifier::Pass => {
                    issues.push(Issue::error(
                        "\"+all\" authorizes every server on the internet; SPF protection is disabled",
                    ));
                    is_valid = false;
                }
                Qualifier::SoftFail => issues.push(Issue::info(
                    "\"~all\" (softfail) marks unauthorized mail but still accepts it; \"-all\" is stricter",
                )),
                Qualifier::Neutral => issues.push(Issue::warning(
                    "\"?all\" (neutral) makes no assertion about unauthorized senders and offers no protection",
                )),
                Qualifier::Fail => {}
            }
            let trailing = mechanisms[i + 1..]
                .iter()
                .filter(|m| m.kind != MechanismKind::Exp)
                .count();
            if trailing > 0 {
                issues.push(Issue::info(format!(
                    "{} term(s) after \"all\" are never evaluated",
                    trailing
                )));
            }
        }
        None if !mechanisms.iter().any(|m| m.kind == MechanismKind::Redirect) => {
            issues.push(Issue::warning(
                "No \"all\" mechanism or redirect; end the record with \"~all\" or \"-all\"",
            ));
        }
        None => {}
    }

    if mechanisms.iter().any(|m| m.kind == MechanismKind::Ptr) {
        issues.push(Issue::warning(
            "The \"ptr\" mechanism is deprecated (RFC 7208 Section 5.5) and should not be used",
        ));
    }

    SpfAnalysis { mechanisms, dns_lookup_count, issues, is_valid }
}

fn split_prefix(value: &str) -> (&str, Option<&str>) {
    match value.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (value, None),
    }
}

fn prefix_ok(len: Option<&str>, max: u8) -> bool {
    match len {
        None => true,
        Some(s) => s.parse::<u8>().map(|n| n <= max).unwrap_or(false),
    }
}

fn is_ip4_network(value: &str) -> bool {
    let (addr, len) = split_prefix(value);
    addr.parse::<Ipv4Addr>().is_ok() && prefix_ok(len, 32)
}

fn is_ip6_network(value: &str) -> bool {
    let (addr, len) = split_prefix(value);
    addr.parse::<Ipv6Addr>().is_ok() && prefix_ok(len, 128)
}
