use base64::Engine;

use crate::common::issue::Issue;
use crate::common::tags::TagRecord;

use super::key::{DkimKeyRecord, DkimTag, KeyType};

/// Below this the key is effectively shorter than 1024 bits.
const MIN_ACCEPTABLE_BITS: i64 = 900;
/// From here on the key is roughly 2048 bits or more.
const RECOMMENDED_BITS: i64 = 1800;

/// Parsed key record plus findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimAnalysis {
    pub parsed: DkimKeyRecord,
    pub issues: Vec<Issue>,
}

/// Validate a DKIM key record (the TXT string published at
/// `<selector>._domainkey.<domain>`).
pub fn validate_dkim(record: &str) -> DkimAnalysis {
    let (tags, mut issues) = TagRecord::parse(record);
    let parsed = DkimKeyRecord::from_tags(&tags);

    for (key, value) in tags.iter() {
        match DkimTag::from_key(key) {
            DkimTag::Version if value != "DKIM1" => {
                issues.push(Issue::error(format!("Invalid version \"{}\", expected \"DKIM1\"", value)));
            }
            DkimTag::Unknown => {
                issues.push(Issue::info(format!("Unknown tag \"{}\"", key)));
            }
            _ => {}
        }
    }

    check_public_key(&parsed, &mut issues);
    check_key_type(&parsed, &tags, &mut issues);

    if let Some(services) = parsed.service_type.as_deref() {
        let email_ok = services
            .split(':')
            .map(str::trim)
            .any(|s| s.eq_ignore_ascii_case("email") || s == "*");
        if !email_ok {
            issues.push(Issue::warning(format!(
                "Service type \"{}\" does not include email; receivers may ignore this key",
                services
            )));
        }
    }

    if parsed.is_testing() {
        issues.push(Issue::warning(
            "Testing mode is enabled (t=y); receivers may treat signatures as unsigned",
        ));
    }
    if parsed.is_strict() {
        issues.push(Issue::info(
            "Strict mode (t=s): the i= domain of signatures must exactly match d=",
        ));
    }

    if tags.contains("h") {
        let has = |alg: &str| parsed.hash_algorithms.iter().any(|h| h == alg);
        if has("sha1") && !has("sha256") {
            issues.push(Issue::warning(
                "Hash algorithms allow sha1 but not sha256; sha1 is deprecated (RFC 8301)",
            ));
        }
    }

    DkimAnalysis { parsed, issues }
}

fn check_public_key(parsed: &DkimKeyRecord, issues: &mut Vec<Issue>) {
    let Some(p) = parsed.public_key.as_deref() else {
        issues.push(Issue::error("Public key (p=) is missing; the record is incomplete"));
        return;
    };
    if p.is_empty() {
        issues.push(Issue::error("Public key (p=) is empty; the key has been revoked"));
        return;
    }

    let cleaned: String = p.chars().filter(|c| !c.is_whitespace()).collect();
    if base64::engine::general_purpose::STANDARD.decode(&cleaned).is_err() {
        issues.push(Issue::error("Public key (p=) is not valid base64"));
        return;
    }

    let Some(bits) = parsed.estimated_key_bits else {
        return;
    };
    if bits <= 0 {
        issues.push(Issue::error("Public key is too short to be a usable RSA key"));
    } else if bits < MIN_ACCEPTABLE_BITS {
        issues.push(Issue::error(format!(
            "Key size is approximately {} bits, below the 1024-bit minimum; receivers will reject signatures",
            bits
        )));
    } else if bits < RECOMMENDED_BITS {
        issues.push(Issue::warning(format!(
            "Key size is approximately {} bits (1024-bit class); 2048 bits is recommended",
            bits
        )));
    } else {
        issues.push(Issue::info(format!(
            "Key size is approximately {} bits, meeting current recommendations",
            bits
        )));
    }
}

fn check_key_type(parsed: &DkimKeyRecord, tags: &TagRecord, issues: &mut Vec<Issue>) {
    if !tags.contains("k") {
        return;
    }
    match parsed.key_type() {
        KeyType::Rsa => {}
        KeyType::Ed25519 => issues.push(Issue::info(
            "Ed25519 key (RFC 8463): modern, but not every receiver can verify it yet",
        )),
        KeyType::Other(k) => issues.push(Issue::warning(format!("Unusual key type \"{}\"", k))),
    }
}
