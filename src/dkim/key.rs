use serde::Serialize;

use crate::common::tags::TagRecord;

/// Tags defined for DKIM key records (RFC 6376 Section 3.6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DkimTag {
    /// `v=`
    Version,
    /// `k=`
    KeyType,
    /// `p=`
    PublicKey,
    /// `s=`
    ServiceType,
    /// `t=`
    Flags,
    /// `n=`
    Notes,
    /// `h=`
    HashAlgorithms,
    Unknown,
}

impl DkimTag {
    /// Map an already-lowercased tag key.
    pub fn from_key(key: &str) -> Self {
        match key {
            "v" => DkimTag::Version,
            "k" => DkimTag::KeyType,
            "p" => DkimTag::PublicKey,
            "s" => DkimTag::ServiceType,
            "t" => DkimTag::Flags,
            "n" => DkimTag::Notes,
            "h" => DkimTag::HashAlgorithms,
            _ => DkimTag::Unknown,
        }
    }
}

/// Key type for DKIM public key records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ed25519,
    Other(String),
}

impl KeyType {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => KeyType::Rsa,
            "ed25519" => KeyType::Ed25519,
            _ => KeyType::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyType::Rsa => "rsa",
            KeyType::Ed25519 => "ed25519",
            KeyType::Other(s) => s,
        }
    }
}

/// Bytes of SubjectPublicKeyInfo/DER framing around an RSA modulus.
const RSA_DER_OVERHEAD: i64 = 38;

/// Approximate RSA modulus size from the base64 `p=` value.
///
/// Whitespace is ignored; padding characters count toward the length.
/// The result can be zero or negative for very short inputs.
pub fn estimate_rsa_bits(public_key: &str) -> i64 {
    let len = public_key.chars().filter(|c| !c.is_whitespace()).count() as i64;
    let decoded_bytes = len * 3 / 4;
    (decoded_bytes - RSA_DER_OVERHEAD) * 8
}

/// Structured view of a DKIM key record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimKeyRecord {
    pub version: Option<String>,
    /// `k=`, shown as `rsa` when absent.
    pub key_type: String,
    pub public_key: Option<String>,
    pub service_type: Option<String>,
    pub flags: Option<String>,
    pub notes: Option<String>,
    pub hash_algorithms: Vec<String>,
    /// Only computed for RSA keys.
    pub estimated_key_bits: Option<i64>,
    /// Every tag as published.
    pub tags: TagRecord,
}

impl DkimKeyRecord {
    pub fn from_tags(tags: &TagRecord) -> Self {
        let mut record = DkimKeyRecord {
            version: None,
            key_type: KeyType::Rsa.as_str().to_string(),
            public_key: None,
            service_type: None,
            flags: None,
            notes: None,
            hash_algorithms: Vec::new(),
            estimated_key_bits: None,
            tags: tags.clone(),
        };

        for (key, value) in tags.iter() {
            match DkimTag::from_key(key) {
                DkimTag::Version => record.version = Some(value.to_string()),
                DkimTag::KeyType => record.key_type = value.to_string(),
                DkimTag::PublicKey => record.public_key = Some(value.to_string()),
                DkimTag::ServiceType => record.service_type = Some(value.to_string()),
                DkimTag::Flags => record.flags = Some(value.to_string()),
                DkimTag::Notes => record.notes = Some(value.to_string()),
                DkimTag::HashAlgorithms => {
                    record.hash_algorithms = value
                        .split(':')
                        .map(|s| s.trim().to_ascii_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                DkimTag::Unknown => {}
            }
        }

        if record.key_type() == KeyType::Rsa {
            record.estimated_key_bits = record
                .public_key
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(estimate_rsa_bits);
        }
        record
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::parse(&self.key_type)
    }

    /// `p=` present but empty: the key has been revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(self.public_key.as_deref(), Some(""))
    }

    pub fn is_testing(&self) -> bool {
        self.flags
            .as_deref()
            .map(|t| t.to_ascii_lowercase().contains('y'))
            .unwrap_or(false)
    }

    pub fn is_strict(&self) -> bool {
        self.flags
            .as_deref()
            .map(|t| t.split(':').any(|f| f.trim().eq_ignore_ascii_case("s")))
            .unwrap_or(false)
    }
}
