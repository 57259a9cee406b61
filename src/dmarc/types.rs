use serde::Serialize;

/// Requested handling of mail that fails DMARC (`p=`, `sp=`, `np=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Reports only.
    None,
    Quarantine,
    Reject,
}

impl Policy {
    pub fn parse(value: &str) -> Option<Self> {
        [Policy::None, Policy::Quarantine, Policy::Reject]
            .into_iter()
            .find(|p| value.trim().eq_ignore_ascii_case(p.as_str()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Policy::None => "none",
            Policy::Quarantine => "quarantine",
            Policy::Reject => "reject",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Policy::None => "Monitor only: no action is taken on mail that fails DMARC",
            Policy::Quarantine => "Mail that fails DMARC is treated as suspicious, typically delivered to spam",
            Policy::Reject => "Mail that fails DMARC is rejected outright",
        }
    }
}

/// Identifier alignment (`adkim=`, `aspf=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    Relaxed,
    Strict,
}

impl AlignmentMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "r" | "R" => Some(AlignmentMode::Relaxed),
            "s" | "S" => Some(AlignmentMode::Strict),
            _ => Option::None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            AlignmentMode::Relaxed => "Relaxed: organizational domains must match",
            AlignmentMode::Strict => "Strict: domains must match exactly",
        }
    }
}

/// One code of the colon-separated `fo=` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOption {
    Zero,
    One,
    /// `d`
    D,
    /// `s`
    S,
}

impl FailureOption {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(FailureOption::Zero),
            "1" => Some(FailureOption::One),
            "d" | "D" => Some(FailureOption::D),
            "s" | "S" => Some(FailureOption::S),
            _ => Option::None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            FailureOption::Zero => "report when all mechanisms fail",
            FailureOption::One => "report when any mechanism fails",
            FailureOption::D => "report when DKIM fails",
            FailureOption::S => "report when SPF fails",
        }
    }
}

/// Tags defined for DMARC records (RFC 7489 Section 6.3, RFC 9091).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmarcTag {
    Version,
    Policy,
    SubdomainPolicy,
    NonExistentSubdomainPolicy,
    AggregateReportUris,
    FailureReportUris,
    DkimAlignment,
    SpfAlignment,
    Percent,
    FailureOptions,
    ReportFormat,
    ReportInterval,
    Unknown,
}

impl DmarcTag {
    /// Map an already-lowercased tag key.
    pub fn from_key(key: &str) -> Self {
        match key {
            "v" => DmarcTag::Version,
            "p" => DmarcTag::Policy,
            "sp" => DmarcTag::SubdomainPolicy,
            "np" => DmarcTag::NonExistentSubdomainPolicy,
            "rua" => DmarcTag::AggregateReportUris,
            "ruf" => DmarcTag::FailureReportUris,
            "adkim" => DmarcTag::DkimAlignment,
            "aspf" => DmarcTag::SpfAlignment,
            "pct" => DmarcTag::Percent,
            "fo" => DmarcTag::FailureOptions,
            "rf" => DmarcTag::ReportFormat,
            "ri" => DmarcTag::ReportInterval,
            _ => DmarcTag::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DmarcTag::Version => "Version",
            DmarcTag::Policy => "Policy",
            DmarcTag::SubdomainPolicy => "Subdomain policy",
            DmarcTag::NonExistentSubdomainPolicy => "Non-existent subdomain policy",
            DmarcTag::AggregateReportUris => "Aggregate reports",
            DmarcTag::FailureReportUris => "Failure reports",
            DmarcTag::DkimAlignment => "DKIM alignment",
            DmarcTag::SpfAlignment => "SPF alignment",
            DmarcTag::Percent => "Percentage",
            DmarcTag::FailureOptions => "Failure reporting options",
            DmarcTag::ReportFormat => "Failure report format",
            DmarcTag::ReportInterval => "Aggregate report interval",
            DmarcTag::Unknown => "Unknown tag",
        }
    }
}

/// Parsed DMARC record. Lenient: unparseable values are left unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmarcRecord {
    /// `p=`, unset when missing or unrecognized.
    pub policy: Option<Policy>,
    /// `sp=`
    pub subdomain_policy: Option<Policy>,
    /// `np=` (RFC 9091)
    pub non_existent_subdomain_policy: Option<Policy>,
    pub dkim_alignment: AlignmentMode,
    pub spf_alignment: AlignmentMode,
    /// `pct=`, kept at 100 unless a valid value in 0-100 is published.
    pub percent: u8,
    /// `fo=` codes as published, unknown ones included.
    pub failure_options: Vec<String>,
    /// `ri=` in seconds.
    pub report_interval: u32,
    pub rua: Vec<String>,
    pub ruf: Vec<String>,
}

impl Default for DmarcRecord {
    fn default() -> Self {
        Self {
            policy: Option::None,
            subdomain_policy: Option::None,
            non_existent_subdomain_policy: Option::None,
            dkim_alignment: AlignmentMode::Relaxed,
            spf_alignment: AlignmentMode::Relaxed,
            percent: 100,
            failure_options: Vec::new(),
            report_interval: 86400,
            rua: Vec::new(),
            ruf: Vec::new(),
        }
    }
}

/// One published tag with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmarcField {
    pub tag: String,
    pub name: String,
    pub value: String,
    pub description: String,
}
