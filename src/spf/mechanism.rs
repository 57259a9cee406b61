//! SPF term tokenizer (RFC 7208 Section 4.6).

use std::fmt;

use serde::{Serialize, Serializer};

/// Qualifier prefix on a directive. Defaults to Pass if omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Pass,     // +
    Fail,     // -
    SoftFail, // ~
    Neutral,  // ?
}

impl Qualifier {
    /// Parse a single-char qualifier prefix. Returns (Qualifier, remaining str).
    /// If no qualifier prefix, defaults to Pass.
    pub fn parse_prefix(s: &str) -> (Qualifier, &str) {
        match s.as_bytes().first() {
            Some(b'+') => (Qualifier::Pass, &s[1..]),
            Some(b'-') => (Qualifier::Fail, &s[1..]),
            Some(b'~') => (Qualifier::SoftFail, &s[1..]),
            Some(b'?') => (Qualifier::Neutral, &s[1..]),
            _ => (Qualifier::Pass, s),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Pass => write!(f, "+"),
            Qualifier::Fail => write!(f, "-"),
            Qualifier::SoftFail => write!(f, "~"),
            Qualifier::Neutral => write!(f, "?"),
        }
    }
}

impl Serialize for Qualifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mechanism or modifier name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MechanismKind {
    Ip4,
    Ip6,
    Include,
    Redirect,
    Exists,
    Exp,
    A,
    Mx,
    Ptr,
    All,
    Unknown,
}

impl MechanismKind {
    /// Terms that cost a DNS lookup during evaluation (RFC 7208 Section 4.6.4).
    pub fn counts_dns_lookup(self) -> bool {
        matches!(
            self,
            MechanismKind::Include
                | MechanismKind::Redirect
                | MechanismKind::Exists
                | MechanismKind::A
                | MechanismKind::Mx
                | MechanismKind::Ptr
        )
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MechanismKind::Ip4 => "ip4",
            MechanismKind::Ip6 => "ip6",
            MechanismKind::Include => "include",
            MechanismKind::Redirect => "redirect",
            MechanismKind::Exists => "exists",
            MechanismKind::Exp => "exp",
            MechanismKind::A => "a",
            MechanismKind::Mx => "mx",
            MechanismKind::Ptr => "ptr",
            MechanismKind::All => "all",
            MechanismKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One whitespace-separated term of an SPF record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpfMechanism {
    pub qualifier: Qualifier,
    #[serde(rename = "type")]
    pub kind: MechanismKind,
    pub value: String,
}

/// Fixed `prefix -> kind` table; the value is whatever follows the prefix.
const PREFIXES: &[(&str, MechanismKind)] = &[
    ("ip4:", MechanismKind::Ip4),
    ("ip6:", MechanismKind::Ip6),
    ("include:", MechanismKind::Include),
    ("redirect=", MechanismKind::Redirect),
    ("exists:", MechanismKind::Exists),
    ("exp=", MechanismKind::Exp),
    ("a:", MechanismKind::A),
    ("a/", MechanismKind::A),
    ("mx:", MechanismKind::Mx),
    ("mx/", MechanismKind::Mx),
    ("ptr:", MechanismKind::Ptr),
];

impl SpfMechanism {
    /// Classify a term. Never fails: unrecognized terms come back as
    /// `MechanismKind::Unknown` with the term (minus qualifier) as value.
    pub fn parse(term: &str) -> Self {
        let (qualifier, rest) = Qualifier::parse_prefix(term);
        let lower = rest.to_ascii_lowercase();

        let bare = match lower.as_str() {
            "all" => Some(MechanismKind::All),
            "a" => Some(MechanismKind::A),
            "mx" => Some(MechanismKind::Mx),
            "ptr" => Some(MechanismKind::Ptr),
            _ => None,
        };
        if let Some(kind) = bare {
            return SpfMechanism { qualifier, kind, value: String::new() };
        }

        for (prefix, kind) in PREFIXES {
            if lower.starts_with(prefix) {
                // "a/24" keeps the slash so the CIDR stays readable.
                let skip = if prefix.ends_with('/') { prefix.len() - 1 } else { prefix.len() };
                return SpfMechanism { qualifier, kind: *kind, value: rest[skip..].to_string() };
            }
        }

        SpfMechanism { qualifier, kind: MechanismKind::Unknown, value: rest.to_string() }
    }
}

impl fmt::Display for SpfMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == MechanismKind::Unknown {
            return write!(f, "{}{}", self.qualifier, self.value);
        }
        write!(f, "{}{}", self.qualifier, self.kind)?;
        match self.kind {
            _ if self.value.is_empty() => Ok(()),
            MechanismKind::Redirect | MechanismKind::Exp => write!(f, "={}", self.value),
            _ if self.value.starts_with('/') => write!(f, "{}", self.value),
            _ => write!(f, ":{}", self.value),
        }
    }
}

/// Split an SPF body into terms, skipping the leading `v=spf1`.
pub fn tokenize(record: &str) -> Vec<SpfMechanism> {
    record
        .split_whitespace()
        .skip(1)
        .map(SpfMechanism::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mech(term: &str) -> (Qualifier, MechanismKind, String) {
        let m = SpfMechanism::parse(term);
        (m.qualifier, m.kind, m.value)
    }

    #[test]
    fn qualifiers() {
        assert_eq!(mech("all").0, Qualifier::Pass);
        assert_eq!(mech("+all").0, Qualifier::Pass);
        assert_eq!(mech("-all").0, Qualifier::Fail);
        assert_eq!(mech("~all").0, Qualifier::SoftFail);
        assert_eq!(mech("?all").0, Qualifier::Neutral);
    }

    #[test]
    fn prefixed_mechanisms() {
        assert_eq!(mech("ip4:192.0.2.0/24"), (Qualifier::Pass, MechanismKind::Ip4, "192.0.2.0/24".into()));
        assert_eq!(mech("ip6:2001:db8::/32"), (Qualifier::Pass, MechanismKind::Ip6, "2001:db8::/32".into()));
        assert_eq!(mech("include:_spf.google.com"), (Qualifier::Pass, MechanismKind::Include, "_spf.google.com".into()));
        assert_eq!(mech("redirect=_spf.example.com"), (Qualifier::Pass, MechanismKind::Redirect, "_spf.example.com".into()));
        assert_eq!(mech("-exists:%{i}.bl.example"), (Qualifier::Fail, MechanismKind::Exists, "%{i}.bl.example".into()));
        assert_eq!(mech("exp=explain.example.com"), (Qualifier::Pass, MechanismKind::Exp, "explain.example.com".into()));
    }

    #[test]
    fn a_and_mx_forms() {
        assert_eq!(mech("a"), (Qualifier::Pass, MechanismKind::A, String::new()));
        assert_eq!(mech("a:mail.example.com"), (Qualifier::Pass, MechanismKind::A, "mail.example.com".into()));
        assert_eq!(mech("a/24"), (Qualifier::Pass, MechanismKind::A, "/24".into()));
        assert_eq!(mech("?mx"), (Qualifier::Neutral, MechanismKind::Mx, String::new()));
        assert_eq!(mech("mx:example.org/28"), (Qualifier::Pass, MechanismKind::Mx, "example.org/28".into()));
        assert_eq!(mech("mx//64"), (Qualifier::Pass, MechanismKind::Mx, "//64".into()));
    }

    #[test]
    fn ptr_forms() {
        assert_eq!(mech("ptr"), (Qualifier::Pass, MechanismKind::Ptr, String::new()));
        assert_eq!(mech("-ptr:example.com"), (Qualifier::Fail, MechanismKind::Ptr, "example.com".into()));
    }

    #[test]
    fn case_insensitive_names() {
        assert_eq!(mech("INCLUDE:Example.COM"), (Qualifier::Pass, MechanismKind::Include, "Example.COM".into()));
        assert_eq!(mech("-ALL").1, MechanismKind::All);
    }

    #[test]
    fn unknown_terms() {
        assert_eq!(mech("allx"), (Qualifier::Pass, MechanismKind::Unknown, "allx".into()));
        assert_eq!(mech("~foo:bar"), (Qualifier::SoftFail, MechanismKind::Unknown, "foo:bar".into()));
        assert_eq!(mech("ip4"), (Qualifier::Pass, MechanismKind::Unknown, "ip4".into()));
    }

    #[test]
    fn tokenize_preserves_order() {
        let mechs = tokenize("v=spf1 ip4:192.0.2.1  include:a.example   mx -all");
        let kinds: Vec<MechanismKind> = mechs.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MechanismKind::Ip4, MechanismKind::Include, MechanismKind::Mx, MechanismKind::All]
        );
    }

    #[test]
    fn display_round_trips_common_terms() {
        for term in ["-all", "+include:a.example", "+a", "+a/24", "~mx:b.example", "+redirect=c.example"] {
            assert_eq!(SpfMechanism::parse(term).to_string(), term);
        }
    }

    #[test]
    fn serializes_with_type_field() {
        let json = serde_json::to_value(SpfMechanism::parse("~all")).unwrap();
        assert_eq!(json, serde_json::json!({"qualifier": "~", "type": "all", "value": ""}));
    }

    #[test]
    fn lookup_cost() {
        assert!(MechanismKind::Include.counts_dns_lookup());
        assert!(MechanismKind::Ptr.counts_dns_lookup());
        assert!(!MechanismKind::Ip4.counts_dns_lookup());
        assert!(!MechanismKind::All.counts_dns_lookup());
        assert!(!MechanismKind::Exp.counts_dns_lookup());
    }
}
