use thiserror::Error;

/// Rejected caller input. Raised before any DNS work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
    #[error("invalid DKIM selector: {0}")]
    InvalidSelector(String),
}

/// Normalize a domain: lowercase + strip trailing dot + trim.
pub fn normalize(domain: &str) -> String {
    let d = domain.trim().to_ascii_lowercase();
    d.strip_suffix('.').unwrap_or(&d).to_string()
}

/// `_dmarc.<domain>`
pub fn dmarc_hostname(domain: &str) -> String {
    format!("_dmarc.{}", normalize(domain))
}

/// `<selector>._domainkey.<domain>`
pub fn dkim_hostname(selector: &str, domain: &str) -> String {
    format!("{}._domainkey.{}", selector.trim(), normalize(domain))
}

/// Check hostname syntax and return the normalized form.
///
/// Labels are 1-63 chars of alphanumerics, `-` and `_` (underscore labels
/// such as `_spf` are common in mail setups), no leading or trailing `-`,
/// at least two labels, 253 chars overall.
pub fn validate_domain(input: &str) -> Result<String, InputError> {
    let domain = normalize(input);
    let invalid = || InputError::InvalidDomain(input.trim().to_string());

    if domain.is_empty() || domain.len() > 253 {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid());
    }
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return Err(invalid());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid());
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(invalid());
        }
    }
    Ok(domain)
}

/// Selectors: alphanumerics plus `.`, `_` and `-`.
pub fn validate_selector(input: &str) -> Result<String, InputError> {
    let selector = input.trim();
    let ok = !selector.is_empty()
        && selector.len() <= 253
        && !selector.starts_with('.')
        && !selector.ends_with('.')
        && selector
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(selector.to_string())
    } else {
        Err(InputError::InvalidSelector(selector.to_string()))
    }
}
