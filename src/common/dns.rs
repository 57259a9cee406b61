use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, TokioResolver};
use thiserror::Error;
use tracing::debug;

use crate::config::DnsSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("name does not exist (NXDOMAIN)")]
    NxDomain,
    #[error("no records of the requested type")]
    NoRecords,
    #[error("query timed out")]
    Timeout,
    #[error("server failure (SERVFAIL)")]
    ServFail,
    #[error("resolver error: {0}")]
    Other(String),
}

impl DnsError {
    /// NXDOMAIN and NODATA mean "nothing published", everything else is
    /// resolver trouble.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DnsError::NxDomain | DnsError::NoRecords)
    }
}

/// Map a not-found outcome to an empty answer set, keeping real failures.
pub fn found_or_empty(result: Result<Vec<String>, DnsError>) -> Result<Vec<String>, DnsError> {
    match result {
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

/// The two record types the checks need.
pub trait DnsResolver: Clone + Send + Sync + 'static {
    /// TXT answers, each one reassembled from its character-string chunks.
    fn query_txt(&self, name: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
    /// CNAME targets without the trailing dot.
    fn query_cname(&self, name: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// Run `fut`, turning an elapsed deadline into `DnsError::Timeout`.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, DnsError>
where
    F: Future<Output = Result<T, DnsError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DnsError::Timeout),
    }
}

/// `DnsResolver` over hickory's tokio resolver, with a hard per-query deadline.
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
    timeout: Duration,
}

impl HickoryResolver {
    /// Build from settings; an empty nameserver list means the system
    /// resolver configuration.
    pub fn from_settings(settings: &DnsSettings) -> Result<Self, DnsError> {
        let timeout = settings.timeout();
        let (config, mut opts) = if settings.nameservers.is_empty() {
            hickory_resolver::system_conf::read_system_conf()
                .map_err(|e| DnsError::Other(format!("failed to read system resolver config: {}", e)))?
        } else {
            let group = NameServerConfigGroup::from_ips_clear(&settings.nameservers, 53, true);
            (ResolverConfig::from_parts(None, vec![], group), ResolverOpts::default())
        };
        opts.timeout = timeout;
        opts.attempts = settings.attempts;
        Ok(Self::with_config(config, opts, timeout))
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts, timeout: Duration) -> Self {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver, timeout }
    }

    /// Map on the error kind. hickory folds every negative rcode into
    /// `NoRecordsFound`, so only NXDOMAIN and NOERROR count as "nothing published".
    fn classify_error(e: &ResolveError) -> DnsError {
        let Some(proto) = e.proto() else {
            return DnsError::Other(e.to_string());
        };
        match proto.kind() {
            ProtoErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
                ResponseCode::NXDomain => DnsError::NxDomain,
                ResponseCode::NoError => DnsError::NoRecords,
                ResponseCode::ServFail => DnsError::ServFail,
                other => DnsError::Other(format!("{} response", other)),
            },
            ProtoErrorKind::Timeout => DnsError::Timeout,
            _ => DnsError::Other(e.to_string()),
        }
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        debug!(name, "TXT query");
        bounded(self.timeout, async {
            match self.resolver.txt_lookup(name).await {
                Ok(lookup) => Ok(lookup
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|chunk| String::from_utf8_lossy(chunk))
                            .collect::<String>()
                    })
                    .collect()),
                Err(e) => Err(Self::classify_error(&e)),
            }
        })
        .await
    }

    async fn query_cname(&self, name: &str) -> Result<Vec<String>, DnsError> {
        debug!(name, "CNAME query");
        bounded(self.timeout, async {
            match self.resolver.lookup(name, RecordType::CNAME).await {
                Ok(lookup) => Ok(lookup
                    .iter()
                    .filter_map(|rdata| match rdata {
                        RData::CNAME(cname) => {
                            Some(cname.0.to_utf8().trim_end_matches('.').to_string())
                        }
                        _ => None,
                    })
                    .collect()),
                Err(e) => Err(Self::classify_error(&e)),
            }
        })
        .await
    }
}

/// In-memory resolver. Names without an entry answer NXDOMAIN.
#[derive(Clone, Default)]
pub struct MockResolver {
    txt_records: Arc<Mutex<HashMap<String, Result<Vec<String>, DnsError>>>>,
    cname_records: Arc<Mutex<HashMap<String, Result<Vec<String>, DnsError>>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, name: &str, records: Vec<String>) {
        Self::put(&self.txt_records, name, Ok(records));
    }

    pub fn add_txt_err(&self, name: &str, err: DnsError) {
        Self::put(&self.txt_records, name, Err(err));
    }

    pub fn add_cname(&self, name: &str, target: &str) {
        Self::put(&self.cname_records, name, Ok(vec![target.to_string()]));
    }

    pub fn add_cname_err(&self, name: &str, err: DnsError) {
        Self::put(&self.cname_records, name, Err(err));
    }

    fn put(
        map: &Mutex<HashMap<String, Result<Vec<String>, DnsError>>>,
        name: &str,
        value: Result<Vec<String>, DnsError>,
    ) {
        if let Ok(mut guard) = map.lock() {
            guard.insert(name.to_lowercase(), value);
        }
    }

    fn get(
        map: &Mutex<HashMap<String, Result<Vec<String>, DnsError>>>,
        name: &str,
    ) -> Result<Vec<String>, DnsError> {
        match map.lock() {
            Ok(guard) => guard
                .get(&name.to_lowercase())
                .cloned()
                .unwrap_or(Err(DnsError::NxDomain)),
            Err(_) => Err(DnsError::Other("mock resolver poisoned".into())),
        }
    }
}

impl DnsResolver for MockResolver {
    async fn query_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        Self::get(&self.txt_records, name)
    }

    async fn query_cname(&self, name: &str) -> Result<Vec<String>, DnsError> {
        Self::get(&self.cname_records, name)
    }
}
