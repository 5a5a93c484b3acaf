// tests/common/mod.rs
pub use axum::{Router, body::Body};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use async_trait::async_trait;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::credential::Credential;
use crate::errors::{ConnectorError, Result};
use crate::helpers::time::now_i64;
use crate::instance::{InstanceDirectory, InstanceIdentifier, InstanceMetadata, IpType};
use crate::sources::CredentialSource;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Credential source counting round-trips. Tokens are `{prefix}-{n}`.
#[derive(Debug)]
pub struct FakeCredentialSource {
    prefix: String,
    lifetime_seconds: i64,
    issued: AtomicUsize,
    pub discover_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub failing: AtomicBool,
    pub last_scopes: Mutex<Vec<String>>,
}

impl FakeCredentialSource {
    pub fn new(prefix: &str) -> Arc<Self> {
        Self::with_lifetime(prefix, 3600)
    }

    pub fn with_lifetime(prefix: &str, lifetime_seconds: i64) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_owned(),
            lifetime_seconds,
            issued: AtomicUsize::new(0),
            discover_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            last_scopes: Mutex::new(Vec::new()),
        })
    }

    pub fn discovers(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn issue(&self, scopes: &[String]) -> Result<Credential> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConnectorError::auth("no ambient identity configured"));
        }
        *self.last_scopes.lock().unwrap() = scopes.to_vec();
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(
            format!("{}-{}", self.prefix, n),
            Some(now_i64() + self.lifetime_seconds),
            scopes.to_vec(),
        ))
    }
}

#[async_trait]
impl CredentialSource for FakeCredentialSource {
    async fn discover_default(&self, scopes: &[String]) -> Result<Credential> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        self.issue(scopes)
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.issue(&credential.scopes)
    }
}

/// Instance directory serving a canned snapshot or error.
#[derive(Debug)]
pub struct FakeDirectory {
    result: std::result::Result<InstanceMetadata, String>,
    pub calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_public(ip: &str) -> Arc<Self> {
        Self::with_metadata(InstanceMetadata::default().with_address(IpType::Public, ip))
    }

    pub fn with_metadata(metadata: InstanceMetadata) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(metadata),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(reason.to_owned()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceDirectory for FakeDirectory {
    async fn fetch_metadata(&self, id: &InstanceIdentifier) -> Result<InstanceMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map_err(|reason| ConnectorError::metadata(id, reason))
    }
}
