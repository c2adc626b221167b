use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pinning_engine::adapters::bundle::{certificates_from_pem, certificates_in_dir};
use pinning_engine::crypto::key_extractor::extract_public_key;
use pinning_engine::domain::error::EngineError;
use pinning_engine::domain::evaluator::evaluate;
use pinning_engine::domain::reachability as rc;
use pinning_engine::domain::types as dt;

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("{message}")]
    Generic { message: String },
}

impl From<EngineError> for FfiError {
    fn from(e: EngineError) -> Self {
        FfiError::Generic {
            message: e.to_string(),
        }
    }
}

// ===== FFI types mirroring the public Rust API (FFI-friendly) =====

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiPinningMode { None, PublicKey, Certificate }

impl From<FfiPinningMode> for dt::PinningMode {
    fn from(v: FfiPinningMode) -> Self {
        match v { FfiPinningMode::None => dt::PinningMode::None, FfiPinningMode::PublicKey => dt::PinningMode::PublicKey, FfiPinningMode::Certificate => dt::PinningMode::Certificate }
    }
}

impl From<dt::PinningMode> for FfiPinningMode {
    fn from(v: dt::PinningMode) -> Self {
        match v { dt::PinningMode::None => FfiPinningMode::None, dt::PinningMode::PublicKey => FfiPinningMode::PublicKey, dt::PinningMode::Certificate => FfiPinningMode::Certificate }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiPolicyConfig {
    pub mode: FfiPinningMode,
    pub allow_invalid_certificates: bool,
    pub validates_domain_name: bool,
    pub pinned_certificates: Vec<Vec<u8>>,       // raw DER blobs
    pub pinned_certificates_dir: Option<String>, // folder of .cer/.der/.crt/.pem files
    pub pinned_certificates_pem: Option<String>, // concatenated PEM text
}

impl TryFrom<FfiPolicyConfig> for dt::SecurityPolicy {
    type Error = FfiError;
    fn try_from(v: FfiPolicyConfig) -> Result<Self, Self::Error> {
        let cfg = dt::PolicyConfig {
            mode: v.mode.into(),
            allow_invalid_certificates: v.allow_invalid_certificates,
            validates_domain_name: v.validates_domain_name,
            pinned_certificates_dir: v.pinned_certificates_dir.map(PathBuf::from),
            pinned_certificates_pem: v.pinned_certificates_pem,
        };
        Ok(cfg.into_policy_with_certificates(v.pinned_certificates)?)
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiServerTrust {
    pub chain: Vec<Vec<u8>>, // DER, leaf first
    pub default_valid: bool, // platform verdict, e.g. SecTrustEvaluateWithError
}

// ===== Security policy object =====

#[derive(uniffi::Object, Debug)]
pub struct FfiSecurityPolicy {
    inner: Arc<dt::SecurityPolicy>,
}

#[uniffi::export]
impl FfiSecurityPolicy {
    #[uniffi::constructor]
    pub fn new(config: FfiPolicyConfig) -> Result<Arc<Self>, FfiError> {
        let policy: dt::SecurityPolicy = config.try_into()?;
        Ok(Arc::new(Self { inner: Arc::new(policy) }))
    }

    #[uniffi::constructor]
    pub fn default_policy() -> Arc<Self> {
        Arc::new(Self { inner: Arc::new(dt::SecurityPolicy::default_policy()) })
    }

    /// Build from a JSON `PolicyConfig` document.
    #[uniffi::constructor]
    pub fn from_json(json: String) -> Result<Arc<Self>, FfiError> {
        let policy = dt::PolicyConfig::from_json(&json)?.into_policy()?;
        Ok(Arc::new(Self { inner: Arc::new(policy) }))
    }

    pub fn mode(&self) -> FfiPinningMode {
        self.inner.mode().into()
    }

    pub fn allows_invalid_certificates(&self) -> bool {
        self.inner.allows_invalid_certificates()
    }

    pub fn validates_domain_name(&self) -> bool {
        self.inner.validates_domain_name()
    }

    pub fn pinned_certificates(&self) -> Vec<Vec<u8>> {
        self.inner.pinned_certificates().map(<[u8]>::to_vec).collect()
    }

    /// `true` to proceed with the connection. Panics are reported as rejection.
    pub fn evaluate(&self, trust: FfiServerTrust, domain: Option<String>) -> bool {
        let trust = dt::CertificateChainTrust::new(trust.chain, trust.default_valid);
        catch_unwind(AssertUnwindSafe(|| evaluate(&self.inner, &trust, domain.as_deref())))
            .unwrap_or_else(|_| {
                tracing::error!("trust evaluation panicked; rejecting");
                false
            })
    }
}

// ===== Certificate helpers =====

#[uniffi::export]
pub fn certificates_in_directory_ffi(path: String) -> Result<Vec<Vec<u8>>, FfiError> {
    certificates_in_dir(&PathBuf::from(path)).map_err(FfiError::from)
}

#[uniffi::export]
pub fn certificates_from_pem_ffi(pem: String) -> Vec<Vec<u8>> {
    certificates_from_pem(pem.as_bytes())
}

#[uniffi::export]
pub fn extract_public_key_ffi(der: Vec<u8>) -> Result<Vec<u8>, FfiError> {
    extract_public_key(&der).map(|k| k.into_vec()).map_err(FfiError::from)
}

// ===== Reachability =====

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiReachabilityStatus { Unknown, NotReachable, ReachableViaCellular, ReachableViaWiFi }

impl From<rc::ReachabilityStatus> for FfiReachabilityStatus {
    fn from(v: rc::ReachabilityStatus) -> Self {
        match v { rc::ReachabilityStatus::Unknown => FfiReachabilityStatus::Unknown, rc::ReachabilityStatus::NotReachable => FfiReachabilityStatus::NotReachable, rc::ReachabilityStatus::ReachableViaCellular => FfiReachabilityStatus::ReachableViaCellular, rc::ReachabilityStatus::ReachableViaWiFi => FfiReachabilityStatus::ReachableViaWiFi }
    }
}

#[derive(uniffi::Record, Debug, Clone, Copy)]
pub struct FfiReachabilityFlags {
    pub reachable: bool,
    pub connection_required: bool,
    pub connection_on_traffic: bool,
    pub connection_on_demand: bool,
    pub intervention_required: bool,
    pub is_cellular: bool,
}

impl From<FfiReachabilityFlags> for rc::ReachabilityFlags {
    fn from(v: FfiReachabilityFlags) -> Self {
        rc::ReachabilityFlags {
            reachable: v.reachable,
            connection_required: v.connection_required,
            connection_on_traffic: v.connection_on_traffic,
            connection_on_demand: v.connection_on_demand,
            intervention_required: v.intervention_required,
            is_cellular: v.is_cellular,
        }
    }
}

#[uniffi::export]
pub fn reachability_status_for_flags(flags: FfiReachabilityFlags) -> FfiReachabilityStatus {
    rc::ReachabilityStatus::from_flags(flags.into()).into()
}

#[uniffi::export(callback_interface)]
pub trait FfiReachabilityListener: Send + Sync {
    fn on_status_change(&self, status: FfiReachabilityStatus);
}

/// Flags last reported by the host's OS observer.
#[derive(Default)]
struct HostReportedFlags(Mutex<Option<rc::ReachabilityFlags>>);

impl HostReportedFlags {
    fn store(&self, flags: rc::ReachabilityFlags) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = Some(flags);
    }
}

impl rc::ReachabilitySource for HostReportedFlags {
    fn current_flags(&self) -> Option<rc::ReachabilityFlags> {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Reachability relay driven by the host: it forwards OS flag changes through
/// `report_flags` and receives transitions on its listener.
#[derive(uniffi::Object, Debug)]
pub struct FfiReachabilityMonitor {
    flags: Arc<HostReportedFlags>,
    inner: rc::ReachabilityMonitor,
}

impl std::fmt::Debug for HostReportedFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostReportedFlags").finish_non_exhaustive()
    }
}

#[uniffi::export]
impl FfiReachabilityMonitor {
    #[uniffi::constructor]
    pub fn new() -> Arc<Self> {
        let flags = Arc::new(HostReportedFlags::default());
        let inner = rc::ReachabilityMonitor::new(flags.clone());
        Arc::new(Self { flags, inner })
    }

    pub fn set_listener(&self, listener: Box<dyn FfiReachabilityListener>) {
        let listener: Arc<dyn FfiReachabilityListener> = Arc::from(listener);
        let callback: rc::StatusCallback = Arc::new(move |status: rc::ReachabilityStatus| listener.on_status_change(status.into()));
        self.inner.set_status_change_callback(Some(callback));
    }

    pub fn clear_listener(&self) {
        self.inner.set_status_change_callback(None);
    }

    pub fn start(&self) {
        self.inner.start();
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn status(&self) -> FfiReachabilityStatus {
        self.inner.status().into()
    }

    pub fn report_flags(&self, flags: FfiReachabilityFlags) {
        let flags: rc::ReachabilityFlags = flags.into();
        self.flags.store(flags);
        self.inner.handle_flags(flags);
    }
}

uniffi::setup_scaffolding!();
