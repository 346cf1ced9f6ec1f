//! Trust anchors used for chain verification.
//!
//! The default store is the host system's root pool. Extra anchors can be
//! loaded from PEM files, which is how private CAs and test fixtures are
//! trusted.

use crate::error::ExpiringCertsError;
use crate::pem_support::load_certificates_from_file;
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::path::Path;

/// Builder for the root certificate store handed to the verifier.
///
/// # Example
///
/// ```no_run
/// use expiring_certs::CustomRootStoreBuilder;
///
/// let store = CustomRootStoreBuilder::new()
///     .with_system_roots()
///     .add_pem_file("/etc/ssl/private-ca.pem")
///     .unwrap()
///     .build();
/// ```
pub struct CustomRootStoreBuilder {
    store: RootCertStore,
    include_webpki_roots: bool,
}

impl CustomRootStoreBuilder {
    /// Start from an empty store.
    pub fn new() -> Self {
        CustomRootStoreBuilder {
            store: RootCertStore::empty(),
            include_webpki_roots: false,
        }
    }

    /// Add the host system's trusted roots.
    ///
    /// If the system pool cannot be loaded the store is left as it is and a
    /// warning is logged. Verification against an empty store fails for
    /// every chain, so those certificates end up in the report.
    pub fn with_system_roots(mut self) -> Self {
        match rustls_native_certs::load_native_certs() {
            Ok(certs) => {
                let (added, ignored) = self.store.add_parsable_certificates(certs);
                tracing::debug!(added, ignored, "loaded system root certificates");
            }
            Err(e) => {
                tracing::warn!("System root certificates unavailable, continuing without them: {}", e);
            }
        }
        self
    }

    /// Include the Mozilla root bundle shipped with `webpki-roots`.
    pub fn with_webpki_roots(mut self) -> Self {
        self.include_webpki_roots = true;
        self
    }

    /// Add every certificate of a PEM file as a trust anchor.
    pub fn add_pem_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ExpiringCertsError> {
        let path = path.as_ref();
        for cert in load_certificates_from_file(path)? {
            self.store.add(cert).map_err(|e| {
                ExpiringCertsError::PoolAppendError(format!("{}: {}", path.display(), e))
            })?;
        }
        tracing::debug!(path = %path.display(), "added trust anchors");
        Ok(self)
    }

    /// Add one DER encoded trust anchor.
    pub fn add_der(mut self, der: CertificateDer<'static>) -> Result<Self, ExpiringCertsError> {
        self.store
            .add(der)
            .map_err(|e| ExpiringCertsError::PoolAppendError(e.to_string()))?;
        Ok(self)
    }

    /// Build the final root certificate store.
    pub fn build(mut self) -> RootCertStore {
        if self.include_webpki_roots {
            self.store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
        self.store
    }

    /// Number of anchors added so far, not counting `webpki-roots`.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for CustomRootStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
