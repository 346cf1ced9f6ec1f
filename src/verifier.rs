//! Classification of certificates as expiring at a reference time.
//!
//! [`ChainVerifier::verify`] builds a trust path from the leaf through the
//! supplied chain material to one of the configured trust anchors, with the
//! reference time standing in for "now". Any failure counts as expiring,
//! whatever the cause: an ended validity window, an unknown issuer or a
//! broken chain all look the same in the report. The cause is kept as text.

use crate::certificate::{Certificate, CertificateChain};
use crate::error::ExpiringCertsError;
use crate::report::ExpiringCert;
use chrono::{DateTime, Utc};
use rustls::client::verify_server_cert_signed_by_trust_anchor;
use rustls::crypto::{ring, WebPkiSupportedAlgorithms};
use rustls::pki_types::UnixTime;
use rustls::server::ParsedCertificate;
use rustls::RootCertStore;
use std::time::Duration;

/// How a chain is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Full path building against the trust anchors.
    Chain,
    /// Only compare the not-after dates of the presented certificates with
    /// the reference time.
    NotAfter,
}

pub struct ChainVerifier {
    roots: RootCertStore,
    algorithms: WebPkiSupportedAlgorithms,
}

impl ChainVerifier {
    pub fn new(roots: RootCertStore) -> Self {
        ChainVerifier {
            roots,
            algorithms: ring::default_provider().signature_verification_algorithms,
        }
    }

    /// Verify the chain as if the current time were `at`.
    ///
    /// Hostnames are not checked. Every failure is returned as
    /// [`ExpiringCertsError::VerificationError`].
    pub fn verify(&self, chain: &CertificateChain, at: DateTime<Utc>) -> Result<(), ExpiringCertsError> {
        let failed = |cause: rustls::Error| ExpiringCertsError::VerificationError {
            domains: chain.leaf.dns_names.clone(),
            cause: cause.to_string(),
        };

        let leaf = ParsedCertificate::try_from(chain.leaf.der()).map_err(failed)?;
        verify_server_cert_signed_by_trust_anchor(
            &leaf,
            &self.roots,
            &chain.intermediates,
            unix_time(at),
            self.algorithms.all,
        )
        .map_err(failed)
    }

    /// Records for the chains that fail at `at`, in input order.
    ///
    /// In [`VerifyMode::Chain`] a failing chain yields one record for its
    /// leaf. In [`VerifyMode::NotAfter`] every presented certificate whose
    /// not-after lies before `at` yields its own record, intermediates
    /// included.
    pub fn filter_expiring(
        &self,
        chains: &[CertificateChain],
        at: DateTime<Utc>,
        mode: VerifyMode,
    ) -> Vec<ExpiringCert> {
        let mut expiring = Vec::new();

        for chain in chains {
            match mode {
                VerifyMode::Chain => {
                    let cause = match self.verify(chain, at) {
                        Ok(()) => continue,
                        Err(ExpiringCertsError::VerificationError { cause, .. }) => cause,
                        Err(other) => other.to_string(),
                    };
                    expiring.push(record(chain, &chain.leaf, Some(cause)));
                }
                VerifyMode::NotAfter => {
                    for certificate in chain.certificates().filter(|c| expires_before(c, at)) {
                        expiring.push(record(chain, certificate, None));
                    }
                }
            }
        }

        expiring
    }
}

fn record(chain: &CertificateChain, certificate: &Certificate, error: Option<String>) -> ExpiringCert {
    tracing::debug!(
        source = %chain.source,
        subject = %certificate.subject,
        not_after = %certificate.not_after,
        error = error.as_deref().unwrap_or("not after reference time"),
        "certificate is expiring"
    );
    ExpiringCert {
        domains: certificate.dns_names.clone(),
        expire: certificate.not_after,
        error,
        source: chain.source.clone(),
        fingerprint_sha256: certificate.fingerprint_sha256.clone(),
    }
}

/// The cheap check: has the certificate's validity window ended before `at`?
///
/// The comparison is exclusive, a certificate whose not-after equals `at`
/// is not expiring.
pub fn expires_before(certificate: &Certificate, at: DateTime<Utc>) -> bool {
    certificate.expires_before(at)
}

/// Whole seconds for path validation, rounded up so that a reference time
/// a fraction past a not-after already counts as expired.
fn unix_time(at: DateTime<Utc>) -> UnixTime {
    let mut secs = at.timestamp();
    if at.timestamp_subsec_nanos() > 0 {
        secs = secs.saturating_add(1);
    }
    // Reference times before 1970 are clamped to the epoch.
    UnixTime::since_unix_epoch(Duration::from_secs(u64::try_from(secs).unwrap_or(0)))
}
