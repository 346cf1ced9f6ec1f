//! Parsed certificates and the chains they travel in.

use crate::error::ExpiringCertsError;
use chrono::{DateTime, Utc};
use rustls::pki_types::CertificateDer;
use sha2::{Digest, Sha256};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};

/// An X.509 certificate, parsed once and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    der: CertificateDer<'static>,
    pub dns_names: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub fingerprint_sha256: String,
}

impl Certificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: impl Into<CertificateDer<'static>>) -> Result<Certificate, ExpiringCertsError> {
        let der = der.into();
        let (_, x509cert) = X509Certificate::from_der(der.as_ref())
            .map_err(|e| ExpiringCertsError::CertificateParseError(format!("Failed to parse certificate: {}", e)))?;

        let dns_names = match x509cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                return Err(ExpiringCertsError::CertificateParseError(format!(
                    "Invalid subject alternative name extension: {}",
                    e
                )))
            }
        };

        let validity = x509cert.validity();
        let not_before = asn1_to_utc(validity.not_before.timestamp())?;
        let not_after = asn1_to_utc(validity.not_after.timestamp())?;

        let mut hasher = Sha256::new();
        hasher.update(der.as_ref());
        let fingerprint_sha256 = format!("{:X}", hasher.finalize());

        Ok(Certificate {
            dns_names,
            not_before,
            not_after,
            subject: x509cert.subject().to_string(),
            issuer: x509cert.issuer().to_string(),
            serial_number: format!("{:X}", x509cert.tbs_certificate.serial),
            fingerprint_sha256,
            der,
        })
    }

    /// The raw DER bytes the certificate was parsed from.
    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// True when the validity window has ended strictly before `at`.
    pub fn expires_before(&self, at: DateTime<Utc>) -> bool {
        self.not_after < at
    }
}

fn asn1_to_utc(timestamp: i64) -> Result<DateTime<Utc>, ExpiringCertsError> {
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        ExpiringCertsError::CertificateParseError(format!("Validity timestamp out of range: {}", timestamp))
    })
}

/// A leaf certificate plus the chain material supplied alongside it.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    pub leaf: Certificate,
    pub intermediates: Vec<CertificateDer<'static>>,
    /// Directory or `host:port` the chain was read from.
    pub source: String,
    parsed_intermediates: Vec<Certificate>,
}

impl CertificateChain {
    /// Build a chain from DER certificates, leaf first.
    ///
    /// Every certificate after the leaf has to parse, otherwise it could
    /// not be used as an intermediate and the whole chain is rejected.
    pub fn from_der_chain(
        mut certificates: Vec<CertificateDer<'static>>,
        source: impl Into<String>,
    ) -> Result<CertificateChain, ExpiringCertsError> {
        let source = source.into();
        if certificates.is_empty() {
            return Err(ExpiringCertsError::MalformedPem(format!("No certificates found for {}", source)));
        }
        let intermediates = certificates.split_off(1);
        let leaf = Certificate::from_der(certificates.remove(0))?;

        let mut parsed_intermediates = Vec::with_capacity(intermediates.len());
        for (position, intermediate) in intermediates.iter().enumerate() {
            match Certificate::from_der(intermediate.clone()) {
                Ok(cert) => parsed_intermediates.push(cert),
                Err(e) => {
                    return Err(ExpiringCertsError::PoolAppendError(format!(
                        "{}: chain certificate at position {} is invalid: {}",
                        source,
                        position + 1,
                        e
                    )))
                }
            }
        }

        Ok(CertificateChain {
            leaf,
            intermediates,
            source,
            parsed_intermediates,
        })
    }

    /// Every certificate of the chain, leaf first, in the order supplied.
    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> {
        std::iter::once(&self.leaf).chain(self.parsed_intermediates.iter())
    }

    /// Number of certificates including the leaf.
    pub fn len(&self) -> usize {
        self.intermediates.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{date_time_ymd, CertificateParams, KeyPair};

    fn self_signed(names: &[&str], not_after: (i32, u8, u8)) -> CertificateDer<'static> {
        let mut params = CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>()).unwrap();
        params.not_before = date_time_ymd(2024, 1, 1);
        params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().clone()
    }

    #[test]
    fn test_from_der_extracts_domains_and_window() {
        let der = self_signed(&["example.com", "www.example.com"], (2030, 1, 1));
        let cert = Certificate::from_der(der.clone()).unwrap();

        assert_eq!(cert.dns_names, vec!["example.com", "www.example.com"]);
        assert_eq!(cert.not_before.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(cert.not_after.to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert_eq!(cert.fingerprint_sha256.len(), 64);
        assert_eq!(cert.der(), &der);
    }

    #[test]
    fn test_expires_before_is_exclusive() {
        let cert = Certificate::from_der(self_signed(&["example.com"], (2030, 1, 1))).unwrap();
        let not_after = cert.not_after;

        assert!(cert.expires_before(not_after + chrono::Duration::seconds(1)));
        assert!(!cert.expires_before(not_after));
        assert!(!cert.expires_before(not_after - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = Certificate::from_der(CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x00]));
        assert!(matches!(result, Err(ExpiringCertsError::CertificateParseError(_))));
    }

    #[test]
    fn test_chain_rejects_invalid_intermediate() {
        let leaf = self_signed(&["example.com"], (2030, 1, 1));
        let garbage = CertificateDer::from(vec![0xde, 0xad]);
        let result = CertificateChain::from_der_chain(vec![leaf, garbage], "/live/example.com");
        match result {
            Err(ExpiringCertsError::PoolAppendError(msg)) => assert!(msg.contains("position 1")),
            other => panic!("expected PoolAppendError, got {:?}", other),
        }
    }

    #[test]
    fn test_chain_splits_leaf_and_intermediates() {
        let leaf = self_signed(&["leaf.example"], (2030, 1, 1));
        let other = self_signed(&["other.example"], (2031, 1, 1));
        let chain = CertificateChain::from_der_chain(vec![leaf, other.clone()], "example").unwrap();

        assert_eq!(chain.leaf.dns_names, vec!["leaf.example"]);
        assert_eq!(chain.intermediates, vec![other]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.source, "example");
    }

    #[test]
    fn test_certificates_yields_leaf_then_intermediates() {
        let leaf = self_signed(&["leaf.example"], (2030, 1, 1));
        let other = self_signed(&["other.example"], (2026, 6, 1));
        let chain = CertificateChain::from_der_chain(vec![leaf, other], "example").unwrap();

        let not_after: Vec<String> = chain.certificates().map(|c| c.not_after.to_rfc3339()).collect();
        assert_eq!(not_after, vec!["2030-01-01T00:00:00+00:00", "2026-06-01T00:00:00+00:00"]);
        assert_eq!(chain.certificates().nth(1).unwrap().dns_names, vec!["other.example"]);
    }

    #[test]
    fn test_empty_chain_is_malformed() {
        let result = CertificateChain::from_der_chain(Vec::new(), "empty");
        assert!(matches!(result, Err(ExpiringCertsError::MalformedPem(_))));
    }
}
