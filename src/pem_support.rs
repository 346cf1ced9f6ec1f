//! PEM certificate file support.
//!
//! Reads certificate chain files such as `fullchain.pem` and turns them into
//! [`CertificateChain`]s. The first `CERTIFICATE` block is the leaf, every
//! later block is chain material.

use crate::certificate::CertificateChain;
use crate::error::ExpiringCertsError;
use rustls::pki_types::CertificateDer;
use std::fs;
use std::io::BufReader;
use std::path::Path;

/// Decode every `CERTIFICATE` block in PEM data, in file order.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>, ExpiringCertsError> {
    let mut reader = BufReader::new(pem_data);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ExpiringCertsError::MalformedPem(format!("Failed to parse PEM: {}", e)))?;

    if certs.is_empty() {
        return Err(ExpiringCertsError::MalformedPem("No certificates found in PEM data".to_string()));
    }

    Ok(certs)
}

/// Read a chain file and split it into leaf and chain material.
pub fn load_chain_from_file<P: AsRef<Path>>(path: P) -> Result<CertificateChain, ExpiringCertsError> {
    let path = path.as_ref();
    let contents = fs::read(path)?;
    let certs = parse_pem_certificates(&contents).map_err(|e| match e {
        ExpiringCertsError::MalformedPem(msg) => {
            ExpiringCertsError::MalformedPem(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    CertificateChain::from_der_chain(certs, path.display().to_string())
}

/// Load every certificate from a PEM file, used for trust anchor files.
pub fn load_certificates_from_file<P>(path: P) -> Result<Vec<CertificateDer<'static>>, ExpiringCertsError>
where
    P: AsRef<Path>,
{
    let contents = fs::read(path)?;
    parse_pem_certificates(&contents)
}

/// Convert a DER certificate to PEM.
pub fn der_to_pem(der_data: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let encoded = STANDARD.encode(der_data);
    let mut pem = String::new();
    pem.push_str("-----BEGIN CERTIFICATE-----\n");

    // 64 characters per line
    for chunk in encoded.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }

    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Encode a chain, leaf first, as one PEM bundle.
pub fn chain_to_pem(certificates: &[CertificateDer<'_>]) -> String {
    certificates.iter().map(|cert| der_to_pem(cert.as_ref())).collect()
}
