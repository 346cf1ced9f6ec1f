//! Error types for the expiring-certs library.
//!
//! Every variant except [`ExpiringCertsError::Verification`] aborts a run.
//! A verification failure is the expected outcome for an expiring
//! certificate and is turned into a report record instead.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors that can occur while collecting and checking certificates.
#[derive(Debug)]
pub enum ExpiringCertsError {
    IoError(io::Error),
    MalformedPem(String),
    CertificateParseError(String),
    InvalidDateFormat(String),
    InvalidDomain(String),
    TlsDialError {
        domain: String,
        reason: String,
    },
    PoolAppendError(String),
    VerificationError {
        domains: Vec<String>,
        cause: String,
    },
    ConfigError(String),
}

impl ExpiringCertsError {
    /// Verification failures are data, everything else ends the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExpiringCertsError::VerificationError { .. })
    }
}

impl fmt::Display for ExpiringCertsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiringCertsError::IoError(err) => write!(f, "IO error: {}", err),
            ExpiringCertsError::MalformedPem(msg) => write!(f, "Malformed PEM: {}", msg),
            ExpiringCertsError::CertificateParseError(msg) => write!(f, "Certificate parse error: {}", msg),
            ExpiringCertsError::InvalidDateFormat(input) => write!(f, "Invalid date format: {:?}", input),
            ExpiringCertsError::InvalidDomain(msg) => write!(f, "Invalid domain: {}", msg),
            ExpiringCertsError::TlsDialError { domain, reason } => {
                write!(f, "TLS dial to {} failed: {}", domain, reason)
            }
            ExpiringCertsError::PoolAppendError(msg) => write!(f, "Couldn't add certificate to pool: {}", msg),
            ExpiringCertsError::VerificationError { domains, cause } => {
                write!(f, "Verification failed for {}: {}", domains.join(","), cause)
            }
            ExpiringCertsError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ExpiringCertsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExpiringCertsError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ExpiringCertsError {
    fn from(err: io::Error) -> Self {
        ExpiringCertsError::IoError(err)
    }
}
