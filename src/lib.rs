//! # expiring-certs
//!
//! Finds TLS certificates that expire before a cutoff time and reports the
//! domain names they cover.
//!
//! Certificates come either from disk, one chain file per subdirectory as
//! certbot lays out `/etc/letsencrypt/live`, or from remote hosts over TLS.
//! Chains on disk are verified against the system trust anchors as of the
//! reference time. Any failure, expiry or otherwise, puts the certificate in
//! the report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use expiring_certs::{run, Config};
//!
//! let config = Config::default();
//! let stdout = std::io::stdout();
//! match run(&config, &mut stdout.lock()) {
//!     Ok(count) => eprintln!("{} expiring certificate(s)", count),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

mod certificate;
mod config;
mod custom_roots;
mod error;
mod expire_time;
mod filesystem;
mod network;
mod pem_support;
mod report;
mod verifier;

#[cfg(test)]
mod testing;

use std::io::Write;

pub use certificate::{Certificate, CertificateChain};
pub use config::{parse_domain_list, Cli, Config, Source, TrustConfig};
pub use custom_roots::CustomRootStoreBuilder;
pub use error::ExpiringCertsError;
pub use expire_time::{
    default_expire_time, default_expire_time_from, parse_expire_time, resolve_expire_time, DateFormat, DATE_FORMATS,
    DEFAULT_EXPIRE_DAYS,
};
pub use filesystem::{FileSystemSource, DEFAULT_CERTIFICATES_ROOT, DEFAULT_CERTIFICATE_FILENAME};
pub use network::{client_config, download_chain, split_host_port, NetworkSource, DEFAULT_PORT};
pub use pem_support::{
    chain_to_pem, der_to_pem, load_certificates_from_file, load_chain_from_file, parse_pem_certificates,
};
pub use report::{ExpiringCert, OutputFormat, Reporter};
pub use verifier::{expires_before, ChainVerifier, VerifyMode};

pub type Result<T> = std::result::Result<T, ExpiringCertsError>;

/// A provider of certificate chains to check.
pub trait CertificateSource {
    /// Every chain this source knows about, in discovery order.
    ///
    /// Any error aborts the run, there are no partial results.
    fn certificates(&self) -> Result<Vec<CertificateChain>>;
}

/// Collect the certificates selected by `config` that fail at its reference time.
pub fn check(config: &Config) -> Result<Vec<ExpiringCert>> {
    let (chains, mode) = match &config.source {
        Source::FileSystem(source) => (source.certificates()?, VerifyMode::Chain),
        Source::Domains(source) => (source.certificates()?, config.remote_verify),
    };
    tracing::debug!(count = chains.len(), expire = %config.expire, ?mode, "checking certificates");

    let roots = match mode {
        VerifyMode::Chain => config.trust.root_store()?,
        VerifyMode::NotAfter => rustls::RootCertStore::empty(),
    };
    let verifier = ChainVerifier::new(roots);
    Ok(verifier.filter_expiring(&chains, config.expire, mode))
}

/// Check and report. Returns the number of expiring certificates.
///
/// Nothing is written unless every certificate was collected successfully.
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<usize> {
    let expiring = check(config)?;
    config.reporter.report(out, &expiring)
}
