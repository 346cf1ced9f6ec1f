//! Run configuration, built once from the command line.

use crate::custom_roots::CustomRootStoreBuilder;
use crate::error::ExpiringCertsError;
use crate::expire_time::{default_expire_time, resolve_expire_time};
use crate::filesystem::{FileSystemSource, DEFAULT_CERTIFICATES_ROOT, DEFAULT_CERTIFICATE_FILENAME};
use crate::network::NetworkSource;
use crate::report::{OutputFormat, Reporter};
use crate::verifier::VerifyMode;
use chrono::{DateTime, Utc};
use clap::Parser;
use rustls::RootCertStore;
use std::path::PathBuf;
use std::time::Duration;

/// Report certificates that expire before a given time.
#[derive(Parser, Debug, Clone)]
#[command(name = "expiring-certs", version, about)]
pub struct Cli {
    /// Name of the chain file inside each certificate directory
    #[arg(long, alias = "pem-name", default_value = DEFAULT_CERTIFICATE_FILENAME)]
    pub certificate_filename: String,

    /// Directory holding one subdirectory per certificate
    #[arg(long, alias = "certs-path", default_value = DEFAULT_CERTIFICATES_ROOT)]
    pub certificates_root_path: PathBuf,

    /// Reference time, e.g. 2016-03-15T00:00:00+01:00. Two weeks from now when empty
    #[arg(long, default_value = "")]
    pub expire: String,

    /// Print the expiration date next to each domain
    #[arg(long)]
    pub print_date: bool,

    /// Print the verification error next to each domain
    #[arg(long)]
    pub print_error: bool,

    /// Comma separated list of hosts (host or host:port) to check instead of the disk
    #[arg(long, default_value = "")]
    pub domains: String,

    /// Exit with status 3 when any expiring certificate was found
    #[arg(long)]
    pub fail_on_match: bool,

    /// Verify the full chain of remote hosts instead of only their expiration date
    #[arg(long)]
    pub verify_remote_chain: bool,

    /// Additional trusted CA certificates (PEM), may be repeated
    #[arg(long = "ca-file", value_name = "PATH")]
    pub ca_files: Vec<PathBuf>,

    /// Trust the bundled Mozilla roots in addition to the system roots
    #[arg(long)]
    pub webpki_roots: bool,

    /// Skip certificate directories that can't be read instead of aborting
    #[arg(long)]
    pub skip_unreadable: bool,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Emit JSON instead of one line per domain
    #[arg(long)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where certificates come from for this run.
#[derive(Debug, Clone)]
pub enum Source {
    FileSystem(FileSystemSource),
    Domains(NetworkSource),
}

/// Trust anchors for chain verification.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    pub system_roots: bool,
    pub webpki_roots: bool,
    pub ca_files: Vec<PathBuf>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        TrustConfig {
            system_roots: true,
            webpki_roots: false,
            ca_files: Vec::new(),
        }
    }
}

impl TrustConfig {
    pub fn root_store(&self) -> Result<RootCertStore, ExpiringCertsError> {
        let mut builder = CustomRootStoreBuilder::new();
        if self.system_roots {
            builder = builder.with_system_roots();
        }
        if self.webpki_roots {
            builder = builder.with_webpki_roots();
        }
        for path in &self.ca_files {
            builder = builder.add_pem_file(path)?;
        }
        Ok(builder.build())
    }
}

/// Everything a run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub expire: DateTime<Utc>,
    pub source: Source,
    pub reporter: Reporter,
    pub fail_on_match: bool,
    /// Mode for remote hosts. Certificates on disk always get chain verification.
    pub remote_verify: VerifyMode,
    pub trust: TrustConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            expire: default_expire_time(),
            source: Source::FileSystem(FileSystemSource::new(DEFAULT_CERTIFICATES_ROOT, DEFAULT_CERTIFICATE_FILENAME)),
            reporter: Reporter::default(),
            fail_on_match: false,
            remote_verify: VerifyMode::NotAfter,
            trust: TrustConfig::default(),
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Config, ExpiringCertsError> {
        let expire = resolve_expire_time(Some(&cli.expire))?;

        if cli.certificate_filename.trim().is_empty() {
            return Err(ExpiringCertsError::ConfigError("certificate filename must not be empty".to_string()));
        }
        let timeout = match cli.timeout {
            Some(0) => return Err(ExpiringCertsError::ConfigError("timeout must be at least one second".to_string())),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let domains = parse_domain_list(&cli.domains);
        let source = if domains.is_empty() {
            Source::FileSystem(
                FileSystemSource::new(&cli.certificates_root_path, &cli.certificate_filename)
                    .skip_unreadable(cli.skip_unreadable),
            )
        } else {
            Source::Domains(NetworkSource::new(domains).with_timeout(timeout))
        };

        Ok(Config {
            expire,
            source,
            reporter: Reporter {
                print_date: cli.print_date,
                print_error: cli.print_error,
                format: if cli.json { OutputFormat::Json } else { OutputFormat::Text },
            },
            fail_on_match: cli.fail_on_match,
            remote_verify: if cli.verify_remote_chain { VerifyMode::Chain } else { VerifyMode::NotAfter },
            trust: TrustConfig {
                system_roots: true,
                webpki_roots: cli.webpki_roots,
                ca_files: cli.ca_files.clone(),
            },
        })
    }
}

/// Split a comma separated host list, dropping empty entries.
pub fn parse_domain_list(domains: &str) -> Vec<String> {
    domains
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
