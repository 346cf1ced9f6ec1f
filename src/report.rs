//! Rendering of expiring certificates.

use crate::error::ExpiringCertsError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;

/// A certificate that failed the check at the reference time.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExpiringCert {
    /// The certificate's DNS subject alternative names, as found.
    pub domains: Vec<String>,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub expire: DateTime<Utc>,
    /// Verification failure text. `None` when only the not-after date was checked.
    pub error: Option<String>,
    pub source: String,
    /// Uppercase hex SHA-256 of the certificate's DER encoding.
    pub fingerprint_sha256: String,
}

fn serialize_rfc3339<S: serde::Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_expire(time))
}

fn format_expire(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One line per domain.
    #[default]
    Text,
    Json,
}

/// Writes expiring certificates to an output stream.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    pub print_date: bool,
    pub print_error: bool,
    pub format: OutputFormat,
}

impl Reporter {
    /// Write every record and return how many there were.
    pub fn report<W: Write>(&self, out: &mut W, expiring: &[ExpiringCert]) -> Result<usize, ExpiringCertsError> {
        match self.format {
            OutputFormat::Text => self.write_text(out, expiring)?,
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(expiring)
                    .map_err(|e| ExpiringCertsError::IoError(e.into()))?;
                writeln!(out, "{}", json)?;
            }
        }
        out.flush()?;
        Ok(expiring.len())
    }

    fn write_text<W: Write>(&self, out: &mut W, expiring: &[ExpiringCert]) -> Result<(), ExpiringCertsError> {
        for cert in expiring {
            for domain in &cert.domains {
                let mut line = domain.clone();
                if self.print_date {
                    line.push('\t');
                    line.push_str(&format_expire(&cert.expire));
                }
                if self.print_error {
                    if let Some(error) = &cert.error {
                        line.push('\t');
                        line.push_str(error);
                    }
                }
                writeln!(out, "{}", line)?;
            }
        }
        Ok(())
    }
}
