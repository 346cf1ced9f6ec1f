//! Certificates stored on disk, one chain file per subdirectory.
//!
//! Laid out the way certbot keeps them: `<root>/<name>/fullchain.pem`.

use crate::certificate::CertificateChain;
use crate::error::ExpiringCertsError;
use crate::pem_support::load_chain_from_file;
use crate::CertificateSource;
use std::fs;
use std::path::{Path, PathBuf};

/// Default root scanned for certificate directories.
pub const DEFAULT_CERTIFICATES_ROOT: &str = "/etc/letsencrypt/live";
/// Default chain file name inside each directory.
pub const DEFAULT_CERTIFICATE_FILENAME: &str = "fullchain.pem";

#[derive(Debug, Clone)]
pub struct FileSystemSource {
    pub root: PathBuf,
    pub certificate_filename: String,
    /// Skip directories whose chain file can't be read instead of failing.
    pub skip_unreadable: bool,
}

impl FileSystemSource {
    pub fn new<P: AsRef<Path>>(root: P, certificate_filename: &str) -> Self {
        FileSystemSource {
            root: root.as_ref().to_path_buf(),
            certificate_filename: certificate_filename.to_string(),
            skip_unreadable: false,
        }
    }

    pub fn skip_unreadable(mut self, skip: bool) -> Self {
        self.skip_unreadable = skip;
        self
    }

    /// Immediate subdirectories of the root, sorted by name.
    ///
    /// Symlinks are followed, other entries are ignored.
    pub fn certificate_directories(&self) -> Result<Vec<PathBuf>, ExpiringCertsError> {
        let mut dirs = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            match fs::metadata(&path) {
                Ok(metadata) if metadata.is_dir() => dirs.push(path),
                Ok(_) => {}
                Err(e) if self.skip_unreadable => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        dirs.sort();
        Ok(dirs)
    }
}

impl CertificateSource for FileSystemSource {
    fn certificates(&self) -> Result<Vec<CertificateChain>, ExpiringCertsError> {
        let dirs = self.certificate_directories()?;
        let mut chains = Vec::with_capacity(dirs.len());

        for dir in dirs {
            let path = dir.join(&self.certificate_filename);
            tracing::debug!(path = %path.display(), "reading certificate chain");

            match load_chain_from_file(&path) {
                Ok(chain) => chains.push(chain),
                Err(e) if self.skip_unreadable => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(chains)
    }
}
