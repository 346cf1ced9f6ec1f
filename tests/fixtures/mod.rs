//! Test fixtures: throwaway CAs, leaf certificates and live directories.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use expiring_certs::chain_to_pem;
use rcgen::{date_time_ymd, BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use rustls::pki_types::CertificateDer;
use std::fs;
use std::path::{Path, PathBuf};

pub type Ymd = (i32, u8, u8);

pub fn utc(ymd: Ymd) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ymd.0, ymd.1 as u32, ymd.2 as u32, 0, 0, 0).unwrap()
}

/// A leaf certificate together with its private key.
pub struct IssuedCert {
    pub der: CertificateDer<'static>,
    pub key_der: Vec<u8>,
}

pub struct TestCa {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl TestCa {
    pub fn new(common_name: &str) -> TestCa {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.not_before = date_time_ymd(2020, 1, 1);
        params.not_after = date_time_ymd(2040, 1, 1);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        TestCa { cert, key }
    }

    /// A subordinate CA signed by this one, valid from 2020 until `not_after`.
    pub fn intermediate(&self, common_name: &str, not_after: Ymd) -> TestCa {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.not_before = date_time_ymd(2020, 1, 1);
        params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        TestCa { cert, key }
    }

    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub fn pem(&self) -> String {
        chain_to_pem(&[self.der()])
    }

    pub fn issue(&self, names: &[&str], not_before: Ymd, not_after: Ymd) -> IssuedCert {
        let mut params = CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>()).unwrap();
        if let Some(first) = names.first() {
            params.distinguished_name.push(DnType::CommonName, *first);
        }
        params.not_before = date_time_ymd(not_before.0, not_before.1, not_before.2);
        params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        IssuedCert {
            der: cert.der().clone(),
            key_der: key.serialize_der(),
        }
    }

    /// Write `<root>/<name>/<filename>` holding the leaf followed by this CA.
    pub fn write_live_dir(&self, root: &Path, name: &str, filename: &str, domains: &[&str], not_after: Ymd) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let leaf = self.issue(domains, (2024, 1, 1), not_after);
        fs::write(dir.join(filename), chain_to_pem(&[leaf.der, self.der()])).unwrap();
        dir
    }

    /// Write the CA certificate as a PEM file and return its path.
    pub fn write_pem(&self, path: &Path) -> PathBuf {
        fs::write(path, self.pem()).unwrap();
        path.to_path_buf()
    }
}

/// A one-shot TLS server on 127.0.0.1 presenting a fixed chain.
pub struct TlsServer {
    pub port: u16,
    handle: std::thread::JoinHandle<Option<String>>,
}

impl TlsServer {
    pub fn start(chain: Vec<CertificateDer<'static>>, key_der: Vec<u8>) -> TlsServer {
        use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
        use rustls::{ServerConfig, ServerConnection};
        use std::net::TcpListener;
        use std::sync::Arc;
        use std::time::Duration;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(chain, PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der)))
            .unwrap();
        let config = Arc::new(config);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().ok()?;
            sock.set_read_timeout(Some(Duration::from_secs(10))).ok()?;
            let mut conn = ServerConnection::new(config).ok()?;
            while conn.is_handshaking() {
                if conn.complete_io(&mut sock).is_err() {
                    break;
                }
            }
            // The client hangs up right after the handshake.
            let _ = conn.complete_io(&mut sock);
            conn.server_name().map(str::to_string)
        });

        TlsServer { port, handle }
    }

    /// Serve `names` with a leaf issued by `ca`, sending the CA as the intermediate.
    pub fn for_names(ca: &TestCa, names: &[&str], not_after: Ymd) -> TlsServer {
        let leaf = ca.issue(names, (2024, 1, 1), not_after);
        TlsServer::start(vec![leaf.der, ca.der()], leaf.key_der)
    }

    /// Wait for the connection to finish and return the SNI name the client sent.
    pub fn finish(self) -> Option<String> {
        self.handle.join().unwrap()
    }
}
