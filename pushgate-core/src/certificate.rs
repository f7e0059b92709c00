// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Certificate Provider
//!
//! Resolves the client certificate and private key used to authenticate
//! against the gateway. The bytes come either from a file on disk or from
//! memory, and are read at most once per provider.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use pkcs8::der::asn1::AnyRef;
use pkcs8::der::SecretDocument;
use pkcs8::{AlgorithmIdentifierRef, EncryptedPrivateKeyInfo, ObjectIdentifier, PrivateKeyInfo};
use zeroize::Zeroizing;

use crate::error::{PushError, PushResult};

const PKCS8_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PKCS1_LABEL: &str = "RSA PRIVATE KEY";

/// Marks an OpenSSL-style encrypted traditional key.
const LEGACY_ENCRYPTED_HEADER: &[u8] = b"Proc-Type: 4,ENCRYPTED";

/// rsaEncryption, the algorithm of a PKCS#1 key wrapped as PKCS#8.
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Resolved certificate material, wiped from memory on drop.
pub type CertificateBytes = Arc<Zeroizing<Vec<u8>>>;

/// Encoding of the resolved certificate bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateFormat {
    /// PEM text holding the certificate chain and the private key.
    Pem,
    /// DER-encoded PKCS#12 bundle, usually protected by a passphrase.
    Pkcs12,
}

impl CertificateFormat {
    /// Classifies certificate bytes by their leading marker.
    pub fn detect(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        if bytes[start..].starts_with(b"-----BEGIN") {
            CertificateFormat::Pem
        } else {
            CertificateFormat::Pkcs12
        }
    }
}

/// Returns every PEM block with the given label, markers included.
///
/// `pem_sections(bytes, "CERTIFICATE")` yields each
/// `-----BEGIN CERTIFICATE----- ... -----END CERTIFICATE-----` block in order.
/// An unterminated block is ignored.
pub fn pem_sections<'a>(bytes: &'a [u8], label: &str) -> Vec<&'a [u8]> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);
    let mut sections = Vec::new();
    let mut offset = 0;

    while let Some(start) = find(&bytes[offset..], begin.as_bytes()).map(|i| offset + i) {
        let body = start + begin.len();
        match find(&bytes[body..], end.as_bytes()) {
            Some(i) => {
                let stop = body + i + end.len();
                sections.push(&bytes[start..stop]);
                offset = stop;
            }
            None => break,
        }
    }
    sections
}

/// Extracts the client private key from PEM data as PKCS#8 DER.
///
/// Accepts, in order of preference:
/// - `ENCRYPTED PRIVATE KEY`, decrypted with `passphrase`
/// - `PRIVATE KEY` (unencrypted PKCS#8)
/// - `RSA PRIVATE KEY` (PKCS#1, as written by `openssl pkcs12 -nodes`),
///   wrapped into PKCS#8
///
/// Traditional keys encrypted with a `Proc-Type` header are refused;
/// convert them with `openssl pkcs8 -topk8`.
pub fn private_key_der(
    bytes: &[u8],
    passphrase: Option<&str>,
) -> PushResult<Zeroizing<Vec<u8>>> {
    if let Some(section) = pem_sections(bytes, ENCRYPTED_PKCS8_LABEL).first() {
        let passphrase = passphrase.filter(|p| !p.is_empty()).ok_or_else(|| {
            PushError::Configuration("private key is encrypted but no passphrase was given".into())
        })?;
        let document = decode_pem_key(section)?;
        let info = EncryptedPrivateKeyInfo::try_from(document.as_bytes()).map_err(|e| {
            PushError::Configuration(format!("invalid encrypted private key: {}", e))
        })?;
        let key = info.decrypt(passphrase).map_err(|e| {
            PushError::Configuration(format!("cannot decrypt private key: {}", e))
        })?;
        return Ok(key.to_bytes());
    }

    if passphrase.is_some_and(|p| !p.is_empty()) {
        tracing::debug!("private key is not encrypted, passphrase unused");
    }

    if let Some(section) = pem_sections(bytes, PKCS8_LABEL).first() {
        return Ok(decode_pem_key(section)?.to_bytes());
    }

    if let Some(section) = pem_sections(bytes, PKCS1_LABEL).first() {
        if find(section, LEGACY_ENCRYPTED_HEADER).is_some() {
            return Err(PushError::Configuration(
                "legacy encrypted RSA keys are not supported; \
                 convert with `openssl pkcs8 -topk8`"
                    .into(),
            ));
        }
        let rsa = decode_pem_key(section)?;
        let algorithm = AlgorithmIdentifierRef {
            oid: RSA_ENCRYPTION,
            parameters: Some(AnyRef::NULL),
        };
        let wrapped = SecretDocument::encode_msg(&PrivateKeyInfo::new(algorithm, rsa.as_bytes()))
            .map_err(|e| PushError::Configuration(format!("invalid RSA private key: {}", e)))?;
        return Ok(wrapped.to_bytes());
    }

    Err(PushError::Configuration(
        "no PKCS#8 or RSA private key found in PEM data".into(),
    ))
}

fn decode_pem_key(section: &[u8]) -> PushResult<SecretDocument> {
    let text = std::str::from_utf8(section)
        .map_err(|_| PushError::Configuration("private key PEM is not valid UTF-8".into()))?;
    SecretDocument::from_pem(text)
        .map(|(_, document)| document)
        .map_err(|e| PushError::Configuration(format!("invalid private key PEM: {}", e)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Lazily resolves and caches the client certificate.
///
/// In-memory data takes precedence over the path. A failed resolve is not
/// cached, so a certificate file that appears later is picked up on the
/// next call.
pub struct CertificateProvider {
    path: Option<PathBuf>,
    data: Option<Zeroizing<Vec<u8>>>,
    resolved: OnceCell<CertificateBytes>,
}

impl CertificateProvider {
    /// Creates a provider from an optional path and optional in-memory data.
    pub fn new(path: Option<PathBuf>, data: Option<Zeroizing<Vec<u8>>>) -> Self {
        CertificateProvider {
            path,
            data,
            resolved: OnceCell::new(),
        }
    }

    /// Creates a provider that reads the certificate from `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), None)
    }

    /// Creates a provider over certificate bytes already in memory.
    pub fn from_data(data: impl Into<Vec<u8>>) -> Self {
        Self::new(None, Some(Zeroizing::new(data.into())))
    }

    /// Returns the configured path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true once the certificate has been resolved and cached.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Returns the certificate bytes, reading the file on first use.
    pub fn resolve(&self) -> PushResult<CertificateBytes> {
        self.resolved
            .get_or_try_init(|| self.load().map(Arc::new))
            .cloned()
    }

    fn load(&self) -> PushResult<Zeroizing<Vec<u8>>> {
        let bytes = match (&self.data, &self.path) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => {
                if !path.exists() {
                    return Err(PushError::Configuration(format!(
                        "certificate file does not exist: {}",
                        path.display()
                    )));
                }
                let bytes = fs::read(path).map_err(|e| {
                    PushError::Configuration(format!(
                        "cannot read certificate file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::debug!(path = %path.display(), "loaded client certificate");
                Zeroizing::new(bytes)
            }
            (None, None) => {
                return Err(PushError::Configuration(
                    "supply the path to a certificate file or the certificate data".into(),
                ))
            }
        };

        if bytes.is_empty() {
            return Err(PushError::Configuration("certificate data is empty".into()));
        }
        Ok(bytes)
    }
}

impl std::fmt::Debug for CertificateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateProvider")
            .field("path", &self.path)
            .field("data", &self.data.as_ref().map(|_| "<redacted>"))
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
