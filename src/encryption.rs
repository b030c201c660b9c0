//! RSA encryption of replacement passwords.
//!
//! Password rotation sends the new password encrypted under the registry
//! operator's public key, PKCS#1 v1.5 padded and base64 encoded. Operators
//! hand the key out in different shapes; plain `PUBLIC KEY` (SPKI) PEM,
//! legacy `RSA PUBLIC KEY` PEM and full X.509 certificates are accepted.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use std::path::Path;
use x509_parser::pem::parse_x509_pem;

use crate::errors::{NiraError, Result};

/// Reads public key material from disk.
///
/// Any read failure is reported as [`NiraError::KeyNotFound`] carrying the
/// offending path.
pub fn read_key_material(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|_| NiraError::key_not_found(path.display().to_string()))
}

/// Encrypts `plaintext` under the PEM-encoded public key and returns the
/// ciphertext as base64.
pub fn encrypt_with_public_key(plaintext: &str, pem: &[u8]) -> Result<String> {
    let key = parse_public_key(pem)?;
    let mut rng = rand::rngs::OsRng;
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| NiraError::encryption(format!("RSA encryption failed: {e}")))?;
    Ok(STANDARD.encode(ciphertext))
}

fn parse_public_key(pem: &[u8]) -> Result<RsaPublicKey> {
    let text = std::str::from_utf8(pem)
        .map_err(|_| NiraError::encryption("key material is not valid UTF-8 PEM"))?;
    if text.contains("BEGIN CERTIFICATE") {
        return certificate_key(pem);
    }
    RsaPublicKey::from_public_key_pem(text)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
        .map_err(|e| NiraError::encryption(format!("unsupported public key material: {e}")))
}

fn certificate_key(pem: &[u8]) -> Result<RsaPublicKey> {
    let (_, parsed) = parse_x509_pem(pem)
        .map_err(|e| NiraError::encryption(format!("malformed certificate PEM: {e}")))?;
    let certificate = parsed
        .parse_x509()
        .map_err(|e| NiraError::encryption(format!("malformed certificate: {e}")))?;
    let spki = certificate.public_key();
    RsaPublicKey::from_pkcs1_der(&spki.subject_public_key.data)
        .map_err(|e| NiraError::encryption(format!("certificate does not carry an RSA key: {e}")))
}
