//! WS-Security `UsernameToken` construction.
//!
//! The registry authenticates every call with the OASIS WSS 1.0 username
//! token profile, with one registry-specific twist: the digest covers the
//! SHA-1 hash of the password rather than the password itself:
//!
//! ```text
//! PasswordDigest = Base64(SHA-1(nonce ++ created ++ SHA-1(password)))
//! ```
//!
//! `created` enters the digest with its UTC offset written without a colon
//! (`+0300`) while the header element carries the colon form (`+03:00`).
//! Both renderings use the registry's civil timezone, a fixed UTC+3 with no
//! daylight saving, and truncate to exactly three fractional-second digits.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha1::{Digest, Sha1};

use crate::config::Credentials;
use crate::errors::{NiraError, Result};
use crate::soap::xml_escape;

/// OASIS WSS 1.0 security extension namespace (the `wsse` prefix).
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// OASIS WSS 1.0 utility namespace (the `wsu` prefix).
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// `Type` attribute marking a digest-form password.
pub const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";

/// `EncodingType` attribute marking a base64 nonce.
pub const NONCE_ENCODING_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// Offset of the registry's civil timezone from UTC, in seconds.
const REGISTRY_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Number of random bytes behind a freshly generated nonce.
const NONCE_LEN: usize = 16;

fn registry_offset() -> FixedOffset {
    FixedOffset::east_opt(REGISTRY_UTC_OFFSET_SECS).expect("fixed UTC+3 offset")
}

/// Token creation instant, rendered both ways the registry needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    instant: DateTime<FixedOffset>,
    header: String,
    digest_input: String,
}

impl Created {
    /// Captures the current instant in the registry's timezone.
    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Renders an explicit instant; useful for reproducing historic tokens.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&registry_offset());
        Self {
            header: local.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            digest_input: local.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string(),
            instant: local,
        }
    }

    /// `2024-01-01T00:00:00.000+03:00` form carried in the `Created` element.
    pub fn header_value(&self) -> &str {
        &self.header
    }

    /// `2024-01-01T00:00:00.000+0300` form fed into the password digest.
    pub fn digest_value(&self) -> &str {
        &self.digest_input
    }

    /// The instant itself, in the registry's timezone.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

/// Generate a fresh 16-byte nonce, base64 encoded.
///
/// Drawing from the system CSPRNG is fallible; a refusal surfaces as
/// [`NiraError::SecureRandomUnavailable`] rather than a weaker fallback.
pub fn generate_nonce() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; NONCE_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| NiraError::secure_random("failed to draw nonce bytes"))?;
    Ok(STANDARD.encode(bytes))
}

/// Compute the registry's password digest.
///
/// `nonce_b64` is the base64 nonce exactly as it appears in the header,
/// `created` the colon-less timestamp rendering. The digest input is the
/// decoded nonce, the timestamp bytes and the raw SHA-1 of the password,
/// concatenated in that order.
pub fn compute_password_digest(nonce_b64: &str, created: &str, password: &str) -> Result<String> {
    let nonce = STANDARD
        .decode(nonce_b64)
        .map_err(|e| NiraError::crypto(format!("nonce is not valid base64: {e}")))?;
    let password_hash = Sha1::digest(password.as_bytes());

    let mut hasher = Sha1::new();
    hasher.update(&nonce);
    hasher.update(created.as_bytes());
    hasher.update(password_hash);

    Ok(STANDARD.encode(hasher.finalize()))
}

/// Fully materialized `UsernameToken`, ready to serialize into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeader {
    /// Account name.
    pub username: String,
    /// Base64 digest proving knowledge of the password.
    pub password_digest: String,
    /// Base64 nonce the digest was computed over.
    pub nonce: String,
    /// Token creation timestamp in the colon-offset header form.
    pub created: String,
    /// `wsu:Id` attribute distinguishing this token in the envelope.
    pub wsu_id: String,
}

impl SecurityHeader {
    /// Serializes the token as the header element the registry expects.
    ///
    /// The facade consumes the token directly under the SOAP `Header`,
    /// without a surrounding `wsse:Security` block, and with `Created` kept
    /// in the security extension namespace.
    pub fn to_xml(&self) -> String {
        format!(
            r#"<wsse:UsernameToken xmlns:wsse="{wsse}" xmlns:wsu="{wsu}" wsu:Id="{id}"><wsse:Username>{username}</wsse:Username><wsse:Password Type="{password_type}">{digest}</wsse:Password><wsse:Nonce EncodingType="{encoding}">{nonce}</wsse:Nonce><wsse:Created>{created}</wsse:Created></wsse:UsernameToken>"#,
            wsse = WSSE_NS,
            wsu = WSU_NS,
            id = xml_escape(&self.wsu_id),
            username = xml_escape(&self.username),
            password_type = PASSWORD_DIGEST_TYPE,
            digest = xml_escape(&self.password_digest),
            encoding = NONCE_ENCODING_TYPE,
            nonce = xml_escape(&self.nonce),
            created = xml_escape(&self.created),
        )
    }
}

/// Authentication material shared by the calls of one client.
///
/// A context is established once and its header replayed on every call
/// until the owner decides to derive a fresh one; the registry accepts
/// replayed tokens within its own freshness window.
#[derive(Debug, Clone)]
pub struct AuthContext {
    nonce: String,
    created: Created,
    password_digest: String,
    header: SecurityHeader,
}

impl AuthContext {
    /// Draws a fresh nonce, stamps the current instant and derives the
    /// password digest for `credentials`.
    pub fn establish(credentials: &Credentials) -> Result<Self> {
        Self::establish_at(credentials, Created::now())
    }

    /// Like [`AuthContext::establish`] with an explicit creation instant.
    pub fn establish_at(credentials: &Credentials, created: Created) -> Result<Self> {
        let nonce = generate_nonce()?;
        let password_digest =
            compute_password_digest(&nonce, created.digest_value(), &credentials.password)?;
        let header = SecurityHeader {
            username: credentials.username.clone(),
            password_digest: password_digest.clone(),
            nonce: nonce.clone(),
            created: created.header_value().to_string(),
            wsu_id: format!("UsernameToken-{}", uuid::Uuid::new_v4()),
        };
        Ok(Self {
            nonce,
            created,
            password_digest,
            header,
        })
    }

    /// Base64 nonce of this context.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Creation instant of this context.
    pub fn created(&self) -> &Created {
        &self.created
    }

    /// Derived password digest of this context.
    pub fn password_digest(&self) -> &str {
        &self.password_digest
    }

    /// The header replayed on outgoing calls.
    pub fn header(&self) -> &SecurityHeader {
        &self.header
    }
}
