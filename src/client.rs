//! High-level client for the registry's SOAP facade.
//!
//! [`NiraClient`] owns the connection settings, an authentication context
//! replayed on every call and the transport that carries envelopes to the
//! facade. Every operation resolves to an [`OperationResult`]; neither
//! business rejections nor local failures escape as `Err` from the
//! operation methods.

use std::path::Path;
use tracing::{debug, warn};

use crate::config::NiraConfig;
use crate::encryption;
use crate::errors::Result;
use crate::response::{
    OperationResult, PasswordChange, Person, PlaceOfBirth, TransactionStatus, Verification,
    VoterDetails,
};
use crate::soap::{self, RequestBody, XmlNode};
use crate::transport::{HttpTransport, SoapTransport};
use crate::ws_security::{AuthContext, SecurityHeader};

/// Facade operation returning the full person record.
pub const OP_GET_PERSON: &str = "getPerson";
/// Facade operation verifying a person against the register.
pub const OP_VERIFY_PERSON: &str = "verifyPerson";
/// Facade operation returning voter registration details.
pub const OP_GET_VOTER_DETAILS: &str = "getVoterDetails";
/// Facade operation returning the registered place of birth.
pub const OP_GET_PLACE_OF_BIRTH: &str = "getPlaceOfBirth";
/// Facade operation replacing the account password.
pub const OP_CHANGE_PASSWORD: &str = "changePassword";

const FIELD_NATIONAL_ID: &str = "nationalId";
const FIELD_NEW_PASSWORD: &str = "newPassword";

/// Client for the registry facade.
pub struct NiraClient {
    config: NiraConfig,
    transport: Box<dyn SoapTransport>,
    auth: AuthContext,
}

impl NiraClient {
    /// Builds a client posting to the endpoint described by `config`.
    pub fn connect(config: NiraConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Builds a client over a caller-supplied transport.
    ///
    /// Validates the configuration and establishes the initial
    /// authentication context.
    pub fn with_transport(
        config: NiraConfig,
        transport: impl SoapTransport + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let auth = AuthContext::establish(&config.credentials())?;
        Ok(Self {
            config,
            transport: Box::new(transport),
            auth,
        })
    }

    /// Connection settings this client was built from.
    pub fn config(&self) -> &NiraConfig {
        &self.config
    }

    /// The authentication context attached to outgoing calls.
    pub fn auth_context(&self) -> &AuthContext {
        &self.auth
    }

    /// The `UsernameToken` header exactly as it accompanies each call.
    pub fn authenticate(&self) -> &SecurityHeader {
        self.auth.header()
    }

    /// Replaces the authentication context with a freshly established one.
    ///
    /// Draws a new nonce, stamps the current instant and rederives the
    /// password digest. Call this when the registry starts rejecting the
    /// replayed token as stale.
    pub fn refresh_auth_context(&mut self) -> Result<()> {
        self.auth = AuthContext::establish(&self.config.credentials())?;
        debug!(nonce = %self.auth.nonce(), "established fresh authentication context");
        Ok(())
    }

    /// Looks up the full person record behind a national ID.
    pub async fn lookup_person(&self, national_id: &str) -> OperationResult<Person> {
        let outcome = self.try_lookup_person(national_id).await;
        self.fold(OP_GET_PERSON, outcome)
    }

    /// Verifies a person against the register.
    pub async fn verify_person(&self, national_id: &str) -> OperationResult<Verification> {
        let body = RequestBody::new().field(FIELD_NATIONAL_ID, national_id);
        let outcome = self
            .try_passthrough(OP_VERIFY_PERSON, body, Verification::from_return)
            .await;
        self.fold(OP_VERIFY_PERSON, outcome)
    }

    /// Fetches voter registration details for a national ID.
    pub async fn get_voter_details(&self, national_id: &str) -> OperationResult<VoterDetails> {
        let body = RequestBody::new().field(FIELD_NATIONAL_ID, national_id);
        let outcome = self
            .try_passthrough(OP_GET_VOTER_DETAILS, body, VoterDetails::from_return)
            .await;
        self.fold(OP_GET_VOTER_DETAILS, outcome)
    }

    /// Fetches the registered place of birth for a national ID.
    pub async fn get_place_of_birth(&self, national_id: &str) -> OperationResult<PlaceOfBirth> {
        let body = RequestBody::new().field(FIELD_NATIONAL_ID, national_id);
        let outcome = self
            .try_passthrough(OP_GET_PLACE_OF_BIRTH, body, PlaceOfBirth::from_return)
            .await;
        self.fold(OP_GET_PLACE_OF_BIRTH, outcome)
    }

    /// Replaces the account password.
    ///
    /// The replacement travels encrypted under the operator's public key,
    /// read from `public_key_path` as PEM. On success the registry expects
    /// future digests to cover the new password; rebuild the client (or its
    /// configuration) with the new value before calling further operations.
    pub async fn rotate_password(
        &self,
        new_password: &str,
        public_key_path: impl AsRef<Path>,
    ) -> OperationResult<PasswordChange> {
        let outcome = self
            .try_rotate_password(new_password, public_key_path.as_ref())
            .await;
        self.fold(OP_CHANGE_PASSWORD, outcome)
    }

    async fn try_lookup_person(&self, national_id: &str) -> Result<OperationResult<Person>> {
        let body = RequestBody::new().field(FIELD_NATIONAL_ID, national_id);
        let document = self
            .transport
            .call(OP_GET_PERSON, &body, self.auth.header())
            .await?;
        let ret = soap::return_node(&document)?;
        let tx = TransactionStatus::from_return(ret)?;
        if tx.is_error() {
            return Err(tx.to_remote_error());
        }
        let person = Person::from_return(ret, &tx)?;
        Ok(OperationResult::success(tx.status_text(), person))
    }

    async fn try_rotate_password(
        &self,
        new_password: &str,
        public_key_path: &Path,
    ) -> Result<OperationResult<PasswordChange>> {
        let pem = encryption::read_key_material(public_key_path)?;
        let encrypted = encryption::encrypt_with_public_key(new_password, &pem)?;
        let body = RequestBody::new().field(FIELD_NEW_PASSWORD, encrypted);
        self.try_passthrough(OP_CHANGE_PASSWORD, body, PasswordChange::from_return)
            .await
    }

    /// Runs an operation whose payload maps straight off the `return`
    /// record.
    async fn try_passthrough<T>(
        &self,
        operation: &str,
        body: RequestBody,
        map: impl FnOnce(&XmlNode) -> T,
    ) -> Result<OperationResult<T>> {
        let document = self.transport.call(operation, &body, self.auth.header()).await?;
        let ret = soap::return_node(&document)?;
        let tx = TransactionStatus::from_return(ret)?;
        if tx.is_error() {
            return Err(tx.to_remote_error());
        }
        Ok(OperationResult::success(tx.status_text(), map(ret)))
    }

    /// Folds an operation outcome into the uniform result shape, logging
    /// the failure it absorbs.
    fn fold<T>(&self, operation: &str, outcome: Result<OperationResult<T>>) -> OperationResult<T> {
        match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(operation = %operation, error = %error, "registry operation failed");
                OperationResult::from_error(error)
            }
        }
    }
}

impl std::fmt::Debug for NiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NiraClient")
            .field("username", &self.config.username)
            .field("endpoint", &self.config.endpoint_url())
            .finish_non_exhaustive()
    }
}
