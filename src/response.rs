//! Mapping of registry responses into typed results.
//!
//! Every operation resolves to an [`OperationResult`]: business rejections
//! reported through the response's `transactionStatus` block and local
//! failures alike are folded into it instead of escaping to the caller.
//! Person lookups map into the fully typed [`Person`] record; the
//! verification style operations pass their flat response fields through
//! unmodified.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{NiraError, Result};
use crate::soap::XmlNode;

/// Uniform outcome of a registry operation.
///
/// `status` says whether the call succeeded, `message` carries the
/// registry's own wording (or the local failure text), `payload` the mapped
/// record on success and `error_detail` a registry error code when one was
/// supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub status: bool,
    pub message: String,
    pub payload: Option<T>,
    pub error_detail: Option<String>,
}

impl<T> OperationResult<T> {
    /// Creates a successful result carrying `payload`.
    pub fn success(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            payload: Some(payload),
            error_detail: None,
        }
    }

    /// Creates a failed result with no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            payload: None,
            error_detail: None,
        }
    }

    /// Creates a failed result with an error detail code.
    pub fn failure_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            payload: None,
            error_detail: Some(detail.into()),
        }
    }

    /// True when the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.status
    }

    /// Maps the payload type, leaving status, message and detail untouched.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            status: self.status,
            message: self.message,
            payload: self.payload.map(f),
            error_detail: self.error_detail,
        }
    }

    /// Folds an error into the uniform result shape.
    ///
    /// Remote transaction errors keep the registry's message and surface
    /// their code as `error_detail`; transport errors pass their own text
    /// through unchanged.
    pub(crate) fn from_error(error: NiraError) -> Self {
        match error {
            NiraError::RemoteTransaction { message, code } => Self {
                status: false,
                message,
                payload: None,
                error_detail: code,
            },
            NiraError::Transport(e) => Self::failure(e.to_string()),
            other => Self::failure(other.to_string()),
        }
    }
}

/// Registry-side status block present in every operation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatus {
    status: String,
    password_days_left: Option<i64>,
    execution_cost: Option<f64>,
    error: Option<RemoteError>,
}

/// Error record nested inside a failed transaction status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: Option<String>,
    pub message: String,
}

impl TransactionStatus {
    /// Reads the status block out of a `return` record.
    pub fn from_return(ret: &XmlNode) -> Result<Self> {
        let block = ret
            .child("transactionStatus")
            .ok_or_else(|| NiraError::envelope("return record has no transactionStatus"))?;
        let status = block
            .child_text("transactionStatus")
            .ok_or_else(|| NiraError::envelope("transactionStatus block has no status text"))?
            .to_string();
        let error = block.child("error").map(|node| RemoteError {
            code: node.child_text("code").map(str::to_string),
            message: node.child_text("message").unwrap_or_default().to_string(),
        });

        Ok(Self {
            status,
            password_days_left: block.child_text("passwordDaysLeft").and_then(|v| v.parse().ok()),
            execution_cost: block.child_text("executionCost").and_then(|v| v.parse().ok()),
            error,
        })
    }

    /// Literal status text as sent by the registry.
    pub fn status_text(&self) -> &str {
        &self.status
    }

    /// True when the case-normalized status reads `Error`.
    ///
    /// The registry is not consistent about casing; only the first letter
    /// is normalized before the comparison.
    pub fn is_error(&self) -> bool {
        ucfirst(&self.status) == "Error"
    }

    /// Nested error record, when the registry attached one.
    pub fn error(&self) -> Option<&RemoteError> {
        self.error.as_ref()
    }

    /// Account metadata reported alongside the transaction.
    pub fn account_details(&self) -> AccountDetails {
        AccountDetails {
            password_days_left: self.password_days_left,
            execution_cost: self.execution_cost,
        }
    }

    /// Folds an error-status block into the error channel.
    pub(crate) fn to_remote_error(&self) -> NiraError {
        let (message, code) = match &self.error {
            Some(error) if !error.message.is_empty() => (error.message.clone(), error.code.clone()),
            Some(error) => (self.status.clone(), error.code.clone()),
            None => (self.status.clone(), None),
        };
        NiraError::remote(message, code)
    }
}

fn ucfirst(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Billing and credential metadata attached to registry transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountDetails {
    /// Days until the account password expires.
    pub password_days_left: Option<i64>,
    /// Cost charged for the executed query.
    pub execution_cost: Option<f64>,
}

/// Person record returned by a lookup.
///
/// Name-like fields are upper-cased the way downstream consumers expect;
/// calendar and gender fields pass through exactly as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub national_id: String,
    pub surname: Option<String>,
    pub given_names: Option<String>,
    pub maiden_names: Option<String>,
    pub previous_surnames: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_birth_estimated: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub living_status: Option<String>,
    /// Portrait as base64, exactly as transmitted.
    pub photo: Option<String>,
    /// Account metadata from the accompanying transaction status.
    pub account: AccountDetails,
}

impl Person {
    /// Maps a `return` record into a person.
    ///
    /// `nationalId` is the one field a person record cannot be missing.
    pub fn from_return(ret: &XmlNode, tx: &TransactionStatus) -> Result<Self> {
        let national_id = ret
            .child_text("nationalId")
            .ok_or_else(|| NiraError::envelope("person record has no nationalId"))?;

        Ok(Self {
            national_id: national_id.to_uppercase(),
            surname: upper(ret.child_text("surname")),
            given_names: upper(ret.child_text("givenNames")),
            maiden_names: upper(ret.child_text("maidenNames")),
            previous_surnames: upper(ret.child_text("previousSurnames")),
            date_of_birth: owned(ret.child_text("dateOfBirth")),
            date_of_birth_estimated: owned(ret.child_text("dateOfBirthEstimated")),
            gender: owned(ret.child_text("gender")),
            nationality: upper(ret.child_text("nationality")),
            living_status: upper(ret.child_text("livingStatus")),
            photo: owned(ret.child_text("photo")),
            account: tx.account_details(),
        })
    }
}

fn upper(value: Option<&str>) -> Option<String> {
    value.map(str::to_uppercase)
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Scalar fields of a `return` record, passed through unmodified.
///
/// The exact field set of the verification style operations depends on the
/// registry release, so these records carry whatever flat fields the facade
/// sent instead of modeling them one by one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryFields(BTreeMap<String, String>);

impl RegistryFields {
    /// Collects every scalar child of a `return` record except the
    /// transaction status block.
    pub fn from_return(ret: &XmlNode) -> Self {
        let mut fields = BTreeMap::new();
        for child in ret.children() {
            if child.name() == "transactionStatus" || !child.is_scalar() {
                continue;
            }
            if let Some(text) = child.text_opt() {
                fields.insert(child.name().to_string(), text.to_string());
            }
        }
        Self(fields)
    }

    /// Value of a field, if the registry sent it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome record of a person verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub fields: RegistryFields,
}

impl Verification {
    pub fn from_return(ret: &XmlNode) -> Self {
        Self {
            fields: RegistryFields::from_return(ret),
        }
    }
}

/// Voter registration details for a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoterDetails {
    pub fields: RegistryFields,
}

impl VoterDetails {
    pub fn from_return(ret: &XmlNode) -> Self {
        Self {
            fields: RegistryFields::from_return(ret),
        }
    }
}

/// Registered place of birth of a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceOfBirth {
    pub fields: RegistryFields,
}

impl PlaceOfBirth {
    pub fn from_return(ret: &XmlNode) -> Self {
        Self {
            fields: RegistryFields::from_return(ret),
        }
    }
}

/// Acknowledgement record of a password change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub fields: RegistryFields,
}

impl PasswordChange {
    pub fn from_return(ret: &XmlNode) -> Self {
        Self {
            fields: RegistryFields::from_return(ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::parse_document;

    fn person_return() -> XmlNode {
        parse_document(
            r#"<return>
                <transactionStatus>
                    <transactionStatus>Ok</transactionStatus>
                    <passwordDaysLeft>21</passwordDaysLeft>
                    <executionCost>150.5</executionCost>
                </transactionStatus>
                <nationalId>cm930123456abc</nationalId>
                <surname>Okello</surname>
                <givenNames>James Peter</givenNames>
                <dateOfBirth>1993-01-23</dateOfBirth>
                <dateOfBirthEstimated>false</dateOfBirthEstimated>
                <gender>M</gender>
                <nationality>Ug</nationality>
                <livingStatus>alive</livingStatus>
                <photo>aGVsbG8tcGhvdG8=</photo>
            </return>"#,
        )
        .unwrap()
    }

    fn error_return() -> XmlNode {
        parse_document(
            r#"<return>
                <transactionStatus>
                    <transactionStatus>error</transactionStatus>
                    <error>
                        <code>ID-404</code>
                        <message>National ID not found</message>
                    </error>
                </transactionStatus>
            </return>"#,
        )
        .unwrap()
    }

    #[test]
    fn transaction_status_reads_account_metadata() {
        let tx = TransactionStatus::from_return(&person_return()).unwrap();

        assert_eq!(tx.status_text(), "Ok");
        assert!(!tx.is_error());
        assert_eq!(tx.account_details().password_days_left, Some(21));
        assert_eq!(tx.account_details().execution_cost, Some(150.5));
    }

    #[test]
    fn error_status_is_detected_case_insensitively_on_first_letter() {
        let tx = TransactionStatus::from_return(&error_return()).unwrap();
        assert!(tx.is_error());

        let err = tx.to_remote_error();
        match err {
            NiraError::RemoteTransaction { message, code } => {
                assert_eq!(message, "National ID not found");
                assert_eq!(code.as_deref(), Some("ID-404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_without_message_falls_back_to_status_text() {
        let ret = parse_document(
            r#"<return><transactionStatus><transactionStatus>Error</transactionStatus></transactionStatus></return>"#,
        )
        .unwrap();
        let tx = TransactionStatus::from_return(&ret).unwrap();

        match tx.to_remote_error() {
            NiraError::RemoteTransaction { message, code } => {
                assert_eq!(message, "Error");
                assert_eq!(code, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_status_block_is_an_envelope_error() {
        let ret = parse_document("<return><surname>A</surname></return>").unwrap();
        assert!(TransactionStatus::from_return(&ret).is_err());
    }

    #[test]
    fn person_mapping_uppercases_names_only() {
        let ret = person_return();
        let tx = TransactionStatus::from_return(&ret).unwrap();
        let person = Person::from_return(&ret, &tx).unwrap();

        assert_eq!(person.national_id, "CM930123456ABC");
        assert_eq!(person.surname.as_deref(), Some("OKELLO"));
        assert_eq!(person.given_names.as_deref(), Some("JAMES PETER"));
        assert_eq!(person.nationality.as_deref(), Some("UG"));
        assert_eq!(person.living_status.as_deref(), Some("ALIVE"));

        assert_eq!(person.date_of_birth.as_deref(), Some("1993-01-23"));
        assert_eq!(person.date_of_birth_estimated.as_deref(), Some("false"));
        assert_eq!(person.gender.as_deref(), Some("M"));

        assert_eq!(person.maiden_names, None);
        assert_eq!(person.photo.as_deref(), Some("aGVsbG8tcGhvdG8="));
        assert_eq!(person.account.password_days_left, Some(21));
    }

    #[test]
    fn person_without_national_id_is_rejected() {
        let ret = parse_document(
            r#"<return><transactionStatus><transactionStatus>Ok</transactionStatus></transactionStatus><surname>A</surname></return>"#,
        )
        .unwrap();
        let tx = TransactionStatus::from_return(&ret).unwrap();
        assert!(Person::from_return(&ret, &tx).is_err());
    }

    #[test]
    fn registry_fields_skip_status_block_and_nested_records() {
        let ret = parse_document(
            r#"<return>
                <transactionStatus><transactionStatus>Ok</transactionStatus></transactionStatus>
                <matchingStatus>true</matchingStatus>
                <cardStatus>VALID</cardStatus>
                <nested><inner>x</inner></nested>
            </return>"#,
        )
        .unwrap();
        let fields = RegistryFields::from_return(&ret);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("matchingStatus"), Some("true"));
        assert_eq!(fields.get("cardStatus"), Some("VALID"));
        assert_eq!(fields.get("transactionStatus"), None);
        assert_eq!(fields.get("nested"), None);
    }

    #[test]
    fn from_error_keeps_remote_message_and_code() {
        let result: OperationResult<Person> =
            OperationResult::from_error(NiraError::remote("boom", Some("X-1".into())));

        assert!(!result.status);
        assert_eq!(result.message, "boom");
        assert_eq!(result.error_detail.as_deref(), Some("X-1"));
        assert_eq!(result.payload, None);
    }

    #[test]
    fn map_payload_preserves_result_shape() {
        let result = OperationResult::success("Ok", 2u32).map_payload(|n| n * 10);
        assert!(result.status);
        assert_eq!(result.payload, Some(20));

        let failed: OperationResult<u32> = OperationResult::failure("nope");
        let mapped = failed.map_payload(|n| n + 1);
        assert_eq!(mapped.payload, None);
        assert_eq!(mapped.message, "nope");
    }
}
