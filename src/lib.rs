/*!
# NIRA Client

A client for the SOAP facade of Uganda's National Identification and
Registration Authority (NIRA) third-party interface.

The facade authenticates every call with a WS-Security `UsernameToken`
whose password digest covers the SHA-1 hash of the account password, and
answers with records wrapped in a `transactionStatus` block. This crate
takes care of the whole exchange: token derivation, envelope assembly,
transport, fault handling and mapping of responses into typed records.

## Features

- WS-Security `UsernameToken` with the registry's digest variant
- Fixed UTC+3 timestamping with the dual offset rendering the facade
  requires
- Authentication contexts that are established once and replayed, with
  explicit refresh
- Person lookup mapped into a typed record, verification style
  operations passed through field by field
- Password rotation with RSA encryption under the operator's public key
  (SPKI, PKCS#1 or certificate PEM)
- Business rejections and local failures folded into one uniform
  operation result
- A scripted transport double for testing integrations without a live
  facade

## Quick Start

```rust,no_run
use nira_client::{NiraClient, NiraConfig};

# #[tokio::main]
# async fn main() -> Result<(), Box<dyn std::error::Error>> {
let config = NiraConfig::new(
    "EMP0001",
    "secret",
    "10.0.4.23:8080",
    "nira/services",
    "http://facade.nira.example/",
);

let client = NiraClient::connect(config)?;

let result = client.lookup_person("CM930123456ABC").await;
if result.is_success() {
    if let Some(person) = result.payload {
        println!("{}: {:?}", person.national_id, person.surname);
    }
} else {
    eprintln!("lookup failed: {}", result.message);
}
# Ok(())
# }
```

## Testing

[`testing::MockTransport`] stands in for the HTTP transport, so
integrations can be exercised without a live facade:

```rust,no_run
use nira_client::{NiraClient, NiraConfig};
use nira_client::testing::MockTransport;

# fn demo() -> Result<(), Box<dyn std::error::Error>> {
let mock = MockTransport::new().with_response("<Envelope>...</Envelope>");
let observer = mock.clone();

let config = NiraConfig::new("EMP0001", "secret", "host", "path", "ns");
let client = NiraClient::with_transport(config, mock)?;
# let _ = (client, observer);
# Ok(())
# }
```

## Security Considerations

- The account password never travels in the clear; only its digest does
- Replacement passwords are encrypted under the operator's RSA key
  before they leave the process
- Response parsing rejects DOCTYPE declarations outright
- Keep the `NIRA_*` environment variables out of logs and shell history
*/

pub mod client;
pub mod config;
pub mod encryption;
pub mod errors;
pub mod response;
pub mod soap;
pub mod testing;
pub mod transport;
pub mod ws_security;

pub use client::{
    NiraClient, OP_CHANGE_PASSWORD, OP_GET_PERSON, OP_GET_PLACE_OF_BIRTH, OP_GET_VOTER_DETAILS,
    OP_VERIFY_PERSON,
};
pub use config::{ConfigError, Credentials, NiraConfig};
pub use errors::{NiraError, Result};
pub use response::{
    AccountDetails, OperationResult, PasswordChange, Person, PlaceOfBirth, RegistryFields,
    RemoteError, TransactionStatus, Verification, VoterDetails,
};
pub use soap::{RequestBody, XmlNode};
pub use testing::MockTransport;
pub use transport::{HttpTransport, SoapTransport};
pub use ws_security::{AuthContext, Created, SecurityHeader};
