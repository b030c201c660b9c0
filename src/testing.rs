//! Testing utilities for the registry client.
//!
//! [`MockTransport`] is a scripted [`SoapTransport`] double. Responses are
//! queued up front and handed out in order; every call is recorded with the
//! exact request body and security token it carried, so tests can assert on
//! what would have gone over the wire.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::{NiraError, Result};
use crate::soap::{self, RequestBody, XmlNode};
use crate::transport::SoapTransport;
use crate::ws_security::SecurityHeader;

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Operation name the call targeted.
    pub operation: String,
    /// Request record as handed to the transport.
    pub body: RequestBody,
    /// Security token that accompanied the call.
    pub token: SecurityHeader,
}

#[derive(Debug)]
enum Scripted {
    Document(String),
    Failure(String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Scripted transport double.
///
/// Cloning shares the script and the call log, so a test can keep one clone
/// for assertions after handing the other to
/// [`NiraClient::with_transport`](crate::client::NiraClient::with_transport).
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockState>,
}

impl MockTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response document for the next unanswered call.
    pub fn with_response(self, xml: impl Into<String>) -> Self {
        lock(&self.inner.responses).push_back(Scripted::Document(xml.into()));
        self
    }

    /// Queues a transport failure for the next unanswered call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.inner.responses).push_back(Scripted::Failure(message.into()));
        self
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.inner.calls).clone()
    }

    /// Number of calls recorded so far.
    pub fn call_count(&self) -> usize {
        lock(&self.inner.calls).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SoapTransport for MockTransport {
    async fn call(
        &self,
        operation: &str,
        body: &RequestBody,
        token: &SecurityHeader,
    ) -> Result<XmlNode> {
        lock(&self.inner.calls).push(RecordedCall {
            operation: operation.to_string(),
            body: body.clone(),
            token: token.clone(),
        });

        let next = lock(&self.inner.responses).pop_front();
        match next {
            Some(Scripted::Document(xml)) => soap::parse_document(&xml),
            Some(Scripted::Failure(message)) => Err(NiraError::envelope(message)),
            None => Err(NiraError::envelope(
                "mock transport has no scripted response left",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecurityHeader {
        SecurityHeader {
            username: "EMP0001".to_string(),
            password_digest: "digest".to_string(),
            nonce: "bm9uY2U=".to_string(),
            created: "2024-01-01T00:00:00.000+03:00".to_string(),
            wsu_id: "UsernameToken-1".to_string(),
        }
    }

    #[tokio::test]
    async fn scripted_responses_are_served_in_order() {
        let mock = MockTransport::new()
            .with_response("<first/>")
            .with_response("<second/>");

        let body = RequestBody::new();
        let first = mock.call("getPerson", &body, &token()).await.unwrap();
        let second = mock.call("getPerson", &body, &token()).await.unwrap();

        assert_eq!(first.name(), "first");
        assert_eq!(second.name(), "second");
    }

    #[tokio::test]
    async fn exhausted_script_fails_the_call() {
        let mock = MockTransport::new();
        let err = mock
            .call("getPerson", &RequestBody::new(), &token())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no scripted response"));
    }

    #[tokio::test]
    async fn calls_are_recorded_with_body_and_token() {
        let mock = MockTransport::new().with_failure("scripted outage");
        let observer = mock.clone();

        let body = RequestBody::new().field("nationalId", "CM930123456ABC");
        let _ = mock.call("verifyPerson", &body, &token()).await;

        let calls = observer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, "verifyPerson");
        assert_eq!(
            calls[0].body.fields(),
            &[("nationalId".to_string(), "CM930123456ABC".to_string())]
        );
        assert_eq!(calls[0].token.username, "EMP0001");
    }
}
