//! Wire-level checks of the security header against reference token
//! material captured from the registry facade.

use chrono::{TimeZone, Utc};
use nira_client::soap::build_envelope;
use nira_client::ws_security::{
    compute_password_digest, NONCE_ENCODING_TYPE, PASSWORD_DIGEST_TYPE, WSSE_NS, WSU_NS,
};
use nira_client::{AuthContext, Created, Credentials, RequestBody, SecurityHeader};

fn reference_token() -> SecurityHeader {
    SecurityHeader {
        username: "EMP0001".to_string(),
        password_digest: "KvkCwovUp7gyhG3I7WaOWmo4zAg=".to_string(),
        nonce: "AAAAAAAAAAAAAAAAAAAAAA==".to_string(),
        created: "2024-01-01T00:00:00.000+03:00".to_string(),
        wsu_id: "UsernameToken-1".to_string(),
    }
}

#[test]
fn reference_digest_is_reproduced() {
    let digest = compute_password_digest(
        "AAAAAAAAAAAAAAAAAAAAAA==",
        "2024-01-01T00:00:00.000+0300",
        "secret",
    )
    .unwrap();
    assert_eq!(digest, reference_token().password_digest);
}

#[test]
fn token_serializes_to_the_reference_shape() {
    let expected = format!(
        r#"<wsse:UsernameToken xmlns:wsse="{WSSE_NS}" xmlns:wsu="{WSU_NS}" wsu:Id="UsernameToken-1"><wsse:Username>EMP0001</wsse:Username><wsse:Password Type="{PASSWORD_DIGEST_TYPE}">KvkCwovUp7gyhG3I7WaOWmo4zAg=</wsse:Password><wsse:Nonce EncodingType="{NONCE_ENCODING_TYPE}">AAAAAAAAAAAAAAAAAAAAAA==</wsse:Nonce><wsse:Created>2024-01-01T00:00:00.000+03:00</wsse:Created></wsse:UsernameToken>"#
    );
    assert_eq!(reference_token().to_xml(), expected);
}

#[test]
fn context_established_at_a_fixed_instant_reproduces_reference_material() {
    let credentials = Credentials::new("EMP0001", "secret");
    let instant = Utc.with_ymd_and_hms(2023, 12, 31, 21, 0, 0).unwrap();
    let context =
        AuthContext::establish_at(&credentials, Created::from_instant(instant)).unwrap();
    let header = context.header();

    assert_eq!(header.created, "2024-01-01T00:00:00.000+03:00");

    let recomputed =
        compute_password_digest(&header.nonce, "2024-01-01T00:00:00.000+0300", "secret").unwrap();
    assert_eq!(header.password_digest, recomputed);
}

#[test]
fn envelope_places_the_token_directly_under_the_header() {
    let token = reference_token();
    let body = RequestBody::new().field("nationalId", "CM930123456ABC");
    let xml = build_envelope(
        "http://facade.registry.internal/",
        "getPerson",
        &body,
        &token,
    );

    assert!(xml.contains("<soapenv:Header><wsse:UsernameToken"));
    assert!(xml.contains("</wsse:UsernameToken></soapenv:Header>"));
    assert!(!xml.contains("wsse:Security"));
    assert!(xml.contains(
        "<tns:getPerson><tns:request><nationalId>CM930123456ABC</nationalId></tns:request></tns:getPerson>"
    ));

    let header_at = xml.find("<soapenv:Header>").unwrap();
    let body_at = xml.find("<soapenv:Body>").unwrap();
    assert!(header_at < body_at);
}

#[test]
fn each_context_gets_a_distinct_token_id() {
    let credentials = Credentials::new("EMP0001", "secret");
    let first = AuthContext::establish(&credentials).unwrap();
    let second = AuthContext::establish(&credentials).unwrap();

    assert!(first.header().wsu_id.starts_with("UsernameToken-"));
    assert_ne!(first.header().wsu_id, second.header().wsu_id);
}
