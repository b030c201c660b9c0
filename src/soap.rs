//! SOAP 1.1 envelope assembly and response parsing.
//!
//! Requests are rendered from templates. Responses are walked into a small
//! element tree keyed on local names, so serverside prefix choices (`ns2:`,
//! `soap:`, none at all) never matter to the mapping layer.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::{NiraError, Result};
use crate::ws_security::SecurityHeader;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Parser recursion guard; registry responses are shallow in practice.
const MAX_DEPTH: usize = 64;

/// Fields of the `request` record sent inside an operation element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBody {
    fields: Vec<(String, String)>,
}

impl RequestBody {
    /// Creates an empty request record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scalar field, keeping insertion order on the wire.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    // The request record is qualified in the facade namespace; its scalar
    // fields stay unqualified.
    fn render(&self) -> String {
        let mut xml = String::from("<tns:request>");
        for (name, value) in &self.fields {
            xml.push('<');
            xml.push_str(name);
            xml.push('>');
            xml.push_str(&xml_escape(value));
            xml.push_str("</");
            xml.push_str(name);
            xml.push('>');
        }
        xml.push_str("</tns:request>");
        xml
    }
}

/// Renders a full request envelope for `operation` in the facade namespace.
pub fn build_envelope(
    namespace: &str,
    operation: &str,
    body: &RequestBody,
    token: &SecurityHeader,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="{env}" xmlns:tns="{ns}"><soapenv:Header>{token}</soapenv:Header><soapenv:Body><tns:{op}>{request}</tns:{op}></soapenv:Body></soapenv:Envelope>"#,
        env = SOAP_ENVELOPE_NS,
        ns = xml_escape(namespace),
        token = token.to_xml(),
        op = operation,
        request = body.render(),
    )
}

/// Escapes the five XML-reserved characters for element or attribute text.
pub fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// One element of a parsed response, with namespace prefixes stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Local element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenated character data directly inside this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Element text, or `None` when the element is empty.
    pub fn text_opt(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text.as_str())
        }
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Non-empty text of the first direct child with the given local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(XmlNode::text_opt)
    }

    /// Depth-first search for the first element with the given local name,
    /// starting at this element.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// True when the element has no child elements of its own.
    pub fn is_scalar(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parses a response document into an element tree rooted at its single
/// top-level element.
pub fn parse_document(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(NiraError::envelope(
                        "response nesting exceeds supported depth",
                    ));
                }
                stack.push(XmlNode::named(local_name(start.local_name().as_ref())));
            }
            Ok(Event::Empty(empty)) => {
                let node = XmlNode::named(local_name(empty.local_name().as_ref()));
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| NiraError::envelope("unbalanced closing tag in response"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(open) = stack.last_mut() {
                    let value = text.unescape().map_err(|e| {
                        NiraError::envelope(format!("bad character data in response: {e}"))
                    })?;
                    open.text.push_str(&value);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(open) = stack.last_mut() {
                    open.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::DocType(_)) => {
                return Err(NiraError::envelope(
                    "DOCTYPE declarations are not accepted in responses",
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(NiraError::envelope(format!("malformed response XML: {e}"))),
        }
    }

    if !stack.is_empty() {
        return Err(NiraError::envelope(
            "response XML ended inside an open element",
        ));
    }
    root.ok_or_else(|| NiraError::envelope("response contains no XML document"))
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(NiraError::envelope(
                "response contains multiple document roots",
            ))
        }
    }
    Ok(())
}

/// Extracts the human readable message of a SOAP fault, if the body carries
/// one.
pub fn fault_message(document: &XmlNode) -> Option<String> {
    let fault = document.find("Body").and_then(|body| body.child("Fault"))?;
    let message = fault
        .child_text("faultstring")
        .or_else(|| fault.child("Reason").and_then(|r| r.child_text("Text")))
        .unwrap_or("registry returned an unspecified SOAP fault");
    Some(message.to_string())
}

/// Locates the `return` record of an operation response.
pub fn return_node(document: &XmlNode) -> Result<&XmlNode> {
    let body = document
        .find("Body")
        .ok_or_else(|| NiraError::envelope("response envelope has no Body"))?;
    body.find("return")
        .ok_or_else(|| NiraError::envelope("operation response has no return record"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::ws_security::AuthContext;

    const PERSON_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:getPersonResponse xmlns:ns2="http://facade.registry.example/">
      <return>
        <transactionStatus>
          <transactionStatus>Ok</transactionStatus>
        </transactionStatus>
        <surname>Okello</surname>
        <photo/>
      </return>
    </ns2:getPersonResponse>
  </soap:Body>
</soap:Envelope>"#;

    const FAULT_RESPONSE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>Authentication failed</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    fn token() -> SecurityHeader {
        AuthContext::establish(&Credentials::new("EMP0001", "secret"))
            .unwrap()
            .header()
            .clone()
    }

    #[test]
    fn prefixes_are_stripped_from_parsed_elements() {
        let document = parse_document(PERSON_RESPONSE).unwrap();
        assert_eq!(document.name(), "Envelope");

        let response = document.find("getPersonResponse").unwrap();
        assert_eq!(response.name(), "getPersonResponse");
    }

    #[test]
    fn child_lookup_walks_local_names() {
        let document = parse_document(PERSON_RESPONSE).unwrap();
        let ret = return_node(&document).unwrap();

        assert_eq!(ret.child_text("surname"), Some("Okello"));
        assert_eq!(
            ret.child("transactionStatus")
                .and_then(|ts| ts.child_text("transactionStatus")),
            Some("Ok")
        );
    }

    #[test]
    fn empty_elements_have_no_text() {
        let document = parse_document(PERSON_RESPONSE).unwrap();
        let ret = return_node(&document).unwrap();

        let photo = ret.child("photo").unwrap();
        assert!(photo.is_scalar());
        assert_eq!(photo.text_opt(), None);
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let document =
            parse_document("<root><note>Tom &amp; Jerry &lt;3</note></root>").unwrap();
        assert_eq!(document.child_text("note"), Some("Tom & Jerry <3"));
    }

    #[test]
    fn text_gathers_segments_around_child_elements() {
        let document = parse_document("<note>before<hr/>after</note>").unwrap();
        assert_eq!(document.text(), "beforeafter");
        assert_eq!(document.children().len(), 1);
    }

    #[test]
    fn doctype_is_rejected() {
        let err = parse_document("<!DOCTYPE root><root/>").unwrap_err();
        assert!(err.to_string().contains("DOCTYPE"));
    }

    #[test]
    fn truncated_document_is_rejected() {
        assert!(parse_document("<root><open>").is_err());
    }

    #[test]
    fn multiple_roots_are_rejected() {
        assert!(parse_document("<a/><b/>").is_err());
    }

    #[test]
    fn fault_message_is_extracted() {
        let document = parse_document(FAULT_RESPONSE).unwrap();
        assert_eq!(
            fault_message(&document).as_deref(),
            Some("Authentication failed")
        );

        let ok = parse_document(PERSON_RESPONSE).unwrap();
        assert_eq!(fault_message(&ok), None);
    }

    #[test]
    fn missing_return_is_an_envelope_error() {
        let document = parse_document(
            r#"<Envelope><Body><getPersonResponse/></Body></Envelope>"#,
        )
        .unwrap();
        let err = return_node(&document).unwrap_err();
        assert!(err.to_string().contains("return"));
    }

    #[test]
    fn envelope_carries_token_and_request_fields() {
        let token = token();
        let body = RequestBody::new().field("nationalId", "CM930123456ABC");
        let xml = build_envelope("http://facade.registry.example/", "getPerson", &body, &token);

        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert!(xml.contains("<soapenv:Header><wsse:UsernameToken"));
        assert!(xml.contains("<tns:getPerson><tns:request><nationalId>CM930123456ABC</nationalId></tns:request></tns:getPerson>"));
        assert!(xml.contains(r#"xmlns:tns="http://facade.registry.example/""#));
    }

    #[test]
    fn request_field_values_are_escaped() {
        let token = token();
        let body = RequestBody::new().field("nationalId", "A<B>&C");
        let xml = build_envelope("http://ns.example/", "getPerson", &body, &token);

        assert!(xml.contains("<nationalId>A&lt;B&gt;&amp;C</nationalId>"));
    }

    #[test]
    fn request_envelope_parses_back() {
        let token = token();
        let body = RequestBody::new().field("newPassword", "abc123");
        let xml = build_envelope("http://ns.example/", "changePassword", &body, &token);

        let document = parse_document(&xml).unwrap();
        let operation = document.find("changePassword").unwrap();
        assert_eq!(
            operation.child("request").and_then(|r| r.child_text("newPassword")),
            Some("abc123")
        );
        assert_eq!(
            document
                .find("UsernameToken")
                .and_then(|t| t.child_text("Username")),
            Some("EMP0001")
        );
    }
}
