//! XML to JSON conversion for SOAP and Bulk API payloads.
//!
//! Documents are flattened into [`serde_json::Value`] keyed by local element
//! names, so namespace prefixes (`soapenv:`, `sf:`) disappear:
//!
//! - an element with no child elements becomes a string of its text
//! - an element with children becomes an object
//! - repeated siblings become an array
//! - `xsi:nil="true"` becomes `null`
//!
//! Attributes other than `xsi:nil` are dropped. Mixed content keeps only the
//! child elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

struct Node {
    name: String,
    children: Map<String, Value>,
    text: String,
    nil: bool,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Self {
        Self {
            name: local_name(start),
            children: Map::new(),
            text: String::new(),
            nil: is_nil(start),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if !self.children.is_empty() {
            Value::Object(self.children)
        } else if self.nil {
            Value::Null
        } else {
            Value::String(self.text)
        };
        (self.name, value)
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn is_nil(start: &BytesStart<'_>) -> bool {
    start.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true"
    })
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Parse an XML document into `(root element name, value)`.
pub fn parse_document(xml: &str) -> Result<(String, Value)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Node::open(&start)),
            Event::Empty(start) => {
                let (name, value) = Node::open(&start).into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    return Err(Error::new(ErrorKind::Xml(
                        "unexpected closing tag".to_string(),
                    )));
                };
                let (name, value) = node.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::new(ErrorKind::Xml(
            "document ended inside an element".to_string(),
        )));
    }

    root.ok_or_else(|| Error::new(ErrorKind::Xml("document has no root element".to_string())))
}

/// Parse an XML document and return only the root element's value.
pub fn to_json(xml: &str) -> Result<Value> {
    parse_document(xml).map(|(_, value)| value)
}

/// Walk a converted document by local element names.
///
/// ```rust
/// use busbar_sf_client::xml;
///
/// let doc = xml::to_json("<a><b><c>1</c></b></a>").unwrap();
/// assert_eq!(xml::find(&doc, &["b", "c"]).and_then(|v| v.as_str()), Some("1"));
/// ```
pub fn find<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| current.get(*segment))
}

/// Wrap a single value or an array into a list.
pub fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespaces_are_stripped() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
              <soapenv:Body>
                <loginResponse><result><userId>005xx</userId></result></loginResponse>
              </soapenv:Body>
            </soapenv:Envelope>"#;

        let (root, value) = parse_document(xml).unwrap();
        assert_eq!(root, "Envelope");
        assert_eq!(
            find(&value, &["Body", "loginResponse", "result", "userId"]),
            Some(&json!("005xx"))
        );
    }

    #[test]
    fn test_repeated_elements_become_arrays() {
        let xml = "<result-list><result>752a</result><result>752b</result></result-list>";
        let value = to_json(xml).unwrap();
        assert_eq!(value, json!({"result": ["752a", "752b"]}));
    }

    #[test]
    fn test_nil_and_empty_elements() {
        let xml = r#"<records xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <Id>003x</Id><Email xsi:nil="true"/><Title/></records>"#;
        let value = to_json(xml).unwrap();
        assert_eq!(value, json!({"Id": "003x", "Email": null, "Title": ""}));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let value = to_json("<a><name>Smith &amp; Sons</name></a>").unwrap();
        assert_eq!(value["name"], "Smith & Sons");
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(to_json("<a><b></a>").is_err());
        assert!(to_json("").is_err());
    }

    #[test]
    fn test_as_list() {
        assert_eq!(as_list(json!("x")), vec![json!("x")]);
        assert_eq!(as_list(json!(["x", "y"])).len(), 2);
        assert!(as_list(Value::Null).is_empty());
    }
}
