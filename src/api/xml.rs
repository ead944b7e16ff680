//! XML-to-tree conversion for ShareASale report bodies
//!
//! Reports have no fixed schema, so the body is mirrored into a generic
//! [`ApiResponse`] tree. The document element itself is not a key: its content
//! is the tree. Attributes are ignored.

use indexmap::map::Entry;
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// A parsed report node
///
/// Serializes untagged, so a cached tree reads as plain JSON strings, arrays
/// and objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Leaf element text (empty for an empty element)
    Text(String),
    /// Sibling elements that shared one tag, in document order
    List(Vec<ApiResponse>),
    /// Child elements keyed by tag, in document order
    Node(IndexMap<String, ApiResponse>),
}

impl ApiResponse {
    /// Returns the child at `key` when this is a node
    pub fn get(&self, key: &str) -> Option<&ApiResponse> {
        match self {
            ApiResponse::Node(children) => children.get(key),
            _ => None,
        }
    }

    /// Walks a path of keys from this node
    #[cfg(test)]
    pub fn path(&self, keys: &[&str]) -> Option<&ApiResponse> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// True for an empty leaf, list or node
    pub fn is_empty(&self) -> bool {
        match self {
            ApiResponse::Text(text) => text.is_empty(),
            ApiResponse::List(items) => items.is_empty(),
            ApiResponse::Node(children) => children.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ApiResponse]> {
        match self {
            ApiResponse::List(items) => Some(items),
            _ => None,
        }
    }
}

/// An element still open while reading
#[derive(Default)]
struct Frame {
    name: String,
    text: String,
    children: Vec<(String, ApiResponse)>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn into_value(self) -> ApiResponse {
        if self.children.is_empty() {
            return ApiResponse::Text(self.text);
        }

        let mut node = IndexMap::new();
        for (name, value) in self.children {
            insert_child(&mut node, name, value);
        }
        ApiResponse::Node(node)
    }
}

/// Adds a child, folding a repeated tag into a list instead of overwriting it
fn insert_child(node: &mut IndexMap<String, ApiResponse>, name: String, value: ApiResponse) {
    match node.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            ApiResponse::List(items) => items.push(value),
            existing => {
                let first = std::mem::replace(existing, ApiResponse::List(Vec::new()));
                *existing = ApiResponse::List(vec![first, value]);
            }
        },
    }
}

/// Parses an XML report body into a tree
///
/// # Returns
/// * `Ok(ApiResponse)` - the content of the document element
/// * `Err(ApiError::Parse)` - if the body is not a single well-formed element
pub fn parse_xml(xml: &str) -> Result<ApiResponse, ApiError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<ApiResponse> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(ApiError::Parse("multiple root elements".to_string()));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Frame::new(name));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, ApiResponse::Text(String::new()))),
                    None if root.is_none() => root = Some(ApiResponse::Text(String::new())),
                    None => return Err(ApiError::Parse("multiple root elements".to_string())),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| ApiError::Parse(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&bytes))?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ApiError::Parse("unexpected closing tag".to_string()))?;
                let name = frame.name.clone();
                let value = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, value)),
                    None => root = Some(value),
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ApiError::Parse(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| ApiError::Parse("document has no root element".to_string()))
}

fn append_text(stack: &mut [Frame], text: &str) -> Result<(), ApiError> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ApiError::Parse("text outside the root element".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> ApiResponse {
        ApiResponse::Text(value.to_string())
    }

    #[test]
    fn test_parse_report_document() {
        let tree = parse_xml(
            "<result><total>42</total><rows><row>A</row><row>B</row></rows></result>",
        )
        .expect("well-formed document should parse");

        assert_eq!(tree.get("total"), Some(&text("42")));
        assert_eq!(
            tree.path(&["rows", "row"]).and_then(ApiResponse::as_list),
            Some(&[text("A"), text("B")][..])
        );
    }

    #[test]
    fn test_single_children_nest_as_nodes() {
        let tree = parse_xml(
            "<?xml version=\"1.0\"?><report><summary><clicks>10</clicks><sales>2</sales></summary></report>",
        )
        .unwrap();

        let summary = tree.get("summary").unwrap();
        assert_eq!(summary.get("clicks"), Some(&text("10")));
        assert_eq!(summary.get("sales"), Some(&text("2")));
        assert_eq!(tree.path(&["summary", "sales"]).and_then(ApiResponse::as_text), Some("2"));
    }

    #[test]
    fn test_node_keeps_document_order() {
        let tree = parse_xml("<r><zeta>1</zeta><alpha>2</alpha><mid>3</mid></r>").unwrap();

        let ApiResponse::Node(children) = tree else {
            panic!("expected a node");
        };
        let keys: Vec<&str> = children.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_repeated_rows_are_kept_in_order() {
        let tree = parse_xml(
            "<activity><row><id>1</id></row><row><id>2</id></row><row><id>3</id></row></activity>",
        )
        .unwrap();

        let rows = tree.get("row").and_then(ApiResponse::as_list).unwrap();
        let ids: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(ApiResponse::as_text))
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_elements_become_empty_text() {
        let tree = parse_xml("<r><a/><b></b><c>  </c></r>").unwrap();

        assert_eq!(tree.get("a"), Some(&text("")));
        assert_eq!(tree.get("b"), Some(&text("")));
        assert_eq!(tree.get("c"), Some(&text("")));
    }

    #[test]
    fn test_childless_root_is_empty() {
        assert!(parse_xml("<apitokencount/>").unwrap().is_empty());
        assert!(!parse_xml("<apitokencount>150</apitokencount>").unwrap().is_empty());
        assert!(!parse_xml("<r><a/></r>").unwrap().is_empty());
        assert!(ApiResponse::List(Vec::new()).is_empty());
        assert!(ApiResponse::Node(IndexMap::new()).is_empty());
    }

    #[test]
    fn test_attributes_are_ignored() {
        let tree = parse_xml(r#"<r version="1.8"><count unit="calls">150</count></r>"#).unwrap();
        assert_eq!(tree.get("count"), Some(&text("150")));
    }

    #[test]
    fn test_entities_and_cdata_are_decoded() {
        let tree =
            parse_xml("<r><name>Tom &amp; Jerry</name><note><![CDATA[<b>bold</b>]]></note></r>").unwrap();

        assert_eq!(tree.get("name"), Some(&text("Tom & Jerry")));
        assert_eq!(tree.get("note"), Some(&text("<b>bold</b>")));
    }

    #[test]
    fn test_leaf_root_is_text() {
        assert_eq!(parse_xml("<count>7</count>").unwrap(), text("7"));
        assert_eq!(parse_xml("<count/>").unwrap(), text(""));
    }

    #[test]
    fn test_malformed_documents_fail() {
        for body in [
            "<r><a>1</b></r>",
            "<r><a>1</a>",
            "",
            "plain text body",
            "<a>1</a><b>2</b>",
        ] {
            let result = parse_xml(body);
            assert!(
                matches!(result, Err(ApiError::Parse(_))),
                "expected parse error for {:?}, got {:?}",
                body,
                result
            );
        }
    }

    #[test]
    fn test_tree_serializes_as_plain_json() {
        let tree = parse_xml("<r><total>42</total><row>A</row><row>B</row></r>").unwrap();
        let json = serde_json::to_string(&tree).unwrap();

        assert_eq!(json, r#"{"total":"42","row":["A","B"]}"#);
        let back: ApiResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
