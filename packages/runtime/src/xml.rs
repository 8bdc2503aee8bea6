//! Reader and writer for the block interchange XML dialect.
//!
//! The interchange format is a constrained subset of XML: elements,
//! attributes, text content and the five standard entities. Processing
//! instructions and comments are skipped on input. The writer always emits
//! text that this reader parses back to an equal element tree.

use std::fmt;

use thiserror::Error;

/// Errors raised while parsing interchange XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character '{found}' at offset {at}")]
    Unexpected { found: char, at: usize },

    #[error("invalid name at offset {0}")]
    InvalidName(usize),

    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },

    #[error("unknown entity '&{0};'")]
    UnknownEntity(String),

    #[error("document has no root element")]
    NoRoot,
}

/// One element of an interchange document.
///
/// Text content is collected into a single slot; whitespace-only runs
/// between child elements are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Parse a document into its root element.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        Parser::new(input).parse_document()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value for the name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Serialize to interchange XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape_text(&self.text));
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_xml())
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn parse_document(&mut self) -> Result<XmlElement, XmlError> {
        self.skip_misc()?;
        if self.peek().is_none() {
            return Err(XmlError::NoRoot);
        }
        let root = self.parse_element()?;
        self.skip_misc()?;
        match self.peek() {
            None => Ok(root),
            Some(found) => Err(XmlError::Unexpected {
                found,
                at: self.pos,
            }),
        }
    }

    /// Skip whitespace, comments and processing instructions.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.pos += 1;
            }
            if self.lookahead("<?") {
                self.consume_until("?>")?;
            } else if self.lookahead("<!--") {
                self.consume_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self) -> Result<XmlElement, XmlError> {
        self.expect('<')?;
        let tag = self.parse_name()?;
        let mut element = XmlElement::new(tag);

        loop {
            self.skip_whitespace();
            match self.peek().ok_or(XmlError::UnexpectedEof)? {
                '/' => {
                    self.pos += 1;
                    self.expect('>')?;
                    return Ok(element);
                }
                '>' => {
                    self.pos += 1;
                    break;
                }
                c if is_name_start(c) => {
                    let name = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    let value = self.parse_quoted()?;
                    element.attributes.push((name, value));
                }
                found => {
                    return Err(XmlError::Unexpected {
                        found,
                        at: self.pos,
                    })
                }
            }
        }

        self.parse_content(&mut element)?;
        Ok(element)
    }

    fn parse_content(&mut self, element: &mut XmlElement) -> Result<(), XmlError> {
        let mut text = String::new();
        loop {
            match self.peek().ok_or(XmlError::UnexpectedEof)? {
                '<' => {
                    if self.lookahead("</") {
                        self.pos += 2;
                        let found = self.parse_name()?;
                        self.skip_whitespace();
                        self.expect('>')?;
                        if found != element.tag {
                            return Err(XmlError::MismatchedTag {
                                expected: element.tag.clone(),
                                found,
                            });
                        }
                        let trimmed = text.trim();
                        element.text = trimmed.to_string();
                        return Ok(());
                    } else if self.lookahead("<!--") {
                        self.consume_until("-->")?;
                    } else {
                        let child = self.parse_element()?;
                        element.children.push(child);
                    }
                }
                '&' => text.push(self.parse_entity()?),
                c => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => self.pos += 1,
            _ => return Err(XmlError::InvalidName(start)),
        }
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_quoted(&mut self) -> Result<String, XmlError> {
        let quote = match self.peek().ok_or(XmlError::UnexpectedEof)? {
            c @ ('"' | '\'') => c,
            found => {
                return Err(XmlError::Unexpected {
                    found,
                    at: self.pos,
                })
            }
        };
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek().ok_or(XmlError::UnexpectedEof)? {
                c if c == quote => {
                    self.pos += 1;
                    return Ok(value);
                }
                '&' => value.push(self.parse_entity()?),
                c => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_entity(&mut self) -> Result<char, XmlError> {
        self.expect('&')?;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c != ';') {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(XmlError::UnexpectedEof);
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1; // consume ';'
        match name.as_str() {
            "amp" => Ok('&'),
            "lt" => Ok('<'),
            "gt" => Ok('>'),
            "quot" => Ok('"'),
            "apos" => Ok('\''),
            _ => Err(XmlError::UnknownEntity(name)),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, expected: char) -> Result<(), XmlError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(XmlError::Unexpected {
                found,
                at: self.pos,
            }),
            None => Err(XmlError::UnexpectedEof),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn lookahead(&self, expected: &str) -> bool {
        expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn consume_until(&mut self, end: &str) -> Result<(), XmlError> {
        while self.pos < self.chars.len() {
            if self.lookahead(end) {
                self.pos += end.chars().count();
                return Ok(());
            }
            self.pos += 1;
        }
        Err(XmlError::UnexpectedEof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_element() {
        let element = XmlElement::parse("<video/>").unwrap();
        assert_eq!(element.tag, "video");
        assert!(element.attributes.is_empty());
        assert!(element.children.is_empty());
    }

    #[test]
    fn parse_attributes_and_text() {
        let element =
            XmlElement::parse(r#"<html url_name="intro" display_name="Intro">Hello</html>"#)
                .unwrap();
        assert_eq!(element.attr("url_name"), Some("intro"));
        assert_eq!(element.attr("display_name"), Some("Intro"));
        assert_eq!(element.text, "Hello");
    }

    #[test]
    fn parse_nested_children_in_order() {
        let element = XmlElement::parse(
            "<sequence url_name=\"s\">\n  <video url_name=\"a\"/>\n  <video url_name=\"b\"/>\n</sequence>",
        )
        .unwrap();
        assert_eq!(element.children.len(), 2);
        assert_eq!(element.children[0].attr("url_name"), Some("a"));
        assert_eq!(element.children[1].attr("url_name"), Some("b"));
        assert_eq!(element.text, "");
    }

    #[test]
    fn parse_skips_prolog_and_comments() {
        let element = XmlElement::parse(
            "<?xml version=\"1.0\"?>\n<!-- exported course -->\n<video url_name=\"v\"/>",
        )
        .unwrap();
        assert_eq!(element.tag, "video");
    }

    #[test]
    fn entities_decode_and_encode() {
        let element = XmlElement::parse(r#"<html note="a &amp; b">x &lt; y</html>"#).unwrap();
        assert_eq!(element.attr("note"), Some("a & b"));
        assert_eq!(element.text, "x < y");

        let reparsed = XmlElement::parse(&element.to_xml()).unwrap();
        assert_eq!(reparsed, element);
    }

    #[test]
    fn unknown_entity_is_an_error() {
        assert!(matches!(
            XmlElement::parse("<a>&nbsp;</a>"),
            Err(XmlError::UnknownEntity(name)) if name == "nbsp"
        ));
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(matches!(
            XmlElement::parse("<a><b></a></a>"),
            Err(XmlError::MismatchedTag { .. })
        ));
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert_eq!(XmlElement::parse("<a><b/>"), Err(XmlError::UnexpectedEof));
    }

    #[test]
    fn empty_document_is_an_error() {
        assert_eq!(XmlElement::parse("  \n "), Err(XmlError::NoRoot));
    }

    #[test]
    fn writer_output_reparses_equal() {
        let mut root = XmlElement::new("vertical");
        root.set_attr("url_name", "v_1");
        root.text = "note & <markup>".to_string();
        let mut child = XmlElement::new("video");
        child.set_attr("display_name", "Video \"A\"");
        root.push_child(child);

        let reparsed = XmlElement::parse(&root.to_xml()).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn set_attr_replaces() {
        let mut element = XmlElement::new("a");
        element.set_attr("k", "1");
        element.set_attr("k", "2");
        assert_eq!(element.attr("k"), Some("2"));
        assert_eq!(element.attributes.len(), 1);
    }

    #[test]
    fn remove_attr_returns_value() {
        let mut element = XmlElement::new("a");
        element.set_attr("k", "1");
        assert_eq!(element.remove_attr("k"), Some("1".to_string()));
        assert_eq!(element.remove_attr("k"), None);
    }
}
