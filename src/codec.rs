//! Reading and writing the plain-text Yarn node format.
//!
//! A file is a sequence of node blocks:
//!
//! ```text
//! title: Start
//! tags: intro
//! position: 10,20
//! ---
//! Hello there!
//! [[Goodbye|End]]
//! ===
//! ```

use std::fmt;

use log::*;

use crate::errors::{Error, Result};

const BODY_START: &str = "---";
const BODY_END: &str = "===";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn parse(value: &str) -> Option<Self> {
        let mut split_value = value.splitn(2, ',');
        let x = split_value.next()?.trim().parse().ok()?;
        let y = split_value.next()?.trim().parse().ok()?;
        Some(Self { x, y })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// A header this codec does not interpret, such as `colorID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub key: String,
    pub value: String,
}

/// One node of a Yarn file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRecord {
    pub title: String,
    pub body: String,
    pub tags: String,
    pub position: Position,
    pub parent: Option<String>,
    pub extra_fields: Vec<HeaderField>,
}

impl NodeRecord {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            ..Self::default()
        }
    }

    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split_whitespace()
    }

    pub fn extra_field(&self, key: &str) -> Option<&str> {
        self.extra_fields.iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineEnding {
    Unix,
    Windows,
    /// Whatever the platform this was built for uses.
    Native,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "\n",
            Self::Windows => "\r\n",
            Self::Native => {
                if cfg!(windows) { "\r\n" } else { "\n" }
            }
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        Self::Unix
    }
}

/// The headers the codec knows how to interpret.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StandardField {
    Title,
    Tags,
    Position,
    Parent,
}

impl StandardField {
    pub const ALL: [StandardField; 4] = [
        StandardField::Title,
        StandardField::Tags,
        StandardField::Position,
        StandardField::Parent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Tags => "tags",
            Self::Position => "position",
            Self::Parent => "parent",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|field| field.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub line_ending: LineEnding,
    /// Header order on write. Standard fields missing here are written after
    /// the listed ones; extension fields always come last.
    pub field_order: Vec<StandardField>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::default(),
            field_order: StandardField::ALL.to_vec(),
        }
    }
}

impl CodecConfig {
    fn write_order(&self) -> Vec<StandardField> {
        let mut order = Vec::with_capacity(StandardField::ALL.len());
        for field in self.field_order.iter().chain(StandardField::ALL.iter()) {
            if !order.contains(field) {
                order.push(*field);
            }
        }
        order
    }
}

#[derive(Debug)]
enum ParseMode {
    Header,
    Body,
}

/// Splits Yarn text into its nodes.
///
/// Per-line problems in the headers are logged and skipped. The only hard
/// failure is text without any `---` line, since then no node can exist.
pub fn parse(text: &str) -> Result<Vec<NodeRecord>> {
    if !text.lines().any(|line| line == BODY_START) {
        return Err(Error::MalformedInput(format!("no '{}' line found", BODY_START)));
    }

    let mut nodes = Vec::new();
    let mut node = NodeRecord::default();
    let mut has_headers = false;
    let mut seen = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut mode = ParseMode::Header;

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        match mode {
            ParseMode::Header => {
                if line == BODY_START {
                    mode = ParseMode::Body;
                    continue;
                }

                if line.trim().is_empty() {
                    continue;
                }

                match split_header(line) {
                    Some((key, value)) => {
                        has_headers = true;
                        apply_header(&mut node, &mut seen, key, value, line_number);
                    }
                    None => {
                        warn!("Line {}: skipping malformed header {:?}", line_number, line);
                    }
                }
            }
            ParseMode::Body => {
                if line == BODY_END {
                    finish_node(&mut nodes, node, &body_lines);
                    node = NodeRecord::default();
                    has_headers = false;
                    seen.clear();
                    body_lines.clear();
                    mode = ParseMode::Header;
                    continue;
                }

                body_lines.push(line);
            }
        }
    }

    match mode {
        ParseMode::Body => {
            debug!("Node {:?} has no '{}', ending it at end of input", node.title, BODY_END);
            finish_node(&mut nodes, node, &body_lines);
        }
        ParseMode::Header if has_headers => {
            warn!("Dropping headers for {:?}: input ended before '{}'", node.title, BODY_START);
        }
        ParseMode::Header => {}
    }

    debug!("Parsed {} nodes", nodes.len());
    Ok(nodes)
}

/// Writes nodes back out in canonical form.
pub fn serialize(nodes: &[NodeRecord], config: &CodecConfig) -> String {
    let newline = config.line_ending.as_str();
    let order = config.write_order();
    let mut out = String::new();

    for node in nodes {
        for field in &order {
            let value = match field {
                StandardField::Title => Some(node.title.clone()),
                StandardField::Tags => Some(node.tags.clone()),
                StandardField::Position => Some(node.position.to_string()),
                StandardField::Parent => node.parent.clone(),
            };
            if let Some(value) = value {
                write_header(&mut out, field.key(), &value, newline);
            }
        }
        for field in &node.extra_fields {
            write_header(&mut out, &field.key, &field.value, newline);
        }

        out.push_str(BODY_START);
        out.push_str(newline);
        if !node.body.is_empty() {
            for line in node.body.split('\n') {
                out.push_str(line.trim_end_matches('\r'));
                out.push_str(newline);
            }
        }
        out.push_str(BODY_END);
        out.push_str(newline);
    }

    out
}

fn write_header(out: &mut String, key: &str, value: &str, newline: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push_str(newline);
}

/// Splits `key: value`. Only the single space written after the colon is
/// dropped; the rest of the value is kept as it is.
fn split_header(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let key = line[..colon].trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    let value = &line[colon + 1..];
    Some((key, value.strip_prefix(' ').unwrap_or(value)))
}

fn apply_header(
    node: &mut NodeRecord,
    seen: &mut Vec<StandardField>,
    key: &str,
    value: &str,
    line_number: usize,
) {
    let field = match StandardField::from_key(key) {
        Some(field) => field,
        None => {
            node.extra_fields.push(HeaderField {
                key: key.to_string(),
                value: value.to_string(),
            });
            return;
        }
    };

    if seen.contains(&field) {
        warn!("Line {}: repeated '{}' header, keeping the last one", line_number, key);
    } else {
        seen.push(field);
    }

    match field {
        StandardField::Title => node.title = value.to_string(),
        StandardField::Tags => node.tags = value.to_string(),
        StandardField::Position => {
            node.position = Position::parse(value).unwrap_or_else(|| {
                warn!("Line {}: invalid position {:?}, using 0,0", line_number, value);
                Position::default()
            });
        }
        StandardField::Parent => node.parent = Some(value.to_string()),
    }
}

fn finish_node(nodes: &mut Vec<NodeRecord>, mut node: NodeRecord, body_lines: &[&str]) {
    if node.title.is_empty() {
        warn!("Node {} has no title", nodes.len());
    }
    node.body = body_lines.join("\n");
    nodes.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_multi_node() {
        let nodes = parse("title: A\n---\nHello\n===\ntitle: B\n---\nWorld\n===").unwrap();
        assert_eq!(nodes, vec![NodeRecord::new("A", "Hello"), NodeRecord::new("B", "World")]);
    }

    #[test]
    fn test_missing_body_start() {
        let err = parse("no dashes here at all").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_position() {
        let nodes = parse("title: A\nposition: 10,20\n---\n===\ntitle: B\nposition: bad\n---\n===\n").unwrap();
        assert_eq!(nodes[0].position, Position::new(10, 20));
        assert_eq!(nodes[1].position, Position::default());
        assert_eq!(nodes[1].title, "B");
    }

    #[test]
    fn test_headers() {
        let src = "\n  title: Start\n\nnot a header\ntags: a b\ncolorID: 3\nparent: Group\n---\n===\n";
        let nodes = parse(src).unwrap();
        assert_eq!(nodes.len(), 1);

        let node = &nodes[0];
        assert_eq!(node.title, "Start");
        assert_eq!(node.tag_list().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(node.parent.as_deref(), Some("Group"));
        assert_eq!(node.extra_field("colorID"), Some("3"));
        assert_eq!(node.body, "");
    }

    #[test]
    fn test_body_is_verbatim() {
        let src = "title: A\n---\n  indented: not a header\n\n<<set $x to 1>>\n\n===\n";
        let nodes = parse(src).unwrap();
        assert_eq!(nodes[0].body, "  indented: not a header\n\n<<set $x to 1>>\n");
    }

    #[test]
    fn test_missing_body_end() {
        let nodes = parse("title: A\n---\nfirst\nsecond").unwrap();
        assert_eq!(nodes[0].body, "first\nsecond");
    }

    #[test]
    fn test_trailing_headers_dropped() {
        let nodes = parse("title: A\n---\n===\ntitle: B\n").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_crlf_input() {
        let nodes = parse("title: A\r\n---\r\nHello\r\nThere\r\n===\r\n").unwrap();
        assert_eq!(nodes[0].body, "Hello\nThere");
    }

    #[test]
    fn test_serialize() {
        let mut node = NodeRecord::new("Start", "Hi\nBye");
        node.position = Position::new(-4, 8);
        node.extra_fields.push(HeaderField { key: "colorID".to_string(), value: "2".to_string() });

        let config = CodecConfig {
            line_ending: LineEnding::Windows,
            ..CodecConfig::default()
        };
        assert_eq!(
            serialize(&[node], &config),
            "title: Start\r\ntags: \r\nposition: -4,8\r\ncolorID: 2\r\n---\r\nHi\r\nBye\r\n===\r\n",
        );
    }

    #[test]
    fn test_field_order() {
        let mut node = NodeRecord::new("A", "");
        node.parent = Some("P".to_string());
        let config = CodecConfig {
            field_order: vec![StandardField::Position, StandardField::Title],
            ..CodecConfig::default()
        };
        assert_eq!(
            serialize(&[node], &config),
            "position: 0,0\ntitle: A\ntags: \nparent: P\n---\n===\n",
        );
    }

    #[test]
    fn test_round_trip() {
        let src = "\
colorID: 1
title: Start
position: 3, 4
tags: one two
---
Hello $name

-> Option
    Nested
===
title: Empty
---
===
title: Trailing
---
line

===
";
        let parsed = parse(src).unwrap();
        let reparsed = parse(&serialize(&parsed, &CodecConfig::default())).unwrap();
        assert_eq!(reparsed, parsed);
        assert_eq!(parsed[0].position, Position::new(3, 4));
        assert_eq!(parsed[2].body, "line\n");
    }

    #[test]
    fn test_header_values_kept_verbatim() {
        let mut node = NodeRecord::new(" Spaced title ", "Hi");
        node.tags = " a  b ".to_string();
        node.parent = Some(String::new());
        node.extra_fields.push(HeaderField { key: "note".to_string(), value: "  indented".to_string() });

        let nodes = vec![node, NodeRecord::new("Plain", "")];
        let written = serialize(&nodes, &CodecConfig::default());
        assert_eq!(parse(&written).unwrap(), nodes);

        let parsed = parse("title:Tight\nparent:\n---\n===\n").unwrap();
        assert_eq!(parsed[0].title, "Tight");
        assert_eq!(parsed[0].parent.as_deref(), Some(""));
        assert_eq!(parsed[0].tag_list().count(), 0);
    }
}
