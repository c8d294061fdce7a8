//! Turns a store description (HTML) into Notion page blocks.

use scraper::{ElementRef, Html, Node};
use std::collections::HashMap;

use crate::notion::Block;

/// Upper bound on blocks per page, the leading notice included.
pub const MAX_BLOCKS: usize = 50;

/// Notion rejects rich text longer than this.
pub const MAX_TEXT_CHARS: usize = 2000;

pub const NOTICE_EMOJI: &str = "🎮";
pub const NOTICE_TEXT: &str = "This page is generated automatically from Steam data.";

/// A top-level node of parsed markup. Non-element nodes have no tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupNode {
    pub tag: Option<String>,
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl MarkupNode {
    pub fn element(tag: &str, text: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            text: text.to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub trait MarkupParser: Send + Sync {
    /// Direct children of the document root, in document order.
    fn top_level_nodes(&self, markup: &str) -> Vec<MarkupNode>;
}

/// HTML fragment parser backed by `scraper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl MarkupParser for HtmlParser {
    fn top_level_nodes(&self, markup: &str) -> Vec<MarkupNode> {
        let fragment = Html::parse_fragment(markup);
        fragment
            .root_element()
            .children()
            .map(|child| {
                if let Some(el) = ElementRef::wrap(child) {
                    return MarkupNode {
                        tag: Some(el.value().name().to_ascii_lowercase()),
                        text: el.text().collect(),
                        attributes: el
                            .value()
                            .attrs()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                    };
                }
                match child.value() {
                    Node::Text(text) => MarkupNode {
                        tag: None,
                        text: String::from(&**text),
                        attributes: HashMap::new(),
                    },
                    _ => MarkupNode::default(),
                }
            })
            .collect()
    }
}

/// Build the page body for `markup`.
///
/// Always starts with the provenance callout, then walks top-level nodes only:
/// `h1`/`h2` become headings, `img` becomes an external image, `p` becomes a
/// paragraph. Everything else is dropped. The result never exceeds
/// [`MAX_BLOCKS`].
pub fn to_blocks(parser: &dyn MarkupParser, markup: Option<&str>) -> Vec<Block> {
    let mut blocks = vec![Block::Callout {
        emoji: NOTICE_EMOJI.to_string(),
        text: NOTICE_TEXT.to_string(),
    }];

    let Some(markup) = markup else {
        return blocks;
    };

    for node in parser.top_level_nodes(markup) {
        if blocks.len() >= MAX_BLOCKS {
            break;
        }
        if let Some(block) = node_to_block(&node) {
            blocks.push(block);
        }
    }

    blocks
}

fn node_to_block(node: &MarkupNode) -> Option<Block> {
    match node.tag.as_deref()? {
        "h1" | "h2" => non_empty_text(&node.text).map(|text| Block::Heading { text }),
        "p" => non_empty_text(&node.text).map(|text| Block::Paragraph { text }),
        "img" => node
            .attr("src")
            .filter(|src| !src.trim().is_empty())
            .map(|src| Block::Image {
                url: src.to_string(),
            }),
        _ => None,
    }
}

fn non_empty_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TEXT_CHARS).collect())
}
