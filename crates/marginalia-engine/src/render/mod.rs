/*!
Markdown rendering to an offset-addressable content tree.

Articles are stored as markdown strings and rendered into a closed
tree of typed nodes before anything else touches them. The tree is
*offset-addressable*: concatenating the text of every leaf in document
order yields the article's plain-text projection, and every span
(highlight or annotation) addresses a byte range of that projection.
Code regions keep their literal text in the projection but are never
split or wrapped by the overlay pass.
*/

mod parse;

pub use parse::render_markdown;

use crate::annotate::SpanKind;
use crate::store::SpanId;

/// Identity of a node within one rendered revision of an article.
///
/// Ids are allocated when the tree is built and when the overlay pass
/// splits or merges leaves, so a `NodeId` is only meaningful against the
/// revision it was taken from, like a DOM node reference. Nothing
/// persists them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeId(pub u64);

/// Structural vocabulary produced by the markdown renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Paragraph,
    Heading { level: u8 },
    BlockQuote,
    List { ordered: bool },
    ListItem,
    TaskMarker { checked: bool },
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String },
    /// Images contribute no text to the projection; the alt text is
    /// carried as data, not as child leaves.
    Image { src: String, alt: String },
    Table,
    TableHead,
    TableRow,
    TableCell,
    HardBreak,
    ThematicBreak,
    /// Markdown constructs the reading view has no dedicated rendering
    /// for; children still contribute text so offsets stay continuous.
    Unhandled,
}

/// Literal regions that are counted for offsets but exempt from wrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum VerbatimKind {
    InlineCode,
    CodeBlock { lang: Option<String> },
    Html,
}

/// One node of the rendered content tree.
///
/// The variant set is closed on purpose: traversal code in the offset
/// resolver and the span overlay engine matches exhaustively instead of
/// probing node shapes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Plain text run.
    Text { id: NodeId, text: String },
    /// Structural element with children.
    Element {
        id: NodeId,
        tag: Tag,
        children: Vec<Node>,
    },
    /// Code or raw HTML; literal text counts toward offsets, the node is
    /// never split by the overlay pass.
    Verbatim {
        id: NodeId,
        kind: VerbatimKind,
        literal: String,
    },
    /// Inert marker wrapping a painted span. Inserted only by the overlay
    /// pass and removed by its reset step.
    Marker {
        id: NodeId,
        span_id: SpanId,
        kind: SpanKind,
        text: String,
    },
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Text { id, .. }
            | Node::Element { id, .. }
            | Node::Verbatim { id, .. }
            | Node::Marker { id, .. } => *id,
        }
    }

    /// Text carried directly by this node, for the three leaf variants.
    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            Node::Text { text, .. } => Some(text),
            Node::Verbatim { literal, .. } => Some(literal),
            Node::Marker { text, .. } => Some(text),
            Node::Element { .. } => None,
        }
    }

    /// Flattened text length in bytes of this node and its descendants.
    pub fn flat_len(&self) -> usize {
        match self {
            Node::Element { children, .. } => children.iter().map(Node::flat_len).sum(),
            _ => self.leaf_text().map_or(0, str::len),
        }
    }

    fn append_plain_text(&self, out: &mut String) {
        match self {
            Node::Element { children, .. } => {
                for child in children {
                    child.append_plain_text(out);
                }
            }
            _ => {
                if let Some(text) = self.leaf_text() {
                    out.push_str(text);
                }
            }
        }
    }
}

/// A rendered article: the root children of the content container plus
/// the id counter for this revision.
///
/// The tree is rebuilt from the markdown source on every content change
/// and mutated in place by the span overlay pass between rebuilds.
///
/// # Example
///
/// ```rust
/// use marginalia_engine::render::render_markdown;
///
/// let tree = render_markdown("Hello **world**");
/// assert_eq!(tree.plain_text(), "Hello world");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub(crate) children: Vec<Node>,
    pub(crate) next_id: u64,
}

impl RenderTree {
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Concatenated text of every leaf in document order. Spans address
    /// byte ranges of this string.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            node.append_plain_text(&mut out);
        }
        out
    }

    /// Byte length of the plain-text projection.
    pub fn text_len(&self) -> usize {
        self.children.iter().map(Node::flat_len).sum()
    }

    /// Map a projection byte offset to the leaf containing it and the
    /// offset within that leaf.
    ///
    /// An offset equal to the projection length maps to the end of the
    /// last leaf, mirroring a caret placed after the final character.
    /// Offsets past the end, or any offset in a tree with no text,
    /// return `None`.
    pub fn caret_at(&self, offset: usize) -> Option<(NodeId, usize)> {
        let mut pos = 0;
        let mut last_leaf = None;
        for node in &self.children {
            if let Some(hit) = caret_walk(node, offset, &mut pos, &mut last_leaf) {
                return Some(hit);
            }
        }
        if offset == pos { last_leaf } else { None }
    }
}

fn caret_walk(
    node: &Node,
    offset: usize,
    pos: &mut usize,
    last_leaf: &mut Option<(NodeId, usize)>,
) -> Option<(NodeId, usize)> {
    match node {
        Node::Element { children, .. } => {
            for child in children {
                if let Some(hit) = caret_walk(child, offset, pos, last_leaf) {
                    return Some(hit);
                }
            }
            None
        }
        Node::Text { id, text }
        | Node::Verbatim {
            id, literal: text, ..
        }
        | Node::Marker { id, text, .. } => {
            let len = text.len();
            if offset >= *pos && offset < *pos + len {
                return Some((*id, offset - *pos));
            }
            *pos += len;
            if len > 0 {
                *last_leaf = Some((*id, len));
            }
            None
        }
    }
}

/// Allocate the next node id from a revision's counter.
pub(crate) fn next_node_id(counter: &mut u64) -> NodeId {
    let id = NodeId(*counter);
    *counter += 1;
    id
}
