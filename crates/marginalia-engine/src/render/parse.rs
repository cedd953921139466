use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag as MdTag, TagEnd};

use super::{Node, NodeId, RenderTree, Tag, VerbatimKind, next_node_id};

/// Render a markdown source string into a content tree.
///
/// GFM extensions match what the reading view supports: strikethrough,
/// tables and task lists. The builder never fails; constructs without a
/// dedicated node shape land under [`Tag::Unhandled`] with their text
/// intact so projection offsets stay continuous.
pub fn render_markdown(source: &str) -> RenderTree {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(source, options) {
        builder.handle(event);
    }
    builder.finish()
}

struct TreeBuilder {
    next_id: u64,
    root: Vec<Node>,
    stack: Vec<OpenElement>,
    verbatim: Option<OpenVerbatim>,
    image: Option<OpenImage>,
}

struct OpenElement {
    id: NodeId,
    tag: Tag,
    children: Vec<Node>,
}

/// Code or HTML block collecting its literal until the closing event.
struct OpenVerbatim {
    kind: VerbatimKind,
    literal: String,
}

/// Image collecting its alt text; nested inline markup is flattened and
/// `depth` tracks unmatched starts so the element stack stays balanced.
struct OpenImage {
    src: String,
    alt: String,
    depth: u32,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            next_id: 0,
            root: Vec::new(),
            stack: Vec::new(),
            verbatim: None,
            image: None,
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        if let Some(mut verbatim) = self.verbatim.take() {
            match event {
                Event::Text(text) | Event::Html(text) => {
                    verbatim.literal.push_str(&text);
                    self.verbatim = Some(verbatim);
                }
                Event::End(TagEnd::CodeBlock | TagEnd::HtmlBlock) => {
                    let id = next_node_id(&mut self.next_id);
                    self.push(Node::Verbatim {
                        id,
                        kind: verbatim.kind,
                        literal: verbatim.literal,
                    });
                }
                other => {
                    log::debug!("ignoring event inside verbatim block: {:?}", other);
                    self.verbatim = Some(verbatim);
                }
            }
            return;
        }

        if let Some(mut image) = self.image.take() {
            match event {
                Event::Text(text) | Event::Code(text) => {
                    image.alt.push_str(&text);
                    self.image = Some(image);
                }
                Event::Start(_) => {
                    image.depth += 1;
                    self.image = Some(image);
                }
                Event::End(TagEnd::Image) if image.depth == 0 => {
                    let id = next_node_id(&mut self.next_id);
                    self.push(Node::Element {
                        id,
                        tag: Tag::Image {
                            src: image.src,
                            alt: image.alt,
                        },
                        children: Vec::new(),
                    });
                }
                Event::End(_) => {
                    image.depth = image.depth.saturating_sub(1);
                    self.image = Some(image);
                }
                _ => self.image = Some(image),
            }
            return;
        }

        match event {
            Event::Start(MdTag::CodeBlock(kind)) => {
                self.verbatim = Some(OpenVerbatim {
                    kind: VerbatimKind::CodeBlock {
                        lang: code_block_lang(kind),
                    },
                    literal: String::new(),
                });
            }
            Event::Start(MdTag::HtmlBlock) => {
                self.verbatim = Some(OpenVerbatim {
                    kind: VerbatimKind::Html,
                    literal: String::new(),
                });
            }
            Event::Start(MdTag::Image { dest_url, .. }) => {
                self.image = Some(OpenImage {
                    src: dest_url.to_string(),
                    alt: String::new(),
                    depth: 0,
                });
            }
            Event::Start(tag) => {
                self.stack.push(OpenElement {
                    id: next_node_id(&mut self.next_id),
                    tag: convert_tag(tag),
                    children: Vec::new(),
                });
            }
            Event::End(_) => {
                if let Some(open) = self.stack.pop() {
                    self.push(Node::Element {
                        id: open.id,
                        tag: open.tag,
                        children: open.children,
                    });
                }
            }
            Event::Text(text) => self.push_text(&text),
            Event::Code(text) => {
                let id = next_node_id(&mut self.next_id);
                self.push(Node::Verbatim {
                    id,
                    kind: VerbatimKind::InlineCode,
                    literal: text.to_string(),
                });
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let id = next_node_id(&mut self.next_id);
                self.push(Node::Verbatim {
                    id,
                    kind: VerbatimKind::Html,
                    literal: html.to_string(),
                });
            }
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => self.push_empty(Tag::HardBreak),
            Event::Rule => self.push_empty(Tag::ThematicBreak),
            Event::TaskListMarker(checked) => self.push_empty(Tag::TaskMarker { checked }),
            other => log::debug!("ignoring unhandled markdown event: {:?}", other),
        }
    }

    fn finish(mut self) -> RenderTree {
        // Close anything a truncated document left open.
        while let Some(open) = self.stack.pop() {
            let node = Node::Element {
                id: open.id,
                tag: open.tag,
                children: open.children,
            };
            self.push(node);
        }
        RenderTree {
            children: self.root,
            next_id: self.next_id,
        }
    }

    fn siblings_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: Node) {
        self.siblings_mut().push(node);
    }

    fn push_empty(&mut self, tag: Tag) {
        let id = next_node_id(&mut self.next_id);
        self.push(Node::Element {
            id,
            tag,
            children: Vec::new(),
        });
    }

    /// Append a text run, merging with an adjacent text sibling the way a
    /// normalized DOM would store it.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text { text: existing, .. }) = self.siblings_mut().last_mut() {
            existing.push_str(text);
            return;
        }
        let id = next_node_id(&mut self.next_id);
        self.siblings_mut().push(Node::Text {
            id,
            text: text.to_string(),
        });
    }
}

fn convert_tag(tag: MdTag<'_>) -> Tag {
    match tag {
        MdTag::Paragraph => Tag::Paragraph,
        MdTag::Heading { level, .. } => Tag::Heading {
            level: heading_level(level),
        },
        MdTag::BlockQuote(_) => Tag::BlockQuote,
        MdTag::List(start) => Tag::List {
            ordered: start.is_some(),
        },
        MdTag::Item => Tag::ListItem,
        MdTag::Emphasis => Tag::Emphasis,
        MdTag::Strong => Tag::Strong,
        MdTag::Strikethrough => Tag::Strikethrough,
        MdTag::Link { dest_url, .. } => Tag::Link {
            href: dest_url.to_string(),
        },
        MdTag::Table(_) => Tag::Table,
        MdTag::TableHead => Tag::TableHead,
        MdTag::TableRow => Tag::TableRow,
        MdTag::TableCell => Tag::TableCell,
        other => {
            log::debug!("rendering unhandled markdown container: {:?}", other);
            Tag::Unhandled
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn code_block_lang(kind: CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
        _ => None,
    }
}
