use std::ops::Range;

use crate::render::{Node, NodeId, RenderTree};

/// A selection captured against one rendered revision: an anchor node
/// plus a byte offset within it, for each end.
///
/// Anchors normally name text-bearing leaves, with the inner offset
/// counting bytes into the leaf text. Hosts whose selection machinery
/// crosses node boundaries can hand over a structural element as an
/// anchor instead; resolution then uses the cumulative position at which
/// that element is encountered and ignores the inner offset. That
/// fallback is a conservative approximation, not an exact mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRange {
    pub start_node: NodeId,
    pub start_offset: usize,
    pub end_node: NodeId,
    pub end_offset: usize,
}

/// Resolve a selection to absolute byte offsets in the tree's plain-text
/// projection.
///
/// Pre-order walk with a running text position. Reaching the start
/// anchor records `pos + start_offset`; reaching the end anchor records
/// `pos + end_offset` and stops the walk, so nothing after the selection
/// is visited. Returns `None` when either anchor never turns up, which
/// callers treat as "no selection" rather than an error.
///
/// The returned range is not guaranteed ordered. An end anchor sitting
/// before the start anchor in document order stops the walk early and
/// resolves to `None`; callers still validate `start < end` for the
/// shapes that do resolve.
pub fn resolve_offsets(tree: &RenderTree, range: &SelectionRange) -> Option<Range<usize>> {
    let mut walk = ResolveWalk {
        range,
        pos: 0,
        start: None,
        end: None,
    };
    for node in tree.children() {
        if walk.visit(node) {
            break;
        }
    }
    match (walk.start, walk.end) {
        (Some(start), Some(end)) => Some(start..end),
        _ => {
            log::debug!("selection anchors not found in rendered tree");
            None
        }
    }
}

struct ResolveWalk<'a> {
    range: &'a SelectionRange,
    pos: usize,
    start: Option<usize>,
    end: Option<usize>,
}

impl ResolveWalk<'_> {
    /// Returns true once the end anchor has been seen.
    fn visit(&mut self, node: &Node) -> bool {
        match node {
            Node::Element { id, children, .. } => {
                if *id == self.range.start_node {
                    self.start = Some(self.pos);
                }
                if *id == self.range.end_node {
                    self.end = Some(self.pos);
                    return true;
                }
                for child in children {
                    if self.visit(child) {
                        return true;
                    }
                }
                false
            }
            _ => {
                let id = node.id();
                if id == self.range.start_node {
                    self.start = Some(self.pos + self.range.start_offset);
                }
                if id == self.range.end_node {
                    self.end = Some(self.pos + self.range.end_offset);
                    return true;
                }
                self.pos += node.leaf_text().map_or(0, str::len);
                false
            }
        }
    }
}
