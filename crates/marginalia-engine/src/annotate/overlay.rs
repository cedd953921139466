use std::ops::Range;

use crate::render::{Node, NodeId, RenderTree, next_node_id};
use crate::store::SpanId;

use super::SpanKind;

/// One span scheduled for painting.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintSpan {
    pub id: SpanId,
    pub kind: SpanKind,
    pub range: Range<usize>,
}

/// What one overlay invocation did: spans that produced at least one
/// marker, and highlights suppressed by an intersecting annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayReport {
    pub painted: Vec<SpanId>,
    pub suppressed: Vec<SpanId>,
}

/// Repaint the tree for the given spans.
///
/// Idempotent: a reset pass first strips markers left by any earlier
/// invocation and re-merges text leaves, so span offsets are always
/// interpreted against the pristine projection. Annotations paint
/// before highlights; a highlight whose range intersects any
/// annotation's range is skipped entirely for this pass and reported as
/// suppressed. It stays in the caller's data model.
///
/// Painting never fails. Ranges that fall outside the projection or
/// inside verbatim regions degrade to shorter markers or to none at
/// all.
pub fn apply_overlay(
    tree: &mut RenderTree,
    annotations: &[PaintSpan],
    highlights: &[PaintSpan],
) -> OverlayReport {
    reset_markers(tree);

    let mut report = OverlayReport::default();
    for span in annotations {
        if paint_span(tree, span) > 0 {
            report.painted.push(span.id);
        }
    }
    for span in highlights {
        if let Some(blocker) = annotations
            .iter()
            .find(|a| ranges_intersect(&span.range, &a.range))
        {
            log::debug!(
                "highlight {} suppressed by annotation {}",
                span.id,
                blocker.id
            );
            report.suppressed.push(span.id);
            continue;
        }
        if paint_span(tree, span) > 0 {
            report.painted.push(span.id);
        }
    }
    report
}

/// Strip every marker, restoring its text in place, then merge adjacent
/// text leaves so the tree matches a fresh render of the same source.
pub fn reset_markers(tree: &mut RenderTree) {
    let RenderTree { children, next_id } = tree;
    reset_in(children, next_id);
}

fn reset_in(children: &mut Vec<Node>, next_id: &mut u64) {
    for node in children.iter_mut() {
        match node {
            Node::Marker { text, .. } => {
                *node = Node::Text {
                    id: next_node_id(next_id),
                    text: std::mem::take(text),
                };
            }
            Node::Element { children, .. } => reset_in(children, next_id),
            _ => {}
        }
    }
    merge_adjacent_text(children);
}

/// DOM-style normalize: adjacent text siblings collapse into the first.
fn merge_adjacent_text(children: &mut Vec<Node>) {
    let mut i = 0;
    while i + 1 < children.len() {
        let adjacent =
            matches!(children[i], Node::Text { .. }) && matches!(children[i + 1], Node::Text { .. });
        if !adjacent {
            i += 1;
            continue;
        }
        if let Node::Text { text: tail, .. } = children.remove(i + 1) {
            if let Node::Text { text: head, .. } = &mut children[i] {
                head.push_str(&tail);
            }
        }
    }
}

/// The span behind a marker node, for click-to-identify.
pub fn marker_at(tree: &RenderTree, node: NodeId) -> Option<(SpanId, SpanKind)> {
    fn walk(nodes: &[Node], target: NodeId) -> Option<(SpanId, SpanKind)> {
        for node in nodes {
            match node {
                Node::Marker { id, span_id, kind, .. } if *id == target => {
                    return Some((*span_id, *kind));
                }
                Node::Element { children, .. } => {
                    if let Some(hit) = walk(children, target) {
                        return Some(hit);
                    }
                }
                _ => {}
            }
        }
        None
    }
    walk(tree.children(), node)
}

/// First marker painted for a span, in document order. The host measures
/// this node's position when laying out the annotation column.
pub fn marker_node_for_span(tree: &RenderTree, span: SpanId) -> Option<NodeId> {
    fn walk(nodes: &[Node], target: SpanId) -> Option<NodeId> {
        for node in nodes {
            match node {
                Node::Marker { id, span_id, .. } if *span_id == target => return Some(*id),
                Node::Element { children, .. } => {
                    if let Some(hit) = walk(children, target) {
                        return Some(hit);
                    }
                }
                _ => {}
            }
        }
        None
    }
    walk(tree.children(), span)
}

fn ranges_intersect(a: &Range<usize>, b: &Range<usize>) -> bool {
    !(a.end <= b.start || a.start >= b.end)
}

/// Candidate leaf for wrapping: the leaf plus the span's byte range
/// within its text.
struct WrapTarget {
    node: NodeId,
    local: Range<usize>,
}

/// Paint one span, returning how many markers were created.
///
/// Two passes, mirroring how offsets are defined: first locate every
/// text leaf the range overlaps against the current flattened positions,
/// then splice each into prefix text, marker, suffix text. Wrapping
/// preserves the flattened text exactly, so later spans can be located
/// against the updated tree without correction.
fn paint_span(tree: &mut RenderTree, span: &PaintSpan) -> usize {
    if span.range.start >= span.range.end {
        log::warn!("span {} has an empty or reversed range; skipped", span.id);
        return 0;
    }

    let mut targets = Vec::new();
    let mut pos = 0;
    collect_targets(tree.children(), span, &mut pos, &mut targets);
    if targets.is_empty() {
        log::warn!(
            "span {} [{}, {}) matched no wrappable text",
            span.id,
            span.range.start,
            span.range.end
        );
        return 0;
    }

    let RenderTree { children, next_id } = tree;
    let mut wrapped = 0;
    for target in &targets {
        if wrap_target(children, next_id, target, span) {
            wrapped += 1;
        }
    }
    wrapped
}

fn collect_targets(nodes: &[Node], span: &PaintSpan, pos: &mut usize, out: &mut Vec<WrapTarget>) {
    for node in nodes {
        match node {
            Node::Element { children, .. } => collect_targets(children, span, pos, out),
            Node::Text { id, text } => {
                let node_start = *pos;
                let len = text.len();
                *pos += len;
                if span.range.start >= node_start + len || span.range.end <= node_start {
                    continue;
                }
                let from = span.range.start.saturating_sub(node_start);
                let to = (span.range.end - node_start).min(len);
                let (from, to) = clamp_to_char_boundaries(text, from, to, span.id);
                if from < to {
                    out.push(WrapTarget {
                        node: *id,
                        local: from..to,
                    });
                }
            }
            // Verbatim regions and markers from an earlier span in this
            // same pass count toward the position but are never wrapped.
            _ => *pos += node.leaf_text().map_or(0, str::len),
        }
    }
}

/// Pull a leaf-local range onto character boundaries, shrinking rather
/// than growing so a drifted span paints less instead of panicking.
fn clamp_to_char_boundaries(text: &str, from: usize, to: usize, span: SpanId) -> (usize, usize) {
    let mut f = from;
    while f < text.len() && !text.is_char_boundary(f) {
        f += 1;
    }
    let mut t = to;
    while t > 0 && !text.is_char_boundary(t) {
        t -= 1;
    }
    if f != from || t != to {
        log::warn!("span {} pulled onto character boundaries", span);
    }
    (f, t)
}

fn wrap_target(
    children: &mut Vec<Node>,
    next_id: &mut u64,
    target: &WrapTarget,
    span: &PaintSpan,
) -> bool {
    for i in 0..children.len() {
        match &mut children[i] {
            Node::Element { children: inner, .. } => {
                if wrap_target(inner, next_id, target, span) {
                    return true;
                }
            }
            Node::Text { id, text } if *id == target.node => {
                let text = std::mem::take(text);
                let mut replacement = Vec::with_capacity(3);
                if target.local.start > 0 {
                    replacement.push(Node::Text {
                        id: next_node_id(next_id),
                        text: text[..target.local.start].to_string(),
                    });
                }
                replacement.push(Node::Marker {
                    id: next_node_id(next_id),
                    span_id: span.id,
                    kind: span.kind,
                    text: text[target.local.clone()].to_string(),
                });
                if target.local.end < text.len() {
                    replacement.push(Node::Text {
                        id: next_node_id(next_id),
                        text: text[target.local.end..].to_string(),
                    });
                }
                children.splice(i..=i, replacement);
                return true;
            }
            _ => {}
        }
    }
    false
}
