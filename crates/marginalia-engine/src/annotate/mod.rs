/*!
Selection resolution and span painting.

Two passes share one coordinate system, the byte offsets of the rendered
tree's plain-text projection. [`resolve_offsets`] turns a host selection
(anchor nodes plus inner offsets) into such a range, and
[`apply_overlay`] paints stored ranges back onto the tree as inert
marker nodes, annotations before highlights.
*/

mod overlay;
mod resolve;

pub use overlay::{
    OverlayReport, PaintSpan, apply_overlay, marker_at, marker_node_for_span, reset_markers,
};
pub use resolve::{SelectionRange, resolve_offsets};

/// Visual class of a painted span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SpanKind {
    Highlight,
    Annotation,
}
