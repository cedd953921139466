/*!
Vertical placement for annotation cards in the side column.

Each visible annotation wants to sit level with its painted marker; when
cards would collide the later one slides down, never up, so the column
always reads in document order.
*/

use std::collections::HashMap;

use crate::store::SpanId;

/// Minimum vertical space between consecutive cards.
pub const MIN_GAP: f32 = 10.0;

/// Card height assumed when the host supplies no measurement.
pub const DEFAULT_CARD_HEIGHT: f32 = 150.0;

/// One measured annotation card, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CardAnchor {
    pub id: SpanId,
    /// Vertical position of the card's painted marker, relative to the
    /// scrolling container.
    pub ideal_top: f32,
    pub height: f32,
}

/// Place cards top to bottom in one sweep.
///
/// The first card sits exactly at its ideal top. Every later card takes
/// `max(ideal_top, bottom of the previous card + min_gap)`, so cards are
/// only ever pushed down and the column stays in document order.
/// Callers pass anchors sorted by their span's start offset; anchors for
/// unmeasurable markers are omitted before calling.
pub fn layout_cards(anchors: &[CardAnchor], min_gap: f32) -> HashMap<SpanId, f32> {
    let mut positions = HashMap::with_capacity(anchors.len());
    let mut last_bottom: Option<f32> = None;
    for anchor in anchors {
        let top = match last_bottom {
            Some(bottom) => anchor.ideal_top.max(bottom + min_gap),
            None => anchor.ideal_top,
        };
        positions.insert(anchor.id, top);
        last_bottom = Some(top + anchor.height);
    }
    positions
}
