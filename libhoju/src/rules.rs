//! Dora and suji checks on a discarded tile.

use crate::tile::{Tile, next_kind};

/// Whether `tile` is worth a dora given the revealed indicators. Red fives
/// always are.
#[must_use]
pub fn is_dora(tile: Tile, display_doras: &[Tile]) -> bool {
    tile.is_aka()
        || display_doras
            .iter()
            .any(|indicator| next_kind(indicator.kind()) == tile.kind())
}

/// Whether a tile whose id is three away from `tile` is among `discards`.
///
/// This is a plain id offset, so it compares physical copies rather than
/// ranks and also matches across kind and suit boundaries.
#[must_use]
pub fn is_suji(tile: Tile, discards: &[Tile]) -> bool {
    let id = tile.as_u8();
    let partners = [id.checked_sub(3), id.checked_add(3)];
    discards
        .iter()
        .any(|d| partners.contains(&Some(d.as_u8())))
}
