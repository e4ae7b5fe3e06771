use super::{CallTiles, RoundState};
use crate::consts::{PLAYER_NUM, TILE_KIND_NUM};
use crate::tile::Tile;
use std::collections::BTreeSet;

impl RoundState {
    #[inline]
    #[must_use]
    pub const fn oya(&self) -> u8 {
        self.oya
    }

    #[inline]
    #[must_use]
    pub fn display_doras(&self) -> &[Tile] {
        &self.display_doras
    }

    #[inline]
    #[must_use]
    pub const fn reach(&self) -> [bool; PLAYER_NUM] {
        self.reach
    }

    #[inline]
    #[must_use]
    pub fn hand(&self, seat: u8) -> &BTreeSet<Tile> {
        &self.hands[seat as usize]
    }

    #[inline]
    #[must_use]
    pub fn calls(&self, seat: u8) -> &[CallTiles] {
        &self.calls[seat as usize]
    }

    #[inline]
    #[must_use]
    pub fn discards(&self, seat: u8) -> &[Tile] {
        &self.discards[seat as usize]
    }

    #[inline]
    #[must_use]
    pub const fn disclosed(&self) -> &[u8; TILE_KIND_NUM] {
        self.disclosed.as_array()
    }

    /// Seats in reach other than `seat`, in seat order.
    pub fn reach_opponents(&self, seat: u8) -> impl Iterator<Item = u8> + '_ {
        (0..PLAYER_NUM as u8).filter(move |&p| p != seat && self.reach[p as usize])
    }

    /// Attribute dump for debugging, keyed like the log viewer.
    pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
