mod getter;

use crate::consts::{MAX_COPIES, PLAYER_NUM, TILE_KIND_NUM};
use crate::tile::{Tile, kind_to_string, tiles_to_string};
use std::collections::BTreeSet;
use std::fmt;

use derivative::Derivative;
use serde::{Serialize, Serializer};
use tinyvec::ArrayVec;

pub type CallTiles = ArrayVec<[Tile; 4]>;

/// Internal-consistency failures. Any of them means either the log is not a
/// legal game or the replay logic is wrong, so the replay must stop.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("seat {seat} does not hold tile {tile:?}")]
    TileNotInHand { seat: u8, tile: Tile },
    #[error("{} would be disclosed {count} times", kind_to_string(*.kind))]
    DisclosedOverflow { kind: u8, count: u8 },
    #[error("{} visibility count {count} from seat {seat} is out of range", kind_to_string(*.kind))]
    VisibilityOutOfRange { seat: u8, kind: u8, count: i16 },
    #[error("event arrived before any round started")]
    NoRound,
    #[error("no discard within 3 events before the call")]
    MissingClaimSource,
    #[error("call claims {claimed:?} but the last discard was {discarded:?}")]
    ClaimedTileMismatch { claimed: Tile, discarded: Tile },
}

/// Per-kind count of copies visible to every player: dora indicators,
/// discards and melds.
#[derive(Clone, Copy, PartialEq, Eq, Derivative)]
#[derivative(Default)]
pub struct DisclosedCounts(#[derivative(Default(value = "[0; TILE_KIND_NUM]"))] [u8; TILE_KIND_NUM]);

impl DisclosedCounts {
    /// Fails without modifying the counts if a fifth copy would appear.
    pub fn increment(&mut self, tile: Tile) -> Result<(), Violation> {
        let kind = tile.kind();
        let count = &mut self.0[kind as usize];
        if *count >= MAX_COPIES {
            return Err(Violation::DisclosedOverflow {
                kind,
                count: *count + 1,
            });
        }
        *count += 1;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub const fn as_array(&self) -> &[u8; TILE_KIND_NUM] {
        &self.0
    }
}

impl fmt::Debug for DisclosedCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0[..], f)
    }
}

impl Serialize for DisclosedCounts {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

/// Everything known about one round, from the omniscient view of the log.
///
/// A seat's hand keeps the tiles it melded, including the called tile, so
/// only discards ever leave a hand. Consumers that want the concealed part
/// subtract `calls`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RoundState {
    pub(super) oya: u8,
    pub(super) display_doras: Vec<Tile>,
    pub(super) reach: [bool; PLAYER_NUM],
    pub(super) hands: [BTreeSet<Tile>; PLAYER_NUM],
    pub(super) calls: [Vec<CallTiles>; PLAYER_NUM],
    #[serde(rename = "discard_tiles")]
    pub(super) discards: [Vec<Tile>; PLAYER_NUM],
    #[serde(rename = "disclosed_tile_nums")]
    pub(super) disclosed: DisclosedCounts,
}

impl RoundState {
    pub fn new(oya: u8, dora_indicator: Tile, haipai: &[Vec<Tile>; PLAYER_NUM]) -> Result<Self, Violation> {
        let mut state = Self {
            oya,
            display_doras: vec![dora_indicator],
            hands: haipai.clone().map(BTreeSet::from_iter),
            ..Default::default()
        };
        state.disclosed.increment(dora_indicator)?;
        Ok(state)
    }

    pub fn draw(&mut self, seat: u8, tile: Tile) {
        self.hands[seat as usize].insert(tile);
    }

    pub fn discard(&mut self, seat: u8, tile: Tile) -> Result<(), Violation> {
        if !self.hands[seat as usize].remove(&tile) {
            return Err(Violation::TileNotInHand { seat, tile });
        }
        self.discards[seat as usize].push(tile);
        self.disclosed.increment(tile)
    }

    /// Once set, a reach flag stays set for the rest of the round.
    pub const fn accept_reach(&mut self, seat: u8) {
        self.reach[seat as usize] = true;
    }

    pub fn add_dora_indicator(&mut self, tile: Tile) {
        self.display_doras.push(tile);
    }

    /// The pon tiles were disclosed when the pon was called, so only the
    /// added tile becomes newly visible.
    pub fn add_kakan(&mut self, seat: u8, added: Tile) -> Result<(), Violation> {
        self.calls[seat as usize].push(CallTiles::from_iter([added]));
        self.disclosed.increment(added)
    }

    pub fn add_ankan(&mut self, seat: u8, tiles: CallTiles) -> Result<(), Violation> {
        tiles.iter().try_for_each(|&t| self.disclosed.increment(t))?;
        self.calls[seat as usize].push(tiles);
        Ok(())
    }

    /// `claimed` goes back into the caller's hand. The tile at
    /// `called_index` was counted when it was discarded and is not counted
    /// again.
    pub fn add_claimed_meld(
        &mut self,
        seat: u8,
        claimed: Tile,
        tiles: CallTiles,
        called_index: usize,
    ) -> Result<(), Violation> {
        self.hands[seat as usize].insert(claimed);
        tiles
            .iter()
            .enumerate()
            .filter(|&(idx, _)| idx != called_index)
            .try_for_each(|(_, &t)| self.disclosed.increment(t))?;
        self.calls[seat as usize].push(tiles);
        Ok(())
    }

    /// For debug only.
    ///
    /// Return a human readable description of the current state.
    #[must_use]
    pub fn brief_info(&self) -> String {
        let seats = (0..PLAYER_NUM)
            .map(|seat| {
                let calls = self.calls[seat]
                    .iter()
                    .map(|c| format!("[{}]", tiles_to_string(c)))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "seat {seat}{}{}\n  hand: {}\n  calls: {calls}\n  discards: {}",
                    if seat == self.oya as usize { " (oya)" } else { "" },
                    if self.reach[seat] { " (reach)" } else { "" },
                    tiles_to_string(&self.hands[seat]),
                    tiles_to_string(&self.discards[seat]),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"dora indicators: {}
disclosed: {:?}
{seats}"#,
            tiles_to_string(&self.display_doras),
            self.disclosed,
        )
    }
}
