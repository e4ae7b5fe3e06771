//! Deal-in training samples.
//!
//! One sample is produced for every (discard, opponent in reach) pair. The
//! feature vector is laid out as:
//!
//! | offset | len | content                                              |
//! |--------|-----|------------------------------------------------------|
//! | 0      | 34  | copies per kind the discarder can account for        |
//! | 34     | 34  | copies per kind in the reach player's discards       |
//! | 68     | 136 | one-hot of the discarded tile id                     |
//! | 204    | 1   | discarded tile is dora                               |
//! | 205    | 1   | discarded tile is suji against the reach player      |
//!
//! The label is 1 iff the very next event is the reach player's win.

use crate::consts::{FEATURE_LEN, MAX_COPIES, TILE_KIND_NUM, TILE_NUM};
use crate::event::Event;
use crate::rules::{is_dora, is_suji};
use crate::state::{RoundState, Violation};
use crate::tile::Tile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSample {
    pub features: Vec<u8>,
    pub label: u8,
}

impl TrainingSample {
    /// Encodes as `[[f0,f1,...],label]` plus a newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = serde_json::json!([self.features, self.label]).to_string();
        line.push('\n');
        line
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        let (features, label) = serde_json::from_str(line.trim_end())?;
        Ok(Self { features, label })
    }
}

/// Builds the sample for `discarder`'s latest discard `tile` as seen against
/// `reach_player`. `next` is the event right after the discard, if any.
pub fn generate(
    state: &RoundState,
    discarder: u8,
    reach_player: u8,
    tile: Tile,
    next: Option<&Event>,
) -> Result<TrainingSample, Violation> {
    let mut features = Vec::with_capacity(FEATURE_LEN);

    features.extend(visible_counts(state, discarder)?);

    let mut reach_discards = [0_u8; TILE_KIND_NUM];
    for t in state.discards(reach_player) {
        reach_discards[t.kind_usize()] += 1;
    }
    features.extend(reach_discards);

    let mut one_hot = [0_u8; TILE_NUM];
    one_hot[tile.as_usize()] = 1;
    features.extend(one_hot);

    features.push(is_dora(tile, state.display_doras()) as u8);
    features.push(is_suji(tile, state.discards(reach_player)) as u8);
    debug_assert_eq!(features.len(), FEATURE_LEN);

    let label = matches!(next, Some(&Event::Agari { actor, .. }) if actor == reach_player);
    Ok(TrainingSample {
        features,
        label: label as u8,
    })
}

/// Concatenated lines for every opponent of `discarder` that is in reach.
/// Empty if there is none.
pub fn generate_lines(
    state: &RoundState,
    discarder: u8,
    tile: Tile,
    next: Option<&Event>,
) -> Result<String, Violation> {
    state
        .reach_opponents(discarder)
        .map(|reach_player| generate(state, discarder, reach_player, tile, next).map(|s| s.to_line()))
        .collect()
}

/// Disclosed counts plus the discarder's hand, minus the tiles of the
/// discarder's own calls. Hands keep their melded tiles, so the subtraction
/// removes the copies that would otherwise be counted twice.
fn visible_counts(state: &RoundState, seat: u8) -> Result<[u8; TILE_KIND_NUM], Violation> {
    let mut counts = state.disclosed().map(i16::from);
    for t in state.hand(seat) {
        counts[t.kind_usize()] += 1;
    }
    for t in state.calls(seat).iter().flatten() {
        counts[t.kind_usize()] -= 1;
    }

    let mut ret = [0; TILE_KIND_NUM];
    for (kind, (&count, out)) in counts.iter().zip(&mut ret).enumerate() {
        *out = u8::try_from(count)
            .ok()
            .filter(|&c| c <= MAX_COPIES)
            .ok_or(Violation::VisibilityOutOfRange {
                seat,
                kind: kind as u8,
                count,
            })?;
    }
    Ok(ret)
}
