//! Event-by-event round replay.

use crate::consts::{PLAYER_NUM, REACH_ACCEPTED_STEP};
use crate::event::Event;
use crate::features;
use crate::meld::{Meld, MeldKind};
use crate::mjlog::Tag;
use crate::state::{RoundState, Violation};

/// How far back a call may look for the discard it claims. Covers the
/// discard, an accepted reach on it, and the call itself.
const CLAIM_LOOKBACK: usize = 3;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("inconsistent state at event {index}: {violation}")]
    Consistency {
        index: usize,
        #[source]
        violation: Violation,
    },
    #[error("malformed event {index}: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Outcome of consuming one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The event only updated the state.
    Idle,
    /// The event was a discard. Holds one line per opponent in reach, so it
    /// may be empty.
    Output(String),
    Exhausted,
}

/// Replays a recorded event stream and emits deal-in training lines at every
/// discard.
///
/// A fatal error stops the replay for good: every later call reports the
/// stream as exhausted.
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    events: Vec<Event>,
    /// Index of the last consumed event.
    cursor: Option<usize>,
    state: Option<RoundState>,
    failed: bool,
}

impl Replayer {
    #[must_use]
    pub const fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            cursor: None,
            state: None,
            failed: false,
        }
    }

    pub fn from_tags(tags: &[Tag]) -> Result<Self, ReplayError> {
        let events = tags
            .iter()
            .enumerate()
            .map(|(index, tag)| {
                Event::try_from(tag).map_err(|err| ReplayError::Malformed {
                    index,
                    reason: err.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self::new(events))
    }

    /// Consumes exactly one event.
    pub fn advance(&mut self) -> Result<Step, ReplayError> {
        let index = self.cursor.map_or(0, |c| c + 1);
        if self.failed || index >= self.events.len() {
            return Ok(Step::Exhausted);
        }
        self.cursor = Some(index);

        let ret = self.handle(index);
        if ret.is_err() {
            self.failed = true;
        }
        ret
    }

    /// Advances until a discard produces output. `Ok(None)` once the stream
    /// is exhausted.
    pub fn run_to_next_output(&mut self) -> Result<Option<String>, ReplayError> {
        loop {
            match self.advance()? {
                Step::Idle => {}
                Step::Output(lines) => return Ok(Some(lines)),
                Step::Exhausted => return Ok(None),
            }
        }
    }

    /// Every remaining output, concatenated.
    pub fn replay_all(&mut self) -> Result<String, ReplayError> {
        self.by_ref().collect()
    }

    /// Number of outputs a full replay yields.
    #[must_use]
    pub fn discard_count(&self) -> usize {
        self.events.iter().filter(|ev| ev.is_discard()).count()
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// `None` until the first round starts.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> Option<&RoundState> {
        self.state.as_ref()
    }

    /// JSON dump of the current round, `null` before the first round.
    pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        self.state
            .as_ref()
            .map_or(Ok(serde_json::Value::Null), RoundState::snapshot)
    }

    fn handle(&mut self, index: usize) -> Result<Step, ReplayError> {
        let consistency = |violation| ReplayError::Consistency { index, violation };
        let event = &self.events[index];

        if let Some(actor) = event.actor()
            && actor as usize >= PLAYER_NUM
        {
            return Err(ReplayError::Malformed {
                index,
                reason: format!("seat {actor} out of range"),
            });
        }

        match event {
            Event::Init {
                oya,
                dora_indicator,
                haipai,
            } => {
                log::debug!("round start at event {index}: oya {oya}, dora indicator {dora_indicator}");
                let state = RoundState::new(*oya, *dora_indicator, haipai).map_err(consistency)?;
                self.state = Some(state);
                return Ok(Step::Idle);
            }
            Event::Agari { actor, target } => {
                log::debug!("seat {actor} wins off seat {target} at event {index}");
                return Ok(Step::Idle);
            }
            Event::Other { .. } => return Ok(Step::Idle),
            _ => {}
        }

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| consistency(Violation::NoRound))?;

        match *event {
            Event::Draw { actor, tile } => state.draw(actor, tile),
            Event::Discard { actor, tile } => {
                state.discard(actor, tile).map_err(consistency)?;
                let next = self.events.get(index + 1);
                let lines = features::generate_lines(state, actor, tile, next).map_err(consistency)?;
                return Ok(Step::Output(lines));
            }
            Event::Reach { actor, step } => {
                if step == REACH_ACCEPTED_STEP {
                    state.accept_reach(actor);
                }
            }
            Event::Dora { tile } => state.add_dora_indicator(tile),
            Event::Call { actor, m } => {
                let meld = Meld::decode(m).map_err(|err| ReplayError::Malformed {
                    index,
                    reason: err.to_string(),
                })?;
                let ret = match meld.kind {
                    MeldKind::Kakan => state.add_kakan(actor, meld.tiles[3]),
                    MeldKind::Kan if !kan_is_open(&self.events, index) => {
                        state.add_ankan(actor, meld.tiles)
                    }
                    MeldKind::Chi | MeldKind::Pon | MeldKind::Kan => {
                        add_claimed(state, &self.events, index, actor, meld)
                    }
                };
                ret.map_err(consistency)?;
            }
            Event::Init { .. } | Event::Agari { .. } | Event::Other { .. } => {}
        }

        Ok(Step::Idle)
    }
}

impl Iterator for Replayer {
    type Item = Result<String, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.run_to_next_output().transpose()
    }
}

/// A kan right after a discard, or after a discard and the reach declared
/// with it, claims that discard.
fn kan_is_open(events: &[Event], index: usize) -> bool {
    let mut prev = index.checked_sub(1).map(|i| (i, &events[i]));
    if let Some((i, Event::Reach { .. })) = prev {
        prev = i.checked_sub(1).map(|i| (i, &events[i]));
    }
    matches!(prev, Some((_, Event::Discard { .. })))
}

/// Takes the most recent discard within reach of the call at `index` into
/// `actor`'s hand and records the meld.
fn add_claimed(
    state: &mut RoundState,
    events: &[Event],
    index: usize,
    actor: u8,
    meld: Meld,
) -> Result<(), Violation> {
    let discarded = events[index.saturating_sub(CLAIM_LOOKBACK)..index]
        .iter()
        .rev()
        .find_map(|ev| match *ev {
            Event::Discard { tile, .. } => Some(tile),
            _ => None,
        })
        .ok_or(Violation::MissingClaimSource)?;

    let claimed = meld.called_tile();
    if claimed != discarded {
        return Err(Violation::ClaimedTileMismatch { claimed, discarded });
    }
    state.add_claimed_meld(actor, discarded, meld.tiles, meld.called_index)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consts::FEATURE_LEN;
    use crate::features::TrainingSample;
    use crate::tile::Tile;

    fn t(id: u8) -> Tile {
        Tile::new_unchecked(id)
    }

    fn init_with(indicator: u8, haipai: [&[u8]; 4]) -> Event {
        Event::Init {
            oya: 0,
            dora_indicator: t(indicator),
            haipai: haipai.map(|h| h.iter().copied().map(t).collect()),
        }
    }

    /// Indicator 2p; seat 0 holds 1m 2m 3m, seat 1 holds 1p 1p, seat 3
    /// holds E.
    fn init() -> Event {
        init_with(40, [&[0, 4, 8], &[36, 37], &[], &[108]])
    }

    fn draw(actor: u8, id: u8) -> Event {
        Event::Draw {
            actor,
            tile: Tile::new_unchecked(id),
        }
    }

    fn discard(actor: u8, id: u8) -> Event {
        Event::Discard {
            actor,
            tile: Tile::new_unchecked(id),
        }
    }

    fn reach(actor: u8, step: u8) -> Event {
        Event::Reach { actor, step }
    }

    fn call(actor: u8, m: u32) -> Event {
        Event::Call { actor, m }
    }

    fn state(replayer: &Replayer) -> &RoundState {
        replayer.state().unwrap()
    }

    fn replay_until_end(replayer: &mut Replayer) {
        while replayer.advance().unwrap() != Step::Exhausted {}
    }

    #[test]
    fn no_reach_yields_empty_output() {
        let mut replayer = Replayer::new(vec![init(), draw(0, 12), discard(0, 12)]);
        assert_eq!(replayer.cursor(), None);
        assert_eq!(replayer.advance().unwrap(), Step::Idle);
        assert_eq!(replayer.cursor(), Some(0));
        assert_eq!(replayer.advance().unwrap(), Step::Idle);
        assert_eq!(replayer.advance().unwrap(), Step::Output(String::new()));
        assert_eq!(replayer.advance().unwrap(), Step::Exhausted);
        assert_eq!(replayer.advance().unwrap(), Step::Exhausted);
        assert_eq!(replayer.cursor(), Some(2));

        let mut replayer = Replayer::new(vec![init(), draw(0, 12), discard(0, 12)]);
        assert_eq!(replayer.run_to_next_output().unwrap(), Some(String::new()));
        assert_eq!(replayer.run_to_next_output().unwrap(), None);
    }

    #[test]
    fn one_reach_player_yields_one_line() {
        let events = vec![
            init(),
            reach(1, 1),
            reach(1, 2),
            draw(0, 12),
            discard(0, 12),
            Event::Agari { actor: 1, target: 0 },
        ];
        let mut replayer = Replayer::new(events);
        let out = replayer.run_to_next_output().unwrap().unwrap();
        assert_eq!(out.matches('\n').count(), 1);

        let sample = TrainingSample::from_line(&out).unwrap();
        assert_eq!(sample.label, 1);
        let f = &sample.features;
        assert_eq!(f.len(), FEATURE_LEN);
        for (kind, &count) in f[..34].iter().enumerate() {
            let expected = u8::from(matches!(kind, 0..=3 | 10));
            assert_eq!(count, expected, "visibility of kind {kind}");
        }
        assert!(f[34..68].iter().all(|&c| c == 0));
        assert_eq!(f[68 + 12], 1);
        assert_eq!(f[204], 0);
        assert_eq!(f[205], 0);

        assert_eq!(replayer.run_to_next_output().unwrap(), None);
    }

    #[test]
    fn last_discard_has_negative_label() {
        let events = vec![init(), reach(1, 2), draw(0, 12), discard(0, 12)];
        let out = Replayer::new(events).replay_all().unwrap();
        assert_eq!(TrainingSample::from_line(&out).unwrap().label, 0);
    }

    #[test]
    fn win_by_someone_else_is_negative() {
        let events = vec![
            init(),
            reach(1, 2),
            reach(2, 2),
            draw(0, 12),
            discard(0, 12),
            Event::Agari { actor: 2, target: 0 },
        ];
        let out = Replayer::new(events).replay_all().unwrap();
        let labels = out
            .lines()
            .map(|l| TrainingSample::from_line(l).unwrap().label)
            .collect::<Vec<_>>();
        assert_eq!(labels, [0, 1]);
    }

    #[test]
    fn reach_is_monotonic() {
        let events = vec![init(), reach(2, 1), reach(2, 2), draw(2, 50), discard(2, 50), reach(2, 1)];
        let mut replayer = Replayer::new(events);
        replayer.advance().unwrap();
        replayer.advance().unwrap();
        assert_eq!(state(&replayer).reach(), [false; 4]);
        replayer.advance().unwrap();
        assert_eq!(state(&replayer).reach(), [false, false, true, false]);
        replay_until_end(&mut replayer);
        assert_eq!(state(&replayer).reach(), [false, false, true, false]);
    }

    #[test]
    fn discard_of_absent_tile_is_fatal() {
        let mut replayer = Replayer::new(vec![init(), discard(0, 12), draw(0, 12)]);
        replayer.advance().unwrap();
        assert_eq!(
            replayer.advance().unwrap_err(),
            ReplayError::Consistency {
                index: 1,
                violation: Violation::TileNotInHand { seat: 0, tile: t(12) },
            },
        );
        assert_eq!(replayer.advance().unwrap(), Step::Exhausted);
        assert_eq!(replayer.next(), None);
    }

    #[test]
    fn event_before_round_start() {
        let mut replayer = Replayer::new(vec![Event::Other { name: "GO".to_owned() }, draw(0, 1)]);
        assert_eq!(replayer.advance().unwrap(), Step::Idle);
        assert!(replayer.state().is_none());
        assert_eq!(replayer.snapshot().unwrap(), serde_json::Value::Null);
        assert_eq!(
            replayer.advance().unwrap_err(),
            ReplayError::Consistency {
                index: 1,
                violation: Violation::NoRound,
            },
        );
    }

    #[test]
    fn pon_then_added_kan() {
        let events = vec![
            init_with(40, [&[0, 4, 8, 12], &[13, 14], &[], &[]]),
            discard(0, 12),
            call(1, 4715),
            draw(1, 15),
            call(1, 4723),
        ];
        let mut replayer = Replayer::new(events);
        for _ in 0..3 {
            replayer.advance().unwrap();
        }
        let s = state(&replayer);
        assert_eq!(s.disclosed()[3], 3);
        assert!(s.hand(1).contains(&t(12)));
        assert_eq!(s.calls(1).len(), 1);
        assert_eq!(s.calls(1)[0].as_slice(), [t(12), t(13), t(14)]);

        replayer.advance().unwrap();
        let before = state(&replayer).disclosed()[3];
        replayer.advance().unwrap();
        let s = state(&replayer);
        assert_eq!(s.disclosed()[3], before + 1);
        assert_eq!(s.calls(1).last().unwrap().as_slice(), [t(15)]);
    }

    #[test]
    fn chi_after_reach_declaration() {
        let events = vec![
            init_with(40, [&[0, 13], &[8, 18], &[], &[]]),
            discard(0, 13),
            reach(0, 2),
            call(1, 7463),
        ];
        let mut replayer = Replayer::new(events);
        replay_until_end(&mut replayer);
        let s = state(&replayer);
        assert_eq!(s.disclosed()[2], 1);
        assert_eq!(s.disclosed()[3], 1);
        assert_eq!(s.disclosed()[4], 1);
        assert!(s.hand(1).contains(&t(13)));
        assert_eq!(s.calls(1)[0].as_slice(), [t(8), t(13), t(18)]);
    }

    #[test]
    fn tiles_are_conserved_through_calls() {
        // 1p pon taking copy 2, leaving copy 3 out, and the kakan adding it
        let pon = ((9 * 3 + 2) << 9) | (3 << 5) | 0x8 | 1;
        let kakan = ((9 * 3 + 2) << 9) | (3 << 5) | 0x10 | 1;
        let events = vec![
            init_with(40, [&[0, 13, 20], &[8, 18, 36, 37, 100, 101], &[38, 60], &[108, 109, 110]]),
            draw(0, 24),
            discard(0, 13),
            call(1, 7463),
            discard(1, 100),
            draw(2, 61),
            discard(2, 38),
            call(1, pon),
            discard(1, 101),
            draw(3, 111),
            call(3, 108 << 8),
            Event::Dora { tile: t(41) },
            draw(3, 112),
            discard(3, 112),
            draw(1, 39),
            call(1, kakan),
        ];
        let mut replayer = Replayer::new(events);
        while replayer.advance().unwrap() != Step::Exhausted {
            state(&replayer).validate();
        }

        let s = state(&replayer);
        assert_eq!(s.calls(1).len(), 3);
        assert_eq!(s.calls(1)[1].as_slice(), [t(36), t(37), t(38)]);
        assert_eq!(s.calls(1)[2].as_slice(), [t(39)]);
        assert_eq!(s.calls(3)[0].as_slice(), [t(108), t(109), t(110), t(111)]);
        assert_eq!(s.disclosed()[9], 4);
        assert_eq!(s.disclosed()[27], 4);
        assert_eq!(s.disclosed()[10], 1);
    }

    #[test]
    fn claim_without_discard_is_fatal() {
        let events = vec![
            init_with(40, [&[12], &[13, 14], &[], &[]]),
            discard(0, 12),
            draw(1, 60),
            draw(2, 61),
            draw(3, 62),
            call(1, 4715),
        ];
        let err = Replayer::new(events).replay_all().unwrap_err();
        assert_eq!(
            err,
            ReplayError::Consistency {
                index: 5,
                violation: Violation::MissingClaimSource,
            },
        );
    }

    #[test]
    fn claimed_tile_must_match_discard() {
        let events = vec![
            init_with(40, [&[13], &[12, 14], &[], &[]]),
            discard(0, 13),
            call(1, 4715),
        ];
        let err = Replayer::new(events).replay_all().unwrap_err();
        assert_eq!(
            err,
            ReplayError::Consistency {
                index: 2,
                violation: Violation::ClaimedTileMismatch {
                    claimed: t(12),
                    discarded: t(13),
                },
            },
        );
    }

    #[test]
    fn concealed_and_open_kans() {
        let ankan = vec![
            init_with(40, [&[], &[], &[], &[108, 109, 110]]),
            draw(3, 111),
            call(3, 108 << 8),
        ];
        let mut replayer = Replayer::new(ankan);
        replay_until_end(&mut replayer);
        let s = state(&replayer);
        assert_eq!(s.disclosed()[27], 4);
        assert_eq!(s.calls(3)[0].len(), 4);

        let daiminkan = vec![
            init_with(40, [&[115], &[112, 113, 114], &[], &[]]),
            discard(0, 115),
            call(1, (115 << 8) | 3),
        ];
        let mut replayer = Replayer::new(daiminkan);
        replay_until_end(&mut replayer);
        let s = state(&replayer);
        assert_eq!(s.disclosed()[28], 4);
        assert!(s.hand(1).contains(&t(115)));
    }

    #[test]
    fn fifth_copy_is_fatal() {
        let events = vec![
            init_with(12, [&[13, 14, 15], &[], &[], &[]]),
            draw(0, 16),
            call(0, 12 << 8),
        ];
        let err = Replayer::new(events).replay_all().unwrap_err();
        assert_eq!(
            err,
            ReplayError::Consistency {
                index: 2,
                violation: Violation::DisclosedOverflow { kind: 3, count: 5 },
            },
        );
    }

    #[test]
    fn kan_dora_is_not_disclosed() {
        let events = vec![init(), Event::Dora { tile: t(41) }];
        let mut replayer = Replayer::new(events);
        replay_until_end(&mut replayer);
        let s = state(&replayer);
        assert_eq!(s.display_doras(), [t(40), t(41)]);
        assert_eq!(s.disclosed()[10], 1);
    }

    #[test]
    fn malformed_events() {
        let err = Replayer::new(vec![init(), call(0, 0x20)]).replay_all().unwrap_err();
        assert!(matches!(err, ReplayError::Malformed { index: 1, .. }));

        let err = Replayer::new(vec![init(), draw(4, 0)]).replay_all().unwrap_err();
        assert!(matches!(err, ReplayError::Malformed { index: 1, .. }));

        let tags = [Tag::new("INIT"), Tag::new("T0")];
        assert!(matches!(
            Replayer::from_tags(&tags),
            Err(ReplayError::Malformed { index: 0, .. }),
        ));
    }

    #[test]
    fn new_round_resets_state() {
        let events = vec![
            init(),
            reach(1, 2),
            draw(0, 12),
            discard(0, 12),
            Event::Other { name: "RYUUKYOKU".to_owned() },
            init(),
            draw(0, 12),
            discard(0, 12),
        ];
        let mut replayer = Replayer::new(events);
        assert_eq!(replayer.discard_count(), 2);
        let outputs = replayer.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].lines().count(), 1);
        assert_eq!(outputs[1], "");
        let s = state(&replayer);
        assert_eq!(s.reach(), [false; 4]);
        assert_eq!(s.discards(0), [t(12)]);
    }

    #[test]
    fn snapshot_keys() {
        let mut replayer = Replayer::new(vec![init(), draw(0, 12), discard(0, 12)]);
        replay_until_end(&mut replayer);
        let snapshot = replayer.snapshot().unwrap();
        assert_eq!(snapshot["oya"], 0);
        assert_eq!(snapshot["display_doras"], serde_json::json!([40]));
        assert_eq!(snapshot["discard_tiles"][0], serde_json::json!([12]));
        assert_eq!(snapshot["disclosed_tile_nums"][3], 1);
        assert_eq!(snapshot["hands"][1], serde_json::json!([36, 37]));
    }
}
