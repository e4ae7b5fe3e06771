//! Replays Tenhou mahjong logs and derives deal-in training data.
//!
//! A log is read into a stream of [`Event`](event::Event)s, which a
//! [`Replayer`](replay::Replayer) applies one by one to a
//! [`RoundState`](state::RoundState). Every discard yields one sample per
//! opponent in reach, describing what the discarder could see and whether
//! the tile dealt into that opponent's win.
//!
//! ```no_run
//! use hoju::mjlog;
//! use hoju::replay::Replayer;
//! use std::path::Path;
//!
//! let events = mjlog::read_log(Path::new("2018_log_0001.mjlog.gz"))?;
//! let mut replayer = Replayer::new(events);
//! while let Some(lines) = replayer.run_to_next_output()? {
//!     print!("{lines}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod augment;
pub mod consts;
pub mod event;
pub mod features;
pub mod meld;
pub mod mjlog;
pub mod replay;
pub mod rules;
pub mod state;
pub mod tile;
