use crate::consts::{RED_DORAS, TILE_KIND_NUM, TILE_NUM};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

const KIND_STRINGS: [&str; TILE_KIND_NUM] = [
    "1m", "2m", "3m", "4m", "5m", "6m", "7m", "8m", "9m", // m
    "1p", "2p", "3p", "4p", "5p", "6p", "7p", "8p", "9p", // p
    "1s", "2s", "3s", "4s", "5s", "6s", "7s", "8s", "9s", // s
    "E", "S", "W", "N", "P", "F", "C", // z
];

/// A physical tile in the 136-tile set, `kind * 4 + copy`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile(u8);

#[derive(Debug)]
pub enum InvalidTile {
    Number(usize),
    String(String),
}

impl Tile {
    /// The id must be in `[0, 136)`, otherwise kind lookups go out of range.
    #[inline]
    #[must_use]
    pub const fn new_unchecked(id: u8) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn from_kind(kind: u8, copy: u8) -> Option<Self> {
        if (kind as usize) < TILE_KIND_NUM && copy < 4 {
            Some(Self(kind * 4 + copy))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn kind(self) -> u8 {
        self.0 / 4
    }
    #[inline]
    #[must_use]
    pub const fn kind_usize(self) -> usize {
        (self.0 / 4) as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_aka(self) -> bool {
        self.0 == RED_DORAS[0] || self.0 == RED_DORAS[1] || self.0 == RED_DORAS[2]
    }
}

/// Kind of the tile that a dora indicator of `kind` points at.
///
/// Suits wrap 9 -> 1, winds wrap N -> E and dragons wrap C -> P.
#[inline]
#[must_use]
pub const fn next_kind(kind: u8) -> u8 {
    let suit = kind / 9;
    let num = kind % 9;
    if suit < 3 {
        suit * 9 + (num + 1) % 9
    } else if num < 4 {
        3 * 9 + (num + 1) % 4
    } else {
        3 * 9 + 4 + (num - 4 + 1) % 3
    }
}

#[must_use]
pub fn kind_to_string(kind: u8) -> &'static str {
    KIND_STRINGS.get(kind as usize).copied().unwrap_or("?")
}

/// Renders tiles the way the log viewer lists them, e.g. `1m 5mr E`.
#[must_use]
pub fn tiles_to_string<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> String {
    tiles
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl TryFrom<u8> for Tile {
    type Error = InvalidTile;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::try_from(v as usize)
    }
}

impl TryFrom<usize> for Tile {
    type Error = InvalidTile;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        if v >= TILE_NUM {
            Err(InvalidTile::Number(v))
        } else {
            Ok(Self(v as u8))
        }
    }
}

/// Parses `1m`..`C`, picking the first copy. Fives pick copy 1 unless
/// suffixed with `r`, which selects the red copy 0.
impl FromStr for Tile {
    type Err = InvalidTile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, red) = match s.strip_suffix('r') {
            Some(name) => (name, true),
            None => (s, false),
        };
        let kind = KIND_STRINGS
            .iter()
            .position(|&k| k == name)
            .ok_or_else(|| InvalidTile::String(s.to_owned()))? as u8;
        let is_five = kind < 27 && kind % 9 == 4;
        let copy = match (is_five, red) {
            (true, true) => 0,
            (true, false) => 1,
            (false, false) => 0,
            (false, true) => return Err(InvalidTile::String(s.to_owned())),
        };
        Ok(Self(kind * 4 + copy))
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}#{}", self.0)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(kind_to_string(self.kind()))?;
        if self.is_aka() {
            f.write_str("r")?;
        }
        Ok(())
    }
}

/// Serialized as the raw id, matching the log format.
impl Serialize for Tile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl fmt::Display for InvalidTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a valid tile: ")?;
        match self {
            Self::Number(n) => fmt::Display::fmt(n, f),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl Error for InvalidTile {}
