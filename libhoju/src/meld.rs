//! Decoding of the packed `m` attribute carried by `N` (call) tags.

use crate::tile::Tile;

use tinyvec::ArrayVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldKind {
    Chi,
    Pon,
    /// Added kan, upgrading an existing pon.
    Kakan,
    /// Either a concealed kan or an open kan claimed from a discard. The
    /// descriptor alone cannot tell them apart.
    Kan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meld {
    pub kind: MeldKind,
    /// Sorted by id, except for kakan where the three pon tiles come first and
    /// the added tile is last.
    pub tiles: ArrayVec<[Tile; 4]>,
    /// Index into `tiles` of the tile taken from another player's discard.
    pub called_index: usize,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MeldError {
    #[error("nukidora call {0} is not supported in four-player replays")]
    Nuki(u32),
    #[error("call descriptor {0} decodes to an out-of-range tile")]
    OutOfRange(u32),
}

impl Meld {
    pub fn decode(m: u32) -> Result<Self, MeldError> {
        if m & 0x4 != 0 {
            let copies = [(m >> 3) & 3, (m >> 5) & 3, (m >> 7) & 3];
            let base_and_called = m >> 10;
            let called = base_and_called % 3;
            let base = base_and_called / 3;
            // 7 possible starting ranks per suit.
            let base = (base / 7) * 9 + base % 7;
            if base >= 27 {
                return Err(MeldError::OutOfRange(m));
            }
            let tiles = copies
                .iter()
                .enumerate()
                .map(|(i, &copy)| tile(m, base + i as u32, copy))
                .collect::<Result<_, _>>()?;
            return Ok(Self {
                kind: MeldKind::Chi,
                tiles,
                called_index: called as usize,
            });
        }

        if m & 0x18 != 0 {
            let unused = (m >> 5) & 3;
            let base_and_called = m >> 9;
            let called = base_and_called % 3;
            let base = base_and_called / 3;
            let mut tiles = (0..4)
                .filter(|&copy| copy != unused)
                .map(|copy| tile(m, base, copy))
                .collect::<Result<ArrayVec<[Tile; 4]>, _>>()?;
            let kind = if m & 0x8 != 0 {
                MeldKind::Pon
            } else {
                tiles.push(tile(m, base, unused)?);
                MeldKind::Kakan
            };
            return Ok(Self {
                kind,
                tiles,
                called_index: called as usize,
            });
        }

        if m & 0x20 != 0 {
            return Err(MeldError::Nuki(m));
        }

        let called_id = m >> 8;
        let base = called_id / 4;
        let tiles = (0..4)
            .map(|copy| tile(m, base, copy))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            kind: MeldKind::Kan,
            tiles,
            called_index: (called_id % 4) as usize,
        })
    }

    #[inline]
    #[must_use]
    pub fn called_tile(&self) -> Tile {
        self.tiles[self.called_index]
    }
}

fn tile(m: u32, kind: u32, copy: u32) -> Result<Tile, MeldError> {
    u8::try_from(kind)
        .ok()
        .and_then(|kind| Tile::from_kind(kind, copy as u8))
        .ok_or(MeldError::OutOfRange(m))
}
