pub const PLAYER_NUM: usize = 4;

/// Three suits of nine ranks plus seven honors.
pub const TILE_KIND_NUM: usize = 9 * 3 + 7;
pub const TILE_NUM: usize = TILE_KIND_NUM * 4;

/// Physical copies of a single kind.
pub const MAX_COPIES: u8 = 4;

/// Copy 0 of each suit's five.
pub const RED_DORAS: [u8; 3] = [16, 52, 88];

/// visibility + reach discards + one-hot discard + dora bit + suji bit
pub const FEATURE_LEN: usize = TILE_KIND_NUM * 2 + TILE_NUM + 2;

/// `REACH` step value meaning the declaration is accepted.
pub const REACH_ACCEPTED_STEP: u8 = 2;
