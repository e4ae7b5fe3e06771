use crate::consts::PLAYER_NUM;
use crate::mjlog::Tag;
use crate::tile::Tile;

use std::str::FromStr;

/// A single log element, typed by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Round start.
    Init {
        oya: u8,
        dora_indicator: Tile,
        haipai: [Vec<Tile>; 4],
    },
    Draw {
        actor: u8,
        tile: Tile,
    },
    Discard {
        actor: u8,
        tile: Tile,
    },
    /// Open meld or kan declaration, `m` is the packed descriptor.
    Call {
        actor: u8,
        m: u32,
    },
    Reach {
        actor: u8,
        step: u8,
    },
    /// Kan dora indicator reveal.
    Dora {
        tile: Tile,
    },
    Agari {
        actor: u8,
        target: u8,
    },
    /// Anything the replayer does not look at (`SHUFFLE`, `GO`, `UN`,
    /// `TAIKYOKU`, `RYUUKYOKU`, `BYE`, ...).
    Other {
        name: String,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("<{tag}> is missing attribute {attr:?}")]
    MissingAttr { tag: String, attr: &'static str },
    #[error("<{tag}> has invalid {attr:?}: {value:?}")]
    InvalidValue {
        tag: String,
        attr: &'static str,
        value: String,
    },
}

impl Event {
    #[inline]
    #[must_use]
    pub const fn actor(&self) -> Option<u8> {
        match *self {
            Self::Draw { actor, .. }
            | Self::Discard { actor, .. }
            | Self::Call { actor, .. }
            | Self::Reach { actor, .. }
            | Self::Agari { actor, .. } => Some(actor),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_discard(&self) -> bool {
        matches!(self, Self::Discard { .. })
    }
}

impl TryFrom<&Tag> for Event {
    type Error = TagError;

    fn try_from(tag: &Tag) -> Result<Self, Self::Error> {
        let name = tag.name.as_str();
        let ev = match name {
            "INIT" => {
                let seed = required(tag, "seed")?;
                let indicator = seed.rsplit(',').next().unwrap_or_default();
                let dora_indicator = tile(tag, "seed", indicator)?;
                let haipai = [
                    tile_list(tag, "hai0")?,
                    tile_list(tag, "hai1")?,
                    tile_list(tag, "hai2")?,
                    tile_list(tag, "hai3")?,
                ];
                Self::Init {
                    oya: seat(tag, "oya")?,
                    dora_indicator,
                    haipai,
                }
            }
            "N" => Self::Call {
                actor: seat(tag, "who")?,
                m: number(tag, "m")?,
            },
            "REACH" => Self::Reach {
                actor: seat(tag, "who")?,
                step: number(tag, "step")?,
            },
            "DORA" => Self::Dora {
                tile: tile(tag, "hai", required(tag, "hai")?)?,
            },
            "AGARI" => Self::Agari {
                actor: seat(tag, "who")?,
                target: seat(tag, "fromWho")?,
            },
            _ => match split_tile_tag(name) {
                Some((letter, id)) => {
                    let tile = tile(tag, "id", id)?;
                    match letter {
                        'T' | 'U' | 'V' | 'W' => Self::Draw {
                            actor: letter as u8 - b'T',
                            tile,
                        },
                        _ => Self::Discard {
                            actor: letter as u8 - b'D',
                            tile,
                        },
                    }
                }
                None => Self::Other {
                    name: name.to_owned(),
                },
            },
        };
        Ok(ev)
    }
}

/// `T12` -> `('T', "12")`, only for the eight draw/discard letters.
fn split_tile_tag(name: &str) -> Option<(char, &str)> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let id = chars.as_str();
    let is_tile_tag = matches!(letter, 'T' | 'U' | 'V' | 'W' | 'D' | 'E' | 'F' | 'G')
        && !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit());
    is_tile_tag.then_some((letter, id))
}

fn required<'a>(tag: &'a Tag, attr: &'static str) -> Result<&'a str, TagError> {
    tag.attr(attr).ok_or_else(|| TagError::MissingAttr {
        tag: tag.name.clone(),
        attr,
    })
}

fn invalid(tag: &Tag, attr: &'static str, value: &str) -> TagError {
    TagError::InvalidValue {
        tag: tag.name.clone(),
        attr,
        value: value.to_owned(),
    }
}

fn number<T: FromStr>(tag: &Tag, attr: &'static str) -> Result<T, TagError> {
    let value = required(tag, attr)?;
    value.trim().parse().map_err(|_| invalid(tag, attr, value))
}

fn seat(tag: &Tag, attr: &'static str) -> Result<u8, TagError> {
    let value: u8 = number(tag, attr)?;
    if (value as usize) < PLAYER_NUM {
        Ok(value)
    } else {
        Err(invalid(tag, attr, &value.to_string()))
    }
}

fn tile(tag: &Tag, attr: &'static str, value: &str) -> Result<Tile, TagError> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(|id| Tile::try_from(id).ok())
        .ok_or_else(|| invalid(tag, attr, value))
}

fn tile_list(tag: &Tag, attr: &'static str) -> Result<Vec<Tile>, TagError> {
    required(tag, attr)?
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| tile(tag, attr, s))
        .collect()
}
