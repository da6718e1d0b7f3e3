//! canonical card identity
//!
//! every physical card is (color, type, copy index). its uid is
//! `H4(DOMAIN_CARD_UID, color, type, copy)` and its slot in the canonical
//! table is given by [`card_index`]. the table is generated with the same
//! function the cli authoring tool uses, so runtime and tooling cannot drift.
//!
//! ```text
//!   0..4     wild            x4
//!   4..8     wild draw four  x4
//!   8..33    red     0 x1, 1-9 x2, skip/reverse/draw-two x2
//!   33..58   green
//!   58..83   blue
//!   83..108  yellow
//! ```

use std::fmt;
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{DECK_SIZE, DOMAIN_CARD_UID};
use crate::error::{Error, Result};
use crate::field::Fr;
use crate::poseidon::hash4;

pub const SKIP: u8 = 10;
pub const REVERSE: u8 = 11;
pub const DRAW_TWO: u8 = 12;
pub const WILD_PLAIN: u8 = 13;
pub const WILD_DRAW_FOUR: u8 = 14;

/// cards of each colored kind per color, zero excluded
const COLORED_COPIES: u8 = 2;
/// cards of each wild kind
const WILD_COPIES: u8 = 4;
/// table slots per color
const COLOR_STRIDE: usize = 25;
/// first colored slot
const COLOR_BASE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    Wild = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Yellow = 4,
}

impl Color {
    pub const PLAYABLE: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Wild),
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            3 => Some(Self::Blue),
            4 => Some(Self::Yellow),
            _ => None,
        }
    }

    fn letter(self) -> Option<char> {
        match self {
            Self::Wild => None,
            Self::Red => Some('R'),
            Self::Green => Some('G'),
            Self::Blue => Some('B'),
            Self::Yellow => Some('Y'),
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'R' => Some(Self::Red),
            'G' => Some(Self::Green),
            'B' => Some(Self::Blue),
            'Y' => Some(Self::Yellow),
            _ => None,
        }
    }
}

/// a card kind without its copy index, as named by a symbolic code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub color: Color,
    pub card_type: u8,
}

impl Card {
    pub fn new(color: Color, card_type: u8) -> Self {
        Self { color, card_type }
    }

    pub fn is_wild(&self) -> bool {
        self.color == Color::Wild
    }

    /// physical copies of this kind in a full deck (0 if the kind is invalid)
    pub fn copies(&self) -> u8 {
        match (self.color, self.card_type) {
            (Color::Wild, WILD_PLAIN | WILD_DRAW_FOUR) => WILD_COPIES,
            (Color::Wild, _) => 0,
            (_, 0) => 1,
            (_, 1..=DRAW_TWO) => COLORED_COPIES,
            _ => 0,
        }
    }

    /// parse a symbolic card code such as `0R`, `skipG`, `D2B` or `W4`
    pub fn parse(code: &str) -> Result<Self> {
        let unknown = || Error::UnknownCardCode(code.to_string());

        match code {
            "W" => return Ok(Self::new(Color::Wild, WILD_PLAIN)),
            "W4" | "WD4" | "D4" => return Ok(Self::new(Color::Wild, WILD_DRAW_FOUR)),
            _ => {}
        }

        let mut chars = code.chars();
        let color = chars.next_back().and_then(Color::from_letter).ok_or_else(unknown)?;
        let value = chars.as_str();

        let card_type = match value {
            "skip" | "S" => SKIP,
            "rev" | "reverse" | "R" => REVERSE,
            "D2" | "draw2" => DRAW_TWO,
            digit if digit.len() == 1 => digit
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .map(|d| d as u8)
                .ok_or_else(unknown)?,
            _ => return Err(unknown()),
        };

        Ok(Self::new(color, card_type))
    }

    /// canonical symbolic code, inverse of [`Card::parse`]
    pub fn code(&self) -> String {
        let value = match self.card_type {
            WILD_PLAIN if self.is_wild() => return "W".into(),
            WILD_DRAW_FOUR if self.is_wild() => return "W4".into(),
            SKIP => "skip".to_string(),
            REVERSE => "rev".to_string(),
            DRAW_TWO => "D2".to_string(),
            n => n.to_string(),
        };
        match self.color.letter() {
            Some(letter) => format!("{}{}", value, letter),
            None => value,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// position of (color, type, copy) in the canonical uid table
pub fn card_index(color: u8, card_type: u8, copy_index: u8) -> Result<usize> {
    let invalid = || Error::InvalidCard {
        color,
        card_type,
        copy_index,
    };

    let parsed = Color::from_u8(color).ok_or_else(invalid)?;
    let copies = Card::new(parsed, card_type).copies();
    if copy_index >= copies {
        return Err(invalid());
    }

    let copy = copy_index as usize;
    let ty = card_type as usize;
    let index = if parsed == Color::Wild {
        if card_type == WILD_PLAIN {
            copy
        } else {
            4 + copy
        }
    } else {
        let color_offset = COLOR_BASE + (color as usize - 1) * COLOR_STRIDE;
        match card_type {
            0 => color_offset,
            1..=9 => color_offset + 1 + (ty - 1) * 2 + copy,
            _ => color_offset + 19 + (ty - 10) * 2 + copy,
        }
    };

    if index >= DECK_SIZE {
        return Err(invalid());
    }
    Ok(index)
}

/// every (color, type, copy) triple in table order
pub fn canonical_enumeration() -> Vec<(u8, u8, u8)> {
    let mut out = Vec::with_capacity(DECK_SIZE);
    for wild in [WILD_PLAIN, WILD_DRAW_FOUR] {
        for copy in 0..WILD_COPIES {
            out.push((Color::Wild as u8, wild, copy));
        }
    }
    for color in Color::PLAYABLE {
        out.push((color as u8, 0, 0));
        for card_type in 1..=DRAW_TWO {
            for copy in 0..COLORED_COPIES {
                out.push((color as u8, card_type, copy));
            }
        }
    }
    out
}

/// uid of one physical card, the generator for the canonical table
pub fn compute_card_uid(color: u8, card_type: u8, copy_index: u8) -> Fr {
    hash4(
        Fr::from(DOMAIN_CARD_UID),
        Fr::from(color as u64),
        Fr::from(card_type as u64),
        Fr::from(copy_index as u64),
    )
}

/// the 108 canonical uids, materialised once per process
pub fn card_uid_table() -> &'static [Fr] {
    static TABLE: OnceLock<Vec<Fr>> = OnceLock::new();
    TABLE.get_or_init(|| {
        canonical_enumeration()
            .into_iter()
            .map(|(color, card_type, copy)| compute_card_uid(color, card_type, copy))
            .collect()
    })
}

pub fn get_card_uid(color: u8, card_type: u8, copy_index: u8) -> Result<Fr> {
    let index = card_index(color, card_type, copy_index)?;
    Ok(card_uid_table()[index])
}

/// all 108 symbolic codes in canonical order
pub fn standard_deck_codes() -> Vec<String> {
    canonical_enumeration()
        .into_iter()
        .filter_map(|(color, card_type, _)| {
            Color::from_u8(color).map(|c| Card::new(c, card_type).code())
        })
        .collect()
}

pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let mut deck = standard_deck_codes();
    deck.shuffle(rng);
    deck
}
