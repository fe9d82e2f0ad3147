use std::fmt;

use crate::{
    errors::Error,
    models::{Card, Seat},
};

pub const TRICKS_PER_DEAL: u8 = 13;
pub const FIRST_TRICK: u8 = 1;
pub const CARDS_PER_HAND: usize = 13;

/// The seven deal types of Kierki. The numeric codes are part of the wire
/// format (`DEAL<code>...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DealType {
    NoTricks,
    NoHearts,
    NoQueens,
    NoKingsJacks,
    NoKingOfHearts,
    NoSeventhAndLastTrick,
    Robber,
}

impl DealType {
    pub fn code(self) -> u8 {
        match self {
            DealType::NoTricks => 1,
            DealType::NoHearts => 2,
            DealType::NoQueens => 3,
            DealType::NoKingsJacks => 4,
            DealType::NoKingOfHearts => 5,
            DealType::NoSeventhAndLastTrick => 6,
            DealType::Robber => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<DealType> {
        match code {
            1 => Some(DealType::NoTricks),
            2 => Some(DealType::NoHearts),
            3 => Some(DealType::NoQueens),
            4 => Some(DealType::NoKingsJacks),
            5 => Some(DealType::NoKingOfHearts),
            6 => Some(DealType::NoSeventhAndLastTrick),
            7 => Some(DealType::Robber),
            _ => None,
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One configured deal: its type, the seat leading trick 1 and the 13 cards
/// each seat starts with. The four hands partition the 52-card deck; the
/// loader in `config` enforces that before a `DealConfig` is built.
#[derive(Debug, Clone)]
pub struct DealConfig {
    pub deal_type: DealType,
    pub first_seat: Seat,
    hands: [Vec<Card>; 4],
}

impl DealConfig {
    pub fn new(
        deal_type: DealType,
        first_seat: Seat,
        hands: [Vec<Card>; 4],
    ) -> Result<Self, Error> {
        for (seat, hand) in Seat::ALL.iter().zip(hands.iter()) {
            if hand.len() != CARDS_PER_HAND {
                return Err(Error::Other(format!(
                    "seat {seat} has {} cards, expected {CARDS_PER_HAND}",
                    hand.len()
                )));
            }
        }
        Ok(DealConfig {
            deal_type,
            first_seat,
            hands,
        })
    }

    /// The hand originally dealt to `seat`, in deal-file order.
    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat as usize]
    }
}
