use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::models::{Card, DealType, Seat};

/// Every message of the wire protocol. `Display` renders the canonical
/// frame, CRLF included; [`super::parse`] is its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    IAm {
        seat: Seat,
    },
    Busy {
        seats: Vec<Seat>,
    },
    Deal {
        deal_type: DealType,
        first_seat: Seat,
        cards: Vec<Card>,
    },
    /// Server to client: a request carrying the 0..=3 cards already on the
    /// table. Client to server: the answer carrying exactly one card.
    Trick {
        number: u8,
        cards: Vec<Card>,
    },
    Wrong {
        number: u8,
    },
    Taken {
        number: u8,
        cards: Vec<Card>,
        taker: Seat,
    },
    Score {
        points: BTreeMap<Seat, u32>,
    },
    Total {
        points: BTreeMap<Seat, u32>,
    },
}

impl Message {
    /// Human-readable rendering shown to an interactive client user. The raw
    /// frame itself goes to the wire trace, not here.
    pub fn describe(&self) -> String {
        match self {
            Message::IAm { seat } => format!("Sitting down at place {seat}."),
            Message::Busy { seats } => format!(
                "Place busy, list of busy places received: {}.",
                seats.iter().map(Seat::to_string).join(", ")
            ),
            Message::Deal {
                deal_type,
                first_seat,
                cards,
            } => format!(
                "New deal {deal_type}: starting place {first_seat}, your cards: {}.",
                cards.iter().map(Card::to_string).join(", ")
            ),
            Message::Trick { number, cards } => format!(
                "Trick: ({number}) {}.",
                cards.iter().map(Card::to_string).join(", ")
            ),
            Message::Wrong { number } => {
                format!("Wrong message received in trick {number}.")
            }
            Message::Taken {
                number,
                cards,
                taker,
            } => format!(
                "A trick {number} is taken by {taker}, cards {}.",
                cards.iter().map(Card::to_string).join(", ")
            ),
            Message::Score { points } => Self::describe_scores("The scores are:", points),
            Message::Total { points } => {
                Self::describe_scores("The total scores are:", points)
            }
        }
    }

    fn describe_scores(header: &str, points: &BTreeMap<Seat, u32>) -> String {
        let mut result: String = header.to_string();
        for (seat, score) in points {
            result.push_str(&format!("\n{seat} | {score}"));
        }
        result
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::IAm { seat } => write!(f, "IAM{seat}")?,
            Message::Busy { seats } => {
                write!(f, "BUSY")?;
                for seat in seats {
                    write!(f, "{seat}")?;
                }
            }
            Message::Deal {
                deal_type,
                first_seat,
                cards,
            } => {
                write!(f, "DEAL{deal_type}{first_seat}")?;
                for card in cards {
                    write!(f, "{card}")?;
                }
            }
            Message::Trick { number, cards } => {
                write!(f, "TRICK{number}")?;
                for card in cards {
                    write!(f, "{card}")?;
                }
            }
            Message::Wrong { number } => write!(f, "WRONG{number}")?,
            Message::Taken {
                number,
                cards,
                taker,
            } => {
                write!(f, "TAKEN{number}")?;
                for card in cards {
                    write!(f, "{card}")?;
                }
                write!(f, "{taker}")?;
            }
            Message::Score { points } => {
                write!(f, "SCORE")?;
                for (seat, score) in points {
                    write!(f, "{seat}{score}")?;
                }
            }
            Message::Total { points } => {
                write!(f, "TOTAL")?;
                for (seat, score) in points {
                    write!(f, "{seat}{score}")?;
                }
            }
        }
        write!(f, "\r\n")
    }
}
