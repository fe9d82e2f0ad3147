use std::{cmp::Ordering, fmt, str::FromStr};

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn from_char(value: char) -> Option<Rank> {
        match value {
            '2' => Some(Rank::Two),
            '3' => Some(Rank::Three),
            '4' => Some(Rank::Four),
            '5' => Some(Rank::Five),
            '6' => Some(Rank::Six),
            '7' => Some(Rank::Seven),
            '8' => Some(Rank::Eight),
            '9' => Some(Rank::Nine),
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            'A' => Some(Rank::Ace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn letter(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    fn from_char(value: char) -> Option<Suit> {
        match value {
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }
}

/// One playing card. Ordered by (rank, suit) so that hands sort by strength
/// within a suit run; only the rank order matters to the game itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rank, self.suit).cmp(&(other.rank, other.suit))
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.code(), self.suit.letter())
    }
}

impl FromStr for Card {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut rest: &str = s;
        let card: Card = take_card(&mut rest)
            .ok_or_else(|| Error::Protocol(format!("invalid card {s:?}")))?;
        if !rest.is_empty() {
            return Err(Error::Protocol(format!("invalid card {s:?}")));
        }
        Ok(card)
    }
}

/// Consumes one card token from the front of `input`, advancing it.
/// `"10"` is the only two-character rank; everything else is one character.
pub fn take_card(input: &mut &str) -> Option<Card> {
    let rest: &str = *input;
    let (rank, after_rank) = if let Some(after) = rest.strip_prefix("10") {
        (Rank::Ten, after)
    } else {
        let first: char = rest.chars().next()?;
        (Rank::from_char(first)?, &rest[first.len_utf8()..])
    };
    let suit_char: char = after_rank.chars().next()?;
    let suit: Suit = Suit::from_char(suit_char)?;
    *input = &after_rank[suit_char.len_utf8()..];
    Some(Card::new(rank, suit))
}

/// Parses a run of concatenated card tokens, e.g. `"2C10DAH"`. The whole
/// input must be consumed; anything left over fails the parse.
pub fn parse_card_run(input: &str) -> Option<Vec<Card>> {
    let mut rest: &str = input;
    let mut cards: Vec<Card> = Vec::new();
    while !rest.is_empty() {
        cards.push(take_card(&mut rest)?);
    }
    Some(cards)
}

/// The 52-card deck in (suit, rank) order.
pub fn full_deck() -> Vec<Card> {
    let mut deck: Vec<Card> = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_parses_every_card() {
        for card in full_deck() {
            assert_eq!(card.to_string().parse::<Card>().unwrap(), card);
        }
    }

    #[test]
    fn rejects_malformed_cards() {
        for bad in ["", "1C", "10", "2X", "102C", "2C3D", "C2"] {
            assert!(bad.parse::<Card>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn parses_concatenated_runs() {
        let cards: Vec<Card> = parse_card_run("2C10DAH").unwrap();
        assert_eq!(
            cards,
            vec![
                Card::new(Rank::Two, Suit::Clubs),
                Card::new(Rank::Ten, Suit::Diamonds),
                Card::new(Rank::Ace, Suit::Hearts),
            ]
        );
        assert!(parse_card_run("2C1").is_none());
        assert_eq!(parse_card_run("").unwrap(), vec![]);
    }

    #[test]
    fn rank_order_is_two_up_to_ace() {
        assert!(Rank::Two < Rank::Ten);
        assert!(Rank::Ten < Rank::Jack);
        assert!(Rank::King < Rank::Ace);
        assert!(
            Card::new(Rank::Queen, Suit::Spades) < Card::new(Rank::King, Suit::Clubs),
            "rank dominates suit in the total order"
        );
    }
}
