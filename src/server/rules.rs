use crate::models::{Card, DealType, PlayerStats, Rank, Seat, Suit, TRICKS_PER_DEAL};

/// Why a proposed card may not be played right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayViolation {
    /// The player does not hold the card.
    NotHeld,
    /// The player holds a card of the leading suit and must follow it.
    MustFollowSuit,
}

/// Checks a proposed play against the hand and the cards already on the
/// table. There is no obligation to beat the winning card, only to follow
/// the leading suit while able.
pub fn play_violation(
    stats: &PlayerStats,
    table: &[Card],
    card: Card,
) -> Option<PlayViolation> {
    if !stats.has_card(card) {
        return Some(PlayViolation::NotHeld);
    }
    if let Some(lead) = table.first() {
        if card.suit != lead.suit && stats.has_suit(lead.suit) {
            return Some(PlayViolation::MustFollowSuit);
        }
    }
    None
}

/// The seat taking a completed trick: highest rank in the leading suit,
/// no trump. `leader` is the seat that played `table[0]`.
pub fn trick_winner(leader: Seat, table: &[Card]) -> Seat {
    let lead_suit: Suit = table[0].suit;
    let mut winner: Seat = leader;
    let mut winning: Card = table[0];
    let mut seat: Seat = leader;
    for &card in table {
        if card.suit == lead_suit && winning.rank < card.rank {
            winning = card;
            winner = seat;
        }
        seat = seat.next();
    }
    winner
}

/// Penalty points the trick winner collects, by deal type. The bonus for
/// taking trick 7 or the last trick is per trick, not per card; Robber
/// stacks all six rules, that bonus included.
pub fn trick_points(table: &[Card], deal_type: DealType, trick_number: u8) -> u32 {
    let hearts: u32 = count(table, |card| card.suit == Suit::Hearts);
    let queens: u32 = count(table, |card| card.rank == Rank::Queen);
    let gentlemen: u32 = count(table, |card| {
        card.rank == Rank::King || card.rank == Rank::Jack
    });
    let king_of_hearts: u32 = count(table, |card| {
        card.rank == Rank::King && card.suit == Suit::Hearts
    });
    let seventh_or_last: u32 = if trick_number == 7 || trick_number == TRICKS_PER_DEAL {
        1
    } else {
        0
    };
    match deal_type {
        DealType::NoTricks => 1,
        DealType::NoHearts => hearts,
        DealType::NoQueens => 5 * queens,
        DealType::NoKingsJacks => 2 * gentlemen,
        DealType::NoKingOfHearts => 18 * king_of_hearts,
        DealType::NoSeventhAndLastTrick => 10 * seventh_or_last,
        DealType::Robber => {
            1 + hearts + 5 * queens + 2 * gentlemen + 18 * king_of_hearts + 10 * seventh_or_last
        }
    }
}

fn count(table: &[Card], predicate: impl Fn(&Card) -> bool) -> u32 {
    table.iter().filter(|card| predicate(card)).count() as u32
}
