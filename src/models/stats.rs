use std::collections::BTreeSet;

use itertools::Itertools;

use crate::models::{Card, DealType, Suit, CARDS_PER_HAND};

/// Per-seat bookkeeping for the current deal. Shared by the server (which
/// scores) and the client (which tracks its own hand and tricks; its point
/// fields simply stay at zero).
#[derive(Debug, Clone)]
pub struct PlayerStats {
    pub deal_points: u32,
    pub total_points: u32,
    pub hand: BTreeSet<Card>,
    pub tricks_taken: Vec<Vec<Card>>,
    pub deal_type: DealType,
}

impl PlayerStats {
    pub fn new() -> Self {
        PlayerStats {
            deal_points: 0,
            total_points: 0,
            hand: BTreeSet::new(),
            tricks_taken: Vec::new(),
            deal_type: DealType::Robber,
        }
    }

    /// Wholesale hand replacement at the start of a deal. Deal points reset;
    /// totals carry across deals.
    pub fn start_deal(&mut self, hand: &[Card], deal_type: DealType) {
        self.deal_type = deal_type;
        self.hand = hand.iter().copied().collect();
        self.tricks_taken.clear();
        self.deal_points = 0;
    }

    pub fn has_card(&self, card: Card) -> bool {
        self.hand.contains(&card)
    }

    pub fn has_suit(&self, suit: Suit) -> bool {
        self.hand.iter().any(|card: &Card| card.suit == suit)
    }

    pub fn remove_card(&mut self, card: Card) {
        self.hand.remove(&card);
    }

    pub fn take_trick(&mut self, cards: Vec<Card>, points: u32) {
        self.tricks_taken.push(cards);
        self.deal_points += points;
        self.total_points += points;
    }

    /// 1-based number of the trick in play, deduced from the hand size.
    /// The client uses this when answering a TRICK request.
    pub fn current_trick_number(&self) -> u8 {
        (CARDS_PER_HAND - self.hand.len() + 1) as u8
    }

    pub fn hand_to_string(&self) -> String {
        self.hand.iter().map(Card::to_string).join(", ")
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        PlayerStats::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_card_run, Rank};

    fn stats_with(cards: &str) -> PlayerStats {
        let mut stats: PlayerStats = PlayerStats::new();
        let hand: Vec<Card> = parse_card_run(cards).unwrap();
        stats.start_deal(&hand, DealType::NoHearts);
        stats
    }

    #[test]
    fn trick_number_follows_hand_size() {
        let mut stats: PlayerStats = stats_with("2C3C4C5C6C7C8C9C10CJCQCKCAC");
        assert_eq!(stats.current_trick_number(), 1);
        stats.remove_card(Card::new(Rank::Two, Suit::Clubs));
        assert_eq!(stats.current_trick_number(), 2);
    }

    #[test]
    fn points_accumulate_across_deals() {
        let mut stats: PlayerStats = stats_with("2C3C4C5C6C7C8C9C10CJCQCKCAC");
        stats.take_trick(vec![], 5);
        assert_eq!((stats.deal_points, stats.total_points), (5, 5));
        let hand: Vec<Card> = parse_card_run("2D3D4D5D6D7D8D9D10DJDQDKDAD").unwrap();
        stats.start_deal(&hand, DealType::NoTricks);
        assert_eq!((stats.deal_points, stats.total_points), (0, 5));
        stats.take_trick(vec![], 1);
        assert_eq!((stats.deal_points, stats.total_points), (1, 6));
    }

    #[test]
    fn suit_lookup_matches_hand() {
        let stats: PlayerStats = stats_with("2C3C4C5C6C7C8C9C10CJCQCKC2H");
        assert!(stats.has_suit(Suit::Hearts));
        assert!(!stats.has_suit(Suit::Spades));
    }
}
