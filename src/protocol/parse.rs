use std::collections::{BTreeMap, BTreeSet};

use crate::models::{parse_card_run, Card, DealType, Seat, FIRST_TRICK, TRICKS_PER_DEAL};
use crate::protocol::Message;

/// Parses one CRLF-terminated frame. Returns `None` for anything that is not
/// a well-formed message — including duplicated cards in DEAL, duplicated
/// seats in BUSY and trick numbers outside 1..=13. Never panics: a peer can
/// send arbitrary bytes and the worst it earns is a `None`.
pub fn parse(frame: &str) -> Option<Message> {
    let body: &str = frame.strip_suffix("\r\n")?;
    if let Some(rest) = body.strip_prefix("IAM") {
        parse_iam(rest)
    } else if let Some(rest) = body.strip_prefix("BUSY") {
        parse_busy(rest)
    } else if let Some(rest) = body.strip_prefix("DEAL") {
        parse_deal(rest)
    } else if let Some(rest) = body.strip_prefix("TRICK") {
        parse_trick(rest)
    } else if let Some(rest) = body.strip_prefix("WRONG") {
        parse_wrong(rest)
    } else if let Some(rest) = body.strip_prefix("TAKEN") {
        parse_taken(rest)
    } else if let Some(rest) = body.strip_prefix("SCORE") {
        parse_scores(rest).map(|points| Message::Score { points })
    } else if let Some(rest) = body.strip_prefix("TOTAL") {
        parse_scores(rest).map(|points| Message::Total { points })
    } else {
        None
    }
}

fn single_seat(s: &str) -> Option<Seat> {
    let mut chars = s.chars();
    let seat: Seat = Seat::try_from(chars.next()?).ok()?;
    chars.next().is_none().then_some(seat)
}

fn parse_iam(rest: &str) -> Option<Message> {
    single_seat(rest).map(|seat| Message::IAm { seat })
}

fn parse_busy(rest: &str) -> Option<Message> {
    if rest.is_empty() {
        return None;
    }
    let seats: Vec<Seat> = rest
        .chars()
        .map(|c: char| Seat::try_from(c).ok())
        .collect::<Option<Vec<Seat>>>()?;
    let distinct: BTreeSet<Seat> = seats.iter().copied().collect();
    if distinct.len() != seats.len() {
        return None;
    }
    Some(Message::Busy { seats })
}

fn parse_deal(rest: &str) -> Option<Message> {
    let mut chars = rest.chars();
    let deal_type: DealType = DealType::from_code(chars.next()?.to_digit(10)? as u8)?;
    let first_seat: Seat = Seat::try_from(chars.next()?).ok()?;
    let cards: Vec<Card> = parse_card_run(chars.as_str())?;
    if cards.len() != 13 {
        return None;
    }
    let distinct: BTreeSet<Card> = cards.iter().copied().collect();
    if distinct.len() != cards.len() {
        return None;
    }
    Some(Message::Deal {
        deal_type,
        first_seat,
        cards,
    })
}

/// Splits a leading trick number off `rest`, preferring the one-digit
/// reading. `"TRICK110C"` is trick 1 followed by the ten of clubs, not
/// trick 11; the two-digit reading is only taken when the remainder fails
/// to parse under the one-digit one.
fn with_trick_number<T>(rest: &str, try_rest: impl Fn(u8, &str) -> Option<T>) -> Option<T> {
    let mut chars = rest.chars();
    let first: u8 = chars.next()?.to_digit(10)? as u8;
    if first == 0 {
        return None;
    }
    if let Some(parsed) = try_rest(first, chars.as_str()) {
        return Some(parsed);
    }
    if first == 1 {
        if let Some(second) = chars.clone().next().and_then(|c: char| c.to_digit(10)) {
            let number: u8 = (10 + second) as u8;
            if number <= TRICKS_PER_DEAL {
                chars.next();
                return try_rest(number, chars.as_str());
            }
        }
    }
    None
}

fn parse_trick(rest: &str) -> Option<Message> {
    with_trick_number(rest, |number, tail| {
        let cards: Vec<Card> = parse_card_run(tail)?;
        (cards.len() <= 3).then_some(Message::Trick { number, cards })
    })
}

fn parse_wrong(rest: &str) -> Option<Message> {
    let number: u8 = rest.parse().ok()?;
    if !(FIRST_TRICK..=TRICKS_PER_DEAL).contains(&number) || rest != number.to_string() {
        return None;
    }
    Some(Message::Wrong { number })
}

fn parse_taken(rest: &str) -> Option<Message> {
    with_trick_number(rest, |number, tail| {
        let taker_at: usize = tail.len().checked_sub(1)?;
        if !tail.is_char_boundary(taker_at) {
            return None;
        }
        let taker: Seat = single_seat(&tail[taker_at..])?;
        let cards: Vec<Card> = parse_card_run(&tail[..taker_at])?;
        (cards.len() == 4).then_some(Message::Taken {
            number,
            cards,
            taker,
        })
    })
}

fn parse_scores(rest: &str) -> Option<BTreeMap<Seat, u32>> {
    let mut points: BTreeMap<Seat, u32> = BTreeMap::new();
    let mut rest: &str = rest;
    for _ in 0..4 {
        let mut chars = rest.chars();
        let seat: Seat = Seat::try_from(chars.next()?).ok()?;
        rest = chars.as_str();
        let digits: usize = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let score: u32 = rest[..digits].parse().ok()?;
        points.insert(seat, score);
        rest = &rest[digits..];
    }
    rest.is_empty().then_some(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{full_deck, Rank, Suit};

    fn card(s: &str) -> Card {
        s.parse().unwrap()
    }

    #[test]
    fn round_trips_every_message_kind() {
        let deck: Vec<Card> = full_deck();
        let messages: Vec<Message> = vec![
            Message::IAm { seat: Seat::W },
            Message::Busy {
                seats: vec![Seat::S, Seat::N],
            },
            Message::Deal {
                deal_type: DealType::NoQueens,
                first_seat: Seat::E,
                cards: deck[..13].to_vec(),
            },
            Message::Trick {
                number: 1,
                cards: vec![],
            },
            Message::Trick {
                number: 13,
                cards: vec![card("10C"), card("2D"), card("AH")],
            },
            Message::Wrong { number: 7 },
            Message::Taken {
                number: 10,
                cards: vec![card("2C"), card("3C"), card("AC"), card("5C")],
                taker: Seat::S,
            },
            Message::Score {
                points: Seat::ALL.into_iter().zip([0, 18, 5, 100]).collect(),
            },
            Message::Total {
                points: Seat::ALL.into_iter().zip([7, 0, 0, 13]).collect(),
            },
        ];
        for message in messages {
            let frame: String = message.to_string();
            assert!(frame.ends_with("\r\n"));
            assert_eq!(parse(&frame), Some(message), "frame {frame:?}");
        }
    }

    #[test]
    fn prefers_one_digit_trick_numbers() {
        assert_eq!(
            parse("TRICK110C\r\n"),
            Some(Message::Trick {
                number: 1,
                cards: vec![card("10C")],
            })
        );
        assert_eq!(
            parse("TRICK133C\r\n"),
            Some(Message::Trick {
                number: 13,
                cards: vec![card("3C")],
            })
        );
        assert_eq!(
            parse("TRICK10\r\n"),
            Some(Message::Trick {
                number: 10,
                cards: vec![],
            })
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        let good_deal: String = format!(
            "DEAL1N{}\r\n",
            full_deck()[..13].iter().map(Card::to_string).collect::<String>()
        );
        assert!(parse(&good_deal).is_some());

        let twelve_cards: String = full_deck()[..12].iter().map(Card::to_string).collect();
        let mut frames: Vec<String> = [
            "IAMX\r\n",
            "IAMNE\r\n",
            "IAMN\n",
            "IAMN",
            "BUSY\r\n",
            "BUSYNN\r\n",
            "TRICK0\r\n",
            "TRICK14\r\n",
            "TRICK12C3C4C5C\r\n",
            "WRONG0\r\n",
            "WRONG14\r\n",
            "WRONG013\r\n",
            "TAKEN12C3C4CS\r\n",
            "TAKEN12C3C4C5C\r\n",
            "SCOREN1E2S3\r\n",
            "SCOREN1E2S3W\r\n",
            "SCOREN1E2S3W4X\r\n",
            "HELLO\r\n",
            "\r\n",
        ]
        .map(String::from)
        .to_vec();
        // Bad deal type, a 12-card hand, and a duplicated 13th card.
        frames.push(format!("DEAL8N{twelve_cards}2H\r\n"));
        frames.push(format!("DEAL1N{twelve_cards}\r\n"));
        frames.push(format!("DEAL1N{twelve_cards}2C\r\n"));
        for frame in &frames {
            assert_eq!(parse(frame), None, "accepted {frame:?}");
        }
    }

    #[test]
    fn taken_keeps_cards_in_played_order() {
        let Some(Message::Taken { number, cards, taker }) = parse("TAKEN2KH2C10DQSN\r\n")
        else {
            panic!("frame did not parse as TAKEN");
        };
        assert_eq!(number, 2);
        assert_eq!(taker, Seat::N);
        assert_eq!(
            cards,
            vec![card("KH"), card("2C"), card("10D"), card("QS")]
        );
        assert_eq!(cards[0], Card::new(Rank::King, Suit::Hearts));
    }
}
