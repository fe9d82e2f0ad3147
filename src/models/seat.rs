use std::fmt;

use crate::errors::Error;

/// Table position. The declaration order is the clockwise play order and the
/// order seats are listed in rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Seat {
    N,
    E,
    S,
    W,
}

impl Seat {
    pub const ALL: [Seat; 4] = [Seat::N, Seat::E, Seat::S, Seat::W];

    /// The seat playing after this one.
    pub fn next(self) -> Seat {
        match self {
            Seat::N => Seat::E,
            Seat::E => Seat::S,
            Seat::S => Seat::W,
            Seat::W => Seat::N,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Seat::N => 'N',
            Seat::E => 'E',
            Seat::S => 'S',
            Seat::W => 'W',
        }
    }
}

impl TryFrom<char> for Seat {
    type Error = Error;

    fn try_from(value: char) -> Result<Self, Error> {
        match value {
            'N' => Ok(Seat::N),
            'E' => Ok(Seat::E),
            'S' => Ok(Seat::S),
            'W' => Ok(Seat::W),
            other => Err(Error::Protocol(format!("invalid seat letter {other:?}"))),
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_cycle_clockwise() {
        assert_eq!(Seat::N.next(), Seat::E);
        assert_eq!(Seat::E.next(), Seat::S);
        assert_eq!(Seat::S.next(), Seat::W);
        assert_eq!(Seat::W.next(), Seat::N);
    }

    #[test]
    fn seat_letters_round_trip() {
        for seat in Seat::ALL {
            assert_eq!(Seat::try_from(seat.letter()).unwrap(), seat);
        }
        assert!(Seat::try_from('X').is_err());
    }
}
