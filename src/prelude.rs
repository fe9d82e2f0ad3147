pub use itertools::Itertools;
pub use std::collections::{BTreeMap, BTreeSet};

pub use crate::{
    errors::Error,
    models::{Card, DealConfig, DealType, PlayerStats, Rank, Seat, Suit},
    protocol::Message,
    Result,
};
