//! Kierki (Polish Hearts) over TCP.
//!
//! The server seats four players at N/E/S/W, deals hands from a deals file
//! and referees 13-trick deals over a CRLF-framed ASCII protocol. The whole
//! engine is one cooperative event loop: every socket is pumped with
//! non-blocking reads and writes, and the only place the server waits is the
//! poll supervisor, which also re-admits players who dropped mid-deal.

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod network;
pub mod prelude;
pub mod protocol;
pub mod server;

pub type Result<T, E = errors::Error> = std::result::Result<T, E>;
