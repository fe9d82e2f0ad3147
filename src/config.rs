use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{
    errors::Error,
    models::{full_deck, parse_card_run, Card, DealConfig, DealType, Seat},
    Result,
};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port; `None` lets the OS choose one.
    pub port: Option<u16>,
    pub deals: Vec<DealConfig>,
    /// Deadline for a candidate's IAM and for a player's TRICK answer.
    pub timeout: Duration,
}

impl ServerConfig {
    /// `-p <port>` (optional), `-f <dealsfile>` (required),
    /// `-t <timeout_seconds>` (default 5).
    pub fn from_args(args: &[String]) -> Result<Self> {
        let program: &str = args.first().map(String::as_str).unwrap_or("kierki-server");
        let usage = || Error::usage(program);
        let mut port: Option<u16> = None;
        let mut deals: Option<Vec<DealConfig>> = None;
        let mut timeout_seconds: u64 = DEFAULT_TIMEOUT_SECONDS;

        let mut i: usize = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-p" => {
                    i += 1;
                    port = Some(args.get(i).and_then(|s| s.parse().ok()).ok_or_else(usage)?);
                }
                "-f" => {
                    i += 1;
                    let path: &String = args.get(i).ok_or_else(usage)?;
                    deals = Some(load_deals(Path::new(path))?);
                }
                "-t" => {
                    i += 1;
                    timeout_seconds = args
                        .get(i)
                        .and_then(|s| s.parse().ok())
                        .filter(|&t: &u64| t > 0)
                        .ok_or_else(usage)?;
                }
                _ => return Err(usage()),
            }
            i += 1;
        }

        Ok(ServerConfig {
            port,
            deals: deals.ok_or_else(usage)?,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub family: Option<AddressFamily>,
    pub seat: Seat,
    /// `-a`: play automatically instead of forwarding the user's decisions.
    pub automatic: bool,
}

impl ClientConfig {
    /// `-h <host> -p <port> -N|-E|-S|-W` (all required), `-4|-6`, `-a`.
    /// Repeated or conflicting flags follow the last occurrence.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let program: &str = args.first().map(String::as_str).unwrap_or("kierki-client");
        let usage = || Error::client_usage(program);
        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut family: Option<AddressFamily> = None;
        let mut seat: Option<Seat> = None;
        let mut automatic: bool = false;

        let mut i: usize = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" => {
                    i += 1;
                    host = Some(args.get(i).ok_or_else(usage)?.clone());
                }
                "-p" => {
                    i += 1;
                    port = Some(args.get(i).and_then(|s| s.parse().ok()).ok_or_else(usage)?);
                }
                "-4" => family = Some(AddressFamily::V4),
                "-6" => family = Some(AddressFamily::V6),
                "-N" => seat = Some(Seat::N),
                "-E" => seat = Some(Seat::E),
                "-S" => seat = Some(Seat::S),
                "-W" => seat = Some(Seat::W),
                "-a" => automatic = true,
                _ => return Err(usage()),
            }
            i += 1;
        }

        Ok(ClientConfig {
            host: host.ok_or_else(usage)?,
            port: port.ok_or_else(usage)?,
            family,
            seat: seat.ok_or_else(usage)?,
            automatic,
        })
    }
}

/// Reads a deals file: a sequence of 5-line records. The first line of a
/// record is the deal-type digit followed by the leading seat; the next four
/// are the 13-card hands for N, E, S and W, concatenated without separators.
/// The four hands of a record must partition the 52-card deck.
pub fn load_deals(path: &Path) -> Result<Vec<DealConfig>> {
    let text: String = fs::read_to_string(path)
        .map_err(|err| Error::DealFile(format!("cannot read {}: {err}", path.display())))?;
    parse_deals(&text)
}

pub fn parse_deals(text: &str) -> Result<Vec<DealConfig>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut deals: Vec<DealConfig> = Vec::new();
    let mut i: usize = 0;
    while i < lines.len() {
        deals.push(parse_deal_record(&lines[i..], i + 1)?);
        i += 5;
    }
    if deals.is_empty() {
        return Err(Error::DealFile("no deals configured".to_string()));
    }
    Ok(deals)
}

fn parse_deal_record(lines: &[&str], line_number: usize) -> Result<DealConfig> {
    if lines.len() < 5 {
        return Err(Error::deal_file(line_number, "truncated record"));
    }
    let header: Vec<char> = lines[0].chars().collect();
    let &[type_char, seat_char] = header.as_slice() else {
        return Err(Error::deal_file(line_number, "malformed header line"));
    };
    let deal_type: DealType = type_char
        .to_digit(10)
        .and_then(|d| DealType::from_code(d as u8))
        .ok_or_else(|| Error::deal_file(line_number, format!("invalid deal type {type_char:?}")))?;
    let first_seat: Seat = Seat::try_from(seat_char)
        .map_err(|_| Error::deal_file(line_number, format!("invalid seat {seat_char:?}")))?;

    let mut hands: [Vec<Card>; 4] = Default::default();
    for (offset, hand) in hands.iter_mut().enumerate() {
        let seat: Seat = Seat::ALL[offset];
        *hand = parse_card_run(lines[1 + offset]).ok_or_else(|| {
            Error::deal_file(line_number, format!("unparseable hand for seat {seat}"))
        })?;
    }

    let dealt: BTreeSet<Card> = hands.iter().flatten().copied().collect();
    let deck: BTreeSet<Card> = full_deck().into_iter().collect();
    if dealt != deck {
        return Err(Error::deal_file(
            line_number,
            "hands do not partition the 52-card deck",
        ));
    }

    DealConfig::new(deal_type, first_seat, hands)
        .map_err(|err| Error::deal_file(line_number, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DEAL: &str = "\
1N
2C3C4C5C6C7C8C9C10CJCQCKCAC
2D3D4D5D6D7D8D9D10DJDQDKDAD
2H3H4H5H6H7H8H9H10HJHQHKHAH
2S3S4S5S6S7S8S9S10SJSQSKSAS
";

    #[test]
    fn parses_a_single_deal() {
        let deals: Vec<DealConfig> = parse_deals(ONE_DEAL).unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].deal_type, DealType::NoTricks);
        assert_eq!(deals[0].first_seat, Seat::N);
        assert_eq!(deals[0].hand(Seat::S).len(), 13);
        assert_eq!(deals[0].hand(Seat::W)[12].to_string(), "AS");
    }

    #[test]
    fn parses_consecutive_records() {
        let two: String = format!("{ONE_DEAL}{}", ONE_DEAL.replace("1N", "7W"));
        let deals: Vec<DealConfig> = parse_deals(&two).unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[1].deal_type, DealType::Robber);
        assert_eq!(deals[1].first_seat, Seat::W);
    }

    #[test]
    fn rejects_bad_records() {
        let truncated: &str = "1N\n2C3C4C\n";
        assert!(parse_deals(truncated).is_err());
        assert!(parse_deals("").is_err());

        let bad_type: String = ONE_DEAL.replace("1N", "8N");
        assert!(parse_deals(&bad_type).is_err());

        // Duplicate card across hands: clubs hand repeated for diamonds.
        let duplicated: String =
            ONE_DEAL.replace("2D3D4D5D6D7D8D9D10DJDQDKDAD", "2C3C4C5C6C7C8C9C10CJCQCKCAC");
        assert!(parse_deals(&duplicated).is_err());

        let short_hand: String =
            ONE_DEAL.replace("2H3H4H5H6H7H8H9H10HJHQHKHAH", "2H3H4H5H6H7H8H9H10HJHQH");
        assert!(parse_deals(&short_hand).is_err());
    }

    #[test]
    fn server_args_parse_and_validate() {
        let dir: std::path::PathBuf = std::env::temp_dir();
        let path: std::path::PathBuf = dir.join(format!("kierki-deals-{}", std::process::id()));
        fs::write(&path, ONE_DEAL).unwrap();

        let args: Vec<String> = ["kierki-server", "-p", "4242", "-f"]
            .iter()
            .map(ToString::to_string)
            .chain([path.display().to_string(), "-t".into(), "2".into()])
            .collect();
        let config: ServerConfig = ServerConfig::from_args(&args).unwrap();
        assert_eq!(config.port, Some(4242));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.deals.len(), 1);

        let missing_file: Vec<String> = ["kierki-server", "-p", "4242"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(ServerConfig::from_args(&missing_file).is_err());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn client_args_last_flag_wins() {
        let args: Vec<String> = ["kierki-client", "-h", "::1", "-p", "1234", "-N", "-E", "-4", "-6"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let config: ClientConfig = ClientConfig::from_args(&args).unwrap();
        assert_eq!(config.seat, Seat::E);
        assert_eq!(config.family, Some(AddressFamily::V6));
        assert!(!config.automatic);

        let missing_seat: Vec<String> = ["kierki-client", "-h", "::1", "-p", "1234"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(ClientConfig::from_args(&missing_seat).is_err());
    }
}
