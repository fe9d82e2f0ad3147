use std::collections::VecDeque;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;

use crate::{
    config::ClientConfig,
    network::{connect, Conn},
    prelude::*,
    protocol::parse,
};

/// Where the client is in the deal cycle. Mirrors the server's request
/// flow: a DEAL opens a deal, TRICK requests alternate with answers until
/// the SCORE/TOTAL pair (accepted in either order) closes it.
enum ClientState {
    AwaitingDeal,
    AwaitingTrick,
    /// A TRICK request is on the table and the answer has not been sent yet.
    ChoosingCard { request: Vec<Card> },
    /// The answer went out; the server owes a TAKEN or a WRONG.
    AwaitingVerdict { request: Vec<Card> },
    AwaitingScore,
    AwaitingTotal,
}

struct Client {
    seat: Seat,
    automatic: bool,
    conn: Conn,
    stats: PlayerStats,
    /// Cards the user has typed with `!<card>`, played in order.
    queued_cards: VecDeque<Card>,
    state: ClientState,
}

/// Runs the client to completion and resolves to its exit code: 0 when the
/// server ends the game between deals, 1 on BUSY or a mid-deal disconnect.
pub async fn run(config: ClientConfig) -> Result<i32> {
    info!("taking seat {} at {}:{}", config.seat, config.host, config.port);
    let stream: TcpStream = connect(&config.host, config.port, config.family).await?;
    let mut conn: Conn = Conn::new(stream)?;
    conn.enqueue(&Message::IAm { seat: config.seat });

    let mut client: Client = Client {
        seat: config.seat,
        automatic: config.automatic,
        conn,
        stats: PlayerStats::new(),
        queued_cards: VecDeque::new(),
        state: ClientState::AwaitingDeal,
    };
    let mut stdin: Lines<BufReader<Stdin>> = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open: bool = !config.automatic;

    loop {
        tokio::select! {
            _ = client.conn.readiness() => {}
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => client.handle_command(line.trim()),
                    _ => stdin_open = false,
                }
            }
        }
        client.conn.pump();
        while let Some(frame) = client.conn.take_frame() {
            if let Some(code) = client.handle_frame(&frame) {
                return Ok(code);
            }
        }
        if client.conn.is_broken() {
            return Ok(client.exit_code_on_disconnect());
        }
        client.submit_card_if_due();
    }
}

impl Client {
    /// One user line from standard input: `cards`, `tricks`, or `!<card>`.
    fn handle_command(&mut self, line: &str) {
        if line == "cards" {
            self.to_user(format!("Cards in your hand: {}.", self.stats.hand_to_string()));
        } else if line == "tricks" {
            self.to_user("Tricks taken in the last deal:".to_string());
            for trick in &self.stats.tricks_taken {
                let cards: String = trick.iter().map(Card::to_string).join(", ");
                self.to_user(cards);
            }
            self.to_user("--- End of list ---".to_string());
        } else if let Some(card) = line.strip_prefix('!').and_then(|s| s.parse::<Card>().ok()) {
            self.queued_cards.push_back(card);
        } else {
            self.to_user(format!("Unexpected command: {line} (skipped)."));
        }
    }

    /// Feeds one server frame through the state machine. Returns an exit
    /// code when the session is over (only BUSY ends it from here).
    fn handle_frame(&mut self, frame: &str) -> Option<i32> {
        let Some(message) = parse(frame) else {
            warn!("skipped unexpected message from the server: {:?}", frame.trim_end());
            return None;
        };
        match &self.state {
            ClientState::AwaitingDeal => match message {
                Message::Deal {
                    deal_type,
                    ref cards,
                    ..
                } => {
                    self.to_user(message.describe());
                    self.stats.start_deal(cards, deal_type);
                    self.state = ClientState::AwaitingTrick;
                }
                Message::Busy { .. } => {
                    self.to_user(message.describe());
                    return Some(1);
                }
                other => self.skip(&other),
            },
            ClientState::AwaitingTrick => match message {
                // Catch-up TAKEN frames arrive here when rejoining mid-deal.
                Message::Taken { .. } => self.apply_taken(&message),
                Message::Trick { ref cards, .. } => {
                    self.show_trick_request(&message);
                    let request: Vec<Card> = cards.clone();
                    self.state = ClientState::ChoosingCard { request };
                }
                Message::Score { .. } => {
                    self.to_user(message.describe());
                    self.state = ClientState::AwaitingTotal;
                }
                Message::Total { .. } => {
                    self.to_user(message.describe());
                    self.state = ClientState::AwaitingScore;
                }
                other => self.skip(&other),
            },
            ClientState::ChoosingCard { .. } => match message {
                // The server re-sends the request when we are slow; remind
                // the user and keep waiting for the decision.
                Message::Trick { .. } => self.show_trick_request(&message),
                other => self.skip(&other),
            },
            ClientState::AwaitingVerdict { request } => {
                let request: Vec<Card> = request.clone();
                match message {
                    Message::Taken { .. } => {
                        self.apply_taken(&message);
                        self.state = ClientState::AwaitingTrick;
                    }
                    Message::Wrong { .. } => {
                        self.to_user(message.describe());
                        self.state = ClientState::ChoosingCard { request };
                    }
                    other => self.skip(&other),
                }
            }
            ClientState::AwaitingScore => match message {
                Message::Score { .. } => {
                    self.to_user(message.describe());
                    self.state = ClientState::AwaitingDeal;
                }
                other => self.skip(&other),
            },
            ClientState::AwaitingTotal => match message {
                Message::Total { .. } => {
                    self.to_user(message.describe());
                    self.state = ClientState::AwaitingDeal;
                }
                other => self.skip(&other),
            },
        }
        None
    }

    fn show_trick_request(&self, request: &Message) {
        self.to_user(request.describe());
        self.to_user(format!("Available: {}", self.stats.hand_to_string()));
    }

    fn apply_taken(&mut self, taken: &Message) {
        self.to_user(taken.describe());
        let Message::Taken { cards, taker, .. } = taken else {
            return;
        };
        if *taker == self.seat {
            // The client only tracks which tricks it took, never points.
            self.stats.take_trick(cards.clone(), 0);
        }
        for card in cards {
            self.stats.remove_card(*card);
        }
    }

    /// Answers an open TRICK request once a decision exists: immediately in
    /// automatic mode, after a `!<card>` line otherwise.
    fn submit_card_if_due(&mut self) {
        let ClientState::ChoosingCard { request } = &self.state else {
            return;
        };
        let chosen: Option<Card> = if self.automatic {
            self.choose_automatically(request)
        } else {
            self.queued_cards.pop_front()
        };
        let Some(card) = chosen else {
            return;
        };
        let answer: Message = Message::Trick {
            number: self.stats.current_trick_number(),
            cards: vec![card],
        };
        self.conn.enqueue(&answer);
        let request: Vec<Card> = request.clone();
        self.state = ClientState::AwaitingVerdict { request };
    }

    /// Lowest card following the leading suit, else the lowest card held.
    fn choose_automatically(&self, request: &[Card]) -> Option<Card> {
        if let Some(lead) = request.first() {
            if let Some(card) = self
                .stats
                .hand
                .iter()
                .find(|card: &&Card| card.suit == lead.suit)
            {
                return Some(*card);
            }
        }
        self.stats.hand.first().copied()
    }

    fn exit_code_on_disconnect(&self) -> i32 {
        if matches!(self.state, ClientState::AwaitingDeal) {
            self.to_user("Game over. Server disconnected.".to_string());
            0
        } else {
            warn!("server disconnected unexpectedly");
            1
        }
    }

    fn skip(&self, message: &Message) {
        warn!("skipped unexpected message from the server: {:?}", message.to_string().trim_end());
    }

    fn to_user(&self, text: String) {
        if !self.automatic {
            println!("{text}");
        }
    }
}
