use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use futures::future::select_all;
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Instant};

use crate::{
    config::ServerConfig,
    models::{FIRST_TRICK, TRICKS_PER_DEAL},
    network::{listen, Conn},
    prelude::*,
    protocol::parse,
    server::{
        candidate::{Candidate, CandidateState},
        rules,
    },
};

/// Size of the connection table, listener included. Anything beyond this is
/// closed at accept time.
const MAX_CONNECTIONS: usize = 32;

/// One seat's persistent identity. The seat and its stats survive
/// disconnections; only `conn` cycles as the peer drops and rejoins.
struct Player {
    seat: Seat,
    conn: Option<Conn>,
    /// When the outstanding TRICK request was (re)sent to this player.
    trick_request_at: Option<Instant>,
    stats: PlayerStats,
}

impl Player {
    fn new(seat: Seat) -> Self {
        Player {
            seat,
            conn: None,
            trick_request_at: None,
            stats: PlayerStats::new(),
        }
    }
}

/// A completed trick, kept for replaying to players who reconnect mid-deal.
struct TrickRecord {
    number: u8,
    cards: Vec<Card>,
    taker: Seat,
}

impl TrickRecord {
    fn to_message(&self) -> Message {
        Message::Taken {
            number: self.number,
            cards: self.cards.clone(),
            taker: self.taker,
        }
    }
}

/// The trick cycle, encoded explicitly so every transition is a plain enum
/// step. `should_poll` says whether the supervisor runs before the next
/// step; logically contiguous steps (StartTrick into SendTrick, a timeout
/// retransmission) skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    StartTrick(u8),
    SendTrick,
    AwaitPlay,
}

enum Flow {
    Continue,
    Finished,
}

pub struct Server {
    timeout: Duration,
    deals: Vec<DealConfig>,
    listener: TcpListener,
    accepting: bool,
    players: [Player; 4],
    candidates: Vec<Candidate>,
    /// Occupied seats in the order they were (re)claimed; the BUSY payload.
    seated_order: Vec<Seat>,
    /// Set once the first DEAL has been broadcast; from then on every newly
    /// seated connection is caught up with DEAL plus the taken history.
    game_started: bool,
    current_deal: usize,
    taken_history: Vec<TrickRecord>,
    table: Vec<Card>,
    trick_number: u8,
    trick_winner: Seat,
    current_seat: Seat,
    state: SessionState,
    should_poll: bool,
}

impl Server {
    /// Opens the listening socket. Everything else waits for [`Server::run`].
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let listener: TcpListener = listen(config.port)?;
        Ok(Server {
            timeout: config.timeout,
            deals: config.deals,
            listener,
            accepting: true,
            players: Seat::ALL.map(Player::new),
            candidates: Vec::new(),
            seated_order: Vec::new(),
            game_started: false,
            current_deal: 0,
            taken_history: Vec::new(),
            table: Vec::new(),
            trick_number: FIRST_TRICK,
            trick_winner: Seat::N,
            current_seat: Seat::N,
            state: SessionState::StartTrick(FIRST_TRICK),
            should_poll: true,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Plays the configured deals to completion. Returns `Ok(())` at the
    /// normal end of the game; no in-game error terminates the session.
    pub async fn run(mut self) -> Result<()> {
        self.load_deal(0);
        loop {
            if self.should_poll {
                self.safe_poll().await;
            }
            self.should_poll = true;
            match self.step() {
                Flow::Continue => {}
                Flow::Finished => break,
            }
            debug_assert!(self.cards_conserved(), "deck leaked during a step");
        }
        self.shutdown().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    fn set_state(&mut self, state: SessionState, should_poll: bool) {
        self.state = state;
        self.should_poll = should_poll;
    }

    fn step(&mut self) -> Flow {
        match self.state {
            SessionState::StartTrick(number) => {
                self.trick_number = number;
                self.table.clear();
                self.current_seat = self.leader_seat();
                self.set_state(SessionState::SendTrick, false);
                Flow::Continue
            }
            SessionState::SendTrick => {
                let request: Message = Message::Trick {
                    number: self.trick_number,
                    cards: self.table.clone(),
                };
                self.enqueue_to(self.current_seat, &request);
                self.players[self.current_seat as usize].trick_request_at = Some(Instant::now());
                self.set_state(SessionState::AwaitPlay, true);
                Flow::Continue
            }
            SessionState::AwaitPlay => self.await_play(),
        }
    }

    /// The seat leading the current trick: the deal's first seat for trick 1,
    /// the previous trick's taker afterwards.
    fn leader_seat(&self) -> Seat {
        if self.trick_number == FIRST_TRICK {
            self.deals[self.current_deal].first_seat
        } else {
            self.trick_winner
        }
    }

    fn await_play(&mut self) -> Flow {
        self.check_other_players();

        let has_answer: bool = self.players[self.current_seat as usize]
            .conn
            .as_ref()
            .is_some_and(Conn::has_frame);
        if has_answer {
            return self.handle_current_player();
        }

        let expired: bool = self.players[self.current_seat as usize]
            .trick_request_at
            .is_some_and(|at: Instant| at.elapsed() > self.timeout);
        if expired {
            warn!("player {} did not respond in time", self.current_seat);
            // Retransmit straight away; the next AwaitPlay polls again.
            self.set_state(SessionState::SendTrick, false);
        }
        Flow::Continue
    }

    /// A TRICK from a seat whose turn it is not earns a WRONG; anything else
    /// from such a seat costs it the connection. The supervisor reseats it
    /// before the state machine moves again.
    fn check_other_players(&mut self) {
        for seat in Seat::ALL {
            if seat == self.current_seat {
                continue;
            }
            let Some(frame) = self.players[seat as usize]
                .conn
                .as_mut()
                .and_then(Conn::take_frame)
            else {
                continue;
            };
            match parse(&frame) {
                Some(Message::Trick { .. }) => {
                    warn!("player {seat} sent TRICK out of turn");
                    let wrong: Message = Message::Wrong {
                        number: self.trick_number,
                    };
                    self.enqueue_to(seat, &wrong);
                }
                _ => {
                    warn!("player {seat}: unexpected message, closing connection");
                    self.unbind(seat);
                }
            }
        }
    }

    fn handle_current_player(&mut self) -> Flow {
        let seat: Seat = self.current_seat;
        let Some(frame) = self.players[seat as usize]
            .conn
            .as_mut()
            .and_then(Conn::take_frame)
        else {
            return Flow::Continue;
        };

        let Some(Message::Trick { number, cards }) = parse(&frame) else {
            warn!("player {seat}: unexpected message, closing connection");
            self.unbind(seat);
            return Flow::Continue;
        };

        if number != self.trick_number {
            warn!("player {seat} answered trick {number}, expected {}", self.trick_number);
            return self.send_wrong();
        }
        if cards.len() != 1 {
            warn!("player {seat} sent {} cards, expected one", cards.len());
            return self.send_wrong();
        }
        let card: Card = cards[0];
        match rules::play_violation(&self.players[seat as usize].stats, &self.table, card) {
            Some(rules::PlayViolation::NotHeld) => {
                warn!("player {seat} played {card}, which it does not hold");
                self.send_wrong()
            }
            Some(rules::PlayViolation::MustFollowSuit) => {
                warn!("player {seat} played {card} while holding the leading suit");
                self.send_wrong()
            }
            None => self.apply_play(card),
        }
    }

    fn send_wrong(&mut self) -> Flow {
        let wrong: Message = Message::Wrong {
            number: self.trick_number,
        };
        self.enqueue_to(self.current_seat, &wrong);
        Flow::Continue
    }

    fn apply_play(&mut self, card: Card) -> Flow {
        self.table.push(card);
        self.players[self.current_seat as usize].stats.remove_card(card);

        if self.table.len() < 4 {
            self.current_seat = self.current_seat.next();
            self.set_state(SessionState::SendTrick, true);
            return Flow::Continue;
        }

        let taker: Seat = rules::trick_winner(self.leader_seat(), &self.table);
        let deal_type = self.deals[self.current_deal].deal_type;
        let points: u32 = rules::trick_points(&self.table, deal_type, self.trick_number);
        let cards: Vec<Card> = std::mem::take(&mut self.table);
        self.players[taker as usize]
            .stats
            .take_trick(cards.clone(), points);

        let record: TrickRecord = TrickRecord {
            number: self.trick_number,
            cards,
            taker,
        };
        self.broadcast(&record.to_message());
        self.taken_history.push(record);
        self.trick_winner = taker;
        info!("trick {} taken by {taker} for {points} points", self.trick_number);

        if self.trick_number < TRICKS_PER_DEAL {
            self.set_state(SessionState::StartTrick(self.trick_number + 1), true);
            return Flow::Continue;
        }
        self.finalize_deal()
    }

    fn finalize_deal(&mut self) -> Flow {
        let score: Message = Message::Score {
            points: self
                .players
                .iter()
                .map(|player: &Player| (player.seat, player.stats.deal_points))
                .collect(),
        };
        let total: Message = Message::Total {
            points: self
                .players
                .iter()
                .map(|player: &Player| (player.seat, player.stats.total_points))
                .collect(),
        };
        self.broadcast(&score);
        self.broadcast(&total);

        if self.current_deal + 1 < self.deals.len() {
            self.load_deal(self.current_deal + 1);
            self.broadcast_deal();
            self.set_state(SessionState::StartTrick(FIRST_TRICK), true);
            return Flow::Continue;
        }
        Flow::Finished
    }

    /// Resets per-deal state and hands out the configured cards. The DEAL
    /// frames go out separately: on seating for the first deal, via
    /// [`Server::broadcast_deal`] for the following ones.
    fn load_deal(&mut self, index: usize) {
        self.current_deal = index;
        self.taken_history.clear();
        let deal: &DealConfig = &self.deals[index];
        for player in self.players.iter_mut() {
            player.stats.start_deal(deal.hand(player.seat), deal.deal_type);
        }
        info!(
            "deal {} of {}: type {}, {} starts",
            index + 1,
            self.deals.len(),
            deal.deal_type,
            deal.first_seat
        );
    }

    fn deal_message_for(&self, seat: Seat) -> Message {
        let deal: &DealConfig = &self.deals[self.current_deal];
        Message::Deal {
            deal_type: deal.deal_type,
            first_seat: deal.first_seat,
            cards: deal.hand(seat).to_vec(),
        }
    }

    fn broadcast_deal(&mut self) {
        for seat in Seat::ALL {
            let deal: Message = self.deal_message_for(seat);
            self.enqueue_to(seat, &deal);
        }
        self.game_started = true;
    }

    fn broadcast(&mut self, message: &Message) {
        for seat in Seat::ALL {
            self.enqueue_to(seat, message);
        }
    }

    fn enqueue_to(&mut self, seat: Seat, message: &Message) {
        if let Some(conn) = self.players[seat as usize].conn.as_mut() {
            conn.enqueue(message);
        }
    }

    fn unbind(&mut self, seat: Seat) {
        self.players[seat as usize].conn = None;
        self.seated_order.retain(|&occupied: &Seat| occupied != seat);
    }

    async fn shutdown(&mut self) {
        self.accepting = false;
        info!("game over, disconnecting all players");
        for player in self.players.iter_mut() {
            if let Some(mut conn) = player.conn.take() {
                // The last SCORE/TOTAL must arrive; this is the one place
                // the engine waits on a single peer.
                conn.flush().await;
            }
        }
    }

    // ------------------------------------------------------------------
    // Poll supervisor
    // ------------------------------------------------------------------

    /// The engine's only suspension point. Pumps I/O, drops broken
    /// connections, admits and advances candidates, and keeps at it until
    /// all four seats are bound again. On return every seat is connected and
    /// any seat reseated during the pass has had its history replayed.
    async fn safe_poll(&mut self) {
        loop {
            self.poll_once().await;
            self.reap_broken();
            self.advance_candidates();
            if self.all_seated() {
                return;
            }
            debug!("waiting for all four seats to be filled");
        }
    }

    fn all_seated(&self) -> bool {
        self.players.iter().all(|player: &Player| player.conn.is_some())
    }

    /// Hands, table and taken history always partition the 52-card deck.
    fn cards_conserved(&self) -> bool {
        let held: usize = self
            .players
            .iter()
            .map(|player: &Player| player.stats.hand.len())
            .sum();
        let taken: usize = self
            .taken_history
            .iter()
            .map(|record: &TrickRecord| record.cards.len())
            .sum();
        held + taken + self.table.len() == 52
    }

    /// One readiness wait followed by one pump of every connection. Wakes on
    /// a new connection, on any bound socket becoming readable (or writable
    /// while it has queued output), or on the sub-second tick that drives
    /// the timeout checks.
    async fn poll_once(&mut self) {
        let accepted: Option<TcpStream> = {
            let mut waits: Vec<Pin<Box<dyn Future<Output = ()> + Send + '_>>> = self
                .players
                .iter()
                .filter_map(|player: &Player| player.conn.as_ref())
                .chain(self.candidates.iter().map(|candidate: &Candidate| &candidate.conn))
                .map(|conn: &Conn| {
                    Box::pin(conn.readiness()) as Pin<Box<dyn Future<Output = ()> + Send + '_>>
                })
                .collect();
            if waits.is_empty() {
                // select_all refuses an empty set; park on a future that
                // never resolves so the tick and the listener still drive us.
                waits.push(Box::pin(futures::future::pending()));
            }
            let readiness = select_all(waits);
            tokio::select! {
                result = self.listener.accept(), if self.accepting => {
                    result.ok().map(|(stream, _)| stream)
                }
                _ = readiness => None,
                _ = sleep(self.poll_granularity()) => None,
            }
        };

        for player in self.players.iter_mut() {
            if let Some(conn) = player.conn.as_mut() {
                conn.pump();
            }
        }
        for candidate in self.candidates.iter_mut() {
            candidate.conn.pump();
        }
        if let Some(stream) = accepted {
            self.admit(stream);
        }
    }

    fn poll_granularity(&self) -> Duration {
        (self.timeout / 10).clamp(Duration::from_millis(50), Duration::from_millis(500))
    }

    fn admit(&mut self, stream: TcpStream) {
        let bound: usize = self.seated_order.len() + self.candidates.len();
        if bound + 1 >= MAX_CONNECTIONS {
            warn!("connection table full, refusing new connection");
            return;
        }
        match Conn::new(stream) {
            Ok(conn) => {
                info!("new candidate connected from {}", conn.peer());
                self.candidates.push(Candidate::new(conn));
            }
            Err(err) => warn!("failed to set up accepted connection: {err}"),
        }
    }

    fn reap_broken(&mut self) {
        for seat in Seat::ALL {
            let broken: bool = self.players[seat as usize]
                .conn
                .as_ref()
                .is_some_and(Conn::is_broken);
            if broken {
                warn!("player {seat} disconnected");
                self.unbind(seat);
            }
        }
        self.candidates.retain(|candidate: &Candidate| {
            if candidate.conn.is_broken() {
                debug!("candidate {} disconnected", candidate.conn.peer());
                false
            } else {
                true
            }
        });
    }

    fn advance_candidates(&mut self) {
        let candidates: Vec<Candidate> = std::mem::take(&mut self.candidates);
        for candidate in candidates {
            if let Some(kept) = self.advance_candidate(candidate) {
                self.candidates.push(kept);
            }
        }
    }

    /// One admission step. Returns the candidate when it should stay in the
    /// table, `None` once it has been seated or dropped.
    fn advance_candidate(&mut self, mut candidate: Candidate) -> Option<Candidate> {
        match candidate.state {
            CandidateState::AwaitingIam => {
                if candidate.deadline_passed(self.timeout) {
                    debug!("candidate {} timed out before IAM", candidate.conn.peer());
                    return None;
                }
                let Some(frame) = candidate.conn.take_frame() else {
                    return Some(candidate);
                };
                match parse(&frame) {
                    Some(Message::IAm { seat }) => {
                        if self.players[seat as usize].conn.is_some() {
                            let busy: Message = Message::Busy {
                                seats: self.seated_order.clone(),
                            };
                            candidate.conn.enqueue(&busy);
                            candidate.state = CandidateState::Rejecting;
                            Some(candidate)
                        } else {
                            self.seat_candidate(candidate.conn, seat);
                            None
                        }
                    }
                    _ => {
                        warn!(
                            "candidate {} sent {:?} before IAM, dropping",
                            candidate.conn.peer(),
                            frame.trim_end()
                        );
                        None
                    }
                }
            }
            CandidateState::Rejecting => {
                if candidate.conn.is_writing() {
                    Some(candidate)
                } else {
                    debug!("candidate {} rejected with BUSY", candidate.conn.peer());
                    None
                }
            }
        }
    }

    /// Binds a candidate's connection to its seat. Mid-game the new socket
    /// is caught up immediately: the deal's original hand for the seat, then
    /// every trick taken so far. Seating the fourth player for the first
    /// time instead triggers the opening DEAL broadcast.
    fn seat_candidate(&mut self, mut conn: Conn, seat: Seat) {
        if self.game_started {
            conn.enqueue(&self.deal_message_for(seat));
            for record in &self.taken_history {
                conn.enqueue(&record.to_message());
            }
            info!(
                "player {seat} connected, replayed {} taken tricks",
                self.taken_history.len()
            );
        } else {
            info!("player {seat} connected");
        }
        self.players[seat as usize].conn = Some(conn);
        self.seated_order.push(seat);
        if !self.game_started && self.all_seated() {
            self.broadcast_deal();
        }
    }
}
