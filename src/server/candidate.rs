use std::time::Duration;

use tokio::time::Instant;

use crate::network::Conn;

/// A connected socket that has not been seated yet. It either identifies
/// itself with IAM before the deadline or goes away; a candidate whose seat
/// is taken lingers in `Rejecting` just long enough to flush the BUSY frame.
#[derive(Debug)]
pub struct Candidate {
    pub conn: Conn,
    pub state: CandidateState,
    pub connected_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    AwaitingIam,
    Rejecting,
}

impl Candidate {
    pub fn new(conn: Conn) -> Self {
        Candidate {
            conn,
            state: CandidateState::AwaitingIam,
            connected_at: Instant::now(),
        }
    }

    /// True strictly after the IAM deadline; an IAM landing at exactly the
    /// deadline still counts.
    pub fn deadline_passed(&self, timeout: Duration) -> bool {
        self.connected_at.elapsed() > timeout
    }
}
