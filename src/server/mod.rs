pub mod candidate;
pub mod rules;
pub mod session;

pub use session::Server;
