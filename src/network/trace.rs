use std::io::Write;
use std::net::SocketAddr;

use chrono::Local;

/// Prints one raw frame to the wire trace on standard output:
/// `[<sender-ip:port>,<receiver-ip:port>,<timestamp>] <frame>`.
/// The frame carries its own CRLF terminator.
pub fn report(sender: SocketAddr, receiver: SocketAddr, frame: &str) {
    let time = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
    print!(
        "[{}:{},{}:{},{time}] {frame}",
        sender.ip(),
        sender.port(),
        receiver.ip(),
        receiver.port(),
    );
    let _ = std::io::stdout().flush();
}
