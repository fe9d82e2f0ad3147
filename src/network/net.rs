use std::net::{Ipv6Addr, SocketAddr};

use log::info;
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};

use crate::{config::AddressFamily, errors::Error, Result};

const LISTEN_BACKLOG: u32 = 4;

/// Opens the server's listening socket: IPv6 on all interfaces with address
/// and port reuse enabled, so the server can be restarted immediately. The
/// socket accepts IPv4 peers too through the platform's dual-stack mapping.
/// Port `None` lets the OS choose.
pub fn listen(port: Option<u16>) -> Result<TcpListener> {
    let socket: TcpSocket = TcpSocket::new_v6().map_err(Error::bind)?;
    socket.set_reuseaddr(true).map_err(Error::bind)?;
    #[cfg(unix)]
    socket.set_reuseport(true).map_err(Error::bind)?;
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port.unwrap_or(0)).into();
    socket.bind(addr).map_err(Error::bind)?;
    let listener: TcpListener = socket.listen(LISTEN_BACKLOG).map_err(Error::bind)?;
    info!("listening on port {}", listener.local_addr()?.port());
    Ok(listener)
}

/// Connects to the server, honouring a forced address family when one was
/// given on the command line and otherwise taking the resolver's order.
pub async fn connect(host: &str, port: u16, family: Option<AddressFamily>) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|err| Error::connect(host, port, err))?
        .filter(|addr: &SocketAddr| match family {
            Some(AddressFamily::V4) => addr.is_ipv4(),
            Some(AddressFamily::V6) => addr.is_ipv6(),
            None => true,
        })
        .collect();
    if addrs.is_empty() {
        return Err(Error::resolve(host, port));
    }
    let mut last_err: Option<std::io::Error> = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!("connected to server {addr}");
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(match last_err {
        Some(err) => Error::connect(host, port, err),
        None => Error::resolve(host, port),
    })
}
