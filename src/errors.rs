use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
};

#[derive(Debug)]
pub enum Error {
    Usage(String),
    DealFile(String),
    Connection(String),
    Protocol(String),
    Other(String),
}

impl Error {
    pub fn usage(program: &str) -> Self {
        Self::Usage(format!(
            "usage: {program} [-p <port>] -f <dealsfile> [-t <timeout_seconds>]"
        ))
    }

    pub fn client_usage(program: &str) -> Self {
        Self::Usage(format!(
            "usage: {program} -h <host> -p <port> -N|-E|-S|-W [-4|-6] [-a]"
        ))
    }

    pub fn deal_file(line: usize, reason: impl Display) -> Self {
        Self::DealFile(format!("deals file, record at line {line}: {reason}"))
    }

    pub fn bind(err: IoError) -> Self {
        Self::Connection(format!("failed to bind listening socket: {err}"))
    }

    pub fn connect(host: &str, port: u16, err: IoError) -> Self {
        Self::Connection(format!("failed to connect to {host}:{port}: {err}"))
    }

    pub fn resolve(host: &str, port: u16) -> Self {
        Self::Connection(format!("no usable address for {host}:{port}"))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::Usage(msg)
            | Error::DealFile(msg)
            | Error::Connection(msg)
            | Error::Protocol(msg)
            | Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Connection(err.to_string())
    }
}
