use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint could not be created, bound or switched to broadcast.
    #[error("failed to open client socket: {0}")]
    Socket(#[source] io::Error),
    /// An OS-level send failure. Public send paths log it and carry on.
    #[error("failed to send datagram: {0}")]
    Send(#[source] io::Error),
}
