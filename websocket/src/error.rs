use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("read-model consumer has stopped")]
    ConsumerGone,
}
