use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket server error: {0}")]
    WebSocket(#[from] votegate_websocket::WsError),

    #[error("gateway already started")]
    AlreadyStarted,

    #[error("background tasks still running after {0:?}")]
    ShutdownTimeout(std::time::Duration),
}
