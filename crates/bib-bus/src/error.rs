use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Bus is closed")]
    Closed,
}

impl BusError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}
