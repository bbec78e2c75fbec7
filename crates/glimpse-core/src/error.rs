#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("History store error: {0}")]
    History(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Control channel closed")]
    ChannelClosed,
}
