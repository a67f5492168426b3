use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection, IO or timeout failure before a response was read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Anything other than 200 OK. Carries the server's `error` field when
    /// the body had one.
    #[error("HTTP {status}{detail}", detail = detail(.message))]
    Http { status: u16, message: Option<String> },

    /// `success: false` in an otherwise well-formed response.
    #[error("{0}")]
    Application(String),

    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid response: missing {0}")]
    MissingField(&'static str),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    /// Manual power control was attempted while the device decides for itself.
    #[error("Cannot switch fan manually in AUTO mode")]
    AutoModeActive,
}

pub type Result<T> = std::result::Result<T, Error>;

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

impl Error {
    /// Errors that came back from the backend itself rather than the network
    /// or our own parsing.
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Error::Http { .. } | Error::Application(_))
    }
}
