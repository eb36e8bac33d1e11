/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the command and
/// listener logic can treat faults uniformly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Any fault raised while talking to the language-model API.
///
/// Relay paths always catch this at the handler boundary and render it to the
/// user together with the original input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("prompt was blocked: {0}")]
    Blocked(String),

    #[error("response contained no text{}", finish_suffix(.0))]
    EmptyResponse(Option<String>),

    #[error("failed to parse response: {0}")]
    Decode(String),
}

fn finish_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (finish reason: {r})"))
        .unwrap_or_default()
}
