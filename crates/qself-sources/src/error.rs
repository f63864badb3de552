use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code from {service}: {status} ({body})")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("error unmarshaling XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("error unmarshaling JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    #[error("invalid {field} '{value}'")]
    InvalidId { field: &'static str, value: String },

    #[error("{0}")]
    Config(String),
}

impl SourceError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
