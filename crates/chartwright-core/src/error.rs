pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Malformed document: {message}")]
    MalformedDocument { message: String },

    #[error(
        "Document violates {} structural invariant(s): {}",
        violations.len(),
        violations.join("; ")
    )]
    InvalidDocument { violations: Vec<String> },

    #[error("Unknown state machine: {machine_id}")]
    UnknownMachine { machine_id: String },

    #[error("Invalid editor config: {message}")]
    InvalidConfig { message: String },
}
