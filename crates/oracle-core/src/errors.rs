use thiserror::Error;

/// Errors raised by a single attempt against one external source.
///
/// Every variant is recoverable at the source-set level: the set logs it,
/// records it as the most recent failure and moves on to the next source.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SourceError {
    /// The call exceeded its timeout.
    #[error("Request timeout")]
    Timeout,

    /// The transport could not reach the endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx HTTP status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Successful status with an empty body.
    #[error("Empty response body")]
    EmptyBody,

    /// Body could not be parsed as the expected document type.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The expected field is absent from the parsed body.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The extracted field is not a finite number.
    #[error("Non-numeric value: {0}")]
    NotNumeric(String),

    /// The extracted number is outside the plausibility range.
    #[error("Implausible value: {0}")]
    Implausible(f64),

    /// A stored credential could not be decoded.
    #[error("Credential decode failed: {0}")]
    CredentialDecode(String),

    /// A stored credential decoded to an empty value.
    #[error("Credential is empty after decoding")]
    EmptyCredential,

    /// The endpoint template references an unknown or malformed placeholder.
    #[error("Endpoint template error: {0}")]
    Template(String),
}

impl SourceError {
    /// Returns a static label for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection",
            Self::HttpStatus(_) => "http_status",
            Self::EmptyBody => "empty_body",
            Self::Malformed(_) => "malformed",
            Self::MissingField(_) => "missing_field",
            Self::NotNumeric(_) => "not_numeric",
            Self::Implausible(_) => "implausible",
            Self::CredentialDecode(_) => "credential_decode",
            Self::EmptyCredential => "empty_credential",
            Self::Template(_) => "template",
        }
    }

    /// Returns `true` if the failure happened below the HTTP layer or was a 5xx.
    ///
    /// The HTTP client uses this to decide whether a retry on the same
    /// endpoint is worth attempting.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

/// A field of an agreed result that could not be converted for storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct CommitError {
    pub field: &'static str,
    pub reason: String,
}

impl CommitError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

/// Errors surfaced to the caller of a contract write entry point.
///
/// Any of these aborts the round. Persistent state is left exactly as it was
/// before the round, except for rotation bookkeeping that the leader already
/// recorded.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OracleError {
    /// Setup is invalid: empty source list, no credentials, bad coordinates.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every source in a set failed.
    #[error("All {attempts} sources failed; last error from {last_source}: {last}")]
    Exhausted { attempts: usize, last_source: String, last: SourceError },

    /// Validators did not reach quorum on the leader's result.
    #[error("Result rejected: {accepted}/{total} validators accepted, {required} required")]
    Rejected { accepted: usize, total: usize, required: usize },

    /// The agreed result could not be converted for storage.
    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),

    /// The leader procedure failed outside of source fetching.
    #[error("Leader error: {0}")]
    Leader(String),
}

impl OracleError {
    /// Returns a static label naming the error class.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Exhausted { .. } => "exhausted",
            Self::Rejected { .. } => "rejected",
            Self::Commit(_) => "commit",
            Self::Leader(_) => "leader",
        }
    }
}

/// Errors from loading or saving persistent state.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("State I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("State encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
