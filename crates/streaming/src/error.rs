use formats::api::ServiceErrorBody;

/// Failure of a request to one of the remote services.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The request never produced a response (offline, CORS, DNS, timeout).
    Network(String),
    /// Non-2xx status without a structured error body.
    Status { code: u16, body: String },
    /// Non-2xx status with the routing service's error object.
    Api { code: i64, message: String },
    /// A 2xx response whose body could not be read.
    Parse(String),
}

impl ServiceError {
    /// Classifies a completed HTTP exchange. `Ok` for 2xx.
    pub fn check(status: u16, body: &str) -> Result<(), ServiceError> {
        if (200..300).contains(&status) {
            return Ok(());
        }
        match serde_json::from_str::<ServiceErrorBody>(body) {
            Ok(e) if !e.error.is_empty() => Err(ServiceError::Api {
                code: e.error_code,
                message: e.error,
            }),
            _ => Err(ServiceError::Status {
                code: status,
                body: body.to_string(),
            }),
        }
    }

    /// Text for the notification toast.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Network(_) => {
                "Could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            ServiceError::Status { code, .. } => format!("The server responded with status {code}."),
            ServiceError::Api { code, message } => format!("{message} (code {code})"),
            ServiceError::Parse(_) => "The server sent a response that could not be read.".to_string(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Network(e) => write!(f, "network error: {e}"),
            ServiceError::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            ServiceError::Api { code, message } => write!(f, "service error {code}: {message}"),
            ServiceError::Parse(e) => write!(f, "unreadable response: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Parse(e.to_string())
    }
}
