use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    InvalidRequest,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RequestError {}

pub fn invalid_request(message: impl Into<String>) -> RequestError {
    RequestError::new(RequestErrorKind::InvalidRequest, message)
}

pub fn persistence_failed(message: impl Into<String>) -> RequestError {
    RequestError::new(RequestErrorKind::Persistence, message)
}
