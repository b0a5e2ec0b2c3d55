use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentErrorKind {
    InvalidCatalog,
    InvalidOptions,
    UnknownCategory,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentError {
    pub kind: ConsentErrorKind,
    pub message: String,
}

impl ConsentError {
    pub fn new(kind: ConsentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConsentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConsentError {}

pub fn invalid_catalog(message: impl Into<String>) -> ConsentError {
    ConsentError::new(ConsentErrorKind::InvalidCatalog, message)
}

pub fn invalid_options(message: impl Into<String>) -> ConsentError {
    ConsentError::new(ConsentErrorKind::InvalidOptions, message)
}

pub fn unknown_category(message: impl Into<String>) -> ConsentError {
    ConsentError::new(ConsentErrorKind::UnknownCategory, message)
}

pub fn persistence_failed(message: impl Into<String>) -> ConsentError {
    ConsentError::new(ConsentErrorKind::Persistence, message)
}
