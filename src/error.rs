use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Json(serde_json::Error),
    NotAuthenticated,
    InvalidMode {
        kind: &'static str,
        value: String,
        allowed: Vec<String>,
    },
    OutOfRange {
        kind: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    InvalidCode {
        field: &'static str,
        code: i64,
    },
    MissingField(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::NotAuthenticated => write!(f, "not authenticated"),
            Error::InvalidMode {
                kind,
                value,
                allowed,
            } => write!(f, "unknown {kind}: {value}. Allowed: {allowed:?}"),
            Error::OutOfRange {
                kind,
                value,
                min,
                max,
            } => {
                if value < min {
                    write!(f, "minimum {kind} is {min}. Given: {value}")
                } else {
                    write!(f, "maximum {kind} is {max}. Given: {value}")
                }
            }
            Error::InvalidCode { field, code } => write!(f, "unmapped code {code} for {field}"),
            Error::MissingField(path) => write!(f, "missing or malformed field: {path}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
