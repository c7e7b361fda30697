use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug)]
pub struct QueryError {
    info: String,
    constraint: Option<String>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            constraint: None,
        }
    }

    /// Name of the violated database constraint, if the store reported one.
    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// Maps a unique-constraint violation onto a field error using
    /// `(constraint, field, message)` triples; anything else stays a storage error.
    pub fn into_field_error(self, fields: &[(&str, &str, &str)]) -> ApiError {
        let hit = fields
            .iter()
            .find(|(constraint, _, _)| self.constraint() == Some(*constraint));

        match hit {
            Some((_, field, message)) => ValidationError::single(field, *message).into(),
            None => ApiError::Query(self),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                info: format!("{e}"),
                constraint: e.constraint().map(|c| c.to_owned()),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for CacheError {}

/// Malformed request data that isn't tied to a model field (query strings, paths).
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Field-tagged input errors, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn extend(&mut self, other: ValidationError) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was collected.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    AlreadyExists(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Shopping cart is empty, nothing to download")]
    EmptyCart,

    #[error("You can't subscribe to yourself")]
    SelfFollow,

    #[error("{0}")]
    Missing(&'static str),

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    InvalidRequest(#[from] TypeError),

    #[error("{0}")]
    Internal(&'static str),

    #[error("Database error: {0}")]
    Query(#[from] QueryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(value: redis::RedisError) -> Self {
        Self::Cache(CacheError::from(value))
    }
}

impl warp::reject::Reject for ApiError {}
