use thiserror::Error;

use crate::ValueType;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("key not found: {key}")]
    KeyNotFound { key: String },
    #[error("attribute not found: {name}")]
    AttributeNotFound { name: String },
    #[error("unsupported value type: {value_type:?}")]
    UnsupportedType { value_type: ValueType },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl KnowledgeError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn attribute_not_found(name: impl Into<String>) -> Self {
        Self::AttributeNotFound { name: name.into() }
    }

    pub fn unsupported_type(value_type: ValueType) -> Self {
        Self::UnsupportedType { value_type }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

impl From<sea_orm::DbErr> for KnowledgeError {
    fn from(value: sea_orm::DbErr) -> Self {
        KnowledgeError::storage(value.to_string())
    }
}
