use alloc::string::String;
use thiserror::Error;

use crate::ModuleErr;

/// Errors raised while declaring parameters or binding load-time arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter '{name}' declared twice")]
    Duplicate { name: String },

    #[error("unknown parameter '{name}'")]
    Unknown { name: String },

    #[error("'{value}' invalid for parameter '{name}' ({kind})")]
    TypeCoercion {
        name: String,
        value: String,
        kind: &'static str,
    },

    #[error("{name}: can only take {capacity} arguments")]
    ArrayOverflow { name: String, capacity: usize },

    #[error("malformed argument '{token}'")]
    Malformed { token: String },

    #[error("{name}: string doesn't fit in {max_len} chars")]
    StringTooLong { name: String, max_len: usize },

    #[error("invalid declaration of '{name}': {reason}")]
    InvalidDeclaration { name: String, reason: &'static str },
}

impl From<ParamError> for ModuleErr {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::Duplicate { .. } => ModuleErr::EEXIST,
            ParamError::Unknown { .. } => ModuleErr::ENOENT,
            ParamError::StringTooLong { .. } => ModuleErr::ENOSPC,
            ParamError::TypeCoercion { .. }
            | ParamError::ArrayOverflow { .. }
            | ParamError::Malformed { .. }
            | ParamError::InvalidDeclaration { .. } => ModuleErr::EINVAL,
        }
    }
}

pub type ParamResult<T> = core::result::Result<T, ParamError>;
