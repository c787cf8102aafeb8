use thiserror::Error;

use crate::structs::RCODE;

#[derive(Error, Debug)]
pub enum RnsError {
    #[error("insufficient data while decoding message")]
    InsufficientData,
    #[error("label length {length} exceeds the allowed 63 bytes")]
    LabelTooLarge { length: usize },
    #[error("label is not valid utf-8: {message}")]
    InvalidLabel { message: String },
    #[error("encoded name length {length} exceeds the allowed 255 bytes")]
    NameTooLarge { length: usize },
    #[error("character string length {length} exceeds the allowed 255 bytes")]
    CharacterStringTooLarge { length: usize },
    #[error("resource record data length {length} exceeds the allowed 65535 bytes")]
    RDataTooLarge { length: usize },
    #[error("invalid resource record type {value}")]
    InvalidRRType { value: u16 },
    #[error("invalid {rrtype} record data: {message}")]
    InvalidRRData {
        rrtype: &'static str,
        message: String,
    },
    #[error("{object} is not implemented")]
    NotImplemented { object: String },
    #[error("compression pointer loop while decoding a name")]
    PointerLoop,

    #[error("upstream reply id does not match the query id")]
    IdMismatch,
    #[error("upstream query timed out")]
    Timeout,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to resolve {name:?}")]
    Resolution { name: String },
}

impl RnsError {
    pub fn rcode(&self) -> RCODE {
        match self {
            RnsError::InsufficientData
            | RnsError::LabelTooLarge { .. }
            | RnsError::InvalidLabel { .. }
            | RnsError::NameTooLarge { .. }
            | RnsError::CharacterStringTooLarge { .. }
            | RnsError::RDataTooLarge { .. }
            | RnsError::InvalidRRType { .. }
            | RnsError::InvalidRRData { .. }
            | RnsError::PointerLoop => RCODE::FORMERR,
            RnsError::NotImplemented { .. } => RCODE::NOTIMP,
            RnsError::IdMismatch
            | RnsError::Timeout
            | RnsError::Io(_)
            | RnsError::Resolution { .. } => RCODE::SERVFAIL,
        }
    }
}
