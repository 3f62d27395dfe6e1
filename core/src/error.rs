use thiserror::Error;

/// Mapping-table compile and resolution failures.
///
/// `key_path` is always the dotted output path of the offending entry
/// (`applicant.addresses[1].city`), so a failure can be located in a large
/// partner schema without re-running the build.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("{key_path}: invalid path expression '{expr}': {reason}")]
    InvalidPath {
        key_path: String,
        expr: String,
        reason: String,
    },

    #[error("{key_path}: unknown transform '{name}'")]
    UnknownTransform { key_path: String, name: String },

    #[error("{key_path}: invalid field descriptor: {reason}")]
    InvalidDescriptor { key_path: String, reason: String },

    #[error("{key_path}: required value is empty (source '{source_path}')")]
    NullValue {
        key_path: String,
        source_path: String,
    },

    #[error("{key_path}: value {value} at '{source_path}' is not numeric")]
    NotNumeric {
        key_path: String,
        source_path: String,
        value: String,
    },

    #[error("{key_path}: context has no list named '{list}'")]
    MissingList { key_path: String, list: String },

    #[error("{key_path}: cannot coerce {value} to {data_type}")]
    Coercion {
        key_path: String,
        data_type: String,
        value: String,
    },

    #[error("{key_path}: transform '{transform}' failed: {error}")]
    Transform {
        key_path: String,
        transform: String,
        error: TransformError,
    },
}

impl MappingError {
    pub fn key_path(&self) -> &str {
        match self {
            Self::InvalidPath { key_path, .. }
            | Self::UnknownTransform { key_path, .. }
            | Self::InvalidDescriptor { key_path, .. }
            | Self::NullValue { key_path, .. }
            | Self::NotNumeric { key_path, .. }
            | Self::MissingList { key_path, .. }
            | Self::Coercion { key_path, .. }
            | Self::Transform { key_path, .. } => key_path,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("context field '{field}' is missing")]
    MissingField { field: String },

    #[error("context field '{field}' is not numeric")]
    NotNumeric { field: String },

    #[error("unsupported value {value}")]
    Unsupported { value: String },
}

/// Failure to obtain any HTTP response from a partner.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// DBS partner failure carrying the raw status and body for diagnosis.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("DBS API error (status {status:?}): {message}")]
pub struct DbsApiError {
    pub status: Option<u16>,
    pub body: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ChannelingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SFTP error: {0}")]
    Sftp(#[from] ssh2::Error),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Dbs(#[from] DbsApiError),

    #[error("{kind} '{identifier}' was already recorded")]
    AlreadyRecorded { kind: String, identifier: String },

    #[error("Malformed file '{name}': {reason}")]
    MalformedFile { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ChannelingResult<T> = Result<T, ChannelingError>;
