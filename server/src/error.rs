//! Error types shared by the library modules.

use std::fmt;

/// Invalid relay configuration read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPort { value: String },
    InvalidNumber { key: &'static str, value: String },
    OutOfRange { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { value } => {
                write!(f, "BULLETCORE_SERVER_PORT must be a valid port number, got {value:?}")
            }
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive number, got {value:?}")
            }
            Self::OutOfRange { field, value } => {
                write!(f, "simulation setting {field} is out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failures of the progress/leaderboard storage collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    Database(String),
    Encode(String),
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(msg) => write!(f, "storage error: {msg}"),
            Self::Encode(msg) => write!(f, "record encoding failed: {msg}"),
            Self::Decode(msg) => write!(f, "record decoding failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

macro_rules! store_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(err: $source) -> Self {
                    Self::Database(err.to_string())
                }
            }
        )*
    };
}

store_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<bincode::error::EncodeError> for StoreError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for StoreError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A relay request that could not be honored. Reported back to the sender
/// as an `error` message; never affects other sessions.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayError {
    MalformedMessage(String),
    UnknownMessageType { kind: String },
    MessageTooLarge { size: usize, max: usize },
    UnknownConnection,
    UnknownMatch { match_id: String },
    UnknownLobby { code: String },
    NotInMatch { match_id: String },
    MatchNotStarted { match_id: String },
    NotInQueue { player_id: String },
    AlreadyInMatch { player_id: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedMessage(detail) => write!(f, "Invalid message format: {detail}"),
            Self::UnknownMessageType { kind } => write!(f, "Unknown message type: {kind}"),
            Self::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {size} bytes (max {max})")
            }
            Self::UnknownConnection => write!(f, "Connection is not registered"),
            Self::UnknownMatch { match_id } => write!(f, "Match {match_id} not found"),
            Self::UnknownLobby { code } => write!(f, "Lobby {code} does not exist"),
            Self::NotInMatch { match_id } => write!(f, "You are not a member of match {match_id}"),
            Self::MatchNotStarted { match_id } => write!(f, "Match {match_id} has not started"),
            Self::NotInQueue { player_id } => write!(f, "Player {player_id} is not queued"),
            Self::AlreadyInMatch { player_id } => {
                write!(f, "Player {player_id} is already in a match")
            }
        }
    }
}

impl std::error::Error for RelayError {}
