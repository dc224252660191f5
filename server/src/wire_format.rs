//! Wire format for relay messages
//!
//! JSON text frames tagged by `type` in snake_case with camelCase fields.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};

/// Frames above this size are rejected before parsing.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub const DEFAULT_RATING: f64 = 1000.0;

const CLIENT_MESSAGE_TYPES: [&str; 7] = [
    "join_queue",
    "leave_queue",
    "match_ready",
    "position_update",
    "fire_bullet",
    "get_game_state",
    "ping",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinQueue {
        #[serde(default)]
        player_id: Option<String>,
        #[serde(default)]
        rating: Option<f64>,
        #[serde(default)]
        lobby: Option<String>,
    },
    LeaveQueue,
    MatchReady {
        match_id: String,
    },
    PositionUpdate {
        match_id: String,
        x: f64,
        y: f64,
        #[serde(default)]
        rotation: f64,
    },
    FireBullet {
        match_id: String,
        x: f64,
        y: f64,
        velocity_x: f64,
        velocity_y: f64,
    },
    GetGameState {
        match_id: String,
    },
    Ping {
        timestamp: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: String,
    pub rating: f64,
}

/// Last known state of one match member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberState {
    pub player_id: String,
    pub rating: f64,
    pub ready: bool,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub health: i32,
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Connected {
        message: String,
        connection_id: String,
    },
    QueueJoined {
        player_id: String,
        position: usize,
    },
    QueueLeft {
        player_id: String,
    },
    MatchFound {
        match_id: String,
        opponent: PlayerInfo,
        your_player_id: String,
    },
    MatchStart {
        match_id: String,
        players: Vec<PlayerInfo>,
    },
    PlayerMoved {
        match_id: String,
        player_id: String,
        x: f64,
        y: f64,
        rotation: f64,
    },
    BulletFired {
        match_id: String,
        player_id: String,
        x: f64,
        y: f64,
        velocity_x: f64,
        velocity_y: f64,
    },
    PlayerHit {
        match_id: String,
        shooter_id: String,
        target_id: String,
        damage: i32,
        health: i32,
        eliminated: bool,
    },
    GameState {
        match_id: String,
        started: bool,
        players: Vec<MemberState>,
    },
    Pong {
        timestamp: u64,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(err: &RelayError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parses a client text frame, telling malformed JSON apart from a
/// well-formed message of a type the relay doesn't speak.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, RelayError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(RelayError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

    if let Some(kind) = value.get("type").and_then(|t| t.as_str())
        && !CLIENT_MESSAGE_TYPES.contains(&kind)
    {
        return Err(RelayError::UnknownMessageType {
            kind: kind.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| RelayError::MalformedMessage(e.to_string()))
}
