//! Matchmaking broker: queue, pairing, match lifecycle and event relay.
//!
//! The broker is plain synchronous state. The relay wraps it in a mutex and
//! every connection task mutates it under that lock.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::wire_format::{
    ClientMessage, DEFAULT_RATING, MemberState, PlayerInfo, ServerMessage, decode_client_message,
};
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random uppercase alphanumeric code.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LobbyCode(String);

impl LobbyCode {
    pub fn generate() -> Self {
        Self(generate_code(8))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub player_id: String,
    pub rating: f64,
    pub lobby: Option<String>,
    pub connection: ConnectionId,
    pub joined_at: Instant,
}

/// Index of the queued player closest in rating to `candidate` within the
/// same lobby. Ties go to whoever queued first.
pub fn best_opponent(queue: &[QueueEntry], candidate: &QueueEntry) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, entry) in queue.iter().enumerate() {
        if entry.player_id == candidate.player_id || entry.lobby != candidate.lobby {
            continue;
        }
        let diff = (entry.rating - candidate.rating).abs();
        if best.is_none_or(|(_, best_diff)| diff < best_diff) {
            best = Some((index, diff));
        }
    }
    best.map(|(index, _)| index)
}

#[derive(Debug, Clone)]
struct Member {
    player_id: String,
    rating: f64,
    connection: ConnectionId,
    ready: bool,
    position: Option<[f64; 3]>,
    health: i32,
    kills: u32,
}

impl Member {
    fn info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.player_id.clone(),
            rating: self.rating,
        }
    }

    fn state(&self) -> MemberState {
        let [x, y, rotation] = self.position.unwrap_or_default();
        MemberState {
            player_id: self.player_id.clone(),
            rating: self.rating,
            ready: self.ready,
            x,
            y,
            rotation,
            health: self.health,
            kills: self.kills,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Match {
    pub id: String,
    members: Vec<Member>,
    pub started: bool,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Match {
    pub fn player_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.player_id.as_str()).collect()
    }

    fn member_index(&self, connection: ConnectionId) -> Option<usize> {
        self.members.iter().position(|m| m.connection == connection)
    }
}

struct Connection {
    sender: broadcast::Sender<ServerMessage>,
    player_id: Option<String>,
    match_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerStatus {
    pub connections: usize,
    pub queued: usize,
    pub matches: usize,
    pub active_matches: usize,
    pub lobbies: usize,
}

pub struct Broker {
    connections: HashMap<ConnectionId, Connection>,
    queue: Vec<QueueEntry>,
    matches: HashMap<String, Match>,
    lobbies: HashSet<String>,
    match_timeout: Duration,
    hit_radius: f64,
    bullet_damage: i32,
    max_health: i32,
}

impl Broker {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            connections: HashMap::new(),
            queue: Vec::new(),
            matches: HashMap::new(),
            lobbies: HashSet::new(),
            match_timeout: config.match_timeout,
            hit_radius: config.hit_radius,
            bullet_damage: config.bullet_damage,
            max_health: config.max_health,
        }
    }

    pub fn status(&self) -> BrokerStatus {
        BrokerStatus {
            connections: self.connections.len(),
            queued: self.queue.len(),
            matches: self.matches.len(),
            active_matches: self.matches.values().filter(|m| m.started).count(),
            lobbies: self.lobbies.len(),
        }
    }

    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn get_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.get(match_id)
    }

    pub fn create_lobby(&mut self) -> LobbyCode {
        let code = LobbyCode::generate();
        self.lobbies.insert(code.as_str().to_string());
        info!("Created lobby {}", code.as_str());
        code
    }

    /// Registers a connection and greets it.
    pub fn connect(&mut self, sender: broadcast::Sender<ServerMessage>) -> ConnectionId {
        let id = Uuid::new_v4();
        if let Err(e) = sender.send(ServerMessage::Connected {
            message: "Connected to matchmaking server".to_string(),
            connection_id: id.to_string(),
        }) {
            debug!("Greeting for {} not delivered: {}", id, e);
        }
        self.connections.insert(
            id,
            Connection {
                sender,
                player_id: None,
                match_id: None,
            },
        );
        id
    }

    /// Drops the connection, its queue entry and its seat in any match. A
    /// match left with a single member is closed so the survivor can requeue.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.connection != connection);
        if self.queue.len() != before {
            info!("Removed connection {} from the queue", connection);
        }
        if let Some(conn) = self.connections.remove(&connection)
            && let Some(match_id) = conn.match_id
        {
            self.leave_match(connection, &match_id);
        }
    }

    fn leave_match(&mut self, connection: ConnectionId, match_id: &str) {
        let Some(game) = self.matches.get_mut(match_id) else {
            return;
        };
        game.members.retain(|m| m.connection != connection);
        if game.members.len() >= 2 {
            return;
        }
        if let Some(game) = self.matches.remove(match_id) {
            for member in &game.members {
                if let Some(conn) = self.connections.get_mut(&member.connection)
                    && conn.match_id.as_deref() == Some(match_id)
                {
                    conn.match_id = None;
                }
            }
            info!("Closed match {} after a player left", match_id);
        }
    }

    fn send(&self, connection: ConnectionId, message: ServerMessage) {
        if let Some(conn) = self.connections.get(&connection)
            && let Err(e) = conn.sender.send(message)
        {
            // Receiver gone; the socket task is shutting down.
            debug!("Dropped message for {}: {}", connection, e);
        }
    }

    /// Decodes and handles one text frame. Failures go back to the sender
    /// as an `error` message and nowhere else.
    pub fn handle_text(&mut self, connection: ConnectionId, text: &str, now: Instant) {
        let result = decode_client_message(text)
            .and_then(|message| self.handle_message(connection, message, now));
        if let Err(e) = result {
            debug!("Rejected message from {}: {}", connection, e);
            self.send(connection, ServerMessage::error(&e));
        }
    }

    pub fn handle_message(
        &mut self,
        connection: ConnectionId,
        message: ClientMessage,
        now: Instant,
    ) -> Result<(), RelayError> {
        if !self.connections.contains_key(&connection) {
            return Err(RelayError::UnknownConnection);
        }

        match message {
            ClientMessage::JoinQueue {
                player_id,
                rating,
                lobby,
            } => self.join_queue(connection, player_id, rating, lobby, now),
            ClientMessage::LeaveQueue => self.leave_queue(connection),
            ClientMessage::MatchReady { match_id } => self.match_ready(connection, &match_id, now),
            ClientMessage::PositionUpdate {
                match_id,
                x,
                y,
                rotation,
            } => self.position_update(connection, &match_id, [x, y, rotation], now),
            ClientMessage::FireBullet {
                match_id,
                x,
                y,
                velocity_x,
                velocity_y,
            } => self.fire_bullet(connection, &match_id, [x, y], [velocity_x, velocity_y], now),
            ClientMessage::GetGameState { match_id } => self.game_state(connection, &match_id),
            ClientMessage::Ping { timestamp } => {
                self.send(connection, ServerMessage::Pong { timestamp });
                Ok(())
            }
        }
    }

    fn join_queue(
        &mut self,
        connection: ConnectionId,
        player_id: Option<String>,
        rating: Option<f64>,
        lobby: Option<String>,
        now: Instant,
    ) -> Result<(), RelayError> {
        let player_id =
            player_id.unwrap_or_else(|| format!("player_{}", generate_code(8).to_lowercase()));

        if let Some(conn) = self.connections.get(&connection)
            && let Some(match_id) = &conn.match_id
            && self.matches.contains_key(match_id)
        {
            return Err(RelayError::AlreadyInMatch { player_id });
        }
        if let Some(code) = &lobby
            && !self.lobbies.contains(code)
        {
            return Err(RelayError::UnknownLobby { code: code.clone() });
        }

        self.queue
            .retain(|entry| entry.connection != connection && entry.player_id != player_id);
        let entry = QueueEntry {
            player_id: player_id.clone(),
            rating: rating.unwrap_or(DEFAULT_RATING),
            lobby,
            connection,
            joined_at: now,
        };
        info!(
            "Player {} joining queue with rating {}",
            player_id, entry.rating
        );
        self.queue.push(entry);
        if let Some(conn) = self.connections.get_mut(&connection) {
            conn.player_id = Some(player_id.clone());
        }

        self.send(
            connection,
            ServerMessage::QueueJoined {
                player_id: player_id.clone(),
                position: self.queue.len(),
            },
        );
        self.find_match(&player_id, now);
        Ok(())
    }

    fn leave_queue(&mut self, connection: ConnectionId) -> Result<(), RelayError> {
        let Some(index) = self.queue.iter().position(|e| e.connection == connection) else {
            let player_id = self
                .connections
                .get(&connection)
                .and_then(|c| c.player_id.clone())
                .unwrap_or_default();
            return Err(RelayError::NotInQueue { player_id });
        };
        let entry = self.queue.remove(index);
        info!("Player {} left queue", entry.player_id);
        self.send(
            connection,
            ServerMessage::QueueLeft {
                player_id: entry.player_id,
            },
        );
        Ok(())
    }

    fn find_match(&mut self, player_id: &str, now: Instant) {
        let Some(candidate_index) = self.queue.iter().position(|e| e.player_id == player_id) else {
            return;
        };
        let Some(opponent_index) = best_opponent(&self.queue, &self.queue[candidate_index]) else {
            return;
        };

        // Remove the higher index first so the lower one stays valid.
        let (first, second) = if candidate_index > opponent_index {
            (candidate_index, opponent_index)
        } else {
            (opponent_index, candidate_index)
        };
        let removed_first = self.queue.remove(first);
        let removed_second = self.queue.remove(second);
        let (candidate, opponent) = if first == candidate_index {
            (removed_first, removed_second)
        } else {
            (removed_second, removed_first)
        };

        let match_id = format!("match_{}", generate_code(8));
        let members: Vec<Member> = [&candidate, &opponent]
            .into_iter()
            .map(|entry| Member {
                player_id: entry.player_id.clone(),
                rating: entry.rating,
                connection: entry.connection,
                ready: false,
                position: None,
                health: self.max_health,
                kills: 0,
            })
            .collect();

        for (me, them) in [(&members[0], &members[1]), (&members[1], &members[0])] {
            self.send(
                me.connection,
                ServerMessage::MatchFound {
                    match_id: match_id.clone(),
                    opponent: them.info(),
                    your_player_id: me.player_id.clone(),
                },
            );
            if let Some(conn) = self.connections.get_mut(&me.connection) {
                conn.match_id = Some(match_id.clone());
            }
        }

        info!(
            "Match {} created: {} vs {}",
            match_id, candidate.player_id, opponent.player_id
        );
        self.matches.insert(
            match_id.clone(),
            Match {
                id: match_id,
                members,
                started: false,
                created_at: now,
                last_activity: now,
            },
        );
    }

    /// Looks up a match the connection belongs to.
    fn member_match(
        &mut self,
        connection: ConnectionId,
        match_id: &str,
    ) -> Result<(&mut Match, usize), RelayError> {
        let game = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| RelayError::UnknownMatch {
                match_id: match_id.to_string(),
            })?;
        let index = game
            .member_index(connection)
            .ok_or_else(|| RelayError::NotInMatch {
                match_id: match_id.to_string(),
            })?;
        Ok((game, index))
    }

    fn match_ready(
        &mut self,
        connection: ConnectionId,
        match_id: &str,
        now: Instant,
    ) -> Result<(), RelayError> {
        let (game, index) = self.member_match(connection, match_id)?;
        game.members[index].ready = true;
        game.last_activity = now;

        if game.started || !game.members.iter().all(|m| m.ready) {
            return Ok(());
        }
        game.started = true;
        let players: Vec<PlayerInfo> = game.members.iter().map(Member::info).collect();
        let recipients: Vec<ConnectionId> = game.members.iter().map(|m| m.connection).collect();

        info!("Match {} starting", match_id);
        for recipient in recipients {
            self.send(
                recipient,
                ServerMessage::MatchStart {
                    match_id: match_id.to_string(),
                    players: players.clone(),
                },
            );
        }
        Ok(())
    }

    fn started_match(
        &mut self,
        connection: ConnectionId,
        match_id: &str,
        now: Instant,
    ) -> Result<(&mut Match, usize), RelayError> {
        let (game, index) = self.member_match(connection, match_id)?;
        if !game.started {
            return Err(RelayError::MatchNotStarted {
                match_id: match_id.to_string(),
            });
        }
        game.last_activity = now;
        Ok((game, index))
    }

    fn position_update(
        &mut self,
        connection: ConnectionId,
        match_id: &str,
        pose: [f64; 3],
        now: Instant,
    ) -> Result<(), RelayError> {
        let (game, index) = self.started_match(connection, match_id, now)?;
        game.members[index].position = Some(pose);
        let player_id = game.members[index].player_id.clone();
        let others: Vec<ConnectionId> = game
            .members
            .iter()
            .filter(|m| m.connection != connection)
            .map(|m| m.connection)
            .collect();

        let [x, y, rotation] = pose;
        for other in others {
            self.send(
                other,
                ServerMessage::PlayerMoved {
                    match_id: match_id.to_string(),
                    player_id: player_id.clone(),
                    x,
                    y,
                    rotation,
                },
            );
        }
        Ok(())
    }

    /// Relays a shot and runs the coarse hit check: the first other member
    /// whose last reported position lies within `hit_radius` of the shot
    /// origin takes `bullet_damage`. Positions are self-reported and never
    /// verified.
    fn fire_bullet(
        &mut self,
        connection: ConnectionId,
        match_id: &str,
        origin: [f64; 2],
        velocity: [f64; 2],
        now: Instant,
    ) -> Result<(), RelayError> {
        let hit_radius = self.hit_radius;
        let damage = self.bullet_damage;
        let max_health = self.max_health;
        let (game, shooter) = self.started_match(connection, match_id, now)?;
        let shooter_id = game.members[shooter].player_id.clone();

        let target = game.members.iter().position(|m| {
            m.connection != connection
                && m.position.is_some_and(|[x, y, _]| {
                    ((x - origin[0]).powi(2) + (y - origin[1]).powi(2)).sqrt() <= hit_radius
                })
        });

        let mut hit = None;
        if let Some(target) = target {
            let member = &mut game.members[target];
            member.health -= damage;
            let eliminated = member.health <= 0;
            let health = member.health.max(0);
            let target_id = member.player_id.clone();
            if eliminated {
                member.health = max_health;
                game.members[shooter].kills += 1;
            }
            hit = Some(ServerMessage::PlayerHit {
                match_id: match_id.to_string(),
                shooter_id: shooter_id.clone(),
                target_id,
                damage,
                health,
                eliminated,
            });
        }

        let members: Vec<ConnectionId> = game.members.iter().map(|m| m.connection).collect();
        for other in members.iter().filter(|c| **c != connection) {
            self.send(
                *other,
                ServerMessage::BulletFired {
                    match_id: match_id.to_string(),
                    player_id: shooter_id.clone(),
                    x: origin[0],
                    y: origin[1],
                    velocity_x: velocity[0],
                    velocity_y: velocity[1],
                },
            );
        }
        if let Some(hit) = hit {
            for member in members {
                self.send(member, hit.clone());
            }
        }
        Ok(())
    }

    fn game_state(&mut self, connection: ConnectionId, match_id: &str) -> Result<(), RelayError> {
        let (game, _) = self.member_match(connection, match_id)?;
        let message = ServerMessage::GameState {
            match_id: match_id.to_string(),
            started: game.started,
            players: game.members.iter().map(Member::state).collect(),
        };
        self.send(connection, message);
        Ok(())
    }

    /// Drops matches idle for longer than the timeout. Returns how many.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let timeout = self.match_timeout;
        let expired: Vec<String> = self
            .matches
            .values()
            .filter(|m| now.saturating_duration_since(m.last_activity) > timeout)
            .map(|m| m.id.clone())
            .collect();

        for match_id in &expired {
            if let Some(game) = self.matches.remove(match_id) {
                for member in &game.members {
                    if let Some(conn) = self.connections.get_mut(&member.connection)
                        && conn.match_id.as_deref() == Some(match_id.as_str())
                    {
                        conn.match_id = None;
                    }
                }
                warn!("Match {} expired after inactivity", match_id);
            }
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player_id: &str, rating: f64) -> QueueEntry {
        QueueEntry {
            player_id: player_id.to_string(),
            rating,
            lobby: None,
            connection: Uuid::new_v4(),
            joined_at: Instant::now(),
        }
    }

    #[test]
    fn picks_the_closest_rating() {
        let queue = vec![entry("a", 1000.0), entry("b", 1050.0), entry("c", 1400.0)];
        assert_eq!(best_opponent(&queue, &entry("d", 1030.0)), Some(1));
    }

    #[test]
    fn ties_go_to_the_earliest_queued() {
        let queue = vec![entry("a", 1100.0), entry("b", 900.0), entry("c", 1100.0)];
        assert_eq!(best_opponent(&queue, &entry("d", 1000.0)), Some(0));
    }

    #[test]
    fn lobbies_only_pair_with_each_other() {
        let mut lobby_player = entry("a", 1000.0);
        lobby_player.lobby = Some("ABCD1234".to_string());
        let queue = vec![lobby_player, entry("b", 2000.0)];
        assert_eq!(best_opponent(&queue, &entry("c", 1000.0)), Some(1));
        assert_eq!(best_opponent(&queue[..1], &entry("c", 1000.0)), None);
    }

    #[test]
    fn candidate_never_pairs_with_itself() {
        let queue = vec![entry("a", 1000.0)];
        assert_eq!(best_opponent(&queue, &queue[0]), None);
    }

    #[test]
    fn codes_are_alphanumeric() {
        let code = LobbyCode::generate();
        assert_eq!(code.as_str().len(), 8);
        assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }
}
