//! Persistent player progress and the run leaderboard.
//!
//! Records are bincode-encoded. `RedbStore` keeps them in a redb file,
//! `MemoryStore` in a map for tests and throwaway sessions.

use crate::components::ShipKind;
use crate::error::StoreError;
use crate::player::Loadout;
use bincode::{Decode, Encode};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const XP_PER_LEVEL: u64 = 1000;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

const PROGRESS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("progress");
const RUNS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("runs");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub enum Booster {
    Shield,
    RapidFire,
    DoubleCredits,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Upgrades {
    pub fire_rate: u32,
    pub speed: u32,
    pub extra_life: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BoosterInventory {
    pub shield: u32,
    pub rapid_fire: u32,
    pub double_credits: u32,
}

impl Default for BoosterInventory {
    fn default() -> Self {
        Self {
            shield: 1,
            rapid_fire: 1,
            double_credits: 1,
        }
    }
}

impl BoosterInventory {
    fn slot(&mut self, booster: Booster) -> &mut u32 {
        match booster {
            Booster::Shield => &mut self.shield,
            Booster::RapidFire => &mut self.rapid_fire,
            Booster::DoubleCredits => &mut self.double_credits,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LifetimeStats {
    pub total_kills: u64,
    pub best_wave: u32,
    pub boosters_used: u32,
    pub high_score: u64,
    pub games_played: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ProgressRecord {
    pub player_id: String,
    pub level: u32,
    pub xp: u64,
    pub credits: u64,
    pub upgrades: Upgrades,
    pub selected_ship: ShipKind,
    pub unlocked_ships: Vec<ShipKind>,
    pub boosters: BoosterInventory,
    pub stats: LifetimeStats,
    pub max_health: u32,
}

impl ProgressRecord {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            level: 1,
            xp: 0,
            credits: 0,
            upgrades: Upgrades::default(),
            selected_ship: ShipKind::Ranger,
            unlocked_ships: vec![ShipKind::Ranger],
            boosters: BoosterInventory::default(),
            stats: LifetimeStats::default(),
            max_health: 3,
        }
    }

    /// Uses one booster from the inventory. False when none are left.
    pub fn consume_booster(&mut self, booster: Booster) -> bool {
        let slot = self.boosters.slot(booster);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        self.stats.boosters_used += 1;
        true
    }

    /// Adds xp and returns how many levels were gained. Level `n` needs
    /// `n * 1000` cumulative xp to advance.
    pub fn add_xp(&mut self, xp: u64) -> u32 {
        self.xp += xp;
        let mut gained = 0;
        while self.xp >= self.level as u64 * XP_PER_LEVEL {
            self.level += 1;
            gained += 1;
        }
        gained
    }

    pub fn loadout(&self, booster: Option<Booster>) -> Loadout {
        Loadout {
            ship: self.selected_ship,
            speed_level: self.upgrades.speed,
            fire_rate_level: self.upgrades.fire_rate,
            extra_lives: self.upgrades.extra_life,
            max_health: self.max_health,
            shield: booster == Some(Booster::Shield),
            rapid_fire: booster == Some(Booster::RapidFire),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: u64,
    pub kills: u64,
    pub wave: u32,
}

/// Storage collaborator for progress records and finished runs.
pub trait ProgressStore {
    fn load_progress(&self, player_id: &str) -> Result<Option<ProgressRecord>, StoreError>;
    fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError>;
    fn submit_run(&mut self, entry: &LeaderboardEntry) -> Result<(), StoreError>;
    /// Best runs by score, at most `MAX_LEADERBOARD_LIMIT`. Equal scores keep
    /// submission order.
    fn top_runs(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::encode_to_vec(value, bincode::config::standard())?)
}

fn decode<T: Decode<()>>(bytes: &[u8]) -> Result<T, StoreError> {
    let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

fn rank(mut runs: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    runs.sort_by(|a, b| b.score.cmp(&a.score));
    runs.truncate(limit.min(MAX_LEADERBOARD_LIMIT));
    runs
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Vec<u8>>,
    runs: Vec<LeaderboardEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under a player id, bypassing encoding.
    pub fn insert_raw(&mut self, player_id: &str, bytes: Vec<u8>) {
        self.records.insert(player_id.to_string(), bytes);
    }
}

impl ProgressStore for MemoryStore {
    fn load_progress(&self, player_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        self.records
            .get(player_id)
            .map(|bytes| decode(bytes))
            .transpose()
    }

    fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.records
            .insert(record.player_id.clone(), encode(record)?);
        Ok(())
    }

    fn submit_run(&mut self, entry: &LeaderboardEntry) -> Result<(), StoreError> {
        self.runs.push(entry.clone());
        Ok(())
    }

    fn top_runs(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        Ok(rank(self.runs.clone(), limit))
    }
}

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens or creates the database file and makes sure both tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        {
            txn.open_table(PROGRESS_TABLE)?;
            txn.open_table(RUNS_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }
}

impl ProgressStore for RedbStore {
    fn load_progress(&self, player_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROGRESS_TABLE)?;
        match table.get(player_id)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROGRESS_TABLE)?;
            table.insert(record.player_id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn submit_run(&mut self, entry: &LeaderboardEntry) -> Result<(), StoreError> {
        let bytes = encode(entry)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RUNS_TABLE)?;
            let next = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            table.insert(next, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn top_runs(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RUNS_TABLE)?;
        let mut runs = Vec::new();
        for row in table.iter()? {
            let (_, bytes) = row?;
            runs.push(decode(bytes.value())?);
        }
        Ok(rank(runs, limit))
    }
}
