//! Lifecycle of a single-player run: load progress, spend a booster, tick
//! the simulation, then bank the results.

use crate::components::InputState;
use crate::config::SimulationConfig;
use crate::progress::{Booster, LeaderboardEntry, ProgressRecord, ProgressStore};
use crate::simulation::{GameSimulation, GameSnapshot, SimulationStepResult};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Ended,
}

/// What a finished run added to the player's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub score: u64,
    pub credits_earned: u64,
    pub kills: u32,
    pub wave: u32,
    pub levels_gained: u32,
    pub submitted: bool,
}

pub struct GameSession<S: ProgressStore> {
    player_id: String,
    config: SimulationConfig,
    store: S,
    record: ProgressRecord,
    simulation: Option<GameSimulation>,
    phase: RunPhase,
    last_summary: Option<RunSummary>,
}

impl<S: ProgressStore> GameSession<S> {
    pub fn new(player_id: impl Into<String>, config: SimulationConfig, store: S) -> Self {
        let player_id = player_id.into();
        let record = ProgressRecord::new(player_id.clone());
        Self {
            player_id,
            config,
            store,
            record,
            simulation: None,
            phase: RunPhase::Idle,
            last_summary: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.player_id.starts_with("guest_")
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn simulation(&self) -> Option<&GameSimulation> {
        self.simulation.as_ref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut GameSimulation> {
        self.simulation.as_mut()
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    /// Starts a fresh run. Returns false while a run is still in progress.
    /// A booster that is out of stock is skipped rather than failing the run.
    pub fn start_run(&mut self, booster: Option<Booster>) -> bool {
        if self.phase == RunPhase::Running {
            return false;
        }

        self.record = self.load_record();
        let booster = booster.filter(|b| {
            let available = self.record.consume_booster(*b);
            if !available {
                warn!("{} has no {:?} booster left", self.player_id, b);
            }
            available
        });

        let mut simulation = GameSimulation::new(self.config.clone(), &self.record.loadout(booster));
        if booster == Some(Booster::DoubleCredits) {
            simulation.set_credit_multiplier(2);
        }
        self.simulation = Some(simulation);
        self.phase = RunPhase::Running;
        self.last_summary = None;
        info!("{} started a run with booster {:?}", self.player_id, booster);
        true
    }

    fn load_record(&self) -> ProgressRecord {
        match self.store.load_progress(&self.player_id) {
            Ok(Some(record)) => record,
            Ok(None) => ProgressRecord::new(self.player_id.clone()),
            Err(e) => {
                warn!(
                    "Failed to load progress for {}, starting fresh: {}",
                    self.player_id, e
                );
                ProgressRecord::new(self.player_id.clone())
            }
        }
    }

    /// Advances the running simulation one tick. Banks the run on game over.
    pub fn tick(&mut self, input: &InputState) -> Option<SimulationStepResult> {
        if self.phase != RunPhase::Running {
            return None;
        }
        let simulation = self.simulation.as_mut()?;
        let result = simulation.step(input);
        if result.game_over {
            self.end_run();
        }
        Some(result)
    }

    pub fn snapshot(&self) -> Option<GameSnapshot> {
        self.simulation.as_ref().map(GameSimulation::snapshot)
    }

    /// Halts the run immediately. Nothing from it is banked.
    pub fn quit(&mut self) {
        if self.phase == RunPhase::Running {
            info!("{} quit the run", self.player_id);
        }
        self.simulation = None;
        self.phase = RunPhase::Idle;
    }

    fn end_run(&mut self) {
        let Some(simulation) = self.simulation.as_ref() else {
            return;
        };
        let stats = simulation.stats().clone();
        let wave = simulation.wave();

        self.record.credits += stats.credits;
        let levels_gained = self.record.add_xp(stats.score);
        self.record.stats.total_kills += stats.kills as u64;
        self.record.stats.best_wave = self.record.stats.best_wave.max(wave);
        self.record.stats.high_score = self.record.stats.high_score.max(stats.score);
        self.record.stats.games_played += 1;

        let mut submitted = false;
        if !self.is_guest() {
            if let Err(e) = self.store.save_progress(&self.record) {
                warn!("Failed to save progress for {}: {}", self.player_id, e);
            }
            let entry = LeaderboardEntry {
                player_name: self.player_id.clone(),
                score: stats.score,
                kills: self.record.stats.total_kills,
                wave,
            };
            match self.store.submit_run(&entry) {
                Ok(()) => submitted = true,
                Err(e) => warn!("Failed to submit run for {}: {}", self.player_id, e),
            }
        }

        info!(
            "{} finished wave {} with score {} (+{} credits)",
            self.player_id, wave, stats.score, stats.credits
        );
        self.last_summary = Some(RunSummary {
            score: stats.score,
            credits_earned: stats.credits,
            kills: stats.kills,
            wave,
            levels_gained,
            submitted,
        });
        self.phase = RunPhase::Ended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Owner;
    use crate::error::StoreError;
    use crate::progress::MemoryStore;

    fn config() -> SimulationConfig {
        SimulationConfig {
            star_count: 0,
            ..SimulationConfig::default()
        }
    }

    fn lose_run<S: ProgressStore>(session: &mut GameSession<S>) {
        for _ in 0..1000 {
            let Some(sim) = session.simulation_mut() else {
                return;
            };
            sim.player.invincible_ticks = 0;
            let at = sim.player.position;
            sim.spawn_projectile(Owner::Enemy, at, [0.0, 0.0]);
            if session.tick(&InputState::default()).is_none() {
                return;
            }
            if session.phase() == RunPhase::Ended {
                return;
            }
        }
        panic!("run never ended");
    }

    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        fn load_progress(&self, _: &str) -> Result<Option<ProgressRecord>, StoreError> {
            Err(StoreError::Database("disk on fire".to_string()))
        }
        fn save_progress(&mut self, _: &ProgressRecord) -> Result<(), StoreError> {
            Err(StoreError::Database("disk on fire".to_string()))
        }
        fn submit_run(&mut self, _: &LeaderboardEntry) -> Result<(), StoreError> {
            Err(StoreError::Database("disk on fire".to_string()))
        }
        fn top_runs(&self, _: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn cannot_start_twice() {
        let mut session = GameSession::new("pilot", config(), MemoryStore::new());
        assert!(session.start_run(None));
        assert!(!session.start_run(None));
        session.quit();
        assert!(session.start_run(None));
    }

    #[test]
    fn shield_booster_is_consumed_and_applied() {
        let mut session = GameSession::new("pilot", config(), MemoryStore::new());
        session.start_run(Some(Booster::Shield));
        assert_eq!(session.record().boosters.shield, 0);
        assert!(session.simulation().map(|s| s.player.shield).unwrap_or(false));
    }

    #[test]
    fn game_over_banks_progress_and_submits() {
        let mut session = GameSession::new("pilot", config(), MemoryStore::new());
        session.start_run(None);
        lose_run(&mut session);

        assert_eq!(session.phase(), RunPhase::Ended);
        let summary = session.last_summary().cloned().unwrap();
        assert!(summary.submitted);
        let saved = session.store().load_progress("pilot").unwrap().unwrap();
        assert_eq!(saved.stats.games_played, 1);
        assert_eq!(saved.stats.best_wave, 1);
        assert_eq!(session.store().top_runs(10).unwrap().len(), 1);
        assert!(session.tick(&InputState::default()).is_none());
    }

    #[test]
    fn guests_are_never_persisted() {
        let mut session = GameSession::new("guest_1234", config(), MemoryStore::new());
        session.start_run(None);
        lose_run(&mut session);
        assert!(!session.last_summary().unwrap().submitted);
        assert_eq!(session.store().load_progress("guest_1234"), Ok(None));
        assert!(session.store().top_runs(10).unwrap().is_empty());
    }

    #[test]
    fn quit_discards_the_run() {
        let mut session = GameSession::new("pilot", config(), MemoryStore::new());
        session.start_run(None);
        session.tick(&InputState::default());
        session.quit();
        assert_eq!(session.phase(), RunPhase::Idle);
        assert!(session.snapshot().is_none());
        assert_eq!(session.store().load_progress("pilot"), Ok(None));
    }

    #[test]
    fn storage_failures_fall_back_to_defaults() {
        let mut session = GameSession::new("pilot", config(), BrokenStore);
        assert!(session.start_run(None));
        assert_eq!(session.record().level, 1);
        lose_run(&mut session);
        assert_eq!(session.phase(), RunPhase::Ended);
        assert!(!session.last_summary().unwrap().submitted);
    }
}
