//! Wave progression and enemy composition.

use crate::components::EnemyKind;
use crate::config::SimulationConfig;
use rand::Rng;
use serde::Serialize;

/// Wave from which each variant may replace a scout, and the chance of the
/// roll succeeding. Rolls run in order; the last success wins.
const UNLOCKS: [(EnemyKind, u32, f64); 9] = [
    (EnemyKind::Brute, 3, 0.3),
    (EnemyKind::Bomber, 4, 0.4),
    (EnemyKind::Sniper, 5, 0.2),
    (EnemyKind::Kamikaze, 6, 0.2),
    (EnemyKind::Tank, 7, 0.1),
    (EnemyKind::Splitter, 8, 0.15),
    (EnemyKind::Healer, 9, 0.1),
    (EnemyKind::Teleporter, 11, 0.15),
    (EnemyKind::Minelayer, 12, 0.1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WavePhase {
    /// Regular wave in progress.
    Active,
    Cooldown { remaining: u32 },
    /// Boss wave announced; music is off until the boss shows up.
    BossIncoming { remaining: u32 },
    BossFight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveCommand {
    SpawnWave { wave: u32, kinds: Vec<EnemyKind> },
    AnnounceBoss { wave: u32 },
    SpawnBoss { wave: u32 },
    Cleared { wave: u32 },
}

#[derive(Debug, Clone)]
pub struct WaveDirector {
    wave: u32,
    phase: WavePhase,
    capacity: u32,
    boss_interval: u32,
    cooldown_ticks: u32,
    boss_delay_ticks: u32,
    min_enemies: u32,
}

impl WaveDirector {
    /// The first wave starts on the first update.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            wave: 1,
            phase: WavePhase::Cooldown { remaining: 0 },
            capacity: config.enemy_capacity,
            boss_interval: config.boss_interval.max(1),
            cooldown_ticks: config.wave_cooldown_ticks,
            boss_delay_ticks: config.boss_spawn_delay_ticks,
            min_enemies: config.min_wave_enemies,
        }
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn is_boss_wave(&self, wave: u32) -> bool {
        wave % self.boss_interval == 0
    }

    pub fn enemy_count(&self, wave: u32) -> u32 {
        (5 + 2 * wave).min(self.capacity)
    }

    /// Advances the state machine once per tick.
    pub fn update<R: Rng>(
        &mut self,
        hostiles_alive: usize,
        boss_alive: bool,
        rng: &mut R,
    ) -> Option<WaveCommand> {
        match self.phase {
            WavePhase::Active => {
                if hostiles_alive > 0 {
                    return None;
                }
                Some(self.clear())
            }
            WavePhase::BossFight => {
                if boss_alive || hostiles_alive > 0 {
                    return None;
                }
                Some(self.clear())
            }
            // Timers hold while anything from the previous wave is still alive.
            WavePhase::Cooldown { .. } | WavePhase::BossIncoming { .. } if hostiles_alive > 0 => {
                None
            }
            WavePhase::Cooldown { remaining } if remaining > 0 => {
                self.phase = WavePhase::Cooldown {
                    remaining: remaining - 1,
                };
                None
            }
            WavePhase::Cooldown { .. } => {
                if self.is_boss_wave(self.wave) {
                    self.phase = WavePhase::BossIncoming {
                        remaining: self.boss_delay_ticks,
                    };
                    return Some(WaveCommand::AnnounceBoss { wave: self.wave });
                }
                self.phase = WavePhase::Active;
                Some(WaveCommand::SpawnWave {
                    wave: self.wave,
                    kinds: self.compose(rng),
                })
            }
            WavePhase::BossIncoming { remaining } if remaining > 0 => {
                self.phase = WavePhase::BossIncoming {
                    remaining: remaining - 1,
                };
                None
            }
            WavePhase::BossIncoming { .. } => {
                self.phase = WavePhase::BossFight;
                Some(WaveCommand::SpawnBoss { wave: self.wave })
            }
        }
    }

    fn clear(&mut self) -> WaveCommand {
        let cleared = self.wave;
        self.wave += 1;
        self.phase = WavePhase::Cooldown {
            remaining: self.cooldown_ticks,
        };
        WaveCommand::Cleared { wave: cleared }
    }

    /// Enemy roster for a regular wave. Never empty.
    pub fn compose<R: Rng>(&self, rng: &mut R) -> Vec<EnemyKind> {
        let count = self.enemy_count(self.wave);
        if count == 0 {
            return vec![EnemyKind::Scout; self.min_enemies.max(1) as usize];
        }
        (0..count).map(|_| choose_kind(self.wave, rng)).collect()
    }
}

pub fn choose_kind<R: Rng>(wave: u32, rng: &mut R) -> EnemyKind {
    let mut kind = EnemyKind::Scout;
    for (candidate, unlocked_at, chance) in UNLOCKS {
        if wave >= unlocked_at && rng.random_bool(chance) {
            kind = candidate;
        }
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn director() -> WaveDirector {
        WaveDirector::new(&SimulationConfig::default())
    }

    #[test]
    fn first_update_spawns_wave_one() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut waves = director();
        match waves.update(0, false, &mut rng) {
            Some(WaveCommand::SpawnWave { wave, kinds }) => {
                assert_eq!(wave, 1);
                assert_eq!(kinds, vec![EnemyKind::Scout; 7]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(waves.phase(), WavePhase::Active);
    }

    #[test]
    fn enemy_count_is_capped() {
        let waves = director();
        assert_eq!(waves.enemy_count(1), 7);
        assert_eq!(waves.enemy_count(5), 15);
        assert_eq!(waves.enemy_count(40), 15);
        let constrained = WaveDirector::new(&SimulationConfig::constrained());
        assert_eq!(constrained.enemy_count(9), 10);
    }

    #[test]
    fn empty_capacity_falls_back_to_scouts() {
        let config = SimulationConfig {
            enemy_capacity: 0,
            ..SimulationConfig::default()
        };
        let waves = WaveDirector::new(&config);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(waves.compose(&mut rng), vec![EnemyKind::Scout; 5]);
    }

    #[test]
    fn early_waves_only_field_scouts() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            assert_eq!(choose_kind(2, &mut rng), EnemyKind::Scout);
        }
    }

    #[test]
    fn locked_kinds_never_appear() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let kind = choose_kind(5, &mut rng);
            assert!(matches!(
                kind,
                EnemyKind::Scout | EnemyKind::Brute | EnemyKind::Bomber | EnemyKind::Sniper
            ));
        }
    }

    #[test]
    fn waves_are_monotonic_and_boss_only_on_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut waves = director();
        let mut last_wave = waves.wave();

        for _ in 0..20_000 {
            let command = waves.update(0, false, &mut rng);
            assert!(waves.wave() >= last_wave);
            last_wave = waves.wave();
            match command {
                Some(WaveCommand::AnnounceBoss { wave }) | Some(WaveCommand::SpawnBoss { wave }) => {
                    assert_eq!(wave % 10, 0)
                }
                Some(WaveCommand::SpawnWave { wave, .. }) => assert_ne!(wave % 10, 0),
                _ => {}
            }
        }
        assert!(last_wave > 20);
    }

    #[test]
    fn boss_wave_waits_for_the_delay() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = SimulationConfig {
            boss_interval: 1,
            boss_spawn_delay_ticks: 3,
            ..SimulationConfig::default()
        };
        let mut waves = WaveDirector::new(&config);
        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::AnnounceBoss { wave: 1 })
        );
        for _ in 0..3 {
            assert_eq!(waves.update(0, false, &mut rng), None);
        }
        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::SpawnBoss { wave: 1 })
        );
        assert_eq!(waves.update(0, true, &mut rng), None);
        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::Cleared { wave: 1 })
        );
        assert_eq!(waves.wave(), 2);
    }

    #[test]
    fn surviving_minions_hold_the_next_wave() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = SimulationConfig {
            boss_interval: 1,
            boss_spawn_delay_ticks: 0,
            wave_cooldown_ticks: 2,
            ..SimulationConfig::default()
        };
        let mut waves = WaveDirector::new(&config);
        waves.update(0, false, &mut rng);
        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::SpawnBoss { wave: 1 })
        );

        // Boss down, three minions left.
        for _ in 0..10 {
            assert_eq!(waves.update(3, false, &mut rng), None);
        }
        assert_eq!(waves.phase(), WavePhase::BossFight);
        assert_eq!(waves.wave(), 1);

        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::Cleared { wave: 1 })
        );
        assert_eq!(waves.update(0, false, &mut rng), None);
        // A straggler during the cooldown freezes it.
        for _ in 0..5 {
            assert_eq!(waves.update(1, false, &mut rng), None);
        }
        assert_eq!(waves.phase(), WavePhase::Cooldown { remaining: 1 });
        assert_eq!(waves.update(0, false, &mut rng), None);
        assert_eq!(
            waves.update(0, false, &mut rng),
            Some(WaveCommand::AnnounceBoss { wave: 2 })
        );
    }
}
