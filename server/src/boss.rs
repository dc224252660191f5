//! Two-phase boss encounter.

use serde::Serialize;

pub const BOSS_SIZE: [f32; 2] = [200.0, 100.0];
pub const BOSS_MAX_HEALTH: i32 = 200;
pub const BOSS_POINTS: u32 = 1000;
const ENTRY_Y: f32 = -100.0;
const PATROL_Y: f32 = 150.0;
const DESCENT_SPEED: f32 = 1.0;
const PATROL_SPEED: f32 = 2.0;
const ENRAGED_SPEED_FACTOR: f32 = 1.5;

const SPREAD_INTERVAL: u32 = 60;
const MINION_INTERVAL: u32 = 300;
const ENRAGED_SPREAD_INTERVAL: u32 = 42;
const LASER_INTERVAL: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BossPhase {
    One,
    Two,
}

/// Attack the driver should materialize this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossAction {
    SpreadShot { count: u32, arc_degrees: f32 },
    SpawnMinions { count: u32 },
    FireLaser { x: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boss {
    pub position: [f32; 2],
    pub health: i32,
    pub max_health: i32,
    pub phase: BossPhase,
    direction: f32,
    spread_timer: u32,
    minion_timer: u32,
    laser_timer: u32,
}

impl Boss {
    pub fn new(width: f32) -> Self {
        Self {
            position: [width / 2.0, ENTRY_Y],
            health: BOSS_MAX_HEALTH,
            max_health: BOSS_MAX_HEALTH,
            phase: BossPhase::One,
            direction: 1.0,
            spread_timer: SPREAD_INTERVAL,
            minion_timer: MINION_INTERVAL,
            laser_timer: LASER_INTERVAL,
        }
    }

    pub fn size(&self) -> [f32; 2] {
        BOSS_SIZE
    }

    pub fn has_entered(&self) -> bool {
        self.position[1] >= PATROL_Y
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    pub fn bottom(&self) -> f32 {
        self.position[1] + BOSS_SIZE[1] / 2.0
    }

    fn patrol_speed(&self) -> f32 {
        match self.phase {
            BossPhase::One => PATROL_SPEED,
            BossPhase::Two => PATROL_SPEED * ENRAGED_SPEED_FACTOR,
        }
    }

    /// Moves the boss one tick and returns the attacks that came off cooldown.
    /// Nothing fires until the entry descent is over.
    pub fn advance(&mut self, player_x: f32, width: f32) -> Vec<BossAction> {
        let mut actions = Vec::new();

        if !self.has_entered() {
            self.position[1] = (self.position[1] + DESCENT_SPEED).min(PATROL_Y);
            return actions;
        }

        let half_w = BOSS_SIZE[0] / 2.0;
        self.position[0] += self.direction * self.patrol_speed();
        if self.position[0] <= half_w {
            self.position[0] = half_w;
            self.direction = 1.0;
        } else if self.position[0] >= width - half_w {
            self.position[0] = width - half_w;
            self.direction = -1.0;
        }

        self.spread_timer = self.spread_timer.saturating_sub(1);
        match self.phase {
            BossPhase::One => {
                if self.spread_timer == 0 {
                    self.spread_timer = SPREAD_INTERVAL;
                    actions.push(BossAction::SpreadShot {
                        count: 5,
                        arc_degrees: 60.0,
                    });
                }
                self.minion_timer = self.minion_timer.saturating_sub(1);
                if self.minion_timer == 0 {
                    self.minion_timer = MINION_INTERVAL;
                    actions.push(BossAction::SpawnMinions { count: 2 });
                }
            }
            BossPhase::Two => {
                if self.spread_timer == 0 {
                    self.spread_timer = ENRAGED_SPREAD_INTERVAL;
                    actions.push(BossAction::SpreadShot {
                        count: 3,
                        arc_degrees: 40.0,
                    });
                }
                self.laser_timer = self.laser_timer.saturating_sub(1);
                if self.laser_timer == 0 {
                    self.laser_timer = LASER_INTERVAL;
                    actions.push(BossAction::FireLaser { x: player_x });
                }
            }
        }

        actions
    }

    /// Applies damage and returns true on the tick the boss enters phase 2.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount).max(0);
        if self.phase == BossPhase::One && self.health <= self.max_health / 2 {
            self.phase = BossPhase::Two;
            self.spread_timer = ENRAGED_SPREAD_INTERVAL;
            self.laser_timer = LASER_INTERVAL;
            return true;
        }
        false
    }

    /// Healing never reverts the phase.
    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }
}

/// Velocities for `count` shots fanned evenly over `arc_degrees`, centered
/// straight down.
pub fn spread_velocities(count: u32, arc_degrees: f32, speed: f32) -> Vec<[f32; 2]> {
    if count <= 1 {
        return vec![[0.0, speed]];
    }
    let arc = arc_degrees.to_radians();
    let step = arc / (count - 1) as f32;
    (0..count)
        .map(|i| {
            let angle = -arc / 2.0 + step * i as f32;
            [angle.sin() * speed, angle.cos() * speed]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entered_boss() -> Boss {
        let mut boss = Boss::new(1280.0);
        while !boss.has_entered() {
            boss.advance(0.0, 1280.0);
        }
        boss
    }

    #[test]
    fn descends_before_attacking() {
        let mut boss = Boss::new(1280.0);
        for _ in 0..249 {
            assert!(boss.advance(0.0, 1280.0).is_empty());
        }
        assert!(!boss.has_entered());
        boss.advance(0.0, 1280.0);
        assert!(boss.has_entered());
    }

    #[test]
    fn phase_one_fires_spread_and_minions() {
        let mut boss = entered_boss();
        let mut spreads = 0;
        let mut minions = 0;
        for _ in 0..300 {
            for action in boss.advance(0.0, 1280.0) {
                match action {
                    BossAction::SpreadShot { count, .. } => {
                        assert_eq!(count, 5);
                        spreads += 1;
                    }
                    BossAction::SpawnMinions { count } => {
                        assert_eq!(count, 2);
                        minions += 1;
                    }
                    BossAction::FireLaser { .. } => panic!("no lasers in phase one"),
                }
            }
        }
        assert_eq!(spreads, 5);
        assert_eq!(minions, 1);
    }

    #[test]
    fn phase_two_is_irreversible() {
        let mut boss = entered_boss();
        assert!(!boss.take_damage(99));
        assert!(boss.take_damage(1));
        assert_eq!(boss.phase, BossPhase::Two);
        boss.heal(150);
        assert_eq!(boss.health, boss.max_health);
        assert_eq!(boss.phase, BossPhase::Two);
        assert!(!boss.take_damage(10));
    }

    #[test]
    fn phase_two_aims_lasers_at_player() {
        let mut boss = entered_boss();
        boss.take_damage(150);
        let lasers: Vec<_> = (0..LASER_INTERVAL)
            .flat_map(|_| boss.advance(321.0, 1280.0))
            .filter(|a| matches!(a, BossAction::FireLaser { .. }))
            .collect();
        assert_eq!(lasers, vec![BossAction::FireLaser { x: 321.0 }]);
    }

    #[test]
    fn patrol_bounces_off_edges() {
        let mut boss = entered_boss();
        for _ in 0..2000 {
            boss.advance(0.0, 1280.0);
            assert!(boss.position[0] >= 100.0 && boss.position[0] <= 1180.0);
        }
    }

    #[test]
    fn spread_is_symmetric() {
        let shots = spread_velocities(5, 60.0, 4.0);
        assert_eq!(shots.len(), 5);
        assert!(shots[2][0].abs() < 1e-6);
        assert!((shots[0][0] + shots[4][0]).abs() < 1e-5);
    }
}
