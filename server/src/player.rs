//! The player's ship: movement, fire control, damage and timed buffs.

use crate::components::{InputState, PLAYER_SIZE, PowerUpEffect, PowerUpKind, ShipKind};
use serde::Serialize;

pub const BUFF_TICKS: u32 = 600;
pub const HIT_INVINCIBILITY_TICKS: u32 = 90;
pub const RESPAWN_INVINCIBILITY_TICKS: u32 = 180;
const BASE_FIRE_COOLDOWN: u32 = 12;
const MIN_FIRE_COOLDOWN: u32 = 2;
const RAPID_FIRE_COOLDOWN: u32 = 5;
const SPEED_BOOST_FACTOR: f32 = 1.5;
const SPAWN_OFFSET_FROM_BOTTOM: f32 = 80.0;

/// Upgrades and boosters carried into a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loadout {
    pub ship: ShipKind,
    pub speed_level: u32,
    pub fire_rate_level: u32,
    pub extra_lives: u32,
    pub max_health: u32,
    pub shield: bool,
    pub rapid_fire: bool,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            ship: ShipKind::Ranger,
            speed_level: 0,
            fire_rate_level: 0,
            extra_lives: 0,
            max_health: 3,
            shield: false,
            rapid_fire: false,
        }
    }
}

/// Result of a single `take_damage` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageOutcome {
    /// Still invincible from an earlier hit.
    Ignored,
    ShieldAbsorbed,
    Hit,
    /// Health ran out; a life was consumed and health refilled.
    LifeLost,
    /// Last life gone. The run is over.
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerShip {
    pub position: [f32; 2],
    pub ship: ShipKind,
    base_speed: f32,
    base_cooldown: u32,
    pub fire_timer: u32,
    pub lives: u32,
    pub health: u32,
    pub max_health: u32,
    pub invincible_ticks: u32,
    pub weapon_boost_ticks: u32,
    pub speed_boost_ticks: u32,
    pub shield: bool,
}

impl PlayerShip {
    pub fn spawn(loadout: &Loadout, width: f32, height: f32) -> Self {
        let base_cooldown = if loadout.rapid_fire {
            RAPID_FIRE_COOLDOWN
        } else {
            BASE_FIRE_COOLDOWN
                .saturating_sub(loadout.fire_rate_level)
                .max(MIN_FIRE_COOLDOWN)
        };
        let max_health = loadout.max_health.max(1);

        Self {
            position: [width / 2.0, height - SPAWN_OFFSET_FROM_BOTTOM],
            ship: loadout.ship,
            base_speed: loadout.ship.base_speed() + loadout.speed_level as f32,
            base_cooldown,
            fire_timer: 0,
            lives: 3 + loadout.extra_lives,
            health: max_health,
            max_health,
            invincible_ticks: 0,
            weapon_boost_ticks: 0,
            speed_boost_ticks: 0,
            shield: loadout.shield,
        }
    }

    pub fn size(&self) -> [f32; 2] {
        PLAYER_SIZE
    }

    pub fn speed(&self) -> f32 {
        if self.speed_boost_ticks > 0 {
            self.base_speed * SPEED_BOOST_FACTOR
        } else {
            self.base_speed
        }
    }

    pub fn fire_cooldown(&self) -> u32 {
        if self.weapon_boost_ticks > 0 {
            (self.base_cooldown / 2).max(1)
        } else {
            self.base_cooldown
        }
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ticks > 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.lives == 0
    }

    /// Moves the ship by the input direction, keeping it fully on the canvas.
    pub fn steer(&mut self, input: &InputState, width: f32, height: f32) {
        let speed = self.speed();
        let [x, y] = &mut self.position;
        if input.left {
            *x -= speed;
        }
        if input.right {
            *x += speed;
        }
        if input.up {
            *y -= speed;
        }
        if input.down {
            *y += speed;
        }

        let half_w = PLAYER_SIZE[0] / 2.0;
        let half_h = PLAYER_SIZE[1] / 2.0;
        *x = x.clamp(half_w, (width - half_w).max(half_w));
        *y = y.clamp(half_h, (height - half_h).max(half_h));
    }

    /// Returns true when a shot leaves the barrel; the caller spawns it.
    pub fn try_shoot(&mut self) -> bool {
        if self.fire_timer > 0 {
            return false;
        }
        self.fire_timer = self.fire_cooldown();
        true
    }

    pub fn muzzle(&self) -> [f32; 2] {
        [self.position[0], self.position[1] - PLAYER_SIZE[1] / 2.0]
    }

    /// Counts every timer down by one tick. Buff expiry restores the base
    /// speed and cooldown on its own since both are derived on demand.
    pub fn tick_timers(&mut self) {
        self.fire_timer = self.fire_timer.saturating_sub(1);
        self.invincible_ticks = self.invincible_ticks.saturating_sub(1);
        self.weapon_boost_ticks = self.weapon_boost_ticks.saturating_sub(1);
        self.speed_boost_ticks = self.speed_boost_ticks.saturating_sub(1);
    }

    pub fn take_damage(&mut self) -> DamageOutcome {
        if self.is_destroyed() || self.is_invincible() {
            return DamageOutcome::Ignored;
        }
        if self.shield {
            self.shield = false;
            self.invincible_ticks = HIT_INVINCIBILITY_TICKS;
            return DamageOutcome::ShieldAbsorbed;
        }

        self.health = self.health.saturating_sub(1);
        self.invincible_ticks = HIT_INVINCIBILITY_TICKS;
        if self.health > 0 {
            return DamageOutcome::Hit;
        }

        self.lives -= 1;
        if self.lives == 0 {
            return DamageOutcome::Destroyed;
        }
        self.health = self.max_health;
        self.invincible_ticks = RESPAWN_INVINCIBILITY_TICKS;
        DamageOutcome::LifeLost
    }

    /// Applies a pickup. Buffs reset their timer instead of stacking.
    pub fn apply_powerup(&mut self, kind: PowerUpKind) -> PowerUpEffect {
        let effect = kind.effect();
        match effect {
            PowerUpEffect::Heal => {
                let amount = (self.max_health / 4).max(1);
                self.health = (self.health + amount).min(self.max_health);
            }
            PowerUpEffect::WeaponBoost => self.weapon_boost_ticks = BUFF_TICKS,
            PowerUpEffect::SpeedBoost => self.speed_boost_ticks = BUFF_TICKS,
        }
        effect
    }
}
