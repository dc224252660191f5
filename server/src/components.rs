//! ECS components and the static entity catalogs.
//!
//! Every on-screen collection (enemies, projectiles, powerups, particles,
//! lasers, stars) lives in the simulation's `hecs::World`. Each category
//! has its own marker component so queries never mix them. Positions are
//! entity centers; the y axis grows downward.

use serde::{Deserialize, Serialize};

pub const PLAYER_SIZE: [f32; 2] = [50.0, 50.0];
pub const PLAYER_SHOT_SIZE: [f32; 2] = [5.0, 15.0];
pub const PLAYER_SHOT_SPEED: f32 = 7.0;
pub const ENEMY_SHOT_SIZE: [f32; 2] = [5.0, 10.0];
pub const ENEMY_SHOT_SPEED: f32 = 4.9;
pub const BOSS_SHOT_SPEED: f32 = 4.0;
pub const MINE_SPEED: f32 = 1.0;
pub const MINE_SIZE: [f32; 2] = [12.0, 12.0];
pub const POWERUP_SIZE: [f32; 2] = [30.0, 30.0];
pub const POWERUP_DRIFT: f32 = 1.5;
pub const LASER_WIDTH: f32 = 15.0;
pub const LASER_WARNING_TICKS: u32 = 60;
pub const LASER_TOTAL_TICKS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 2],
}

/// Per-tick displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: [f32; 2],
}

/// Width and height of the axis-aligned collision box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub size: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub owner: Owner,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Scout,
    Brute,
    Bomber,
    Sniper,
    Kamikaze,
    Tank,
    Splitter,
    Healer,
    Teleporter,
    Minelayer,
}

/// Special behavior run by an enemy every tick on top of its descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    None,
    FireDown,
    FireAimed,
    Steer,
    Split,
    Heal,
    Teleport,
    LayMines,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyConfig {
    pub speed: f32,
    pub health: i32,
    pub points: u32,
    pub size: [f32; 2],
    /// Ticks between shots for firing variants.
    pub fire_interval: Option<u32>,
    pub behavior: Behavior,
}

/// Ticks between healer pulses and teleporter jumps.
pub const ABILITY_INTERVAL: u32 = 120;
pub const HEAL_RADIUS: f32 = 120.0;

impl EnemyKind {
    pub const ALL: [EnemyKind; 10] = [
        EnemyKind::Scout,
        EnemyKind::Brute,
        EnemyKind::Bomber,
        EnemyKind::Sniper,
        EnemyKind::Kamikaze,
        EnemyKind::Tank,
        EnemyKind::Splitter,
        EnemyKind::Healer,
        EnemyKind::Teleporter,
        EnemyKind::Minelayer,
    ];

    pub const fn config(self) -> EnemyConfig {
        match self {
            EnemyKind::Scout => EnemyConfig {
                speed: 3.0,
                health: 1,
                points: 10,
                size: [32.0, 32.0],
                fire_interval: None,
                behavior: Behavior::None,
            },
            EnemyKind::Brute => EnemyConfig {
                speed: 1.0,
                health: 5,
                points: 50,
                size: [48.0, 48.0],
                fire_interval: None,
                behavior: Behavior::None,
            },
            EnemyKind::Bomber => EnemyConfig {
                speed: 2.0,
                health: 3,
                points: 30,
                size: [40.0, 40.0],
                fire_interval: Some(30),
                behavior: Behavior::FireDown,
            },
            EnemyKind::Sniper => EnemyConfig {
                speed: 2.0,
                health: 2,
                points: 40,
                size: [36.0, 36.0],
                fire_interval: Some(60),
                behavior: Behavior::FireAimed,
            },
            EnemyKind::Kamikaze => EnemyConfig {
                speed: 5.0,
                health: 1,
                points: 25,
                size: [28.0, 28.0],
                fire_interval: None,
                behavior: Behavior::Steer,
            },
            EnemyKind::Tank => EnemyConfig {
                speed: 0.5,
                health: 15,
                points: 100,
                size: [56.0, 40.0],
                fire_interval: None,
                behavior: Behavior::None,
            },
            EnemyKind::Splitter => EnemyConfig {
                speed: 2.0,
                health: 3,
                points: 60,
                size: [40.0, 40.0],
                fire_interval: None,
                behavior: Behavior::Split,
            },
            EnemyKind::Healer => EnemyConfig {
                speed: 1.5,
                health: 4,
                points: 70,
                size: [44.0, 44.0],
                fire_interval: None,
                behavior: Behavior::Heal,
            },
            EnemyKind::Teleporter => EnemyConfig {
                speed: 4.0,
                health: 2,
                points: 50,
                size: [36.0, 36.0],
                fire_interval: None,
                behavior: Behavior::Teleport,
            },
            EnemyKind::Minelayer => EnemyConfig {
                speed: 1.0,
                health: 4,
                points: 80,
                size: [44.0, 44.0],
                fire_interval: Some(90),
                behavior: Behavior::LayMines,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub health: i32,
    pub max_health: i32,
    pub fire_timer: u32,
    pub ability_timer: u32,
}

impl Enemy {
    pub fn new(kind: EnemyKind, fire_timer: u32) -> Self {
        let config = kind.config();
        Self {
            kind,
            health: config.health,
            max_health: config.health,
            fire_timer,
            ability_timer: ABILITY_INTERVAL,
        }
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Health,
    WeaponBoost,
    SpeedBoost,
    TripleShot,
    SpreadShot,
    LaserBeam,
    HomingMissiles,
    TimeSlowdown,
    Invincibility,
    CreditMultiplier,
    MegaBomb,
    MagneticField,
    Regeneration,
    ReflectShield,
    GhostMode,
}

/// What picking up a powerup actually does to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpEffect {
    Heal,
    WeaponBoost,
    SpeedBoost,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 15] = [
        PowerUpKind::Health,
        PowerUpKind::WeaponBoost,
        PowerUpKind::SpeedBoost,
        PowerUpKind::TripleShot,
        PowerUpKind::SpreadShot,
        PowerUpKind::LaserBeam,
        PowerUpKind::HomingMissiles,
        PowerUpKind::TimeSlowdown,
        PowerUpKind::Invincibility,
        PowerUpKind::CreditMultiplier,
        PowerUpKind::MegaBomb,
        PowerUpKind::MagneticField,
        PowerUpKind::Regeneration,
        PowerUpKind::ReflectShield,
        PowerUpKind::GhostMode,
    ];

    pub const fn effect(self) -> PowerUpEffect {
        match self {
            PowerUpKind::Health
            | PowerUpKind::Regeneration
            | PowerUpKind::Invincibility
            | PowerUpKind::ReflectShield => PowerUpEffect::Heal,
            PowerUpKind::WeaponBoost
            | PowerUpKind::TripleShot
            | PowerUpKind::SpreadShot
            | PowerUpKind::LaserBeam
            | PowerUpKind::HomingMissiles
            | PowerUpKind::MegaBomb => PowerUpEffect::WeaponBoost,
            PowerUpKind::SpeedBoost
            | PowerUpKind::TimeSlowdown
            | PowerUpKind::CreditMultiplier
            | PowerUpKind::MagneticField
            | PowerUpKind::GhostMode => PowerUpEffect::SpeedBoost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    pub fn opacity(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

/// Boss beam. `origin_y` is the top of the beam; it always reaches the
/// bottom of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub origin_y: f32,
    pub age: u32,
}

impl Laser {
    pub fn is_active(&self) -> bool {
        self.age >= LASER_WARNING_TICKS && self.age < LASER_TOTAL_TICKS
    }

    pub fn is_spent(&self) -> bool {
        self.age >= LASER_TOTAL_TICKS
    }
}

/// Parallax background star, layer 1 (far) to 3 (near).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub layer: u8,
}

impl Star {
    pub fn speed(&self) -> f32 {
        self.layer as f32 * 0.5
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum ShipKind {
    #[default]
    Ranger,
    Interceptor,
    Bruiser,
}

impl ShipKind {
    pub const fn base_speed(self) -> f32 {
        match self {
            ShipKind::Ranger => 5.0,
            ShipKind::Interceptor => 7.0,
            ShipKind::Bruiser => 4.0,
        }
    }
}

/// Input snapshot sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub fire: bool,
}
