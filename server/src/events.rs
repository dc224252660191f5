//! Side effects produced during a tick. The simulation turns them into
//! score, credits, particles and drops; the presentation layer uses them
//! as sound and music cues.

use crate::components::{EnemyKind, PowerUpEffect, PowerUpKind};
use crate::player::DamageOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicCue {
    Background,
    Silence,
    Boss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameEvent {
    PlayerFired,
    EnemyDestroyed {
        kind: EnemyKind,
        position: [f32; 2],
        points: u32,
    },
    /// A kamikaze rammed the player. No score.
    EnemyCrashed { kind: EnemyKind, position: [f32; 2] },
    BossPhaseChanged,
    BossDefeated { position: [f32; 2], points: u32 },
    PlayerDamaged { outcome: DamageOutcome },
    PowerUpCollected {
        kind: PowerUpKind,
        effect: PowerUpEffect,
    },
    WaveStarted { wave: u32, enemies: u32 },
    WaveCleared { wave: u32 },
    BossIncoming { wave: u32 },
    BossSpawned { wave: u32 },
    Music { cue: MusicCue },
    GameOver,
}
