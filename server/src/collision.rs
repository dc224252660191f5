//! Axis-aligned overlap tests and the fixed-order collision pass.

use crate::boss::{BOSS_POINTS, Boss};
use crate::components::{
    Behavior, Enemy, Hitbox, LASER_WIDTH, Laser, Owner, PowerUp, Projectile, Transform,
};
use crate::events::FrameEvent;
use crate::player::{DamageOutcome, PlayerShip};
use hecs::{Entity, World};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: [f32; 2],
    pub size: [f32; 2],
}

impl Aabb {
    pub fn new(center: [f32; 2], size: [f32; 2]) -> Self {
        Self { center, size }
    }

    /// Strict overlap: boxes that only touch do not collide.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center[0] - other.center[0]).abs() < (self.size[0] + other.size[0]) / 2.0
            && (self.center[1] - other.center[1]).abs() < (self.size[1] + other.size[1]) / 2.0
    }
}

/// Hitbox of a laser beam spanning from its origin to the canvas bottom.
pub fn laser_box(x: f32, laser: &Laser, canvas_height: f32) -> Aabb {
    let height = (canvas_height - laser.origin_y).max(0.0);
    Aabb::new([x, laser.origin_y + height / 2.0], [LASER_WIDTH, height])
}

struct Candidate<T> {
    entity: Entity,
    bounds: Aabb,
    data: T,
}

fn collect<T: hecs::Component + Copy>(world: &World) -> Vec<Candidate<T>> {
    world
        .query::<(&Transform, &Hitbox, &T)>()
        .iter()
        .map(|(entity, (transform, hitbox, data))| Candidate {
            entity,
            bounds: Aabb::new(transform.position, hitbox.size),
            data: *data,
        })
        .collect()
}

/// Runs one collision pass in fixed order:
/// 1. player projectiles vs enemies
/// 2. player projectiles vs boss
/// 3. player vs enemies, enemy projectiles and active lasers, one hit per tick
/// 4. player vs powerups
///
/// Each step works on candidates collected before any removal, so despawning
/// never skips a neighbour. Score and drops are left to the caller.
pub fn resolve(
    world: &mut World,
    player: &mut PlayerShip,
    boss: &mut Option<Boss>,
    canvas_height: f32,
    events: &mut Vec<FrameEvent>,
) {
    let projectiles = collect::<Projectile>(world);
    let mut enemies = collect::<Enemy>(world);
    let mut spent = vec![false; projectiles.len()];

    for (shot_index, shot) in projectiles.iter().enumerate() {
        if shot.data.owner != Owner::Player {
            continue;
        }
        let Some(target) = enemies
            .iter_mut()
            .find(|enemy| enemy.data.health > 0 && shot.bounds.overlaps(&enemy.bounds))
        else {
            continue;
        };

        spent[shot_index] = true;
        despawn(world, shot.entity);
        target.data.health -= shot.data.damage;
        if target.data.health > 0 {
            if let Ok(mut enemy) = world.get::<&mut Enemy>(target.entity) {
                enemy.health = target.data.health;
            }
            continue;
        }

        despawn(world, target.entity);
        events.push(FrameEvent::EnemyDestroyed {
            kind: target.data.kind,
            position: target.bounds.center,
            points: target.data.kind.config().points,
        });
    }

    if let Some(active) = boss.as_mut() {
        let boss_box = Aabb::new(active.position, active.size());
        for (shot_index, shot) in projectiles.iter().enumerate() {
            if spent[shot_index] || shot.data.owner != Owner::Player || active.is_defeated() {
                continue;
            }
            if !shot.bounds.overlaps(&boss_box) {
                continue;
            }
            spent[shot_index] = true;
            despawn(world, shot.entity);
            if active.take_damage(shot.data.damage) {
                debug!("Boss entered phase two at {} health", active.health);
                events.push(FrameEvent::BossPhaseChanged);
            }
        }
        if active.is_defeated() {
            events.push(FrameEvent::BossDefeated {
                position: active.position,
                points: BOSS_POINTS,
            });
            *boss = None;
        }
    }

    if !player.is_invincible() && !player.is_destroyed() {
        let player_box = Aabb::new(player.position, player.size());
        if let Some(hit) = find_player_hit(world, &player_box, &enemies, &projectiles, &spent, canvas_height)
        {
            let outcome = player.take_damage();
            events.push(FrameEvent::PlayerDamaged { outcome });
            match hit {
                PlayerHit::Rammed(index) => {
                    let rammer = &mut enemies[index];
                    if rammer.data.kind.config().behavior == Behavior::Steer {
                        rammer.data.health = 0;
                        despawn(world, rammer.entity);
                        events.push(FrameEvent::EnemyCrashed {
                            kind: rammer.data.kind,
                            position: rammer.bounds.center,
                        });
                    }
                }
                PlayerHit::Shot(entity) => despawn(world, entity),
                PlayerHit::Beam => {}
            }
            if outcome == DamageOutcome::Destroyed {
                events.push(FrameEvent::GameOver);
            }
        }
    }

    if player.is_destroyed() {
        return;
    }
    let player_box = Aabb::new(player.position, player.size());
    for pickup in collect::<PowerUp>(world) {
        if pickup.bounds.overlaps(&player_box) {
            despawn(world, pickup.entity);
            let effect = player.apply_powerup(pickup.data.kind);
            events.push(FrameEvent::PowerUpCollected {
                kind: pickup.data.kind,
                effect,
            });
        }
    }
}

enum PlayerHit {
    Rammed(usize),
    Shot(Entity),
    Beam,
}

fn find_player_hit(
    world: &World,
    player_box: &Aabb,
    enemies: &[Candidate<Enemy>],
    projectiles: &[Candidate<Projectile>],
    spent: &[bool],
    canvas_height: f32,
) -> Option<PlayerHit> {
    if let Some(index) = enemies
        .iter()
        .position(|enemy| enemy.data.health > 0 && enemy.bounds.overlaps(player_box))
    {
        return Some(PlayerHit::Rammed(index));
    }

    if let Some(shot) = projectiles.iter().zip(spent).find_map(|(shot, &spent)| {
        (!spent && shot.data.owner == Owner::Enemy && shot.bounds.overlaps(player_box))
            .then_some(shot.entity)
    }) {
        return Some(PlayerHit::Shot(shot));
    }

    world
        .query::<(&Transform, &Laser)>()
        .iter()
        .any(|(_, (transform, laser))| {
            laser.is_active()
                && laser_box(transform.position[0], laser, canvas_height).overlaps(player_box)
        })
        .then_some(PlayerHit::Beam)
}

fn despawn(world: &mut World, entity: Entity) {
    if let Err(e) = world.despawn(entity) {
        debug!("Entity {:?} already gone: {}", entity, e);
    }
}
