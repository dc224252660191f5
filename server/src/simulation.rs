//! Game simulation loop and systems
//!
//! One `GameSimulation` owns a whole run: the player and boss singletons,
//! every other entity in a `hecs::World`, the wave director and the seeded
//! RNG. `step` advances exactly one tick in a fixed order:
//! player, boss, moving entities, collisions, side effects, pruning, waves.

use crate::boss::{BOSS_SIZE, Boss, BossAction, spread_velocities};
use crate::collision;
use crate::components::*;
use crate::config::SimulationConfig;
use crate::events::{FrameEvent, MusicCue};
use crate::player::{Loadout, PlayerShip};
use crate::waves::{WaveCommand, WaveDirector, WavePhase};
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const EXPLOSION_PARTICLES: usize = 15;
const SPAWN_MARGIN: f32 = 25.0;
const MINION_OFFSET: f32 = 60.0;
const SPLIT_OFFSET: f32 = 20.0;

/// Totals accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub score: u64,
    pub credits: u64,
    pub kills: u32,
    pub bosses_defeated: u32,
    pub powerups_collected: u32,
}

pub struct GameSimulation {
    /// Enemies, projectiles, powerups, particles, lasers and stars.
    pub world: World,
    pub player: PlayerShip,
    pub boss: Option<Boss>,
    pub tick: u64,
    waves: WaveDirector,
    rng: StdRng,
    config: SimulationConfig,
    stats: RunStats,
    music: MusicCue,
    credit_multiplier: u64,
    game_over: bool,
}

impl GameSimulation {
    pub fn new(config: SimulationConfig, loadout: &Loadout) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut world = World::new();

        for _ in 0..config.star_count {
            let position = [
                rng.random::<f32>() * config.width,
                rng.random::<f32>() * config.height,
            ];
            world.spawn((
                Transform { position },
                Star {
                    layer: rng.random_range(1..=3),
                },
            ));
        }

        let player = PlayerShip::spawn(loadout, config.width, config.height);
        info!(
            "New run: {:?} ship, {} lives, canvas {}x{}, seed {}",
            player.ship, player.lives, config.width, config.height, config.seed
        );

        Self {
            world,
            player,
            boss: None,
            tick: 0,
            waves: WaveDirector::new(&config),
            rng,
            config,
            stats: RunStats::default(),
            music: MusicCue::Background,
            credit_multiplier: 1,
            game_over: false,
        }
    }

    /// Credits earned per kill are multiplied by this factor.
    pub fn set_credit_multiplier(&mut self, multiplier: u64) {
        self.credit_multiplier = multiplier.max(1);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn wave(&self) -> u32 {
        self.waves.wave()
    }

    pub fn wave_phase(&self) -> WavePhase {
        self.waves.phase()
    }

    pub fn music(&self) -> MusicCue {
        self.music
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Number of live entities carrying component `C`.
    pub fn count<C: hecs::Component>(&self) -> usize {
        self.world.query::<&C>().iter().count()
    }

    pub fn spawn_enemy(&mut self, kind: EnemyKind, position: [f32; 2]) -> Entity {
        let config = kind.config();
        let fire_timer = match config.fire_interval {
            Some(interval) => self.rng.random_range(0..interval),
            None => 0,
        };
        self.world.spawn((
            Transform { position },
            Hitbox { size: config.size },
            Enemy::new(kind, fire_timer),
        ))
    }

    pub fn spawn_projectile(
        &mut self,
        owner: Owner,
        position: [f32; 2],
        velocity: [f32; 2],
    ) -> Entity {
        let size = match owner {
            Owner::Player => PLAYER_SHOT_SIZE,
            Owner::Enemy => ENEMY_SHOT_SIZE,
        };
        self.world.spawn((
            Transform { position },
            Velocity { linear: velocity },
            Hitbox { size },
            Projectile { owner, damage: 1 },
        ))
    }

    pub fn spawn_powerup(&mut self, kind: PowerUpKind, position: [f32; 2]) -> Entity {
        self.world.spawn((
            Transform { position },
            Hitbox {
                size: POWERUP_SIZE,
            },
            PowerUp { kind },
        ))
    }

    /// Step the simulation forward by one tick. A finished run does nothing.
    pub fn step(&mut self, input: &InputState) -> SimulationStepResult {
        if self.game_over {
            return SimulationStepResult {
                tick: self.tick,
                step_duration: Duration::ZERO,
                entity_count: self.world.len(),
                events: Vec::new(),
                game_over: true,
            };
        }

        let step_start = Instant::now();
        let mut events = Vec::new();

        self.update_player(input, &mut events);
        self.update_boss();
        self.move_projectiles();
        self.update_enemies();
        self.update_particles();
        self.update_powerups();
        self.update_lasers();
        self.update_stars();

        collision::resolve(
            &mut self.world,
            &mut self.player,
            &mut self.boss,
            self.config.height,
            &mut events,
        );
        self.apply_events(&mut events);
        self.prune();
        self.update_waves(&mut events);

        self.tick += 1;

        SimulationStepResult {
            tick: self.tick,
            step_duration: step_start.elapsed(),
            entity_count: self.world.len(),
            events,
            game_over: self.game_over,
        }
    }

    fn update_player(&mut self, input: &InputState, events: &mut Vec<FrameEvent>) {
        self.player.tick_timers();
        self.player
            .steer(input, self.config.width, self.config.height);

        if input.fire && self.player.try_shoot() {
            let muzzle = self.player.muzzle();
            self.spawn_projectile(Owner::Player, muzzle, [0.0, -PLAYER_SHOT_SPEED]);
            events.push(FrameEvent::PlayerFired);
        }
    }

    fn update_boss(&mut self) {
        let Some(boss) = self.boss.as_mut() else {
            return;
        };
        let actions = boss.advance(self.player.position[0], self.config.width);
        let [boss_x, _] = boss.position;
        let bottom = boss.bottom();

        for action in actions {
            match action {
                BossAction::SpreadShot { count, arc_degrees } => {
                    for velocity in spread_velocities(count, arc_degrees, BOSS_SHOT_SPEED) {
                        self.spawn_projectile(Owner::Enemy, [boss_x, bottom], velocity);
                    }
                }
                BossAction::SpawnMinions { count } => {
                    for i in 0..count {
                        let side = if i % 2 == 0 { -1.0 } else { 1.0 };
                        let x = boss_x + side * MINION_OFFSET * (1 + i / 2) as f32;
                        self.spawn_enemy(EnemyKind::Scout, [x, bottom]);
                    }
                }
                BossAction::FireLaser { x } => {
                    debug!("Boss laser at x={:.0}", x);
                    self.world.spawn((
                        Transform {
                            position: [x, bottom],
                        },
                        Laser {
                            origin_y: bottom,
                            age: 0,
                        },
                    ));
                }
            }
        }
    }

    fn move_projectiles(&mut self) {
        for (_, (transform, velocity, _)) in self
            .world
            .query_mut::<(&mut Transform, &Velocity, &Projectile)>()
        {
            transform.position[0] += velocity.linear[0];
            transform.position[1] += velocity.linear[1];
        }
    }

    fn update_enemies(&mut self) {
        let player_pos = self.player.position;
        let width = self.config.width;
        let mut shots: Vec<([f32; 2], [f32; 2], [f32; 2])> = Vec::new();
        let mut heal_pulses: Vec<(Entity, [f32; 2])> = Vec::new();

        for (entity, (transform, hitbox, enemy)) in self
            .world
            .query_mut::<(&mut Transform, &Hitbox, &mut Enemy)>()
        {
            let config = enemy.kind.config();
            let [x, y] = &mut transform.position;
            *y += config.speed;

            let on_screen = *y >= 0.0;
            let muzzle = [*x, *y + hitbox.size[1] / 2.0];
            let mut ready_to_fire = false;
            if let Some(interval) = config.fire_interval
                && on_screen
            {
                enemy.fire_timer = enemy.fire_timer.saturating_sub(1);
                if enemy.fire_timer == 0 {
                    enemy.fire_timer = interval;
                    ready_to_fire = true;
                }
            }

            match config.behavior {
                Behavior::FireDown if ready_to_fire => {
                    shots.push((muzzle, [0.0, ENEMY_SHOT_SPEED], ENEMY_SHOT_SIZE));
                }
                Behavior::FireAimed if ready_to_fire => {
                    let dx = player_pos[0] - muzzle[0];
                    let dy = player_pos[1] - muzzle[1];
                    let distance = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
                    shots.push((
                        muzzle,
                        [
                            dx / distance * ENEMY_SHOT_SPEED,
                            dy / distance * ENEMY_SHOT_SPEED,
                        ],
                        ENEMY_SHOT_SIZE,
                    ));
                }
                Behavior::LayMines if ready_to_fire => {
                    shots.push((muzzle, [0.0, MINE_SPEED], MINE_SIZE));
                }
                Behavior::Steer => {
                    let dx = player_pos[0] - *x;
                    let step = (config.speed * 0.5).min(dx.abs());
                    *x += step.copysign(dx);
                }
                Behavior::Heal | Behavior::Teleport if on_screen => {
                    enemy.ability_timer = enemy.ability_timer.saturating_sub(1);
                    if enemy.ability_timer == 0 {
                        enemy.ability_timer = ABILITY_INTERVAL;
                        if config.behavior == Behavior::Heal {
                            heal_pulses.push((entity, [*x, *y]));
                        } else {
                            *x = self
                                .rng
                                .random_range(SPAWN_MARGIN..(width - SPAWN_MARGIN).max(SPAWN_MARGIN + 1.0));
                        }
                    }
                }
                _ => {}
            }
        }

        for (position, velocity, size) in shots {
            self.world.spawn((
                Transform { position },
                Velocity { linear: velocity },
                Hitbox { size },
                Projectile {
                    owner: Owner::Enemy,
                    damage: 1,
                },
            ));
        }

        for (healer, origin) in heal_pulses {
            for (entity, (transform, enemy)) in self.world.query_mut::<(&Transform, &mut Enemy)>() {
                let dx = transform.position[0] - origin[0];
                let dy = transform.position[1] - origin[1];
                if entity != healer && (dx * dx + dy * dy).sqrt() <= HEAL_RADIUS {
                    enemy.heal(1);
                }
            }
        }
    }

    fn update_particles(&mut self) {
        for (_, (transform, velocity, particle)) in self
            .world
            .query_mut::<(&mut Transform, &Velocity, &mut Particle)>()
        {
            transform.position[0] += velocity.linear[0];
            transform.position[1] += velocity.linear[1];
            particle.life -= 2.0;
        }
    }

    fn update_powerups(&mut self) {
        for (_, (transform, _)) in self.world.query_mut::<(&mut Transform, &PowerUp)>() {
            transform.position[1] += POWERUP_DRIFT;
        }
    }

    fn update_lasers(&mut self) {
        for (_, laser) in self.world.query_mut::<&mut Laser>() {
            laser.age += 1;
        }
    }

    fn update_stars(&mut self) {
        let width = self.config.width;
        let height = self.config.height;
        for (_, (transform, star)) in self.world.query_mut::<(&mut Transform, &Star)>() {
            transform.position[1] += star.speed();
            if transform.position[1] > height {
                transform.position = [self.rng.random::<f32>() * width, 0.0];
            }
        }
    }

    /// Turns collision outcomes into score, credits, particles and drops.
    fn apply_events(&mut self, events: &mut Vec<FrameEvent>) {
        let mut index = 0;
        while index < events.len() {
            match events[index].clone() {
                FrameEvent::EnemyDestroyed {
                    kind,
                    position,
                    points,
                } => {
                    self.award(points);
                    self.stats.kills += 1;
                    self.explode(position);
                    self.roll_drop(position);
                    if kind.config().behavior == Behavior::Split {
                        for side in [-1.0, 1.0] {
                            let at = [position[0] + side * SPLIT_OFFSET, position[1]];
                            self.spawn_enemy(EnemyKind::Scout, at);
                        }
                    }
                }
                FrameEvent::EnemyCrashed { position, .. } => self.explode(position),
                FrameEvent::BossDefeated { position, points } => {
                    self.award(points);
                    self.stats.kills += 1;
                    self.stats.bosses_defeated += 1;
                    for offset in [-BOSS_SIZE[0] / 4.0, 0.0, BOSS_SIZE[0] / 4.0] {
                        self.explode([position[0] + offset, position[1]]);
                    }
                    info!("Boss defeated on wave {}", self.waves.wave());
                    self.set_music(MusicCue::Background, events);
                }
                FrameEvent::PowerUpCollected { .. } => self.stats.powerups_collected += 1,
                FrameEvent::GameOver => {
                    self.game_over = true;
                    self.explode(self.player.position);
                    info!(
                        "Game over on wave {} with score {}",
                        self.waves.wave(),
                        self.stats.score
                    );
                }
                _ => {}
            }
            index += 1;
        }
    }

    fn award(&mut self, points: u32) {
        self.stats.score += points as u64;
        self.stats.credits += points.div_ceil(10) as u64 * self.credit_multiplier;
    }

    fn roll_drop(&mut self, position: [f32; 2]) {
        if !self.rng.random_bool(self.config.powerup_drop_chance.clamp(0.0, 1.0)) {
            return;
        }
        let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
        self.spawn_powerup(kind, position);
    }

    fn explode(&mut self, position: [f32; 2]) {
        if !self.config.effects_enabled {
            return;
        }
        let room = self
            .config
            .max_particles
            .saturating_sub(self.count::<Particle>());
        for _ in 0..EXPLOSION_PARTICLES.min(room) {
            let velocity = [
                self.rng.random_range(-3.0..3.0),
                self.rng.random_range(-3.0..3.0),
            ];
            let life = self.rng.random_range(40.0..100.0);
            self.world.spawn((
                Transform { position },
                Velocity { linear: velocity },
                Particle {
                    life,
                    max_life: life,
                },
            ));
        }
    }

    fn set_music(&mut self, cue: MusicCue, events: &mut Vec<FrameEvent>) {
        if self.music != cue {
            self.music = cue;
            events.push(FrameEvent::Music { cue });
        }
    }

    /// Removes whatever left the canvas or ran out of time.
    fn prune(&mut self) {
        let width = self.config.width;
        let height = self.config.height;
        let off_canvas = |position: [f32; 2], size: [f32; 2]| {
            position[1] < -size[1]
                || position[1] > height + size[1]
                || position[0] < -size[0]
                || position[0] > width + size[0]
        };

        let mut expired: Vec<Entity> = Vec::new();
        for (entity, (transform, hitbox, _)) in self
            .world
            .query::<(&Transform, &Hitbox, &Projectile)>()
            .iter()
        {
            if off_canvas(transform.position, hitbox.size) {
                expired.push(entity);
            }
        }
        for (entity, (transform, hitbox, _)) in
            self.world.query::<(&Transform, &Hitbox, &Enemy)>().iter()
        {
            if transform.position[1] > height + hitbox.size[1] {
                expired.push(entity);
            }
        }
        for (entity, (transform, hitbox, _)) in
            self.world.query::<(&Transform, &Hitbox, &PowerUp)>().iter()
        {
            if transform.position[1] > height + hitbox.size[1] {
                expired.push(entity);
            }
        }
        for (entity, particle) in self.world.query::<&Particle>().iter() {
            if particle.life <= 0.0 {
                expired.push(entity);
            }
        }
        for (entity, laser) in self.world.query::<&Laser>().iter() {
            if laser.is_spent() {
                expired.push(entity);
            }
        }

        for entity in expired {
            if let Err(e) = self.world.despawn(entity) {
                debug!("Failed to despawn entity {:?}: {}", entity, e);
            }
        }
    }

    fn update_waves(&mut self, events: &mut Vec<FrameEvent>) {
        if self.game_over {
            return;
        }
        let hostiles = self.count::<Enemy>();
        let Some(command) = self
            .waves
            .update(hostiles, self.boss.is_some(), &mut self.rng)
        else {
            return;
        };

        match command {
            WaveCommand::SpawnWave { wave, kinds } => {
                let width = self.config.width;
                let height = self.config.height;
                for kind in &kinds {
                    let x = self
                        .rng
                        .random_range(SPAWN_MARGIN..(width - SPAWN_MARGIN).max(SPAWN_MARGIN + 1.0));
                    let y = self.rng.random_range((-height - 50.0)..-50.0);
                    self.spawn_enemy(*kind, [x, y]);
                }
                info!("Wave {} started with {} enemies", wave, kinds.len());
                events.push(FrameEvent::WaveStarted {
                    wave,
                    enemies: kinds.len() as u32,
                });
            }
            WaveCommand::AnnounceBoss { wave } => {
                info!("Boss incoming on wave {}", wave);
                events.push(FrameEvent::BossIncoming { wave });
                self.set_music(MusicCue::Silence, events);
            }
            WaveCommand::SpawnBoss { wave } => {
                self.boss = Some(Boss::new(self.config.width));
                events.push(FrameEvent::BossSpawned { wave });
                self.set_music(MusicCue::Boss, events);
            }
            WaveCommand::Cleared { wave } => {
                debug!("Wave {} cleared at tick {}", wave, self.tick);
                events.push(FrameEvent::WaveCleared { wave });
            }
        }
    }

    /// Presentation view of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        let mut entities = Vec::new();

        for (entity, (transform, hitbox, enemy)) in
            self.world.query::<(&Transform, &Hitbox, &Enemy)>().iter()
        {
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::Enemy {
                    kind: enemy.kind,
                    health: enemy.health,
                    max_health: enemy.max_health,
                },
                transform: *transform,
                size: hitbox.size,
            });
        }
        for (entity, (transform, hitbox, projectile)) in self
            .world
            .query::<(&Transform, &Hitbox, &Projectile)>()
            .iter()
        {
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::Projectile {
                    owner: projectile.owner,
                },
                transform: *transform,
                size: hitbox.size,
            });
        }
        for (entity, (transform, hitbox, powerup)) in
            self.world.query::<(&Transform, &Hitbox, &PowerUp)>().iter()
        {
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::PowerUp { kind: powerup.kind },
                transform: *transform,
                size: hitbox.size,
            });
        }
        for (entity, (transform, laser)) in self.world.query::<(&Transform, &Laser)>().iter() {
            let bounds = collision::laser_box(transform.position[0], laser, self.config.height);
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::Laser {
                    active: laser.is_active(),
                },
                transform: *transform,
                size: bounds.size,
            });
        }
        for (entity, (transform, particle)) in
            self.world.query::<(&Transform, &Particle)>().iter()
        {
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::Particle {
                    opacity: particle.opacity(),
                },
                transform: *transform,
                size: [3.0, 3.0],
            });
        }
        for (entity, (transform, star)) in self.world.query::<(&Transform, &Star)>().iter() {
            entities.push(EntitySnapshot {
                entity_id: entity.id() as u64,
                entity_type: EntityType::Star { layer: star.layer },
                transform: *transform,
                size: [star.layer as f32, star.layer as f32],
            });
        }

        GameSnapshot {
            tick: self.tick,
            wave: self.waves.wave(),
            wave_phase: self.waves.phase(),
            music: self.music,
            game_over: self.game_over,
            stats: self.stats.clone(),
            player: self.player.clone(),
            boss: self.boss.clone(),
            entities,
        }
    }
}

/// Result of a simulation step
#[derive(Debug)]
pub struct SimulationStepResult {
    pub tick: u64,
    pub step_duration: Duration,
    pub entity_count: u32,
    pub events: Vec<FrameEvent>,
    pub game_over: bool,
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub wave: u32,
    pub wave_phase: WavePhase,
    pub music: MusicCue,
    pub game_over: bool,
    pub stats: RunStats,
    pub player: PlayerShip,
    pub boss: Option<Boss>,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub entity_id: u64,
    pub entity_type: EntityType,
    pub transform: Transform,
    pub size: [f32; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityType {
    Enemy {
        #[serde(rename = "enemy")]
        kind: EnemyKind,
        health: i32,
        max_health: i32,
    },
    Projectile { owner: Owner },
    PowerUp {
        #[serde(rename = "powerup")]
        kind: PowerUpKind,
    },
    Laser { active: bool },
    Particle { opacity: f32 },
    Star { layer: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            star_count: 0,
            ..SimulationConfig::default()
        }
    }

    fn simulation() -> GameSimulation {
        GameSimulation::new(quiet_config(), &Loadout::default())
    }

    #[test]
    fn first_step_spawns_wave_one_above_the_canvas() {
        let mut sim = simulation();
        let result = sim.step(&InputState::default());
        assert!(result.events.contains(&FrameEvent::WaveStarted { wave: 1, enemies: 7 }));
        assert_eq!(sim.count::<Enemy>(), 7);
        for (_, (transform, _)) in sim.world.query::<(&Transform, &Enemy)>().iter() {
            assert!(transform.position[1] < -50.0);
            assert!(transform.position[0] >= 25.0 && transform.position[0] < 1255.0);
        }
    }

    #[test]
    fn holding_fire_respects_cooldown() {
        let mut sim = simulation();
        let input = InputState {
            fire: true,
            ..InputState::default()
        };
        let fired = (0..24)
            .flat_map(|_| sim.step(&input).events)
            .filter(|e| *e == FrameEvent::PlayerFired)
            .count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn effects_flag_disables_particles() {
        let config = SimulationConfig {
            effects_enabled: false,
            ..quiet_config()
        };
        let mut sim = GameSimulation::new(config, &Loadout::default());
        sim.spawn_enemy(EnemyKind::Scout, [640.0, 300.0]);
        sim.spawn_projectile(Owner::Player, [640.0, 300.0], [0.0, -7.0]);
        sim.step(&InputState::default());
        assert_eq!(sim.stats().kills, 1);
        assert_eq!(sim.count::<Particle>(), 0);
    }

    #[test]
    fn particle_total_is_capped() {
        let config = SimulationConfig {
            max_particles: 20,
            ..quiet_config()
        };
        let mut sim = GameSimulation::new(config, &Loadout::default());
        for x in [200.0, 400.0, 600.0] {
            sim.spawn_enemy(EnemyKind::Scout, [x, 300.0]);
            sim.spawn_projectile(Owner::Player, [x, 300.0], [0.0, -7.0]);
        }
        sim.step(&InputState::default());
        assert_eq!(sim.stats().kills, 3);
        assert_eq!(sim.count::<Particle>(), 20);
    }

    #[test]
    fn splitter_leaves_two_scouts() {
        let mut sim = simulation();
        let splitter = sim.spawn_enemy(EnemyKind::Splitter, [640.0, 300.0]);
        if let Ok(mut enemy) = sim.world.get::<&mut Enemy>(splitter) {
            enemy.health = 1;
        }
        sim.spawn_projectile(Owner::Player, [640.0, 300.0], [0.0, -7.0]);
        sim.step(&InputState::default());
        assert_eq!(sim.stats().score, 60);
        let scouts = sim
            .world
            .query::<&Enemy>()
            .iter()
            .filter(|(_, e)| e.kind == EnemyKind::Scout && e.health == 1)
            .count();
        // Two split scouts plus the seven from wave one.
        assert_eq!(scouts, 9);
    }

    #[test]
    fn double_credits_multiplier_applies_per_kill() {
        let mut sim = simulation();
        sim.set_credit_multiplier(2);
        sim.spawn_enemy(EnemyKind::Bomber, [640.0, 300.0]);
        if let Some((_, enemy)) = sim.world.query_mut::<&mut Enemy>().into_iter().next() {
            enemy.health = 1;
        }
        sim.spawn_projectile(Owner::Player, [640.0, 300.0], [0.0, -7.0]);
        sim.step(&InputState::default());
        assert_eq!(sim.stats().score, 30);
        assert_eq!(sim.stats().credits, 6);
    }

    #[test]
    fn escaped_enemies_are_pruned_without_score() {
        let mut sim = simulation();
        let runner = sim.spawn_enemy(EnemyKind::Scout, [100.0, 749.0]);
        sim.step(&InputState::default());
        sim.step(&InputState::default());
        assert!(!sim.world.contains(runner));
        assert_eq!(sim.stats().score, 0);
    }

    #[test]
    fn step_after_game_over_is_a_no_op() {
        let mut sim = simulation();
        sim.player.lives = 1;
        sim.player.health = 1;
        let at = sim.player.position;
        sim.spawn_projectile(Owner::Enemy, at, [0.0, 0.0]);
        let result = sim.step(&InputState::default());
        assert!(result.game_over);
        assert!(result.events.contains(&FrameEvent::GameOver));

        let tick = sim.tick;
        let entities = sim.world.len();
        let result = sim.step(&InputState::default());
        assert!(result.events.is_empty());
        assert_eq!(sim.tick, tick);
        assert_eq!(sim.world.len(), entities);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut sim = simulation();
        sim.step(&InputState::default());
        let json = serde_json::to_value(sim.snapshot()).unwrap();
        assert_eq!(json["wave"], 1);
        assert_eq!(json["entities"].as_array().map(Vec::len), Some(7));
        assert_eq!(json["entities"][0]["entity_type"]["kind"], "enemy");
    }
}
