use bulletcore::boss::{Boss, BossPhase};
use bulletcore::components::*;
use bulletcore::config::SimulationConfig;
use bulletcore::events::FrameEvent;
use bulletcore::player::{DamageOutcome, Loadout};
use bulletcore::simulation::GameSimulation;

fn config() -> SimulationConfig {
    SimulationConfig {
        star_count: 0,
        ..SimulationConfig::default()
    }
}

fn simulation() -> GameSimulation {
    GameSimulation::new(config(), &Loadout::default())
}

fn idle() -> InputState {
    InputState::default()
}

/// Drops an enemy shot right on top of the player.
fn shoot_player(sim: &mut GameSimulation) {
    let at = sim.player.position;
    sim.spawn_projectile(Owner::Enemy, at, [0.0, 0.0]);
}

#[test]
fn killing_a_scout_scores_ten() {
    let mut sim = simulation();
    let scout = sim.spawn_enemy(EnemyKind::Scout, [640.0, 300.0]);
    sim.spawn_projectile(Owner::Player, [640.0, 300.0], [0.0, -PLAYER_SHOT_SPEED]);

    let result = sim.step(&idle());
    assert!(result.events.iter().any(|e| matches!(
        e,
        FrameEvent::EnemyDestroyed { kind: EnemyKind::Scout, points: 10, .. }
    )));
    assert_eq!(sim.stats().score, 10);
    assert_eq!(sim.stats().credits, 1);
    assert_eq!(sim.stats().kills, 1);
    assert!(!sim.world.contains(scout));
}

#[test]
fn one_shot_damages_only_one_enemy() {
    let mut sim = simulation();
    let a = sim.spawn_enemy(EnemyKind::Scout, [640.0, 300.0]);
    let b = sim.spawn_enemy(EnemyKind::Scout, [645.0, 300.0]);
    sim.spawn_projectile(Owner::Player, [642.0, 300.0], [0.0, -PLAYER_SHOT_SPEED]);
    sim.step(&idle());
    assert_eq!(sim.stats().kills, 1);
    assert!(sim.world.contains(a) != sim.world.contains(b));
}

#[test]
fn tough_enemies_survive_until_health_runs_out() {
    let mut sim = simulation();
    let tank = sim.spawn_enemy(EnemyKind::Tank, [640.0, 300.0]);
    let health = EnemyKind::Tank.config().health;

    for _ in 0..health - 1 {
        let [x, y] = sim.world.get::<&Transform>(tank).unwrap().position;
        sim.spawn_projectile(Owner::Player, [x, y], [0.0, 0.0]);
        sim.step(&idle());
        assert!(sim.world.contains(tank));
    }
    let [x, y] = sim.world.get::<&Transform>(tank).unwrap().position;
    sim.spawn_projectile(Owner::Player, [x, y], [0.0, 0.0]);
    sim.step(&idle());
    assert!(!sim.world.contains(tank));
    assert_eq!(sim.stats().score, EnemyKind::Tank.config().points as u64);
}

#[test]
fn drop_rate_tracks_configured_chance() {
    let mut drops = 0;
    for seed in 0..1000 {
        let mut sim = GameSimulation::new(config().with_seed(seed), &Loadout::default());
        sim.spawn_enemy(EnemyKind::Scout, [640.0, 300.0]);
        sim.spawn_projectile(Owner::Player, [640.0, 300.0], [0.0, -PLAYER_SHOT_SPEED]);
        sim.step(&idle());
        drops += sim.count::<PowerUp>();
    }
    assert!((110..190).contains(&drops), "{} drops in 1000 kills", drops);
}

#[test]
fn last_hit_on_last_life_ends_the_run() {
    let mut sim = simulation();
    sim.player.lives = 1;
    sim.player.health = 1;
    shoot_player(&mut sim);

    let result = sim.step(&idle());
    assert!(result.game_over);
    assert!(result.events.contains(&FrameEvent::PlayerDamaged {
        outcome: DamageOutcome::Destroyed
    }));
    assert!(result.events.contains(&FrameEvent::GameOver));
    assert!(sim.is_game_over());
    assert!(sim.snapshot().game_over);
}

#[test]
fn losing_a_life_refills_health() {
    let mut sim = simulation();
    sim.player.health = 1;
    shoot_player(&mut sim);
    let result = sim.step(&idle());
    assert!(result.events.contains(&FrameEvent::PlayerDamaged {
        outcome: DamageOutcome::LifeLost
    }));
    assert_eq!(sim.player.lives, 2);
    assert_eq!(sim.player.health, sim.player.max_health);
    assert!(sim.player.is_invincible());
    assert!(!sim.is_game_over());
}

#[test]
fn shield_absorbs_exactly_one_hit() {
    let loadout = Loadout {
        shield: true,
        ..Loadout::default()
    };
    let mut sim = GameSimulation::new(config(), &loadout);

    shoot_player(&mut sim);
    let result = sim.step(&idle());
    assert!(result.events.contains(&FrameEvent::PlayerDamaged {
        outcome: DamageOutcome::ShieldAbsorbed
    }));
    assert_eq!(sim.player.health, 3);
    assert!(!sim.player.shield);

    sim.player.invincible_ticks = 0;
    shoot_player(&mut sim);
    let result = sim.step(&idle());
    assert!(result.events.contains(&FrameEvent::PlayerDamaged {
        outcome: DamageOutcome::Hit
    }));
    assert_eq!(sim.player.health, 2);
}

#[test]
fn invincible_player_ignores_shots() {
    let mut sim = simulation();
    sim.player.invincible_ticks = 10;
    shoot_player(&mut sim);
    let result = sim.step(&idle());
    assert!(
        !result
            .events
            .iter()
            .any(|e| matches!(e, FrameEvent::PlayerDamaged { .. }))
    );
    assert_eq!(sim.player.health, 3);
}

#[test]
fn kamikaze_is_destroyed_on_impact_without_score() {
    let mut sim = simulation();
    let at = sim.player.position;
    let kamikaze = sim.spawn_enemy(EnemyKind::Kamikaze, [at[0], at[1] - 1.0]);
    let result = sim.step(&idle());

    assert!(!sim.world.contains(kamikaze));
    assert!(result.events.iter().any(|e| matches!(
        e,
        FrameEvent::EnemyCrashed { kind: EnemyKind::Kamikaze, .. }
    )));
    assert_eq!(sim.stats().score, 0);
    assert_eq!(sim.player.health, 2);
}

#[test]
fn health_stays_in_bounds_over_a_long_run() {
    let mut sim = simulation();
    let fire = InputState {
        fire: true,
        left: true,
        ..InputState::default()
    };
    for tick in 0..20_000 {
        let input = if (tick / 120) % 2 == 0 {
            fire
        } else {
            InputState {
                left: false,
                right: true,
                ..fire
            }
        };
        sim.step(&input);
        if sim.is_game_over() {
            break;
        }
        assert!(sim.player.health >= 1 && sim.player.health <= sim.player.max_health);
        assert!(sim.player.lives >= 1);
        for (_, enemy) in sim.world.query::<&Enemy>().iter() {
            assert!(enemy.health > 0 && enemy.health <= enemy.max_health);
        }
        if let Some(boss) = &sim.boss {
            assert!(boss.health > 0 && boss.health <= boss.max_health);
        }
        let [x, y] = sim.player.position;
        assert!((25.0..=1255.0).contains(&x) && (25.0..=695.0).contains(&y));
    }
}

#[test]
fn powerup_is_collected_once() {
    let mut sim = simulation();
    sim.player.health = 1;
    let at = sim.player.position;
    let pickup = sim.spawn_powerup(PowerUpKind::Health, at);

    let first = sim.step(&idle());
    let collected = |events: &[FrameEvent]| {
        events
            .iter()
            .filter(|e| matches!(e, FrameEvent::PowerUpCollected { .. }))
            .count()
    };
    assert_eq!(collected(&first.events), 1);
    assert!(!sim.world.contains(pickup));
    assert_eq!(sim.player.health, 2);

    let second = sim.step(&idle());
    assert_eq!(collected(&second.events), 0);
    assert_eq!(sim.player.health, 2);
    assert_eq!(sim.stats().powerups_collected, 1);
}

#[test]
fn healing_never_exceeds_max_health() {
    let mut sim = simulation();
    let at = sim.player.position;
    sim.spawn_powerup(PowerUpKind::Regeneration, at);
    sim.step(&idle());
    assert_eq!(sim.player.health, sim.player.max_health);
}

#[test]
fn waves_advance_in_order_with_bosses_on_tenths() {
    let config = SimulationConfig {
        wave_cooldown_ticks: 2,
        boss_spawn_delay_ticks: 2,
        ..config()
    };
    let mut sim = GameSimulation::new(config, &Loadout::default());
    let mut started = Vec::new();
    let mut bosses = Vec::new();

    for _ in 0..5_000 {
        sim.player.invincible_ticks = 1_000;
        let enemies: Vec<_> = sim.world.query::<&Enemy>().iter().map(|(e, _)| e).collect();
        for enemy in enemies {
            let _ = sim.world.despawn(enemy);
        }
        sim.boss = None;

        for event in sim.step(&idle()).events {
            match event {
                FrameEvent::WaveStarted { wave, .. } => started.push(wave),
                FrameEvent::BossSpawned { wave } => bosses.push(wave),
                _ => {}
            }
        }
        if sim.wave() > 21 {
            break;
        }
    }

    assert_eq!(bosses, vec![10, 20]);
    let expected: Vec<u32> = (1..=21).filter(|w| w % 10 != 0).collect();
    assert_eq!(started, expected);
    assert!(started.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn boss_phase_two_is_permanent() {
    let mut sim = simulation();
    let mut boss = Boss::new(1280.0);
    boss.position = [640.0, 150.0];
    boss.health = boss.max_health / 2 + 1;
    sim.boss = Some(boss);

    let hit_boss = |sim: &mut GameSimulation| {
        let [x, y] = sim.boss.as_ref().unwrap().position;
        sim.spawn_projectile(Owner::Player, [x, y], [0.0, 0.0]);
        sim.step(&idle())
    };

    let result = hit_boss(&mut sim);
    assert!(result.events.contains(&FrameEvent::BossPhaseChanged));
    assert_eq!(sim.boss.as_ref().unwrap().phase, BossPhase::Two);

    if let Some(boss) = sim.boss.as_mut() {
        boss.heal(boss.max_health);
    }
    let result = hit_boss(&mut sim);
    assert!(!result.events.contains(&FrameEvent::BossPhaseChanged));
    assert_eq!(sim.boss.as_ref().unwrap().phase, BossPhase::Two);
}

#[test]
fn defeating_the_boss_pays_out() {
    let mut sim = simulation();
    let mut boss = Boss::new(1280.0);
    boss.position = [640.0, 150.0];
    boss.health = 1;
    boss.phase = BossPhase::Two;
    sim.boss = Some(boss);
    sim.spawn_projectile(Owner::Player, [640.0, 150.0], [0.0, 0.0]);

    let result = sim.step(&idle());
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, FrameEvent::BossDefeated { points: 1000, .. })));
    assert!(sim.boss.is_none());
    assert_eq!(sim.stats().score, 1000);
    assert_eq!(sim.stats().bosses_defeated, 1);
}
