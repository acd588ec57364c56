//! Headless demo: a player holding off a small enemy squad while a spawner
//! sends reinforcements
//!
//! Usage: `atlantis [config.ron]`. Set `RUST_LOG=debug` for state transitions.

use atlantis::prelude::*;

const FRAME: f32 = 1.0 / 60.0;

fn load_config() -> GameConfig {
    match std::env::args().nth(1) {
        Some(path) => GameConfig::load_or_default(path),
        None => GameConfig::default(),
    }
}

/// Scripted input for the player at elapsed time `t`
fn script(arena: &Arena, t: f32) {
    let events: &[GameEvent] = match t {
        t if (0.0..FRAME).contains(&t) => &[GameEvent::MovementInput {
            direction: Vec2::new(0.0, 1.0),
        }],
        t if (2.0..2.0 + FRAME).contains(&t) => &[
            GameEvent::MovementInput {
                direction: Vec2::ZERO,
            },
            GameEvent::AttackInput { pressed: true },
        ],
        t if (2.3..2.3 + FRAME).contains(&t) => &[GameEvent::AttackInput { pressed: true }],
        t if (2.6..2.6 + FRAME).contains(&t) => &[GameEvent::AttackInput { pressed: true }],
        t if (4.0..4.0 + FRAME).contains(&t) => &[GameEvent::DashInput { pressed: true }],
        t if (5.0..5.0 + FRAME).contains(&t) => &[GameEvent::ParryInput { pressed: true }],
        t if (7.0..7.0 + FRAME).contains(&t) => &[
            GameEvent::SprintInput { pressed: true },
            GameEvent::MovementInput {
                direction: Vec2::new(0.0, -1.0),
            },
        ],
        _ => &[],
    };
    for event in events {
        arena.publish(event);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ArenaConfig::default()
        .with_game(load_config())
        .with_seed(7)
        .with_obstacle(Vec3::new(-6.0, 1.0, 8.0), Vec3::new(2.0, 1.0, 0.5))
        .with_spawner(
            SpawnerSettings::new(vec![Vec3::new(-12.5, 0.0, 18.5), Vec3::new(12.5, 0.0, 18.5)])
                .with_max_enemies(2)
                .with_interval(4.0)
                .with_classes(vec![EnemyClass::Archer, EnemyClass::Marauder]),
        );
    let mut arena = Arena::new(config);

    let spawned = arena.spawn_player(Vec3::new(0.5, 0.0, 0.5)).and_then(|_| {
        arena.spawn_enemy(
            Vec3::new(0.5, 0.0, 9.5),
            vec![Vec3::new(4.5, 0.0, 9.5), Vec3::new(-3.5, 0.0, 11.5)],
        )?;
        arena.spawn_enemy_as(Vec3::new(8.5, 0.0, 12.5), Vec::new(), Some(EnemyClass::Warrior))?;
        arena.spawn_enemy_as(Vec3::new(-10.5, 0.0, 14.5), Vec::new(), Some(EnemyClass::Mage))
    });
    if let Err(e) = spawned {
        log::error!("Failed to set up the arena: {e}");
        std::process::exit(1);
    }

    let duration = 10.0;
    while arena.time().elapsed_seconds() < duration {
        script(&arena, arena.time().elapsed_seconds());
        arena.step(FRAME);
        if arena.stats().player_died {
            break;
        }
    }

    let stats = arena.stats();
    let health = arena
        .player()
        .map(|p| p.health().current())
        .unwrap_or_default();
    log::info!(
        "Simulated {:.1}s in {} frames ({} fixed steps)",
        arena.time().elapsed_seconds(),
        stats.frames,
        stats.fixed_steps
    );
    log::info!(
        "Player health {health:.0}, hits taken {}, died: {}",
        stats.player_hits,
        stats.player_died
    );
    log::info!(
        "Enemies: {} spawned, {} killed, {} despawned, {} standing",
        stats.enemies_spawned,
        stats.enemies_killed,
        stats.enemies_despawned,
        arena.alive_enemies()
    );
    for enemy in arena.enemies() {
        let name = arena.name_of(enemy.entity()).unwrap_or_default();
        log::info!(
            "  {name} ({:?}): {:?}, health {:.0}",
            enemy.class(),
            enemy.current_state(),
            enemy.health()
        );
    }
    log::info!(
        "Projectiles: {} fired, {} struck, {} in flight",
        stats.projectiles_fired,
        stats.projectiles_hit,
        arena.projectiles()
    );
    log::info!("{} sounds played", arena.sounds_played());
}
