// Headless crowd demo
// Drives the default scene with a scripted key sequence through the same
// input adapter a window would use, and logs occupancy once per simulated second.
// Run with RUST_LOG=info (or debug for per-rebuild timings).

use crowd_mesh::engine::input::InputState;
use crowd_mesh::{Scene, SceneConfig, SceneError};
use log::{info, warn};
use winit::keyboard::KeyCode;

// ============================================================================
// SCRIPT
// ============================================================================

const TICKS_PER_SECOND: u32 = 60;
const SIMULATED_SECONDS: u32 = 10;

/// Key pressed on a given tick, with the shift state.
fn scripted_key(tick: u32) -> Option<(KeyCode, bool)> {
    let second = tick / TICKS_PER_SECOND;
    let phase = tick % TICKS_PER_SECOND;
    if phase % 6 != 0 {
        return None;
    }
    Some(match second % 5 {
        0 => (KeyCode::ArrowRight, false),
        1 => (KeyCode::KeyR, false),
        2 => (KeyCode::ArrowDown, false),
        3 => (KeyCode::KeyS, phase < 30),
        _ => (KeyCode::KeyR, true),
    })
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<(), SceneError> {
    env_logger::init();

    let seed = std::env::var("CROWD_SEED").ok().and_then(|s| s.parse().ok());
    let mut scene = Scene::generate(SceneConfig { seed, ..SceneConfig::default() })?;
    let mut input = InputState::new();

    let stats = scene.stats();
    info!(
        "Start | Points: {} | Triangles: {} ({} blocked) | Agents: {}",
        stats.points, stats.triangles, stats.blocked_triangles, stats.agents
    );

    let mut rebuilds_this_second = 0;
    for tick in 1..=TICKS_PER_SECOND * SIMULATED_SECONDS {
        if let Some((key, shift)) = scripted_key(tick) {
            if let Some(command) = input.on_key(&scene, key, shift) {
                scene.push(command);
            }
        }

        match scene.process_commands() {
            Ok(Some(_)) => rebuilds_this_second += 1,
            Ok(None) => {}
            Err(e) => warn!("command batch: {e}"),
        }

        if tick % TICKS_PER_SECOND == 0 {
            let stats = scene.stats();
            let busiest = scene.density_by_triangle().into_iter().max().unwrap_or(0);
            info!(
                "t={}s | Rebuilds: {} ({:.3} ms last) | Triangles: {} ({} blocked) | \
                 Agents: {} | Dropped: {} | Busiest: {}",
                tick / TICKS_PER_SECOND,
                rebuilds_this_second,
                stats.last_rebuild_ms,
                stats.triangles,
                stats.blocked_triangles,
                stats.agents,
                stats.dropped_agents,
                busiest
            );
            rebuilds_this_second = 0;
        }
    }

    Ok(())
}
