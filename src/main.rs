//! Bullseye Leaderboard Server
//!
//! Hosts the per-post leaderboard over WebSocket. Pass `--demo` to run a
//! scripted offline round through the full game core instead.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bullseye::core::rng::derive_round_seed;
use bullseye::game::aim::{AimConfig, AimController};
use bullseye::game::board::BoardConfig;
use bullseye::game::round::{RoundConfig, RoundManager};
use bullseye::game::scoring::{format_hit_for_hud, score_from_board_xy};
use bullseye::network::leaderboard::LeaderboardStore;
use bullseye::network::server::{LeaderboardServer, ServerConfig};
use bullseye::network::store::{KvStore, MemoryStore};
use bullseye::{TICK_RATE, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Bullseye Server v{}", VERSION);

    if std::env::args().any(|arg| arg == "--demo") {
        demo_round();
        return Ok(());
    }

    let config = ServerConfig::from_env();
    let snapshot_path = std::env::var("BULLSEYE_SNAPSHOT").ok().map(PathBuf::from);

    let store = match &snapshot_path {
        Some(path) if path.exists() => match MemoryStore::load_snapshot(path).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                warn!("could not load snapshot {}: {}", path.display(), err);
                Arc::new(MemoryStore::new())
            }
        },
        _ => Arc::new(MemoryStore::new()),
    };

    let kv: Arc<dyn KvStore> = store.clone();
    let leaderboard = Arc::new(LeaderboardStore::new(kv));
    let server = LeaderboardServer::new(config, leaderboard);

    tokio::select! {
        result = server.run() => {
            result.context("server terminated")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            server.shutdown();
        }
    }

    if let Some(path) = snapshot_path {
        store
            .save_snapshot(&path)
            .await
            .with_context(|| format!("saving snapshot to {}", path.display()))?;
    }

    Ok(())
}

/// Play one scripted round offline, end to end through the game core.
fn demo_round() {
    info!("=== Demo Round ===");

    let board = BoardConfig::default();
    board.validate().expect("default board is valid");

    let seed = derive_round_seed("demo_post", "demo_player", 1);
    info!("round seed: {:016x}", seed);

    let mut aim = AimController::new(AimConfig::default(), seed);
    let mut round = RoundManager::new(RoundConfig::default());
    round.reset_round();

    let dt = 1.0 / TICK_RATE as f32;
    let mut dart = 0u32;

    while round.darts_remaining() > 0 {
        dart += 1;

        // Let the reticle roam for a bit, then hold - longer holds for
        // later darts so the whole shrink curve gets exercised
        let roam_ticks = 30 + (dart * 13) % 45;
        for _ in 0..roam_ticks {
            aim.update(dt);
        }
        aim.begin_hold();
        let hold_ticks = 20 + (dart * 11) % 70;
        for _ in 0..hold_ticks {
            aim.update(dt);
        }

        let sample = aim
            .release_and_sample_hit()
            .expect("hold is in progress");
        let result = score_from_board_xy(sample.hit.x, sample.hit.y, &board);
        info!(
            "dart {}: held {} ticks, radius {:.3}, hit {} -> {}",
            dart,
            hold_ticks,
            sample.radius,
            sample.hit,
            format_hit_for_hud(&result)
        );
        round.register_throw(&result);
    }

    let summary = round.end_round();
    info!("=== Round Results ===");
    for (i, throw) in summary.throws.iter().enumerate() {
        info!("#{}: {} (+{})", i + 1, throw.label, throw.points);
    }
    info!("total: {} points over {} darts", summary.total_score, summary.throws.len());
}
