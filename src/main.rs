//! Crypto Racer
//!
//! `crypto-racer` runs an autopiloted demo race and claims its reward
//! through a dry-run minter. `crypto-racer serve [TOKEN=ADDRESS ...]` runs
//! the reward endpoint, minting through Thirdweb when `THIRDWEB_SECRET_KEY`
//! is set.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crypto_racer::{
    game::{
        engine::{EngineConfig, RaceEngine},
        events::RaceEventData,
        state::{Obstacle, RaceOutcome, RaceState},
    },
    network::{RewardServer, ServerConfig},
    reward::{
        claim::now_ms, DryRunMinter, InMemoryWalletDirectory, PlayerProgress, RewardService,
        ThirdwebMinter, TokenMinter, WalletAddress,
    },
    core::StateHash,
    Lane, RaceRng, RacerConfig, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RacerConfig::from_env().context("reading configuration")?;
    info!("Crypto Racer v{}", VERSION);
    info!("Frame Rate: {} Hz", config.frame_rate);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("serve") => serve(config, &args[1..]).await,
        _ => demo_race(config).await,
    }
}

/// Run the reward endpoint.
async fn serve(config: RacerConfig, wallets: &[String]) -> Result<()> {
    let directory = InMemoryWalletDirectory::new();
    for entry in wallets {
        let (token, address) = entry
            .split_once('=')
            .with_context(|| format!("expected TOKEN=ADDRESS, got {entry:?}"))?;
        let wallet: WalletAddress = address.parse().with_context(|| format!("wallet for {token}"))?;
        directory.insert(token, wallet).await;
        info!("Registered wallet {} for token", wallet.short());
    }

    if config.thirdweb.secret_key.is_empty() {
        info!("THIRDWEB_SECRET_KEY not set, minting in dry-run mode");
        run_server(config, directory, DryRunMinter::new()).await
    } else {
        let minter = ThirdwebMinter::new(&config.thirdweb).context("building HTTP client")?;
        info!("Minting through {}", minter.endpoint());
        run_server(config, directory, minter).await
    }
}

async fn run_server<M: TokenMinter + 'static>(
    config: RacerConfig,
    directory: InMemoryWalletDirectory,
    minter: M,
) -> Result<()> {
    let service = RewardService::from_config(minter, &config);
    let server = RewardServer::new(
        ServerConfig {
            bind_addr: config.bind_addr,
            ..Default::default()
        },
        service,
        directory,
    );

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            server.shutdown();
        }
    }
    Ok(())
}

/// Steer out of the car's lane when an obstacle is closing in.
fn autopilot(state: &RaceState) -> Option<Lane> {
    let car = state.car.rect();
    let threatened = |lane: Lane| {
        state.obstacles.iter().any(|o| {
            o.lane() == Some(lane)
                && o.rect.bottom() > car.y - 3.0 * Obstacle::SIZE
                && o.rect.y < car.bottom()
        })
    };

    let lane = state.car.lane;
    if !threatened(lane) {
        return None;
    }
    [lane.left(), lane.right()]
        .into_iter()
        .find(|&candidate| candidate != lane && !threatened(candidate))
}

/// Drive one seeded race at `frame_rate` fps for up to `max_frames`.
fn autopilot_race(
    seed: u64,
    frame_rate: u32,
    max_frames: u32,
) -> (RaceOutcome, PlayerProgress, StateHash) {
    let mut engine =
        RaceEngine::new(EngineConfig::default(), RaceRng::new(seed), PlayerProgress::new());
    engine.start();

    let mut pickups = 0;
    for frame in 0..max_frames {
        if let Some(target) = autopilot(engine.state()) {
            if target < engine.state().car.lane {
                engine.move_left();
            } else {
                engine.move_right();
            }
        }

        let result = engine.tick(frame as f64 * 1000.0 / frame_rate as f64);
        pickups += result
            .events
            .iter()
            .filter(|e| matches!(e.data, RaceEventData::CoinCollected { .. }))
            .count();
        if !result.rearm {
            break;
        }
    }

    let outcome = engine.end_race().unwrap_or_else(|| engine.state().outcome());
    info!("Seed {}: {} pickups over {} ticks", seed, pickups, engine.state().tick);
    (outcome, engine.listener().clone(), engine.state().compute_hash())
}

/// Demo: race, verify replay, then claim.
async fn demo_race(config: RacerConfig) -> Result<()> {
    info!("=== Starting Demo Race ===");
    let seed = 12345u64;
    let frame_rate = config.frame_rate;
    let max_frames = frame_rate * 60;

    let (outcome, mut progress, hash) = autopilot_race(seed, frame_rate, max_frames);
    info!(
        "Race over: {:?} after {} ms, score {}, {} coins, {} tokens",
        outcome.phase, outcome.elapsed_ms, outcome.score, outcome.coins, outcome.tokens
    );
    info!("Final State Hash: {}", hex::encode(hash));

    info!("=== Verifying Replay ===");
    let (replayed, _, replay_hash) = autopilot_race(seed, frame_rate, max_frames);
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if replay_hash == hash && replayed == outcome {
        info!("REPLAY VERIFIED: hashes match");
    } else {
        info!("REPLAY FAILURE: hashes differ");
    }

    info!("=== Claiming Reward ===");
    let Some(claim) = progress.take_claim(now_ms()) else {
        info!("No tokens earned, nothing to claim");
        return Ok(());
    };

    let wallet = config.thirdweb.admin_address;
    let service = RewardService::from_config(DryRunMinter::new(), &config);
    let receipt = service.claim(wallet, &claim, now_ms()).await?;
    info!("{} (tx {})", receipt.message, receipt.transaction_hash);
    Ok(())
}
