//! Frame Driver
//!
//! Hosts a [`RaceEngine`] on a tokio task: commands arrive over an mpsc
//! channel, frames come from a fixed-rate interval, and every change is
//! published as a [`RaceSnapshot`] on a watch channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::core::geometry::{Lane, Rect};
use crate::game::engine::RaceEngine;
use crate::game::events::{RaceEvent, RaceListener};
use crate::game::state::{GameState, RaceState};
use crate::MAX_FRAME_RATE;

/// Player command for a hosted race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceCommand {
    /// Start or restart the session
    Start,
    /// Move one lane left
    MoveLeft,
    /// Move one lane right
    MoveRight,
    /// End the session and dispatch rewards
    EndRace,
    /// Stop the driver task
    Shutdown,
}

/// Render-ready view of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    /// Ticks simulated
    pub tick: u32,
    /// Session phase
    pub phase: GameState,
    /// Car lane
    pub lane: Lane,
    /// Score
    pub score: u64,
    /// Play time (ms)
    pub elapsed_ms: u64,
    /// Coins collected
    pub coins_collected: u32,
    /// Tokens earned so far
    pub tokens: u32,
    /// Current scroll speed
    pub obstacle_speed: f32,
    /// Car bounds
    pub car: Option<Rect>,
    /// Obstacle bounds
    pub obstacles: Vec<Rect>,
    /// Uncollected coin bounds
    pub coins: Vec<Rect>,
    /// Live particle count
    pub particles: usize,
}

impl RaceSnapshot {
    /// Capture the render-relevant parts of `state`.
    pub fn capture(state: &RaceState) -> Self {
        Self {
            tick: state.tick,
            phase: state.phase,
            lane: state.car.lane,
            score: state.score,
            elapsed_ms: state.elapsed_ms.max(0.0) as u64,
            coins_collected: state.coins_collected,
            tokens: state.tokens_earned(),
            obstacle_speed: state.obstacle_speed,
            car: Some(state.car.rect()),
            obstacles: state.obstacles.iter().map(|o| o.rect).collect(),
            coins: state
                .coins
                .iter()
                .filter(|c| !c.collected)
                .map(|c| c.rect)
                .collect(),
            particles: state.particles.len(),
        }
    }

    /// Serialize to a compact binary frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from a binary frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// Feed `timestamps` to the engine until it stops asking for frames.
///
/// Returns the number of ticks run and every event generated.
pub fn run_frames<L, I>(engine: &mut RaceEngine<L>, timestamps: I) -> (usize, Vec<RaceEvent>)
where
    L: RaceListener,
    I: IntoIterator<Item = f64>,
{
    let mut events = engine.take_events();
    let mut ticks = 0;

    for now in timestamps {
        let result = engine.tick(now);
        ticks += 1;
        events.extend(result.events);
        if !result.rearm {
            break;
        }
    }

    (ticks, events)
}

/// Interval between frames at `frame_rate` Hz, never shorter than 1 ms.
pub fn frame_period(frame_rate: u32) -> Duration {
    let rate = frame_rate.clamp(1, MAX_FRAME_RATE);
    Duration::from_micros(1_000_000 / rate as u64)
}

/// Handle to a hosted race.
pub struct RaceHandle<L: RaceListener> {
    commands: mpsc::Sender<RaceCommand>,
    snapshots: watch::Receiver<RaceSnapshot>,
    events: broadcast::Sender<RaceEvent>,
    task: JoinHandle<RaceEngine<L>>,
}

impl<L: RaceListener + Send + 'static> RaceHandle<L> {
    /// Send a command. Returns `false` if the driver has stopped.
    pub async fn send(&self, command: RaceCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Watch the latest snapshot.
    pub fn snapshots(&self) -> watch::Receiver<RaceSnapshot> {
        self.snapshots.clone()
    }

    /// Subscribe to the event stream.
    pub fn events(&self) -> broadcast::Receiver<RaceEvent> {
        self.events.subscribe()
    }

    /// Stop the driver and take the engine back.
    pub async fn shutdown(self) -> Option<RaceEngine<L>> {
        let _ = self.commands.send(RaceCommand::Shutdown).await;
        self.task.await.ok()
    }
}

/// Runs an engine at a fixed frame rate.
pub struct RaceDriver;

impl RaceDriver {
    /// Spawn `engine` on the current runtime at `frame_rate` Hz.
    ///
    /// The rate is clamped to `1..=MAX_FRAME_RATE`.
    pub fn spawn<L>(engine: RaceEngine<L>, frame_rate: u32) -> RaceHandle<L>
    where
        L: RaceListener + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(RaceSnapshot::capture(engine.state()));
        let (event_tx, _) = broadcast::channel(256);

        let frame = frame_period(frame_rate);
        let task = tokio::spawn(Self::run(
            engine,
            frame,
            command_rx,
            snapshot_tx,
            event_tx.clone(),
        ));

        RaceHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_tx,
            task,
        }
    }

    async fn run<L: RaceListener>(
        mut engine: RaceEngine<L>,
        frame: Duration,
        mut commands: mpsc::Receiver<RaceCommand>,
        snapshots: watch::Sender<RaceSnapshot>,
        events: broadcast::Sender<RaceEvent>,
    ) -> RaceEngine<L> {
        let origin = Instant::now();
        let mut ticker = interval(frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(frame_ms = frame.as_secs_f64() * 1000.0, "race driver started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if command == RaceCommand::Shutdown {
                        break;
                    }

                    debug!(?command, "race command");
                    match command {
                        RaceCommand::Start => { engine.start(); }
                        RaceCommand::MoveLeft => { engine.move_left(); }
                        RaceCommand::MoveRight => { engine.move_right(); }
                        RaceCommand::EndRace => { engine.end_race(); }
                        RaceCommand::Shutdown => {}
                    }

                    for event in engine.take_events() {
                        let _ = events.send(event);
                    }
                    let _ = snapshots.send(RaceSnapshot::capture(engine.state()));
                }
                _ = ticker.tick() => {
                    if !engine.state().is_playing() {
                        continue;
                    }

                    let now_ms = origin.elapsed().as_secs_f64() * 1000.0;
                    let result = engine.tick(now_ms);
                    for event in result.events {
                        let _ = events.send(event);
                    }
                    let _ = snapshots.send(RaceSnapshot::capture(engine.state()));
                }
            }
        }

        info!(phase = ?engine.phase(), "race driver stopped");
        engine
    }
}
