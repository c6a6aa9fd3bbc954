//! Game state and main loop.

use crate::collision;
use crate::config::Config;
use crate::physics;
use crate::split_merge;
use crate::stats;
use crate::world::World;
use glam::DVec2;
use protocol::packets::{ClientMessage, ServerMessage, StateSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A player action queued by a connection and applied at the start of the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Move(DVec2),
    Split(DVec2),
    Eject(DVec2),
    SetName(String),
}

impl Intent {
    /// Convert a client message into an intent. Chat is not a world action.
    pub fn from_message(message: ClientMessage) -> Option<Self> {
        match message {
            ClientMessage::Move { x, y } => Some(Self::Move(DVec2::new(x, y))),
            ClientMessage::Split { mouse_x, mouse_y } => {
                Some(Self::Split(DVec2::new(mouse_x, mouse_y)))
            }
            ClientMessage::Eject { mouse_x, mouse_y } => {
                Some(Self::Eject(DVec2::new(mouse_x, mouse_y)))
            }
            ClientMessage::SetName { name } => Some(Self::SetName(name)),
            ClientMessage::Chat { .. } => None,
        }
    }
}

/// Sending half of the intent queue, cloned into every connection task.
pub type IntentSender = mpsc::UnboundedSender<(u32, Intent)>;

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub world: World,
    pub tick_count: u64,
    pub start_time: std::time::Instant,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,

    intent_tx: IntentSender,
    intent_rx: mpsc::UnboundedReceiver<(u32, Intent)>,
}

impl GameState {
    /// Create a new game state with food and viruses already spawned.
    pub fn new(config: &Config) -> Self {
        let mut world = World::new(config.border.width, config.border.height, config.server.seed);
        world.spawn_food_to_target(config.food.target_count, config.food.radius);
        world.spawn_viruses(config.virus.count, config.virus.radius);

        let counts = world.counts();
        info!("World initialized: {} food, {} viruses", counts.food, counts.viruses);

        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        Self {
            config: config.clone(),
            world,
            tick_count: 0,
            start_time: std::time::Instant::now(),
            update_time_avg: 0.0,
            intent_tx,
            intent_rx,
        }
    }

    /// Handle for connections to queue intents.
    pub fn intent_sender(&self) -> IntentSender {
        self.intent_tx.clone()
    }

    /// Milliseconds since the game started.
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Spawn a player for a new connection.
    pub fn add_player(&mut self) -> u32 {
        let id = self.world.spawn_player(self.config.player.start_mass);
        if let Some(player) = self.world.players.get(&id) {
            info!("Player {} spawned at ({:.0}, {:.0})", id, player.position.x, player.position.y);
        }
        id
    }

    /// Remove a player immediately. Returns whether it was still in the world.
    pub fn remove_player(&mut self, id: u32) -> bool {
        self.world.remove_player(id).is_some()
    }

    /// Current display name, if the player is alive.
    pub fn player_name(&self, id: u32) -> Option<&str> {
        self.world.players.get(&id).map(|p| p.name.as_str())
    }

    /// Run one simulation step at `now` (ms since start) and return the
    /// snapshot to broadcast.
    pub fn tick(&mut self, now: u64) -> StateSnapshot {
        self.tick_count += 1;

        self.drain_intents(now);

        let config = &self.config;
        let world = &mut self.world;

        physics::integrate(world, config.player.friction, config.food.friction);
        physics::steer(world, config.player.speed);

        collision::resolve_food(world, &config.food);
        collision::resolve_viruses(world, &config.virus, config.player.merge_time_ms, now);
        for id in collision::resolve_players(world) {
            info!("Player {} was eaten", id);
        }

        split_merge::merge_pass(world, now);
        physics::decay_mass(world, config.player.decay_rate, config.player.min_mass);

        stats::refresh_all(world);
        if cfg!(debug_assertions) {
            world.assert_invariants();
        }

        world.snapshot()
    }

    /// Apply every queued intent. Intents from players no longer in the world are dropped.
    fn drain_intents(&mut self, now: u64) {
        while let Ok((player_id, intent)) = self.intent_rx.try_recv() {
            self.apply_intent(player_id, intent, now);
        }
    }

    fn apply_intent(&mut self, player_id: u32, intent: Intent, now: u64) {
        match intent {
            Intent::Move(target) => {
                if let Some(player) = self.world.players.get_mut(&player_id) {
                    player.target = Some(target);
                }
            }
            Intent::Split(target) => {
                split_merge::split(&mut self.world, player_id, target, &self.config.player, now);
            }
            Intent::Eject(target) => {
                split_merge::eject(
                    &mut self.world,
                    player_id,
                    target,
                    &self.config.eject,
                    self.config.player.min_eject_mass,
                );
            }
            Intent::SetName(name) => {
                if let Some(player) = self.world.players.get_mut(&player_id) {
                    player.set_name(&name, self.config.player.max_name_length);
                    debug!("Player {} is now {:?}", player_id, player.name);
                }
            }
        }
    }
}

/// Run the main game loop, publishing each tick's state as a JSON text frame.
///
/// Frames are published while the write lock is held, so a connection that
/// subscribes under the same lock only ever receives ticks that ran after it.
pub async fn run_game_loop(
    state: Arc<RwLock<GameState>>,
    state_tx: broadcast::Sender<String>,
    tick_interval_ms: u64,
) {
    let period = Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(Instant::now() + period, period);
    // An overrun delays the next tick instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let now = game.now_ms();
            let snapshot = game.tick(now);
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = tick_interval_ms as f64 * 0.9;
            if tick_ms > tick_budget {
                let counts = game.world.counts();
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells, {} food",
                    game.tick_count, tick_ms, tick_budget, counts.players, counts.cells, counts.food
                );
            }
            if game.tick_count % 400 == 0 {
                let counts = game.world.counts();
                debug!(
                    "Tick #{}: {:.2}ms avg, {} players, {} cells, {} food ({} ejected), {} viruses",
                    game.tick_count,
                    game.update_time_avg,
                    counts.players,
                    counts.cells,
                    counts.food,
                    counts.ejected,
                    counts.viruses
                );
            }

            match ServerMessage::State(snapshot).to_json() {
                // No receivers just means nobody is connected.
                Ok(json) => {
                    let _ = state_tx.send(json);
                }
                Err(e) => warn!("Failed to encode state: {}", e),
            }
        } // Write lock released here
    }
}
