//! Async command surface around the action manager.
//!
//! A single worker task owns the [`ActionManager`] (and through it all core
//! state); external producers marshal their intents through a FIFO command
//! channel, so core operations stay single-threaded and deterministic.
//! Events published on the internal bus are forwarded to a broadcast channel
//! that any number of observers may subscribe to.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use battle_core::{
    ActionTarget, BattleConfig, BattleContext, ActionRegistry, ExecutionReport, Faction, Grid,
    Position, Prediction, PriorityClass, TerrainKind, TimelineEntry, TurnStart, UnitId,
    UnitPlacement, UnitTemplate,
};

use crate::error::{Result, RuntimeError};
use crate::events::{BattleEvent, Topic};
use crate::manager::{ActionManager, ActionSummary};
use crate::providers::{NullRecommender, Recommendation, Recommender};

/// Terrain layout for a new battle. Cells default to `Normal`; overrides are
/// applied in order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridTemplate {
    pub width: u32,
    pub height: u32,
    pub terrain: Vec<(Position, TerrainKind)>,
}

impl GridTemplate {
    pub fn open(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            terrain: Vec::new(),
        }
    }

    pub fn with_wall(mut self, position: Position) -> Self {
        self.terrain.push((position, TerrainKind::Wall));
        self
    }

    pub fn build(&self) -> Grid {
        let mut grid = Grid::open(self.width, self.height);
        for &(position, terrain) in &self.terrain {
            if let Err(error) = grid.set_terrain(position, terrain) {
                tracing::warn!(%position, %error, "terrain override ignored");
            }
        }
        grid
    }
}

/// Reply to a successful `start_battle`.
#[derive(Clone, Debug)]
pub struct BattleOpened {
    pub battle_id: String,
    pub units: Vec<(UnitId, String, Faction)>,
    pub first_turn: TurnStart,
}

enum Command {
    StartBattle {
        grid: GridTemplate,
        placements: Vec<UnitPlacement>,
        seed: u64,
        reply: oneshot::Sender<Result<BattleOpened>>,
    },
    QueueAction {
        unit: UnitId,
        action_id: String,
        targets: Vec<ActionTarget>,
        priority: Option<PriorityClass>,
        prediction: Option<Prediction>,
        reply: oneshot::Sender<Result<u64>>,
    },
    ExecuteNow {
        unit: UnitId,
        action_id: String,
        targets: Vec<ActionTarget>,
        reply: oneshot::Sender<Result<ExecutionReport>>,
    },
    Preview {
        unit: UnitId,
        action_id: String,
        targets: Vec<ActionTarget>,
        reply: oneshot::Sender<Result<ExecutionReport>>,
    },
    AvailableActions {
        unit: UnitId,
        reply: oneshot::Sender<Result<Vec<ActionSummary>>>,
    },
    TimelinePreview {
        reply: oneshot::Sender<Result<Vec<TimelineEntry>>>,
    },
    EndTurn {
        unit: UnitId,
        reply: oneshot::Sender<Result<battle_core::TurnReport>>,
    },
    Recommend {
        unit: UnitId,
        reply: oneshot::Sender<Result<Vec<Recommendation>>>,
    },
    Save {
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    Load {
        blob: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Spawns the battle worker and hands back its command handle.
pub struct BattleRuntime;

impl BattleRuntime {
    pub fn spawn(
        registry: ActionRegistry,
        templates: BTreeMap<String, UnitTemplate>,
        config: BattleConfig,
    ) -> RuntimeHandle {
        Self::spawn_with_recommender(registry, templates, config, Arc::new(NullRecommender))
    }

    /// Spawns a runtime over the embedded default content.
    pub fn spawn_default() -> Result<RuntimeHandle> {
        let (registry, templates) = battle_content::load_default_content()
            .map_err(|error| RuntimeError::Content(error.to_string()))?;
        Ok(Self::spawn(registry, templates, BattleConfig::default()))
    }

    pub fn spawn_with_recommender(
        registry: ActionRegistry,
        templates: BTreeMap<String, UnitTemplate>,
        config: BattleConfig,
        recommender: Arc<dyn Recommender>,
    ) -> RuntimeHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (events_tx, _) = broadcast::channel(256);

        let worker = Worker {
            registry,
            templates,
            config,
            recommender,
            events_tx: events_tx.clone(),
            manager: None,
            battles_started: 0,
        };
        tokio::spawn(worker.run(command_rx));

        RuntimeHandle {
            command_tx,
            events_tx,
        }
    }
}

struct Worker {
    registry: ActionRegistry,
    templates: BTreeMap<String, UnitTemplate>,
    config: BattleConfig,
    recommender: Arc<dyn Recommender>,
    events_tx: broadcast::Sender<BattleEvent>,
    manager: Option<ActionManager>,
    battles_started: u64,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        tracing::debug!("battle runtime worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::StartBattle {
                grid,
                placements,
                seed,
                reply,
            } => {
                let _ = reply.send(self.start_battle(grid, placements, seed));
            }
            Command::QueueAction {
                unit,
                action_id,
                targets,
                priority,
                prediction,
                reply,
            } => {
                let result = self.manager_mut().and_then(|manager| {
                    manager.queue_action(unit, &action_id, targets, priority, prediction)
                });
                let _ = reply.send(result);
            }
            Command::ExecuteNow {
                unit,
                action_id,
                targets,
                reply,
            } => {
                let result = self
                    .manager_mut()
                    .and_then(|manager| manager.execute_immediately(unit, &action_id, &targets));
                let _ = reply.send(result);
            }
            Command::Preview {
                unit,
                action_id,
                targets,
                reply,
            } => {
                let result = self
                    .manager_mut()
                    .and_then(|manager| manager.preview(unit, &action_id, &targets));
                let _ = reply.send(result);
            }
            Command::AvailableActions { unit, reply } => {
                let result = self
                    .manager_mut()
                    .and_then(|manager| manager.available_actions(unit));
                let _ = reply.send(result);
            }
            Command::TimelinePreview { reply } => {
                let result = self
                    .manager_mut()
                    .map(|manager| manager.timeline_preview());
                let _ = reply.send(result);
            }
            Command::EndTurn { unit, reply } => {
                let result = self.manager_mut().and_then(|manager| manager.end_turn(unit));
                let _ = reply.send(result);
            }
            Command::Recommend { unit, reply } => {
                // Snapshot first so the await holds no manager borrow.
                let context = self
                    .manager_mut()
                    .and_then(|manager| manager.recommendation_context(unit));
                let result = match context {
                    Ok(context) => Ok(self.recommender.recommend_actions(&context).await),
                    Err(error) => Err(error),
                };
                let _ = reply.send(result);
            }
            Command::Save { reply } => {
                let result = self.manager_mut().and_then(|manager| manager.save());
                let _ = reply.send(result);
            }
            Command::Load { blob, reply } => {
                let result = self.manager_mut().and_then(|manager| manager.load(&blob));
                let _ = reply.send(result);
            }
        }
    }

    fn manager_mut(&mut self) -> Result<&mut ActionManager> {
        self.manager.as_mut().ok_or(RuntimeError::NoBattle)
    }

    fn start_battle(
        &mut self,
        grid: GridTemplate,
        placements: Vec<UnitPlacement>,
        seed: u64,
    ) -> Result<BattleOpened> {
        let mut context = BattleContext::new(
            self.config.clone(),
            self.registry.clone(),
            grid.build(),
            seed,
        );

        let mut units = Vec::with_capacity(placements.len());
        for placement in &placements {
            let template = self
                .templates
                .get(&placement.template_id)
                .ok_or_else(|| RuntimeError::UnknownTemplate(placement.template_id.clone()))?;
            let id = context.spawn(template, placement.faction, placement.position)?;
            units.push((id, placement.template_id.clone(), placement.faction));
        }

        let mut manager = ActionManager::new(context);
        let forward = self.events_tx.clone();
        for topic in Topic::ALL {
            let forward = forward.clone();
            manager.bus_mut().subscribe_infallible(topic, move |event| {
                let _ = forward.send(event.clone());
            });
        }

        let first_turn = manager.begin_battle()?;
        self.battles_started += 1;
        let battle_id = format!("battle-{:04}-{seed:08x}", self.battles_started);
        tracing::debug!(%battle_id, units = units.len(), "battle started");
        self.manager = Some(manager);

        Ok(BattleOpened {
            battle_id,
            units,
            first_turn,
        })
    }
}

/// Cloneable facade for issuing commands to the runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<BattleEvent>,
}

impl RuntimeHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        reply_rx
            .await
            .map_err(|_| RuntimeError::ReplyChannelClosed)?
    }

    /// Subscribe to the battle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BattleEvent> {
        self.events_tx.subscribe()
    }

    pub async fn start_battle(
        &self,
        grid: GridTemplate,
        placements: Vec<UnitPlacement>,
        seed: u64,
    ) -> Result<BattleOpened> {
        self.request(|reply| Command::StartBattle {
            grid,
            placements,
            seed,
            reply,
        })
        .await
    }

    pub async fn queue_action(
        &self,
        unit: UnitId,
        action_id: &str,
        targets: Vec<ActionTarget>,
        priority: Option<PriorityClass>,
        prediction: Option<Prediction>,
    ) -> Result<u64> {
        self.request(|reply| Command::QueueAction {
            unit,
            action_id: action_id.to_string(),
            targets,
            priority,
            prediction,
            reply,
        })
        .await
    }

    pub async fn execute_now(
        &self,
        unit: UnitId,
        action_id: &str,
        targets: Vec<ActionTarget>,
    ) -> Result<ExecutionReport> {
        self.request(|reply| Command::ExecuteNow {
            unit,
            action_id: action_id.to_string(),
            targets,
            reply,
        })
        .await
    }

    pub async fn preview(
        &self,
        unit: UnitId,
        action_id: &str,
        targets: Vec<ActionTarget>,
    ) -> Result<ExecutionReport> {
        self.request(|reply| Command::Preview {
            unit,
            action_id: action_id.to_string(),
            targets,
            reply,
        })
        .await
    }

    pub async fn available_actions(&self, unit: UnitId) -> Result<Vec<ActionSummary>> {
        self.request(|reply| Command::AvailableActions { unit, reply })
            .await
    }

    pub async fn timeline_preview(&self) -> Result<Vec<TimelineEntry>> {
        self.request(|reply| Command::TimelinePreview { reply }).await
    }

    pub async fn end_turn(&self, unit: UnitId) -> Result<battle_core::TurnReport> {
        self.request(|reply| Command::EndTurn { unit, reply }).await
    }

    /// Pull AI recommendations for a unit. Failures degrade to an empty list
    /// at the caller's discretion; the core never blocks on an external AI.
    pub async fn recommend_actions(&self, unit: UnitId) -> Result<Vec<Recommendation>> {
        self.request(|reply| Command::Recommend { unit, reply }).await
    }

    pub async fn save(&self) -> Result<Vec<u8>> {
        self.request(|reply| Command::Save { reply }).await
    }

    pub async fn load(&self, blob: Vec<u8>) -> Result<()> {
        self.request(|reply| Command::Load { blob, reply }).await
    }
}
