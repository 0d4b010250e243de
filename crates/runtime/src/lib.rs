//! Battle runtime: the facade, event bus, AI contract, and persistence
//! around `battle-core`.
//!
//! External producers (UI input, AI recommenders, transports) talk to a
//! single-threaded worker through [`RuntimeHandle`]; the worker owns the
//! [`manager::ActionManager`], which in turn owns all core state. Observers
//! subscribe to the typed event stream instead of polling.

pub mod error;
pub mod events;
pub mod manager;
pub mod providers;
pub mod repository;
mod runtime;

pub use error::{Result, RuntimeError};
pub use events::{BattleEvent, EventBus, HandlerFault, Topic};
pub use manager::{ActionManager, ActionSummary};
pub use providers::{
    Candidate, NullRecommender, RecommendContext, Recommendation, Recommender, ScoringRecommender,
};
pub use repository::{FileSaveRepo, InMemorySaveRepo, RepositoryError, SaveRepository};
pub use runtime::{BattleOpened, BattleRuntime, GridTemplate, RuntimeHandle};
