//! process-wide registry of per-game zk state
//!
//! the map lock is held only long enough to look up or insert an entry.
//! each game sits behind its own mutex, so consumption in one game never
//! blocks another and two consumptions in the same game are serialised.

use std::collections::HashMap;
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::field::Fr;
use crate::state::{ConsumeResult, GameSnapshot, GameZkState};

type GameHandle = Arc<Mutex<GameZkState>>;

#[derive(Clone, Default)]
pub struct GameStore {
    games: Arc<RwLock<HashMap<String, GameHandle>>>,
    config: GameConfig,
}

impl GameStore {
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    async fn handle(&self, game_id: &str) -> Option<GameHandle> {
        self.games.read().await.get(game_id).cloned()
    }

    /// load a fresh deck for `game_id`, replacing any existing state
    pub async fn create_game<S, R>(&self, game_id: &str, codes: &[S], rng: &mut R) -> Result<Fr>
    where
        S: AsRef<str>,
        R: RngCore + CryptoRng,
    {
        let mut state = GameZkState::new(game_id, self.config);
        let root = state.initialize_deck(codes, rng)?;

        let previous = self
            .games
            .write()
            .await
            .insert(game_id.to_string(), Arc::new(Mutex::new(state)));
        if previous.is_some() {
            info!("game {}: replaced existing zk state", game_id);
        }
        Ok(root)
    }

    /// rehydrate a game from a snapshot and register it under its own id
    pub async fn restore(&self, snapshot: &GameSnapshot) -> Result<Fr> {
        let state = GameZkState::restore(snapshot, self.config)?;
        let root = state.root();
        self.games
            .write()
            .await
            .insert(snapshot.game_id.clone(), Arc::new(Mutex::new(state)));
        Ok(root)
    }

    pub async fn snapshot(&self, game_id: &str) -> Option<GameSnapshot> {
        let handle = self.handle(game_id).await?;
        let state = handle.lock().await;
        Some(state.snapshot())
    }

    /// consume a card; `Ok(None)` when the game has no such card
    pub async fn consume_card(
        &self,
        game_id: &str,
        code: &str,
        position: usize,
    ) -> Result<Option<ConsumeResult>> {
        let handle = self
            .handle(game_id)
            .await
            .ok_or_else(|| Error::GameNotFound(game_id.to_string()))?;
        let mut state = handle.lock().await;
        state.consume_card(code, position)
    }

    /// run `f` with exclusive access to one game
    pub async fn with_game<T>(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut GameZkState) -> Result<T>,
    ) -> Result<T> {
        let handle = self
            .handle(game_id)
            .await
            .ok_or_else(|| Error::GameNotFound(game_id.to_string()))?;
        let mut state = handle.lock().await;
        f(&mut state)
    }

    pub async fn root(&self, game_id: &str) -> Option<Fr> {
        let handle = self.handle(game_id).await?;
        let root = handle.lock().await.root();
        Some(root)
    }

    pub async fn remove(&self, game_id: &str) -> bool {
        let removed = self.games.write().await.remove(game_id).is_some();
        if removed {
            debug!("game {}: zk state dropped", game_id);
        }
        removed
    }

    pub async fn contains(&self, game_id: &str) -> bool {
        self.games.read().await.contains_key(game_id)
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }
}
