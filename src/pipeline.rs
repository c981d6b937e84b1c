use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::actions::ActionRunner;
use crate::context::build_scene;
use crate::identity::BotRegistry;
use crate::intent::classify;
use crate::llm_client::Completer;
use crate::memory::MemoryStore;
use crate::packet::{parse_packet, InboundChat};
use crate::persona::PersonaLibrary;
use crate::prompt::{build_prompt, extend_transcript, speaker_label};
use crate::world::WorldStore;

/// One async lock per sender, so turns from the same sender never interleave
/// their memory read-extend-write. Gates are never evicted.
pub struct TurnGates {
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnGates {
    pub fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Take the sender's gate; the returned guard is held for the whole turn.
    pub async fn acquire(&self, sender: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            gates
                .entry(sender.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        gate.lock_owned().await
    }
}

impl Default for TurnGates {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one inbound frame through parse, prompt, completion and action.
pub struct Pipeline {
    store: Arc<WorldStore>,
    registry: BotRegistry,
    personas: Arc<PersonaLibrary>,
    memory: Arc<dyn MemoryStore>,
    completer: Arc<dyn Completer>,
    actions: ActionRunner,
    gates: TurnGates,
    memory_ttl_secs: u64,
}

impl Pipeline {
    pub fn new(
        store: Arc<WorldStore>,
        personas: Arc<PersonaLibrary>,
        memory: Arc<dyn MemoryStore>,
        completer: Arc<dyn Completer>,
        memory_ttl_secs: u64,
    ) -> Self {
        Self {
            registry: BotRegistry::new(store.clone()),
            actions: ActionRunner::new(store.clone()),
            personas,
            memory,
            completer,
            gates: TurnGates::new(),
            memory_ttl_secs,
            store,
        }
    }

    /// Handle one raw frame end to end. Non-chat frames are skipped silently;
    /// a collaborator failure abandons the turn, keeping whatever earlier
    /// steps already committed.
    pub async fn handle_frame(&self, payload: &str) {
        let Some(chat) = parse_packet(payload) else {
            return;
        };
        let sender = chat.sender.clone();
        if let Err(e) = self.run_turn(chat).await {
            tracing::warn!("Turn for sender {} abandoned: {:#}", sender, e);
        }
    }

    async fn run_turn(&self, chat: InboundChat) -> Result<()> {
        let _gate = self.gates.acquire(&chat.sender).await;

        let bot_id = self.registry.resolve(&chat.sender).await?;
        let profile = self.personas.profile_for(bot_id);
        let scene = build_scene(&self.store, bot_id)?;
        let memory = self.memory.get(&chat.sender).await?;

        let prompt = build_prompt(
            &profile,
            memory.as_deref(),
            &chat.sender,
            &chat.message,
            &scene,
        );
        let reply = self.completer.complete(&prompt).await?;
        tracing::debug!("Bot {} completed a turn for sender {}", bot_id, chat.sender);

        let intent = classify(&reply);
        self.actions.run(bot_id, &chat.sender, intent)?;

        let label = speaker_label(&chat.sender);
        let transcript = extend_transcript(
            memory.as_deref(),
            &label,
            &chat.message,
            &profile.name,
            &reply,
        );
        self.memory
            .set(&chat.sender, &transcript, self.memory_ttl_secs)
            .await?;

        self.store
            .log_interaction(bot_id, &chat.sender, &chat.message, &reply)?;
        Ok(())
    }
}
