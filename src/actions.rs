use anyhow::Result;
use std::sync::Arc;

use crate::intent::Intent;
use crate::prompt::speaker_label;
use crate::world::{WorldStore, DEFAULT_ROOM};

/// Where a bot walks when asked to move with no destination.
const DEFAULT_WALK_TARGET: (i64, i64) = (4, 4);
/// Where purchases land, always in the default room.
const AUTO_PLACE_SPOT: (i64, i64) = (5, 5);

const INTERACT_HELP: &str =
    "Try: buy <item>, place <item> at <x> <y>, trade <item>, mission: <text>, or move to <x> <y>.";

/// Executes classified intents against the world store.
///
/// Handlers do not roll back each other: whatever an earlier write committed
/// stays even when a later write in the same turn fails.
pub struct ActionRunner {
    store: Arc<WorldStore>,
}

impl ActionRunner {
    pub fn new(store: Arc<WorldStore>) -> Self {
        Self { store }
    }

    /// Execute one intent on behalf of a bot
    pub fn run(&self, bot_id: i64, sender: &str, intent: Intent) -> Result<()> {
        match intent {
            Intent::Say { text } => self.say(bot_id, &text),
            Intent::Move { to } => self.walk(bot_id, to),
            Intent::Buy { item } => self.buy(bot_id, &item),
            Intent::Place { x, y } => self.place(bot_id, x, y),
            Intent::Trade { item } => self.trade(bot_id, sender, &item),
            Intent::Mission { text } => self.mission(bot_id, sender, &text),
            Intent::Interact => self.say(bot_id, INTERACT_HELP),
            Intent::Emote { emotion } => self.emote(bot_id, &emotion),
        }
    }

    fn say(&self, bot_id: i64, text: &str) -> Result<()> {
        self.store.record_response(bot_id, text)?;
        tracing::info!("Bot {} says: {}", bot_id, text);
        Ok(())
    }

    fn walk(&self, bot_id: i64, to: Option<(i64, i64)>) -> Result<()> {
        let (x, y) = to.unwrap_or(DEFAULT_WALK_TARGET);
        self.store.set_bot_position(bot_id, x, y)?;
        tracing::info!("Bot {} walks to ({}, {})", bot_id, x, y);
        Ok(())
    }

    fn buy(&self, bot_id: i64, item: &str) -> Result<()> {
        let Some(catalog_item) = self.store.find_catalog_item(item)? else {
            tracing::debug!(
                "Bot {} wanted '{}' but the catalog has nothing like it",
                bot_id,
                item
            );
            return Ok(());
        };

        self.store.grant_item(bot_id, catalog_item.id)?;
        self.say(bot_id, &format!("I just bought a {}!", catalog_item.name))?;
        // Every purchase lands at the fixed spot in the default room.
        self.store.place_item(
            catalog_item.id,
            DEFAULT_ROOM,
            AUTO_PLACE_SPOT.0,
            AUTO_PLACE_SPOT.1,
            0.0,
            0,
            bot_id,
        )?;
        tracing::info!(
            "Bot {} bought item {} ({})",
            bot_id,
            catalog_item.id,
            catalog_item.name
        );
        Ok(())
    }

    fn place(&self, bot_id: i64, x: i64, y: i64) -> Result<()> {
        let Some(item_id) = self.store.latest_item_for(bot_id)? else {
            tracing::debug!("Bot {} has nothing to place", bot_id);
            return Ok(());
        };

        let room_id = self
            .store
            .get_bot(bot_id)?
            .map(|bot| bot.room_id)
            .unwrap_or(DEFAULT_ROOM);
        self.store.place_item(item_id, room_id, x, y, 0.0, 0, bot_id)?;
        tracing::info!(
            "Bot {} placed item {} at ({}, {}) in room {}",
            bot_id,
            item_id,
            x,
            y,
            room_id
        );
        Ok(())
    }

    fn trade(&self, bot_id: i64, sender: &str, item: &str) -> Result<()> {
        let offer = format!(
            "I'd trade my {} for something of yours, {}!",
            item,
            speaker_label(sender)
        );
        self.say(bot_id, &offer)
    }

    fn mission(&self, bot_id: i64, sender: &str, text: &str) -> Result<()> {
        self.store.add_mission(sender, text)?;
        self.say(bot_id, &format!("New mission accepted: {}", text))
    }

    fn emote(&self, bot_id: i64, emotion: &str) -> Result<()> {
        self.store.set_bot_motto(bot_id, &format!("feeling {}", emotion))?;
        tracing::info!("Bot {} is feeling {}", bot_id, emotion);
        Ok(())
    }
}
