use anyhow::Result;

use crate::world::{WorldStore, DEFAULT_ROOM};

/// Render the one-line room snapshot injected into prompts.
///
/// A bot without a stored row is treated as standing in the default room.
pub fn build_scene(store: &WorldStore, bot_id: i64) -> Result<String> {
    let room_id = store
        .get_bot(bot_id)?
        .map(|bot| bot.room_id)
        .unwrap_or(DEFAULT_ROOM);

    let occupants = store.occupant_count(room_id)?;
    let item_ids = store.room_item_ids(room_id)?;

    let scene = if item_ids.is_empty() {
        format!(
            "Scene: {} guests in room {}; no visible items.",
            occupants, room_id
        )
    } else {
        let ids = item_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Scene: {} guests in room {}; visible items: {}.",
            occupants, room_id, ids
        )
    };
    Ok(scene)
}
