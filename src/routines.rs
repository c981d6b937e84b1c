use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::packet::encode_chat;
use crate::persona::PersonaLibrary;
use crate::world::WorldStore;

/// Emits each bot's clock-keyed routine actions through the transport.
///
/// Runs on its own one-minute interval, independent of connection state.
/// Packets go through the bounded outbound channel; when the transport is
/// down or the channel is full, the packet is dropped, not queued forever.
pub struct RoutineScheduler {
    store: Arc<WorldStore>,
    personas: Arc<PersonaLibrary>,
    outbound: flume::Sender<String>,
    shutdown: tokio::sync::watch::Receiver<bool>,
    last_key: Option<String>,
}

impl RoutineScheduler {
    pub fn new(
        store: Arc<WorldStore>,
        personas: Arc<PersonaLibrary>,
        outbound: flume::Sender<String>,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            personas,
            outbound,
            shutdown,
            last_key: None,
        }
    }

    /// Run until shutdown. The first tick lands a full period after start,
    /// not immediately.
    pub async fn run(mut self) {
        let period = Duration::from_secs(60);
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    let key = Local::now().format("%H:%M").to_string();
                    self.tick(&key);
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// One scheduler pass for a clock key. A repeat of the previous key
    /// emits nothing, so each minute fires at most once.
    fn tick(&mut self, key: &str) {
        if self.last_key.as_deref() == Some(key) {
            return;
        }
        self.last_key = Some(key.to_string());

        for packet in self.due_emissions(key) {
            if let Err(e) = self.outbound.try_send(packet) {
                tracing::warn!("Dropped routine packet at {}: {}", key, e);
            }
        }
    }

    /// Outbound packets due at a clock key, one per bot whose routine table
    /// names it. Bots without a routine entry are skipped silently.
    fn due_emissions(&self, key: &str) -> Vec<String> {
        let bot_ids = match self.store.all_bot_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Routine tick could not list bots: {:#}", e);
                return Vec::new();
            }
        };

        let mut packets = Vec::new();
        for bot_id in bot_ids {
            let profile = self.personas.profile_for(bot_id);
            let Some(action) = profile.routine.get(key) else {
                continue;
            };
            // "say hello" speaks "hello"; anything else is spoken whole.
            let message = action.strip_prefix("say ").unwrap_or(action);
            tracing::info!("Bot {} runs its {} routine: {}", bot_id, key, action);
            packets.push(encode_chat(message, bot_id));
        }
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _world_dir: tempfile::TempDir,
        persona_dir: tempfile::TempDir,
        store: Arc<WorldStore>,
        outbound_rx: flume::Receiver<String>,
        _shutdown_tx: tokio::sync::watch::Sender<bool>,
        scheduler: RoutineScheduler,
    }

    fn fixture() -> Fixture {
        let world_dir = tempfile::tempdir().expect("temp dir");
        let persona_dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(WorldStore::open(world_dir.path().join("world.db")).expect("open"));
        let (outbound_tx, outbound_rx) = flume::bounded(8);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let scheduler = RoutineScheduler::new(
            store.clone(),
            Arc::new(PersonaLibrary::new(persona_dir.path())),
            outbound_tx,
            shutdown_rx,
        );
        Fixture {
            _world_dir: world_dir,
            persona_dir,
            store,
            outbound_rx,
            _shutdown_tx: shutdown_tx,
            scheduler,
        }
    }

    impl Fixture {
        fn write_persona(&self, bot_id: i64, body: &str) {
            fs::write(
                self.persona_dir.path().join(format!("{}.json", bot_id)),
                body,
            )
            .expect("write persona");
        }

        fn drained(&self) -> Vec<String> {
            self.outbound_rx.drain().collect()
        }
    }

    #[test]
    fn routine_entry_fires_once_per_minute_key() {
        let mut fx = fixture();
        let bot_id = fx.store.create_bot("bot_3").expect("create");
        fx.write_persona(
            bot_id,
            r#"{"name":"Dax","tone":"wry","routine":{"14:00":"say hello"}}"#,
        );

        fx.scheduler.tick("14:00");
        assert_eq!(fx.drained(), vec![encode_chat("hello", bot_id)]);

        // The same minute again, and the next minute, both stay quiet.
        fx.scheduler.tick("14:00");
        assert!(fx.drained().is_empty());
        fx.scheduler.tick("14:01");
        assert!(fx.drained().is_empty());
    }

    #[test]
    fn non_say_actions_are_spoken_whole() {
        let mut fx = fixture();
        let bot_id = fx.store.create_bot("bot_1").expect("create");
        fx.write_persona(
            bot_id,
            r#"{"name":"Mim","tone":"curt","routine":{"09:30":"stretch and yawn"}}"#,
        );

        fx.scheduler.tick("09:30");
        assert_eq!(fx.drained(), vec![encode_chat("stretch and yawn", bot_id)]);
    }

    #[test]
    fn bots_without_a_matching_entry_are_skipped() {
        let mut fx = fixture();
        let with = fx.store.create_bot("bot_a").expect("create");
        let without = fx.store.create_bot("bot_b").expect("create");
        fx.write_persona(
            with,
            r#"{"name":"Ana","tone":"calm","routine":{"08:00":"say good morning"}}"#,
        );
        fx.write_persona(without, r#"{"name":"Bo","tone":"flat"}"#);
        // A third bot with no persona file at all falls back quietly.
        fx.store.create_bot("bot_c").expect("create");

        fx.scheduler.tick("08:00");
        assert_eq!(fx.drained(), vec![encode_chat("good morning", with)]);
    }

    #[test]
    fn malformed_persona_files_never_break_a_tick() {
        let mut fx = fixture();
        let broken = fx.store.create_bot("bot_x").expect("create");
        let good = fx.store.create_bot("bot_y").expect("create");
        fx.write_persona(broken, "{not json");
        fx.write_persona(
            good,
            r#"{"name":"Yve","tone":"bright","routine":{"17:45":"say closing soon"}}"#,
        );

        fx.scheduler.tick("17:45");
        assert_eq!(fx.drained(), vec![encode_chat("closing soon", good)]);
    }

    #[test]
    fn a_dead_outbound_channel_is_not_fatal() {
        let mut fx = fixture();
        let bot_id = fx.store.create_bot("bot_1").expect("create");
        fx.write_persona(
            bot_id,
            r#"{"name":"Dax","tone":"wry","routine":{"14:00":"say hello"}}"#,
        );

        drop(fx.outbound_rx);
        fx.scheduler.tick("14:00");
    }
}
