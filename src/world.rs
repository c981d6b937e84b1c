use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Room every bot wakes up in.
pub const DEFAULT_ROOM: i64 = 1;

const DEFAULT_LOOK: &str = "hr-115-42.hd-195-19.ch-3030-82.lg-275-1408.sh-295-62";
const DEFAULT_MOTTO: &str = "Ask me anything";
const DEFAULT_WALK_MODE: &str = "freeroam";
const DEFAULT_PERSONA_TAG: &str = "default";

/// One row of the bots table.
#[derive(Debug, Clone)]
pub struct BotRecord {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    pub motto: String,
    pub look: String,
    pub x: i64,
    pub y: i64,
    pub z: f64,
    pub rotation: i64,
    pub walk_mode: String,
    pub persona_tag: String,
}

/// An item the catalog knows how to sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

/// Persistent world state shared by turn tasks and the routine scheduler.
pub struct WorldStore {
    conn: Mutex<Connection>,
}

impl WorldStore {
    /// Helper to lock the connection
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("World store lock poisoned: {}", e))
    }

    /// Create or open the world database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open world database at {:?}", path.as_ref()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the schema on first start
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS bots (
                id INTEGER PRIMARY KEY,
                room_id INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE,
                motto TEXT NOT NULL,
                look TEXT NOT NULL,
                x INTEGER NOT NULL,
                y INTEGER NOT NULL,
                z REAL NOT NULL,
                rotation INTEGER NOT NULL,
                walk_mode TEXT NOT NULL,
                persona_tag TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS bot_responses (
                id INTEGER PRIMARY KEY,
                bot_id INTEGER NOT NULL,
                keywords TEXT NOT NULL,
                response_text TEXT NOT NULL,
                serve_id INTEGER NOT NULL DEFAULT 0,
                trigger_id INTEGER NOT NULL DEFAULT 0
            )"#,
            [],
        )?;

        // Written by the world server; this process only counts rows.
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS room_occupancy (
                room_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS room_items (
                id INTEGER PRIMARY KEY,
                item_id INTEGER NOT NULL,
                room_id INTEGER NOT NULL,
                x INTEGER NOT NULL,
                y INTEGER NOT NULL,
                z REAL NOT NULL,
                rot INTEGER NOT NULL,
                user_id INTEGER NOT NULL
            )"#,
            [],
        )?;

        // Provisioned by the world server; this process only reads it.
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS item_catalog (
                id INTEGER PRIMARY KEY,
                item_name TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS user_items (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                item_id INTEGER NOT NULL
            )"#,
            [],
        )?;

        // user_id is TEXT so the anonymous sender sentinel is storable.
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS missions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                mission_text TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS interaction_logs (
                id INTEGER PRIMARY KEY,
                bot_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                input_text TEXT NOT NULL,
                output_text TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bots_name ON bots(name)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_user_items_user_id ON user_items(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_interaction_logs_bot_id ON interaction_logs(bot_id)",
            [],
        )?;

        Ok(())
    }

    // ========================================================================
    // Bots
    // ========================================================================

    /// Look up a bot id by its unique name
    pub fn find_bot_by_name(&self, name: &str) -> Result<Option<i64>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row("SELECT id FROM bots WHERE name = ?1", [name], |row| {
            row.get(0)
        });

        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a bot with the fixed spawn defaults, returning its id
    pub fn create_bot(&self, name: &str) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO bots (room_id, name, motto, look, x, y, z, rotation, walk_mode, persona_tag)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                DEFAULT_ROOM,
                name,
                DEFAULT_MOTTO,
                DEFAULT_LOOK,
                2,
                2,
                0.0,
                2,
                DEFAULT_WALK_MODE,
                DEFAULT_PERSONA_TAG
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch the full bot row
    pub fn get_bot(&self, bot_id: i64) -> Result<Option<BotRecord>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT id, room_id, name, motto, look, x, y, z, rotation, walk_mode, persona_tag
             FROM bots WHERE id = ?1",
            [bot_id],
            |row| {
                Ok(BotRecord {
                    id: row.get(0)?,
                    room_id: row.get(1)?,
                    name: row.get(2)?,
                    motto: row.get(3)?,
                    look: row.get(4)?,
                    x: row.get(5)?,
                    y: row.get(6)?,
                    z: row.get(7)?,
                    rotation: row.get(8)?,
                    walk_mode: row.get(9)?,
                    persona_tag: row.get(10)?,
                })
            },
        );

        match result {
            Ok(bot) => Ok(Some(bot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Walk a bot to new coordinates
    pub fn set_bot_position(&self, bot_id: i64, x: i64, y: i64) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE bots SET x = ?1, y = ?2 WHERE id = ?3",
            params![x, y, bot_id],
        )?;
        Ok(())
    }

    /// Rewrite a bot's motto
    pub fn set_bot_motto(&self, bot_id: i64, motto: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE bots SET motto = ?1 WHERE id = ?2",
            params![motto, bot_id],
        )?;
        Ok(())
    }

    /// Every bot id currently provisioned, oldest first
    pub fn all_bot_ids(&self) -> Result<Vec<i64>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM bots ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ========================================================================
    // Responses
    // ========================================================================

    /// Record a line for the world server to speak through the bot
    pub fn record_response(&self, bot_id: i64, text: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO bot_responses (bot_id, keywords, response_text, serve_id, trigger_id)
             VALUES (?1, ?2, ?3, 0, 0)",
            params![bot_id, "ai", text],
        )?;
        Ok(())
    }

    // ========================================================================
    // Rooms
    // ========================================================================

    /// Number of users the occupancy table lists for a room
    pub fn occupant_count(&self, room_id: i64) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM room_occupancy WHERE room_id = ?1",
            [room_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Item ids currently placed in a room, oldest first
    pub fn room_item_ids(&self, room_id: i64) -> Result<Vec<i64>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT item_id FROM room_items WHERE room_id = ?1 ORDER BY id ASC")?;
        let ids = stmt
            .query_map([room_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Drop an item into a room
    pub fn place_item(
        &self,
        item_id: i64,
        room_id: i64,
        x: i64,
        y: i64,
        z: f64,
        rot: i64,
        bot_id: i64,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO room_items (item_id, room_id, x, y, z, rot, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![item_id, room_id, x, y, z, rot, bot_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Find the first catalog item whose name contains the query
    pub fn find_catalog_item(&self, query: &str) -> Result<Option<CatalogItem>> {
        let conn = self.lock_conn()?;
        let pattern = format!("%{}%", query);
        let result = conn.query_row(
            "SELECT id, item_name FROM item_catalog WHERE item_name LIKE ?1 ORDER BY id ASC LIMIT 1",
            [pattern],
            |row| {
                Ok(CatalogItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record item ownership for a bot
    pub fn grant_item(&self, bot_id: i64, item_id: i64) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO user_items (user_id, item_id) VALUES (?1, ?2)",
            params![bot_id, item_id],
        )?;
        Ok(())
    }

    /// The most recently granted item for a bot, if any
    pub fn latest_item_for(&self, bot_id: i64) -> Result<Option<i64>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT item_id FROM user_items WHERE user_id = ?1 ORDER BY id DESC LIMIT 1",
            [bot_id],
            |row| row.get(0),
        );

        match result {
            Ok(item_id) => Ok(Some(item_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Missions and logs
    // ========================================================================

    /// File a mission on behalf of an external user
    pub fn add_mission(&self, user_id: &str, mission_text: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO missions (user_id, mission_text) VALUES (?1, ?2)",
            params![user_id, mission_text],
        )?;
        Ok(())
    }

    /// Append one completed turn to the interaction log
    pub fn log_interaction(
        &self,
        bot_id: i64,
        user_id: &str,
        input: &str,
        output: &str,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO interaction_logs (bot_id, user_id, input_text, output_text, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![bot_id, user_id, input, output, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
