//! Latest mirrored state per endpoint.
//!
//! The store is a flat dispatch on `(endpoint, type)`: each recognized frame
//! either shallow-merges into a snapshot, appends to a log buffer, or
//! replaces a list. Updates are last-write-wins.
//!
//! # Dispatch Table
//!
//! | Endpoint | Frame `type` | Effect |
//! |----------|--------------|--------|
//! | `PLAYER` | `player_update` | merge `data` into player |
//! | `WORLD` | `world_update` | merge `data` into world |
//! | `LOGS` | `log`, `log_entry` | append to logs |
//! | `LOGS` | `subscribed` | logged only |
//! | `MCP_LOGS` | `log`, `log_entry` | append to MCP logs |
//! | `TOKEN_USAGE` | `token_usage_update`, `usage_response` | merge usage |
//! | `TASK_MANAGER` | `tasks_list`, `tasks_update` | replace tasks |
//! | `TASK_MANAGER` | `task_*` acks | logged only |
//! | anything else | any | counters only |

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::config::Endpoint;
use crate::error::Result;
use crate::protocol::{ParsedFrame, parse_frame};
use crate::transport::now_ms;

use super::log_buffer::{LogBuffer, LogEntry};

// ============================================================================
// Snapshot Types
// ============================================================================

/// Player position and orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub on_ground: bool,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: true,
        }
    }
}

/// Equipped items; `None` for empty slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Equipment {
    pub main_hand: Option<Value>,
    pub helmet: Option<Value>,
    pub chestplate: Option<Value>,
    pub leggings: Option<Value>,
    pub boots: Option<Value>,
}

/// Inventory summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub occupied_slots: u32,
    pub total_slots: u32,
    pub empty_slots: u32,
    pub items: Vec<Value>,
}

/// Typed view of the player snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    pub name: String,
    pub health: f64,
    pub max_health: f64,
    pub food: f64,
    pub max_food: f64,
    pub experience: f64,
    pub level: u32,
    pub gamemode: String,
    pub position: Position,
    pub equipment: Equipment,
    pub inventory: Inventory,
}

/// In-game time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTime {
    pub time_of_day: i64,
    pub formatted_time: String,
    pub day_count: i64,
}

/// Current weather.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub weather: String,
    pub formatted_weather: String,
    pub duration: i64,
}

/// Where the player is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub dimension: String,
    pub biome: String,
    pub light_level: i64,
}

/// Typed view of the world snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldData {
    pub time: WorldTime,
    pub weather: Weather,
    pub location: Location,
    pub nearby_blocks: Vec<Value>,
    pub nearby_entities: Vec<Value>,
}

/// One task from the task manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskData {
    pub id: String,
    pub details: String,
    pub done_criteria: String,
    pub progress: String,
    pub done: bool,
}

/// Per-endpoint counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EndpointStats {
    /// Wall-clock ms of the last applied frame, `0` if none.
    pub last_updated: i64,
    /// Frames applied since creation or the last clear.
    pub message_count: u64,
}

/// What `update_endpoint_data` did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Player snapshot merged.
    Player,
    /// World snapshot merged.
    World,
    /// Log entry appended.
    Log,
    /// Token usage merged.
    TokenUsage,
    /// Task list replaced.
    Tasks,
    /// Recognized but only logged.
    Acknowledged,
    /// Counters bumped, no state change.
    Counted,
    /// Frame type not handled on this endpoint.
    Ignored,
}

// ============================================================================
// DataStore
// ============================================================================

/// Shared store of the latest state pushed by each endpoint.
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct DataStore {
    state: RwLock<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    player: Map<String, Value>,
    world: Map<String, Value>,
    logs: LogBuffer,
    mcp_logs: LogBuffer,
    token_usage: Map<String, Value>,
    tasks: Vec<TaskData>,
    stats: FxHashMap<Endpoint, EndpointStats>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            player: default_object(&PlayerData::default()),
            world: default_object(&WorldData::default()),
            logs: LogBuffer::new(),
            mcp_logs: LogBuffer::new(),
            token_usage: default_token_usage(),
            tasks: Vec::new(),
            stats: FxHashMap::default(),
        }
    }
}

fn default_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn default_token_usage() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("current_usage".into(), Value::from(0));
    map.insert("limit".into(), Value::from(0));
    map.insert("reset_time".into(), Value::from(""));
    map.insert("usage_history".into(), Value::Array(Vec::new()));
    map
}

/// Copies the top-level fields of `patch` into `target`.
///
/// Non-object patches are ignored.
pub fn merge_shallow(target: &mut Map<String, Value>, patch: &Value) {
    if let Some(patch) = patch.as_object() {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

// ============================================================================
// DataStore - Dispatch
// ============================================================================

impl DataStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one inbound frame from `endpoint`.
    pub fn update_endpoint_data(&self, endpoint: Endpoint, frame: &Value) -> Applied {
        let parsed = parse_frame(frame);
        let mut state = self.state.write();

        let applied = match (endpoint, parsed) {
            (Endpoint::Player, ParsedFrame::PlayerUpdate { data }) => {
                merge_shallow(&mut state.player, data);
                Applied::Player
            }
            (Endpoint::Player, _) => Applied::Ignored,

            (Endpoint::World, ParsedFrame::WorldUpdate { data }) => {
                merge_shallow(&mut state.world, data);
                Applied::World
            }
            (Endpoint::World, _) => Applied::Ignored,

            (Endpoint::Logs, ParsedFrame::Log { entry }) => {
                state.logs.push(LogEntry::from_frame(entry));
                Applied::Log
            }
            (Endpoint::Logs, ParsedFrame::Subscribed { subscription }) => {
                debug!(?subscription, "LOGS subscription confirmed");
                Applied::Acknowledged
            }
            (Endpoint::Logs, _) => Applied::Ignored,

            (Endpoint::McpLogs, ParsedFrame::Log { entry }) => {
                state.mcp_logs.push(LogEntry::from_frame(entry));
                Applied::Log
            }
            (Endpoint::McpLogs, _) => Applied::Ignored,

            (Endpoint::TokenUsage, ParsedFrame::TokenUsage { data }) => {
                merge_token_usage(&mut state.token_usage, data);
                Applied::TokenUsage
            }
            (Endpoint::TokenUsage, _) => Applied::Ignored,

            (Endpoint::TaskManager, ParsedFrame::Tasks { tasks }) => {
                state.tasks = parse_tasks(tasks);
                Applied::Tasks
            }
            (Endpoint::TaskManager, ParsedFrame::TaskAck { kind }) => {
                debug!(kind, "Task operation acknowledged");
                Applied::Acknowledged
            }
            (Endpoint::TaskManager, _) => Applied::Ignored,

            (_, _) => Applied::Counted,
        };

        if !matches!(applied, Applied::Ignored | Applied::Acknowledged) {
            let stats = state.stats.entry(endpoint).or_default();
            stats.last_updated = now_ms();
            stats.message_count += 1;
        }

        trace!(endpoint = %endpoint, ?applied, "Store updated");
        applied
    }

    /// Resets one endpoint's state and counters.
    pub fn clear_endpoint_data(&self, endpoint: Endpoint) {
        let mut state = self.state.write();

        match endpoint {
            Endpoint::Player => state.player = default_object(&PlayerData::default()),
            Endpoint::World => state.world = default_object(&WorldData::default()),
            Endpoint::Logs => state.logs.clear(),
            Endpoint::McpLogs => state.mcp_logs.clear(),
            Endpoint::TokenUsage => state.token_usage = default_token_usage(),
            Endpoint::TaskManager => state.tasks.clear(),
            _ => {}
        }

        state.stats.insert(endpoint, EndpointStats::default());
        debug!(endpoint = %endpoint, "Store cleared");
    }
}

fn merge_token_usage(target: &mut Map<String, Value>, data: &Value) {
    if let Some(usage) = data.get("usage") {
        merge_shallow(target, usage);
    }
    if let Some(summary) = data.get("summary") {
        merge_shallow(target, summary);
    }
    if let Some(models) = data.get("models") {
        target.insert("models".to_string(), models.clone());
    }
    if data.get("total_cost").is_some() {
        merge_shallow(target, data);
    }
}

fn parse_tasks(tasks: Option<&Value>) -> Vec<TaskData> {
    let Some(items) = tasks.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<TaskData>(item.clone()) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(error = %e, "Skipping malformed task");
                None
            }
        })
        .collect()
}

// ============================================================================
// DataStore - Accessors
// ============================================================================

impl DataStore {
    /// Returns the raw player snapshot.
    #[must_use]
    pub fn player(&self) -> Value {
        Value::Object(self.state.read().player.clone())
    }

    /// Returns the typed player snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if merged fields have unexpected types.
    pub fn player_data(&self) -> Result<PlayerData> {
        Ok(serde_json::from_value(self.player())?)
    }

    /// Returns the raw world snapshot.
    #[must_use]
    pub fn world(&self) -> Value {
        Value::Object(self.state.read().world.clone())
    }

    /// Returns the typed world snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if merged fields have unexpected types.
    pub fn world_data(&self) -> Result<WorldData> {
        Ok(serde_json::from_value(self.world())?)
    }

    /// Returns all agent log entries, oldest first.
    #[must_use]
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.read().logs.to_vec()
    }

    /// Returns the newest `n` agent log entries, oldest first.
    #[must_use]
    pub fn recent_logs(&self, n: usize) -> Vec<LogEntry> {
        self.state.read().logs.recent(n)
    }

    /// Returns the number of buffered agent log entries.
    #[must_use]
    pub fn log_count(&self) -> usize {
        self.state.read().logs.len()
    }

    /// Returns all MCP log entries, oldest first.
    #[must_use]
    pub fn mcp_logs(&self) -> Vec<LogEntry> {
        self.state.read().mcp_logs.to_vec()
    }

    /// Returns the raw token usage snapshot.
    #[must_use]
    pub fn token_usage(&self) -> Value {
        Value::Object(self.state.read().token_usage.clone())
    }

    /// Returns the current task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskData> {
        self.state.read().tasks.clone()
    }

    /// Returns counters for `endpoint`.
    #[must_use]
    pub fn stats(&self, endpoint: Endpoint) -> EndpointStats {
        self.state
            .read()
            .stats
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    /// Returns frames applied for `endpoint`.
    #[inline]
    #[must_use]
    pub fn message_count(&self, endpoint: Endpoint) -> u64 {
        self.stats(endpoint).message_count
    }

    /// Returns the last update time for `endpoint`.
    #[inline]
    #[must_use]
    pub fn last_updated(&self, endpoint: Endpoint) -> i64 {
        self.stats(endpoint).last_updated
    }
}

// ============================================================================
// Tests
// ============================================================================
