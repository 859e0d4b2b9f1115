//! Session-level info records and command-block placement options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Identity of the bot client, reported once at session start.
///
/// None of these fields change for the lifetime of a session, so the
/// engine fetches them a single time and caches the record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BotBasicInfo {
    /// In-game name of the bot.
    #[serde(rename = "BotName", default)]
    pub name: String,
    /// Runtime entity id.
    #[serde(rename = "BotRuntimeID", default)]
    pub runtime_id: u64,
    /// Unique entity id.
    #[serde(rename = "BotUniqueID", default)]
    pub unique_id: i64,
    /// Account identity string.
    #[serde(rename = "BotIdentity", default)]
    pub identity: String,
    /// UUID of the bot account.
    #[serde(rename = "BotUUIDStr", default)]
    pub uuid: String,
}

impl BotBasicInfo {
    /// Parses the record from its wire JSON.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// World info the client accumulates while connected.
///
/// Every field is optional: absence means the related packet has not been
/// received from the server yet.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BotExtendInfo {
    /// Packet compression threshold.
    #[serde(rename = "CompressThreshold", default)]
    pub compress_threshold: Option<i32>,
    /// World game mode.
    #[serde(rename = "WorldGameMode", default)]
    pub world_game_mode: Option<i32>,
    /// World difficulty.
    #[serde(rename = "WorldDifficulty", default)]
    pub world_difficulty: Option<i32>,
    /// Absolute world time.
    #[serde(rename = "Time", default)]
    pub time: Option<i64>,
    /// Time of day.
    #[serde(rename = "DayTime", default)]
    pub day_time: Option<i64>,
    /// Progress through the current day.
    #[serde(rename = "TimePercent", default)]
    pub time_percent: Option<f64>,
    /// Current game rules, keyed by rule name.
    #[serde(rename = "GameRules", default)]
    pub game_rules: Option<Value>,
}

impl BotExtendInfo {
    /// Parses the record from its wire JSON.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Options for placing a command block in the world.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommandBlockPlaceOption {
    /// Block X coordinate.
    #[serde(rename = "X")]
    pub x: i32,
    /// Block Y coordinate.
    #[serde(rename = "Y")]
    pub y: i32,
    /// Block Z coordinate.
    #[serde(rename = "Z")]
    pub z: i32,
    /// Block to place (`command_block`, `repeating_command_block`, ...).
    #[serde(rename = "BlockName")]
    pub block_name: String,
    /// Block state string, controls orientation.
    // wire name as the access point expects it
    #[serde(rename = "BockState")]
    pub block_state: String,
    /// Requires a redstone signal to run.
    #[serde(rename = "NeedRedStone")]
    pub need_redstone: bool,
    /// Conditional execution.
    #[serde(rename = "Conditional")]
    pub conditional: bool,
    /// Command to run.
    #[serde(rename = "Command")]
    pub command: String,
    /// Hover name of the block.
    #[serde(rename = "Name")]
    pub name: String,
    /// Tick delay between executions.
    #[serde(rename = "TickDelay")]
    pub tick_delay: i32,
    /// Whether command output is tracked.
    #[serde(rename = "ShouldTrackOutput")]
    pub track_output: bool,
    /// Execute on the first tick after placement.
    #[serde(rename = "ExecuteOnFirstTick")]
    pub execute_on_first_tick: bool,
}
