//! Player-related records: change notifications, ability maps, query results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::CommandOutput;
use crate::error::ProtocolError;

/// What happened to a player, as reported by a player-change event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerChange {
    /// The player just joined.
    Online,
    /// The player just left.
    Offline,
    /// The player was already present when the listener registered.
    Exist,
    /// An action string this client does not recognize.
    Other(String),
}

impl PlayerChange {
    /// Parses a wire action string.
    #[must_use]
    pub fn from_action(action: &str) -> Self {
        match action {
            "online" => Self::Online,
            "offline" => Self::Offline,
            "exist" => Self::Exist,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Per-action permissions of a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPermissionMap {
    /// May attack mobs.
    #[serde(rename = "ActionPermissionAttackMobs", default)]
    pub attack_mobs: bool,
    /// May attack other players.
    #[serde(rename = "ActionPermissionAttackPlayers", default)]
    pub attack_players: bool,
    /// May place blocks.
    #[serde(rename = "ActionPermissionBuild", default)]
    pub build: bool,
    /// May use doors and switches.
    #[serde(rename = "ActionPermissionDoorsAndSwitches", default)]
    pub doors_and_switches: bool,
    /// May mine blocks.
    #[serde(rename = "ActionPermissionMine", default)]
    pub mine: bool,
    /// May open containers.
    #[serde(rename = "ActionPermissionOpenContainers", default)]
    pub open_containers: bool,
    /// Has operator actions.
    #[serde(rename = "ActionPermissionOperator", default)]
    pub operator: bool,
    /// May teleport.
    #[serde(rename = "ActionPermissionTeleport", default)]
    pub teleport: bool,
    /// Catch-all flag the server may set.
    #[serde(rename = "ActionPermissionUnknown", default)]
    pub unknown: bool,
}

/// Adventure-mode flags of a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureFlagsMap {
    /// Flight is allowed.
    #[serde(rename = "AdventureFlagAllowFlight", default)]
    pub allow_flight: bool,
    /// Auto-jump is enabled.
    #[serde(rename = "AdventureFlagAutoJump", default)]
    pub auto_jump: bool,
    /// Currently flying.
    #[serde(rename = "AdventureFlagFlying", default)]
    pub flying: bool,
    /// Chat is muted.
    #[serde(rename = "AdventureFlagMuted", default)]
    pub muted: bool,
    /// No-clip is enabled.
    #[serde(rename = "AdventureFlagNoClip", default)]
    pub no_clip: bool,
    /// World-builder permission.
    #[serde(rename = "AdventureFlagWorldBuilder", default)]
    pub world_builder: bool,
    /// The world is immutable for this player.
    #[serde(rename = "AdventureFlagWorldImmutable", default)]
    pub world_immutable: bool,
    /// Players cannot be attacked.
    #[serde(rename = "AdventureSettingsFlagsNoMvP", default)]
    pub no_mvp: bool,
    /// Mobs cannot be attacked.
    #[serde(rename = "AdventureSettingsFlagsNoPvM", default)]
    pub no_pvm: bool,
    /// Name tags are shown.
    #[serde(rename = "AdventureSettingsFlagsShowNameTags", default)]
    pub show_name_tags: bool,
}

/// The pair of permission maps the access point reports per player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityMaps {
    /// Action permissions.
    #[serde(rename = "ActionPermissionMap", default)]
    pub action_permissions: ActionPermissionMap,
    /// Adventure flags.
    #[serde(rename = "AdventureFlagsMap", default)]
    pub adventure_flags: AdventureFlagsMap,
}

impl AbilityMaps {
    /// Parses the ability payload from its wire JSON.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Position of a player as answered by a `querytarget` command.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueriedPlayerPos {
    /// Dimension the player is in.
    pub dimension: i32,
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
    /// Yaw rotation.
    pub y_rot: f32,
}

#[derive(Deserialize)]
struct RawQueryTarget {
    #[serde(default)]
    dimension: i32,
    #[serde(rename = "yRot", default)]
    y_rot: f32,
    position: RawPosition,
}

#[derive(Deserialize, Default)]
struct RawPosition {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    z: f32,
}

impl QueriedPlayerPos {
    /// Extracts the first target's position from a `querytarget` reply.
    ///
    /// The reply nests the target list inside the first parameter of the
    /// first output message.
    pub fn from_query_output(output: &CommandOutput) -> Result<Self, ProtocolError> {
        let targets = output
            .messages
            .first()
            .and_then(|message| message.parameters.first())
            .ok_or_else(|| {
                ProtocolError::UnexpectedShape("query reply carries no parameters".to_string())
            })?;
        let first = targets.get(0).ok_or_else(|| {
            ProtocolError::UnexpectedShape("query reply matched no targets".to_string())
        })?;
        Self::from_target_value(first)
    }

    fn from_target_value(value: &Value) -> Result<Self, ProtocolError> {
        let raw: RawQueryTarget = serde_json::from_value(value.clone())?;
        Ok(Self {
            dimension: raw.dimension,
            x: raw.position.x,
            y: raw.position.y,
            z: raw.position.z,
            y_rot: raw.y_rot,
        })
    }
}
