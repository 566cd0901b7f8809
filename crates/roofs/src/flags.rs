use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::FlagValueError;
use crate::scene::{Tile, TileId};

pub const FLAG_NAMESPACE: &str = "roofs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKey {
    IsRoof,
    Mode,
    Open,
    Closed,
}

impl FlagKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FlagKey::IsRoof => "isRoof",
            FlagKey::Mode => "mode",
            FlagKey::Open => "open",
            FlagKey::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofMode {
    #[default]
    Auto,
    Open,
    Closed,
}

impl RoofMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RoofMode::Auto => "auto",
            RoofMode::Open => "open",
            RoofMode::Closed => "closed",
        }
    }

    pub fn next(self) -> Self {
        match self {
            RoofMode::Auto => RoofMode::Open,
            RoofMode::Open => RoofMode::Closed,
            RoofMode::Closed => RoofMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaKind {
    Open,
    Closed,
}

impl AlphaKind {
    pub fn flag_key(self) -> FlagKey {
        match self {
            AlphaKind::Open => FlagKey::Open,
            AlphaKind::Closed => FlagKey::Closed,
        }
    }
}

fn raw_flag(tile: &Tile, key: FlagKey) -> Option<&Value> {
    match tile.flag(FLAG_NAMESPACE, key.as_str()) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

fn unexpected(key: FlagKey, expected: &'static str, found: &Value) -> FlagValueError {
    FlagValueError {
        key: key.as_str(),
        expected,
        found: found.to_string(),
    }
}

pub fn read_is_roof(tile: &Tile) -> Result<bool, FlagValueError> {
    match raw_flag(tile, FlagKey::IsRoof) {
        None => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(unexpected(FlagKey::IsRoof, "bool", other)),
    }
}

pub fn read_mode(tile: &Tile) -> Result<Option<RoofMode>, FlagValueError> {
    let Some(value) = raw_flag(tile, FlagKey::Mode) else {
        return Ok(None);
    };
    RoofMode::deserialize(value)
        .map(Some)
        .map_err(|_| unexpected(FlagKey::Mode, "\"auto\" | \"open\" | \"closed\"", value))
}

pub fn read_alpha(tile: &Tile, kind: AlphaKind) -> Result<Option<f32>, FlagValueError> {
    let key = kind.flag_key();
    match raw_flag(tile, key) {
        None => Ok(None),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(alpha) => Ok(Some(alpha as f32)),
            None => Err(unexpected(key, "number", &Value::Number(number.clone()))),
        },
        Some(other) => Err(unexpected(key, "number", other)),
    }
}

/// Remembers which malformed flags were already reported so a hot
/// recalculation loop warns once per tile and key.
#[derive(Debug, Default)]
pub struct MalformedFlagLog {
    warned: HashSet<(TileId, &'static str)>,
}

impl MalformedFlagLog {
    pub fn report(&mut self, tile: TileId, error: &FlagValueError) {
        if !self.warned.insert((tile, error.key)) {
            return;
        }
        warn!(
            tile_id = tile.0,
            key = error.key,
            reason = %error,
            "roof_flag_malformed_treated_as_unset"
        );
    }

    pub fn unwrap_or_report<T>(&mut self, tile: TileId, result: Result<T, FlagValueError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(tile, &error);
                None
            }
        }
    }

    pub fn forget_tile(&mut self, tile: TileId) {
        self.warned.retain(|(warned_tile, _)| *warned_tile != tile);
    }

    pub fn warned_count(&self) -> usize {
        self.warned.len()
    }
}
