use std::collections::HashSet;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use roofs::{AlphaKind, RoofMode, RoofSettings, Tile, TileId, Token, TokenId, DEFAULT_GRID_SIZE};
use serde::Deserialize;

use super::error::SandboxError;

const ROOF_TEXEL: Rgba<u8> = Rgba([132, 86, 60, 255]);
const CLEAR_TEXEL: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn default_grid_size() -> f32 {
    DEFAULT_GRID_SIZE
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_grid_size")]
    pub(crate) grid_size: f32,
    #[serde(default)]
    pub(crate) viewer_is_gm: bool,
    #[serde(default)]
    pub(crate) debug: bool,
    #[serde(default)]
    pub(crate) settings: RoofSettings,
    /// PNG textures are looked up as `{asset_root}/{key}.png`.
    #[serde(default)]
    pub(crate) asset_root: Option<PathBuf>,
    #[serde(default)]
    pub(crate) textures: Vec<TextureDef>,
    #[serde(default)]
    pub(crate) tiles: Vec<Tile>,
    #[serde(default)]
    pub(crate) tokens: Vec<Token>,
    #[serde(default)]
    pub(crate) steps: Vec<Step>,
}

/// A texture painted in memory: transparent except for `opaque` rects.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct TextureDef {
    pub(crate) key: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    #[serde(default)]
    pub(crate) opaque: Vec<PixelRect>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PixelRect {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl TextureDef {
    pub(crate) fn paint(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let covered = self.opaque.iter().any(|rect| {
                x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
            });
            if covered {
                ROOF_TEXEL
            } else {
                CLEAR_TEXEL
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum Step {
    TagRoof { tile: TileId },
    UntagRoof { tile: TileId },
    ToggleRoof { tile: TileId },
    SetMode { tile: TileId, mode: RoofMode },
    CycleMode { tile: TileId },
    SetAlpha { tile: TileId, kind: AlphaKind, alpha: f32 },
    ClearAlpha { tile: TileId, kind: AlphaKind },
    CreateTile { tile: Tile },
    MoveTile {
        tile: TileId,
        x: f32,
        y: f32,
        #[serde(default)]
        rotation_degrees: Option<f32>,
    },
    DeleteTile { tile: TileId },
    MoveToken { token: TokenId, x: f32, y: f32 },
    Hover { tile: TileId, hovered: bool },
    Select { tiles: Vec<TileId> },
    DragStart { tile: TileId },
    DragDrop { tile: TileId, dx: f32, dy: f32 },
    DragCancel { tile: TileId },
    SetGm { gm: bool },
    Settings { settings: RoofSettings },
    Refresh,
}

impl Step {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Step::TagRoof { .. } => "tag_roof",
            Step::UntagRoof { .. } => "untag_roof",
            Step::ToggleRoof { .. } => "toggle_roof",
            Step::SetMode { .. } => "set_mode",
            Step::CycleMode { .. } => "cycle_mode",
            Step::SetAlpha { .. } => "set_alpha",
            Step::ClearAlpha { .. } => "clear_alpha",
            Step::CreateTile { .. } => "create_tile",
            Step::MoveTile { .. } => "move_tile",
            Step::DeleteTile { .. } => "delete_tile",
            Step::MoveToken { .. } => "move_token",
            Step::Hover { .. } => "hover",
            Step::Select { .. } => "select",
            Step::DragStart { .. } => "drag_start",
            Step::DragDrop { .. } => "drag_drop",
            Step::DragCancel { .. } => "drag_cancel",
            Step::SetGm { .. } => "set_gm",
            Step::Settings { .. } => "settings",
            Step::Refresh => "refresh",
        }
    }
}

pub(crate) fn parse_scenario_json(raw: &str) -> Result<Scenario, SandboxError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let scenario = match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
        Ok(scenario) => scenario,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return Err(if path.is_empty() || path == "." {
                SandboxError::Parse(source)
            } else {
                SandboxError::ParseAt { path, source }
            });
        }
    };
    validate_scenario(&scenario)?;
    Ok(scenario)
}

fn expected_actual(path: &str, expected: &str, actual: impl std::fmt::Display) -> SandboxError {
    SandboxError::invalid(path, format!("expected {expected}, got {actual}"))
}

fn validate_scenario(scenario: &Scenario) -> Result<(), SandboxError> {
    if !(scenario.grid_size.is_finite() && scenario.grid_size > 0.0) {
        return Err(expected_actual("gridSize", "positive number", scenario.grid_size));
    }

    let mut texture_keys = HashSet::new();
    for (index, texture) in scenario.textures.iter().enumerate() {
        if !texture_keys.insert(texture.key.as_str()) {
            return Err(SandboxError::invalid(
                format!("textures[{index}].key"),
                format!("duplicate texture key '{}'", texture.key),
            ));
        }
        if texture.width == 0 || texture.height == 0 {
            return Err(expected_actual(
                &format!("textures[{index}]"),
                "non-zero size",
                format!("{}x{}", texture.width, texture.height),
            ));
        }
        for (rect_index, rect) in texture.opaque.iter().enumerate() {
            let fits = rect.x.checked_add(rect.width).is_some_and(|right| right <= texture.width)
                && rect.y.checked_add(rect.height).is_some_and(|bottom| bottom <= texture.height);
            if !fits {
                return Err(SandboxError::invalid(
                    format!("textures[{index}].opaque[{rect_index}]"),
                    format!("rect exceeds {}x{} texture", texture.width, texture.height),
                ));
            }
        }
    }

    let mut tile_ids = HashSet::new();
    for (index, tile) in scenario.tiles.iter().enumerate() {
        validate_tile(&format!("tiles[{index}]"), tile)?;
        if !tile_ids.insert(tile.id) {
            return Err(SandboxError::invalid(
                format!("tiles[{index}].id"),
                format!("duplicate tile id {}", tile.id.0),
            ));
        }
    }

    let mut token_ids = HashSet::new();
    for (index, token) in scenario.tokens.iter().enumerate() {
        let path = format!("tokens[{index}]");
        if !(token.x.is_finite() && token.y.is_finite()) {
            return Err(expected_actual(&path, "finite position", format!("({}, {})", token.x, token.y)));
        }
        if !(token.width > 0.0 && token.height > 0.0) {
            return Err(expected_actual(
                &path,
                "positive size",
                format!("{}x{}", token.width, token.height),
            ));
        }
        if !token_ids.insert(token.id) {
            return Err(SandboxError::invalid(
                format!("{path}.id"),
                format!("duplicate token id {}", token.id.0),
            ));
        }
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        if let Step::CreateTile { tile } = step {
            validate_tile(&format!("steps[{index}].tile"), tile)?;
        }
    }
    Ok(())
}

fn validate_tile(path: &str, tile: &Tile) -> Result<(), SandboxError> {
    let numbers = [tile.x, tile.y, tile.width, tile.height, tile.rotation_degrees];
    if numbers.iter().any(|value| !value.is_finite()) {
        return Err(SandboxError::invalid(path, "tile geometry must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = parse_scenario_json("{}").expect("scenario");
        assert_eq!(scenario.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(scenario.settings, RoofSettings::default());
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn steps_are_tagged_by_action() {
        let scenario = parse_scenario_json(
            r#"{
                "steps": [
                    { "action": "tagRoof", "tile": 1 },
                    { "action": "setMode", "tile": 1, "mode": "closed" },
                    { "action": "setAlpha", "tile": 1, "kind": "open", "alpha": 0.4 },
                    { "action": "moveTile", "tile": 1, "x": 10, "y": 20, "rotationDegrees": 90 },
                    { "action": "refresh" }
                ]
            }"#,
        )
        .expect("scenario");
        let labels: Vec<_> = scenario.steps.iter().map(Step::label).collect();
        assert_eq!(labels, ["tag_roof", "set_mode", "set_alpha", "move_tile", "refresh"]);
        assert!(matches!(
            scenario.steps[3],
            Step::MoveTile {
                rotation_degrees: Some(r),
                ..
            } if r == 90.0
        ));
    }

    #[test]
    fn parse_errors_carry_the_json_path() {
        let error = parse_scenario_json(r#"{ "tiles": [ { "id": 1, "img": "a", "x": "left" } ] }"#)
            .expect_err("bad tile");
        match error {
            SandboxError::ParseAt { path, .. } => assert_eq!(path, "tiles[0].x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_tile_ids_are_rejected() {
        let error = parse_scenario_json(
            r#"{ "tiles": [
                { "id": 1, "img": "a", "x": 0, "y": 0, "width": 1, "height": 1 },
                { "id": 1, "img": "b", "x": 0, "y": 0, "width": 1, "height": 1 }
            ] }"#,
        )
        .expect_err("duplicate id");
        assert!(error.to_string().contains("tiles[1].id"), "{error}");
    }

    #[test]
    fn texture_rects_must_fit() {
        let error = parse_scenario_json(
            r#"{ "textures": [ { "key": "roof", "width": 4, "height": 4,
                "opaque": [ { "x": 2, "y": 0, "width": 3, "height": 1 } ] } ] }"#,
        )
        .expect_err("rect overflow");
        assert!(error.to_string().contains("textures[0].opaque[0]"), "{error}");
    }

    #[test]
    fn painted_texture_is_opaque_only_inside_rects() {
        let texture = TextureDef {
            key: "roof".to_string(),
            width: 4,
            height: 4,
            opaque: vec![PixelRect {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            }],
        };
        let image = texture.paint();
        assert_eq!(image.get_pixel(1, 1)[3], 255);
        assert_eq!(image.get_pixel(2, 2)[3], 255);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(image.get_pixel(3, 2)[3], 0);
    }
}
