use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::Vec2;
use crate::host::{FlagStore, SceneState};

pub const DEFAULT_GRID_SIZE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

/// Transform and size of the tile's own image, relative to the tile origin.
/// The image is anchored at its center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteFrame {
    pub position: Vec2,
    #[serde(default)]
    pub rotation_degrees: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub img: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation_degrees: f32,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sprite: Option<SpriteFrame>,
    #[serde(default)]
    pub flags: Map<String, Value>,
}

impl Tile {
    pub fn new(id: TileId, img: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            img: img.into(),
            x,
            y,
            width,
            height,
            rotation_degrees: 0.0,
            z: 0,
            hidden: false,
            sprite: None,
            flags: Map::new(),
        }
    }

    pub fn with_z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_sprite(mut self, sprite: SpriteFrame) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_flag(mut self, namespace: &str, key: &str, value: Value) -> Self {
        self.set_flag(namespace, key, value);
        self
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn sprite_frame(&self) -> SpriteFrame {
        self.sprite.unwrap_or(SpriteFrame {
            position: Vec2::new(self.width * 0.5, self.height * 0.5),
            rotation_degrees: 0.0,
            width: self.width,
            height: self.height,
        })
    }

    pub fn flag(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.flags
            .get(namespace)
            .and_then(Value::as_object)
            .and_then(|scope| scope.get(key))
    }

    pub fn set_flag(&mut self, namespace: &str, key: &str, value: Value) {
        let scope = self
            .flags
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !scope.is_object() {
            *scope = Value::Object(Map::new());
        }
        if let Value::Object(scope) = scope {
            scope.insert(key.to_string(), value);
        }
    }
}

fn default_token_extent() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: TokenId,
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_token_extent")]
    pub width: f32,
    #[serde(default = "default_token_extent")]
    pub height: f32,
    #[serde(default)]
    pub observer: bool,
    /// Visibility before roof occlusion is applied.
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl Token {
    pub fn new(id: TokenId, x: f32, y: f32) -> Self {
        Self {
            id,
            name: String::new(),
            x,
            y,
            width: 1.0,
            height: 1.0,
            observer: false,
            visible: true,
        }
    }

    pub fn observer(mut self) -> Self {
        self.observer = true;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingFlagWrite {
    tile: TileId,
    namespace: String,
    key: String,
    value: Value,
}

#[derive(Debug, Clone)]
pub struct Scene {
    grid_size: f32,
    viewer_is_gm: bool,
    tiles: Vec<Tile>,
    tokens: Vec<Token>,
    controlled_tiles: Vec<TileId>,
    pending_flag_writes: Vec<PendingFlagWrite>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE, false)
    }
}

impl Scene {
    pub fn new(grid_size: f32, viewer_is_gm: bool) -> Self {
        Self {
            grid_size,
            viewer_is_gm,
            tiles: Vec::new(),
            tokens: Vec::new(),
            controlled_tiles: Vec::new(),
            pending_flag_writes: Vec::new(),
        }
    }

    pub fn set_viewer_is_gm(&mut self, viewer_is_gm: bool) {
        self.viewer_is_gm = viewer_is_gm;
    }

    pub fn upsert_tile(&mut self, tile: Tile) {
        match self.tiles.iter_mut().find(|existing| existing.id == tile.id) {
            Some(existing) => *existing = tile,
            None => self.tiles.push(tile),
        }
    }

    pub fn upsert_token(&mut self, token: Token) {
        match self.tokens.iter_mut().find(|existing| existing.id == token.id) {
            Some(existing) => *existing = token,
            None => self.tokens.push(token),
        }
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|tile| tile.id == id)
    }

    pub fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.iter_mut().find(|token| token.id == id)
    }

    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        let index = self.tiles.iter().position(|tile| tile.id == id)?;
        self.controlled_tiles.retain(|controlled| *controlled != id);
        self.pending_flag_writes.retain(|write| write.tile != id);
        Some(self.tiles.remove(index))
    }

    pub fn set_controlled_tiles(&mut self, tiles: Vec<TileId>) {
        self.controlled_tiles = tiles;
    }

    pub fn pending_flag_write_count(&self) -> usize {
        self.pending_flag_writes.len()
    }

    /// Applies queued flag writes in submission order and returns each
    /// touched tile once, in the order its first write was committed.
    pub fn commit_flag_writes(&mut self) -> Vec<TileId> {
        let mut updated = Vec::new();
        for write in std::mem::take(&mut self.pending_flag_writes) {
            let Some(tile) = self.tile_mut(write.tile) else {
                continue;
            };
            tile.set_flag(&write.namespace, &write.key, write.value);
            if !updated.contains(&write.tile) {
                updated.push(write.tile);
            }
        }
        updated
    }
}

impl SceneState for Scene {
    fn grid_size(&self) -> f32 {
        self.grid_size
    }

    fn viewer_is_gm(&self) -> bool {
        self.viewer_is_gm
    }

    fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn controlled_tiles(&self) -> &[TileId] {
        &self.controlled_tiles
    }
}

impl FlagStore for Scene {
    fn write_flag(&mut self, tile: TileId, namespace: &str, key: &str, value: Value) {
        self.pending_flag_writes.push(PendingFlagWrite {
            tile,
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        });
    }
}
