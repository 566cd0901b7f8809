use serde_json::Value;

use crate::geometry::Transform;
use crate::scene::{Tile, TileId, Token, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoofNodes {
    pub container: NodeId,
    pub wrapper: NodeId,
    /// Center-anchored image, always drawn at full opacity.
    pub sprite: NodeId,
}

pub trait RenderHost {
    fn create_roof_nodes(&mut self, tile: &Tile) -> RoofNodes;

    fn destroy_node(&mut self, node: NodeId);

    fn set_transform(&mut self, node: NodeId, transform: Transform);

    fn set_z_index(&mut self, node: NodeId, z_index: i32);

    /// Displayed size of a sprite node; alpha samples are in this space.
    fn set_sprite_size(&mut self, sprite: NodeId, width: f32, height: f32);

    fn set_alpha(&mut self, node: NodeId, alpha: f32);

    fn set_visible(&mut self, node: NodeId, visible: bool);

    fn set_tile_alpha(&mut self, tile: TileId, alpha: f32);

    fn set_token_visible(&mut self, token: TokenId, visible: bool);

    /// Alpha of the rendered sprite at pixel (`x`, `y`) of its displayed
    /// size. `None` when the sprite has no readable pixels.
    fn sample_alpha(&mut self, sprite: NodeId, x: u32, y: u32) -> Option<u8>;
}

pub trait SceneState {
    fn grid_size(&self) -> f32;

    fn viewer_is_gm(&self) -> bool;

    fn tiles(&self) -> &[Tile];

    fn tokens(&self) -> &[Token];

    fn controlled_tiles(&self) -> &[TileId];

    fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles().iter().find(|tile| tile.id == id)
    }

    fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens().iter().find(|token| token.id == id)
    }
}

/// Fire-and-forget persistence of namespaced tile flags. A committed write
/// comes back to the layer as a tile-updated notification.
pub trait FlagStore {
    fn write_flag(&mut self, tile: TileId, namespace: &str, key: &str, value: Value);
}
