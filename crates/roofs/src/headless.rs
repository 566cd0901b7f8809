use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use image::{ImageReader, RgbaImage};
use tracing::warn;

use crate::error::RoofsError;
use crate::geometry::Transform;
use crate::host::{NodeId, RenderHost, RoofNodes};
use crate::scene::{Tile, TileId, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    Sprite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub z_index: i32,
    pub alpha: f32,
    pub visible: bool,
    pub texture_key: Option<String>,
    pub width: f32,
    pub height: f32,
}

impl RenderNode {
    fn container(parent: Option<NodeId>) -> Self {
        Self {
            kind: NodeKind::Container,
            parent,
            children: Vec::new(),
            transform: Transform::default(),
            z_index: 0,
            alpha: 1.0,
            visible: true,
            texture_key: None,
            width: 0.0,
            height: 0.0,
        }
    }
}

struct LoadedTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl LoadedTexture {
    fn from_image(key: &str, image: RgbaImage) -> Result<Self, RoofsError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RoofsError::EmptyTexture {
                key: key.to_string(),
            });
        }
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    fn display_alpha(&self, x: u32, y: u32, display_w: f32, display_h: f32) -> Option<u8> {
        if !(display_w > 0.0 && display_h > 0.0) {
            return None;
        }
        let tx = (((x as f32 + 0.5) * self.width as f32 / display_w).floor() as u32)
            .min(self.width - 1);
        let ty = (((y as f32 + 0.5) * self.height as f32 / display_h).floor() as u32)
            .min(self.height - 1);
        let offset = (ty as usize * self.width as usize + tx as usize) * 4 + 3;
        self.rgba.get(offset).copied()
    }
}

pub struct HeadlessRenderer {
    asset_root: Option<PathBuf>,
    next_node_id: u64,
    nodes: HashMap<NodeId, RenderNode>,
    roof_overlay: Vec<NodeId>,
    textures: HashMap<String, Option<LoadedTexture>>,
    warned_texture_keys: HashSet<String>,
    tile_alpha: HashMap<TileId, f32>,
    token_visible: HashMap<TokenId, bool>,
    texture_decode_count: usize,
    alpha_sample_count: usize,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HeadlessRenderer {
    pub fn new(asset_root: Option<PathBuf>) -> Self {
        Self {
            asset_root,
            next_node_id: 1,
            nodes: HashMap::new(),
            roof_overlay: Vec::new(),
            textures: HashMap::new(),
            warned_texture_keys: HashSet::new(),
            tile_alpha: HashMap::new(),
            token_visible: HashMap::new(),
            texture_decode_count: 0,
            alpha_sample_count: 0,
        }
    }

    pub fn insert_texture(&mut self, key: &str, image: RgbaImage) -> Result<(), RoofsError> {
        let texture = LoadedTexture::from_image(key, image)?;
        self.textures.insert(key.to_string(), Some(texture));
        Ok(())
    }

    pub fn load_texture(&mut self, key: &str) -> Result<(), RoofsError> {
        let texture = load_texture_from_disk(self.asset_root.as_deref(), key)?;
        self.texture_decode_count += 1;
        self.textures.insert(key.to_string(), Some(texture));
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Roof containers in draw order: ascending z, ties in insertion order.
    pub fn roof_overlay_draw_order(&self) -> Vec<NodeId> {
        let mut ordered = self.roof_overlay.clone();
        ordered.sort_by_key(|id| self.nodes.get(id).map_or(0, |node| node.z_index));
        ordered
    }

    pub fn tile_alpha(&self, tile: TileId) -> f32 {
        self.tile_alpha.get(&tile).copied().unwrap_or(1.0)
    }

    pub fn token_visible(&self, token: TokenId) -> Option<bool> {
        self.token_visible.get(&token).copied()
    }

    pub fn texture_decode_count(&self) -> usize {
        self.texture_decode_count
    }

    pub fn alpha_sample_count(&self) -> usize {
        self.alpha_sample_count
    }

    fn allocate(&mut self, node: RenderNode) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        if let Some(parent) = node.parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.push(id);
        }
        self.nodes.insert(id, node);
        id
    }
}

impl RenderHost for HeadlessRenderer {
    fn create_roof_nodes(&mut self, tile: &Tile) -> RoofNodes {
        let frame = tile.sprite_frame();
        let container = self.allocate(RenderNode {
            z_index: tile.z,
            ..RenderNode::container(None)
        });
        self.roof_overlay.push(container);
        let wrapper = self.allocate(RenderNode::container(Some(container)));
        let sprite = self.allocate(RenderNode {
            kind: NodeKind::Sprite,
            texture_key: Some(tile.img.clone()),
            width: frame.width,
            height: frame.height,
            ..RenderNode::container(Some(wrapper))
        });
        RoofNodes {
            container,
            wrapper,
            sprite,
        }
    }

    fn destroy_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|child| *child != node);
        }
        self.roof_overlay.retain(|id| *id != node);
        for child in removed.children {
            self.destroy_node(child);
        }
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.transform = transform;
        }
    }

    fn set_z_index(&mut self, node: NodeId, z_index: i32) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.z_index = z_index;
        }
    }

    fn set_sprite_size(&mut self, sprite: NodeId, width: f32, height: f32) {
        if let Some(node) = self.nodes.get_mut(&sprite).filter(|node| node.kind == NodeKind::Sprite) {
            node.width = width;
            node.height = height;
        }
    }

    fn set_alpha(&mut self, node: NodeId, alpha: f32) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.alpha = alpha;
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.visible = visible;
        }
    }

    fn set_tile_alpha(&mut self, tile: TileId, alpha: f32) {
        self.tile_alpha.insert(tile, alpha);
    }

    fn set_token_visible(&mut self, token: TokenId, visible: bool) {
        self.token_visible.insert(token, visible);
    }

    fn sample_alpha(&mut self, sprite: NodeId, x: u32, y: u32) -> Option<u8> {
        self.alpha_sample_count += 1;
        let Self {
            asset_root,
            nodes,
            textures,
            warned_texture_keys,
            texture_decode_count,
            ..
        } = self;
        let node = nodes.get(&sprite)?;
        if node.kind != NodeKind::Sprite {
            return None;
        }
        let key = node.texture_key.as_deref()?;
        let texture = resolve_cached_texture(
            textures,
            warned_texture_keys,
            texture_decode_count,
            asset_root.as_deref(),
            key,
        )?;
        texture.display_alpha(x, y, node.width, node.height)
    }
}

fn resolve_cached_texture<'a>(
    cache: &'a mut HashMap<String, Option<LoadedTexture>>,
    warned_keys: &mut HashSet<String>,
    decode_count: &mut usize,
    asset_root: Option<&Path>,
    key: &str,
) -> Option<&'a LoadedTexture> {
    if !cache.contains_key(key) {
        let texture = match load_texture_from_disk(asset_root, key) {
            Ok(texture) => {
                *decode_count += 1;
                Some(texture)
            }
            Err(error) => {
                warn_texture_load_once(warned_keys, key, &error);
                None
            }
        };
        cache.insert(key.to_string(), texture);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn load_texture_from_disk(asset_root: Option<&Path>, key: &str) -> Result<LoadedTexture, RoofsError> {
    if !key_stays_under_root(key) {
        return Err(RoofsError::TextureKeyOutsideRoot {
            key: key.to_string(),
        });
    }
    let asset_root = asset_root.ok_or_else(|| RoofsError::NoAssetRoot {
        key: key.to_string(),
    })?;
    let path = asset_root.join(format!("{key}.png"));
    let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode())
        .map_err(|source| RoofsError::TextureLoad {
            key: key.to_string(),
            path: path.clone(),
            source,
        })?;
    LoadedTexture::from_image(key, decoded.to_rgba8())
}

fn warn_texture_load_once(warned_keys: &mut HashSet<String>, key: &str, error: &RoofsError) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    warn!(
        texture_key = key,
        reason = %error,
        "roof_texture_load_failed_treating_as_transparent"
    );
}

/// Keys are `/`-separated asset paths without extension, like `roofs/tavern`.
fn key_stays_under_root(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('\\')
        && Path::new(key)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}
