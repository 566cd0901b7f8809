use serde_json::Value;
use tracing::{debug, info};

use crate::containment::{container_transform, wrapper_transform};
use crate::flags::{read_is_roof, read_mode, AlphaKind, FlagKey, RoofMode, FLAG_NAMESPACE};
use crate::host::{FlagStore, RenderHost, RoofNodes, SceneState};
use crate::layer::RoofsLayer;
use crate::scene::{Tile, TileId};
use crate::settings::clamp_alpha;
use crate::store::{Occlusion, RoofRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileUpdateOutcome {
    Created,
    Destroyed,
    Synced,
    Ignored,
}

fn write_roof_flag(flags: &mut dyn FlagStore, tile: TileId, key: FlagKey, value: Value) {
    flags.write_flag(tile, FLAG_NAMESPACE, key.as_str(), value);
}

fn apply_tile_transforms(render: &mut dyn RenderHost, nodes: &RoofNodes, tile: &Tile) {
    render.set_transform(nodes.container, container_transform(tile));
    render.set_z_index(nodes.container, tile.z);
    render.set_transform(nodes.wrapper, wrapper_transform(tile));
    let frame = tile.sprite_frame();
    render.set_sprite_size(nodes.sprite, frame.width, frame.height);
}

impl RoofsLayer {
    pub fn tag_as_roof(&self, flags: &mut dyn FlagStore, tile: TileId) {
        write_roof_flag(flags, tile, FlagKey::IsRoof, Value::Bool(true));
    }

    pub fn untag_as_roof(&self, flags: &mut dyn FlagStore, tile: TileId) {
        write_roof_flag(flags, tile, FlagKey::IsRoof, Value::Bool(false));
    }

    pub fn toggle_roof<S: SceneState + FlagStore>(&mut self, host: &mut S, tile: TileId) -> Option<bool> {
        let current = host.tile(tile).map(read_is_roof)?;
        let next = !self.malformed_flags.unwrap_or_report(tile, current).unwrap_or(false);
        if next {
            self.tag_as_roof(host, tile);
        } else {
            self.untag_as_roof(host, tile);
        }
        Some(next)
    }

    pub fn set_mode(&self, flags: &mut dyn FlagStore, tile: TileId, mode: RoofMode) {
        write_roof_flag(flags, tile, FlagKey::Mode, Value::String(mode.as_str().to_string()));
    }

    pub fn cycle_mode<S: SceneState + FlagStore>(&mut self, host: &mut S, tile: TileId) -> Option<RoofMode> {
        let current = host.tile(tile).map(read_mode)?;
        let next = self
            .malformed_flags
            .unwrap_or_report(tile, current)
            .flatten()
            .unwrap_or_default()
            .next();
        self.set_mode(host, tile, next);
        Some(next)
    }

    /// HUD slider write. Clamps into `[0, 1]`; returns the value written.
    pub fn set_alpha_override(
        &self,
        flags: &mut dyn FlagStore,
        tile: TileId,
        kind: AlphaKind,
        alpha: f32,
    ) -> f32 {
        let fallback = match kind {
            AlphaKind::Open => self.config.settings.default_open,
            AlphaKind::Closed => self.config.settings.default_closed,
        };
        let alpha = clamp_alpha(alpha, fallback);
        write_roof_flag(flags, tile, kind.flag_key(), Value::from(f64::from(alpha)));
        alpha
    }

    pub fn clear_alpha_override(&self, flags: &mut dyn FlagStore, tile: TileId, kind: AlphaKind) {
        write_roof_flag(flags, tile, kind.flag_key(), Value::Null);
    }

    /// No-op when the tile already has a record or is unknown to the scene.
    pub fn create_roof(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) -> bool {
        if !self.insert_roof(scene, render, tile) {
            return false;
        }
        self.recalculate_all(scene, render);
        true
    }

    pub(crate) fn insert_roof(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile_id: TileId,
    ) -> bool {
        if self.store.contains(tile_id) {
            return false;
        }
        let Some(tile) = scene.tile(tile_id) else {
            return false;
        };
        let nodes = render.create_roof_nodes(tile);
        apply_tile_transforms(render, &nodes, tile);
        render.set_tile_alpha(tile_id, 0.0);
        self.store.insert(RoofRecord {
            tile: tile_id,
            nodes,
            state: Occlusion::Open,
        });
        info!(tile_id = tile_id.0, img = %tile.img, "roof_created");
        true
    }

    pub fn destroy_roof(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) -> bool {
        let Some(record) = self.store.remove(tile) else {
            return false;
        };
        render.destroy_node(record.nodes.container);
        render.set_tile_alpha(tile, 1.0);
        if self.peek == Some(tile) {
            self.peek = None;
        }
        self.drag_suppressed.retain(|suppressed| *suppressed != tile);
        self.malformed_flags.forget_tile(tile);
        info!(tile_id = tile.0, "roof_destroyed");
        // Tokens hidden by this roof come back on the next sweep.
        self.recalculate_all(scene, render);
        true
    }

    pub fn sync_transform(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile_id: TileId,
    ) -> bool {
        let (Some(record), Some(tile)) = (self.store.get(tile_id), scene.tile(tile_id)) else {
            return false;
        };
        apply_tile_transforms(render, &record.nodes, tile);
        if self.config.debug {
            debug!(
                tile_id = tile_id.0,
                x = tile.x,
                y = tile.y,
                rotation = tile.rotation_degrees,
                z = tile.z,
                "roof_transform_synced"
            );
        }
        self.recalculate_all(scene, render);
        true
    }

    /// Handles a tile created/updated notification. Exactly one of create,
    /// destroy, or sync runs, chosen by the current flag and whether a record
    /// exists.
    pub fn on_tile_updated(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile_id: TileId,
    ) -> TileUpdateOutcome {
        let Some(tile) = scene.tile(tile_id) else {
            // Removed without a pre-delete notification.
            if self.destroy_roof(scene, render, tile_id) {
                return TileUpdateOutcome::Destroyed;
            }
            return TileUpdateOutcome::Ignored;
        };
        let is_roof = self
            .malformed_flags
            .unwrap_or_report(tile_id, read_is_roof(tile))
            .unwrap_or(false);
        match (is_roof, self.store.contains(tile_id)) {
            (true, false) => {
                self.create_roof(scene, render, tile_id);
                TileUpdateOutcome::Created
            }
            (false, true) => {
                self.destroy_roof(scene, render, tile_id);
                TileUpdateOutcome::Destroyed
            }
            (true, true) => {
                self.sync_transform(scene, render, tile_id);
                TileUpdateOutcome::Synced
            }
            (false, false) => TileUpdateOutcome::Ignored,
        }
    }

    pub fn on_tile_deleted(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) -> bool {
        self.destroy_roof(scene, render, tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRenderer;
    use crate::scene::Scene;
    use crate::settings::RoofsConfig;
    use serde_json::json;

    fn scene_with_tile() -> Scene {
        let mut scene = Scene::default();
        scene.upsert_tile(Tile::new(TileId(1), "roof", 100.0, 200.0, 50.0, 50.0).with_z(4));
        scene
    }

    #[test]
    fn tagging_takes_effect_only_after_the_update_notification() {
        let mut scene = scene_with_tile();
        let mut render = HeadlessRenderer::default();
        let mut layer = RoofsLayer::new(RoofsConfig::default());

        layer.tag_as_roof(&mut scene, TileId(1));
        assert!(layer.record(TileId(1)).is_none());

        for tile in scene.commit_flag_writes() {
            assert_eq!(
                layer.on_tile_updated(&scene, &mut render, tile),
                TileUpdateOutcome::Created
            );
        }
        let record = layer.record(TileId(1)).expect("record");
        assert_eq!(render.tile_alpha(TileId(1)), 0.0);
        let container = render.node(record.nodes.container).expect("container");
        assert_eq!(container.transform.position.x, 100.0);
        assert_eq!(container.z_index, 4);
    }

    #[test]
    fn untag_destroys_and_restores_tile_opacity() {
        let mut scene = scene_with_tile();
        let mut render = HeadlessRenderer::default();
        let mut layer = RoofsLayer::new(RoofsConfig::default());
        layer.tag_as_roof(&mut scene, TileId(1));
        scene.commit_flag_writes();
        layer.on_tile_updated(&scene, &mut render, TileId(1));

        layer.untag_as_roof(&mut scene, TileId(1));
        scene.commit_flag_writes();
        assert_eq!(
            layer.on_tile_updated(&scene, &mut render, TileId(1)),
            TileUpdateOutcome::Destroyed
        );
        assert!(layer.record(TileId(1)).is_none());
        assert_eq!(render.tile_alpha(TileId(1)), 1.0);
        assert_eq!(render.node_count(), 0);
        assert_eq!(
            layer.on_tile_updated(&scene, &mut render, TileId(1)),
            TileUpdateOutcome::Ignored
        );
    }

    #[test]
    fn unknown_tile_update_is_ignored() {
        let scene = Scene::default();
        let mut render = HeadlessRenderer::default();
        let mut layer = RoofsLayer::new(RoofsConfig::default());
        assert_eq!(
            layer.on_tile_updated(&scene, &mut render, TileId(42)),
            TileUpdateOutcome::Ignored
        );
    }

    #[test]
    fn update_for_a_vanished_tile_releases_its_roof() {
        let mut scene = scene_with_tile();
        let mut render = HeadlessRenderer::default();
        let mut layer = RoofsLayer::new(RoofsConfig::default());
        layer.tag_as_roof(&mut scene, TileId(1));
        scene.commit_flag_writes();
        layer.on_tile_updated(&scene, &mut render, TileId(1));
        assert!(layer.record(TileId(1)).is_some());

        scene.remove_tile(TileId(1));
        assert_eq!(
            layer.on_tile_updated(&scene, &mut render, TileId(1)),
            TileUpdateOutcome::Destroyed
        );
        assert!(layer.record(TileId(1)).is_none());
        assert_eq!(render.node_count(), 0);
        assert_eq!(
            layer.on_tile_updated(&scene, &mut render, TileId(1)),
            TileUpdateOutcome::Ignored
        );
    }

    #[test]
    fn toggle_and_cycle_write_through_the_flag_store() {
        let mut scene = scene_with_tile();
        let mut layer = RoofsLayer::new(RoofsConfig::default());

        assert_eq!(layer.toggle_roof(&mut scene, TileId(1)), Some(true));
        assert_eq!(layer.cycle_mode(&mut scene, TileId(1)), Some(RoofMode::Open));
        scene.commit_flag_writes();
        let tile = scene.tile(TileId(1)).expect("tile");
        assert_eq!(tile.flag(FLAG_NAMESPACE, "isRoof"), Some(&json!(true)));
        assert_eq!(tile.flag(FLAG_NAMESPACE, "mode"), Some(&json!("open")));

        assert_eq!(layer.toggle_roof(&mut scene, TileId(1)), Some(false));
        assert_eq!(layer.cycle_mode(&mut scene, TileId(1)), Some(RoofMode::Closed));
        assert_eq!(layer.toggle_roof(&mut scene, TileId(9)), None);
    }

    #[test]
    fn alpha_override_writes_are_clamped() {
        let mut scene = scene_with_tile();
        let layer = RoofsLayer::new(RoofsConfig::default());
        assert_eq!(
            layer.set_alpha_override(&mut scene, TileId(1), AlphaKind::Closed, 1.4),
            1.0
        );
        assert_eq!(
            layer.set_alpha_override(&mut scene, TileId(1), AlphaKind::Open, f32::NAN),
            layer.settings().default_open
        );
        scene.commit_flag_writes();
        let tile = scene.tile(TileId(1)).expect("tile");
        assert_eq!(tile.flag(FLAG_NAMESPACE, "closed"), Some(&json!(1.0)));

        layer.clear_alpha_override(&mut scene, TileId(1), AlphaKind::Closed);
        scene.commit_flag_writes();
        let tile = scene.tile(TileId(1)).expect("tile");
        assert_eq!(tile.flag(FLAG_NAMESPACE, "closed"), Some(&Value::Null));
    }
}
