use tracing::debug;

use crate::host::{RenderHost, SceneState};
use crate::layer::RoofsLayer;
use crate::scene::TileId;

pub trait TileDragHandler {
    fn drag_start(&mut self, scene: &dyn SceneState, tile: TileId);
    fn drag_drop(&mut self, scene: &dyn SceneState, tile: TileId);
    fn drag_cancel(&mut self, scene: &dyn SceneState, tile: TileId);
}

impl RoofsLayer {
    /// Hides the roofs being dragged: the whole multi-selection when `tile`
    /// belongs to it, otherwise just `tile`.
    pub fn on_drag_start(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) {
        let controlled = scene.controlled_tiles();
        let dragged: Vec<TileId> = if controlled.contains(&tile) {
            controlled.to_vec()
        } else {
            vec![tile]
        };
        for dragged_tile in dragged {
            let Some(record) = self.store.get(dragged_tile) else {
                continue;
            };
            render.set_visible(record.nodes.container, false);
            if !self.drag_suppressed.contains(&dragged_tile) {
                self.drag_suppressed.push(dragged_tile);
            }
        }
        debug!(
            tile_id = tile.0,
            suppressed = self.drag_suppressed.len(),
            "roofs_drag_started"
        );
    }

    /// Drop or cancel. Visibility comes back through a full recalculation
    /// so it reflects where tokens and tiles are now.
    pub fn on_drag_end(&mut self, scene: &dyn SceneState, render: &mut dyn RenderHost) {
        if self.drag_suppressed.is_empty() {
            return;
        }
        self.drag_suppressed.clear();
        self.recalculate_all(scene, render);
    }

    pub fn is_drag_suppressed(&self, tile: TileId) -> bool {
        self.drag_suppressed.contains(&tile)
    }
}

pub struct RoofAwareDrag<H> {
    inner: H,
}

impl<H: TileDragHandler> RoofAwareDrag<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    pub fn drag_start(
        &mut self,
        layer: &mut RoofsLayer,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) {
        layer.on_drag_start(scene, render, tile);
        self.inner.drag_start(scene, tile);
    }

    pub fn drag_drop(
        &mut self,
        layer: &mut RoofsLayer,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) {
        self.inner.drag_drop(scene, tile);
        layer.on_drag_end(scene, render);
    }

    pub fn drag_cancel(
        &mut self,
        layer: &mut RoofsLayer,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile: TileId,
    ) {
        self.inner.drag_cancel(scene, tile);
        layer.on_drag_end(scene, render);
    }
}
