use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::host::{RenderHost, SceneState};
use crate::layer::RoofsLayer;
use crate::scene::{TileId, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    CanvasReady,
    TileCreated,
    TileUpdated,
    TilePreDelete,
    TokenUpdated,
    HoverTile,
    DragStart,
    DragDrop,
    DragCancel,
    SightRefresh,
}

pub const ROOF_HOOKS: [HookKind; 10] = [
    HookKind::CanvasReady,
    HookKind::TileCreated,
    HookKind::TileUpdated,
    HookKind::TilePreDelete,
    HookKind::TokenUpdated,
    HookKind::HoverTile,
    HookKind::DragStart,
    HookKind::DragDrop,
    HookKind::DragCancel,
    HookKind::SightRefresh,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    CanvasReady,
    TileCreated(TileId),
    TileUpdated(TileId),
    TilePreDelete(TileId),
    TokenUpdated(TokenId),
    HoverTile { tile: TileId, hovered: bool },
    DragStart(TileId),
    DragDrop(TileId),
    DragCancel(TileId),
    SightRefresh,
}

impl HookEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            HookEvent::CanvasReady => HookKind::CanvasReady,
            HookEvent::TileCreated(_) => HookKind::TileCreated,
            HookEvent::TileUpdated(_) => HookKind::TileUpdated,
            HookEvent::TilePreDelete(_) => HookKind::TilePreDelete,
            HookEvent::TokenUpdated(_) => HookKind::TokenUpdated,
            HookEvent::HoverTile { .. } => HookKind::HoverTile,
            HookEvent::DragStart(_) => HookKind::DragStart,
            HookEvent::DragDrop(_) => HookKind::DragDrop,
            HookEvent::DragCancel(_) => HookKind::DragCancel,
            HookEvent::SightRefresh => HookKind::SightRefresh,
        }
    }
}

pub trait HookBus {
    fn subscribe(&mut self, kind: HookKind);
}

#[derive(Debug, Default)]
pub struct HookQueue {
    subscribed: HashSet<HookKind>,
    pending: VecDeque<HookEvent>,
}

impl HookQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, kind: HookKind) -> bool {
        self.subscribed.contains(&kind)
    }

    /// Returns `false` and drops the event when nothing subscribed to it.
    pub fn emit(&mut self, event: HookEvent) -> bool {
        if !self.is_subscribed(event.kind()) {
            return false;
        }
        self.pending.push_back(event);
        true
    }

    pub fn pop(&mut self) -> Option<HookEvent> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl HookBus for HookQueue {
    fn subscribe(&mut self, kind: HookKind) {
        self.subscribed.insert(kind);
    }
}

impl RoofsLayer {
    pub fn register_hooks(bus: &mut dyn HookBus) {
        for kind in ROOF_HOOKS {
            bus.subscribe(kind);
        }
    }

    pub fn handle_hook(
        &mut self,
        event: HookEvent,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
    ) {
        trace!(event = ?event, "roofs_hook");
        match event {
            HookEvent::CanvasReady => self.rebuild(scene, render),
            HookEvent::TileCreated(tile) | HookEvent::TileUpdated(tile) => {
                self.on_tile_updated(scene, render, tile);
            }
            HookEvent::TilePreDelete(tile) => {
                self.on_tile_deleted(scene, render, tile);
            }
            HookEvent::TokenUpdated(token) => self.on_token_updated(scene, render, token),
            HookEvent::HoverTile { tile, hovered } => {
                self.on_hover_tile(scene, render, tile, hovered);
            }
            HookEvent::DragStart(tile) => self.on_drag_start(scene, render, tile),
            HookEvent::DragDrop(_) | HookEvent::DragCancel(_) => self.on_drag_end(scene, render),
            HookEvent::SightRefresh => self.on_sight_refresh(scene, render),
        }
    }

    pub fn pump(
        &mut self,
        queue: &mut HookQueue,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
    ) -> usize {
        let mut handled = 0;
        while let Some(event) = queue.pop() {
            self.handle_hook(event, scene, render);
            handled += 1;
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRenderer;
    use crate::host::FlagStore;
    use crate::scene::{Scene, Tile};
    use crate::settings::RoofsConfig;
    use serde_json::json;

    #[test]
    fn unsubscribed_events_are_dropped() {
        let mut queue = HookQueue::new();
        assert!(!queue.emit(HookEvent::SightRefresh));
        RoofsLayer::register_hooks(&mut queue);
        for kind in ROOF_HOOKS {
            assert!(queue.is_subscribed(kind));
        }
        assert!(queue.emit(HookEvent::SightRefresh));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pumped_events_drive_roof_lifecycle() {
        let mut scene = Scene::default();
        scene.upsert_tile(Tile::new(TileId(1), "roof", 0.0, 0.0, 10.0, 10.0));
        let mut render = HeadlessRenderer::default();
        let mut layer = RoofsLayer::new(RoofsConfig::default());
        let mut queue = HookQueue::new();
        RoofsLayer::register_hooks(&mut queue);

        scene.write_flag(TileId(1), "roofs", "isRoof", json!(true));
        for tile in scene.commit_flag_writes() {
            queue.emit(HookEvent::TileUpdated(tile));
        }
        assert_eq!(layer.pump(&mut queue, &scene, &mut render), 1);
        assert!(layer.record(TileId(1)).is_some());

        queue.emit(HookEvent::TilePreDelete(TileId(1)));
        layer.pump(&mut queue, &scene, &mut render);
        scene.remove_tile(TileId(1));
        assert!(layer.record(TileId(1)).is_none());
        assert!(queue.is_empty());
    }
}
