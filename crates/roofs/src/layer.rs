use std::collections::HashSet;

use tracing::info;

use crate::flags::{read_is_roof, MalformedFlagLog};
use crate::host::{RenderHost, SceneState};
use crate::perf::{RecalcStats, RecalcStatsSnapshot};
use crate::scene::{TileId, TokenId};
use crate::settings::{RoofSettings, RoofsConfig};
use crate::store::{RoofRecord, RoofStateStore};

#[derive(Debug, Default)]
pub struct RoofsLayer {
    pub(crate) config: RoofsConfig,
    pub(crate) store: RoofStateStore,
    pub(crate) peek: Option<TileId>,
    pub(crate) drag_suppressed: Vec<TileId>,
    pub(crate) occluded_tokens: HashSet<TokenId>,
    pub(crate) malformed_flags: MalformedFlagLog,
    pub(crate) recalc_stats: RecalcStats,
}

impl RoofsLayer {
    pub fn new(config: RoofsConfig) -> Self {
        info!(
            debug = config.debug,
            auto_hide = config.settings.auto_hide,
            quick_peek = config.settings.quick_peek,
            "roofs_layer_init"
        );
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RoofsConfig {
        &self.config
    }

    pub fn settings(&self) -> &RoofSettings {
        &self.config.settings
    }

    pub fn set_settings(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        settings: RoofSettings,
    ) {
        self.config.settings = settings;
        if !settings.quick_peek {
            self.peek = None;
        }
        self.recalculate_all(scene, render);
    }

    pub fn store(&self) -> &RoofStateStore {
        &self.store
    }

    pub fn record(&self, tile: TileId) -> Option<&RoofRecord> {
        self.store.get(tile)
    }

    pub fn peeked_tile(&self) -> Option<TileId> {
        self.peek
    }

    pub fn occluded_tokens(&self) -> &HashSet<TokenId> {
        &self.occluded_tokens
    }

    pub fn recalc_stats(&self) -> RecalcStatsSnapshot {
        self.recalc_stats.snapshot()
    }

    /// Drops every record and recreates one for each tile currently flagged
    /// as a roof. Used when the host canvas is (re)initialised.
    pub fn rebuild(&mut self, scene: &dyn SceneState, render: &mut dyn RenderHost) {
        for record in self.store.drain() {
            render.destroy_node(record.nodes.container);
            render.set_tile_alpha(record.tile, 1.0);
        }
        self.peek = None;
        self.drag_suppressed.clear();

        let roof_tiles: Vec<TileId> = scene
            .tiles()
            .iter()
            .filter(|tile| {
                self.malformed_flags
                    .unwrap_or_report(tile.id, read_is_roof(tile))
                    .unwrap_or(false)
            })
            .map(|tile| tile.id)
            .collect();
        for tile in &roof_tiles {
            self.insert_roof(scene, render, *tile);
        }
        info!(roof_count = self.store.len(), "roofs_layer_rebuilt");
        self.recalculate_all(scene, render);
    }
}
