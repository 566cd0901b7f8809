use std::process::ExitCode;

use roofs::{
    HeadlessRenderer, HookEvent, HookQueue, RoofAwareDrag, RoofsLayer, Scene, SceneState,
    TileDragHandler, TileId,
};
use tracing::{debug, info, warn};

use super::bootstrap::AppWiring;
use super::scenario::Step;

#[derive(Debug, Default)]
pub(crate) struct HostTileDrag {
    pub(crate) started: usize,
    pub(crate) dropped: usize,
    pub(crate) cancelled: usize,
}

impl TileDragHandler for HostTileDrag {
    fn drag_start(&mut self, _scene: &dyn SceneState, tile: TileId) {
        self.started += 1;
        debug!(tile_id = tile.0, "host_drag_start");
    }

    fn drag_drop(&mut self, _scene: &dyn SceneState, tile: TileId) {
        self.dropped += 1;
        debug!(tile_id = tile.0, "host_drag_drop");
    }

    fn drag_cancel(&mut self, _scene: &dyn SceneState, tile: TileId) {
        self.cancelled += 1;
        debug!(tile_id = tile.0, "host_drag_cancel");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepReport {
    pub(crate) index: usize,
    pub(crate) action: &'static str,
    pub(crate) roofs: usize,
    pub(crate) closed: usize,
    pub(crate) hidden_tokens: usize,
    pub(crate) peeked: Option<TileId>,
}

pub(crate) struct Replay {
    scene: Scene,
    render: HeadlessRenderer,
    layer: RoofsLayer,
    hooks: HookQueue,
    drag: RoofAwareDrag<HostTileDrag>,
}

impl Replay {
    pub(crate) fn new(app: AppWiring) -> (Self, Vec<Step>) {
        let replay = Self {
            scene: app.scene,
            render: app.render,
            layer: app.layer,
            hooks: app.hooks,
            drag: RoofAwareDrag::new(HostTileDrag::default()),
        };
        (replay, app.steps)
    }

    pub(crate) fn canvas_ready(&mut self) {
        self.emit(HookEvent::CanvasReady);
        self.flush();
    }

    pub(crate) fn apply(&mut self, index: usize, step: &Step) -> StepReport {
        match step {
            Step::TagRoof { tile } => self.layer.tag_as_roof(&mut self.scene, *tile),
            Step::UntagRoof { tile } => self.layer.untag_as_roof(&mut self.scene, *tile),
            Step::ToggleRoof { tile } => {
                if self.layer.toggle_roof(&mut self.scene, *tile).is_none() {
                    warn!(tile_id = tile.0, "scenario_unknown_tile");
                }
            }
            Step::SetMode { tile, mode } => self.layer.set_mode(&mut self.scene, *tile, *mode),
            Step::CycleMode { tile } => {
                if self.layer.cycle_mode(&mut self.scene, *tile).is_none() {
                    warn!(tile_id = tile.0, "scenario_unknown_tile");
                }
            }
            Step::SetAlpha { tile, kind, alpha } => {
                self.layer.set_alpha_override(&mut self.scene, *tile, *kind, *alpha);
            }
            Step::ClearAlpha { tile, kind } => {
                self.layer.clear_alpha_override(&mut self.scene, *tile, *kind);
            }
            Step::CreateTile { tile } => {
                self.scene.upsert_tile(tile.clone());
                self.emit(HookEvent::TileCreated(tile.id));
            }
            Step::MoveTile {
                tile,
                x,
                y,
                rotation_degrees,
            } => {
                if self.move_tile(*tile, |entry| {
                    entry.x = *x;
                    entry.y = *y;
                    if let Some(rotation) = rotation_degrees {
                        entry.rotation_degrees = *rotation;
                    }
                }) {
                    self.emit(HookEvent::TileUpdated(*tile));
                }
            }
            Step::DeleteTile { tile } => {
                self.emit(HookEvent::TilePreDelete(*tile));
                self.flush();
                self.scene.remove_tile(*tile);
            }
            Step::MoveToken { token, x, y } => match self.scene.token_mut(*token) {
                Some(entry) => {
                    entry.x = *x;
                    entry.y = *y;
                    self.hooks.emit(HookEvent::TokenUpdated(*token));
                }
                None => warn!(token_id = token.0, "scenario_unknown_token"),
            },
            Step::Hover { tile, hovered } => self.emit(HookEvent::HoverTile {
                tile: *tile,
                hovered: *hovered,
            }),
            Step::Select { tiles } => self.scene.set_controlled_tiles(tiles.clone()),
            Step::DragStart { tile } => {
                self.drag
                    .drag_start(&mut self.layer, &self.scene, &mut self.render, *tile);
            }
            Step::DragDrop { tile, dx, dy } => {
                let dragged = self.dragged_tiles(*tile);
                for dragged_tile in &dragged {
                    self.move_tile(*dragged_tile, |entry| {
                        entry.x += *dx;
                        entry.y += *dy;
                    });
                }
                self.drag
                    .drag_drop(&mut self.layer, &self.scene, &mut self.render, *tile);
                for dragged_tile in dragged {
                    self.emit(HookEvent::TileUpdated(dragged_tile));
                }
            }
            Step::DragCancel { tile } => {
                self.drag
                    .drag_cancel(&mut self.layer, &self.scene, &mut self.render, *tile);
            }
            Step::SetGm { gm } => {
                self.scene.set_viewer_is_gm(*gm);
                self.emit(HookEvent::SightRefresh);
            }
            Step::Settings { settings } => {
                self.layer
                    .set_settings(&self.scene, &mut self.render, *settings);
            }
            Step::Refresh => self.emit(HookEvent::SightRefresh),
        }
        self.flush();
        self.report(index, step.label())
    }

    pub(crate) fn layer(&self) -> &RoofsLayer {
        &self.layer
    }

    pub(crate) fn render(&self) -> &HeadlessRenderer {
        &self.render
    }

    pub(crate) fn host_drag(&self) -> &HostTileDrag {
        self.drag.inner()
    }

    fn emit(&mut self, event: HookEvent) {
        self.hooks.emit(event);
    }

    /// Commits queued flag writes, announces each touched tile, and pumps
    /// until the queue is empty.
    fn flush(&mut self) {
        for tile in self.scene.commit_flag_writes() {
            self.emit(HookEvent::TileUpdated(tile));
        }
        self.layer
            .pump(&mut self.hooks, &self.scene, &mut self.render);
    }

    fn move_tile(&mut self, tile: TileId, update: impl FnOnce(&mut roofs::Tile)) -> bool {
        match self.scene.tile_mut(tile) {
            Some(entry) => {
                update(entry);
                true
            }
            None => {
                warn!(tile_id = tile.0, "scenario_unknown_tile");
                false
            }
        }
    }

    fn dragged_tiles(&self, tile: TileId) -> Vec<TileId> {
        let controlled = self.scene.controlled_tiles();
        if controlled.contains(&tile) {
            controlled.to_vec()
        } else {
            vec![tile]
        }
    }

    fn log_snapshot(&self, index: usize) {
        for record in self.layer.store().iter() {
            let Some(container) = self.render.node(record.nodes.container) else {
                continue;
            };
            info!(
                step = index,
                tile_id = record.tile.0,
                alpha = container.alpha,
                visible = container.visible,
                closed = record.state.is_closed(),
                "scenario_roof"
            );
        }
        for token in self.scene.tokens() {
            info!(
                step = index,
                token_id = token.id.0,
                name = %token.name,
                visible = self.render.token_visible(token.id).unwrap_or(token.visible),
                "scenario_token"
            );
        }
    }

    fn report(&self, index: usize, action: &'static str) -> StepReport {
        let store = self.layer.store();
        StepReport {
            index,
            action,
            roofs: store.len(),
            closed: store.iter().filter(|record| record.state.is_closed()).count(),
            hidden_tokens: self.layer.occluded_tokens().len(),
            peeked: self.layer.peeked_tile(),
        }
    }
}

pub(crate) fn replay(app: AppWiring) -> (Replay, Vec<StepReport>) {
    let (mut replay, steps) = Replay::new(app);
    replay.canvas_ready();
    let reports = steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let report = replay.apply(index, step);
            info!(
                step = report.index,
                action = report.action,
                roofs = report.roofs,
                closed = report.closed,
                hidden_tokens = report.hidden_tokens,
                peeked = ?report.peeked.map(|tile| tile.0),
                "scenario_step"
            );
            replay.log_snapshot(index);
            report
        })
        .collect();
    (replay, reports)
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let (replay, reports) = replay(app);
    let stats = replay.layer().recalc_stats();
    let drag = replay.host_drag();
    info!(
        steps = reports.len(),
        recalc_passes = stats.passes,
        recalc_avg_ms = stats.duration.avg_ms,
        recalc_max_ms = stats.duration.max_ms,
        alpha_samples = replay.render().alpha_sample_count(),
        texture_decodes = replay.render().texture_decode_count(),
        drags_started = drag.started,
        drags_dropped = drag.dropped,
        drags_cancelled = drag.cancelled,
        "scenario_finished"
    );
    ExitCode::SUCCESS
}
