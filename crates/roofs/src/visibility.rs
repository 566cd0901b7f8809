use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::containment::is_under_roof;
use crate::flags::RoofMode;
use crate::host::{RenderHost, SceneState};
use crate::layer::RoofsLayer;
use crate::policy::{OpacityPolicy, ResolvedOpacity};
use crate::scene::{Tile, TileId, Token, TokenId};
use crate::store::{Occlusion, RoofRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
struct RoofDecision {
    state: Occlusion,
    alpha: f32,
    visible: bool,
}

struct PassContext<'a> {
    observers: &'a [&'a Token],
    grid_size: f32,
    viewer_is_gm: bool,
}

fn decide_roof(
    render: &mut dyn RenderHost,
    record: &RoofRecord,
    tile: &Tile,
    opacity: &ResolvedOpacity,
    pass: &PassContext<'_>,
    containment_tests: &mut usize,
) -> RoofDecision {
    let visible = !tile.hidden || pass.viewer_is_gm;
    let state = match opacity.mode {
        RoofMode::Closed => Occlusion::Closed,
        RoofMode::Open => Occlusion::Open,
        RoofMode::Auto if tile.hidden => Occlusion::Open,
        RoofMode::Auto => {
            let contained = pass.observers.iter().any(|token| {
                *containment_tests += 1;
                is_under_roof(render, record, tile, token, pass.grid_size)
            });
            if contained {
                Occlusion::Open
            } else {
                Occlusion::Closed
            }
        }
    };
    RoofDecision {
        state,
        alpha: opacity.alpha_for(state),
        visible,
    }
}

impl RoofsLayer {
    pub fn recalculate_all(&mut self, scene: &dyn SceneState, render: &mut dyn RenderHost) {
        let started = Instant::now();
        let observers: Vec<&Token> = scene.tokens().iter().filter(|token| token.observer).collect();
        let pass = PassContext {
            observers: &observers,
            grid_size: scene.grid_size(),
            viewer_is_gm: scene.viewer_is_gm(),
        };
        let policy = OpacityPolicy::new(&self.config.settings);
        let mut roofs = 0usize;
        let mut containment_tests = 0usize;

        for record in self.store.iter_mut() {
            let Some(tile) = scene.tile(record.tile) else {
                continue;
            };
            roofs += 1;
            let opacity = policy.resolve(tile, &mut self.malformed_flags);
            let decision = decide_roof(render, record, tile, &opacity, &pass, &mut containment_tests);
            record.state = decision.state;

            let alpha = if self.peek == Some(record.tile) {
                opacity.open
            } else {
                decision.alpha
            };
            let visible = decision.visible && !self.drag_suppressed.contains(&record.tile);
            render.set_alpha(record.nodes.container, alpha);
            render.set_visible(record.nodes.container, visible);

            if self.config.debug {
                debug!(
                    tile_id = record.tile.0,
                    mode = opacity.mode.as_str(),
                    closed = decision.state.is_closed(),
                    alpha,
                    visible,
                    "roof_recalculated"
                );
            }
        }

        self.occlude_tokens(scene, render);

        let elapsed = started.elapsed();
        self.recalc_stats.record_pass(elapsed, roofs, containment_tests);
        if self.config.debug {
            debug!(
                roofs,
                observers = observers.len(),
                containment_tests,
                elapsed_ms = elapsed.as_secs_f32() * 1000.0,
                "roofs_recalculated"
            );
        }
    }

    /// Hides every visible non-observer token standing under a closed roof
    /// and restores tokens hidden by an earlier sweep that are no longer
    /// covered. With `auto_hide` off, nothing is hidden.
    fn occlude_tokens(&mut self, scene: &dyn SceneState, render: &mut dyn RenderHost) {
        let mut occluded: HashSet<TokenId> = HashSet::new();
        if self.config.settings.auto_hide {
            let grid_size = scene.grid_size();
            for record in self.store.iter().filter(|record| record.state.is_closed()) {
                let Some(tile) = scene.tile(record.tile) else {
                    continue;
                };
                for token in scene.tokens() {
                    if token.observer || !token.visible || occluded.contains(&token.id) {
                        continue;
                    }
                    if is_under_roof(render, record, tile, token, grid_size) {
                        occluded.insert(token.id);
                    }
                }
            }
        }

        for token in &occluded {
            render.set_token_visible(*token, false);
        }
        for released in self.occluded_tokens.difference(&occluded) {
            if let Some(token) = scene.token(*released) {
                render.set_token_visible(token.id, token.visible);
            }
        }
        self.occluded_tokens = occluded;
    }

    pub fn on_token_updated(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        token: TokenId,
    ) {
        if self.config.debug {
            debug!(token_id = token.0, "roofs_token_updated");
        }
        self.recalculate_all(scene, render);
    }

    pub fn on_sight_refresh(&mut self, scene: &dyn SceneState, render: &mut dyn RenderHost) {
        self.recalculate_all(scene, render);
    }

    /// Quick peek: while a GM hovers a roof, show it at its open alpha. The
    /// preview is never persisted; hover-end recalculates normally.
    pub fn on_hover_tile(
        &mut self,
        scene: &dyn SceneState,
        render: &mut dyn RenderHost,
        tile_id: TileId,
        hovered: bool,
    ) -> bool {
        if !hovered {
            if self.peek != Some(tile_id) {
                return false;
            }
            self.peek = None;
            self.recalculate_all(scene, render);
            return true;
        }

        if self.peek.is_some_and(|peeked| peeked != tile_id) {
            // One peek at a time.
            self.peek = None;
            self.recalculate_all(scene, render);
        }
        if !self.config.settings.quick_peek || !scene.viewer_is_gm() {
            return false;
        }
        let (Some(record), Some(tile)) = (self.store.get(tile_id), scene.tile(tile_id)) else {
            return false;
        };
        let container = record.nodes.container;
        let opacity = OpacityPolicy::new(&self.config.settings).resolve(tile, &mut self.malformed_flags);
        render.set_alpha(container, opacity.open);
        self.peek = Some(tile_id);
        true
    }
}
