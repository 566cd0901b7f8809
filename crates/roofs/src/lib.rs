pub mod containment;
pub mod drag;
mod error;
pub mod flags;
pub mod geometry;
pub mod headless;
pub mod hooks;
pub mod host;
mod layer;
mod lifecycle;
mod perf;
pub mod policy;
pub mod scene;
pub mod settings;
pub mod store;
mod visibility;

pub use containment::{is_under_roof, token_center, ALPHA_NOISE_FLOOR};
pub use drag::{RoofAwareDrag, TileDragHandler};
pub use error::{FlagValueError, RoofsError};
pub use flags::{AlphaKind, FlagKey, RoofMode, FLAG_NAMESPACE};
pub use geometry::{Transform, Vec2};
pub use headless::{HeadlessRenderer, NodeKind, RenderNode};
pub use hooks::{HookBus, HookEvent, HookKind, HookQueue, ROOF_HOOKS};
pub use host::{FlagStore, NodeId, RenderHost, RoofNodes, SceneState};
pub use layer::RoofsLayer;
pub use lifecycle::TileUpdateOutcome;
pub use perf::{RecalcStatsSnapshot, RollingMsStats};
pub use policy::{OpacityPolicy, ResolvedOpacity};
pub use scene::{Scene, SpriteFrame, Tile, TileId, Token, TokenId, DEFAULT_GRID_SIZE};
pub use settings::{RoofSettings, RoofsConfig};
pub use store::{Occlusion, RoofRecord, RoofStateStore};
