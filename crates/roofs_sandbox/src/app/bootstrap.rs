use std::fs;
use std::path::PathBuf;

use roofs::{HeadlessRenderer, HookQueue, RoofsConfig, RoofsLayer, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::error::SandboxError;
use super::scenario::{parse_scenario_json, Scenario, Step};

const SCENARIO_ENV_VAR: &str = "ROOFS_SCENARIO";
pub(crate) const DEMO_SCENARIO: &str = include_str!("../../scenarios/tavern.json");

pub(crate) struct AppWiring {
    pub(crate) scene: Scene,
    pub(crate) render: HeadlessRenderer,
    pub(crate) layer: RoofsLayer,
    pub(crate) hooks: HookQueue,
    pub(crate) steps: Vec<Step>,
}

pub(crate) fn build_app() -> Result<AppWiring, SandboxError> {
    init_tracing();
    info!("=== Roofs Sandbox Startup ===");

    let scenario = match scenario_path_from_args_or_env() {
        Some(path) => {
            info!(path = %path.display(), "scenario_loading");
            load_scenario_file(path)?
        }
        None => {
            info!("scenario_builtin_demo");
            parse_scenario_json(DEMO_SCENARIO)?
        }
    };
    wire_scenario(scenario)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn scenario_path_from_args_or_env() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(SCENARIO_ENV_VAR).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty())
}

pub(crate) fn load_scenario_file(path: PathBuf) -> Result<Scenario, SandboxError> {
    let raw = fs::read_to_string(&path).map_err(|source| SandboxError::ReadScenario {
        path: path.clone(),
        source,
    })?;
    let mut scenario = parse_scenario_json(&raw)?;
    // Relative asset roots resolve against the scenario file.
    if let (Some(root), Some(parent)) = (scenario.asset_root.as_mut(), path.parent()) {
        if root.is_relative() {
            *root = parent.join(&*root);
        }
    }
    Ok(scenario)
}

pub(crate) fn wire_scenario(scenario: Scenario) -> Result<AppWiring, SandboxError> {
    let mut render = HeadlessRenderer::new(scenario.asset_root.clone());
    for texture in &scenario.textures {
        render.insert_texture(&texture.key, texture.paint())?;
    }

    let mut scene = Scene::new(scenario.grid_size, scenario.viewer_is_gm);
    for tile in scenario.tiles {
        scene.upsert_tile(tile);
    }
    for token in scenario.tokens {
        scene.upsert_token(token);
    }

    let layer = RoofsLayer::new(RoofsConfig {
        settings: scenario.settings,
        debug: scenario.debug,
    });
    let mut hooks = HookQueue::new();
    RoofsLayer::register_hooks(&mut hooks);

    info!(
        textures = scenario.textures.len(),
        steps = scenario.steps.len(),
        viewer_is_gm = scenario.viewer_is_gm,
        "scenario_wired"
    );
    Ok(AppWiring {
        scene,
        render,
        layer,
        hooks,
        steps: scenario.steps,
    })
}
