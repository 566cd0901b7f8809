use crate::flags::{read_alpha, read_mode, AlphaKind, MalformedFlagLog, RoofMode};
use crate::scene::Tile;
use crate::settings::RoofSettings;
use crate::store::Occlusion;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOpacity {
    pub open: f32,
    pub closed: f32,
    pub mode: RoofMode,
}

impl ResolvedOpacity {
    pub fn alpha_for(&self, state: Occlusion) -> f32 {
        match state {
            Occlusion::Open => self.open,
            Occlusion::Closed => self.closed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpacityPolicy<'a> {
    settings: &'a RoofSettings,
}

impl<'a> OpacityPolicy<'a> {
    pub fn new(settings: &'a RoofSettings) -> Self {
        Self { settings }
    }

    pub fn resolve(&self, tile: &Tile, malformed: &mut MalformedFlagLog) -> ResolvedOpacity {
        let open = malformed
            .unwrap_or_report(tile.id, read_alpha(tile, AlphaKind::Open))
            .flatten()
            .unwrap_or(self.settings.default_open);
        let closed = malformed
            .unwrap_or_report(tile.id, read_alpha(tile, AlphaKind::Closed))
            .flatten()
            .unwrap_or(self.settings.default_closed);
        let mode = malformed
            .unwrap_or_report(tile.id, read_mode(tile))
            .flatten()
            .unwrap_or_default();
        ResolvedOpacity { open, closed, mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FLAG_NAMESPACE;
    use crate::scene::TileId;
    use serde_json::json;

    fn bare_tile() -> Tile {
        Tile::new(TileId(1), "roof", 0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn unset_tile_uses_world_defaults_and_auto() {
        let settings = RoofSettings {
            default_open: 0.3,
            default_closed: 0.9,
            ..RoofSettings::default()
        };
        let resolved =
            OpacityPolicy::new(&settings).resolve(&bare_tile(), &mut MalformedFlagLog::default());
        assert_eq!(
            resolved,
            ResolvedOpacity {
                open: 0.3,
                closed: 0.9,
                mode: RoofMode::Auto
            }
        );
    }

    #[test]
    fn tile_overrides_win_and_are_not_clamped() {
        let tile = bare_tile()
            .with_flag(FLAG_NAMESPACE, "open", json!(0.0))
            .with_flag(FLAG_NAMESPACE, "closed", json!(1.25))
            .with_flag(FLAG_NAMESPACE, "mode", json!("closed"));
        let settings = RoofSettings::default();
        let resolved = OpacityPolicy::new(&settings).resolve(&tile, &mut MalformedFlagLog::default());
        assert_eq!(resolved.open, 0.0);
        assert_eq!(resolved.closed, 1.25);
        assert_eq!(resolved.mode, RoofMode::Closed);
        assert_eq!(resolved.alpha_for(Occlusion::Closed), 1.25);
    }

    #[test]
    fn malformed_overrides_fall_back_and_are_logged() {
        let tile = bare_tile()
            .with_flag(FLAG_NAMESPACE, "open", json!("clear"))
            .with_flag(FLAG_NAMESPACE, "mode", json!(3));
        let settings = RoofSettings::default();
        let mut log = MalformedFlagLog::default();
        let resolved = OpacityPolicy::new(&settings).resolve(&tile, &mut log);
        assert_eq!(resolved.open, settings.default_open);
        assert_eq!(resolved.mode, RoofMode::Auto);
        assert_eq!(log.warned_count(), 2);
    }
}
