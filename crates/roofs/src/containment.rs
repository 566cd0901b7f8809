use tracing::trace;

use crate::geometry::{canvas_to_local, Transform, Vec2};
use crate::host::RenderHost;
use crate::scene::{Tile, Token};
use crate::store::RoofRecord;

/// Alpha values at or below this are transparent. GPU readback can round a
/// true zero up to one.
pub const ALPHA_NOISE_FLOOR: u8 = 1;

pub fn token_center(token: &Token, grid_size: f32) -> Vec2 {
    Vec2::new(
        token.x + token.width * grid_size * 0.5,
        token.y + token.height * grid_size * 0.5,
    )
}

pub fn container_transform(tile: &Tile) -> Transform {
    Transform::from_degrees(tile.position(), tile.rotation_degrees)
}

pub fn wrapper_transform(tile: &Tile) -> Transform {
    let frame = tile.sprite_frame();
    Transform::from_degrees(frame.position, frame.rotation_degrees)
}

pub fn canvas_to_sprite_local(tile: &Tile, point: Vec2) -> Vec2 {
    let frame = tile.sprite_frame();
    let centered = canvas_to_local(point, &[container_transform(tile), wrapper_transform(tile)]);
    Vec2::new(
        centered.x + frame.width * 0.5,
        centered.y + frame.height * 0.5,
    )
}

/// Nearest pixel for a local point, or `None` outside
/// `[0, width) x [0, height)` or for a degenerate sprite.
pub fn sprite_pixel(local: Vec2, width: f32, height: f32) -> Option<(u32, u32)> {
    if !local.is_finite() || !(width.is_finite() && height.is_finite()) {
        return None;
    }
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    if local.x < 0.0 || local.y < 0.0 || local.x >= width || local.y >= height {
        return None;
    }
    let max_x = (width.ceil() as u32).saturating_sub(1);
    let max_y = (height.ceil() as u32).saturating_sub(1);
    Some((
        (local.x.round() as u32).min(max_x),
        (local.y.round() as u32).min(max_y),
    ))
}

pub fn is_opaque(alpha: u8) -> bool {
    alpha > ALPHA_NOISE_FLOOR
}

/// Every failure path (degenerate sprite, unreadable pixels) answers `false`.
pub fn is_under_roof(
    render: &mut dyn RenderHost,
    record: &RoofRecord,
    tile: &Tile,
    token: &Token,
    grid_size: f32,
) -> bool {
    let frame = tile.sprite_frame();
    let center = token_center(token, grid_size);
    let local = canvas_to_sprite_local(tile, center);
    let Some((x, y)) = sprite_pixel(local, frame.width, frame.height) else {
        return false;
    };
    let Some(alpha) = render.sample_alpha(record.nodes.sprite, x, y) else {
        trace!(
            tile_id = tile.id.0,
            token_id = token.id.0,
            "roof_alpha_sample_unavailable"
        );
        return false;
    };
    is_opaque(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SpriteFrame, TileId, TokenId};

    fn approx_eq_vec2(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn token_center_scales_footprint_by_grid() {
        let token = Token::new(TokenId(1), 100.0, 200.0).with_size(2.0, 1.0);
        assert_eq!(token_center(&token, 50.0), Vec2::new(150.0, 225.0));
    }

    #[test]
    fn unrotated_tile_maps_canvas_offset_directly() {
        let tile = Tile::new(TileId(1), "roof", 300.0, 400.0, 200.0, 100.0);
        let local = canvas_to_sprite_local(&tile, Vec2::new(310.0, 420.0));
        assert!(approx_eq_vec2(local, Vec2::new(10.0, 20.0)), "{local:?}");
    }

    #[test]
    fn rotated_sprite_is_sampled_in_its_own_frame() {
        let tile = Tile::new(TileId(1), "roof", 0.0, 0.0, 100.0, 100.0).with_sprite(SpriteFrame {
            position: Vec2::new(50.0, 50.0),
            rotation_degrees: 90.0,
            width: 100.0,
            height: 40.0,
        });
        // After a clockwise quarter turn the sprite's +x axis points down the
        // canvas.
        let local = canvas_to_sprite_local(&tile, Vec2::new(50.0, 70.0));
        assert!(approx_eq_vec2(local, Vec2::new(70.0, 20.0)), "{local:?}");
    }

    #[test]
    fn sprite_pixel_rejects_points_outside_extent() {
        assert_eq!(sprite_pixel(Vec2::new(-0.1, 5.0), 20.0, 20.0), None);
        assert_eq!(sprite_pixel(Vec2::new(20.0, 5.0), 20.0, 20.0), None);
        assert_eq!(sprite_pixel(Vec2::new(5.0, 20.0), 20.0, 20.0), None);
        assert_eq!(sprite_pixel(Vec2::new(5.0, 5.0), 0.0, 20.0), None);
        assert_eq!(sprite_pixel(Vec2::new(f32::NAN, 5.0), 20.0, 20.0), None);
    }

    #[test]
    fn sprite_pixel_rounds_and_stays_in_bounds() {
        assert_eq!(sprite_pixel(Vec2::new(4.4, 4.6), 20.0, 20.0), Some((4, 5)));
        assert_eq!(sprite_pixel(Vec2::new(19.7, 0.0), 20.0, 20.0), Some((19, 0)));
    }

    #[test]
    fn rounding_noise_alpha_is_transparent() {
        assert!(!is_opaque(0));
        assert!(!is_opaque(1));
        assert!(is_opaque(2));
    }
}
