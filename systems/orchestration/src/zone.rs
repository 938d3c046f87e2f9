//! Mapping from the player's position to the angular zone that is kept clear of spawns.

use bulwark_core::{Vec2, Vec3, Zone};

/// Players closer than this to the origin exclude no zone.
pub const DEAD_ZONE_RADIUS: f32 = 1_700.0;

/// Angular zone the player stands in, or `None` inside the dead zone or without a player.
///
/// The angle against the negative x axis is bucketed into 45 degree slices
/// centred on multiples of 45 degrees. Slices 1 through 3 are mirrored to
/// 7 through 5 when the player is on the positive y side.
#[must_use]
pub fn player_zone(player: Option<Vec3>) -> Option<Zone> {
    let player = player?;
    let planar = Vec2::new(player.x, player.y);
    if !planar.is_finite() || planar.length() < DEAD_ZONE_RADIUS {
        return None;
    }

    let heading = planar.normalize();
    let dot = Vec2::NEG_X.dot(heading).clamp(-1.0, 1.0);
    let angle = dot.acos().to_degrees();

    let mut area = ((angle + 22.5) / 45.0) as u8 % 5;
    if heading.y > 0.0 && area != 0 {
        area = 8 - area;
    }
    Zone::new(area)
}
