//! Null-propagating landmark geometry.
//!
//! Every helper returns `None` instead of a NaN or a panic when the input
//! cannot produce a meaningful number.

use super::landmark::Landmark;

/// Euclidean distance between two landmarks (3D)
///
/// `None` when either point lacks a coordinate.
pub fn distance(a: &Landmark, b: &Landmark) -> Option<f64> {
    if !a.has_coordinates() || !b.has_coordinates() {
        return None;
    }
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    let d = (dx * dx + dy * dy + dz * dz).sqrt();
    if d.is_nan() {
        None
    } else {
        Some(d)
    }
}

/// Angle at `vertex` in degrees between `vertex→proximal` and `vertex→distal`.
///
/// Uses the image-plane (x, y) projection. `cos θ = (v1 · v2) / (|v1| |v2|)`,
/// clamped to [-1, 1] before `acos`.
///
/// - 180° = fully straight limb
/// - 90° = right-angle bend
pub fn joint_angle(proximal: &Landmark, vertex: &Landmark, distal: &Landmark) -> Option<f64> {
    let v1 = (proximal.x - vertex.x, proximal.y - vertex.y);
    let v2 = (distal.x - vertex.x, distal.y - vertex.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    // zero-length segment has no direction
    if mag1 == 0.0 || mag2 == 0.0 {
        return None;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    let angle = cos_angle.acos().to_degrees();

    if angle.is_nan() {
        None
    } else {
        Some(angle)
    }
}
