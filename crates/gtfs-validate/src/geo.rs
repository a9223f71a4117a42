//! Distances on the earth's surface.

/// Mean earth radius.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance.
pub fn haversine_meters(a: LatLon, b: LatLon) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Distance from `point` to the segment `a`-`b`.
///
/// Uses an equirectangular projection centred on `point`, accurate for the
/// short segments found in shapes.
pub fn distance_to_segment_meters(point: LatLon, a: LatLon, b: LatLon) -> f64 {
    let cos_lat = point.lat.to_radians().cos();
    let project = |p: LatLon| {
        (
            (p.lon - point.lon).to_radians() * cos_lat * EARTH_RADIUS_METERS,
            (p.lat - point.lat).to_radians() * EARTH_RADIUS_METERS,
        )
    };
    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);
    let length_squared = dx * dx + dy * dy;
    let t = if length_squared == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / length_squared).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

/// Minimum distance from `point` to a polyline; `None` for an empty line.
pub fn distance_to_polyline_meters(point: LatLon, line: &[LatLon]) -> Option<f64> {
    match line {
        [] => None,
        [single] => Some(haversine_meters(point, *single)),
        _ => line
            .windows(2)
            .map(|pair| distance_to_segment_meters(point, pair[0], pair[1]))
            .min_by(f64::total_cmp),
    }
}
