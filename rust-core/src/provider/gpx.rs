//! Offline routing from saved GPX files.
//!
//! GPX routes are used as-is; GPX tracks (dense recorded paths) are first
//! thinned with Ramer-Douglas-Peucker so that only real direction changes
//! become maneuvers. Steps are derived from the bearing change at each
//! waypoint, using Mapbox's maneuver vocabulary so the tracker and UI treat
//! both providers alike.

use std::io::Read;

use crate::config::GpxProviderConfig;
use crate::error::NavError;
use crate::geo::{bearing, path_length, Coordinate};
use crate::provider::RoutingProvider;
use crate::route::{Maneuver, NavigationRoute, RouteStep};

/// A named polyline loaded from a GPX file.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRoute {
    pub name: Option<String>,
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Clone)]
pub struct GpxRouteProvider {
    config: GpxProviderConfig,
    routes: Vec<SavedRoute>,
}

impl GpxRouteProvider {
    /// Empty provider. Fails when the config cannot produce step durations.
    pub fn new(config: GpxProviderConfig) -> Result<Self, NavError> {
        config.validate()?;
        Ok(Self {
            config,
            routes: Vec::new(),
        })
    }

    pub fn from_bytes(data: &[u8], config: GpxProviderConfig) -> Result<Self, NavError> {
        let mut provider = Self::new(config)?;
        provider.load(data)?;
        Ok(provider)
    }

    pub fn routes(&self) -> &[SavedRoute] {
        &self.routes
    }

    /// Load every route and track from a GPX document.
    /// Returns how many usable routes were added.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<usize, NavError> {
        let gpx = gpx::read(reader).map_err(|e| NavError::Gpx(format!("GPX parse error: {e}")))?;
        let before = self.routes.len();

        for route in &gpx.routes {
            let points = route
                .points
                .iter()
                .map(|wp| Coordinate::new(wp.point().y(), wp.point().x()))
                .collect();
            self.push(route.name.clone(), points);
        }

        for track in &gpx.tracks {
            let dense: Vec<Coordinate> = track
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(|wp| Coordinate::new(wp.point().y(), wp.point().x()))
                .collect();
            let points = rdp_simplify(&dense, self.config.track_simplify_tolerance_m);
            self.push(track.name.clone(), points);
        }

        let added = self.routes.len() - before;
        log::info!("loaded {added} GPX routes");
        Ok(added)
    }

    fn push(&mut self, name: Option<String>, points: Vec<Coordinate>) {
        if points.len() < 2 {
            log::warn!("skipping GPX route {:?}: fewer than 2 points", name);
            return;
        }
        log::debug!("GPX route {:?}: {} points, {:.0} m", name, points.len(), path_length(&points));
        self.routes.push(SavedRoute { name, points });
    }
}

impl RoutingProvider for GpxRouteProvider {
    /// Picks the saved route ending near `destination` whose start is
    /// closest to `origin`.
    fn get_directions(&self, origin: Coordinate, destination: Coordinate) -> Option<NavigationRoute> {
        let radius = self.config.destination_match_radius_m;
        let best = self
            .routes
            .iter()
            .filter(|r| r.points.last().is_some_and(|end| end.distance_to(&destination) <= radius))
            .map(|r| (origin.distance_to(&r.points[0]), r))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, r)| r);

        match best {
            Some(saved) => build_route(saved, self.config.assumed_speed_mps),
            None => {
                log::warn!("no saved GPX route ends near {:?}", destination);
                None
            }
        }
    }
}

/// Turn direction categories.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Turn {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

impl Turn {
    fn maneuver_kind(self) -> &'static str {
        match self {
            Turn::Straight => "continue",
            _ => "turn",
        }
    }

    fn modifier(self) -> &'static str {
        match self {
            Turn::Straight => "straight",
            Turn::SlightLeft => "slight left",
            Turn::Left => "left",
            Turn::SharpLeft => "sharp left",
            Turn::SlightRight => "slight right",
            Turn::Right => "right",
            Turn::SharpRight => "sharp right",
            Turn::UTurn => "uturn",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Turn::Straight => "Continue straight",
            Turn::SlightLeft => "Keep slightly left",
            Turn::Left => "Turn left",
            Turn::SharpLeft => "Turn sharp left",
            Turn::SlightRight => "Keep slightly right",
            Turn::Right => "Turn right",
            Turn::SharpRight => "Turn sharp right",
            Turn::UTurn => "Make a U-turn",
        }
    }
}

/// Derive depart / turn / arrive steps from a saved polyline.
fn build_route(saved: &SavedRoute, speed_mps: f64) -> Option<NavigationRoute> {
    let points = &saved.points;
    if points.len() < 2 {
        return None;
    }
    let last = points.len() - 1;
    let mut steps = Vec::with_capacity(points.len());

    for i in 0..=last {
        let distance = if i < last { points[i].distance_to(&points[i + 1]) } else { 0.0 };

        let (maneuver, instruction) = if i == 0 {
            let heading = compass(bearing(&points[0], &points[1]));
            let text = match &saved.name {
                Some(name) => format!("Head {heading} on {name}"),
                None => format!("Head {heading}"),
            };
            (Maneuver::new("depart", None, points[0]), text)
        } else if i == last {
            (
                Maneuver::new("arrive", None, points[last]),
                "You have arrived at your destination".to_string(),
            )
        } else {
            let turn = compute_turn(&points[i - 1], &points[i], &points[i + 1]);
            (
                Maneuver::new(turn.maneuver_kind(), Some(turn.modifier().to_string()), points[i]),
                turn.instruction().to_string(),
            )
        };

        steps.push(RouteStep {
            instruction,
            maneuver,
            distance,
            duration: distance / speed_mps,
            speed_limit: None,
        });
    }

    Some(NavigationRoute::from_steps(steps, points.clone()))
}

/// Turn at `b` when arriving from `a` and leaving toward `c`.
fn compute_turn(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> Turn {
    // Heading change in (-180, 180]; positive turns right.
    let change = (bearing(b, c) - bearing(a, b) + 540.0).rem_euclid(360.0) - 180.0;
    classify_turn(change)
}

/// Lower bound (exclusive) of each turn band, sharpest first, as (left, right).
const TURN_BANDS: [(f64, Turn, Turn); 4] = [
    (170.0, Turn::UTurn, Turn::UTurn),
    (120.0, Turn::SharpLeft, Turn::SharpRight),
    (60.0, Turn::Left, Turn::Right),
    (20.0, Turn::SlightLeft, Turn::SlightRight),
];

fn classify_turn(change_deg: f64) -> Turn {
    TURN_BANDS
        .iter()
        .find(|(min, _, _)| change_deg.abs() > *min)
        .map_or(Turn::Straight, |&(_, left, right)| if change_deg > 0.0 { right } else { left })
}

fn compass(bearing_deg: f64) -> &'static str {
    const NAMES: [&str; 8] = [
        "north", "northeast", "east", "southeast", "south", "southwest", "west", "northwest",
    ];
    let sector = ((bearing_deg + 22.5) / 45.0).floor() as usize % 8;
    NAMES[sector]
}

/// Thin a dense track down to the points that deviate more than
/// `tolerance_m` from the chord between kept neighbours
/// (Ramer-Douglas-Peucker, driven by an explicit span stack).
fn rdp_simplify(points: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let plane = LocalPlane::around(points);
    let projected: Vec<(f64, f64)> = points.iter().map(|p| plane.project(p)).collect();

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut spans = vec![(0, points.len() - 1)];
    while let Some((first, last)) = spans.pop() {
        let farthest = (first + 1..last)
            .map(|i| (i, offset_from_chord(projected[i], projected[first], projected[last])))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((split, offset)) = farthest {
            if offset > tolerance_m {
                keep[split] = true;
                spans.push((first, split));
                spans.push((split, last));
            }
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Equirectangular projection to meters around a track's mean latitude.
/// Good enough at the few-kilometer scale of a single track.
struct LocalPlane {
    m_per_deg_lat: f64,
    m_per_deg_lng: f64,
}

impl LocalPlane {
    const M_PER_DEG: f64 = 111_320.0;

    fn around(points: &[Coordinate]) -> Self {
        let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / points.len() as f64;
        Self {
            m_per_deg_lat: Self::M_PER_DEG,
            m_per_deg_lng: Self::M_PER_DEG * mean_lat.to_radians().cos(),
        }
    }

    fn project(&self, p: &Coordinate) -> (f64, f64) {
        (p.lng * self.m_per_deg_lng, p.lat * self.m_per_deg_lat)
    }
}

/// Distance from `p` to the segment chord `a`-`b`; falls back to the
/// distance from `a` when the chord is degenerate.
fn offset_from_chord(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (px, py) = (p.0 - a.0, p.1 - a.1);
    let chord = dx.hypot(dy);
    if chord < 1e-6 {
        return px.hypot(py);
    }
    (px * dy - py * dx).abs() / chord
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    const SAVED_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <name>Commute</name>
    <rtept lat="48.000" lon="16.000"></rtept>
    <rtept lat="48.010" lon="16.000"></rtept>
    <rtept lat="48.010" lon="16.015"></rtept>
  </rte>
  <trk>
    <name>Riverside</name>
    <trkseg>
      <trkpt lat="48.100" lon="16.000"></trkpt>
      <trkpt lat="48.100" lon="16.005"></trkpt>
      <trkpt lat="48.100" lon="16.010"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="48.100" lon="16.015"></trkpt>
      <trkpt lat="48.100" lon="16.020"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn provider() -> GpxRouteProvider {
        GpxRouteProvider::from_bytes(SAVED_GPX.as_bytes(), GpxProviderConfig::default()).unwrap()
    }

    #[test]
    fn loads_routes_and_simplified_tracks() {
        let provider = provider();
        let routes = provider.routes();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].name.as_deref(), Some("Commute"));
        assert_eq!(routes[0].points.len(), 3);
        // Straight track collapses to its endpoints
        assert_eq!(routes[1].points, vec![pt(48.1, 16.0), pt(48.1, 16.02)]);
    }

    #[test]
    fn directions_follow_saved_route() {
        let route = provider().get_directions(pt(48.0, 16.0), pt(48.0101, 16.015)).unwrap();

        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].maneuver.kind, "depart");
        assert_eq!(route.steps[0].instruction, "Head north on Commute");
        assert_eq!(route.steps[1].maneuver.kind, "turn");
        assert_eq!(route.steps[1].maneuver.modifier.as_deref(), Some("right"));
        assert_eq!(route.steps[1].instruction, "Turn right");
        assert!(route.steps[2].maneuver.is_arrival());
        assert_eq!(route.steps[2].distance, 0.0);
        assert_eq!(route.geometry.len(), 3);
    }

    #[test]
    fn step_metrics_use_segment_length() {
        let route = provider().get_directions(pt(48.0, 16.0), pt(48.01, 16.015)).unwrap();
        let first = &route.steps[0];

        // 0.01 deg of latitude ~1.11 km
        assert!(first.distance > 1100.0 && first.distance < 1125.0);
        assert!((first.duration - first.distance / 13.9).abs() < 1e-9);
        assert!((route.distance - (route.steps[0].distance + route.steps[1].distance)).abs() < 1e-9);
    }

    #[test]
    fn unmatched_destination_has_no_route() {
        assert!(provider().get_directions(pt(48.0, 16.0), pt(50.0, 10.0)).is_none());
    }

    #[test]
    fn nearest_start_wins() {
        let mut provider = GpxRouteProvider::new(GpxProviderConfig::default()).unwrap();
        provider.routes.push(SavedRoute { name: Some("far".into()), points: vec![pt(47.0, 16.0), pt(48.0, 17.0)] });
        provider.routes.push(SavedRoute { name: Some("near".into()), points: vec![pt(47.9, 17.0), pt(48.0, 17.0)] });

        let route = provider.get_directions(pt(47.9, 17.0), pt(48.0, 17.0)).unwrap();
        assert_eq!(route.steps[0].instruction, "Head north on near");
    }

    #[test]
    fn zero_speed_is_rejected() {
        let config = GpxProviderConfig { assumed_speed_mps: 0.0, ..GpxProviderConfig::default() };
        assert!(matches!(GpxRouteProvider::new(config.clone()), Err(NavError::Config(_))));
        assert!(matches!(
            GpxRouteProvider::from_bytes(SAVED_GPX.as_bytes(), config),
            Err(NavError::Config(_))
        ));
    }

    #[test]
    fn route_length_matches_geometry() {
        let route = provider().get_directions(pt(48.0, 16.0), pt(48.01, 16.015)).unwrap();
        assert!((route.distance - path_length(&route.geometry)).abs() < 1e-6);
        assert!(route.steps.iter().all(|s| s.duration.is_finite()));
    }

    #[test]
    fn invalid_gpx_is_error() {
        let result = GpxRouteProvider::from_bytes(b"not xml at all", GpxProviderConfig::default());
        assert!(matches!(result, Err(NavError::Gpx(_))));
    }

    #[test]
    fn single_point_route_is_skipped() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <rte><rtept lat="48.0" lon="16.0"></rtept></rte>
</gpx>"#;
        let provider = GpxRouteProvider::from_bytes(gpx.as_bytes(), GpxProviderConfig::default()).unwrap();
        assert!(provider.routes().is_empty());
    }

    #[test]
    fn classify_turns() {
        assert_eq!(classify_turn(5.0), Turn::Straight);
        assert_eq!(classify_turn(90.0), Turn::Right);
        assert_eq!(classify_turn(-90.0), Turn::Left);
        assert_eq!(classify_turn(-45.0), Turn::SlightLeft);
        assert_eq!(classify_turn(150.0), Turn::SharpRight);
        assert_eq!(classify_turn(-175.0), Turn::UTurn);
        // Band edges belong to the gentler category
        assert_eq!(classify_turn(20.0), Turn::Straight);
        assert_eq!(classify_turn(-60.0), Turn::SlightLeft);
    }

    #[test]
    fn heading_change_wraps_across_north() {
        // Heading ~356 then ~8 crosses north and is still straight
        let turn = compute_turn(&pt(47.99, 16.001), &pt(48.0, 16.0), &pt(48.01, 16.002));
        assert_eq!(turn, Turn::Straight);
        let right = compute_turn(&pt(48.0, 16.0), &pt(48.01, 16.0), &pt(48.01, 16.015));
        assert_eq!(right, Turn::Right);
    }

    #[test]
    fn compass_sectors() {
        assert_eq!(compass(0.0), "north");
        assert_eq!(compass(350.0), "north");
        assert_eq!(compass(90.0), "east");
        assert_eq!(compass(225.0), "southwest");
    }

    #[test]
    fn rdp_keeps_corner() {
        let points = vec![
            pt(48.0, 16.0),
            pt(48.0, 16.01),
            pt(48.0, 16.02), // corner
            pt(48.01, 16.02),
            pt(48.02, 16.02),
        ];
        let result = rdp_simplify(&points, 10.0);
        assert_eq!(result, vec![pt(48.0, 16.0), pt(48.0, 16.02), pt(48.02, 16.02)]);
    }

    #[test]
    fn rdp_zero_tolerance_keeps_wiggles() {
        let points = vec![pt(48.0, 16.0), pt(48.001, 16.001), pt(48.0, 16.002)];
        assert_eq!(rdp_simplify(&points, 0.0).len(), 3);
    }
}
