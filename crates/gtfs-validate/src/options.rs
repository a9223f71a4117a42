//! Run configuration.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Maximum plausible speeds by `route_type`, in km/h.
const DEFAULT_MAX_SPEEDS_KMH: &[(i64, f64)] = &[
    (0, 100.0),  // tram, light rail
    (1, 150.0),  // subway, metro
    (2, 500.0),  // rail
    (3, 150.0),  // bus
    (4, 80.0),   // ferry
    (5, 30.0),   // cable tram
    (6, 50.0),   // aerial lift
    (7, 50.0),   // funicular
    (11, 150.0), // trolleybus
    (12, 150.0), // monorail
];

/// Used when the route type is unknown or not listed.
pub const FALLBACK_MAX_SPEED_KMH: f64 = 200.0;

pub const DEFAULT_STOP_SHAPE_THRESHOLD_METERS: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Reference date for the coverage rules.
    pub today: NaiveDate,
    /// Feeds ending before `today + coverage_warning_days` get a warning.
    pub coverage_warning_days: i64,
    /// Feeds ending on or before `today + coverage_error_days` get an error.
    pub coverage_error_days: i64,
    pub stop_shape_threshold_meters: f64,
    pub max_speeds_kmh: BTreeMap<i64, f64>,
    pub default_max_speed_kmh: f64,
    /// Parse files and run rules on worker threads.
    pub parallel: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            today: Local::now().date_naive(),
            coverage_warning_days: 30,
            coverage_error_days: 7,
            stop_shape_threshold_meters: DEFAULT_STOP_SHAPE_THRESHOLD_METERS,
            max_speeds_kmh: DEFAULT_MAX_SPEEDS_KMH.iter().copied().collect(),
            default_max_speed_kmh: FALLBACK_MAX_SPEED_KMH,
            parallel: true,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    #[must_use]
    pub fn with_coverage_windows(mut self, warning_days: i64, error_days: i64) -> Self {
        self.coverage_warning_days = warning_days;
        self.coverage_error_days = error_days;
        self
    }

    #[must_use]
    pub fn with_stop_shape_threshold(mut self, meters: f64) -> Self {
        self.stop_shape_threshold_meters = meters;
        self
    }

    #[must_use]
    pub fn with_max_speed(mut self, route_type: i64, kmh: f64) -> Self {
        self.max_speeds_kmh.insert(route_type, kmh);
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// `today` truncated to midnight.
    pub fn today_midnight(&self) -> NaiveDateTime {
        self.today.and_time(NaiveTime::MIN)
    }

    pub fn max_speed_for(&self, route_type: Option<i64>) -> f64 {
        route_type
            .and_then(|route_type| self.max_speeds_kmh.get(&route_type).copied())
            .unwrap_or(self.default_max_speed_kmh)
    }
}
