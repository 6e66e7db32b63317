//! Route table
//!
//! Immutable ordered list of waypoints that the simulated vehicle drives in a
//! loop. Cursor arithmetic wraps back to the first segment once the final
//! segment has been consumed.

use serde::{Deserialize, Serialize};

use crate::SimError;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components lie in their valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One leg of the route, from `start` toward `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Index of `start` in the route (after wraparound)
    pub index: usize,
    /// Waypoint the leg departs from
    pub start: Coordinate,
    /// Waypoint the leg heads toward
    pub end: Coordinate,
}

/// Seoul City Hall to Gangnam Station
const SEOUL_ROUTE: [(f64, f64); 70] = [
    (37.5665, 126.9780),
    (37.5668, 126.9785),
    (37.5670, 126.9790),
    (37.5675, 126.9795),
    (37.5680, 126.9800),
    (37.5685, 126.9805),
    (37.5690, 126.9810),
    (37.5695, 126.9815),
    (37.5700, 126.9820),
    (37.5705, 126.9825),
    (37.5710, 126.9830),
    (37.5715, 126.9835),
    (37.5720, 126.9840),
    (37.5725, 126.9845),
    (37.5730, 126.9850),
    (37.5735, 126.9855),
    (37.5740, 126.9860),
    (37.5745, 126.9865),
    (37.5750, 126.9870),
    (37.5755, 126.9875),
    (37.5760, 126.9880),
    (37.5765, 126.9885),
    (37.5770, 126.9890),
    (37.5775, 126.9895),
    (37.5780, 126.9900),
    (37.5785, 126.9905),
    (37.5790, 126.9910),
    (37.5795, 126.9915),
    (37.5800, 126.9920),
    (37.5805, 126.9925),
    (37.5810, 126.9930),
    (37.5815, 126.9935),
    (37.5820, 126.9940),
    (37.5825, 126.9945),
    (37.5830, 126.9950),
    (37.5835, 126.9955),
    (37.5840, 126.9960),
    (37.5845, 126.9965),
    (37.5850, 126.9970),
    (37.5855, 126.9975),
    (37.5860, 126.9980),
    (37.5865, 126.9985),
    (37.5870, 126.9990),
    (37.5875, 126.9995),
    (37.5880, 127.0000),
    (37.5885, 127.0005),
    (37.5890, 127.0010),
    (37.5895, 127.0015),
    (37.5900, 127.0020),
    (37.5905, 127.0025),
    (37.5910, 127.0030),
    (37.5915, 127.0035),
    (37.5920, 127.0040),
    (37.5925, 127.0045),
    (37.5930, 127.0050),
    (37.5935, 127.0055),
    (37.5940, 127.0060),
    (37.5945, 127.0065),
    (37.5950, 127.0070),
    (37.5955, 127.0075),
    (37.5960, 127.0080),
    (37.5965, 127.0085),
    (37.5970, 127.0090),
    (37.5975, 127.0095),
    (37.5980, 127.0100),
    (37.5985, 127.0105),
    (37.5990, 127.0110),
    (37.5995, 127.0115),
    (37.6000, 127.0120),
    (37.4979, 127.0276),
];

/// Fixed, looping route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    waypoints: Vec<Coordinate>,
}

impl RouteTable {
    /// Build a route from at least two valid waypoints
    pub fn new(waypoints: Vec<Coordinate>) -> Result<Self, SimError> {
        if waypoints.len() < 2 {
            return Err(SimError::RouteTooShort(waypoints.len()));
        }
        if let Some((index, bad)) = waypoints.iter().enumerate().find(|(_, c)| !c.is_valid()) {
            return Err(SimError::InvalidWaypoint {
                index,
                latitude: bad.latitude,
                longitude: bad.longitude,
            });
        }
        Ok(Self { waypoints })
    }

    /// All waypoints in travel order
    pub fn waypoints(&self) -> &[Coordinate] {
        &self.waypoints
    }

    /// Number of waypoints
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; a route holds at least two waypoints
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// First waypoint, where the vehicle is parked at startup
    pub fn origin(&self) -> Coordinate {
        self.waypoints[0]
    }

    /// Last waypoint
    pub fn destination(&self) -> Coordinate {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Clamp a cursor to a valid segment start; anything at or past the final
    /// waypoint restarts the loop at 0.
    pub fn wrap(&self, index: usize) -> usize {
        if index >= self.waypoints.len() - 1 {
            0
        } else {
            index
        }
    }

    /// Segment starting at `index`, wrapping to segment 0 past the end
    pub fn segment_at(&self, index: usize) -> Segment {
        let index = self.wrap(index);
        Segment {
            index,
            start: self.waypoints[index],
            end: self.waypoints[index + 1],
        }
    }

    /// Cursor of the segment after `index`
    pub fn next_index(&self, index: usize) -> usize {
        self.wrap(self.wrap(index) + 1)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            waypoints: SEOUL_ROUTE
                .iter()
                .map(|&(lat, lng)| Coordinate::new(lat, lng))
                .collect(),
        }
    }
}
