/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License"); 
 * you may not use this file except in compliance with the License. You may obtain a copy 
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{fmt, sync::Arc};
use serde::{Serialize,Deserialize};
use crate::datetime::EpochMillis;

/// a planar point in the (projected) coordinate system of the feed, e.g. web mercator meters
pub type Point = [f64;2];

/// the only transport mode the long-distance filter applies to
pub const RAIL_MODE: &str = "rail";

/// line name prefixes of long-distance services (matched case-insensitive)
pub const LONG_DISTANCE_PREFIXES: [&str;8] = ["IC", "ICE", "EC", "TGV", "RJX", "NJ", "EN", "IR"];

pub fn is_long_distance_line (line_name: Option<&str>)->bool {
    match line_name {
        Some(name) if !name.is_empty() => {
            let bs = name.as_bytes();
            LONG_DISTANCE_PREFIXES.iter().any( |p| {
                let pb = p.as_bytes();
                bs.len() >= pb.len() && bs[..pb.len()].eq_ignore_ascii_case(pb)
            })
        }
        _ => false
    }
}

/// calibration point of a trajectory: at `timestamp` the vehicle is at arc fraction `fraction` of its
/// coordinate path, facing `heading` (radians)
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct TimeInterval {
    pub timestamp: EpochMillis,
    pub fraction: f64,
    pub heading: f64,
}

impl TimeInterval {
    pub fn new (timestamp: i64, fraction: f64, heading: f64)->Self {
        TimeInterval { timestamp: EpochMillis::new(timestamp), fraction, heading }
    }
}

/// the latest known trajectory of a vehicle. Replaced wholesale by each new trajectory message
/// for the same id
#[derive(Debug,Clone)]
pub struct Trajectory {
    pub id: Arc<String>,
    pub coordinates: Arc<[Point]>, // shared with trajectory listeners
    pub intervals: Vec<TimeInterval>,

    pub line_name: Option<String>,
    pub line_color: Option<String>,
    pub destination: Option<String>,
    pub delay: Option<i64>, // millis
    pub mode: Option<String>,
    pub state: Option<String>,
}

impl Trajectory {
    pub fn new (id: impl ToString, coordinates: Vec<Point>, intervals: Vec<TimeInterval>)->Self {
        Trajectory {
            id: Arc::new(id.to_string()),
            coordinates: coordinates.into(),
            intervals,
            line_name: None,
            line_color: None,
            destination: None,
            delay: None,
            mode: None,
            state: None,
        }
    }

    pub fn with_mode (mut self, mode: impl ToString)->Self { self.mode = Some(mode.to_string()); self }
    pub fn with_line_name (mut self, name: impl ToString)->Self { self.line_name = Some(name.to_string()); self }

    pub fn last_point (&self)->Option<&Point> { self.coordinates.last() }

    pub fn is_rail (&self)->bool { self.mode.as_deref() == Some(RAIL_MODE) }

    /// rail vehicles that are not long-distance services are filtered out in long-distance-only mode
    pub fn fails_long_distance_filter (&self)->bool {
        self.is_rail() && !is_long_distance_line( self.line_name.as_deref())
    }

    /// an empty mode list matches everything (we subscribe without `mots=` in that case)
    pub fn matches_modes (&self, modes: &[String])->bool {
        if modes.is_empty() { return true }
        match &self.mode {
            Some(mode) => modes.iter().any( |m| m == mode),
            None => false
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Trajectory( id: {}", self.id)?;
        if let Some(name) = &self.line_name { write!( f, ", line: \"{name}\"")?; }
        if let Some(mode) = &self.mode { write!( f, ", mode: {mode}")?; }
        write!( f, ", n_coords: {}, n_intervals: {})", self.coordinates.len(), self.intervals.len())
    }
}

/// the subscribed viewport
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    pub fn new (left: f64, bottom: f64, right: f64, top: f64)->Self {
        BoundingBox { left, bottom, right, top }
    }

    pub fn width (&self)->f64 { self.right - self.left }
    pub fn height (&self)->f64 { self.top - self.bottom }
    pub fn center (&self)->Point { [ (self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0 ] }

    /// inclusive
    pub fn contains (&self, p: &Point)->bool {
        p[0] >= self.left && p[0] <= self.right && p[1] >= self.bottom && p[1] <= self.top
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{} {} {} {}", self.left, self.bottom, self.right, self.top)
    }
}

/// the per-tick projection of a Trajectory that is handed to the renderer. Never stored
#[derive(Serialize,Debug,Clone,PartialEq)]
pub struct Vehicle {
    pub id: Arc<String>,
    pub x: f64,
    pub y: f64,
    pub heading: f64,

    #[serde(skip_serializing_if="Option::is_none")] pub line_name: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")] pub line_color: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")] pub destination: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")] pub delay: Option<i64>,
    #[serde(skip_serializing_if="Option::is_none")] pub mode: Option<String>,
    #[serde(skip_serializing_if="Option::is_none")] pub state: Option<String>,

    /// key of the map symbol the renderer should use (see [`crate::symbol::SymbolCache`])
    #[serde(skip_serializing_if="Option::is_none")] pub symbol_key: Option<Arc<str>>,
}

/// what we tell trajectory listeners when a new trajectory got stored
#[derive(Debug,Clone)]
pub struct TrajectoryUpdate {
    pub id: Arc<String>,
    pub coordinates: Arc<[Point]>,
    pub mode: Option<String>,
}

impl From<&Trajectory> for TrajectoryUpdate {
    fn from (t: &Trajectory)->Self {
        TrajectoryUpdate { id: t.id.clone(), coordinates: t.coordinates.clone(), mode: t.mode.clone() }
    }
}
