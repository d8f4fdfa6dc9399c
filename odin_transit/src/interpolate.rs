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

//! position interpolation along a trajectory path.
//!
//! A trajectory is calibrated by a sorted list of [`TimeInterval`]s, each of which says where (as a fraction of
//! the coordinate path) and in which direction the vehicle was at a given time. Between two intervals we
//! interpolate linearly in time, before the first and after the last one we freeze at the respective interval.

use crate::{datetime::EpochMillis, trajectory::{Point, TimeInterval}};

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

/// compute the position and heading at time `now`. Returns `None` if there are no intervals or no coordinates
pub fn interpolate_position (coordinates: &[Point], intervals: &[TimeInterval], now: EpochMillis)->Option<Position> {
    if coordinates.is_empty() { return None }

    let mut prev: Option<&TimeInterval> = None;
    let mut next: Option<&TimeInterval> = None;

    for ti in intervals {
        if ti.timestamp <= now {
            prev = Some(ti);
        } else {
            next = Some(ti);
            break; // intervals are sorted
        }
    }

    match (prev, next) {
        (Some(prev), Some(next)) => {
            let dt = (next.timestamp - prev.timestamp) as f64;
            let time_progress = if dt > 0.0 { (now - prev.timestamp) as f64 / dt } else { 0.0 };

            let fraction = prev.fraction + (next.fraction - prev.fraction) * time_progress;
            let heading = prev.heading + (next.heading - prev.heading) * time_progress;

            match point_at_fraction( coordinates, fraction) {
                PathPoint::Inner(p) => Some( Position{ x: p[0], y: p[1], heading }),
                PathPoint::Last(p) => Some( Position{ x: p[0], y: p[1], heading: next.heading })
            }
        }
        (Some(ti), None) | (None, Some(ti)) => {
            let p = point_at_fraction( coordinates, ti.fraction).point();
            Some( Position{ x: p[0], y: p[1], heading: ti.heading })
        }
        (None, None) => None
    }
}

enum PathPoint {
    Inner(Point),
    Last(Point)  // clamped to the final vertex
}

impl PathPoint {
    fn point (&self)->Point {
        match self { PathPoint::Inner(p) => *p, PathPoint::Last(p) => *p }
    }
}

/// map a path fraction onto the coordinate path by linear interpolation between the two vertices
/// that bracket `fraction * (len-1)`. Never indexes past the last vertex
fn point_at_fraction (coordinates: &[Point], fraction: f64)->PathPoint {
    let last = coordinates.len() - 1;
    let fraction = if fraction.is_finite() { fraction.clamp( 0.0, 1.0) } else { 0.0 };

    let pos = fraction * last as f64;
    let i = pos.floor() as usize;

    if i >= last {
        PathPoint::Last( coordinates[last])
    } else {
        let t = pos - i as f64;
        let p0 = coordinates[i];
        let p1 = coordinates[i+1];
        PathPoint::Inner( [ p0[0] + (p1[0] - p0[0]) * t, p0[1] + (p1[1] - p0[1]) * t ] )
    }
}
