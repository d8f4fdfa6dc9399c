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
#![allow(unused)]

use odin_transit::{datetime::EpochMillis, interpolate::{interpolate_position, Position}, trajectory::TimeInterval};

// run with "cargo test --test test_interpolate -- --nocapture"

fn at (millis: i64)->EpochMillis { EpochMillis::new(millis) }

fn assert_close (a: f64, b: f64) {
    assert!( (a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn test_midpoint() {
    let coords = [[0.0, 0.0], [10.0, 20.0]];
    let intervals = [TimeInterval::new(1000, 0.0, 0.0), TimeInterval::new(2000, 1.0, 0.0)];

    let pos = interpolate_position( &coords, &intervals, at(1500)).unwrap();
    println!("midpoint: {pos:?}");
    assert_close( pos.x, 5.0);
    assert_close( pos.y, 10.0);
}

#[test]
fn test_before_and_after() {
    let coords = [[0.0, 0.0], [10.0, 0.0]];
    let intervals = [TimeInterval::new(1000, 0.0, 0.5), TimeInterval::new(2000, 1.0, 1.5)];

    // before the first interval we stay at its fraction
    let pos = interpolate_position( &coords, &intervals, at(0)).unwrap();
    assert_eq!( pos, Position{ x: 0.0, y: 0.0, heading: 0.5 });

    // after the last interval we freeze at its fraction, no matter how far past
    for t in [2000, 2001, 1_000_000_000] {
        let pos = interpolate_position( &coords, &intervals, at(t)).unwrap();
        assert_eq!( pos, Position{ x: 10.0, y: 0.0, heading: 1.5 });
    }
}

#[test]
fn test_multi_segment_path() {
    // 4 vertices, fraction maps onto vertex index space (fraction * 3)
    let coords = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [20.0, 10.0]];
    let intervals = [TimeInterval::new(0, 0.0, 0.0), TimeInterval::new(3000, 1.0, 3.0)];

    let pos = interpolate_position( &coords, &intervals, at(1500)).unwrap(); // fraction 0.5 -> index 1.5
    assert_close( pos.x, 10.0);
    assert_close( pos.y, 5.0);
    assert_close( pos.heading, 1.5);

    let pos = interpolate_position( &coords, &intervals, at(500)).unwrap(); // index 0.5
    assert_close( pos.x, 5.0);
    assert_close( pos.y, 0.0);
}

#[test]
fn test_partial_fractions() {
    let coords = [[0.0, 0.0], [100.0, 0.0]];
    let intervals = [
        TimeInterval::new(0, 0.2, 0.0),
        TimeInterval::new(1000, 0.4, 0.0),
        TimeInterval::new(2000, 0.8, 0.0),
    ];

    assert_close( interpolate_position( &coords, &intervals, at(500)).unwrap().x, 30.0);
    assert_close( interpolate_position( &coords, &intervals, at(1000)).unwrap().x, 40.0); // exactly on interval
    assert_close( interpolate_position( &coords, &intervals, at(1500)).unwrap().x, 60.0);
}

#[test]
fn test_final_vertex_uses_next_heading() {
    let coords = [[0.0, 0.0], [10.0, 0.0]];
    let intervals = [
        TimeInterval::new(0, 0.0, 0.0),
        TimeInterval::new(1000, 1.0, 1.0),
        TimeInterval::new(2000, 1.0, 3.0),
    ];

    // fraction stays at 1.0 between the last two intervals, i.e. we are clamped to the last vertex
    let pos = interpolate_position( &coords, &intervals, at(1500)).unwrap();
    assert_eq!( pos, Position{ x: 10.0, y: 0.0, heading: 3.0 });
}

#[test]
fn test_out_of_range_fractions_are_clamped() {
    let coords = [[0.0, 0.0], [10.0, 0.0]];
    let intervals = [TimeInterval::new(0, 1.7, 0.0)];
    assert_eq!( interpolate_position( &coords, &intervals, at(10)).unwrap().x, 10.0);

    let intervals = [TimeInterval::new(0, -0.5, 0.0)];
    assert_eq!( interpolate_position( &coords, &intervals, at(10)).unwrap().x, 0.0);
}

#[test]
fn test_degenerate_input() {
    let coords = [[3.0, 4.0]];
    let intervals = [TimeInterval::new(0, 0.0, 0.0), TimeInterval::new(1000, 1.0, 0.0)];

    // single vertex path
    let pos = interpolate_position( &coords, &intervals, at(500)).unwrap();
    assert_eq!( (pos.x, pos.y), (3.0, 4.0));

    // no intervals, no coordinates
    assert!( interpolate_position( &coords, &[], at(500)).is_none());
    assert!( interpolate_position( &[], &intervals, at(500)).is_none());
}
