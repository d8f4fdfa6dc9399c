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

use std::{sync::{Arc,Mutex,mpsc}, thread};
use serde_json::json;
use odin_transit::{
    TransitTracker, animation::FrameResult,
    config::{load_config, parse_config, TransitConfig},
    datetime::{millis, secs, EpochMillis}, trajectory::{BoundingBox, Vehicle}
};

// run with "cargo test --test test_tracker -- --nocapture"

fn trajectory_msg (id: &str, mode: &str, line: &str, last: [f64;2])->String {
    json!({
        "source": "trajectory",
        "timestamp": 1000,
        "client_reference": null,
        "content": {
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[10.0,10.0], last] },
            "properties": {
                "train_id": id,
                "type": mode,
                "line": { "name": line, "color": "#00ff00" },
                "time_intervals": [[1000, 0.0, 0.0], [2000, 1.0, 0.5]]
            }
        }
    }).to_string()
}

fn populated_tracker ()->TransitTracker {
    let tracker = TransitTracker::new( TransitConfig { modes: vec!["rail".to_string(), "bus".to_string()], ..TransitConfig::default() });
    tracker.update_viewport( 0.0, 0.0, 100.0, 100.0);

    let ctx = tracker.context();
    ctx.process_frame( &trajectory_msg( "A", "rail", "IC5", [20.0, 20.0]));
    ctx.process_frame( &trajectory_msg( "B", "rail", "S3", [30.0, 30.0]));
    ctx.process_frame( &trajectory_msg( "C", "bus", "S3", [40.0, 40.0]));
    tracker
}

#[test]
fn test_parse_config() {
    let config = parse_config( r#"
        TransitConfig(
            ws_uri: "ws://127.0.0.1:9999/feed",
            reconnect_delay: "2s",
            modes: ["rail", "tram"],
            frame_interval: "20ms",
            long_distance_only: true,
        )
    "#).unwrap();
    println!("config: {config:?}");

    assert_eq!( config.ws_uri, "ws://127.0.0.1:9999/feed");
    assert_eq!( config.reconnect_delay, secs(2));
    assert_eq!( config.frame_interval, millis(20));
    assert_eq!( config.modes, vec!["rail".to_string(), "tram".to_string()]);
    assert!( config.long_distance_only);

    // defaults
    assert_eq!( config.ping_interval, secs(30));
    assert_eq!( config.ping_payload, "PING");
    assert_eq!( config.buffer_size, 100);
    assert_eq!( config.symbol_cache_size, 500);

    assert!( parse_config("TransitConfig( reconnect_delay: \"soon\" )").is_err());
    assert!( parse_config("not a config").is_err());
    assert!( parse_config("TransitConfig( ping_interval: \"0s\" )").is_err());
}

#[test]
fn test_load_config() {
    let config = load_config("configs/transit.ron").unwrap();
    assert_eq!( config.ws_uri, "wss://tracker.example.org/ws");
    assert_eq!( config.fps_window, secs(1));

    assert!( load_config("configs/does_not_exist.ron").is_err());
}

#[test]
fn test_host_driven_frames() {
    let tracker = populated_tracker();
    let snapshots = Arc::new( Mutex::new( Vec::<Vec<Vehicle>>::new()));
    let s = snapshots.clone();
    tracker.on_vehicles( move |vs| s.lock().unwrap().push( vs.to_vec()));

    assert_eq!( tracker.on_frame( EpochMillis::new(1500)), FrameResult::Updated(3));
    assert_eq!( tracker.on_frame( EpochMillis::new(1550)), FrameResult::NotDue);

    let snapshots = snapshots.lock().unwrap();
    assert_eq!( snapshots.len(), 1);
    let a = snapshots[0].iter().find( |v| v.id.as_str() == "A").unwrap();
    assert!( (a.x - 15.0).abs() < 1e-9 && (a.y - 15.0).abs() < 1e-9);
    assert!( (a.heading - 0.25).abs() < 1e-9);
    assert_eq!( a.line_color.as_deref(), Some("#00ff00"));

    // interpolation outside of the calibrated time range clamps to the end points
    let vehicles = tracker.get_vehicles();
    assert_eq!( vehicles.len(), 3);
}

#[test]
fn test_vehicle_counts() {
    let tracker = populated_tracker();
    let counts = tracker.get_vehicle_counts();
    println!("counts: {counts:?}");
    assert_eq!( counts.total, 3);
    assert_eq!( counts.count_for("rail"), 2);
    assert_eq!( counts.count_for("bus"), 1);
    assert_eq!( counts.count_for("tram"), 0);
}

#[test]
fn test_filters() {
    let tracker = populated_tracker();
    let deleted = Arc::new( Mutex::new( Vec::<String>::new()));
    let d = deleted.clone();
    tracker.on_deleted( move |id| d.lock().unwrap().push( id.to_string()));

    assert_eq!( tracker.set_long_distance_only(true), 1);
    assert!( tracker.long_distance_only());
    assert!( !tracker.store().contains("B"));

    // ingest drops regional rail while long-distance filter is on
    tracker.context().process_frame( &trajectory_msg( "D", "rail", "RE7", [50.0, 50.0]));
    assert!( !tracker.store().contains("D"));

    let change = tracker.set_transport_filter( vec!["bus".to_string()]);
    assert!( change.resubscribe); // no connection yet, but we have a viewport
    assert_eq!( change.evicted.len(), 1);
    assert_eq!( tracker.transport_filter(), vec!["bus".to_string()]);
    assert!( tracker.store().contains("C") && tracker.store().len() == 1);

    let change = tracker.set_transport_filter( vec!["bus".to_string()]);
    assert!( !change.resubscribe && change.evicted.is_empty());

    assert_eq!( *deleted.lock().unwrap(), vec!["B".to_string(), "A".to_string()]);
}

#[test]
fn test_viewport() {
    let tracker = populated_tracker();
    assert_eq!( tracker.viewport(), Some( BoundingBox::new( 0.0, 0.0, 100.0, 100.0)));

    assert!( !tracker.update_viewport( 2.0, 2.0, 102.0, 102.0));
    assert!( tracker.update_viewport( 25.0, 25.0, 125.0, 125.0));
    assert_eq!( tracker.viewport(), Some( BoundingBox::new( 25.0, 25.0, 125.0, 125.0)));

    // A ends at (20,20)
    assert!( !tracker.store().contains("A"));
    assert_eq!( tracker.store().len(), 2);

    tracker.set_zoom_level(14);
    let cmds = tracker.context().subscription_cmds().unwrap();
    assert_eq!( cmds[0], "BBOX 25 25 125 125 14 mots=rail,bus");
}

#[tokio::test]
async fn test_frame_driver() {
    let mut tracker = populated_tracker();
    let fps = Arc::new( Mutex::new( Vec::<f64>::new()));
    let f = fps.clone();
    tracker.on_fps( move |v| f.lock().unwrap().push( *v));

    let n_snapshots = Arc::new( Mutex::new(0usize));
    let n = n_snapshots.clone();
    tracker.on_vehicles( move |_| *n.lock().unwrap() += 1);

    // start also connects, which retries in the background
    tracker.start().unwrap();
    tokio::time::sleep( millis(1300)).await;
    tracker.disconnect();

    let n = *n_snapshots.lock().unwrap();
    println!("got {n} snapshots, fps: {:?}", fps.lock().unwrap());
    assert!( n >= 5);
    assert!( !fps.lock().unwrap().is_empty());
}

#[test]
fn test_no_frames_after_disconnect() {
    let mut tracker = populated_tracker();
    let n_snapshots = Arc::new( Mutex::new(0usize));
    let n = n_snapshots.clone();
    tracker.on_vehicles( move |_| *n.lock().unwrap() += 1);

    assert_eq!( tracker.on_frame( EpochMillis::new(1500)), FrameResult::Updated(3));

    tracker.disconnect();
    assert!( tracker.scheduler().is_stopped());
    assert_eq!( tracker.on_frame( EpochMillis::new(2500)), FrameResult::Stopped);
    assert_eq!( tracker.on_frame( EpochMillis::new(5000)), FrameResult::Stopped);
    assert_eq!( *n_snapshots.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_reconnect_resumes_frames() {
    let mut tracker = populated_tracker();
    tracker.disconnect();
    assert_eq!( tracker.on_frame( EpochMillis::new(1500)), FrameResult::Stopped);

    tracker.connect().unwrap(); // nobody listening, retried in the background
    assert!( !tracker.scheduler().is_stopped());
    assert_eq!( tracker.on_frame( EpochMillis::new(1600)), FrameResult::Updated(3));
    tracker.disconnect();
}

#[test]
fn test_listeners_can_query_filters() {
    let tracker = populated_tracker();
    let seen = Arc::new( Mutex::new( Vec::<(String,Option<BoundingBox>,bool)>::new()));

    let c = Arc::downgrade( tracker.context());
    let s = seen.clone();
    tracker.on_deleted( move |id| {
        if let Some(ctx) = c.upgrade() {
            let subscription = ctx.subscription();
            s.lock().unwrap().push( (id.to_string(), subscription.bbox().copied(), subscription.long_distance_only()));
        }
    });

    let (tx, rx) = mpsc::channel();
    thread::spawn( move || {
        tracker.update_viewport( 25.0, 25.0, 125.0, 125.0); // evicts A
        tracker.set_long_distance_only( true);              // evicts B
        let _ = tx.send( tracker.store().len());
    });

    let n = rx.recv_timeout( secs(3)).expect("tracker blocked by deletion listener");
    assert_eq!( n, 1);

    let bbox = Some( BoundingBox::new( 25.0, 25.0, 125.0, 125.0));
    assert_eq!( *seen.lock().unwrap(), vec![ ("A".to_string(), bbox, false), ("B".to_string(), bbox, true) ]);
}
