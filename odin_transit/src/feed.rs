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

//! decoding and processing of inbound trajectory feed messages.
//!
//! Inbound frames are JSON envelopes
//! ```text
//!   { "source": "trajectory"|"deleted_vehicles"|"buffer"|.., "timestamp": <epoch ms>, "content": .., "client_reference": .. }
//! ```
//! where `trajectory` content is a GeoJSON LineString feature, `deleted_vehicles` content is a vehicle id
//! and `buffer` content is an array of (trajectory or deleted_vehicles) envelopes that are replayed in order.
//! Anything we can't decode is protocol noise (e.g. pong acknowledgements) and silently ignored.

use std::sync::Arc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug,trace};
use crate::{
    listeners::TransitListeners, store::TrajectoryStore,
    trajectory::{Point, TimeInterval, Trajectory, TrajectoryUpdate}
};

/* #region wire format ***********************************************************************************/

#[derive(Deserialize,Debug)]
pub struct FeedEnvelope {
    pub source: String,
    #[serde(default)] pub timestamp: Option<f64>,
    #[serde(default)] pub content: Value,
    #[serde(default)] pub client_reference: Option<Value>,
}

#[derive(Deserialize,Debug)]
struct TrajectoryFeature {
    geometry: Option<LineStringGeometry>,
    properties: Option<TrajectoryProperties>,
}

#[derive(Deserialize,Debug)]
struct LineStringGeometry {
    #[serde(default)] coordinates: Vec<Vec<f64>>, // we only use x,y even if there are more dimensions
}

#[derive(Deserialize,Debug)]
struct TrajectoryProperties {
    train_id: Option<Value>,
    line: Option<LineInfo>,
    #[serde(rename="type")] mode: Option<String>,
    time_intervals: Option<Vec<(f64,f64,Option<f64>)>>,
    delay: Option<f64>,
    state: Option<String>,
    destination: Option<String>,
}

#[derive(Deserialize,Debug)]
struct LineInfo {
    name: Option<String>,
    color: Option<String>,
}

/* #endregion wire format */

/// a decoded inbound message
#[derive(Debug)]
pub enum FeedMsg {
    Trajectory(Trajectory),
    DeletedVehicle(String),
    Buffer(Vec<FeedMsg>),
    Invalid(&'static str), // recognized message kind but missing required fields
    Ignored                // protocol noise
}

/// what happened while processing a message
#[derive(Debug,Default,Clone,Copy,PartialEq)]
pub struct FeedStats {
    pub updated: usize,
    pub deleted: usize,
    pub dropped: usize, // invalid or rejected by filter
}

impl FeedStats {
    fn add (&mut self, other: FeedStats) {
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.dropped += other.dropped;
    }
}

pub fn decode_frame (frame: &str)->FeedMsg {
    match serde_json::from_str::<FeedEnvelope>(frame) {
        Ok(envelope) => decode_envelope( envelope, true),
        Err(_) => {
            trace!("ignoring non-envelope frame {frame:?}");
            FeedMsg::Ignored
        }
    }
}

fn decode_envelope (envelope: FeedEnvelope, allow_buffer: bool)->FeedMsg {
    match envelope.source.as_str() {
        "trajectory" => decode_trajectory( envelope.content),
        "deleted_vehicles" => match id_string( &envelope.content) {
            Some(id) => FeedMsg::DeletedVehicle(id),
            None => FeedMsg::Invalid("deleted_vehicles without id")
        }
        "buffer" if allow_buffer => match envelope.content {
            Value::Array(elems) => {
                let msgs = elems.into_iter().map( |e| {
                    match serde_json::from_value::<FeedEnvelope>(e) {
                        Ok(envelope) => decode_envelope( envelope, false), // no nested buffers
                        Err(_) => FeedMsg::Ignored
                    }
                }).collect();
                FeedMsg::Buffer(msgs)
            }
            _ => FeedMsg::Ignored
        }
        _ => FeedMsg::Ignored
    }
}

fn id_string (v: &Value)->Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None
    }
}

fn decode_trajectory (content: Value)->FeedMsg {
    let Ok(feature) = serde_json::from_value::<TrajectoryFeature>(content) else {
        return FeedMsg::Invalid("malformed trajectory feature")
    };
    let Some(props) = feature.properties else { return FeedMsg::Invalid("trajectory without properties") };
    let Some(id) = props.train_id.as_ref().and_then(id_string) else { return FeedMsg::Invalid("trajectory without train_id") };

    let intervals: Vec<TimeInterval> = match props.time_intervals {
        Some(tis) if !tis.is_empty() => tis.into_iter()
            .map( |(ts,fraction,heading)| TimeInterval::new( ts as i64, fraction, heading.unwrap_or(0.0)))
            .collect(),
        _ => return FeedMsg::Invalid("trajectory without time_intervals")
    };

    let coordinates: Vec<Point> = feature.geometry
        .map( |g| g.coordinates.into_iter().filter( |c| c.len() >= 2).map( |c| [c[0],c[1]]).collect())
        .unwrap_or_default();
    if coordinates.is_empty() { return FeedMsg::Invalid("trajectory without coordinates") }

    let (line_name, line_color) = match props.line {
        Some(line) => (line.name, line.color),
        None => (None, None)
    };

    FeedMsg::Trajectory( Trajectory {
        id: Arc::new(id),
        coordinates: coordinates.into(),
        intervals,
        line_name,
        line_color,
        destination: props.destination,
        delay: props.delay.map( |d| d as i64),
        mode: props.mode,
        state: props.state,
    })
}

/// what listeners have to be told about a processed message. We collect these while the subscription
/// state is locked and notify once it is released, so that listeners can query the subscription
#[derive(Debug,Clone)]
pub enum FeedEvent {
    Updated(TrajectoryUpdate),
    Deleted(String),
}

impl FeedEvent {
    pub fn notify (&self, listeners: &TransitListeners) {
        match self {
            FeedEvent::Updated(update) => listeners.trajectory.notify( update),
            FeedEvent::Deleted(id) => listeners.deleted.notify( id.as_str()),
        }
    }
}

/// applies decoded feed messages to the trajectory store and records the resulting [`FeedEvent`]s.
/// This is created per frame since the transport mode and long-distance filters can change between frames
pub struct FeedProcessor<'a> {
    store: &'a TrajectoryStore,
    modes: &'a [String], // empty means all modes
    long_distance_only: bool,
}

impl<'a> FeedProcessor<'a> {
    pub fn new (store: &'a TrajectoryStore, modes: &'a [String], long_distance_only: bool)->Self {
        FeedProcessor { store, modes, long_distance_only }
    }

    pub fn process_frame (&self, frame: &str, events: &mut Vec<FeedEvent>)->FeedStats {
        self.process_msg( decode_frame(frame), events)
    }

    pub fn process_msg (&self, msg: FeedMsg, events: &mut Vec<FeedEvent>)->FeedStats {
        let mut stats = FeedStats::default();
        match msg {
            FeedMsg::Trajectory(trajectory) => {
                if !trajectory.matches_modes( self.modes) {
                    trace!("dropping {trajectory} not matching modes {:?}", self.modes);
                    stats.dropped += 1;
                } else if self.long_distance_only && trajectory.fails_long_distance_filter() {
                    trace!("dropping non long-distance {trajectory}");
                    stats.dropped += 1;
                } else {
                    let update = TrajectoryUpdate::from( &trajectory);
                    self.store.upsert( trajectory);
                    events.push( FeedEvent::Updated(update));
                    stats.updated += 1;
                }
            }
            FeedMsg::DeletedVehicle(id) => {
                self.store.remove( &id);
                events.push( FeedEvent::Deleted(id));
                stats.deleted += 1;
            }
            FeedMsg::Buffer(msgs) => {
                let n = msgs.len();
                for msg in msgs {
                    stats.add( self.process_msg( msg, events));
                }
                debug!("replayed buffer of {n} messages: {stats:?}");
            }
            FeedMsg::Invalid(reason) => {
                trace!("dropping invalid message: {reason}");
                stats.dropped += 1;
            }
            FeedMsg::Ignored => {}
        }
        stats
    }
}
