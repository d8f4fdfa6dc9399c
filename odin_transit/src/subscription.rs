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

use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;
use crate::{
    config::TransitConfig, store::TrajectoryStore,
    trajectory::{BoundingBox, Trajectory}
};

/// result of a viewport update
#[derive(Debug,Default,PartialEq)]
pub struct ViewportChange {
    pub resubscribe: bool,         // the change was significant, the live subscription has to be re-issued
    pub evicted: Vec<Arc<String>>, // vehicles that are no longer in view
}

/// result of a transport mode filter update
#[derive(Debug,Default,PartialEq)]
pub struct FilterChange {
    pub resubscribe: bool,         // mode set changed, live subscription has to be re-issued to get the new modes
    pub evicted: Vec<Arc<String>>,
}

/// keeps track of what we are subscribed to (viewport, zoom level, transport modes) and the long-distance
/// filter, and prunes the trajectory store if any of these change.
/// Mutators return the ids of evicted vehicles instead of notifying deletion listeners themselves. Callers
/// are supposed to notify after releasing whatever lock protects the manager
#[derive(Debug,Clone)]
pub struct SubscriptionManager {
    bbox: Option<BoundingBox>,
    zoom_level: u8,
    modes: Vec<String>,
    long_distance_only: bool,

    threshold: f64,     // relative change below which viewport updates are ignored
    buffer_size: usize, // number of buffered messages we request with each subscription
}

impl SubscriptionManager {
    pub fn new (modes: Vec<String>, long_distance_only: bool, zoom_level: u8, threshold: f64, buffer_size: usize)->Self {
        SubscriptionManager { bbox: None, zoom_level, modes, long_distance_only, threshold, buffer_size }
    }

    pub fn from_config (config: &TransitConfig)->Self {
        Self::new( config.modes.clone(), config.long_distance_only, config.zoom_level, config.significance_threshold, config.buffer_size)
    }

    pub fn bbox (&self)->Option<&BoundingBox> { self.bbox.as_ref() }
    pub fn zoom_level (&self)->u8 { self.zoom_level }
    pub fn modes (&self)->&[String] { self.modes.as_slice() }
    pub fn long_distance_only (&self)->bool { self.long_distance_only }

    /// the new zoom level is used with the next subscription
    pub fn set_zoom_level (&mut self, zoom_level: u8) { self.zoom_level = zoom_level; }

    pub fn update_viewport (&mut self, bbox: BoundingBox, store: &TrajectoryStore)->ViewportChange {
        if let Some(old) = &self.bbox {
            if !is_significant_change( old, &bbox, self.threshold) {
                return ViewportChange::default()
            }
        }
        self.bbox = Some(bbox);

        let evicted = store.remove_if( |t| !is_in_view( t, &bbox));
        if !evicted.is_empty() {
            debug!("evicted {} vehicles outside of {bbox}", evicted.len());
        }

        ViewportChange { resubscribe: true, evicted }
    }

    /// replace the transport mode allow-list. Note this does not resubscribe by itself - if the returned
    /// `FilterChange` says so the caller has to re-issue the `subscription_cmds()`
    pub fn set_transport_filter (&mut self, modes: Vec<String>, store: &TrajectoryStore)->FilterChange {
        let changed = as_set( &self.modes) != as_set( &modes);
        self.modes = modes;

        if changed {
            let modes = self.modes.as_slice();
            let evicted = store.remove_if( |t| !t.matches_modes( modes));
            if !evicted.is_empty() {
                debug!("evicted {} vehicles not matching modes {:?}", evicted.len(), modes);
            }
            FilterChange { resubscribe: true, evicted }
        } else {
            FilterChange::default()
        }
    }

    /// disabling does not restore vehicles that were evicted while enabled - they come back with the next update
    pub fn set_long_distance_only (&mut self, enabled: bool, store: &TrajectoryStore)->Vec<Arc<String>> {
        if enabled == self.long_distance_only { return Vec::new() }
        self.long_distance_only = enabled;

        if enabled {
            let evicted = store.remove_if( Trajectory::fails_long_distance_filter);
            if !evicted.is_empty() {
                debug!("evicted {} non long-distance vehicles", evicted.len());
            }
            evicted
        } else {
            Vec::new()
        }
    }

    /// the commands to send to the server for (re-)subscribing, or `None` if we don't have a viewport yet
    pub fn subscription_cmds (&self)->Option<Vec<String>> {
        self.bbox.as_ref().map( |bbox| {
            let mut bbox_cmd = format!("BBOX {} {}", bbox, self.zoom_level);
            if !self.modes.is_empty() {
                bbox_cmd.push_str(" mots=");
                bbox_cmd.push_str( &self.modes.join(","));
            }
            vec![ bbox_cmd, format!("BUFFER {}", self.buffer_size) ]
        })
    }
}

/// a viewport change is insignificant if size and center changes are all below `threshold` relative to the old
/// width/height. Note the divisor floor of 1 is in coordinate units
pub fn is_significant_change (old: &BoundingBox, new: &BoundingBox, threshold: f64)->bool {
    let w = old.width().max(1.0);
    let h = old.height().max(1.0);

    let old_center = old.center();
    let new_center = new.center();

    let dw = (new.width() - old.width()).abs() / w;
    let dh = (new.height() - old.height()).abs() / h;
    let dx = (new_center[0] - old_center[0]).abs() / w;
    let dy = (new_center[1] - old_center[1]).abs() / h;

    !(dw < threshold && dh < threshold && dx < threshold && dy < threshold)
}

fn is_in_view (t: &Trajectory, bbox: &BoundingBox)->bool {
    t.last_point().map( |p| bbox.contains(p)).unwrap_or(false)
}

fn as_set (modes: &[String])->BTreeSet<&str> {
    modes.iter().map( |m| m.as_str()).collect()
}
