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

use std::{collections::BTreeMap, sync::Arc};
use dashmap::DashMap;
use serde::Serialize;
use crate::trajectory::Trajectory;

/// the latest trajectory of each tracked vehicle, keyed by vehicle id.
/// This is a cheap-to-clone handle - all clones refer to the same map, which is written by the feed
/// processor and the subscription manager (eviction) and read by the animation scheduler
#[derive(Debug,Clone,Default)]
pub struct TrajectoryStore {
    trajectories: Arc<DashMap<String,Arc<Trajectory>>>,
}

impl TrajectoryStore {
    pub fn new ()->Self {
        TrajectoryStore { trajectories: Arc::new( DashMap::new()) }
    }

    /// store trajectory, replacing whatever we had for this vehicle (no merge)
    pub fn upsert (&self, trajectory: Trajectory) {
        self.trajectories.insert( trajectory.id.as_ref().clone(), Arc::new(trajectory));
    }

    pub fn remove (&self, id: &str)->Option<Arc<Trajectory>> {
        self.trajectories.remove(id).map( |(_,t)| t)
    }

    pub fn get (&self, id: &str)->Option<Arc<Trajectory>> {
        self.trajectories.get(id).map( |e| e.value().clone())
    }

    pub fn contains (&self, id: &str)->bool {
        self.trajectories.contains_key(id)
    }

    /// snapshot of all current trajectories. Holding on to it does not block writers
    pub fn snapshot (&self)->Vec<Arc<Trajectory>> {
        self.trajectories.iter().map( |e| e.value().clone()).collect()
    }

    pub fn len (&self)->usize { self.trajectories.len() }

    pub fn is_empty (&self)->bool { self.trajectories.is_empty() }

    /// remove all trajectories for which `pred` returns true and return their ids
    pub fn remove_if<F> (&self, pred: F)->Vec<Arc<String>> where F: Fn(&Trajectory)->bool {
        let candidates: Vec<Arc<String>> = self.trajectories.iter()
            .filter( |e| pred( &**e.value()))
            .map( |e| e.value().id.clone())
            .collect();

        // second pass since we can't remove while iterating a DashMap. Re-check since the entry might
        // have been replaced in between
        candidates.into_iter()
            .filter( |id| self.trajectories.remove_if( id.as_str(), |_,t| pred(&**t)).is_some())
            .collect()
    }

    pub fn vehicle_counts (&self)->VehicleCounts {
        let mut by_mode: BTreeMap<String,usize> = BTreeMap::new();
        let mut total = 0;

        for e in self.trajectories.iter() {
            total += 1;
            let mode = e.value().mode.clone().unwrap_or_else( || "unknown".to_string());
            *by_mode.entry(mode).or_insert(0) += 1;
        }
        VehicleCounts { total, by_mode }
    }
}

/// tracked vehicles in total and per transport mode (vehicles without mode are counted as "unknown")
#[derive(Serialize,Debug,Clone,Default,PartialEq)]
pub struct VehicleCounts {
    pub total: usize,
    pub by_mode: BTreeMap<String,usize>,
}

impl VehicleCounts {
    pub fn count_for (&self, mode: &str)->usize {
        self.by_mode.get(mode).copied().unwrap_or(0)
    }
}
