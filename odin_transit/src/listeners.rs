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

use std::{fmt, sync::{Arc,RwLock}};
use crate::{feed::FeedEvent, trajectory::{TrajectoryUpdate, Vehicle}};

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// container for any number of listeners of the same event type.
/// Listeners are called in registration order. We call them outside of the lock so that a listener
/// can register other listeners without deadlocking
pub struct ListenerList<T> where T: ?Sized {
    entries: RwLock<Vec<Listener<T>>>
}

impl<T> ListenerList<T> where T: ?Sized {
    pub fn new ()->Self { ListenerList { entries: RwLock::new( Vec::new()) } }

    pub fn add<F> (&self, f: F) where F: Fn(&T) + Send + Sync + 'static {
        self.entries.write().unwrap_or_else( |e| e.into_inner()).push( Arc::new(f));
    }

    pub fn notify (&self, data: &T) {
        let entries: Vec<Listener<T>> = self.entries.read().unwrap_or_else( |e| e.into_inner()).clone();
        for f in &entries {
            f(data)
        }
    }

    pub fn len (&self)->usize { self.entries.read().unwrap_or_else( |e| e.into_inner()).len() }

    pub fn is_empty (&self)->bool { self.len() == 0 }
}

impl<T> Default for ListenerList<T> where T: ?Sized {
    fn default ()->Self { Self::new() }
}

impl<T> fmt::Debug for ListenerList<T> where T: ?Sized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "ListenerList(n: {})", self.len())
    }
}

/// the events the host (renderer, UI panels) can subscribe to
#[derive(Debug,Default)]
pub struct TransitListeners {
    pub vehicles: ListenerList<[Vehicle]>,        // complete snapshot, once per animation tick
    pub deleted: ListenerList<str>,               // vehicle id, on explicit deletion or eviction
    pub trajectory: ListenerList<TrajectoryUpdate>, // newly stored trajectory
    pub fps: ListenerList<f64>,                   // once per FPS window
}

impl TransitListeners {
    pub fn new ()->Self { Self::default() }

    pub fn notify_feed_events (&self, events: &[FeedEvent]) {
        for e in events {
            e.notify( self)
        }
    }

    pub fn notify_deleted_all (&self, ids: &[Arc<String>]) {
        for id in ids {
            self.deleted.notify( id.as_str())
        }
    }
}
