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

//! real-time vehicle tracking for transit maps.
//!
//! `odin_transit` consumes a websocket feed of sparse vehicle trajectories (coordinate path plus time calibrated
//! path fractions), keeps the latest trajectory per vehicle, and periodically interpolates smooth positions for
//! all of them. The renderer only sees complete vehicle snapshots, deletion and trajectory notifications.
//!
//! The feed subscription follows the viewport: significant viewport changes, transport mode filter changes and
//! reconnects re-issue the subscription, and vehicles that are out of view or filtered out get evicted.
//!
//! Listeners are always called after the subscription state is unlocked, i.e. they can query viewport and filters.

use std::sync::{Arc,Mutex,MutexGuard};
use tokio::{sync::watch, task::AbortHandle};
use tracing::{debug,info};

pub mod errors;
pub mod datetime;
pub mod config;
pub mod trajectory;
pub mod interpolate;
pub mod store;
pub mod listeners;
pub mod feed;
pub mod subscription;
pub mod symbol;
pub mod animation;
pub mod connection;

use errors::Result;
use config::TransitConfig;
use datetime::EpochMillis;
use trajectory::{BoundingBox, TrajectoryUpdate, Vehicle};
use store::{TrajectoryStore, VehicleCounts};
use listeners::TransitListeners;
use feed::{FeedEvent, FeedProcessor, FeedStats};
use subscription::{FilterChange, SubscriptionManager};
use animation::{AnimationScheduler, FrameResult};
use connection::{ConnectionState, LiveConnection};

/// the state that is shared between the connection task, the animation scheduler and the host API
#[derive(Debug)]
pub struct TransitContext {
    pub store: TrajectoryStore,
    pub listeners: Arc<TransitListeners>,
    subscription: Mutex<SubscriptionManager>,
}

impl TransitContext {
    pub fn new (subscription: SubscriptionManager)->Self {
        TransitContext {
            store: TrajectoryStore::new(),
            listeners: Arc::new( TransitListeners::new()),
            subscription: Mutex::new( subscription),
        }
    }

    pub fn subscription (&self)->MutexGuard<'_,SubscriptionManager> {
        self.subscription.lock().unwrap_or_else( |e| e.into_inner())
    }

    pub fn subscription_cmds (&self)->Option<Vec<String>> {
        self.subscription().subscription_cmds()
    }

    /// process an inbound feed frame. We keep the subscription locked while updating the store in order to
    /// not interleave with filter changes, but notify listeners only after it is released
    pub fn process_frame (&self, frame: &str)->FeedStats {
        let mut events: Vec<FeedEvent> = Vec::new();
        let stats = {
            let subscription = self.subscription();
            FeedProcessor::new( &self.store, subscription.modes(), subscription.long_distance_only())
                .process_frame( frame, &mut events)
        };
        self.listeners.notify_feed_events( &events);
        stats
    }
}

/// the host facing API: register listeners, drive the viewport and filters, and query vehicles
pub struct TransitTracker {
    config: Arc<TransitConfig>,
    ctx: Arc<TransitContext>,
    scheduler: Arc<AnimationScheduler>,

    connection: Option<LiveConnection>,
    frame_driver: Option<AbortHandle>,
}

impl TransitTracker {
    pub fn new (config: TransitConfig)->Self {
        let ctx = Arc::new( TransitContext::new( SubscriptionManager::from_config( &config)));
        let scheduler = Arc::new( AnimationScheduler::new(
            ctx.store.clone(), ctx.listeners.clone(), config.fps_window, config.symbol_cache_size
        ));

        TransitTracker { config: Arc::new(config), ctx, scheduler, connection: None, frame_driver: None }
    }

    pub fn config (&self)->&TransitConfig { self.config.as_ref() }
    pub fn context (&self)->&Arc<TransitContext> { &self.ctx }
    pub fn store (&self)->&TrajectoryStore { &self.ctx.store }
    pub fn scheduler (&self)->&Arc<AnimationScheduler> { &self.scheduler }

    //--- listener registration (any number per event type)

    pub fn on_vehicles<F> (&self, f: F) where F: Fn(&[Vehicle]) + Send + Sync + 'static {
        self.ctx.listeners.vehicles.add(f)
    }

    pub fn on_deleted<F> (&self, f: F) where F: Fn(&str) + Send + Sync + 'static {
        self.ctx.listeners.deleted.add(f)
    }

    pub fn on_trajectory<F> (&self, f: F) where F: Fn(&TrajectoryUpdate) + Send + Sync + 'static {
        self.ctx.listeners.trajectory.add(f)
    }

    pub fn on_fps<F> (&self, f: F) where F: Fn(&f64) + Send + Sync + 'static {
        self.ctx.listeners.fps.add(f)
    }

    //--- lifecycle

    /// connect to the feed and start our own frame driver
    pub fn start (&mut self)->Result<()> {
        self.connect()?;
        if self.frame_driver.is_none() {
            self.frame_driver = Some( self.scheduler.spawn_frame_driver( self.config.frame_interval)?);
        }
        Ok(())
    }

    /// only connect to the feed. Use this if the host drives animation by calling `on_frame`
    pub fn connect (&mut self)->Result<()> {
        if self.connection.is_none() {
            self.scheduler.resume();
            info!("connecting to {}", self.config.ws_uri);
            self.connection = Some( LiveConnection::start( self.config.clone(), self.ctx.clone())?);
        }
        Ok(())
    }

    /// to be called from the host display refresh callback
    pub fn on_frame (&self, now: EpochMillis)->FrameResult {
        self.scheduler.on_frame( now)
    }

    /// cancel pending reconnects and keepalives, stop animation and close the feed connection. Host driven
    /// frames are ignored (`FrameResult::Stopped`) until the next `connect()`
    pub fn disconnect (&mut self) {
        self.scheduler.stop();
        if let Some(frame_driver) = self.frame_driver.take() {
            frame_driver.abort();
        }
        if let Some(mut connection) = self.connection.take() {
            connection.terminate();
        }
    }

    pub fn connection_state (&self)->ConnectionState {
        self.connection.as_ref().map( |c| c.state()).unwrap_or( ConnectionState::Disconnected)
    }

    pub fn subscribe_connection_state (&self)->Option<watch::Receiver<ConnectionState>> {
        self.connection.as_ref().map( |c| c.subscribe_state())
    }

    //--- viewport and filters

    /// returns true if the change was significant and we re-subscribed
    pub fn update_viewport (&self, left: f64, bottom: f64, right: f64, top: f64)->bool {
        let bbox = BoundingBox::new( left, bottom, right, top);
        let (change, cmds) = {
            let mut subscription = self.ctx.subscription();
            let change = subscription.update_viewport( bbox, &self.ctx.store);
            let cmds = if change.resubscribe { subscription.subscription_cmds() } else { None };
            (change, cmds)
        };
        self.ctx.listeners.notify_deleted_all( &change.evicted);
        self.send_subscription( cmds)
    }

    /// takes effect with the next subscription
    pub fn set_zoom_level (&self, zoom_level: u8) {
        self.ctx.subscription().set_zoom_level( zoom_level)
    }

    /// replace the transport mode allow-list. If the mode set changed this evicts non-matching vehicles and
    /// re-issues the live subscription (if we already have a viewport)
    pub fn set_transport_filter (&self, modes: Vec<String>)->FilterChange {
        let (change, cmds) = {
            let mut subscription = self.ctx.subscription();
            let change = subscription.set_transport_filter( modes, &self.ctx.store);
            let cmds = if change.resubscribe { subscription.subscription_cmds() } else { None };
            (change, cmds)
        };
        self.ctx.listeners.notify_deleted_all( &change.evicted);
        self.send_subscription( cmds);
        change
    }

    /// returns the number of evicted vehicles
    pub fn set_long_distance_only (&self, enabled: bool)->usize {
        let evicted = self.ctx.subscription().set_long_distance_only( enabled, &self.ctx.store);
        self.ctx.listeners.notify_deleted_all( &evicted);
        evicted.len()
    }

    pub fn transport_filter (&self)->Vec<String> { self.ctx.subscription().modes().to_vec() }
    pub fn long_distance_only (&self)->bool { self.ctx.subscription().long_distance_only() }
    pub fn viewport (&self)->Option<BoundingBox> { self.ctx.subscription().bbox().copied() }

    fn send_subscription (&self, cmds: Option<Vec<String>>)->bool {
        match cmds {
            Some(cmds) => {
                if let Some(connection) = &self.connection {
                    debug!("re-subscribing: {cmds:?}");
                    connection.send_cmds( cmds);
                }
                true
            }
            None => false
        }
    }

    //--- queries

    /// the current interpolated vehicles (not published to listeners)
    pub fn get_vehicles (&self)->Vec<Vehicle> {
        self.scheduler.vehicles_at( EpochMillis::now())
    }

    pub fn get_vehicle_counts (&self)->VehicleCounts {
        self.ctx.store.vehicle_counts()
    }

    pub fn fps (&self)->f64 { self.scheduler.fps() }
}

impl Drop for TransitTracker {
    fn drop (&mut self) {
        self.disconnect()
    }
}
