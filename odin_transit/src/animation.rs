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

use std::{sync::{Arc,Mutex,atomic::{AtomicBool,Ordering}}, time::Duration};
use tokio::{runtime::Handle, task::AbortHandle, time::{interval,MissedTickBehavior}};
use tracing::{debug,trace};
use crate::{
    datetime::{millis, EpochMillis}, errors::{op_failed, Result}, interpolate::interpolate_position,
    listeners::TransitListeners, store::TrajectoryStore, symbol::SymbolCache, trajectory::Vehicle
};

/// the update interval depends on how many vehicles we have to interpolate
pub fn update_interval (n_vehicles: usize)->Duration {
    match n_vehicles {
        0..100 => millis(100),
        100..200 => millis(150),
        200..300 => millis(200),
        300..400 => millis(300),
        _ => millis(2000)
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub enum FrameResult {
    Stopped,        // scheduler was stopped, no further updates
    Busy,           // previous update still in progress, frame skipped
    NotDue,         // update interval not yet elapsed
    Updated(usize), // number of published vehicles
}

struct SchedulerState {
    last_update: Option<EpochMillis>,
    fps_window_start: Option<EpochMillis>,
    fps_ticks: u32,
    fps: f64,
    symbols: SymbolCache,
}

/// computes interpolated positions of all stored trajectories and publishes them as a complete vehicle list.
///
/// `on_frame` is supposed to be called on each display refresh, but only does work if the (vehicle count
/// dependent) update interval has elapsed since the last update. Frames that arrive while a previous update
/// is still in progress are dropped, not queued
pub struct AnimationScheduler {
    store: TrajectoryStore,
    listeners: Arc<TransitListeners>,
    fps_window: Duration,

    stopped: AtomicBool,
    busy: AtomicBool,
    state: Mutex<SchedulerState>,
}

impl AnimationScheduler {
    pub fn new (store: TrajectoryStore, listeners: Arc<TransitListeners>, fps_window: Duration, symbol_cache_size: usize)->Self {
        let state = SchedulerState {
            last_update: None,
            fps_window_start: None,
            fps_ticks: 0,
            fps: 0.0,
            symbols: SymbolCache::new( symbol_cache_size),
        };
        AnimationScheduler {
            store, listeners, fps_window,
            stopped: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            state: Mutex::new(state)
        }
    }

    pub fn on_frame (&self, now: EpochMillis)->FrameResult {
        if self.stopped.load( Ordering::Acquire) {
            return FrameResult::Stopped
        }
        if self.busy.compare_exchange( false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            trace!("skipping frame, update in progress");
            return FrameResult::Busy
        }
        let result = self.update( now);
        self.busy.store( false, Ordering::Release);
        result
    }

    fn update (&self, now: EpochMillis)->FrameResult {
        let (vehicles, fps) = {
            let mut state = self.state.lock().unwrap_or_else( |e| e.into_inner());
            let window_start = *state.fps_window_start.get_or_insert( now);

            if let Some(last_update) = state.last_update {
                if now.duration_since( last_update) < update_interval( self.store.len()) {
                    return FrameResult::NotDue
                }
            }
            state.last_update = Some(now);

            let vehicles = self.compute_vehicles( now, &mut state.symbols);

            state.fps_ticks += 1;
            let elapsed = now.duration_since( window_start);
            let fps = if elapsed >= self.fps_window {
                let fps = state.fps_ticks as f64 / elapsed.as_secs_f64();
                state.fps = fps;
                state.fps_ticks = 0;
                state.fps_window_start = Some(now);
                Some(fps)
            } else {
                None
            };

            (vehicles, fps)
        }; // state lock released before we call listeners

        let n = vehicles.len();
        if !self.store.is_empty() {
            self.listeners.vehicles.notify( vehicles.as_slice());
        }
        if let Some(fps) = fps {
            trace!("fps: {fps:.1}");
            self.listeners.fps.notify( &fps);
        }
        FrameResult::Updated(n)
    }

    fn compute_vehicles (&self, now: EpochMillis, symbols: &mut SymbolCache)->Vec<Vehicle> {
        let trajectories = self.store.snapshot();
        let mut vehicles = Vec::with_capacity( trajectories.len());

        for t in &trajectories {
            if let Some(pos) = interpolate_position( &t.coordinates, &t.intervals, now) {
                vehicles.push( Vehicle {
                    id: t.id.clone(),
                    x: pos.x,
                    y: pos.y,
                    heading: pos.heading,
                    line_name: t.line_name.clone(),
                    line_color: t.line_color.clone(),
                    destination: t.destination.clone(),
                    delay: t.delay,
                    mode: t.mode.clone(),
                    state: t.state.clone(),
                    symbol_key: Some( symbols.symbol_key( t)),
                })
            }
        }
        vehicles
    }

    /// interpolated vehicles at `now`, without publishing them
    pub fn vehicles_at (&self, now: EpochMillis)->Vec<Vehicle> {
        let mut state = self.state.lock().unwrap_or_else( |e| e.into_inner());
        self.compute_vehicles( now, &mut state.symbols)
    }

    /// the last reported frames per second value (scheduler ticks, not host frames)
    pub fn fps (&self)->f64 {
        self.state.lock().unwrap_or_else( |e| e.into_inner()).fps
    }

    pub fn is_busy (&self)->bool { self.busy.load( Ordering::Acquire) }

    /// no more updates or listener notifications until `resume()`. An update that is already in progress
    /// completes
    pub fn stop (&self) {
        if !self.stopped.swap( true, Ordering::AcqRel) {
            debug!("animation stopped");
        }
    }

    /// resume after `stop()`. The next frame starts a new update interval and FPS window
    pub fn resume (&self) {
        if self.stopped.swap( false, Ordering::AcqRel) {
            let mut state = self.state.lock().unwrap_or_else( |e| e.into_inner());
            state.last_update = None;
            state.fps_window_start = None;
            state.fps_ticks = 0;
            debug!("animation resumed");
        }
    }

    pub fn is_stopped (&self)->bool { self.stopped.load( Ordering::Acquire) }

    /// our own frame driver for hosts that don't have a display refresh callback. Abort the returned
    /// handle to stop animation
    pub fn spawn_frame_driver (self: &Arc<Self>, frame_interval: Duration)->Result<AbortHandle> {
        if frame_interval.is_zero() { return Err( op_failed("zero frame interval")) }
        let rt = Handle::try_current().map_err( |e| op_failed( format!("no async runtime: {e}")))?;
        let scheduler = self.clone();

        let jh = rt.spawn( async move {
            let mut frames = interval( frame_interval);
            frames.set_missed_tick_behavior( MissedTickBehavior::Skip);
            loop {
                frames.tick().await;
                if scheduler.on_frame( EpochMillis::now()) == FrameResult::Stopped { break }
            }
        });
        debug!("frame driver started with {frame_interval:?} interval");
        Ok( jh.abort_handle() )
    }
}
