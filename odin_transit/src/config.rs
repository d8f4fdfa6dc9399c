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

use std::{fs, path::Path, time::Duration};
use serde::Deserialize;
use crate::{datetime::{deserialize_duration, millis, secs}, errors::{config_error, Result}};

/// configuration of a TransitTracker. All fields have defaults, i.e. a RON config only needs to
/// contain what differs, e.g.
/// ```text
/// TransitConfig(
///     ws_uri: "wss://api.example.org/ws?key=...",
///     modes: ["rail", "tram"],
///     reconnect_delay: "5s",
/// )
/// ```
#[derive(Deserialize,Debug,Clone)]
#[serde(default)]
pub struct TransitConfig {
    /// websocket endpoint of the trajectory feed
    pub ws_uri: String,

    #[serde(deserialize_with="deserialize_duration")]
    pub reconnect_delay: Duration,

    #[serde(deserialize_with="deserialize_duration")]
    pub ping_interval: Duration,
    pub ping_payload: String,

    /// number of buffered messages the server should replay after each subscription
    pub buffer_size: usize,
    pub zoom_level: u8,

    /// initial transport mode allow-list
    pub modes: Vec<String>,
    pub long_distance_only: bool,

    /// period of our own frame driver (if the host doesn't call `on_frame` itself)
    #[serde(deserialize_with="deserialize_duration")]
    pub frame_interval: Duration,

    #[serde(deserialize_with="deserialize_duration")]
    pub fps_window: Duration,

    pub significance_threshold: f64,
    pub symbol_cache_size: usize,
}

impl Default for TransitConfig {
    fn default ()->Self {
        TransitConfig {
            ws_uri: "ws://localhost:9030/ws".to_string(),
            reconnect_delay: secs(5),
            ping_interval: secs(30),
            ping_payload: "PING".to_string(),
            buffer_size: 100,
            zoom_level: 12,
            modes: vec!["rail".to_string()],
            long_distance_only: false,
            frame_interval: millis(16),
            fps_window: secs(1),
            significance_threshold: 0.05,
            symbol_cache_size: 500,
        }
    }
}

impl TransitConfig {
    pub fn with_ws_uri (ws_uri: impl ToString)->Self {
        TransitConfig { ws_uri: ws_uri.to_string(), ..Default::default() }
    }

    /// sanity check values that would stall the connection or animation loops
    pub fn check (&self)->Result<()> {
        if self.ws_uri.is_empty() { return Err( config_error("empty ws_uri")) }
        if self.ping_interval.is_zero() { return Err( config_error("zero ping_interval")) }
        if self.frame_interval.is_zero() { return Err( config_error("zero frame_interval")) }
        if !(self.significance_threshold >= 0.0) { return Err( config_error("invalid significance_threshold")) }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>> (path: P)->Result<TransitConfig> {
    let data = fs::read_to_string( path.as_ref())?;
    parse_config( &data)
}

pub fn parse_config (data: &str)->Result<TransitConfig> {
    let config: TransitConfig = ron::from_str( data)?;
    config.check()?;
    Ok(config)
}
