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

use std::time::Duration;
use tokio::{self, signal, time::interval};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use odin_transit::{TransitTracker, config::{load_config, TransitConfig}};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "monitor a live vehicle trajectory feed")]
pub struct Args {
    /// RON config file (defaults are used if not set)
    #[arg(short,long)]
    pub config: Option<String>,

    /// websocket URI of the feed (overrides config)
    #[arg(short,long)]
    pub uri: Option<String>,

    /// comma separated transport modes to subscribe to (overrides config)
    #[arg(short,long, value_delimiter=',')]
    pub modes: Option<Vec<String>>,

    /// only show long-distance rail services
    #[arg(short,long)]
    pub long_distance: bool,

    #[arg(short,long)]
    pub zoom: Option<u8>,

    /// viewport as "left bottom right top" in feed coordinates
    #[arg(num_args=4, required=true, allow_negative_numbers=true)]
    pub bbox: Vec<f64>,
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .init();

    let args = Args::parse();

    let mut config: TransitConfig = match &args.config {
        Some(path) => load_config( path)?,
        None => TransitConfig::default()
    };
    if let Some(uri) = &args.uri { config.ws_uri = uri.clone(); }
    if let Some(modes) = &args.modes { config.modes = modes.clone(); }
    if let Some(zoom) = args.zoom { config.zoom_level = zoom; }
    config.long_distance_only |= args.long_distance;

    let mut tracker = TransitTracker::new( config);
    tracker.on_fps( |fps| println!("fps: {fps:.1}"));
    tracker.update_viewport( args.bbox[0], args.bbox[1], args.bbox[2], args.bbox[3]);
    tracker.start()?;

    let mut report = interval( Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let counts = tracker.get_vehicle_counts();
                println!("{}: {} vehicles {:?}", tracker.connection_state(), counts.total, counts.by_mode);
            }
            _ = signal::ctrl_c() => break
        }
    }

    println!("terminating..");
    tracker.disconnect();
    Ok(())
}
