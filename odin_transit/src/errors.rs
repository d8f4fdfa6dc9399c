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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinTransitError>;

/// odin_transit specific error type. We only return these from setup operations (config loading,
/// connecting). Everything that goes wrong while the feed is live is logged and degrades into
/// "ignore" or "retry later"
#[derive(Error,Debug,Clone)]
pub enum OdinTransitError {
    #[error("IO error {0}")]
    IOError(String),

    #[error("config error {0}")]
    ConfigError(String),

    #[error("JSON error {0}")]
    JsonError(String),

    #[error("websock error {0}")]
    WsError(String),

    #[error("connector error {0}")]
    ConnectorError(String),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String)
}

/// map an external error type into one of our opaque (String carrying) variants
macro_rules! map_to_opaque_error {
    ($from_error:ty => $to_error:ident :: $variant:ident) => {
        impl From<$from_error> for $to_error {
            fn from (e: $from_error)->Self { $to_error :: $variant ( e.to_string()) }
        }
    };
}

map_to_opaque_error!{ std::io::Error => OdinTransitError::IOError }
map_to_opaque_error!{ serde_json::Error => OdinTransitError::JsonError }
map_to_opaque_error!{ ron::error::SpannedError => OdinTransitError::ConfigError }
map_to_opaque_error!{ tokio_tungstenite::tungstenite::Error => OdinTransitError::WsError }

pub fn op_failed (msg: impl ToString)->OdinTransitError {
    OdinTransitError::OpFailed(msg.to_string())
}

pub fn connector_error (msg: impl ToString)->OdinTransitError {
    OdinTransitError::ConnectorError(msg.to_string())
}

pub fn config_error (msg: impl ToString)->OdinTransitError {
    OdinTransitError::ConfigError(msg.to_string())
}
