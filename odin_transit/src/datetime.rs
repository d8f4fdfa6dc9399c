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

use std::{fmt, ops::Sub, time::Duration};
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize,Deserializer};
use parse_duration::parse;

/// wall clock time in milliseconds since the unix epoch. This is the time base of both the feed
/// (time interval timestamps) and the animation scheduler
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub fn now ()->Self { EpochMillis( Utc::now().timestamp_millis()) }

    pub fn new (millis: i64)->Self { EpochMillis(millis) }

    pub fn millis (&self)->i64 { self.0 }

    /// elapsed time since `earlier`, saturating at zero if the clock went backwards
    pub fn duration_since (&self, earlier: EpochMillis)->Duration {
        if self.0 > earlier.0 { Duration::from_millis( (self.0 - earlier.0) as u64) } else { Duration::ZERO }
    }

    pub fn add_duration (&self, dur: Duration)->EpochMillis {
        EpochMillis( self.0 + dur.as_millis() as i64)
    }
}

impl Sub for EpochMillis {
    type Output = i64;
    fn sub (self, rhs: EpochMillis)->i64 { self.0 - rhs.0 }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0)
        }
    }
}

#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }

/// serde helper for config durations such as "5s" or "16ms"
pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}
