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

use std::{collections::{HashMap,VecDeque}, sync::Arc};
use crate::trajectory::Trajectory;

/// bounded cache of map symbol keys. The renderer picks (and caches) its icons by these keys, i.e. we
/// hand out the same `Arc<str>` for the same (mode, line name, line color) combination.
/// Eviction is FIFO once we reach capacity
#[derive(Debug)]
pub struct SymbolCache {
    capacity: usize,
    keys: HashMap<String,Arc<str>>,
    order: VecDeque<String>,
}

impl SymbolCache {
    pub fn new (capacity: usize)->Self {
        let capacity = capacity.max(1);
        SymbolCache { capacity, keys: HashMap::with_capacity(capacity), order: VecDeque::with_capacity(capacity) }
    }

    pub fn symbol_key (&mut self, t: &Trajectory)->Arc<str> {
        let key = format!("{}:{}:{}",
            t.mode.as_deref().unwrap_or(""),
            t.line_name.as_deref().unwrap_or(""),
            t.line_color.as_deref().unwrap_or("")
        );

        if let Some(sym) = self.keys.get( &key) {
            return sym.clone()
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove( &oldest);
            }
        }

        let sym: Arc<str> = Arc::from( key.as_str());
        self.order.push_back( key.clone());
        self.keys.insert( key, sym.clone());
        sym
    }

    pub fn len (&self)->usize { self.keys.len() }
    pub fn is_empty (&self)->bool { self.keys.is_empty() }
    pub fn capacity (&self)->usize { self.capacity }
}
