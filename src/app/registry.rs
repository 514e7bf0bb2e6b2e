// PortCrab - GPL-3.0-or-later
// This file is part of PortCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// PortCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// PortCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with PortCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Registry of launchable apps and their running instances.
//!
//! The registry is an ordinary value owned by whoever builds it. Instances
//! own their state outright, so two consoles never share a store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl AppDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("App registration failed: missing id")]
    MissingId,
    #[error("App registration failed: '{0}' has no title")]
    MissingTitle(String),
    #[error("App '{0}' is already registered")]
    DuplicateApp(String),
    #[error("No app registered as '{0}'")]
    UnknownApp(String),
}

#[derive(Debug)]
pub struct Instance<T> {
    pub id: InstanceId,
    pub app_id: String,
    pub state: T,
}

#[derive(Debug)]
pub struct AppRegistry<T> {
    apps: IndexMap<String, AppDescriptor>,
    instances: IndexMap<InstanceId, Instance<T>>,
    next_instance: u64,
}

impl<T> Default for AppRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AppRegistry<T> {
    pub fn new() -> Self {
        Self {
            apps: IndexMap::new(),
            instances: IndexMap::new(),
            next_instance: 1,
        }
    }

    pub fn register_app(&mut self, descriptor: AppDescriptor) -> Result<(), RegistryError> {
        if descriptor.id.trim().is_empty() {
            return Err(RegistryError::MissingId);
        }
        if descriptor.title.trim().is_empty() {
            return Err(RegistryError::MissingTitle(descriptor.id));
        }
        if self.apps.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateApp(descriptor.id));
        }
        tracing::debug!("App registered: {}", descriptor.title);
        self.apps.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    /// Registered apps in registration order
    pub fn apps(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.apps.values()
    }

    pub fn app(&self, app_id: &str) -> Option<&AppDescriptor> {
        self.apps.get(app_id)
    }

    /// Start a new instance of `app_id`. The factory receives the new id.
    pub fn open<F>(&mut self, app_id: &str, factory: F) -> Result<InstanceId, RegistryError>
    where
        F: FnOnce(InstanceId) -> T,
    {
        if !self.apps.contains_key(app_id) {
            return Err(RegistryError::UnknownApp(app_id.to_string()));
        }
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        let state = factory(id);
        self.instances.insert(
            id,
            Instance {
                id,
                app_id: app_id.to_string(),
                state,
            },
        );
        tracing::info!("Opened {app_id} instance {id}");
        Ok(id)
    }

    /// Drop an instance, handing back its state
    pub fn close(&mut self, id: InstanceId) -> Option<T> {
        let instance = self.instances.shift_remove(&id)?;
        tracing::info!("Closed {} instance {id}", instance.app_id);
        Some(instance.state)
    }

    pub fn get(&self, id: InstanceId) -> Option<&T> {
        self.instances.get(&id).map(|i| &i.state)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.instances.get_mut(&id).map(|i| &mut i.state)
    }

    /// Running instances in the order they were opened
    pub fn instances(&self) -> impl Iterator<Item = &Instance<T>> {
        self.instances.values()
    }
}
