//! Built-in and custom systems updated once per fixed step

use glam::Vec2;

use super::System;
use crate::sim::{ParticleSystem, StateStore, TweenSystem};

/// Named user systems, updated in registration order
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<(String, Box<dyn System>)>,
}

impl SystemRegistry {
    /// Register under `name`, replacing any system already there
    pub fn register(&mut self, name: &str, system: Box<dyn System>) {
        if let Some(slot) = self.systems.iter_mut().find(|(n, _)| n == name) {
            log::warn!("Replacing system '{}'", name);
            slot.1 = system;
        } else {
            self.systems.push((name.to_string(), system));
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn System + 'static)> {
        self.systems
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_mut())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn System>> {
        let index = self.systems.iter().position(|(n, _)| n == name)?;
        Some(self.systems.remove(index).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn update_all(&mut self, dt_ms: f32) {
        for (_, system) in &mut self.systems {
            system.update(dt_ms);
        }
    }
}

/// Systems shared between the engine and its scenes
pub struct Systems {
    pub particles: ParticleSystem,
    pub tweens: TweenSystem,
    pub store: StateStore,
    pub custom: SystemRegistry,
}

impl Systems {
    pub fn new(field: Vec2, particle_seed: u64) -> Self {
        Self {
            particles: ParticleSystem::new(field, particle_seed),
            tweens: TweenSystem::new(),
            store: StateStore::new(),
            custom: SystemRegistry::default(),
        }
    }

    /// One fixed step for every system
    pub fn update(&mut self, dt_ms: f32) {
        self.particles.update(dt_ms);
        self.tweens.update(dt_ms);
        self.custom.update_all(dt_ms);
    }
}
