//! Shared test utilities
//!
//! URLs, shortcut events and a simulation builder with the default
//! configuration.

#![allow(dead_code)]

use dissatisfied::config::{KeyEvent, Modifiers};
use dissatisfied::sim::Simulation;
use dissatisfied::store::PersistenceMode;
use dissatisfied::{Config, Site};

pub const WATCH_ABC: &str = "https://www.youtube.com/watch?v=abc";
pub const TWITTER_HOME: &str = "https://x.com/home";

/// Backtick, the default YouTube chord
pub fn youtube_shortcut() -> KeyEvent {
    KeyEvent::from_char('`', Modifiers::NONE)
}

/// Control+B, the default Twitter/X chord
pub fn twitter_shortcut() -> KeyEvent {
    KeyEvent::from_char('b', Modifiers::ctrl())
}

pub async fn simulation() -> Simulation {
    Simulation::new(Config::default())
        .await
        .expect("Failed to start simulation")
}

/// Simulation with `site` already switched to `mode`
pub async fn simulation_in(site: Site, mode: PersistenceMode) -> Simulation {
    let sim = simulation().await;
    sim.store()
        .set_persistence_mode(site, mode)
        .await
        .expect("Failed to set persistence mode");
    sim.settle().await;
    sim
}
