//! Settings and theater sessions across coordinator restarts

use std::sync::Arc;

use dissatisfied::sim::Simulation;
use dissatisfied::store::{PersistenceMode, StorageArea, TabId, ToggleState};
use dissatisfied::{Config, Database, Site, SqliteStorageArea};
use serde_json::json;
use tempfile::TempDir;

use super::common::WATCH_ABC;

fn sqlite_area(dir: &TempDir) -> Arc<dyn StorageArea> {
    let db = Database::open(dir.path().join("settings.db")).expect("Failed to open database");
    Arc::new(SqliteStorageArea::new(db))
}

#[tokio::test(start_paused = true)]
async fn test_global_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let sim = Simulation::with_area(sqlite_area(&dir), Config::default())
            .await
            .unwrap();
        sim.store()
            .set_persistence_mode(Site::YouTube, PersistenceMode::Global)
            .await
            .unwrap();
        sim.coordinator()
            .set_global_enabled(Site::YouTube, true)
            .await
            .unwrap();
    }

    let sim = Simulation::with_area(sqlite_area(&dir), Config::default())
        .await
        .unwrap();
    let tab = sim.open_tab(WATCH_ABC).await;
    sim.settle().await;
    assert!(sim.page(tab).unwrap().agent().is_active());
    assert_eq!(sim.browser().badge(tab), "ON");
}

#[tokio::test(start_paused = true)]
async fn test_theater_sessions_resume_after_restart() {
    let dir = TempDir::new().unwrap();
    let tab = {
        let sim = Simulation::with_area(sqlite_area(&dir), Config::default())
            .await
            .unwrap();
        let tab = sim.open_tab(WATCH_ABC).await;
        sim.coordinator()
            .on_command("toggle-youtube-style")
            .await
            .unwrap();
        sim.settle().await;
        tab
    };

    let sim = Simulation::with_area(sqlite_area(&dir), Config::default())
        .await
        .unwrap();
    assert!(sim.coordinator().theater_sessions().contains(tab));
}

#[tokio::test]
async fn test_malformed_values_read_as_defaults() {
    let dir = TempDir::new().unwrap();
    let area = sqlite_area(&dir);
    area.set("twitter_width", json!("wide")).await.unwrap();
    area.set("youtube_persistence_mode", json!("sometimes"))
        .await
        .unwrap();
    area.set("twitter_state", json!({"enabled": "yes"}))
        .await
        .unwrap();
    area.set("youtube_sessions", json!({"7": true, "bogus": true}))
        .await
        .unwrap();

    let sim = Simulation::with_area(area, Config::default()).await.unwrap();
    let store = sim.store();
    assert_eq!(store.twitter_settings().await.unwrap().width, 80);
    assert_eq!(
        store.persistence_mode(Site::YouTube).await.unwrap(),
        PersistenceMode::Tab
    );
    assert_eq!(
        store.toggle_state(Site::Twitter).await.unwrap(),
        ToggleState::new(false)
    );
    assert!(sim.coordinator().theater_sessions().contains(TabId(7)));
}

#[tokio::test]
async fn test_widths_and_font_sizes_clamp() {
    let dir = TempDir::new().unwrap();
    let sim = Simulation::with_area(sqlite_area(&dir), Config::default())
        .await
        .unwrap();
    let store = sim.store();

    for (width, expected) in [(10, 30), (200, 100)] {
        store.set_twitter_width(width).await.unwrap();
        assert_eq!(store.twitter_settings().await.unwrap().width, expected);
    }
    for (size, expected) in [(5, 13), (40, 22)] {
        store.set_twitter_font_size(size).await.unwrap();
        assert_eq!(store.twitter_settings().await.unwrap().font_size, expected);
    }
}
