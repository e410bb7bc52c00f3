//! Extension reload while page agents are still running

use super::common::{simulation, simulation_in, twitter_shortcut, TWITTER_HOME, WATCH_ABC};
use dissatisfied::agent::KeyDisposition;
use dissatisfied::coordinator::{BADGE_OFF, BADGE_ON};
use dissatisfied::store::PersistenceMode;
use dissatisfied::Site;

#[tokio::test(start_paused = true)]
async fn test_store_reports_invalidation_as_error() {
    let sim = simulation().await;
    let store = sim.store();
    store.context().invalidate();

    let err = store.toggle_state(Site::YouTube).await.unwrap_err();
    assert!(err.is_context_invalidated());
    let err = store.set_twitter_width(50).await.unwrap_err();
    assert!(err.is_context_invalidated());
}

#[tokio::test(start_paused = true)]
async fn test_orphaned_page_attempts_no_dom_mutation() {
    let sim = simulation().await;
    let tab = sim.open_tab(TWITTER_HOME).await;
    let doc = sim.browser().document(tab).unwrap();
    let elements = doc.elements();
    let root = doc.root_snapshot();

    sim.invalidate(tab);
    assert_eq!(
        sim.key_down(tab, &twitter_shortcut()).await,
        KeyDisposition::Consumed
    );
    sim.click_control(tab).await;
    sim.page(tab).unwrap().on_mutation().await;
    sim.settle().await;

    assert_eq!(doc.elements(), elements);
    assert_eq!(doc.root_snapshot(), root);
    assert_eq!(sim.browser().badge(tab), BADGE_OFF);
}

/// The coordinator does not inject around an orphaned agent
#[tokio::test(start_paused = true)]
async fn test_global_toggle_skips_orphaned_page() {
    let sim = simulation_in(Site::YouTube, PersistenceMode::Global).await;
    let orphan = sim.open_tab(WATCH_ABC).await;
    let live = sim.open_tab(WATCH_ABC).await;
    sim.invalidate(orphan);

    sim.coordinator()
        .set_global_enabled(Site::YouTube, true)
        .await
        .unwrap();
    sim.settle().await;

    assert!(sim.has_styles(live, Site::YouTube));
    assert_eq!(sim.browser().badge(live), BADGE_ON);
    assert!(!sim.has_styles(orphan, Site::YouTube));
    assert_eq!(sim.browser().badge(orphan), BADGE_OFF);
    let orphan_doc = sim.browser().document(orphan).unwrap();
    assert_eq!(orphan_doc.click_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reinjected_agent_takes_over() {
    let sim = simulation().await;
    let tab = sim.open_tab(TWITTER_HOME).await;
    sim.invalidate(tab);
    sim.detach_agent(tab);
    assert!(sim.load_agent(tab).await);

    sim.key_down(tab, &twitter_shortcut()).await;
    assert!(sim.page(tab).unwrap().agent().is_active());
    assert_eq!(sim.browser().badge(tab), BADGE_ON);
}
