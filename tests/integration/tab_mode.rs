//! Tab persistence mode: each tab keeps its own transient state

use super::common::{simulation, twitter_shortcut, youtube_shortcut, TWITTER_HOME, WATCH_ABC};
use dissatisfied::agent::KeyDisposition;
use dissatisfied::config::{KeyEvent, Modifiers};
use dissatisfied::coordinator::{BADGE_NONE, BADGE_OFF, BADGE_ON};
use dissatisfied::Site;

#[tokio::test(start_paused = true)]
async fn test_toggle_leaves_sibling_off() {
    let sim = simulation().await;
    let a = sim.open_tab(WATCH_ABC).await;
    let b = sim.open_tab(WATCH_ABC).await;
    sim.settle().await;

    sim.activate_tab(a).await;
    sim.key_down(a, &youtube_shortcut()).await;
    sim.settle().await;

    assert_eq!(sim.browser().badge(a), BADGE_ON);
    assert!(sim.has_styles(a, Site::YouTube));
    assert_eq!(sim.browser().badge(b), BADGE_OFF);
    assert!(!sim.has_styles(b, Site::YouTube));

    sim.activate_tab(b).await;
    assert_eq!(sim.browser().badge(b), BADGE_OFF);
    assert!(sim.coordinator().tab_state(a).youtube);
    assert!(!sim.coordinator().tab_state(b).youtube);
}

#[tokio::test(start_paused = true)]
async fn test_reload_reapplies_tab_state() {
    let sim = simulation().await;
    let on = sim.open_tab(TWITTER_HOME).await;
    let off = sim.open_tab(TWITTER_HOME).await;
    sim.activate_tab(on).await;
    sim.click_control(on).await;
    sim.settle().await;
    assert!(sim.has_styles(on, Site::Twitter));

    sim.reload(on).await;
    sim.reload(off).await;
    sim.settle().await;

    assert!(sim.page(on).unwrap().agent().is_active());
    assert_eq!(sim.browser().badge(on), BADGE_ON);
    assert!(!sim.page(off).unwrap().agent().is_active());
    assert_eq!(sim.browser().badge(off), BADGE_OFF);
}

#[tokio::test(start_paused = true)]
async fn test_both_twitter_chords_toggle() {
    let sim = simulation().await;
    let tab = sim.open_tab(TWITTER_HOME).await;

    sim.key_down(tab, &twitter_shortcut()).await;
    assert_eq!(sim.browser().badge(tab), BADGE_ON);

    let alt_shift_x = KeyEvent::new("X", "KeyX", Modifiers::alt_shift());
    assert_eq!(
        sim.key_down(tab, &alt_shift_x).await,
        KeyDisposition::Consumed
    );
    assert_eq!(sim.browser().badge(tab), BADGE_OFF);
    assert!(!sim.has_styles(tab, Site::Twitter));
}

#[tokio::test(start_paused = true)]
async fn test_shortcut_on_youtube_home_does_nothing() {
    let sim = simulation().await;
    let home = sim.open_tab("https://www.youtube.com/").await;
    assert_eq!(sim.browser().badge(home), BADGE_NONE);

    // Consumed by the page, but there is no video to focus on
    assert_eq!(
        sim.key_down(home, &youtube_shortcut()).await,
        KeyDisposition::Consumed
    );
    sim.settle().await;
    assert!(!sim.has_styles(home, Site::YouTube));
    assert_eq!(sim.browser().badge(home), BADGE_NONE);
}

#[tokio::test(start_paused = true)]
async fn test_late_agent_load_matches_direct_injection() {
    let sim = simulation().await;
    let tab = sim.open_tab_without_agent(TWITTER_HOME).await;
    sim.coordinator()
        .on_command("toggle-twitter-style")
        .await
        .unwrap();
    assert!(sim.has_styles(tab, Site::Twitter));
    assert_eq!(sim.browser().badge(tab), BADGE_ON);

    // Disabling with an agent present clears the directly applied layout
    sim.load_agent(tab).await;
    sim.coordinator()
        .on_command("toggle-twitter-style")
        .await
        .unwrap();
    let doc = sim.browser().document(tab).unwrap();
    assert_eq!(doc.root_snapshot(), Default::default());
    assert_eq!(sim.browser().badge(tab), BADGE_OFF);
}
