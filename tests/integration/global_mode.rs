//! Global persistence mode: one stored state shared by every tab

use super::common::{simulation_in, youtube_shortcut, twitter_shortcut, TWITTER_HOME, WATCH_ABC};
use dissatisfied::agent::KeyDisposition;
use dissatisfied::coordinator::{BADGE_OFF, BADGE_ON};
use dissatisfied::store::{PersistenceMode, ToggleState};
use dissatisfied::Site;

/// Toggling in one tab shows up in its sibling without any tab talking to
/// the other directly
#[tokio::test(start_paused = true)]
async fn test_toggle_in_one_tab_reaches_sibling() {
    let sim = simulation_in(Site::YouTube, PersistenceMode::Global).await;
    let a = sim.open_tab(WATCH_ABC).await;
    let b = sim.open_tab(WATCH_ABC).await;
    sim.settle().await;
    assert_eq!(sim.browser().badge(a), BADGE_OFF);
    assert_eq!(sim.browser().badge(b), BADGE_OFF);

    sim.activate_tab(a).await;
    assert_eq!(
        sim.key_down(a, &youtube_shortcut()).await,
        KeyDisposition::Consumed
    );
    sim.settle().await;

    for tab in [a, b] {
        assert!(sim.has_styles(tab, Site::YouTube), "tab {} not styled", tab);
        assert_eq!(sim.browser().badge(tab), BADGE_ON);
    }
    assert!(
        sim.store()
            .toggle_state(Site::YouTube)
            .await
            .unwrap()
            .enabled
    );
}

/// A sibling whose badge was never touched catches up when focused
#[tokio::test(start_paused = true)]
async fn test_sibling_badge_catches_up_on_activation() {
    let sim = simulation_in(Site::YouTube, PersistenceMode::Global).await;
    let a = sim.open_tab(WATCH_ABC).await;
    let b = sim.open_tab(WATCH_ABC).await;
    sim.settle().await;

    // Committed by the options page; the coordinator only hears about it
    sim.store()
        .set_toggle_state(Site::YouTube, ToggleState::new(true))
        .await
        .unwrap();
    sim.settle().await;

    // Both pages converged from the store change
    assert!(sim.has_styles(a, Site::YouTube));
    assert!(sim.has_styles(b, Site::YouTube));
    // Only the focused tab's badge was recomputed
    assert_eq!(sim.browser().badge(b), BADGE_ON);
    assert_eq!(sim.browser().badge(a), BADGE_OFF);

    sim.activate_tab(a).await;
    assert_eq!(sim.browser().badge(a), BADGE_ON);
}

#[tokio::test(start_paused = true)]
async fn test_new_tab_starts_in_stored_state() {
    let sim = simulation_in(Site::Twitter, PersistenceMode::Global).await;
    let a = sim.open_tab(TWITTER_HOME).await;
    sim.key_down(a, &twitter_shortcut()).await;
    sim.settle().await;

    let b = sim.open_tab("https://twitter.com/explore").await;
    sim.settle().await;
    assert!(sim.page(b).unwrap().agent().is_active());
    assert_eq!(sim.browser().badge(b), BADGE_ON);
}

#[tokio::test(start_paused = true)]
async fn test_options_edit_commands_every_tab() {
    let sim = simulation_in(Site::Twitter, PersistenceMode::Global).await;
    let a = sim.open_tab(TWITTER_HOME).await;
    let b = sim.open_tab_without_agent("https://x.com/notifications").await;
    let youtube = sim.open_tab(WATCH_ABC).await;

    sim.coordinator()
        .set_global_enabled(Site::Twitter, true)
        .await
        .unwrap();
    sim.settle().await;

    assert!(sim.has_styles(a, Site::Twitter));
    // No agent there: styles injected directly
    assert!(sim.has_styles(b, Site::Twitter));
    assert_eq!(sim.browser().badge(b), BADGE_ON);
    assert!(!sim.has_styles(youtube, Site::YouTube));

    sim.coordinator()
        .set_global_enabled(Site::Twitter, false)
        .await
        .unwrap();
    sim.settle().await;
    assert!(!sim.has_styles(a, Site::Twitter));
    assert!(!sim.has_styles(b, Site::Twitter));
    assert_eq!(sim.browser().badge(a), BADGE_OFF);
}

/// Theater mode the user chose is never undone
#[tokio::test(start_paused = true)]
async fn test_user_theater_survives_global_round_trip() {
    let sim = simulation_in(Site::YouTube, PersistenceMode::Global).await;
    let mine = sim.open_tab(WATCH_ABC).await;
    let theirs = sim.open_tab("https://www.youtube.com/watch?v=xyz").await;
    let user_doc = sim.browser().document(theirs).unwrap();
    user_doc.user_toggle_theater();
    sim.settle().await;

    sim.coordinator()
        .set_global_enabled(Site::YouTube, true)
        .await
        .unwrap();
    sim.settle().await;

    let sessions = sim.coordinator().theater_sessions();
    assert!(sessions.contains(mine));
    assert!(!sessions.contains(theirs));

    sim.coordinator()
        .set_global_enabled(Site::YouTube, false)
        .await
        .unwrap();
    sim.settle().await;

    let my_doc = sim.browser().document(mine).unwrap();
    assert_eq!(my_doc.player_theater(), Some(false));
    assert_eq!(my_doc.click_count(), 2);
    assert_eq!(user_doc.player_theater(), Some(true));
    assert_eq!(user_doc.click_count(), 0);
    assert!(sim.coordinator().theater_sessions().is_empty());
}

/// A tab that refused the styles keeps its badge, even after the stored
/// state change comes back around
#[tokio::test(start_paused = true)]
async fn test_badge_holds_where_apply_failed() {
    let sim = simulation_in(Site::YouTube, PersistenceMode::Global).await;
    let healthy = sim.open_tab(WATCH_ABC).await;
    let restricted = sim.open_tab_without_agent(WATCH_ABC).await;
    sim.browser().fail_injection(restricted, true);
    sim.settle().await;

    sim.coordinator()
        .on_command("toggle-youtube-style")
        .await
        .unwrap();
    assert_eq!(sim.browser().badge(restricted), BADGE_OFF);

    sim.settle().await;
    assert!(!sim.has_styles(restricted, Site::YouTube));
    assert_eq!(sim.browser().badge(restricted), BADGE_OFF);
    assert!(sim.has_styles(healthy, Site::YouTube));
    assert_eq!(sim.browser().badge(healthy), BADGE_ON);

    sim.activate_tab(healthy).await;
    sim.activate_tab(restricted).await;
    assert_eq!(sim.browser().badge(restricted), BADGE_OFF);

    // Once injection works again the next load catches up
    sim.browser().fail_injection(restricted, false);
    sim.reload(restricted).await;
    sim.settle().await;
    assert!(sim.has_styles(restricted, Site::YouTube));
    assert_eq!(sim.browser().badge(restricted), BADGE_ON);
}

/// Switching to tab mode keeps every tab in the state it is showing, so
/// one press turns focus mode off
#[tokio::test(start_paused = true)]
async fn test_switch_to_tab_mode_keeps_shown_state() {
    let sim = simulation_in(Site::Twitter, PersistenceMode::Global).await;
    let a = sim.open_tab(TWITTER_HOME).await;
    let b = sim.open_tab("https://x.com/explore").await;
    sim.activate_tab(a).await;
    sim.key_down(a, &twitter_shortcut()).await;
    sim.settle().await;
    assert_eq!(sim.browser().badge(a), BADGE_ON);

    sim.store()
        .set_persistence_mode(Site::Twitter, PersistenceMode::Tab)
        .await
        .unwrap();
    sim.settle().await;
    for tab in [a, b] {
        assert!(sim.has_styles(tab, Site::Twitter));
        assert!(sim.coordinator().tab_state(tab).twitter);
    }
    assert_eq!(sim.browser().badge(a), BADGE_ON);

    sim.key_down(a, &twitter_shortcut()).await;
    sim.settle().await;
    assert!(!sim.has_styles(a, Site::Twitter));
    assert_eq!(sim.browser().badge(a), BADGE_OFF);
    // The sibling is now on its own
    assert!(sim.has_styles(b, Site::Twitter));
    assert!(sim.coordinator().tab_state(b).twitter);
}
