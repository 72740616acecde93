use super::*;
use crate::debug::DebugConsole;
use crate::modal::DialogResolver;
use crate::query::CachedElementQuery;
use crate::resurrection::ZOMBIE_BADGE;
use crate::testing::{FakeItem, FakePage, Reaction};
use scrubber_config::{CacheConfig, ThrottleConfig};

struct Fixture {
    page: Arc<FakePage>,
    processor: ItemProcessor,
    settings: CleanerSettings,
    tracker: ResurrectionTracker,
}

fn fixture(items: Vec<FakeItem>) -> Fixture {
    let page = Arc::new(FakePage::new(items));
    let query: Arc<dyn ElementQuery> =
        Arc::new(CachedElementQuery::new(page.clone(), CacheConfig::default()));
    let resolver = Arc::new(DialogResolver::new(page.clone(), query.clone()));
    let telemetry = Arc::new(TelemetryHub::new(
        &ThrottleConfig::default(),
        Arc::new(DebugConsole::new(false)),
    ));
    Fixture {
        processor: ItemProcessor::new(page.clone(), query, resolver, telemetry),
        page,
        settings: CleanerSettings::default(),
        tracker: ResurrectionTracker::new(),
    }
}

impl Fixture {
    async fn process(&mut self, id: &str) -> Result<Outcome, PageError> {
        self.processor
            .process(&ElementHandle::new(id), &self.settings, &mut self.tracker)
            .await
    }
}

#[tokio::test(start_paused = true)]
async fn test_delete_through_dialog() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Liked a photo")]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    assert!(f.page.item("a").is_none());
    assert_eq!(f.page.state().confirmed_dialogs, vec!["Delete?".to_string()]);
    assert_eq!(f.tracker.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_menu_entry_does_not_fail_item() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Liked a photo").with_menu(&["Edit audience", "Delete"]),
    ]);
    f.page.state().unreadable_entries = vec![0];

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    assert!(f.page.item("a").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_untagged_check_continues_to_menu() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Tagged in a photo")]);
    f.page.state().untagged_check_fails = true;

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    assert!(f.page.state().notes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_profile_change_marked_permanent() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Changed profile picture").with_menu(&["Add to profile"]),
    ]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Skipped);
    let item = f.page.item("a").unwrap();
    assert_eq!(item.tag, ItemTag::PermanentProfileChange);
    assert_eq!(f.page.state().escapes, 1);
    assert!(f.tracker.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hide_from_profile_counts_as_deleted() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Shared a memory").with_menu(&["Hide from profile"]),
    ]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    let state = f.page.state();
    assert_eq!(
        state.notes,
        vec![(
            "a".to_string(),
            ItemTag::PermanentProfileChange,
            Some(HIDDEN_NOTE.to_string())
        )]
    );
    assert_eq!(state.escapes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_hide_from_profile_menu_stays_open() {
    let mut item = FakeItem::deletable("a", "Shared a memory").with_menu(&["Hide from profile"]);
    item.hide_closes_menu = false;
    let mut f = fixture(vec![item]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Skipped);
    let state = f.page.state();
    assert!(state.notes.is_empty());
    assert_eq!(state.escapes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_untagged_post_marked_permanent() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Tagged in a post").untagged()]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Skipped);
    assert_eq!(f.page.item("a").unwrap().tag, ItemTag::PermanentTag);
    assert_eq!(f.page.item("a").unwrap().attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_menu_without_target_action_is_skipped() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Commented").with_menu(&["Edit", "Save link"]),
    ]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Skipped);
    assert!(f.page.item("a").is_some());
    assert_eq!(f.page.state().escapes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_menu_fails() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Commented").with_menu(&[])]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Failed);
    assert_eq!(f.page.state().escapes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_silent_removal_detected_by_dom_delta() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Reacted to a post")
            .with_menu(&["Remove Reaction"])
            .with_reaction(Reaction::Vanish),
        FakeItem::deletable("b", "Other"),
    ]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    assert!(f.page.item("a").is_none());
    assert!(f.page.state().confirmed_dialogs.is_empty());
    assert_eq!(f.tracker.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_after_inert_click() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Liked a page").inert_for(1)]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Deleted);
    assert!(f.page.item("a").is_none());
    let state = f.page.state();
    assert_eq!(state.confirmed_dialogs, vec!["Delete?".to_string()]);
    assert_eq!(state.escapes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_fails() {
    let mut f = fixture(vec![
        FakeItem::deletable("a", "Stuck").with_reaction(Reaction::Nothing),
    ]);

    assert_eq!(f.process("a").await.unwrap(), Outcome::Failed);
    let item = f.page.item("a").unwrap();
    assert_eq!(item.attempts, 1 + f.settings.max_action_retries);
    assert!(f.tracker.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resurrected_item_is_hidden_and_badged() {
    let item = FakeItem::deletable("a", "Liked a photo");
    let signature = Signature::from_snapshot(&item.snapshot);
    let mut f = fixture(vec![item]);
    f.tracker.record_deletion(signature, now_ms());

    assert_eq!(f.process("a").await.unwrap(), Outcome::Zombie);
    let item = f.page.item("a").unwrap();
    assert!(item.hidden);
    assert_eq!(item.attempts, 0);
    assert_eq!(
        f.page.state().badges,
        vec![("a".to_string(), ZOMBIE_BADGE.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_click_error_propagates() {
    let mut f = fixture(vec![FakeItem::deletable("a", "Liked a photo")]);
    f.page.state().failing_clicks = 1;

    let err = f.process("a").await.unwrap_err();
    assert_eq!(err.kind(), "ScriptError");
}

#[test]
fn test_first_target_action_in_menu_order() {
    let entries = vec![
        (ElementHandle::new("m0"), "Edit".to_string()),
        (ElementHandle::new("m1"), "Unlike".to_string()),
        (ElementHandle::new("m2"), "Delete".to_string()),
    ];
    let (handle, text) = find_target_action(&entries).unwrap();
    assert_eq!(handle.as_str(), "m1");
    assert_eq!(text, "Unlike");

    let entries = vec![(ElementHandle::new("m0"), "Move to trash now".to_string())];
    assert!(find_target_action(&entries).is_some());
    assert!(find_target_action(&[]).is_none());
}
