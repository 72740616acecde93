use super::*;
use crate::testing::{FakeItem, FakePage};

fn setup(config: CacheConfig) -> (Arc<FakePage>, CachedElementQuery) {
    let page = Arc::new(FakePage::new(vec![
        FakeItem::deletable("a", "first"),
        FakeItem::deletable("b", "second"),
    ]));
    let query = CachedElementQuery::new(page.clone(), config);
    (page, query)
}

#[tokio::test(start_paused = true)]
async fn test_triggers_are_cached_within_ttl() {
    let (page, query) = setup(CacheConfig::default());

    assert_eq!(query.triggers().await.unwrap().len(), 2);
    page.state().items.remove(0);
    assert_eq!(query.triggers().await.unwrap().len(), 2);
    assert_eq!(page.state().trigger_queries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_triggers_expire_after_ttl() {
    let (page, query) = setup(CacheConfig::default());

    query.triggers().await.unwrap();
    page.state().items.remove(0);
    tokio::time::advance(Duration::from_millis(1001)).await;
    assert_eq!(query.triggers().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_fresh_query() {
    let (page, query) = setup(CacheConfig::default());

    query.triggers().await.unwrap();
    page.state().items.remove(0);
    query.invalidate();
    assert_eq!(query.triggers().await.unwrap().len(), 1);
    assert_eq!(page.state().trigger_queries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_menu_items_use_short_ttl() {
    let (page, query) = setup(CacheConfig::default());

    page.click(&ElementHandle::new("a")).await.unwrap();
    assert_eq!(query.menu_items().await.unwrap().len(), 1);
    page.press_escape().await.unwrap();
    assert_eq!(query.menu_items().await.unwrap().len(), 1);

    tokio::time::advance(Duration::from_millis(101)).await;
    assert!(query.menu_items().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_menu_keeps_triggers() {
    let (page, query) = setup(CacheConfig::default());

    query.triggers().await.unwrap();
    page.click(&ElementHandle::new("a")).await.unwrap();
    query.menu_items().await.unwrap();
    page.press_escape().await.unwrap();

    query.invalidate_menu();
    assert!(query.menu_items().await.unwrap().is_empty());
    query.triggers().await.unwrap();
    assert_eq!(page.state().trigger_queries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_cache_always_queries() {
    let (page, query) = setup(CacheConfig {
        enabled: false,
        ..Default::default()
    });

    query.triggers().await.unwrap();
    query.triggers().await.unwrap();
    assert_eq!(page.state().trigger_queries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_triggers() {
    let page = Arc::new(FakePage::new(vec![
        FakeItem::deletable("a", "x").with_tag(crate::page::ItemTag::PermanentTag),
        FakeItem::deletable("b", "y"),
    ]));
    let query = CachedElementQuery::new(page, CacheConfig::default());

    let permanent = query.permanent_triggers().await.unwrap();
    assert_eq!(permanent, vec![ElementHandle::new("a")]);
    assert_eq!(query.triggers().await.unwrap(), vec![ElementHandle::new("b")]);
}
