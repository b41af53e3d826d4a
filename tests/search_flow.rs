//! Search coordination: debounce, stale-response suppression, clearing and
//! search pagination.

mod helpers;

use helpers::{FakeCatalogApi, ids, make_items, route, wait_for_calls};
use parts_catalog::filters::{FilterState, SearchType};
use parts_catalog::search::SearchPhase;
use parts_catalog::{BrowserSettings, CatalogBrowser, PageOutcome};
use std::sync::Arc;
use std::time::Duration;

fn browser(api: &Arc<FakeCatalogApi>) -> CatalogBrowser {
    CatalogBrowser::new(api.clone(), BrowserSettings::default())
}

#[tokio::test(start_paused = true)]
async fn debounce_collapses_keystrokes_into_one_request() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("brake"), None), &make_items("brake", 4), None);
    let browser = browser(&api);

    browser.search("bra", SearchType::Name);
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.search("brak", SearchType::Name);
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.search("brake", SearchType::Name);

    assert_eq!(
        browser.snapshot().search.phase,
        SearchPhase::Debouncing
    );
    assert_eq!(api.call_count(), 0);

    tokio::time::sleep(Duration::from_millis(350)).await;
    wait_for_calls(&api, 1).await;
    tokio::task::yield_now().await;

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].search,
        Some((SearchType::Name, "brake".to_owned()))
    );

    let snapshot = browser.snapshot();
    assert!(snapshot.search.is_active);
    assert_eq!(snapshot.search.phase, SearchPhase::Settled);
    assert_eq!(snapshot.search.query, "brake");
    assert_eq!(snapshot.items.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn short_input_clears_without_a_request() {
    let api = FakeCatalogApi::new();
    api.reply(route(None, None), &make_items("browse", 2), None);
    api.reply(route(Some("pipe"), None), &make_items("pipe", 3), None);
    let browser = browser(&api);
    browser.fetch_page(false).await.unwrap();

    browser.search_now("pipe", SearchType::Name).await.unwrap();
    assert_eq!(ids(&browser.snapshot().items), ids(&make_items("pipe", 3)));

    browser.search("pi", SearchType::Name);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = browser.snapshot();
    assert!(!snapshot.search.is_active);
    assert_eq!(snapshot.search.phase, SearchPhase::Idle);
    assert_eq!(ids(&snapshot.items), ids(&make_items("browse", 2)));
    assert_eq!(api.call_count(), 2);

    // whitespace does not count towards the minimum length
    assert_eq!(
        browser.search_now("  ab  ", SearchType::Name).await.unwrap(),
        PageOutcome::Cleared
    );
    assert_eq!(api.call_count(), 2);
}

#[tokio::test]
async fn slower_older_response_is_discarded() {
    let api = FakeCatalogApi::new();
    let gate = api.reply_gated(route(Some("brake"), None), &make_items("old", 3), None);
    api.reply(route(Some("brakes"), None), &make_items("new", 2), None);
    let browser = browser(&api);

    let slow = tokio::spawn({
        let browser = browser.clone();
        async move { browser.search_now("brake", SearchType::Name).await }
    });
    wait_for_calls(&api, 1).await;

    let fresh = browser.search_now("brakes", SearchType::Name).await.unwrap();
    assert_eq!(fresh, PageOutcome::Applied { added: 2 });

    gate.notify_one();
    assert_eq!(slow.await.unwrap().unwrap(), PageOutcome::Stale);

    let snapshot = browser.snapshot();
    assert_eq!(snapshot.search.query, "brakes");
    assert_eq!(ids(&snapshot.items), vec!["new-1", "new-2"]);
}

#[tokio::test]
async fn clearing_cancels_the_request_in_flight() {
    let api = FakeCatalogApi::new();
    let _gate = api.reply_gated(route(Some("brake"), None), &make_items("b", 3), None);
    let browser = browser(&api);

    let pending = tokio::spawn({
        let browser = browser.clone();
        async move { browser.search_now("brake", SearchType::Name).await }
    });
    wait_for_calls(&api, 1).await;

    browser.clear_search();
    assert_eq!(pending.await.unwrap().unwrap(), PageOutcome::Stale);

    let snapshot = browser.snapshot();
    assert!(!snapshot.search.is_active);
    assert_eq!(snapshot.search.phase, SearchPhase::Idle);
    assert!(browser.search_cache().is_empty());
}

#[tokio::test]
async fn load_more_extends_the_active_search() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("pipe"), None), &make_items("p", 3), Some("s2"));
    api.reply(route(Some("pipe"), Some("s2")), &make_items("q", 2), None);
    let browser = browser(&api);

    browser.search_now("pipe", SearchType::Name).await.unwrap();
    assert!(browser.snapshot().has_more);

    assert_eq!(
        browser.load_more().await.unwrap(),
        PageOutcome::Applied { added: 2 }
    );
    let snapshot = browser.snapshot();
    assert_eq!(snapshot.items.len(), 5);
    assert!(!snapshot.has_more);
    assert_eq!(browser.load_more().await.unwrap(), PageOutcome::Exhausted);
    assert_eq!(browser.search_cache().len(), 2);
}

#[tokio::test]
async fn load_more_for_a_superseded_search_is_dropped() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("pipe"), None), &make_items("p", 3), Some("s2"));
    let gate = api.reply_gated(route(Some("pipe"), Some("s2")), &make_items("late", 2), None);
    api.reply(route(Some("pipes"), None), &make_items("fresh", 1), None);
    let browser = browser(&api);

    browser.search_now("pipe", SearchType::Name).await.unwrap();
    let more = tokio::spawn({
        let browser = browser.clone();
        async move { browser.load_more().await }
    });
    wait_for_calls(&api, 2).await;

    browser.search_now("pipes", SearchType::Name).await.unwrap();
    gate.notify_one();
    assert_eq!(more.await.unwrap().unwrap(), PageOutcome::Stale);

    assert_eq!(ids(&browser.snapshot().items), vec!["fresh-1"]);
}

#[tokio::test]
async fn failed_search_keeps_previous_results() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("pipe"), None), &make_items("p", 3), None);
    api.fail(route(Some("pipes"), None), 502);
    let browser = browser(&api);

    browser.search_now("pipe", SearchType::Name).await.unwrap();
    assert!(browser.search_now("pipes", SearchType::Name).await.is_err());

    let snapshot = browser.snapshot();
    assert_eq!(snapshot.search.query, "pipe");
    assert_eq!(snapshot.items.len(), 3);
    assert!(snapshot.search.last_error.is_some());
}

#[tokio::test]
async fn sku_search_uses_the_sku_parameter() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("FMF-0123"), None), &make_items("sku", 1), None);
    let browser = browser(&api);

    browser.search_now("FMF-0123", SearchType::Sku).await.unwrap();

    let call = &api.calls()[0];
    assert!(call.params().contains(&("sku", "FMF-0123".to_owned())));
    assert!(!call.params().iter().any(|(k, _)| *k == "search"));
}

#[tokio::test]
async fn filter_change_reissues_the_active_search() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("pipe"), None), &make_items("p", 3), None);
    let browser = browser(&api);
    browser.search_now("pipe", SearchType::Name).await.unwrap();

    browser
        .apply_filters(FilterState::default().with_brand("Pro Circuit"))
        .await
        .unwrap();

    let reissued = api
        .calls()
        .into_iter()
        .rev()
        .find(|call| call.search.is_some())
        .unwrap();
    assert!(reissued.filters.brands.contains("Pro Circuit"));
    assert_eq!(browser.snapshot().search.query, "pipe");
}

#[tokio::test]
async fn subscribers_see_search_progress() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("grips"), None), &make_items("g", 2), None);
    let browser = browser(&api);
    let mut rx = browser.subscribe_search();

    browser.search_now("grips", SearchType::Name).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let latest = rx.borrow_and_update().clone();
    assert_eq!(latest.phase, SearchPhase::Settled);
    assert_eq!(latest.items.len(), 2);
}

/// Search calls seen by the fake, as (term, filtered to FMF).
fn search_calls(api: &FakeCatalogApi) -> Vec<(String, bool)> {
    api.calls()
        .into_iter()
        .filter_map(|call| {
            let fmf = call.filters.brands.contains("FMF");
            call.search.map(|(_, term)| (term, fmf))
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn debounced_response_landing_late_is_discarded() {
    let api = FakeCatalogApi::new();
    let gate = api.reply_gated(route(Some("brake"), None), &make_items("old", 3), None);
    api.reply(route(Some("brakes"), None), &make_items("new", 2), None);
    let browser = browser(&api);

    browser.search("brake", SearchType::Name);
    tokio::time::sleep(Duration::from_millis(350)).await;
    wait_for_calls(&api, 1).await;
    assert_eq!(browser.snapshot().search.phase, SearchPhase::InFlight);

    // the first request already left; typing on only supersedes it
    browser.search("brakes", SearchType::Name);
    tokio::time::sleep(Duration::from_millis(350)).await;
    wait_for_calls(&api, 2).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(browser.snapshot().search.query, "brakes");

    gate.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let snapshot = browser.snapshot();
    assert_eq!(snapshot.search.query, "brakes");
    assert_eq!(snapshot.search.phase, SearchPhase::Settled);
    assert_eq!(ids(&snapshot.items), vec!["new-1", "new-2"]);
}

#[tokio::test(start_paused = true)]
async fn filter_change_while_debouncing_searches_the_latest_input() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("brake"), None), &make_items("brake", 3), None);
    api.reply(route(Some("brakes"), None), &make_items("brakes", 2), None);
    let browser = browser(&api);

    browser.search_now("brake", SearchType::Name).await.unwrap();
    browser.search("brakes", SearchType::Name);
    browser
        .apply_filters(FilterState::default().with_brand("FMF"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        search_calls(&api),
        vec![("brake".to_owned(), false), ("brakes".to_owned(), true)]
    );
    let snapshot = browser.snapshot();
    assert_eq!(snapshot.search.query, "brakes");
    assert_eq!(ids(&snapshot.items), vec!["brakes-1", "brakes-2"]);
}

#[tokio::test(start_paused = true)]
async fn first_search_still_debouncing_uses_new_filters() {
    let api = FakeCatalogApi::new();
    api.reply(route(Some("brake"), None), &make_items("brake", 3), None);
    let browser = browser(&api);

    browser.search("brake", SearchType::Name);
    browser
        .apply_filters(FilterState::default().with_brand("FMF"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(search_calls(&api), vec![("brake".to_owned(), true)]);
    let snapshot = browser.snapshot();
    assert!(snapshot.search.is_active);
    assert_eq!(snapshot.search.query, "brake");
    assert_eq!(snapshot.items.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn idle_search_is_not_reissued_on_filter_change() {
    let api = FakeCatalogApi::new();
    let browser = browser(&api);

    browser.search("brake", SearchType::Name);
    browser.clear_search();
    browser
        .apply_filters(FilterState::default().with_brand("FMF"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(search_calls(&api).is_empty());
}
