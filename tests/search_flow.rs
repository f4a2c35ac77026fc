//! Integration tests for the incremental search session over a scripted registry.
//!
//! Tests cover:
//! - First page, load more, and no duplicate names across pages
//! - One-character exact lookups
//! - Rate limiting and recovery
//! - Query supersession

mod common;

use common::{ScriptedRegistry, packument, search_page};
use npmscout::logic::{SearchSession, SessionPhase};
use npmscout::sources::Api;
use npmscout::sources::registry::search_path;
use serde_json::json;

fn names(session: &SearchSession<ScriptedRegistry>) -> Vec<String> {
    session
        .view()
        .data
        .objects
        .iter()
        .map(|r| r.name().to_string())
        .collect()
}

#[tokio::test]
/// What: Search, then page through to the advertised total.
///
/// Details:
/// - The second page overlaps the first by one name, which must not repeat.
/// - A third request is needed because of the overlap, and no fourth once
///   the total is held.
async fn integration_search_then_load_more_until_total() {
    let registry = ScriptedRegistry::new()
        .json(Api::Registry, &search_path("json", 3, None), search_page(&["json5", "jsonc", "jsonpath"], 6))
        .json(
            Api::Registry,
            &search_path("json", 3, Some(3)),
            search_page(&["jsonpath", "json-schema", "jsonfile"], 6),
        )
        .json(Api::Registry, &search_path("json", 1, Some(5)), search_page(&["json-ptr"], 6));
    let session = SearchSession::new(registry, 3);

    let first = session.search("json", 3).await.expect("first page");
    assert_eq!(first.total, 6);
    assert!(session.has_more());

    session.fetch_more(100).await.expect("load more");
    assert_eq!(
        names(&session),
        vec!["json5", "jsonc", "jsonpath", "json-schema", "jsonfile", "json-ptr"]
    );
    assert!(!session.has_more());
    assert_eq!(session.client().calls().len(), 3);

    session.fetch_more(100).await.expect("nothing left");
    assert_eq!(session.client().calls().len(), 3);
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[tokio::test]
/// What: One-character queries return the exact package with downloads.
async fn integration_single_character_exact_match() {
    let registry = ScriptedRegistry::new()
        .json(Api::Registry, "/q", packument("q", "1.5.1"))
        .json(Api::Downloads, "/downloads/point/last-week/q", json!({ "downloads": 1_000_000, "package": "q" }));
    let session = SearchSession::new(registry, 25);

    let resp = session.search("q", 25).await.expect("exact");
    assert_eq!(resp.total, 1);
    let record = &resp.objects[0];
    assert_eq!(record.name(), "q");
    assert_eq!(record.package.version, "1.5.1");
    assert_eq!(record.weekly_downloads(), Some(1_000_000));
    assert_eq!(record.package.links.npm.as_deref(), Some("https://www.npmjs.com/package/q"));
}

#[tokio::test]
/// What: A throttled search reports rate limiting; the next success clears it.
async fn integration_rate_limit_then_recover() {
    let throttled = ScriptedRegistry::new().status(Api::Registry, &search_path("axios", 25, None), 429);
    let session = SearchSession::new(throttled, 25);
    let resp = session.search("axios", 25).await.expect("absorbed");
    assert!(resp.objects.is_empty());
    assert!(session.view().is_rate_limited);

    let blank = session.search("", 25).await.expect("blank");
    assert!(blank.is_empty());
    assert!(!session.view().is_rate_limited);
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
/// What: A later query replaces the earlier query's results entirely.
async fn integration_new_query_replaces_results() {
    let registry = ScriptedRegistry::new()
        .json(Api::Registry, &search_path("vue", 2, None), search_page(&["vue", "vuex"], 50))
        .json(Api::Registry, &search_path("svelte", 2, None), search_page(&["svelte"], 1));
    let session = SearchSession::new(registry, 2);

    session.search("vue", 2).await.expect("vue");
    session.search("svelte", 2).await.expect("svelte");
    assert_eq!(names(&session), vec!["svelte"]);
    assert_eq!(session.query(), "svelte");
    assert!(!session.has_more());

    session.fetch_more(10).await.expect("nothing more for svelte");
    assert_eq!(session.client().calls().len(), 2);
}

#[tokio::test]
/// What: Upstream failures other than throttling surface as errors.
async fn integration_hard_failure_surfaces() {
    let registry = ScriptedRegistry::new().status(Api::Registry, &search_path("broken", 25, None), 503);
    let session = SearchSession::new(registry, 25);
    let err = session.search("broken", 25).await.expect_err("503");
    assert!(err.to_string().contains("503"));
    assert!(!session.is_rate_limited());
}
