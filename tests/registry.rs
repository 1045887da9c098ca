use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vue_route_registry::{
    ComponentRef, LoadError, MAX_REDIRECT_HOPS, RegistryError, RouteNode, RouteRegistry, View,
};

fn view(specifier: &str) -> ComponentRef {
    let specifier = specifier.to_string();
    ComponentRef::new(specifier.clone(), move || {
        let specifier = specifier.clone();
        async move {
            Ok::<_, LoadError>(View {
                source: format!("<template>{specifier}</template>"),
                specifier,
                location: None,
            })
        }
    })
}

/// 呼び出し回数を数え、少し待ってから結果を返すファクトリ
fn slow_view(calls: Arc<AtomicUsize>, fail: bool) -> ComponentRef {
    ComponentRef::new("@/views/slow.vue", move || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if fail {
                Err(LoadError::Failed("chunk failed to load".to_string()))
            } else {
                Ok(View {
                    specifier: "@/views/slow.vue".to_string(),
                    location: None,
                    source: "<template/>".to_string(),
                })
            }
        }
    })
}

fn monitor_module() -> RouteNode {
    RouteNode::new("/monitor")
        .redirect("/monitor/index")
        .icon("Monitor")
        .title("Device Monitor")
        .rank(4)
        .child(
            RouteNode::new("/monitor/index")
                .name("Monitor")
                .component(view("@/views/monitor/index.vue"))
                .title("Monitor")
                .keep_alive(true),
        )
}

fn remaining_module() -> Vec<RouteNode> {
    vec![
        RouteNode::new("/login")
            .name("Login")
            .component(view("@/views/login/index.vue"))
            .title("Login")
            .show_link(false)
            .rank(101),
        RouteNode::new("/monitor-standalone")
            .name("MonitorStandalone")
            .component(view("@/views/monitor-standalone/index.vue"))
            .title("Hardware Monitor"),
        RouteNode::new("/topcontrol/index")
            .name("Topcontrol")
            .component(view("@/views/topcontrol/index.vue"))
            .title("Structure Control 2"),
        RouteNode::new("/redirect")
            .component(view("@/layout/index.vue"))
            .title("Loading...")
            .show_link(false)
            .rank(102)
            .child(
                RouteNode::new("/redirect/:path(.*)")
                    .name("Redirect")
                    .component(view("@/layout/redirect.vue")),
            ),
    ]
}

fn dashboard() -> RouteRegistry {
    let mut registry = RouteRegistry::new();
    registry.register([monitor_module()]).unwrap();
    registry.register(remaining_module()).unwrap();
    registry
}

#[test]
fn every_plain_route_resolves_to_itself() {
    let registry = dashboard();
    for record in registry.records().filter(|r| r.redirect().is_none()) {
        let resolved = registry.resolve(record.full_path()).unwrap();
        assert_eq!(resolved.route.id(), record.id(), "{}", record.full_path());
        assert!(resolved.redirected_from.is_empty());
    }
}

#[test]
fn redirect_lands_on_named_child() {
    let registry = dashboard();
    let resolved = registry.resolve("/monitor").unwrap();
    assert_eq!(resolved.route.name(), Some("Monitor"));
    assert_eq!(resolved.redirected_from, ["/monitor"]);
}

#[test]
fn hidden_wildcard_route_still_resolves() {
    let registry = dashboard();
    let menu = registry.menu_projection();
    assert!(menu.iter().all(|entry| !entry.path.starts_with("/redirect")));

    let resolved = registry.resolve("/redirect/anything").unwrap();
    assert_eq!(resolved.route.name(), Some("Redirect"));
    assert_eq!(resolved.params.get("path").map(String::as_str), Some("anything"));

    let nested = registry.resolve("/redirect/monitor/index?tab=1").unwrap();
    assert_eq!(nested.params["path"], "monitor/index");

    // 親自身は完全一致が優先される
    let parent = registry.resolve("/redirect").unwrap();
    assert_eq!(parent.route.full_path(), "/redirect");
}

#[test]
fn menu_orders_by_rank_then_registration() {
    let mut registry = RouteRegistry::new();
    registry
        .register([
            RouteNode::new("/c").title("C").rank(2),
            RouteNode::new("/unranked-1").title("U1"),
            RouteNode::new("/a").title("A").rank(1),
            RouteNode::new("/b").title("B").rank(2),
            RouteNode::new("/hidden").rank(0).show_link(false),
            RouteNode::new("/unranked-2").title("U2"),
        ])
        .unwrap();
    registry
        .register([RouteNode::new("/zero")
            .title("Z")
            .rank(0)
            .child(RouteNode::new("/zero/2").rank(2))
            .child(RouteNode::new("/zero/1").rank(1))
            .child(RouteNode::new("/zero/hidden").show_link(false))])
        .unwrap();

    let menu = registry.menu_projection();
    let paths: Vec<&str> = menu.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["/zero", "/a", "/c", "/b", "/unranked-1", "/unranked-2"]);

    let children: Vec<&str> = menu[0].children.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(children, ["/zero/1", "/zero/2"]);
}

#[test]
fn dashboard_menu_carries_titles_and_icons() {
    let registry = dashboard();
    let menu = registry.menu_projection();
    let titles: Vec<&str> = menu.iter().filter_map(|e| e.title.as_deref()).collect();
    assert_eq!(titles, ["Device Monitor", "Hardware Monitor", "Structure Control 2"]);
    assert_eq!(menu[0].icon.as_deref(), Some("Monitor"));
    assert_eq!(menu[0].children[0].name.as_deref(), Some("Monitor"));

    let json = serde_json::to_value(&menu[0]).unwrap();
    assert_eq!(json["children"][0]["path"], "/monitor/index");
    assert_eq!(json["rank"], 4);
}

#[test]
fn duplicate_names_across_batches_fail() {
    let mut registry = dashboard();
    let before = registry.len();
    let err = registry
        .register([RouteNode::new("/login2").name("Login")])
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateName { ref name, .. } if name == "Login"));
    assert_eq!(registry.len(), before);
}

#[test]
fn invalid_paths_fail_registration() {
    for node in [
        RouteNode::new(""),
        RouteNode::new("relative"),
        RouteNode::new("/a/:rest(.*)/tail"),
        RouteNode::new("/a").child(RouteNode::new("")),
    ] {
        let mut registry = RouteRegistry::new();
        assert!(matches!(
            registry.register([node]),
            Err(RegistryError::InvalidPath { .. })
        ));
    }
}

#[test]
fn redirect_cycle_is_detected() {
    let mut registry = RouteRegistry::new();
    registry
        .register([
            RouteNode::new("/a").redirect("/b"),
            RouteNode::new("/b").redirect("/a"),
        ])
        .unwrap();
    match registry.resolve("/a") {
        Err(RegistryError::RedirectCycle { path, chain }) => {
            assert_eq!(path, "/a");
            assert_eq!(chain, ["/a", "/b", "/a"]);
        }
        other => panic!("expected a redirect cycle, got {other:?}"),
    }
}

#[test]
fn long_redirect_chain_hits_hop_limit() {
    let mut registry = RouteRegistry::new();
    let chain: Vec<RouteNode> = (0..=MAX_REDIRECT_HOPS + 1)
        .map(|i| RouteNode::new(format!("/r{i}")).redirect(format!("/r{}", i + 1)))
        .collect();
    registry.register(chain).unwrap();
    registry
        .register([RouteNode::new(format!("/r{}", MAX_REDIRECT_HOPS + 2)).name("End")])
        .unwrap();

    assert!(matches!(
        registry.resolve("/r0"),
        Err(RegistryError::RedirectCycle { .. })
    ));
    // 上限以内なら辿れる
    let ok = registry.resolve("/r3").unwrap();
    assert_eq!(ok.route.name(), Some("End"));
}

#[test]
fn dangling_redirect_is_not_found_at_resolve_time() {
    let mut registry = RouteRegistry::new();
    registry
        .register([RouteNode::new("/old").redirect("/nowhere")])
        .unwrap();
    match registry.resolve("/old") {
        Err(RegistryError::NotFound { path }) => assert_eq!(path, "/nowhere"),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(matches!(
        registry.resolve("/missing"),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn optional_one_or_more_param_matches_bare_prefix() {
    let mut registry = RouteRegistry::new();
    registry
        .register([RouteNode::new("/a/:p(.+)?").name("Files")])
        .unwrap();

    let bare = registry.resolve("/a").unwrap();
    assert_eq!(bare.route.name(), Some("Files"));
    assert_eq!(bare.params["p"], "");

    let deep = registry.resolve("/a/x/y").unwrap();
    assert_eq!(deep.params["p"], "x/y");
}

#[test]
fn static_routes_beat_params_and_wildcards() {
    let mut registry = RouteRegistry::new();
    registry
        .register([
            RouteNode::new("/:pathMatch(.*)*").name("NotFound"),
            RouteNode::new("/user/:id").name("User"),
            RouteNode::new("/user/profile").name("Profile"),
        ])
        .unwrap();
    assert_eq!(registry.resolve("/user/profile").unwrap().route.name(), Some("Profile"));
    assert_eq!(registry.resolve("/user/9").unwrap().route.name(), Some("User"));
    assert_eq!(registry.resolve("/elsewhere/deep").unwrap().route.name(), Some("NotFound"));
}

#[test]
fn url_for_round_trips_through_resolve() {
    let registry = dashboard();
    let params = BTreeMap::from([("path".to_string(), "monitor/index".to_string())]);
    let url = registry.url_for("Redirect", &params).unwrap();
    assert_eq!(url, "/redirect/monitor/index");
    assert_eq!(registry.resolve(&url).unwrap().route.name(), Some("Redirect"));

    assert_eq!(registry.url_for("Login", &BTreeMap::new()).unwrap(), "/login");
    assert!(matches!(
        registry.url_for("Nope", &BTreeMap::new()),
        Err(RegistryError::UnknownName { .. })
    ));
}

#[test]
fn url_for_reports_missing_params() {
    let mut registry = RouteRegistry::new();
    registry
        .register([RouteNode::new(r"/user/:id(\d+)").name("User")])
        .unwrap();
    assert!(matches!(
        registry.url_for("User", &BTreeMap::new()),
        Err(RegistryError::MissingParam { ref param, .. }) if param == "id"
    ));
    let bad = BTreeMap::from([("id".to_string(), "abc".to_string())]);
    assert!(matches!(
        registry.url_for("User", &bad),
        Err(RegistryError::InvalidParam { .. })
    ));
}

#[tokio::test]
async fn concurrent_loads_invoke_factory_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = RouteRegistry::new();
    let ids = registry
        .register([RouteNode::new("/slow").component(slow_view(Arc::clone(&calls), false))])
        .unwrap();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let id = ids[0];
            tokio::spawn(async move { registry.load_component(id).await })
        })
        .collect();

    let mut views = Vec::new();
    for handle in handles {
        views.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(views.iter().all(|v| Arc::ptr_eq(v, &views[0])));
}

#[tokio::test]
async fn keep_alive_view_is_reused() {
    let registry = dashboard();
    let id = registry.by_name("Monitor").unwrap().id();
    let first = registry.load_component(id).await.unwrap();
    let second = registry.load_component(id).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.specifier, "@/views/monitor/index.vue");
}

#[tokio::test]
async fn failed_load_is_shared_then_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = RouteRegistry::new();
    let ids = registry
        .register([RouteNode::new("/broken")
            .keep_alive(true)
            .component(slow_view(Arc::clone(&calls), true))])
        .unwrap();

    let (a, b) = tokio::join!(registry.load_component(ids[0]), registry.load_component(ids[0]));
    let (a, b) = match (a, b) {
        (
            Err(RegistryError::ComponentLoad { cause: a, .. }),
            Err(RegistryError::ComponentLoad { cause: b, .. }),
        ) => (a, b),
        other => panic!("expected component load errors, got {other:?}"),
    };
    assert!(Arc::ptr_eq(&a, &b));
    assert!(matches!(*a, LoadError::Failed(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // 失敗はキャッシュされない
    assert!(registry.load_component(ids[0]).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
