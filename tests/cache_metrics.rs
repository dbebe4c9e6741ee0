use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use mondrian::application::render::RendererClient;
use mondrian::cache::{CacheConfig, CacheEntry, RenderCache};
use mondrian::domain::view::{Properties, ViewRequest};
use mondrian::infra::renderer::HttpRendererClient;
use url::Url;

fn request(name: &str, doc: &str) -> ViewRequest {
    ViewRequest::new(name, Properties::new().with("doc", doc)).expect("valid request")
}

#[tokio::test]
async fn render_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // miss, hit and capacity eviction
    let cache = Arc::new(RenderCache::new(&CacheConfig::bounded(1)));
    for doc in ["a.svg", "a.svg", "b.svg"] {
        cache
            .get_or_render(&request("editor", doc), || async {
                Ok::<_, io::Error>(CacheEntry::html("<p>page</p>"))
            })
            .await
            .expect("render succeeds");
    }

    // join on an in-flight render
    let slow = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_render(&request("index", "slow"), || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, io::Error>(CacheEntry::html("<p>slow</p>"))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache
        .get_or_render(&request("index", "slow"), || async {
            Ok::<_, io::Error>(CacheEntry::html("<p>unused</p>"))
        })
        .await
        .expect("joined render succeeds");
    slow.await.expect("task").expect("render succeeds");

    // failed render
    let failed = cache
        .get_or_render(&request("index", "broken"), || async {
            Err::<CacheEntry, _>(io::Error::other("template failed"))
        })
        .await;
    assert!(failed.is_err());

    // renderer fallback
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let endpoint = Url::parse(&format!("http://{addr}/")).expect("url");
    let renderer = HttpRendererClient::new(endpoint, Duration::from_millis(200)).expect("client");
    assert!(renderer.render("index", "{}").await.is_empty());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "mondrian_view_cache_hit_total",
        "mondrian_view_cache_miss_total",
        "mondrian_view_cache_join_total",
        "mondrian_view_cache_render_failure_total",
        "mondrian_view_cache_evict_total",
        "mondrian_view_render_ms",
        "mondrian_renderer_fallback_total",
        "mondrian_renderer_request_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
