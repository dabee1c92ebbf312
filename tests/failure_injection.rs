//! Failure injection tests for the forwarding proxy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = common::closed_port().await;
    let (proxy, shutdown) = common::start_proxy(common::loopback_config()).await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .query(&[("url", format!("http://{}/", dead))])
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "upstream request failed\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_redirect_loop_past_limit_is_bad_gateway() {
    // The upstream redirects to itself forever
    let hops = Arc::new(AtomicU32::new(0));
    let (looping, seen) = common::start_programmable_backend(move || {
        let n = hops.fetch_add(1, Ordering::SeqCst);
        async move { (302, format!("/loop/{}", n)) }
    })
    .await;

    let mut config = common::loopback_config();
    config.upstream.max_redirects = 1;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .query(&[("url", format!("http://{}/loop", looping))])
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "upstream request failed\n");
    // The original request plus the single permitted hop
    assert_eq!(seen.lock().unwrap().len(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_is_gateway_timeout() {
    let (upstream, _) = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "too late".into())
    })
    .await;

    let mut config = common::loopback_config();
    config.timeouts.upstream_secs = Some(1);
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .query(&[("url", format!("http://{}/", upstream))])
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.text().await.unwrap(), "upstream request timed out\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_deadline_is_gateway_timeout() {
    let (upstream, _) = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "too late".into())
    })
    .await;

    let mut config = common::loopback_config();
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = None;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .query(&[("url", format!("http://{}/", upstream))])
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.text().await.unwrap(), "upstream request timed out\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_quota_exhaustion_blocks_forwarding() {
    let (upstream, captured) = common::start_mock_backend(200, "ok").await;

    let mut config = common::loopback_config();
    config.rate_limit.max_requests = 2;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let client = common::client();
    let target = format!("http://{}/", upstream);

    for _ in 0..2 {
        let res = client
            .get(format!("http://{}/", proxy))
            .query(&[("url", &target)])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-ratelimit-remaining"));
    }

    let res = client
        .get(format!("http://{}/", proxy))
        .query(&[("url", &target)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key("retry-after"));
    assert_eq!(res.text().await.unwrap(), "rate limit exceeded\n");

    assert_eq!(captured.lock().unwrap().len(), 2);

    // Liveness stays reachable once the quota is gone
    let res = client
        .get(format!("http://{}/healthz", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_quota_refills_after_window() {
    let (upstream, _) = common::start_mock_backend(200, "ok").await;

    let mut config = common::loopback_config();
    config.rate_limit.max_requests = 1;
    config.rate_limit.window = Duration::from_millis(500);
    let (proxy, shutdown) = common::start_proxy(config).await;

    let client = common::client();
    let send = || {
        client
            .get(format!("http://{}/", proxy))
            .query(&[("url", format!("http://{}/", upstream))])
            .send()
    };

    assert_eq!(send().await.unwrap().status(), StatusCode::OK);
    assert_eq!(send().await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);

    shutdown.trigger();
}
