//! End-to-end tests running a real listener against an in-process fabric.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use mrpcproxy::{BusClient, Endpoint, MemoryBus, Proxy, wire};

use helpers::{CaptureSink, init_tracing, test_hook};

async fn spawn_proxy(
    proxy: Proxy,
) -> (Arc<Proxy>, tokio::task::JoinHandle<std::io::Result<()>>, String) {
    let proxy = Arc::new(proxy);
    let server = tokio::spawn({
        let proxy = proxy.clone();
        async move { proxy.serve().await }
    });

    // Give the listener a moment to bind.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let addr = proxy.local_addr().expect("proxy bound");
    (proxy, server, format!("http://{addr}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn serves_bridged_endpoints_end_to_end() {
    init_tracing();

    let bus = Arc::new(MemoryBus::new());
    bus.handle_fn("service.a", |reply, _payload| async move {
        let response = wire::Response {
            code: 200,
            msg: b"a response".to_vec(),
            headers: HashMap::new(),
        };
        reply.write(response.to_bytes().unwrap());
    });

    let requests = CaptureSink::default();
    let requests_opt = requests.clone();
    let mut proxy = Proxy::new(
        "127.0.0.1:0",
        Some(bus as Arc<dyn BusClient>),
        vec![Box::new(move |proxy: &mut Proxy| {
            proxy.headers.insert(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            );
            proxy.hook = Some(test_hook());
            proxy.requests = Arc::new(requests_opt);
            Ok(())
        })],
    )
    .unwrap();
    proxy
        .handle(Endpoint::new("service.a", Method::GET, "/a", 0))
        .unwrap();

    let (proxy, server, base) = spawn_proxy(proxy).await;
    let client = reqwest::Client::new();

    // Bridged endpoint.
    let response = client.get(format!("{base}/a")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("x-test-handler-header").unwrap(),
        "OK"
    );
    assert_eq!(response.text().await.unwrap(), "a response");

    // OPTIONS preflight answers the default header set and runs the hook.
    let response = client
        .request(reqwest::Method::OPTIONS, format!("{base}/a"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers().get("x-test-handler-header").unwrap(),
        "OK"
    );

    // Unregistered route.
    let response = client.get(format!("{base}/404")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(requests.last().unwrap(), "404 - GET:/404");

    // Graceful stop: the listener goes away and new connects fail at the
    // transport layer.
    proxy.stop(Duration::from_secs(1)).await;
    server.await.unwrap().unwrap();

    let fresh = reqwest::Client::new();
    assert!(fresh.get(format!("{base}/404")).send().await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_topic_renders_408_with_hook_headers_only() {
    init_tracing();

    let bus = Arc::new(MemoryBus::new());
    bus.handle_fn("service.b", |_reply, _payload| async move {});

    let access = CaptureSink::default();
    let debug = CaptureSink::default();
    let requests = CaptureSink::default();
    let mut proxy =
        Proxy::new("127.0.0.1:0", Some(bus as Arc<dyn BusClient>), Vec::new()).unwrap();
    proxy.hook = Some(test_hook());
    proxy.get_id = Arc::new(|| "uuid".to_string());
    proxy.access = Arc::new(access.clone());
    proxy.debug = Arc::new(debug.clone());
    proxy.requests = Arc::new(requests.clone());
    proxy
        .handle(Endpoint::new("service.b", Method::GET, "/b", 0))
        .unwrap();

    let (proxy, server, base) = spawn_proxy(proxy).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/b")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::REQUEST_TIMEOUT);
    assert_eq!(
        response.headers().get("x-test-handler-header").unwrap(),
        "OK"
    );
    assert!(response.headers().get("x-test-header").is_none());
    assert_eq!(response.text().await.unwrap(), "");

    assert_eq!(access.lines().len(), 1);
    assert!(access.lines()[0].ends_with("Id: uuid"));
    assert!(debug.lines().is_empty());
    assert_eq!(requests.lines(), vec!["408 - GET:/b (service.b)"]);

    proxy.stop(Duration::from_secs(1)).await;
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn path_parameters_merge_after_query_values() {
    init_tracing();

    let bus = Arc::new(MemoryBus::new());
    bus.handle_fn("service.echo", |reply, payload| async move {
        let request: wire::Request = serde_json::from_slice(&payload).unwrap();
        let response = wire::Response {
            code: 200,
            msg: serde_json::to_vec(&request.query_params).unwrap(),
            headers: HashMap::new(),
        };
        reply.write(response.to_bytes().unwrap());
    });

    let mut proxy =
        Proxy::new("127.0.0.1:0", Some(bus as Arc<dyn BusClient>), Vec::new()).unwrap();
    proxy
        .handle(Endpoint::new("service.echo", Method::GET, "/test/{a}/", 0))
        .unwrap();

    let (proxy, server, base) = spawn_proxy(proxy).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/test/1/?b=2&a=3"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let merged: HashMap<String, Vec<String>> =
        serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(
        merged,
        HashMap::from([
            ("a".to_string(), vec!["3".to_string(), "1".to_string()]),
            ("b".to_string(), vec!["2".to_string()]),
        ])
    );

    proxy.stop(Duration::from_secs(1)).await;
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_are_bridged_in_parallel() {
    init_tracing();

    let bus = Arc::new(MemoryBus::new());
    bus.handle_fn("service.slow", |reply, _payload| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let response = wire::Response {
            code: 200,
            msg: b"OK".to_vec(),
            headers: HashMap::new(),
        };
        reply.write(response.to_bytes().unwrap());
    });

    let mut proxy =
        Proxy::new("127.0.0.1:0", Some(bus as Arc<dyn BusClient>), Vec::new()).unwrap();
    proxy
        .handle(Endpoint::new("service.slow", Method::GET, "/slow", 2))
        .unwrap();

    let (proxy, server, base) = spawn_proxy(proxy).await;
    let client = reqwest::Client::new();

    let started = Instant::now();
    let (first, second) = tokio::join!(
        client.get(format!("{base}/slow")).send(),
        client.get(format!("{base}/slow")).send(),
    );
    let elapsed = started.elapsed();

    assert_eq!(first.unwrap().status(), reqwest::StatusCode::OK);
    assert_eq!(second.unwrap().status(), reqwest::StatusCode::OK);
    // Serialized handling would take at least a second.
    assert!(elapsed < Duration::from_millis(950), "elapsed: {elapsed:?}");

    proxy.stop(Duration::from_secs(1)).await;
    server.await.unwrap().unwrap();
}
