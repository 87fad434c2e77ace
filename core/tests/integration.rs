//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock auth + catalog server on a random port, then exercises
//! every `ApiClient` operation over real HTTP through `UreqTransport`. The
//! server's request log shows what actually went over the wire.

use std::sync::{Arc, Mutex};

use bookdesk_core::{decode_catalog, ApiClient, ApiError, CatalogQuery, Session, TraceRecord};
use mock_server::MockState;

/// Start the mock server on a random port and return its base URL and
/// shared state.
fn start_server() -> (String, Arc<MockState>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = Arc::new(MockState::seeded());
    let server_state = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, server_state).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), state)
}

/// A base URL nothing listens on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn auth_lifecycle() {
    let (base, state) = start_server();
    let api = ApiClient::new(&base, &base);

    // Step 1: profile without a session is rejected by the server.
    let err = api.profile(&Session::default()).unwrap_err();
    assert_eq!(err.status(), Some(401));

    // Step 2: register logs the user in.
    let registered = api
        .register(&Session::default(), "ana@example.com", "ana", "pw")
        .unwrap();
    assert_eq!(registered.body["user"]["username"], "ana");
    let session = registered.session;
    assert!(session.is_authenticated());
    assert!(session.refresh_token.is_some());
    assert!(session.access_expires_at_utc.is_some());

    // Step 3: login by username produces a fresh token set.
    let logged_in = api.login(&session, "ana", "pw").unwrap().session;
    assert_ne!(logged_in.access_token, session.access_token);
    assert_ne!(logged_in.refresh_token, session.refresh_token);

    // Step 4: profile with the session.
    let profile = api.profile(&logged_in).unwrap();
    assert_eq!(profile["user"]["email"], "ana@example.com");

    // Step 5: refresh swaps the access token only.
    let refreshed = api.refresh(&logged_in).unwrap().session;
    assert_ne!(refreshed.access_token, logged_in.access_token);
    assert_eq!(refreshed.refresh_token, logged_in.refresh_token);
    api.profile(&refreshed).unwrap();

    // Step 6: bad credentials are an HTTP error and leave nothing behind.
    let err = api.login(&refreshed, "ana", "wrong").unwrap_err();
    match err {
        ApiError::Http { status, url, body } => {
            assert_eq!(status, 401);
            assert_eq!(url, format!("{base}/auth/login"));
            assert!(body.contains("invalid credentials"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let paths: Vec<String> = state.recorded().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/api/profile",
            "/auth/register",
            "/auth/login",
            "/api/profile",
            "/auth/refresh",
            "/api/profile",
            "/auth/login",
        ]
    );
}

#[test]
fn refresh_without_token_never_reaches_the_server() {
    let (base, state) = start_server();
    let api = ApiClient::new(&base, &base);

    let err = api.refresh(&Session::default()).unwrap_err();
    assert!(matches!(err, ApiError::IllegalState(_)));
    assert!(state.recorded().is_empty());
}

#[test]
fn catalog_fetch_and_decode() {
    let (base, state) = start_server();
    let api = ApiClient::new(&base, &base);

    let xml = api.fetch_catalog_xml().unwrap();
    let rows = decode_catalog(&xml).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].title, "Dune");
    assert_eq!(rows[0].price, "9.99");

    let xml = api
        .fetch_catalog_xml_for(&CatalogQuery::Author("J. R. R. Tolkien".to_string()))
        .unwrap();
    let rows = decode_catalog(&xml).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].isbn, "9780547928227");

    let err = api
        .fetch_catalog_xml_for(&CatalogQuery::Isbn("0000".to_string()))
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    let recorded = state.recorded();
    assert_eq!(recorded[1].path, "/api/books/author/J.%20R.%20R.%20Tolkien");
}

#[test]
fn catalog_outage_is_http_500() {
    let (base, state) = start_server();
    let api = ApiClient::new(&base, &base);

    state.set_catalog_down(true);
    let err = api.fetch_catalog_xml().unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!api.health_books());

    state.set_catalog_down(false);
    assert!(api.health_books());
}

#[test]
fn health_checks() {
    let (base, _state) = start_server();
    let api = ApiClient::new(&base, &base);
    assert!(api.health_auth());
    assert!(api.health_books());

    let dead = dead_url();
    let api = ApiClient::new(&dead, &dead);
    assert!(!api.health_auth());
    assert!(!api.health_books());
    let err = api.fetch_catalog_xml().unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[test]
fn trace_records_hide_bearer_tokens() {
    let (base, _state) = start_server();
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let api = ApiClient::new(&base, &base).with_observer(Arc::new(move |record: &TraceRecord| {
        sink.lock().unwrap().push(record.clone());
    }));

    let session = api
        .register(&Session::default(), "bo@example.com", "bo", "pw")
        .unwrap()
        .session;
    api.profile(&session).unwrap();

    let access = session.access_token.unwrap();
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| !format!("{r:?}").contains(&format!("Bearer {access}"))));
    match &records[3] {
        TraceRecord::Response { label, status, content_type, .. } => {
            assert_eq!(*label, "profile");
            assert_eq!(*status, 200);
            assert!(content_type.starts_with("application/json"));
        }
        other => panic!("unexpected record: {other:?}"),
    }
}
