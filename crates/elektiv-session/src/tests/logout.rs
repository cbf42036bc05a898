//! Logout teardown.

use super::harness::*;
use crate::SessionState;
use elektiv_storage::StorageKeys;

#[tokio::test]
async fn test_logout_clears_session_and_notifies_server() {
    let backend = MockBackend::start().await;
    let tm = manager_for(&backend.url());
    let access = make_token(1200);
    login(&tm, &backend, &access).await;

    backend.set_response("/auth/logout/", CannedResponse::json(205, ""));
    tm.manager.logout().await.unwrap();

    assert_eq!(tm.manager.state(), SessionState::NotLoggedIn);
    assert!(tm.stored(StorageKeys::ACCESS_TOKEN).is_none());
    assert!(tm.stored(StorageKeys::REFRESH_TOKEN).is_none());
    assert!(tm.stored(StorageKeys::SESSION_META).is_none());
    assert!(tm.manager.current_user().is_none());
    // Deliberate logout is not an expiry.
    assert_eq!(tm.expired_events(), 0);

    let request = &backend.requests_for("/auth/logout/")[0];
    assert!(request.body.contains("refresh-1"));
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {access}").as_str())
    );
}

#[tokio::test]
async fn test_logout_clears_session_when_server_errors() {
    let backend = MockBackend::start().await;
    let tm = manager_for(&backend.url());
    login(&tm, &backend, &make_token(1200)).await;

    backend.set_response(
        "/auth/logout/",
        CannedResponse::json(500, r#"{"detail":"boom"}"#),
    );
    tm.manager.logout().await.unwrap();

    assert_eq!(tm.manager.state(), SessionState::NotLoggedIn);
    assert!(tm.stored(StorageKeys::ACCESS_TOKEN).is_none());
}

#[tokio::test]
async fn test_logout_clears_session_when_server_unreachable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let tm = manager_for(&format!("http://{addr}"));
    tm.manager
        .install_session(&make_token(1200), "refresh-1", &student_profile())
        .unwrap();

    tm.manager.logout().await.unwrap();
    assert!(tm.stored(StorageKeys::ACCESS_TOKEN).is_none());
}

#[tokio::test]
async fn test_logout_without_session_is_a_noop() {
    let backend = MockBackend::start().await;
    let tm = manager_for(&backend.url());

    tm.manager.logout().await.unwrap();
    assert_eq!(tm.manager.state(), SessionState::NotLoggedIn);
    assert!(backend.requests().is_empty());
}
