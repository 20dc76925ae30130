use super::*;
use crate::context::test_helpers::{Reply, ScriptedTransport, user_json};
use crate::http::{ApiClient, IDENTITY_PATH};

const SITES: &str = "/api/sites";

fn client(transport: &Arc<ScriptedTransport>) -> (ApiClient, Arc<SessionManager>) {
    let session = Arc::new(SessionManager::new(transport.clone(), vec![]));
    let client = ApiClient::new(transport.clone()).with(Arc::new(RefreshOnUnauthorized::new(Arc::clone(&session))));
    (client, session)
}

#[tokio::test]
async fn success_passes_through_without_refresh() {
    let transport = Arc::new(ScriptedTransport::new().on(SITES, Reply::status(200, "[]")));
    let (client, _) = client(&transport);

    let resp = client.send(ApiRequest::get(SITES)).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(transport.calls_to(REFRESH_PATH), 0);
}

#[tokio::test]
async fn unauthorized_refreshes_and_retries_once() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(SITES, Reply::status(401, ""))
            .on(SITES, Reply::status(200, "[]"))
            .on(REFRESH_PATH, Reply::status(200, "{}")),
    );
    let (client, _) = client(&transport);

    let resp = client.send(ApiRequest::get(SITES)).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(transport.calls_to(SITES), 2);
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
}

#[tokio::test]
async fn retry_that_is_still_unauthorized_is_returned_as_is() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(SITES, Reply::status(401, ""))
            .on(REFRESH_PATH, Reply::status(200, "{}")),
    );
    let (client, _) = client(&transport);

    let resp = client.send(ApiRequest::get(SITES)).await.unwrap();

    assert_eq!(resp.status, 401);
    assert_eq!(transport.calls_to(SITES), 2);
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
}

#[tokio::test]
async fn failed_refresh_clears_session() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(IDENTITY_PATH, Reply::json(200, user_json(1, "a@example.test")))
            .on(SITES, Reply::status(401, ""))
            .on(REFRESH_PATH, Reply::status(401, "")),
    );
    let (client, session) = client(&transport);
    session.check_auth().await;
    assert!(session.has_valid_session());

    let resp = client.send(ApiRequest::get(SITES)).await.unwrap();

    assert_eq!(resp.status, 401);
    assert_eq!(transport.calls_to(SITES), 1);
    assert!(!session.has_valid_session());
}

#[tokio::test]
async fn refresh_endpoint_401_is_not_intercepted() {
    let transport = Arc::new(ScriptedTransport::new().on(REFRESH_PATH, Reply::status(401, "")));
    let (client, _) = client(&transport);

    let resp = client.send(ApiRequest::post(REFRESH_PATH)).await.unwrap();

    assert_eq!(resp.status, 401);
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
}

#[tokio::test]
async fn retried_request_keeps_method_and_body() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(SITES, Reply::status(401, ""))
            .on(SITES, Reply::status(201, "{}"))
            .on(REFRESH_PATH, Reply::status(200, "{}")),
    );
    let (client, _) = client(&transport);
    let request = ApiRequest::post(SITES).with_json(serde_json::json!({ "name": "Catedral" }));

    client.send(request.clone()).await.unwrap();

    let replays: Vec<_> = transport.calls().into_iter().filter(|r| r.path == SITES).collect();
    assert_eq!(replays, vec![request.clone(), request]);
}

#[tokio::test]
async fn network_error_propagates_to_caller() {
    let transport = Arc::new(ScriptedTransport::new().on(SITES, Reply::network_error()));
    let (client, _) = client(&transport);

    let err = client.send(ApiRequest::get(SITES)).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(transport.calls_to(REFRESH_PATH), 0);
}
