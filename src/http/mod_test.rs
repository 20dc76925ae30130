use super::*;

#[derive(Debug, serde::Deserialize)]
struct Probe {
    status: String,
}

#[test]
fn targets_ignores_query_and_trailing_slash() {
    assert!(ApiRequest::post("/auth/refresh/").targets(REFRESH_PATH));
    assert!(ApiRequest::post("/auth/refresh?next=/").targets(REFRESH_PATH));
    assert!(!ApiRequest::get("/auth/me").targets(REFRESH_PATH));
}

#[test]
fn builders_set_method_and_body() {
    let req = ApiRequest::post("/api/sites").with_json(serde_json::json!({ "name": "Cabildo" }));
    assert_eq!(req.method, Method::Post);
    assert_eq!(req.body.as_ref().and_then(|b| b["name"].as_str()), Some("Cabildo"));
    assert_eq!(ApiRequest::get("/x").method, Method::Get);
}

#[test]
fn response_status_predicates() {
    assert!(ApiResponse::new(204, "").is_success());
    assert!(!ApiResponse::new(301, "").is_success());
    assert!(ApiResponse::new(401, "").is_unauthorized());
}

#[test]
fn response_json_decodes_body() {
    let probe: Probe = ApiResponse::new(200, r#"{"status":"ok"}"#).json().unwrap();
    assert_eq!(probe.status, "ok");
}

#[test]
fn response_json_reports_decode_error() {
    let err = ApiResponse::new(200, "<html>").json::<Probe>().unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[test]
fn error_for_status_classifies_failures() {
    assert!(ApiResponse::new(200, "").error_for_status().is_ok());
    let err = ApiResponse::new(401, "").error_for_status().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}
