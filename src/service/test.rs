use std::time::Duration;

use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{AuthorizationService, HttpAuthorizationService, ServiceError, ValidationError};
use crate::authorize::{AuthorizationRequest, QueryParameters};

fn valid_request() -> AuthorizationRequest {
    let params: QueryParameters = [
        ("response_type", "code"),
        ("client_id", "app1"),
        ("redirect_uri", "https://app1/cb"),
        ("scope", "email profile"),
        ("state", "xyz"),
    ]
    .into_iter()
    .collect();
    AuthorizationRequest::parse(&params).unwrap()
}

fn service_for(server: &MockServer) -> HttpAuthorizationService {
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    HttpAuthorizationService::new(&base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn validate_returns_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/validate/"))
        .and(body_json(serde_json::json!({
            "response_type": "code",
            "client_id": "app1",
            "redirect_uri": "https://app1/cb",
            "scope": "email profile",
            "state": "xyz",
            "code_challenge": null,
            "code_challenge_method": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scopes": [
                { "name": "email", "description": "Read your email" },
                { "name": "profile", "description": "Read your profile" },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service_for(&server)
        .validate(&valid_request())
        .await
        .unwrap();

    let names: Vec<_> = response.scopes.iter().map(|scope| scope.name.as_str()).collect();
    assert_eq!(names, ["email", "profile"]);
    assert_eq!(response.scopes[0].description, "Read your email");
}

#[tokio::test]
async fn validate_rejection_carries_the_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/validate/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 12,
            "message": "Invalid redirect uri",
            "errors": {
                "redirect_uri": { "code": "NOT_REGISTERED", "message": "Not registered" }
            }
        })))
        .mount(&server)
        .await;

    let error = service_for(&server)
        .validate(&valid_request())
        .await
        .unwrap_err();

    let ServiceError::Rejected(ValidationError { code, message, errors }) = error else {
        panic!("expected a rejection");
    };
    assert_eq!(code, 12);
    assert_eq!(message, "Invalid redirect uri");
    assert_eq!(errors["redirect_uri"].code, "NOT_REGISTERED");
}

#[tokio::test]
async fn rejection_without_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/validate/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": 7,
            "message": "Invalid client_id",
        })))
        .mount(&server)
        .await;

    let error = service_for(&server)
        .validate(&valid_request())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ServiceError::Rejected(ValidationError { code: 7, ref errors, .. }) if errors.is_empty()
    ));
}

#[tokio::test]
async fn unexpected_status_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/validate/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let error = service_for(&server)
        .validate(&valid_request())
        .await
        .unwrap_err();

    assert_eq!(error, ServiceError::UnexpectedStatus(502));
}

#[tokio::test]
async fn malformed_validate_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/validate/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = service_for(&server)
        .validate(&valid_request())
        .await
        .unwrap_err();

    assert!(matches!(error, ServiceError::MalformedResponse(_)));
}

#[tokio::test]
async fn accept_succeeds_on_any_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    service_for(&server)
        .accept(&valid_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn accept_without_session_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authorize/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let error = service_for(&server)
        .accept(&valid_request())
        .await
        .unwrap_err();

    assert_eq!(error, ServiceError::Unauthenticated);
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // nothing listens on port 1
    let base_url = Url::parse("http://127.0.0.1:1/").unwrap();
    let service = HttpAuthorizationService::new(&base_url, Duration::from_secs(5)).unwrap();

    let error = service.validate(&valid_request()).await.unwrap_err();

    assert!(matches!(error, ServiceError::Transport(_)));
}
