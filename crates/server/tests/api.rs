use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lostfound::{
    Collaborators, LostFound, LostFoundConfig, PickupCredential, StubAssistant,
    ANALYSIS_FALLBACK_NOTICE,
};
use serde_json::{json, Value};
use server::{build_router, IdTokenVerifier, ServerConfig, ServerState};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789";
const PHOTO: &str = "aGVsbG8gd29ybGQ=";

struct TestApp {
    router: Router,
    verifier: Arc<IdTokenVerifier>,
}

impl TestApp {
    fn new(stub: StubAssistant) -> Self {
        let service = LostFound::with_collaborators(
            LostFoundConfig::default(),
            Collaborators::shared(Arc::new(stub)),
        )
        .unwrap();
        let config = ServerConfig {
            metrics_enabled: false,
            ..ServerConfig::default()
        };
        let verifier = IdTokenVerifier::new(SECRET, 3600).unwrap();
        let state = Arc::new(ServerState::with_service(config, service, verifier).unwrap());
        Self {
            verifier: Arc::clone(&state.verifier),
            router: build_router(state),
        }
    }

    fn token(&self, uid: &str, email: &str) -> String {
        self.verifier.issue(uid, email, None).unwrap()
    }

    fn finder(&self) -> String {
        self.token("uid-finder", "finder@iare.ac.in")
    }

    fn owner(&self) -> String {
        self.token("uid-owner", "owner@iare.ac.in")
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    async fn report_laptop(&self, hidden_details: &str) -> String {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/api/v1/items/found",
                Some(&self.finder()),
                Some(json!({
                    "title": "Black Dell Laptop",
                    "category": "Electronics",
                    "tags": ["dell", "laptop"],
                    "location": "Main Library",
                    "hidden_details": hidden_details,
                    "imageBase64": PHOTO,
                    "mimeType": "image/png"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn pages_follow_the_session_rule() {
    let app = TestApp::new(StubAssistant::new());
    let token = app.owner();

    for path in ["/dashboard", "/report-found", "/report-lost"] {
        let (status, headers, _) = app.send(Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(headers[header::LOCATION], "/");
    }

    let (status, headers, _) = app.send(Method::GET, "/", Some(&token), None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/dashboard");

    let (status, _, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], "landing");

    let (status, _, body) = app.send(Method::GET, "/report-lost", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], "report-lost");
    assert_eq!(body["user"]["email"], "owner@iare.ac.in");
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = TestApp::new(StubAssistant::new());
    let (status, _, body) = app.send(Method::GET, "/api/v1/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_FAILED");
    assert!(!body["error"]["next_step"].as_str().unwrap().is_empty());

    let (status, _, _) = app
        .send(Method::GET, "/api/v1/items", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn off_campus_accounts_are_turned_away() {
    let app = TestApp::new(StubAssistant::new());
    let token = app.token("uid-guest", "guest@gmail.com");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/session",
            None,
            Some(json!({ "idToken": token })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "DOMAIN_REJECTED");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("@iare.ac.in"));

    let (status, _, _) = app.send(Method::GET, "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sign_in_sets_a_session_cookie() {
    let app = TestApp::new(StubAssistant::new());
    let token = app.owner();

    let (status, headers, body) = app
        .send(
            Method::POST,
            "/api/v1/session",
            None,
            Some(json!({ "id_token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"]["uid"], "uid-owner");
    let cookie = headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("lf_session="));
    assert!(cookie.contains("HttpOnly"));

    let pair = cookie.split(';').next().unwrap();
    let request = Request::builder()
        .uri("/api/v1/me")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, headers, _) = app.send(Method::DELETE, "/api/v1/session", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
}

#[tokio::test]
async fn reports_are_validated_and_listed() {
    let app = TestApp::new(StubAssistant::new());
    let token = app.owner();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/items/lost",
            Some(&token),
            Some(json!({
                "title": "Blue Umbrella",
                "category": "Others",
                "description": "left near the canteen"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("location"));

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/items/lost",
            Some(&token),
            Some(json!({
                "title": "Blue Umbrella",
                "category": "Pets",
                "description": "left near the canteen",
                "location": "Canteen"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, _, lost) = app
        .send(
            Method::POST,
            "/api/v1/items/lost",
            Some(&token),
            Some(json!({
                "title": "Blue Umbrella",
                "category": "Others",
                "description": "left near the canteen",
                "location": "Canteen"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lost["type"], "lost");
    assert_eq!(lost["status"], "open");

    let found_id = app.report_laptop("Sticker of a cat under the battery").await;

    let (status, _, body) = app.send(Method::GET, "/api/v1/items", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["id"], found_id.as_str());
    assert!(!body.to_string().contains("Sticker of a cat"));

    let (_, _, body) = app
        .send(Method::GET, "/api/v1/items?type=found", Some(&token), None)
        .await;
    assert_eq!(body["count"], 1);
    assert!(body["items"][0]["image_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let (status, _, _) = app
        .send(Method::GET, "/api/v1/items/missing", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matches_come_from_open_found_items() {
    let app = TestApp::new(StubAssistant::new());
    app.report_laptop("Sticker of a cat under the battery").await;
    let token = app.owner();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "lost my laptop", "category": "Electronics" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stale"], false);
    assert_eq!(body["total_matches"], 1);
    assert_eq!(body["candidates"][0]["title"], "Black Dell Laptop");
    assert!(!body.to_string().contains("Sticker of a cat"));

    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "lost my laptop", "category": "Books" })),
        )
        .await;
    assert_eq!(body["total_matches"], 0);

    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "la", "category": "Electronics" })),
        )
        .await;
    assert_eq!(body["skipped"], true);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn older_match_queries_are_marked_stale() {
    let app = TestApp::new(StubAssistant::new());
    app.report_laptop("Sticker of a cat under the battery").await;
    let token = app.owner();

    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "laptop", "category": "Electronics", "seq": 5 })),
        )
        .await;
    assert_eq!(body["stale"], false);
    assert_eq!(body["seq"], 5);

    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "lapto", "category": "Electronics", "seq": 3 })),
        )
        .await;
    assert_eq!(body["stale"], true);
    assert_eq!(body["candidates"].as_array().unwrap().len(), 0);

    // Sequences are tracked per user.
    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&app.finder()),
            Some(json!({ "title": "laptop", "category": "Electronics", "seq": 1 })),
        )
        .await;
    assert_eq!(body["stale"], false);
}

#[tokio::test]
async fn oversized_match_sequence_is_refused() {
    let app = TestApp::new(StubAssistant::new());
    app.report_laptop("Sticker of a cat under the battery").await;
    let token = app.owner();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "laptop", "category": "Electronics", "seq": u64::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // The refused number must not poison later queries.
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "laptop", "category": "Electronics", "seq": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stale"], false);
    assert_eq!(body["total_matches"], 1);

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&token),
            Some(json!({ "title": "laptop", "category": "Electronics" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seq"], 2);
}

#[tokio::test]
async fn successful_claim_issues_a_pickup_code() {
    let app = TestApp::new(StubAssistant::fixed(88, "Details line up"));
    let item_id = app.report_laptop("Sticker of a cat under the battery").await;
    let owner = app.owner();

    let (status, _, claim) = app
        .send(
            Method::POST,
            "/api/v1/claims",
            Some(&owner),
            Some(json!({ "itemId": item_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{claim}");
    assert_eq!(claim["step"], "input");
    let claim_id = claim["claim_id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/claims/{claim_id}/proof"),
            Some(&owner),
            Some(json!({ "proof": "a cat" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/claims/{claim_id}/proof"),
            Some(&owner),
            Some(json!({ "proof": "There is a cat sticker under the battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "success");
    assert_eq!(body["score"], 88);
    let expected = PickupCredential::issue(&item_id, "uid-owner").to_string();
    assert_eq!(body["pickup_code"], expected.as_str());

    // A verified claim is discarded once its result has been delivered.
    let (status, _, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/claims/{claim_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_claim_can_be_retried() {
    let app = TestApp::new(StubAssistant::fixed(40, "Too vague"));
    let item_id = app.report_laptop("Sticker of a cat under the battery").await;
    let owner = app.owner();

    let (_, _, claim) = app
        .send(
            Method::POST,
            "/api/v1/claims",
            Some(&owner),
            Some(json!({ "item_id": item_id })),
        )
        .await;
    let claim_id = claim["claim_id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/claims/{claim_id}/proof"),
            Some(&owner),
            Some(json!({ "proof": "It is a black laptop from Dell" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "fail");
    assert!(body.get("pickup_code").is_none());

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/claims/{claim_id}/retry"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "input");

    let (status, _, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/claims/{claim_id}"),
            Some(&app.finder()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/claims/{claim_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/claims/{claim_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn finders_cannot_claim_their_own_items() {
    let app = TestApp::new(StubAssistant::new());
    let item_id = app.report_laptop("Sticker of a cat under the battery").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/claims",
            Some(&app.finder()),
            Some(json!({ "itemId": item_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn only_the_reporter_marks_an_item_returned() {
    let app = TestApp::new(StubAssistant::new());
    let item_id = app.report_laptop("Sticker of a cat under the battery").await;
    let uri = format!("/api/v1/items/{item_id}/returned");

    let (status, _, _) = app.send(Method::POST, &uri, Some(&app.owner()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app.send(Method::POST, &uri, Some(&app.finder()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "returned");

    let (status, _, body) = app.send(Method::POST, &uri, Some(&app.finder()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/matches",
            Some(&app.owner()),
            Some(json!({ "title": "laptop", "category": "Electronics" })),
        )
        .await;
    assert_eq!(body["total_matches"], 0);
}

#[tokio::test]
async fn draft_degrades_when_analysis_fails() {
    let app = TestApp::new(StubAssistant::failing());
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/items/found/draft",
            Some(&app.finder()),
            Some(json!({ "imageBase64": PHOTO })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"], ANALYSIS_FALLBACK_NOTICE);
    assert_eq!(body["title"], "");
}

#[tokio::test]
async fn callables_report_failures_directly() {
    let app = TestApp::new(StubAssistant::failing());
    let token = app.finder();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/functions/analyze-item-image",
            Some(&token),
            Some(json!({ "imageBase64": PHOTO, "mimeType": "image/jpeg" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "ASSIST_FAILED");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/functions/analyze-item-image",
            Some(&token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn verify_claim_callable_scores_proof() {
    let app = TestApp::new(StubAssistant::fixed(75, "Mostly matches"));
    let item_id = app.report_laptop("Sticker of a cat under the battery").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/functions/verify-claim",
            Some(&app.owner()),
            Some(json!({
                "itemId": item_id,
                "proofDescription": "Cat sticker under the battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 75);
    assert_eq!(body["reason"], "Mostly matches");

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/v1/functions/verify-claim",
            Some(&app.owner()),
            Some(json!({ "itemId": "nope", "proofDescription": "Cat sticker" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same item rules as opening a claim: never against your own report.
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/functions/verify-claim",
            Some(&app.finder()),
            Some(json!({
                "itemId": item_id,
                "proofDescription": "Cat sticker under the battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/items/{item_id}/returned"),
            Some(&app.finder()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/functions/verify-claim",
            Some(&app.owner()),
            Some(json!({
                "itemId": item_id,
                "proofDescription": "Cat sticker under the battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn health_checks_and_unknown_routes() {
    let app = TestApp::new(StubAssistant::new());
    let (status, _, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _, body) = app.send(Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/items/lost",
            Some(&app.owner()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}
