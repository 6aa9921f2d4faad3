use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{app, config::Config, database::MemoryStore, state::State};
use tower::ServiceExt;

const CAMPAIGN: &str = "0xcampaign";
const INVESTOR: &str = "0xinvestor";

fn router() -> Router {
    app(State::with_store(
        Config::default(),
        Arc::new(MemoryStore::new()),
    ))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body)
}

async fn seed(router: &Router, stage: u32) {
    let (status, _) = send(
        router,
        Method::POST,
        &format!("/{CAMPAIGN}/registerInvestor"),
        Some(json!({ "investorAddress": INVESTOR, "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        router,
        Method::POST,
        &format!("/{CAMPAIGN}"),
        Some(json!({ "stage": stage.to_string(), "powText": "milestone report" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn create_campaign_returns_record() {
    let router = router();

    let (status, body) = send(
        &router,
        Method::POST,
        "/campaign",
        Some(json!({ "address": CAMPAIGN, "name": "Solar", "stages": [{ "goal": 10 }] })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["campaign"]["address"], CAMPAIGN);
    assert_eq!(body["campaign"]["stages"][0]["goal"], 10);
}

#[tokio::test]
async fn campaign_votes_null_then_first_vote() {
    let router = router();

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    seed(&router, 2).await;

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["campaign"], CAMPAIGN);
    assert_eq!(body["stage"], 2);
    assert_eq!(body["proofOfWork"]["text"], "milestone report");
    assert_eq!(body["votes"], json!([]));
}

#[tokio::test]
async fn check_vote_exists() {
    let router = router();
    let uri = format!("/{CAMPAIGN}/1/check");

    let (_, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(body, json!({ "isValid": false }));

    seed(&router, 1).await;

    let (_, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(body, json!({ "isValid": true }));
}

#[tokio::test]
async fn cast_vote_requires_vote_and_investor() {
    let router = router();
    let uri = format!("/{CAMPAIGN}/1/vote");
    let ballot = json!({ "yes": true, "investorAddress": INVESTOR });

    let (status, body) = send(&router, Method::POST, &uri, Some(ballot.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Investor not registered" }));

    send(
        &router,
        Method::POST,
        &format!("/{CAMPAIGN}/registerInvestor"),
        Some(json!({ "investorAddress": INVESTOR, "name": "Ada" })),
    )
    .await;

    let (status, body) = send(&router, Method::POST, &uri, Some(ballot)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Vote not created" }));
}

#[tokio::test]
async fn vote_check_change_and_fetch() {
    let router = router();
    seed(&router, 1).await;
    let vote_uri = format!("/{CAMPAIGN}/1/vote");
    let check_uri = format!("/{CAMPAIGN}/1/check");

    let (_, body) = send(&router, Method::POST, &check_uri, Some(json!({ "address": INVESTOR }))).await;
    assert_eq!(body, json!({ "voted": false, "vote": null }));

    let (status, body) = send(
        &router,
        Method::POST,
        &vote_uri,
        Some(json!({ "yes": true, "investorAddress": INVESTOR })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "success": true, "message": "Voted successfully" }));

    let (_, body) = send(&router, Method::POST, &check_uri, Some(json!({ "address": INVESTOR }))).await;
    assert_eq!(body, json!({ "voted": true, "vote": true }));

    let (status, body) = send(
        &router,
        Method::PUT,
        &vote_uri,
        Some(json!({ "yes": false, "investorAddress": INVESTOR })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("{vote_uri}?investorAddress={INVESTOR}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "vote": { "investorAddress": INVESTOR, "vote": false } })
    );
}

#[tokio::test]
async fn investor_vote_without_address() {
    let router = router();

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/1/vote"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Invalid Investor Address" }));
}

#[tokio::test]
async fn investor_vote_not_voted_yet() {
    let router = router();
    seed(&router, 1).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/{CAMPAIGN}/1/vote?investorAddress={INVESTOR}"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Investor has not voted yet");
}

#[tokio::test]
async fn stats_and_results() {
    let router = router();

    let (status, _) = send(&router, Method::GET, &format!("/{CAMPAIGN}/1/stats"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, Method::GET, &format!("/results/{CAMPAIGN}/1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Vote not created");

    seed(&router, 1).await;
    for (investor, yes) in [("0xa", true), ("0xb", true), ("0xc", false)] {
        send(
            &router,
            Method::POST,
            &format!("/{CAMPAIGN}/registerInvestor"),
            Some(json!({ "investorAddress": investor, "name": investor })),
        )
        .await;
        send(
            &router,
            Method::POST,
            &format!("/{CAMPAIGN}/1/vote"),
            Some(json!({ "yes": yes, "investorAddress": investor })),
        )
        .await;
    }

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/1/stats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["vote"]["votes"].as_array().map(Vec::len), Some(3));

    let (status, body) = send(&router, Method::GET, &format!("/results/{CAMPAIGN}/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["yes"], 2);
    assert_eq!(body["no"], 1);
    assert_eq!(body["over"], false);
    let hours_left = body["deadline"]["days"].as_i64().unwrap_or_default() * 24
        + body["deadline"]["hours"].as_i64().unwrap_or_default();
    assert!((47..=48).contains(&hours_left));
}

#[tokio::test]
async fn non_numeric_stage_rejected_as_json() {
    let router = router();

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/first/check"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "Invalid stage: first" }));

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/{CAMPAIGN}"),
        Some(json!({ "stage": "first", "powText": "pow" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn path_and_body_stages_parse_alike() {
    let router = router();

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/{CAMPAIGN}"),
        Some(json!({ "stage": "1abc", "powText": "pow" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/1/check"), None).await;
    assert_eq!(body, json!({ "isValid": true }));

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/1abc/check"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isValid": true }));
}

#[tokio::test]
async fn negative_stage_accepted() {
    let router = router();

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/{CAMPAIGN}"),
        Some(json!({ "stage": "-2", "powText": "pow" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/-2/check"), None).await;
    assert_eq!(body, json!({ "isValid": true }));

    let (status, body) = send(&router, Method::GET, &format!("/{CAMPAIGN}/-2/stats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote"]["stage"], -2);
}

#[tokio::test]
async fn check_voted_without_body() {
    let router = router();
    seed(&router, 1).await;

    let (status, body) = send(&router, Method::POST, &format!("/{CAMPAIGN}/1/check"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "voted": false, "vote": null }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_casts_over_http_all_land() {
    let router = router();
    seed(&router, 1).await;

    let investors: Vec<String> = (0..50).map(|i| format!("0xbacker{i}")).collect();
    for investor in &investors {
        send(
            &router,
            Method::POST,
            &format!("/{CAMPAIGN}/registerInvestor"),
            Some(json!({ "investorAddress": investor, "name": investor })),
        )
        .await;
    }

    let handles: Vec<_> = investors
        .iter()
        .map(|investor| {
            let router = router.clone();
            let ballot = json!({ "yes": true, "investorAddress": investor });
            tokio::spawn(async move {
                send(&router, Method::POST, &format!("/{CAMPAIGN}/1/vote"), Some(ballot)).await
            })
        })
        .collect();

    for handle in handles {
        let (status, _) = handle.await.expect("join");
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&router, Method::GET, &format!("/results/{CAMPAIGN}/1"), None).await;
    assert_eq!(body["yes"], 50);
    assert_eq!(body["no"], 0);
}
