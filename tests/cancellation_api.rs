mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use campaign_refunds::db::models::submission::{SubmissionStatus, SubmissionType};
use campaign_refunds::db::store::Store;
use common::{TestApp, PASSWORD};

fn create_body(submission_id: i32) -> serde_json::Value {
    json!({ "submission_type": "reward", "submission_id": submission_id, "reason": "  budget cut  " })
}

#[tokio::test]
async fn liveness_and_readiness_are_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_issues_a_token_that_opens_private_routes() {
    let app = TestApp::new();
    app.client("cafe_owner").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "cafe_owner", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "cafe_owner");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = body["data"]["token"].as_str().unwrap().to_string();
    let (status, body) = app.get("/points", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 0);
}

#[tokio::test]
async fn login_refuses_wrong_password_and_locked_accounts() {
    let app = TestApp::new();
    app.client("cafe_owner").await;
    app.account("frozen", "client", true).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "cafe_owner", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "frozen", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn private_routes_require_a_valid_unlocked_account() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/cancellations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/cancellations", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let locked = app.account("frozen", "client", true).await;
    let (status, _) = app.get("/cancellations", &locked.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preview_reports_the_breakdown_without_side_effects() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let submission_id = app.running_reward(client.id).await;

    let uri = format!("/submissions/reward/{}/refund-preview", submission_id);
    let (status, body) = app.get(&uri, &client.token).await;
    assert_eq!(status, StatusCode::OK);
    let breakdown = &body["data"];
    assert_eq!(breakdown["progress_rate"], 30.0);
    assert_eq!(breakdown["completed_points"], 3000);
    assert_eq!(breakdown["remaining_points"], 7000);
    assert_eq!(breakdown["fee"], 700);
    assert_eq!(breakdown["calculated_refund"], 6300);

    let (_, list) = app.get("/cancellations", &client.token).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn preview_rejects_unknown_category_and_foreign_submissions() {
    let app = TestApp::new();
    let owner = app.client("cafe_owner").await;
    let other = app.client("someone_else").await;
    let submission_id = app.running_reward(owner.id).await;

    let (status, body) = app
        .get(&format!("/submissions/place_traffic/{}/refund-preview", submission_id), &owner.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "submission_type");

    let (status, _) = app
        .get(&format!("/submissions/reward/{}/refund-preview", submission_id), &other.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_snapshots_the_refund_and_blocks_duplicates() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let submission_id = app.running_reward(client.id).await;

    let (status, body) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["calculated_refund"], 6300);
    assert_eq!(body["data"]["business_name"], "Gangnam Noodle House");
    assert_eq!(body["data"]["reason"], "budget cut");
    assert!(body["data"]["final_refund"].is_null());

    let (status, body) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["code"], "cancellation_already_requested");
}

#[tokio::test]
async fn finished_submissions_cannot_be_cancelled() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let submission_id = app
        .store
        .insert_submission(
            SubmissionType::ReceiptReview,
            client.id,
            "Done Deal",
            SubmissionStatus::Completed,
            5000,
            10,
            10,
        )
        .await;

    let (status, body) = app
        .post(
            "/cancellations",
            &client.token,
            json!({ "submission_type": "receipt_review", "submission_id": submission_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["code"], "submission_not_cancellable");
}

#[tokio::test]
async fn only_admins_may_decide() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    let request_id = created["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .patch(
            &format!("/cancellations/{}", request_id),
            &client.token,
            json!({ "decision": "approved", "final_refund": 6300 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&format!("/cancellations/{}", request_id), &client.token).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn approval_with_override_credits_points_exactly_once() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let admin = app.admin().await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    let request_id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/cancellations/{}", request_id);

    let (status, body) = app
        .patch(
            &uri,
            &admin.token,
            json!({ "decision": "approved", "final_refund": 5000, "admin_response": "partial goodwill" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["final_refund"], 5000);
    assert_eq!(body["data"]["calculated_refund"], 6300);
    assert_eq!(body["data"]["decided_by"], admin.id);

    let (status, body) = app
        .patch(&uri, &admin.token, json!({ "decision": "approved", "final_refund": 5000 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["code"], "already_decided");

    let (_, points) = app.get("/points", &client.token).await;
    assert_eq!(points["data"]["balance"], 5000);
    let transactions = points["data"]["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "cancellation_refund");
    assert_eq!(transactions[0]["reference"], format!("cancellation:{}", request_id));

    let submission = app
        .store
        .find_submission(SubmissionType::Reward, submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Cancelled);
    assert!(!submission.cancellation_requested);
}

#[tokio::test]
async fn rejection_moves_no_points_and_allows_a_new_request() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let admin = app.admin().await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    let request_id = created["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .patch(
            &format!("/cancellations/{}", request_id),
            &admin.token,
            json!({ "decision": "rejected", "final_refund": 9999, "admin_response": "campaign nearly done" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");
    assert!(body["data"]["final_refund"].is_null());

    let (_, points) = app.get("/points", &client.token).await;
    assert_eq!(points["data"]["balance"], 0);

    let (status, _) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn approval_amount_is_validated() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let admin = app.admin().await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    let uri = format!("/cancellations/{}", created["data"]["id"].as_i64().unwrap());

    let (status, body) = app.patch(&uri, &admin.token, json!({ "decision": "approved" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "final_refund");

    let (status, _) = app
        .patch(&uri, &admin.token, json!({ "decision": "approved", "final_refund": 10_001 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(&uri, &admin.token, json!({ "decision": "approved", "final_refund": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&uri, &admin.token).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn ledger_failure_leaves_the_request_pending() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let admin = app.admin().await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;
    let uri = format!("/cancellations/{}", created["data"]["id"].as_i64().unwrap());

    app.store.set_fail_on_credit(true);
    let (status, body) = app
        .patch(&uri, &admin.token, json!({ "decision": "approved", "final_refund": 6300 }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["errors"]["code"], "dependency_failure");

    let (_, body) = app.get(&uri, &admin.token).await;
    assert_eq!(body["data"]["status"], "pending");
    let (_, points) = app.get("/points", &client.token).await;
    assert_eq!(points["data"]["balance"], 0);

    app.store.set_fail_on_credit(false);
    let (status, _) = app
        .patch(&uri, &admin.token, json!({ "decision": "approved", "final_refund": 6300 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, points) = app.get("/points", &client.token).await;
    assert_eq!(points["data"]["balance"], 6300);
}

#[tokio::test]
async fn listing_is_scoped_to_the_caller_and_filterable() {
    let app = TestApp::new();
    let first = app.client("cafe_owner").await;
    let second = app.client("bakery_owner").await;
    let admin = app.admin().await;

    let first_submission = app.running_reward(first.id).await;
    let second_submission = app.running_reward(second.id).await;
    let (_, created) = app.post("/cancellations", &first.token, create_body(first_submission)).await;
    app.post("/cancellations", &second.token, create_body(second_submission)).await;
    let first_request = created["data"]["id"].as_i64().unwrap();

    app.patch(
        &format!("/cancellations/{}", first_request),
        &admin.token,
        json!({ "decision": "rejected" }),
    )
    .await;

    let (_, mine) = app.get("/cancellations", &first.token).await;
    let mine = mine["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["client_id"], first.id);
    assert_eq!(mine[0]["breakdown"]["calculated_refund"], 6300);

    let (_, all) = app.get("/cancellations", &admin.token).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let (_, pending) = app.get("/cancellations?status=pending", &admin.token).await;
    let pending = pending["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["client_id"], second.id);

    let (status, _) = app
        .get(&format!("/cancellations/{}", first_request), &second.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn workflow_notifies_admins_then_the_client() {
    let app = TestApp::new();
    let client = app.client("cafe_owner").await;
    let admin = app.admin().await;
    let submission_id = app.running_reward(client.id).await;
    let (_, created) = app.post("/cancellations", &client.token, create_body(submission_id)).await;

    let (_, inbox) = app.get("/notifications", &admin.token).await;
    let inbox = inbox["data"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "cancellation_requested");

    let (_, inbox) = app.get("/notifications", &client.token).await;
    assert!(inbox["data"].as_array().unwrap().is_empty());

    app.patch(
        &format!("/cancellations/{}", created["data"]["id"].as_i64().unwrap()),
        &admin.token,
        json!({ "decision": "approved", "final_refund": 6300 }),
    )
    .await;

    let (_, inbox) = app.get("/notifications", &client.token).await;
    let inbox = inbox["data"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "cancellation_approved");
    assert_eq!(app.store.notification_count().await, 2);
}
