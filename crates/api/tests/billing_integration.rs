//! Integration tests for plan enforcement, credit and audit ledgers, and AI generation.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{shop_uri, test_now, TestApp, TestAppBuilder};
use domain::models::{Plan, Shop, ShopBillingState};
use serde_json::json;

async fn put_plan(app: &TestApp, shop: &Shop, plan: Plan, trial: bool, credits_used: i32) {
    let mut state = ShopBillingState::new_free(shop.id, test_now());
    state.plan = plan;
    state.subscription_status = Some("active".to_string());
    if trial {
        state.trial_ends_at = Some(test_now() + Duration::days(7));
    }
    state.ai_credits_used = credits_used;
    app.store.put_billing(state).await;
}

fn generate_body() -> serde_json::Value {
    json!({ "productId": "prod-1", "field": "description" })
}

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn test_new_shop_starts_on_free_plan() {
    let app = TestApp::new();
    let shop = app.create_shop().await;

    let (status, body) = app.get(&shop_uri(&shop, "/billing")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["inTrial"], false);
    assert_eq!(body["credits"]["limit"], 0);
    assert_eq!(body["audits"]["limit"], 1);
    assert_eq!(body["audits"]["remaining"], 1);
    assert_eq!(body["audits"]["resetsAt"], "2025-04-10T08:00:00Z");

    assert!(app.store.billing_state(shop.id).await.is_some());
}

#[tokio::test]
async fn test_billing_for_unknown_shop_is_not_found() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    app.store.remove_shop(shop.id).await;

    let (status, body) = app.get(&shop_uri(&shop, "/billing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post_empty(&shop_uri(&shop, "/billing/credits/consume"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.billing_state(shop.id).await.is_none());
}

#[tokio::test]
async fn test_pro_trial_status() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, true, 5).await;

    let (_, body) = app.get(&shop_uri(&shop, "/billing")).await;

    assert_eq!(body["plan"], "pro");
    assert_eq!(body["inTrial"], true);
    assert_eq!(body["credits"], json!({
        "used": 5,
        "limit": 20,
        "remaining": 15,
        "resetsAt": "2025-04-10T08:00:00Z"
    }));
    assert!(body["audits"]["limit"].is_null());
}

#[tokio::test]
async fn test_credits_reset_when_period_elapsed() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, false, 40).await;
    app.clock.advance(Duration::days(45));

    let (_, body) = app.get(&shop_uri(&shop, "/billing")).await;

    assert_eq!(body["credits"]["used"], 0);
    assert_eq!(body["credits"]["limit"], 100);
    assert_eq!(body["credits"]["resetsAt"], "2025-05-01T00:00:00Z");
}

// ============================================================================
// Feature enforcement
// ============================================================================

#[tokio::test]
async fn test_free_plan_ai_is_locked() {
    let app = TestApp::new();
    let shop = app.create_shop().await;

    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["errorCode"], "AI_FEATURE_LOCKED");
    assert_eq!(body["requiredPlan"], "pro");
}

#[tokio::test]
async fn test_autofix_requires_starter() {
    let app = TestApp::new();
    let shop = app.create_shop().await;

    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=autofix"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AUTOFIX_FEATURE_LOCKED");
    assert_eq!(body["requiredPlan"], "starter");

    put_plan(&app, &shop, Plan::Starter, false, 0).await;
    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=autofix"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["plan"], "starter");
    assert!(body.get("errorCode").is_none());
}

#[tokio::test]
async fn test_starter_plan_ai_is_locked() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Starter, false, 0).await;

    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai_with_credits"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AI_FEATURE_LOCKED");
}

#[tokio::test]
async fn test_trial_credit_limit_reached() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, true, 20).await;

    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai_with_credits"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AI_LIMIT_REACHED");
    assert_eq!(body["inTrial"], true);
    assert_eq!(body["credits"]["used"], 20);
    assert_eq!(body["credits"]["remaining"], 0);
    assert!(body["message"].as_str().unwrap().contains("20 of 20"));
}

#[tokio::test]
async fn test_enforce_with_several_credits() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, false, 97).await;

    let (status, _) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai_with_credits&credits=3"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai_with_credits&credits=4"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai_with_credits&credits=0"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dev_store_gets_pro() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    let mut state = ShopBillingState::new_free(shop.id, test_now());
    state.is_dev_store = true;
    app.store.put_billing(state).await;

    let (status, body) = app
        .get(&shop_uri(&shop, "/billing/enforce?feature=ai"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["inTrial"], false);
}

// ============================================================================
// Ledgers
// ============================================================================

#[tokio::test]
async fn test_consume_credit_stops_at_ceiling() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, true, 19).await;
    let uri = shop_uri(&shop, "/billing/credits/consume");

    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used"], 20);
    assert_eq!(body["remaining"], 0);

    let (status, body) = app.post_empty(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used"], 20);
}

#[tokio::test]
async fn test_free_audit_limit() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    let check_uri = shop_uri(&shop, "/billing/audits");

    let (status, body) = app.get(&check_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audits"]["used"], 0);

    let (status, body) = app
        .post_empty(&shop_uri(&shop, "/billing/audits/increment"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used"], 1);
    assert_eq!(body["remaining"], 0);

    let (status, body) = app.get(&check_uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AUDIT_LIMIT_REACHED");
    assert_eq!(body["requiredPlan"], "starter");
}

#[tokio::test]
async fn test_paid_plan_audits_unlimited() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Starter, false, 0).await;

    for _ in 0..3 {
        app.post_empty(&shop_uri(&shop, "/billing/audits/increment"))
            .await;
    }

    let (status, body) = app.get(&shop_uri(&shop, "/billing/audits")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audits"]["used"], 3);
    assert!(body["audits"]["limit"].is_null());
}

// ============================================================================
// AI generation
// ============================================================================

#[tokio::test]
async fn test_generate_on_free_plan_is_forbidden() {
    let app = TestApp::new();
    let shop = app.create_shop().await;

    let (status, body) = app
        .post(&shop_uri(&shop, "/ai/generate"), generate_body())
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AI_FEATURE_LOCKED");
}

#[tokio::test]
async fn test_generate_consumes_one_credit() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, true, 0).await;

    let (status, body) = app
        .post(&shop_uri(&shop, "/ai/generate"), generate_body())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["productId"], "prod-1");
    assert_eq!(body["field"], "description");
    assert_eq!(body["content"], "Generated description for prod-1");
    assert_eq!(body["credits"]["used"], 1);
    assert_eq!(body["credits"]["limit"], 20);

    let state = app.store.billing_state(shop.id).await.unwrap();
    assert_eq!(state.ai_credits_used, 1);
}

#[tokio::test]
async fn test_generate_at_limit_is_forbidden() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, true, 20).await;

    let (status, body) = app
        .post(&shop_uri(&shop, "/ai/generate"), generate_body())
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AI_LIMIT_REACHED");
}

#[tokio::test]
async fn test_failed_generation_consumes_nothing() {
    let app = TestAppBuilder::new().with_failing_ai().build();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, false, 0).await;

    let (status, body) = app
        .post(&shop_uri(&shop, "/ai/generate"), generate_body())
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");
    let state = app.store.billing_state(shop.id).await.unwrap();
    assert_eq!(state.ai_credits_used, 0);
}

#[tokio::test]
async fn test_generate_validates_request() {
    let app = TestApp::new();
    let shop = app.create_shop().await;
    put_plan(&app, &shop, Plan::Pro, false, 0).await;

    let (status, _) = app
        .post(
            &shop_uri(&shop, "/ai/generate"),
            json!({ "productId": "prod-1", "field": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
