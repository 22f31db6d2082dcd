mod common;

use std::str::FromStr;

use anyhow::Result;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{Account, TestApp};

fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .map(Decimal::from_str)
        .and_then(Result::ok)
        .unwrap_or_else(|| panic!("not a decimal string: {}", value))
}

/// One job with a 100 ft cedar run and one walk gate.
async fn priced_job(app: &TestApp, a: &Account) -> Result<Uuid> {
    let cedar = app
        .create("/api/fence-types", &a.token, json!({ "name": "Cedar", "price_per_linear_foot": "20.00" }))
        .await?;
    let walk = app
        .create("/api/gate-types", &a.token, json!({ "name": "Walk gate", "price": "300.00" }))
        .await?;
    let job = app.create("/api/jobs", &a.token, json!({ "name": "Backyard" })).await?;
    let segment = app
        .create(
            "/api/fence-segments",
            &a.token,
            json!({
                "job_id": job,
                "fence_type_id": cedar,
                "length_feet": 100.0,
                "coordinates": [
                    { "latitude": 45.0, "longitude": -122.0 },
                    { "latitude": 45.0, "longitude": -121.9996 }
                ]
            }),
        )
        .await?;
    app.create(
        "/api/gate-positions",
        &a.token,
        json!({ "job_id": job, "fence_segment_id": segment, "gate_type_id": walk, "latitude": 45.0, "longitude": -122.0 }),
    )
    .await?;
    Ok(job)
}

async fn default_pricing(app: &TestApp, a: &Account, minimum: &str) -> Result<Uuid> {
    app.create(
        "/api/pricing-configs",
        &a.token,
        json!({
            "name": "Standard",
            "labor_rate_per_foot": "10.00",
            "markup_percentage": "20",
            "minimum_job_price": minimum,
            "gate_installation_fee": "50.00",
            "is_default": true
        }),
    )
    .await
}

#[tokio::test]
async fn estimate_uses_defaults_promo_and_tax() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let job = priced_job(&app, &a).await?;
    default_pricing(&app, &a, "0").await?;
    app.create("/api/tax-regions", &a.token, json!({ "name": "County", "tax_rate": "10", "is_default": true }))
        .await?;
    app.create("/api/discounts", &a.token, json!({ "name": "Ten", "promo_code": "TEN", "discount_value": "10" }))
        .await?;

    let res = app.get(&format!("/api/jobs/{}/estimate?promo_code=TEN", job), &a.token).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    let e = res.data();

    assert_eq!(e["lines"].as_array().map(Vec::len), Some(2));
    assert_eq!(money(&e["subtotal"]), Decimal::new(335000, 2));
    assert_eq!(money(&e["markup"]), Decimal::new(67000, 2));
    assert_eq!(money(&e["total_before_discount"]), Decimal::new(402000, 2));
    assert_eq!(money(&e["discount_amount"]), Decimal::new(40200, 2));
    assert_eq!(money(&e["tax"]), Decimal::new(36180, 2));
    assert_eq!(money(&e["total"]), Decimal::new(397980, 2));
    assert_eq!(e["linear_feet"].as_f64(), Some(100.0));
    Ok(())
}

#[tokio::test]
async fn minimum_job_price_raises_small_jobs() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let job = priced_job(&app, &a).await?;
    default_pricing(&app, &a, "5000.00").await?;

    let res = app.get(&format!("/api/jobs/{}/estimate", job), &a.token).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(money(&res.data()["minimum_adjustment"]), Decimal::new(98000, 2));
    assert_eq!(money(&res.data()["total"]), Decimal::new(500000, 2));
    assert!(res.data()["tax_region_id"].is_null());
    Ok(())
}

#[tokio::test]
async fn estimate_without_pricing_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let job = app.create("/api/jobs", &a.token, json!({ "name": "Bare" })).await?;

    let res = app.get(&format!("/api/jobs/{}/estimate", job), &a.token).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "No pricing configuration available");
    Ok(())
}

#[tokio::test]
async fn estimate_rejects_foreign_pricing_and_jobs() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let b = app.account("b@example.com", Some("Org B")).await?;
    let job = priced_job(&app, &a).await?;
    default_pricing(&app, &a, "0").await?;
    let b_pricing = default_pricing(&app, &b, "0").await?;

    let foreign_pricing = app
        .get(&format!("/api/jobs/{}/estimate?pricing_config_id={}", job, b_pricing), &a.token)
        .await?;
    assert_eq!(foreign_pricing.status, StatusCode::BAD_REQUEST);
    assert_eq!(foreign_pricing.error(), "Pricing configuration not found or access denied");

    let foreign_job = app.get(&format!("/api/jobs/{}/estimate", job), &b.token).await?;
    assert_eq!(foreign_job.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unusable_promo_code_fails_the_estimate() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let job = priced_job(&app, &a).await?;
    default_pricing(&app, &a, "0").await?;
    app.create(
        "/api/discounts",
        &a.token,
        json!({ "name": "Long", "promo_code": "LONG", "discount_value": "10", "minimum_linear_feet": 500.0 }),
    )
    .await?;

    let res = app.get(&format!("/api/jobs/{}/estimate?promo_code=LONG", job), &a.token).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Minimum of 500 linear feet not met");
    Ok(())
}
