mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{Account, TestApp};

async fn discount(app: &TestApp, owner: &Account, body: Value) -> Result<()> {
    app.create("/api/discounts", &owner.token, body).await?;
    Ok(())
}

async fn validate(app: &TestApp, owner: &Account, code: &str, order_value: &str, linear_feet: f64) -> Result<common::TestResponse> {
    app.post(
        "/api/discounts/validate",
        &owner.token,
        json!({ "promo_code": code, "order_value": order_value, "linear_feet": linear_feet }),
    )
    .await
}

#[tokio::test]
async fn each_rejection_has_its_own_message() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let tomorrow = Utc::now() + Duration::days(1);
    let yesterday = Utc::now() - Duration::days(1);

    discount(&app, &a, json!({ "name": "Off", "promo_code": "OFF", "discount_value": "10", "is_active": false })).await?;
    discount(&app, &a, json!({ "name": "Soon", "promo_code": "SOON", "discount_value": "10", "valid_from": tomorrow })).await?;
    discount(&app, &a, json!({ "name": "Old", "promo_code": "OLD", "discount_value": "10", "valid_until": yesterday })).await?;
    discount(
        &app,
        &a,
        json!({ "name": "Big", "promo_code": "BIG", "discount_value": "10", "minimum_order_value": "500.00" }),
    )
    .await?;
    discount(&app, &a, json!({ "name": "Long", "promo_code": "LONG", "discount_value": "10", "minimum_linear_feet": 100.0 }))
        .await?;

    let cases = [
        ("NOPE", "Invalid promo code"),
        ("OFF", "Promo code is not active"),
        ("SOON", "Promo code is not yet valid"),
        ("OLD", "Promo code has expired"),
        ("BIG", "Minimum order value of 500.00 not met"),
        ("LONG", "Minimum of 100 linear feet not met"),
    ];
    for (code, message) in cases {
        let res = validate(&app, &a, code, "200.00", 50.0).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", code);
        assert_eq!(res.error(), message, "{}", code);
    }
    Ok(())
}

#[tokio::test]
async fn matching_code_returns_the_discount() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    discount(
        &app,
        &a,
        json!({
            "name": "Spring",
            "promo_code": "spring10",
            "discount_type": "percentage",
            "discount_value": "10",
            "maximum_discount_amount": "150.00"
        }),
    )
    .await?;

    let res = validate(&app, &a, " Spring10 ", "1000.00", 120.0).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["promo_code"], "SPRING10");
    assert_eq!(res.data()["name"], "Spring");
    assert_eq!(res.data()["discount_amount"], "100.00");

    let capped = validate(&app, &a, "SPRING10", "5000.00", 120.0).await?;
    assert_eq!(capped.data()["discount_amount"], "150.00");
    Ok(())
}

#[tokio::test]
async fn fixed_discount_never_exceeds_order() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    discount(
        &app,
        &a,
        json!({ "name": "Flat", "promo_code": "FLAT", "discount_type": "fixed_amount", "discount_value": "250.00" }),
    )
    .await?;

    let res = validate(&app, &a, "FLAT", "80.00", 0.0).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["discount_amount"], "80.00");
    Ok(())
}

#[tokio::test]
async fn promo_codes_are_unique_within_an_organization_only() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let b = app.account("b@example.com", Some("Org B")).await?;
    let body = json!({ "name": "Spring", "promo_code": "SPRING", "discount_value": "5" });

    discount(&app, &a, body.clone()).await?;
    let dup = app.post("/api/discounts", &a.token, json!({ "name": "Again", "promo_code": "spring", "discount_value": "5" })).await?;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);
    assert_eq!(dup.error(), "A discount with this promo code already exists");

    discount(&app, &b, body).await?;

    let from_b = validate(&app, &b, "SPRING", "100.00", 0.0).await?;
    assert_eq!(from_b.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn codes_of_other_organizations_are_invalid() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let b = app.account("b@example.com", Some("Org B")).await?;
    discount(&app, &a, json!({ "name": "Secret", "promo_code": "SECRET", "discount_value": "50" })).await?;

    let res = validate(&app, &b, "SECRET", "100.00", 0.0).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Invalid promo code");
    Ok(())
}

#[tokio::test]
async fn out_of_range_order_is_a_bad_request() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    discount(&app, &a, json!({ "name": "Ten", "promo_code": "TEN", "discount_value": "10" })).await?;

    let huge = validate(&app, &a, "TEN", "79228162514264337593543950335", 0.0).await?;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);
    assert!(huge.body["field_errors"]["order_value"].is_string(), "{}", huge.body);

    let negative = validate(&app, &a, "TEN", "-5.00", 0.0).await?;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
    assert!(negative.body["field_errors"]["order_value"].is_string());

    let feet = validate(&app, &a, "TEN", "100.00", -1.0).await?;
    assert_eq!(feet.status, StatusCode::BAD_REQUEST);
    assert!(feet.body["field_errors"]["linear_feet"].is_string());

    let ok = validate(&app, &a, "TEN", "9999999999.99", 0.0).await?;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert_eq!(ok.data()["discount_amount"], "1000000000.00");
    Ok(())
}
