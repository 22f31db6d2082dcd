mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestApp;

fn segment(job_id: Uuid) -> Value {
    json!({
        "job_id": job_id,
        "label": "Back line",
        "coordinates": [
            { "latitude": 45.5231, "longitude": -122.6765 },
            { "latitude": 45.5231, "longitude": -122.6758 }
        ]
    })
}

#[tokio::test]
async fn cross_organization_reference_is_rejected_and_nothing_is_stored() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let b = app.account("b@example.com", Some("Org B")).await?;
    let a_job = app.create("/api/jobs", &a.token, json!({ "name": "A job" })).await?;

    let res = app.post("/api/fence-segments", &b.token, segment(a_job)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Job not found or access denied");

    for token in [&a.token, &b.token] {
        let listed = app.get("/api/fence-segments", token).await?;
        assert_eq!(listed.data().as_array().map(Vec::len), Some(0));
    }
    Ok(())
}

#[tokio::test]
async fn segment_length_is_derived_and_listed_by_job() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let job = app.create("/api/jobs", &a.token, json!({ "name": "Backyard" })).await?;
    let other_job = app.create("/api/jobs", &a.token, json!({ "name": "Front yard" })).await?;

    let seg = app.post("/api/fence-segments", &a.token, segment(job)).await?;
    assert_eq!(seg.status, StatusCode::CREATED);
    let length = seg.data()["length_feet"].as_f64().unwrap_or_default();
    assert!(length > 150.0 && length < 190.0, "unexpected length {}", length);

    let by_job = app.get(&format!("/api/fence-segments/by-job/{}", job), &a.token).await?;
    assert_eq!(by_job.data().as_array().map(Vec::len), Some(1));
    let by_other = app.get(&format!("/api/fence-segments/by-job/{}", other_job), &a.token).await?;
    assert_eq!(by_other.data().as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn validation_failures_report_fields() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;

    let res = app
        .post("/api/fence-types", &a.token, json!({ "name": "  ", "price_per_linear_foot": "-1" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(res.body["field_errors"]["name"].is_string());
    assert!(res.body["field_errors"]["price_per_linear_foot"].is_string());
    Ok(())
}

#[tokio::test]
async fn amounts_must_fit_their_columns() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;

    let pricing = app
        .post(
            "/api/pricing-configs",
            &a.token,
            json!({ "name": "P", "markup_percentage": "5000", "minimum_job_price": "10000000000" }),
        )
        .await?;
    assert_eq!(pricing.status, StatusCode::BAD_REQUEST);
    assert_eq!(pricing.body["field_errors"]["markup_percentage"], "Must be between 0 and 100");
    assert!(pricing.body["field_errors"]["minimum_job_price"].is_string());

    let fence = app
        .post("/api/fence-types", &a.token, json!({ "name": "Gold", "price_per_linear_foot": "10000000000000000" }))
        .await?;
    assert_eq!(fence.status, StatusCode::BAD_REQUEST);
    assert!(fence.body["field_errors"]["price_per_linear_foot"].is_string());

    let job = app.create("/api/jobs", &a.token, json!({ "name": "Long run" })).await?;
    let segment = app
        .post(
            "/api/fence-segments",
            &a.token,
            json!({
                "job_id": job,
                "coordinates": [{ "latitude": 45.0, "longitude": -122.0 }, { "latitude": 45.001, "longitude": -122.0 }],
                "length_feet": 1e16
            }),
        )
        .await?;
    assert_eq!(segment.status, StatusCode::BAD_REQUEST);
    assert!(segment.body["field_errors"]["length_feet"].is_string());
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;

    let res = app.post("/api/jobs", &a.token, json!({ "name": 42 })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    Ok(())
}

#[tokio::test]
async fn delete_reports_the_removed_id() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let gate_type = app
        .create("/api/gate-types", &a.token, json!({ "name": "Walk gate", "width_feet": 4, "price": "350.00" }))
        .await?;

    let path = format!("/api/gate-types/{}", gate_type);
    let res = app.delete(&path, &a.token).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["deleted"], true);
    assert_eq!(res.data()["id"], gate_type.to_string());

    assert_eq!(app.get(&path, &a.token).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&path, &a.token).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn second_default_pricing_config_replaces_the_first() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let body = |name: &str| json!({ "name": name, "labor_rate_per_foot": "10.00", "is_default": true });

    let first = app.create("/api/pricing-configs", &a.token, body("Standard")).await?;
    let second = app.create("/api/pricing-configs", &a.token, body("Premium")).await?;

    let listed = app.get("/api/pricing-configs", &a.token).await?;
    let defaults: Vec<&Value> = listed
        .data()
        .as_array()
        .map(|rows| rows.iter().filter(|r| r["is_default"] == true).collect())
        .unwrap_or_default();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], second.to_string());

    let current = app.get("/api/pricing-configs/default", &a.token).await?;
    assert_eq!(current.data()["id"], second.to_string());

    let first_now = app.get(&format!("/api/pricing-configs/{}", first), &a.token).await?;
    assert_eq!(first_now.data()["is_default"], false);
    Ok(())
}

#[tokio::test]
async fn defaults_are_per_organization() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;
    let b = app.account("b@example.com", Some("Org B")).await?;

    let a_tax = app
        .create("/api/tax-regions", &a.token, json!({ "name": "County", "tax_rate": "8.25", "is_default": true }))
        .await?;
    let b_tax = app
        .create("/api/tax-regions", &b.token, json!({ "name": "City", "tax_rate": "9.00", "is_default": true }))
        .await?;

    assert_eq!(app.get("/api/tax-regions/default", &a.token).await?.data()["id"], a_tax.to_string());
    assert_eq!(app.get("/api/tax-regions/default", &b.token).await?.data()["id"], b_tax.to_string());
    Ok(())
}

#[tokio::test]
async fn missing_default_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let a = app.account("a@example.com", Some("Org A")).await?;

    let res = app.get("/api/tax-regions/default", &a.token).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
