use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use serde_json::json;

use fence_estimator_api::client::{ClientError, FenceClient};
use fence_estimator_api::config::AppConfig;
use fence_estimator_api::database::models::{FenceType, Job};
use fence_estimator_api::database::MemoryStore;
use fence_estimator_api::services::{EstimateQuery, LoginRequest, RegisterRequest, ValidatePromoRequest};
use fence_estimator_api::{build_router, AppState};

/// Serve a fresh in-memory app on a free local port.
async fn spawn_server() -> Result<FenceClient> {
    let port = portpicker::pick_unused_port().ok_or_else(|| anyhow::anyhow!("no free port"))?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let router = build_router(AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new())));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(FenceClient::new(&format!("http://127.0.0.1:{}/", port))?)
}

async fn signed_in(client: &FenceClient, email: &str) -> Result<FenceClient> {
    client
        .register(&RegisterRequest {
            email: email.to_string(),
            password: "correct-horse-battery".to_string(),
            display_name: None,
            organization_name: Some(format!("{} fencing", email)),
        })
        .await?;
    let (authed, login) = client
        .login(&LoginRequest {
            email: email.to_string(),
            password: "correct-horse-battery".to_string(),
        })
        .await?;
    assert_eq!(login.user.email, email);
    Ok(authed)
}

#[tokio::test]
async fn client_round_trips_resources() -> Result<()> {
    let anonymous = spawn_server().await?;
    assert_eq!(anonymous.health().await?["status"], "ok");

    let client = signed_in(&anonymous, "crew@example.com").await?;
    assert!(client.token().is_some());

    let fence: FenceType = client
        .create::<FenceType>(&json!({ "name": "Cedar", "price_per_linear_foot": "25.00" }))
        .await?;
    let listed = client.list::<FenceType>().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, fence.id);

    let job: Job = client.create::<Job>(&json!({ "name": "Front yard" })).await?;
    let renamed: Job = client.update::<Job>(job.id, &json!({ "name": "Front and side yard" })).await?;
    assert_eq!(renamed.name, "Front and side yard");

    let deleted = client.delete::<Job>(job.id).await?;
    assert!(deleted.deleted);

    let err = client.get::<Job>(job.id).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    Ok(())
}

#[tokio::test]
async fn client_reports_api_errors() -> Result<()> {
    let anonymous = spawn_server().await?;

    let err = anonymous.list::<Job>().await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));

    let err = anonymous
        .login(&LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "whatever-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { ref message, .. } if message == "Invalid email or password"));
    Ok(())
}

#[tokio::test]
async fn client_estimates_seeded_job() -> Result<()> {
    let anonymous = spawn_server().await?;
    let client = signed_in(&anonymous, "owner@example.com").await?;

    let org = client.current_organization().await?;
    let summary = client.seed_sample_data(org.organization.id).await?;
    assert_eq!(summary.fence_segments, 3);

    let promo = client
        .validate_promo(&ValidatePromoRequest {
            promo_code: "sample10".to_string(),
            order_value: Decimal::new(200000, 2),
            linear_feet: 0.0,
        })
        .await?;
    assert_eq!(promo.discount_amount, Decimal::new(20000, 2));

    let estimate = client
        .estimate(
            summary.job_id,
            &EstimateQuery {
                promo_code: Some("SAMPLE10".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(estimate.pricing_config_id, summary.pricing_config_id);
    assert_eq!(estimate.tax_region_id, Some(summary.tax_region_id));
    assert!(estimate.discount_amount > Decimal::ZERO);
    assert!(estimate.total > Decimal::ZERO);
    Ok(())
}
