use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig, StoreBackend};
use crate::database::models::{
    Component, DiscountRule, Drawing, FenceSegment, FenceType, GatePosition, GateType, Job, Parcel, PricingConfig,
    Resource, TaxRegion,
};
use crate::database::{DatabaseError, DatabaseManager, MemoryStore, PgStore, TenantStore};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, tenant_context_middleware};
use crate::tenant::{SessionContext, TenantContext, ORGANIZATION_HEADER};

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TenantStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn TenantStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(public_auth_routes())
        .merge(protected_routes(state.clone()))
        .layer(RequestBodyLimitLayer::new(state.config.api.max_request_size_bytes));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn public_auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{defaults, discounts, jobs, me, organizations};

    Router::new()
        .route("/api/auth/me", get(me::whoami))
        .nest(Job::PATH, resource_routes::<Job>().route("/:id/estimate", get(jobs::estimate)))
        .nest(Parcel::PATH, resource_routes::<Parcel>())
        .nest(FenceType::PATH, resource_routes::<FenceType>())
        .nest(GateType::PATH, resource_routes::<GateType>())
        .nest(Component::PATH, resource_routes::<Component>())
        .nest(FenceSegment::PATH, resource_routes::<FenceSegment>())
        .nest(GatePosition::PATH, resource_routes::<GatePosition>())
        .nest(Drawing::PATH, resource_routes::<Drawing>())
        .nest(DiscountRule::PATH, resource_routes::<DiscountRule>().route("/validate", post(discounts::validate)))
        .nest(
            PricingConfig::PATH,
            resource_routes::<PricingConfig>().route("/default", get(defaults::default_record::<PricingConfig>)),
        )
        .nest(
            TaxRegion::PATH,
            resource_routes::<TaxRegion>().route("/default", get(defaults::default_record::<TaxRegion>)),
        )
        .route("/api/organizations/current", get(organizations::current))
        .route("/api/organizations/invitations/accept", post(organizations::accept_invitation))
        .route("/api/organizations/:org_id/members", get(organizations::members))
        .route("/api/organizations/:org_id/invitations", post(organizations::invite))
        .route("/api/organizations/:org_id/members/:member_id", axum::routing::delete(organizations::remove_member))
        .route("/api/organizations/:org_id/members/:member_id/role", put(organizations::update_role))
        .route("/api/organizations/:org_id/sample-data", post(organizations::sample_data))
        // Layers run bottom-up: authenticate first, then resolve the organization.
        .route_layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// CRUD routes shared by every tenant resource, plus its `by-<parent>` lists.
fn resource_routes<R: Resource>() -> Router<AppState> {
    use protected::resources;

    let mut router = Router::new().route("/", get(resources::list::<R>).post(resources::create::<R>)).route(
        "/:id",
        get(resources::get::<R>)
            .put(resources::update::<R>)
            .delete(resources::delete::<R>),
    );

    for filter in R::LIST_FILTERS {
        let column = filter.column;
        router = router.route(
            &format!("/{}/:value", filter.route),
            get(
                move |State(state): State<AppState>, Extension(ctx): Extension<TenantContext>, Path(value): Path<String>| {
                    resources::list_by::<R>(state, ctx, value, column)
                },
            ),
        );
    }
    router
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(ORGANIZATION_HEADER),
        ]);

    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins)).allow_credentials(true)
}

/// Open the configured store. For Postgres this applies migrations (with the
/// bounded startup retry) and, when enabled, the row-level security policies.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn TenantStore>, DatabaseError> {
    match config.database.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let manager = DatabaseManager::connect(&config.database)?;
            manager.migrate_with_retry(&config.database).await?;

            let session = SessionContext::from_config(&config.database);
            session.install_policies(manager.pool()).await?;
            Ok(Arc::new(PgStore::new(manager.pool().clone(), session)))
        }
    }
}
