use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::ports::{
    BillingRepository, CatalogRuleRepository, DriftRepository, InMemoryStore,
    ScheduledAuditRepository, ShopRepository, SnapshotRepository, TextGenerator,
};
use domain::services::{AuditScheduler, BillingGate, DriftDetector, RuleStore};
use persistence::repositories::{
    PgBillingRepository, PgCatalogRuleRepository, PgDriftRepository, PgScheduledAuditRepository,
    PgShopRepository, PgSnapshotRepository,
};
use shared::time::{Clock, SystemClock};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_cron_secret, security_headers_middleware,
    trace_id, CronAuth, SecurityHeaders,
};
use crate::routes::{ai, billing, cron, drifts, health, rules, scans, schedules};
use crate::services::{CollaboratorError, Collaborators};

/// Repository set the services are built over.
#[derive(Clone)]
pub struct Repositories {
    pub shops: Arc<dyn ShopRepository>,
    pub rules: Arc<dyn CatalogRuleRepository>,
    pub drifts: Arc<dyn DriftRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub schedules: Arc<dyn ScheduledAuditRepository>,
    pub billing: Arc<dyn BillingRepository>,
}

impl Repositories {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            shops: Arc::new(PgShopRepository::new(pool.clone())),
            rules: Arc::new(PgCatalogRuleRepository::new(pool.clone())),
            drifts: Arc::new(PgDriftRepository::new(pool.clone())),
            snapshots: Arc::new(PgSnapshotRepository::new(pool.clone())),
            schedules: Arc::new(PgScheduledAuditRepository::new(pool.clone())),
            billing: Arc::new(PgBillingRepository::new(pool.clone())),
        }
    }

    pub fn in_memory(store: &InMemoryStore) -> Self {
        Self {
            shops: Arc::new(store.clone()),
            rules: Arc::new(store.clone()),
            drifts: Arc::new(store.clone()),
            snapshots: Arc::new(store.clone()),
            schedules: Arc::new(store.clone()),
            billing: Arc::new(store.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Present when backed by Postgres. Readiness checks it.
    pub pool: Option<PgPool>,
    pub rules: RuleStore,
    pub detector: DriftDetector,
    pub scheduler: AuditScheduler,
    pub billing: BillingGate,
    pub text_generator: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: Option<PgPool>,
        repos: Repositories,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rules = RuleStore::new(repos.rules.clone());

        let detector = DriftDetector::new(
            repos.shops.clone(),
            repos.rules.clone(),
            repos.drifts.clone(),
            repos.snapshots.clone(),
            collaborators.catalog.clone(),
            clock.clone(),
        )
        .with_dedup(config.drift.dedup_open_drifts);

        let scheduler = AuditScheduler::new(
            repos.schedules.clone(),
            repos.shops.clone(),
            repos.snapshots.clone(),
            collaborators.reports.clone(),
            collaborators.notifications.clone(),
            clock.clone(),
        )
        .with_run_timeout(Duration::from_secs(config.scheduler.run_timeout_secs));

        let billing = BillingGate::new(
            config.billing_config(),
            repos.billing.clone(),
            clock,
        );

        Self {
            config: Arc::new(config),
            pool,
            rules,
            detector,
            scheduler,
            billing,
            text_generator: collaborators.text_generator,
        }
    }

    /// Production state over Postgres and the configured collaborators.
    pub fn postgres(config: Config, pool: PgPool) -> Result<Self, CollaboratorError> {
        let collaborators = Collaborators::from_config(&config)?;
        let repos = Repositories::postgres(&pool);
        Ok(Self::new(config, Some(pool), repos, collaborators, Arc::new(SystemClock)))
    }
}

pub fn create_app_with_state(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let catalog_routes = Router::new()
        .route("/api/v1/rule-kinds", get(rules::list_rule_kinds))
        .route("/api/v1/rule-templates", get(rules::list_templates));

    let shop_routes = Router::new()
        // Custom rules
        .route(
            "/api/v1/shops/:shop_id/rules",
            get(rules::list_rules).post(rules::create_rule),
        )
        .route(
            "/api/v1/shops/:shop_id/rules/:rule_id",
            get(rules::get_rule)
                .patch(rules::update_rule)
                .delete(rules::delete_rule),
        )
        .route(
            "/api/v1/shops/:shop_id/rules/:rule_id/toggle",
            post(rules::toggle_rule),
        )
        .route(
            "/api/v1/shops/:shop_id/rule-templates/:template",
            post(rules::apply_template),
        )
        // Scans and drifts
        .route(
            "/api/v1/shops/:shop_id/products/:product_id/scan",
            post(scans::scan_product),
        )
        .route(
            "/api/v1/shops/:shop_id/products/:product_id/drifts/resolve",
            post(drifts::resolve_all_for_product),
        )
        .route("/api/v1/shops/:shop_id/drifts", get(drifts::list_unresolved))
        .route(
            "/api/v1/shops/:shop_id/drifts/summary",
            get(drifts::drift_summary),
        )
        .route(
            "/api/v1/shops/:shop_id/drifts/:drift_id/resolve",
            post(drifts::resolve_drift),
        )
        // Schedule
        .route(
            "/api/v1/shops/:shop_id/schedule",
            get(schedules::get_schedule).put(schedules::upsert_schedule),
        )
        // Billing
        .route("/api/v1/shops/:shop_id/billing", get(billing::billing_status))
        .route(
            "/api/v1/shops/:shop_id/billing/enforce",
            get(billing::enforce),
        )
        .route(
            "/api/v1/shops/:shop_id/billing/credits/consume",
            post(billing::consume_credit),
        )
        .route(
            "/api/v1/shops/:shop_id/billing/audits",
            get(billing::check_audit_limit),
        )
        .route(
            "/api/v1/shops/:shop_id/billing/audits/increment",
            post(billing::increment_audit_count),
        )
        // AI
        .route("/api/v1/shops/:shop_id/ai/generate", post(ai::generate_content));

    let webhook_routes =
        Router::new().route("/api/v1/webhooks/products", post(scans::product_webhook));

    // Cron routes (require the shared cron secret)
    let cron_routes = Router::new()
        .route("/api/cron/scheduled-audits", post(cron::run_scheduled_audits))
        .route_layer(middleware::from_fn_with_state(
            CronAuth::from_config(&config),
            require_cron_secret,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let security_headers = SecurityHeaders {
        hsts_enabled: config.security.hsts_enabled,
    };

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(catalog_routes)
        .merge(shop_routes)
        .merge(webhook_routes)
        .merge(cron_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            security_headers,
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
