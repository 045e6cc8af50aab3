use crate::infrastructure::http::controllers::{attendants, chats, companies, sweep};
use crate::infrastructure::http::middleware::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Attendant registry
        .route(
            "/api/companies/:company_id/attendants",
            get(attendants::list_attendants),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id",
            get(attendants::get_attendant),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id/status",
            put(attendants::set_status),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id/max-chats",
            put(attendants::set_max_chats),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id/heartbeat",
            post(attendants::heartbeat),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id/chats",
            get(attendants::list_attendant_chats),
        )
        .route(
            "/api/companies/:company_id/attendants/:user_id/activity",
            get(attendants::get_activity_log),
        )
        // Chats
        .route(
            "/api/companies/:company_id/chats/:chat_id/inbound",
            post(chats::inbound_message),
        )
        .route("/api/companies/:company_id/queue", get(chats::get_queue))
        .route("/api/chats/:chat_id", get(chats::get_chat))
        .route("/api/chats/:chat_id/outbound", post(chats::outbound_message))
        .route("/api/chats/:chat_id/resolve", post(chats::resolve_chat))
        .route("/api/chats/:chat_id/history", get(chats::get_chat_history))
        // Company settings and dashboard
        .route(
            "/api/companies/:company_id/settings",
            get(companies::get_settings),
        )
        .route(
            "/api/companies/:company_id/strategy",
            put(companies::set_strategy),
        )
        .route("/api/companies/:company_id/active", put(companies::set_active))
        .route(
            "/api/companies/:company_id/metrics",
            get(companies::get_metrics),
        )
        // Sweep
        .route("/api/sweep", post(sweep::run_sweep))
        .route("/api/sweep/last", get(sweep::last_sweep));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Wadesk chat distribution engine"
}

async fn health_handler() -> &'static str {
    "OK"
}
