//src/main.rs

use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

const INVITE_EXPIRY_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,wellness_backend=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState::new(settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    spawn_invite_expiry(app_state.clone());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn app(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let public_invite_routes = Router::new()
        .route("/accept", post(handlers::invites::accept_invite))
        .route("/{code}", get(handlers::invites::preview_invite));

    // Daqui para baixo tudo exige token; o papel é verificado em cada handler
    let me_routes = Router::new()
        .route("/", get(handlers::auth::get_me))
        .route("/sessions", get(handlers::auth::my_sessions))
        .route("/sessions/history", get(handlers::auth::my_session_history));

    let company_routes = Router::new()
        .route(
            "/",
            post(handlers::companies::create_company).get(handlers::companies::list_companies),
        )
        .route(
            "/{id}",
            get(handlers::companies::get_company).patch(handlers::companies::update_company),
        )
        .route("/{id}/status", patch(handlers::companies::set_company_status))
        .route("/{id}/sessions", post(handlers::companies::add_company_sessions));

    let user_routes = Router::new()
        .route("/", post(handlers::users::create_user).get(handlers::users::list_users))
        .route("/{id}", get(handlers::users::get_user).patch(handlers::users::update_user))
        .route(
            "/{id}/sessions",
            get(handlers::users::get_user_sessions).put(handlers::users::set_user_sessions),
        )
        .route("/{id}/sessions/history", get(handlers::users::get_user_session_history));

    let admin_prestador_routes = Router::new()
        .route(
            "/",
            post(handlers::prestadores::create_prestador).get(handlers::prestadores::list_prestadores),
        )
        .route(
            "/{id}",
            get(handlers::prestadores::get_prestador).patch(handlers::prestadores::update_prestador),
        )
        .route("/{id}/status", patch(handlers::prestadores::set_prestador_status));

    let report_routes = Router::new()
        .route("/summary", get(handlers::reports::report_summary))
        .route("/export.csv", get(handlers::reports::export_report_csv))
        .route("/export.pdf", get(handlers::reports::export_report_pdf));

    let admin_routes = Router::new()
        .nest("/companies", company_routes)
        .nest("/users", user_routes)
        .nest("/prestadores", admin_prestador_routes)
        .nest("/reports", report_routes)
        .route("/change-requests", get(handlers::admin::list_change_requests))
        .route("/change-requests/{id}/approve", post(handlers::admin::approve_change_request))
        .route("/change-requests/{id}/reject", post(handlers::admin::reject_change_request))
        .route("/logs", get(handlers::admin::list_admin_logs))
        .route("/feedback", get(handlers::admin::list_feedback))
        .route("/bookings", get(handlers::bookings::list_all_bookings))
        .route("/cases", post(handlers::admin::open_case).get(handlers::admin::list_cases))
        .route("/cases/{id}", get(handlers::admin::get_case).patch(handlers::admin::update_case));

    let prestador_routes = Router::new()
        .route("/me", get(handlers::prestadores::my_prestador_profile))
        .route("/change-requests", post(handlers::prestadores::submit_change_request))
        .route("/bookings", get(handlers::prestadores::my_prestador_bookings))
        .route("/feedback", get(handlers::prestadores::my_prestador_feedback));

    let hr_routes = Router::new()
        .route(
            "/invites",
            get(handlers::invites::list_invites).post(handlers::invites::create_invite),
        )
        .route("/invites/bulk", post(handlers::invites::bulk_invites))
        .route("/invites/template", get(handlers::invites::invite_template))
        .route("/invites/{id}/cancel", post(handlers::invites::cancel_invite))
        .route("/invites/{id}/resend", post(handlers::invites::resend_invite))
        .route("/invites/{id}/letter", get(handlers::invites::invite_letter))
        .route("/employees", get(handlers::hr::list_employees))
        .route("/employees/{id}/sessions", put(handlers::hr::set_employee_sessions))
        .route("/employees/{id}/status", patch(handlers::hr::set_employee_status))
        .route("/adoption", get(handlers::hr::adoption_report));

    let booking_routes = Router::new()
        .route(
            "/",
            post(handlers::bookings::request_session).get(handlers::bookings::list_my_bookings),
        )
        .route("/{id}/status", patch(handlers::bookings::update_booking_status))
        .route("/{id}/feedback", post(handlers::bookings::submit_feedback));

    let assessment_routes = Router::new()
        .route(
            "/",
            post(handlers::assessments::submit_assessment).get(handlers::assessments::list_my_assessments),
        )
        .route("/questionnaires/{pillar}", get(handlers::assessments::get_questionnaire));

    let chat_routes = Router::new()
        .route("/", post(handlers::chat::start_chat).get(handlers::chat::list_chats))
        .route("/{id}", get(handlers::chat::get_chat))
        .route("/{id}/messages", post(handlers::chat::send_message))
        .route("/{id}/escalate", post(handlers::chat::escalate_chat))
        .route("/{id}/close", post(handlers::chat::close_chat));

    let protected_routes = Router::new()
        .nest("/api/me", me_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/prestador", prestador_routes)
        .nest("/api/hr", hr_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/chat", chat_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/invites", public_invite_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

// Marca como expirados os convites pendentes fora de prazo
fn spawn_invite_expiry(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(INVITE_EXPIRY_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = app_state.invite_service.expire_stale().await {
                tracing::error!(error = %e, "Falha ao expirar convites");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Falha ao escutar o sinal de término");
    }
    tracing::info!("Sinal de término recebido, a encerrar o servidor");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // O pool é preguiçoso: nenhuma destas rotas chega a tocar na base de dados
    fn test_app() -> Router {
        let settings = Settings::from_lookup(|key: &str| match key {
            "DATABASE_URL" => Some("postgres://localhost/wellness_test".to_string()),
            "JWT_SECRET" => Some("segredo-de-teste".to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new().connect_lazy(&settings.database_url).unwrap();
        app(AppState::with_pool(pool, settings))
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in ["/api/me", "/api/admin/companies", "/api/hr/employees", "/api/chat"] {
            let response = test_app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn login_rejects_invalid_payload_before_hitting_the_database() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"nao-e-email","password":"123"}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invite_acceptance_validates_before_hitting_the_database() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/invites/accept")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"code":"K7MPQ2XH","password":"123"}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invite_acceptance_documents_the_real_error_statuses() {
        let doc = ApiDoc::openapi();
        let accept = doc.paths.paths["/api/invites/accept"].post.as_ref().unwrap();
        for status in ["400", "404", "409", "410"] {
            assert!(accept.responses.responses.contains_key(status), "{}", status);
        }
    }

    #[test]
    fn openapi_lists_the_main_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/auth/login", "/api/hr/invites", "/api/bookings", "/api/chat/{id}/messages"] {
            assert!(doc.paths.paths.contains_key(path), "{}", path);
        }
    }
}
