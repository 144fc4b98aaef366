// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth / Me ---
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::my_sessions,
        handlers::auth::my_session_history,

        // --- Companies ---
        handlers::companies::create_company,
        handlers::companies::list_companies,
        handlers::companies::get_company,
        handlers::companies::update_company,
        handlers::companies::set_company_status,
        handlers::companies::add_company_sessions,

        // --- Users ---
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::get_user_sessions,
        handlers::users::set_user_sessions,
        handlers::users::get_user_session_history,

        // --- Prestadores ---
        handlers::prestadores::create_prestador,
        handlers::prestadores::list_prestadores,
        handlers::prestadores::get_prestador,
        handlers::prestadores::update_prestador,
        handlers::prestadores::set_prestador_status,
        handlers::prestadores::my_prestador_profile,
        handlers::prestadores::submit_change_request,
        handlers::prestadores::my_prestador_bookings,
        handlers::prestadores::my_prestador_feedback,

        // --- Admin ---
        handlers::admin::list_change_requests,
        handlers::admin::approve_change_request,
        handlers::admin::reject_change_request,
        handlers::admin::list_admin_logs,
        handlers::admin::list_feedback,
        handlers::admin::open_case,
        handlers::admin::list_cases,
        handlers::admin::get_case,
        handlers::admin::update_case,

        // --- Bookings ---
        handlers::bookings::request_session,
        handlers::bookings::list_my_bookings,
        handlers::bookings::update_booking_status,
        handlers::bookings::submit_feedback,
        handlers::bookings::list_all_bookings,

        // --- Invites ---
        handlers::invites::preview_invite,
        handlers::invites::accept_invite,
        handlers::invites::list_invites,
        handlers::invites::create_invite,
        handlers::invites::bulk_invites,
        handlers::invites::invite_template,
        handlers::invites::cancel_invite,
        handlers::invites::resend_invite,
        handlers::invites::invite_letter,

        // --- HR ---
        handlers::hr::list_employees,
        handlers::hr::set_employee_sessions,
        handlers::hr::set_employee_status,
        handlers::hr::adoption_report,

        // --- Reports ---
        handlers::reports::report_summary,
        handlers::reports::export_report_csv,
        handlers::reports::export_report_pdf,

        // --- Assessments ---
        handlers::assessments::get_questionnaire,
        handlers::assessments::submit_assessment,
        handlers::assessments::list_my_assessments,

        // --- Chat ---
        handlers::chat::start_chat,
        handlers::chat::list_chats,
        handlers::chat::get_chat,
        handlers::chat::send_message,
        handlers::chat::escalate_chat,
        handlers::chat::close_chat,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::Profile,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::pillar::Pillar,

            // --- Companies ---
            models::company::Company,
            models::company::CreateCompanyPayload,
            models::company::UpdateCompanyPayload,
            models::company::SetCompanyStatusPayload,
            models::company::AddCompanySessionsPayload,
            models::company::CompanyStatusChange,

            // --- Users / Sessions ---
            models::users::CreateUserPayload,
            models::users::UpdateUserPayload,
            models::users::EmployeeSummary,
            models::users::SetActivePayload,
            models::sessions::AllocationType,
            models::sessions::SessionAllocation,
            models::sessions::SessionUsage,
            models::sessions::BalanceLine,
            models::sessions::SessionBalance,
            models::sessions::SetAllocationPayload,

            // --- Prestadores ---
            models::prestador::Prestador,
            models::prestador::CreatePrestadorPayload,
            models::prestador::UpdatePrestadorPayload,

            // --- Bookings ---
            models::booking::BookingStatus,
            models::booking::Booking,
            models::booking::BookingDetail,
            models::booking::RequestSessionPayload,
            models::booking::UpdateBookingStatusPayload,
            models::booking::Feedback,
            models::booking::FeedbackPayload,

            // --- Invites ---
            models::invite::InviteStatus,
            models::invite::Invite,
            models::invite::CreateInvitePayload,
            models::invite::BulkInvitePayload,
            models::invite::BulkRowStatus,
            models::invite::BulkInviteRowResult,
            models::invite::BulkInviteReport,
            models::invite::AcceptInvitePayload,
            models::invite::InvitePreview,

            // --- Admin ---
            models::admin::AdminLog,
            models::admin::ChangeRequestStatus,
            models::admin::ChangeRequest,
            models::admin::ReviewChangeRequestPayload,
            models::admin::CaseStatus,
            models::admin::CaseRecord,
            models::admin::OpenCasePayload,
            models::admin::UpdateCasePayload,

            // --- Reports ---
            models::report::PillarShare,
            models::report::ReportSummary,
            models::report::AdoptionReport,

            // --- Assessments ---
            models::assessment::AssessmentOutcome,
            models::assessment::AssessmentAnswer,
            models::assessment::QuestionView,
            models::assessment::QuestionnaireView,
            models::assessment::Assessment,
            models::assessment::SubmitAssessmentPayload,
            models::assessment::AssessmentResult,

            // --- Chat ---
            models::chat::ChatStatus,
            models::chat::ChatRole,
            models::chat::ChatSession,
            models::chat::ChatMessage,
            models::chat::ChatTranscript,
            models::chat::StartChatPayload,
            models::chat::SendMessagePayload,
            models::chat::ChatReply,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Me", description = "Dados e saldo de sessões do utilizador autenticado"),
        (name = "Companies", description = "Gestão de empresas clientes"),
        (name = "Users", description = "Gestão de utilizadores e alocação de sessões"),
        (name = "Prestadores", description = "Gestão de especialistas"),
        (name = "Prestador", description = "Autosserviço do especialista"),
        (name = "Admin", description = "Pedidos de alteração, auditoria, avaliações e casos"),
        (name = "Bookings", description = "Marcação de sessões e avaliações"),
        (name = "Invites", description = "Convites de colaboradores"),
        (name = "HR", description = "Gestão de colaboradores pelos RH"),
        (name = "Reports", description = "Indicadores e exportações"),
        (name = "Assessments", description = "Questionários de triagem"),
        (name = "Chat", description = "Assistente virtual")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
