pub mod assessment_service;
pub mod audit_service;
pub mod auth;
pub mod booking_service;
pub mod case_service;
pub mod change_request_service;
pub mod chat_service;
pub mod company_service;
pub mod document_service;
pub mod email_service;
pub mod hr_service;
pub mod invite_service;
pub mod prestador_service;
pub mod report_service;
pub mod session_service;
pub mod user_service;
