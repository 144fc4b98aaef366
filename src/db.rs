pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod assessment_repo;
pub use assessment_repo::AssessmentRepository;
pub mod booking_repo;
pub use booking_repo::BookingRepository;
pub mod chat_repo;
pub use chat_repo::ChatRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod feedback_repo;
pub use feedback_repo::FeedbackRepository;
pub mod invite_repo;
pub use invite_repo::InviteRepository;
pub mod prestador_repo;
pub use prestador_repo::PrestadorRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
