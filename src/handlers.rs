pub mod admin;
pub mod assessments;
pub mod auth;
pub mod bookings;
pub mod chat;
pub mod companies;
pub mod hr;
pub mod invites;
pub mod prestadores;
pub mod reports;
pub mod users;
