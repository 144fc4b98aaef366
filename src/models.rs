pub mod admin;
pub mod assessment;
pub mod auth;
pub mod booking;
pub mod chat;
pub mod company;
pub mod invite;
pub mod pillar;
pub mod prestador;
pub mod report;
pub mod sessions;
pub mod users;
