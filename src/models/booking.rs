// src/models/booking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::pillar::Pillar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

// O que uma transição faz ao saldo de sessões
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    None,
    Deduct,
    Refund,
}

impl BookingStatus {
    /// Estados que ocupam o horário do especialista e uma sessão do colaborador.
    pub const OPEN: [BookingStatus; 2] = [BookingStatus::Scheduled, BookingStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed | Completed | Cancelled | NoShow)
                | (Confirmed, Completed | Cancelled | NoShow)
                | (Completed, Cancelled)
        )
    }

    /// Só a entrada em `completed` consome; só a saída de `completed` devolve.
    pub fn session_effect(&self, next: BookingStatus) -> SessionEffect {
        match (self, next) {
            (BookingStatus::Completed, BookingStatus::Cancelled) => SessionEffect::Refund,
            (from, BookingStatus::Completed) if *from != BookingStatus::Completed => SessionEffect::Deduct,
            _ => SessionEffect::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prestador_id: Uuid,
    pub company_id: Option<Uuid>,
    pub pillar: Pillar,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub session_usage_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Marcação com os nomes já resolvidos, para listagens
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub user_name: String,
    pub prestador_name: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestSessionPayload {
    pub prestador_id: Uuid,
    pub pillar: Pillar,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 2000, message = "As notas são demasiado longas."))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusPayload {
    pub status: BookingStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingFilters {
    pub status: Option<BookingStatus>,
    pub pillar: Option<Pillar>,
    pub company_id: Option<Uuid>,
    pub prestador_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ---
// Feedback
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub prestador_id: Uuid,
    #[schema(example = 5)]
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    #[validate(range(min = 1, max = 5, message = "A avaliação vai de 1 a 5."))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "O comentário é demasiado longo."))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeedbackFilters {
    pub prestador_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn allowed_transitions() {
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Scheduled.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_do_not_move() {
        for next in [Scheduled, Confirmed, Completed, Cancelled, NoShow] {
            assert!(!Cancelled.can_transition_to(next));
            assert!(!NoShow.can_transition_to(next));
        }
        assert!(!Completed.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(NoShow));
        assert!(!Confirmed.can_transition_to(Scheduled));
    }

    #[test]
    fn completion_deducts_and_cancelling_completed_refunds() {
        assert_eq!(Scheduled.session_effect(Completed), SessionEffect::Deduct);
        assert_eq!(Confirmed.session_effect(Completed), SessionEffect::Deduct);
        assert_eq!(Completed.session_effect(Cancelled), SessionEffect::Refund);
        assert_eq!(Scheduled.session_effect(Cancelled), SessionEffect::None);
        assert_eq!(Confirmed.session_effect(NoShow), SessionEffect::None);
        assert_eq!(Completed.session_effect(Completed), SessionEffect::None);
    }
}
