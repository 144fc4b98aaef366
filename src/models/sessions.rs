// src/models/sessions.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "allocation_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AllocationType {
    Company,
    Personal,
}

impl AllocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationType::Company => "company",
            AllocationType::Personal => "personal",
        }
    }
}

// ---
// Linha do livro de alocações. Nunca é alterada em quantidade:
// cada ajuste desativa a linha ativa e insere uma nova.
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionAllocation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub allocation_type: AllocationType,
    #[schema(example = 8)]
    pub sessions_allocated: i32,
    #[schema(example = 3)]
    pub sessions_used: i32,
    pub is_active: bool,
    pub previous_allocation_id: Option<Uuid>,
    #[schema(example = "booking_completed")]
    pub reason: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl SessionAllocation {
    pub fn remaining(&self) -> i32 {
        (self.sessions_allocated - self.sessions_used).max(0)
    }
}

// Registo de consumo associado a uma marcação concluída
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionUsage {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub allocation_id: Uuid,
    pub allocation_type: AllocationType,
    pub company_id: Option<Uuid>,
    pub used_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceLine {
    pub allocated: i32,
    pub used: i32,
    pub remaining: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionBalance {
    pub company: BalanceLine,
    pub personal: BalanceLine,
    pub total_remaining: i32,
}

impl SessionBalance {
    /// Soma apenas as alocações ativas.
    pub fn from_allocations(allocations: &[SessionAllocation]) -> Self {
        let mut balance = SessionBalance::default();
        for allocation in allocations.iter().filter(|a| a.is_active) {
            let line = match allocation.allocation_type {
                AllocationType::Company => &mut balance.company,
                AllocationType::Personal => &mut balance.personal,
            };
            line.allocated += allocation.sessions_allocated;
            line.used += allocation.sessions_used;
            line.remaining += allocation.remaining();
        }
        balance.total_remaining = balance.company.remaining + balance.personal.remaining;
        balance
    }
}

/// Escolhe de onde sai a sessão: primeiro a alocação da empresa, depois a pessoal.
pub fn pick_allocation_for_deduction(allocations: &[SessionAllocation]) -> Option<&SessionAllocation> {
    [AllocationType::Company, AllocationType::Personal]
        .into_iter()
        .find_map(|kind| {
            allocations
                .iter()
                .find(|a| a.is_active && a.allocation_type == kind && a.remaining() > 0)
        })
}

// HR ajusta só `company`; admin pode mexer nas duas
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetAllocationPayload {
    #[serde(default = "default_allocation_type")]
    pub allocation_type: AllocationType,
    #[validate(range(min = 0, max = 1000, message = "Valor de sessões inválido."))]
    #[schema(example = 10)]
    pub sessions_allocated: i32,
    pub reason: Option<String>,
}

fn default_allocation_type() -> AllocationType {
    AllocationType::Company
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn allocation(kind: AllocationType, allocated: i32, used: i32, active: bool) -> SessionAllocation {
        SessionAllocation {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            company_id: None,
            allocation_type: kind,
            sessions_allocated: allocated,
            sessions_used: used,
            is_active: active,
            previous_allocation_id: None,
            reason: "test".into(),
            created_by: None,
            created_at: Utc::now(),
            deactivated_at: None,
        }
    }

    #[test]
    fn company_allocation_is_preferred() {
        let allocations = vec![
            allocation(AllocationType::Personal, 5, 0, true),
            allocation(AllocationType::Company, 4, 1, true),
        ];
        let picked = pick_allocation_for_deduction(&allocations).unwrap();
        assert_eq!(picked.allocation_type, AllocationType::Company);
    }

    #[test]
    fn falls_back_to_personal_when_company_exhausted() {
        let allocations = vec![
            allocation(AllocationType::Company, 4, 4, true),
            allocation(AllocationType::Personal, 2, 1, true),
        ];
        let picked = pick_allocation_for_deduction(&allocations).unwrap();
        assert_eq!(picked.allocation_type, AllocationType::Personal);
    }

    #[test]
    fn inactive_rows_are_ignored() {
        let allocations = vec![
            allocation(AllocationType::Company, 10, 0, false),
            allocation(AllocationType::Company, 3, 3, true),
        ];
        assert!(pick_allocation_for_deduction(&allocations).is_none());
    }

    #[test]
    fn balance_sums_active_rows_only() {
        let allocations = vec![
            allocation(AllocationType::Company, 10, 2, false),
            allocation(AllocationType::Company, 10, 3, true),
            allocation(AllocationType::Personal, 2, 0, true),
        ];
        let balance = SessionBalance::from_allocations(&allocations);
        assert_eq!(balance.company.allocated, 10);
        assert_eq!(balance.company.remaining, 7);
        assert_eq!(balance.personal.remaining, 2);
        assert_eq!(balance.total_remaining, 9);
    }

    #[test]
    fn overused_allocation_has_no_remaining() {
        // Redução da alocação abaixo do já consumido
        let a = allocation(AllocationType::Company, 2, 5, true);
        assert_eq!(a.remaining(), 0);
    }
}
