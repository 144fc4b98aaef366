use serde::Deserialize;
use utoipa::IntoParams;

use crate::common::error::AppError;

/// Converte violação de unicidade num erro de domínio; o resto vira `DatabaseError`.
pub(crate) fn map_unique_violation(e: sqlx::Error, on_conflict: AppError) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_conflict;
        }
    }
    AppError::DatabaseError(e)
}

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

// Paginação simples por página/tamanho (?page=1&perPage=50)
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).max(1) - 1) * self.limit()
    }
}

/// Envolve um termo de pesquisa para `ILIKE`.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        let p = Pagination::default();
        assert_eq!(p.limit(), 50);
        assert_eq!(p.offset(), 0);

        let p = Pagination { page: Some(3), per_page: Some(10) };
        assert_eq!(p.offset(), 20);

        let p = Pagination { page: Some(0), per_page: Some(10_000) };
        assert_eq!(p.limit(), 200);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some(" ana ")), Some("%ana%".to_string()));
        assert_eq!(like_pattern(Some("50%")), Some("%50\\%%".to_string()));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
