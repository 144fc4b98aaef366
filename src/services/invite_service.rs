// src/services/invite_service.rs

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{profile_repo::NewProfile, CompanyRepository, InviteRepository, ProfileRepository},
    models::{
        auth::{AuthResponse, Profile, UserRole},
        invite::{
            AcceptInvitePayload, BulkInviteReport, BulkInviteRowResult, BulkRowStatus, CreateInvitePayload, Invite,
            InviteFilters, InvitePreview, InviteStatus,
        },
        sessions::AllocationType,
    },
    services::{
        auth::{hash_password, AuthService},
        document_service::DocumentService,
        email_service::{EmailService, InviteEmail},
        session_service::SessionService,
    },
};

// Sem 0/O, 1/I/L: o código é lido e escrito à mão
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 5;
const REASON_INVITE_ACCEPTED: &str = "invite_accepted";

pub const CSV_HEADER: &str = "Nome,Email,Departamento,Cargo,Sessões";

#[derive(Clone)]
pub struct InviteService {
    pool: PgPool,
    repo: InviteRepository,
    company_repo: CompanyRepository,
    profile_repo: ProfileRepository,
    session_service: SessionService,
    auth_service: AuthService,
    email: EmailService,
    documents: DocumentService,
    expiration_days: i64,
    app_base_url: String,
}

impl InviteService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        repo: InviteRepository,
        company_repo: CompanyRepository,
        profile_repo: ProfileRepository,
        session_service: SessionService,
        auth_service: AuthService,
        email: EmailService,
        documents: DocumentService,
        expiration_days: i64,
        app_base_url: String,
    ) -> Self {
        Self {
            pool,
            repo,
            company_repo,
            profile_repo,
            session_service,
            auth_service,
            email,
            documents,
            expiration_days,
            app_base_url,
        }
    }

    pub fn accept_url(&self, code: &str) -> String {
        format!("{}/convite/{}", self.app_base_url.trim_end_matches('/'), code)
    }

    pub async fn create_invite(&self, hr: &Profile, company_id: Uuid, payload: &CreateInvitePayload) -> Result<Invite, AppError> {
        payload.validate()?;

        let company = self.company_repo.find_by_id(&self.pool, company_id).await?;
        if !company.is_active {
            return Err(AppError::CompanyInactive);
        }

        let invite = self.insert_with_fresh_code(hr.id, company_id, payload).await?;
        tracing::info!(invite_id = %invite.id, company_id = %company_id, "Convite criado");

        self.send_invite_email(&invite, &company.name).await;
        Ok(invite)
    }

    /// Cada linha é independente: uma falha não desfaz as anteriores.
    pub async fn bulk_invites(&self, hr: &Profile, company_id: Uuid, csv: &str) -> Result<BulkInviteReport, AppError> {
        let company = self.company_repo.find_by_id(&self.pool, company_id).await?;
        if !company.is_active {
            return Err(AppError::CompanyInactive);
        }

        let parsed = parse_invite_csv(csv);
        if parsed.is_empty() {
            return Err(AppError::BadRequest("O ficheiro CSV não tem linhas.".into()));
        }

        let mut rows = Vec::with_capacity(parsed.len());
        for row in parsed {
            let payload = match row.payload {
                Ok(payload) => payload,
                Err(error) => {
                    rows.push(BulkInviteRowResult {
                        line: row.line,
                        email: row.email,
                        status: BulkRowStatus::Failed,
                        invite_id: None,
                        error: Some(error),
                    });
                    continue;
                }
            };

            match self.insert_with_fresh_code(hr.id, company_id, &payload).await {
                Ok(invite) => {
                    self.send_invite_email(&invite, &company.name).await;
                    rows.push(BulkInviteRowResult {
                        line: row.line,
                        email: Some(invite.email.clone()),
                        status: BulkRowStatus::Created,
                        invite_id: Some(invite.id),
                        error: None,
                    });
                }
                Err(e) => rows.push(BulkInviteRowResult {
                    line: row.line,
                    email: Some(payload.email.clone()),
                    status: BulkRowStatus::Failed,
                    invite_id: None,
                    error: Some(e.to_string()),
                }),
            }
        }

        let report = BulkInviteReport::from_rows(rows);
        tracing::info!(
            company_id = %company_id,
            total = report.total,
            created = report.created,
            failed = report.failed,
            "Importação de convites concluída"
        );
        Ok(report)
    }

    pub async fn list(&self, company_id: Uuid, filters: &InviteFilters) -> Result<Vec<Invite>, AppError> {
        self.repo.list(company_id, filters).await
    }

    pub async fn cancel(&self, company_id: Uuid, id: Uuid) -> Result<Invite, AppError> {
        let invite = self.find_in_company(company_id, id).await?;
        ensure_pending(&invite, InviteStatus::Cancelled)?;

        let invite = self.repo.set_status(&self.pool, id, InviteStatus::Cancelled).await?;
        tracing::info!(invite_id = %id, "Convite cancelado");
        Ok(invite)
    }

    /// Renova o prazo e volta a enviar o e-mail.
    pub async fn resend(&self, company_id: Uuid, id: Uuid) -> Result<Invite, AppError> {
        let invite = self.find_in_company(company_id, id).await?;
        ensure_pending(&invite, InviteStatus::Pending)?;

        let invite = self.repo.renew(&self.pool, id, self.new_expiry()).await?;
        let company = self.company_repo.find_by_id(&self.pool, company_id).await?;
        self.send_invite_email(&invite, &company.name).await;

        tracing::info!(invite_id = %id, expires_at = %invite.expires_at, "Convite reenviado");
        Ok(invite)
    }

    pub async fn invite_letter_pdf(&self, company_id: Uuid, id: Uuid) -> Result<Vec<u8>, AppError> {
        let invite = self.find_in_company(company_id, id).await?;
        let company = self.company_repo.find_by_id(&self.pool, company_id).await?;
        self.documents
            .invite_letter_pdf(&invite, &company.name, &self.accept_url(&invite.invite_code))
    }

    /// Vista pública. Um convite pendente fora do prazo aparece como expirado.
    pub async fn preview(&self, code: &str) -> Result<InvitePreview, AppError> {
        let mut preview = self.repo.preview_by_code(code).await?;
        if preview.status == InviteStatus::Pending && preview.expires_at <= Utc::now() {
            preview.status = InviteStatus::Expired;
        }
        Ok(preview)
    }

    pub async fn accept(&self, payload: &AcceptInvitePayload) -> Result<AuthResponse, AppError> {
        payload.validate()?;

        // bcrypt fora da transação para não segurar locks
        let password_hash = hash_password(&payload.password).await?;

        let mut tx = self.pool.begin().await?;
        let invite = self.repo.find_by_code_for_update(&mut *tx, &payload.code).await?;

        if invite.status != InviteStatus::Pending {
            return Err(AppError::InviteInvalid);
        }
        if invite.is_expired_at(Utc::now()) {
            self.repo.set_status(&mut *tx, invite.id, InviteStatus::Expired).await?;
            tx.commit().await?;
            return Err(AppError::InviteExpired);
        }

        let company = self.company_repo.find_for_update(&mut *tx, invite.company_id).await?;
        if !company.is_active {
            return Err(AppError::CompanyInactive);
        }
        if self.profile_repo.email_exists(&mut *tx, &invite.email).await? {
            return Err(AppError::EmailAlreadyExists);
        }

        let full_name = resolve_full_name(payload.full_name.as_deref(), invite.full_name.as_deref(), &invite.email);
        let profile = self
            .profile_repo
            .create_profile(
                &mut *tx,
                NewProfile {
                    email: &invite.email,
                    password_hash: &password_hash,
                    full_name: &full_name,
                    role: UserRole::User,
                    company_id: Some(invite.company_id),
                    department: invite.department.as_deref(),
                    job_title: invite.job_title.as_deref(),
                },
            )
            .await?;

        if invite.sessions_allocated > 0 {
            self.session_service
                .apply_allocation(
                    &mut *tx,
                    &profile,
                    AllocationType::Company,
                    invite.sessions_allocated,
                    REASON_INVITE_ACCEPTED,
                    invite.invited_by,
                )
                .await?;
        }

        self.repo.mark_accepted(&mut *tx, invite.id, profile.id).await?;
        tx.commit().await?;

        tracing::info!(invite_id = %invite.id, user_id = %profile.id, company_id = %invite.company_id, "Convite aceite");

        let token = self.auth_service.create_token(&profile)?;
        Ok(AuthResponse { token, profile })
    }

    pub async fn expire_stale(&self) -> Result<u64, AppError> {
        let expired = self.repo.expire_stale().await?;
        if expired > 0 {
            tracing::info!(expired = expired, "Convites expirados");
        }
        Ok(expired)
    }

    async fn insert_with_fresh_code(
        &self,
        invited_by: Uuid,
        company_id: Uuid,
        payload: &CreateInvitePayload,
    ) -> Result<Invite, AppError> {
        if self.profile_repo.email_exists(&self.pool, &payload.email).await? {
            return Err(AppError::EmailAlreadyExists);
        }

        let expires_at = self.new_expiry();
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_invite_code();
            match self
                .repo
                .create_invite(&self.pool, company_id, invited_by, payload, &code, expires_at)
                .await?
            {
                Some(invite) => return Ok(invite),
                None => tracing::warn!(attempt = attempt, "Código de convite repetido, a gerar outro"),
            }
        }
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "não foi possível gerar um código de convite único"
        )))
    }

    async fn find_in_company(&self, company_id: Uuid, id: Uuid) -> Result<Invite, AppError> {
        let invite = self.repo.find_by_id(&self.pool, id).await?;
        if invite.company_id != company_id {
            return Err(AppError::NotFound("Convite"));
        }
        Ok(invite)
    }

    async fn send_invite_email(&self, invite: &Invite, company_name: &str) {
        let accept_url = self.accept_url(&invite.invite_code);
        self.email
            .send_invite(&InviteEmail {
                to_email: &invite.email,
                full_name: invite.full_name.as_deref(),
                company_name,
                invite_code: &invite.invite_code,
                accept_url: &accept_url,
                expires_at: invite.expires_at,
            })
            .await;
    }

    fn new_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.expiration_days)
    }
}

pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn template_csv() -> String {
    format!("{}\nAna Silva,ana.silva@empresa.pt,Marketing,Analista,5\n", CSV_HEADER)
}

fn ensure_pending(invite: &Invite, next: InviteStatus) -> Result<(), AppError> {
    if invite.status != InviteStatus::Pending {
        return Err(AppError::InvalidStatusTransition {
            from: invite.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    Ok(())
}

fn resolve_full_name(given: Option<&str>, invited: Option<&str>, email: &str) -> String {
    given
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| invited.map(str::trim).filter(|n| !n.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

// Linha do CSV já interpretada; `line` conta a partir de 1 no ficheiro original
#[derive(Debug)]
pub(crate) struct CsvInviteRow {
    pub line: usize,
    pub email: Option<String>,
    pub payload: Result<CreateInvitePayload, String>,
}

/// `Nome,Email,Departamento,Cargo,Sessões`. Cabeçalho opcional, linhas vazias ignoradas.
pub(crate) fn parse_invite_csv(content: &str) -> Vec<CsvInviteRow> {
    let content = content.trim_start_matches('\u{feff}');
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut first = true;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(clean_field).collect();
        if first {
            first = false;
            if fields.get(1).is_some_and(|f| f.eq_ignore_ascii_case("email")) {
                continue;
            }
        }

        let email = fields.get(1).filter(|e| !e.is_empty()).map(|e| e.to_lowercase());
        let payload = parse_row(&fields).and_then(|payload| {
            if seen.insert(payload.email.clone()) {
                Ok(payload)
            } else {
                Err(format!("E-mail repetido no ficheiro: {}", payload.email))
            }
        });
        rows.push(CsvInviteRow { line, email, payload });
    }
    rows
}

fn parse_row(fields: &[&str]) -> Result<CreateInvitePayload, String> {
    if fields.len() < 2 {
        return Err("A linha precisa de pelo menos Nome e Email.".into());
    }

    let optional = |i: usize| fields.get(i).filter(|v| !v.is_empty()).map(|v| v.to_string());
    let sessions_allocated = match fields.get(4).filter(|v| !v.is_empty()) {
        None => 0,
        Some(value) => value
            .parse::<i32>()
            .map_err(|_| format!("Número de sessões inválido: {}", value))?,
    };

    let payload = CreateInvitePayload {
        email: fields[1].to_lowercase(),
        full_name: optional(0),
        department: optional(2),
        job_title: optional(3),
        sessions_allocated,
    };

    payload.validate().map_err(|errors| {
        errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    })?;
    Ok(payload)
}

fn clean_field(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', '1', 'I', 'L']));
        }
    }

    #[test]
    fn template_parses_back_into_one_invite() {
        let rows = parse_invite_csv(&template_csv());
        assert_eq!(rows.len(), 1);

        let payload = rows[0].payload.as_ref().unwrap();
        assert_eq!(rows[0].line, 2);
        assert_eq!(payload.email, "ana.silva@empresa.pt");
        assert_eq!(payload.full_name.as_deref(), Some("Ana Silva"));
        assert_eq!(payload.department.as_deref(), Some("Marketing"));
        assert_eq!(payload.sessions_allocated, 5);
    }

    #[test]
    fn header_is_optional_and_blank_lines_are_skipped() {
        let csv = "\u{feff}Rui,RUI@acme.pt,,,\n\n\"Eva Costa\",eva@acme.pt,TI,Dev,\n";
        let rows = parse_invite_csv(csv);

        assert_eq!(rows.len(), 2);
        let rui = rows[0].payload.as_ref().unwrap();
        assert_eq!(rui.email, "rui@acme.pt");
        assert_eq!(rui.sessions_allocated, 0);
        assert!(rui.department.is_none());

        assert_eq!(rows[1].line, 3);
        let eva = rows[1].payload.as_ref().unwrap();
        assert_eq!(eva.full_name.as_deref(), Some("Eva Costa"));
        assert_eq!(eva.sessions_allocated, 0);
    }

    #[test]
    fn bad_rows_fail_individually() {
        let csv = format!(
            "{}\nAna,ana@acme.pt,,,3\nSem Email\nBruno,nao-e-email,,,1\nCarla,carla@acme.pt,,,muitas\nAna B,ANA@acme.pt,,,1\n",
            CSV_HEADER
        );
        let rows = parse_invite_csv(&csv);

        assert_eq!(rows.len(), 5);
        assert!(rows[0].payload.is_ok());
        assert!(rows[1].payload.is_err());
        assert_eq!(rows[2].payload.as_ref().unwrap_err(), "O e-mail fornecido é inválido.");
        assert!(rows[3].payload.as_ref().unwrap_err().contains("sessões"));
        assert!(rows[4].payload.as_ref().unwrap_err().contains("repetido"));
        assert_eq!(rows[4].email.as_deref(), Some("ana@acme.pt"));
    }

    #[test]
    fn full_name_falls_back_to_invite_then_email() {
        assert_eq!(resolve_full_name(Some(" Ana "), Some("Outra"), "a@x.pt"), "Ana");
        assert_eq!(resolve_full_name(None, Some("Ana Silva"), "a@x.pt"), "Ana Silva");
        assert_eq!(resolve_full_name(Some(""), None, "ana.silva@x.pt"), "ana.silva");
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    use crate::{
        common::{error::AppError, test_support as fixture},
        models::{
            auth::UserRole,
            invite::{AcceptInvitePayload, BulkRowStatus, InviteStatus},
        },
    };

    #[sqlx::test]
    async fn accepting_an_expired_invite_marks_it_expired(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        sqlx::query(
            r#"
            INSERT INTO invites (company_id, email, invite_code, sessions_allocated, expires_at)
            VALUES ($1, 'ana@acme.pt', 'K7MPQ2XH', 2, $2)
            "#,
        )
        .bind(company.id)
        .bind(Utc::now() - Duration::hours(1))
        .execute(&pool)
        .await
        .unwrap();

        // O código é aceite em minúsculas e com espaços
        let preview = state.invite_service.preview(" k7mpq2xh ").await.unwrap();
        assert_eq!(preview.status, InviteStatus::Expired);

        let payload = AcceptInvitePayload {
            code: "k7mpq2xh".to_string(),
            password: "segredo123".to_string(),
            full_name: None,
        };
        let result = state.invite_service.accept(&payload).await;
        assert!(matches!(result, Err(AppError::InviteExpired)));

        let status: InviteStatus = sqlx::query_scalar("SELECT status FROM invites WHERE invite_code = 'K7MPQ2XH'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, InviteStatus::Expired);

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = 'ana@acme.pt'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(profiles, 0);

        let again = state.invite_service.accept(&payload).await;
        assert!(matches!(again, Err(AppError::InviteInvalid)));
    }

    #[sqlx::test]
    async fn bulk_import_keeps_good_rows_when_one_is_duplicated(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let hr = fixture::profile(&pool, UserRole::Hr, Some(company.id)).await;

        let csv = "Nome,Email,Departamento,Cargo,Sessões\nAna,ana@acme.pt,,,2\nRui,rui@acme.pt,,,\nAna Bis,ANA@acme.pt,,,\n";
        let report = state.invite_service.bulk_invites(&hr, company.id, csv).await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.rows[2].status, BulkRowStatus::Failed);
        assert_eq!(report.rows[2].line, 4);

        // Já existe um convite pendente para o mesmo e-mail
        let report = state
            .invite_service
            .bulk_invites(&hr, company.id, "Rui,rui@acme.pt,,,\nEva,eva@acme.pt,,,\n")
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.rows[0].status, BulkRowStatus::Failed);

        let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invites WHERE company_id = $1 AND status = 'pending'")
            .bind(company.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(pending, 3);
    }
}
