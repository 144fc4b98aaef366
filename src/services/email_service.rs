// src/services/email_service.rs

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailSettings;

// Dados mínimos para o e-mail de convite
pub struct InviteEmail<'a> {
    pub to_email: &'a str,
    pub full_name: Option<&'a str>,
    pub company_name: &'a str,
    pub invite_code: &'a str,
    pub accept_url: &'a str,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailSettings,
}

impl EmailService {
    pub fn new(config: EmailSettings) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Nunca falha: o convite existe mesmo que o e-mail não saia.
    pub async fn send_invite(&self, invite: &InviteEmail<'_>) {
        if !self.is_enabled() {
            tracing::warn!(to = %invite.to_email, "SMTP não configurado, e-mail de convite ignorado");
            return;
        }

        let subject = format!("Convite para o programa de bem-estar da {}", invite.company_name);
        let text_body = render_invite_text(invite);
        let html_body = render_invite_html(invite);

        if let Err(e) = self.send_email(invite.to_email, &subject, &html_body, &text_body).await {
            tracing::error!(to = %invite.to_email, error = %e, "Falha ao enviar e-mail de convite");
        }
    }

    async fn send_email(&self, to_email: &str, subject: &str, html_body: &str, text_body: &str) -> anyhow::Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST não configurado"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("EMAIL_FROM_ADDRESS não configurado"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => mailer.credentials(Credentials::new(username.clone(), password.clone())),
            _ => mailer,
        };

        mailer.build().send(email).await?;

        tracing::info!(to = %to_email, subject = %subject, "E-mail enviado");
        Ok(())
    }
}

fn greeting(full_name: Option<&str>) -> String {
    match full_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Olá {},", name),
        None => "Olá,".to_string(),
    }
}

fn render_invite_text(invite: &InviteEmail<'_>) -> String {
    format!(
        "{}\n\n\
         A {} convidou-o(a) a aderir ao programa de bem-estar.\n\n\
         Código do convite: {}\n\
         Aceite o convite em: {}\n\n\
         O convite é válido até {}.\n",
        greeting(invite.full_name),
        invite.company_name,
        invite.invite_code,
        invite.accept_url,
        invite.expires_at.format("%d/%m/%Y"),
    )
}

fn render_invite_html(invite: &InviteEmail<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Convite</title></head>
<body style="font-family: Arial, sans-serif; color: #374151;">
  <p>{greeting}</p>
  <p>A <strong>{company}</strong> convidou-o(a) a aderir ao programa de bem-estar.</p>
  <p>Código do convite: <strong style="letter-spacing: 2px;">{code}</strong></p>
  <p><a href="{url}" style="background:#2563eb;color:#fff;padding:10px 18px;border-radius:6px;text-decoration:none;">Aceitar convite</a></p>
  <p style="font-size: 12px; color: #6b7280;">O convite é válido até {expires}.</p>
</body>
</html>"#,
        greeting = html_escape(&greeting(invite.full_name)),
        company = html_escape(invite.company_name),
        code = invite.invite_code,
        url = html_escape(invite.accept_url),
        expires = invite.expires_at.format("%d/%m/%Y"),
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn invite<'a>(name: Option<&'a str>, company: &'a str) -> InviteEmail<'a> {
        InviteEmail {
            to_email: "ana@acme.pt",
            full_name: name,
            company_name: company,
            invite_code: "K7MPQ2XH",
            accept_url: "http://localhost:5173/convite/K7MPQ2XH",
            expires_at: Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn text_body_has_code_link_and_expiry() {
        let body = render_invite_text(&invite(Some("Ana"), "Acme"));
        assert!(body.starts_with("Olá Ana,"));
        assert!(body.contains("K7MPQ2XH"));
        assert!(body.contains("http://localhost:5173/convite/K7MPQ2XH"));
        assert!(body.contains("09/03/2026"));
    }

    #[test]
    fn html_body_escapes_company_name() {
        let body = render_invite_html(&invite(None, "Silva & Filhos <Lda>"));
        assert!(body.contains("Silva &amp; Filhos &lt;Lda&gt;"));
        assert!(body.contains("<p>Olá,</p>"));
    }

    #[tokio::test]
    async fn unconfigured_service_skips_silently() {
        let service = EmailService::new(EmailSettings::default());
        assert!(!service.is_enabled());
        service.send_invite(&invite(Some("Ana"), "Acme")).await;
    }
}
