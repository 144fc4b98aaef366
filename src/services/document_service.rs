// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{
    common::error::AppError,
    models::{invite::Invite, report::ReportSummary},
};

const FONT_FAMILY: &str = "Roboto";

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(fonts_dir: String) -> Self {
        Self { fonts_dir }
    }

    fn new_document(&self, title: &str) -> Result<genpdf::Document, AppError> {
        // Carrega a fonte da pasta configurada (FONTS_DIR)
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None).map_err(|_| {
            AppError::FontNotFound(format!("Fonte '{}' não encontrada em {}", FONT_FAMILY, self.fonts_dir))
        })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(title);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);
        Ok(doc)
    }

    pub fn report_pdf(&self, summary: &ReportSummary) -> Result<Vec<u8>, AppError> {
        let mut doc = self.new_document("Relatório de utilização")?;

        doc.push(elements::Paragraph::new("RELATÓRIO DE UTILIZAÇÃO").styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Paragraph::new(format!("Período: {}", period_label(summary))));
        if let Some(company_id) = summary.company_id {
            doc.push(elements::Paragraph::new(format!("Empresa: {}", company_id)));
        }
        doc.push(elements::Break::new(1.5));

        // --- SESSÕES ---
        let style_bold = style::Style::new().bold();
        doc.push(elements::Paragraph::new("Sessões").styled(style::Style::new().bold().with_font_size(14)));

        let mut table = elements::TableLayout::new(vec![3, 1]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
        table
            .row()
            .element(elements::Paragraph::new("Indicador").styled(style_bold))
            .element(elements::Paragraph::new("Valor").styled(style_bold))
            .push()
            .map_err(pdf_error)?;

        for (label, value) in summary_rows(summary) {
            table
                .row()
                .element(elements::Paragraph::new(label))
                .element(elements::Paragraph::new(value))
                .push()
                .map_err(pdf_error)?;
        }
        doc.push(table);
        doc.push(elements::Break::new(2));

        // --- PILARES ---
        doc.push(elements::Paragraph::new("Sessões por pilar").styled(style::Style::new().bold().with_font_size(14)));
        if summary.by_pillar.is_empty() {
            doc.push(elements::Paragraph::new("Sem marcações no período.").styled(style::Style::new().italic()));
        } else {
            let mut pillars = elements::TableLayout::new(vec![3, 1, 1]);
            pillars.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
            pillars
                .row()
                .element(elements::Paragraph::new("Pilar").styled(style_bold))
                .element(elements::Paragraph::new("Total").styled(style_bold))
                .element(elements::Paragraph::new("%").styled(style_bold))
                .push()
                .map_err(pdf_error)?;

            for share in &summary.by_pillar {
                pillars
                    .row()
                    .element(elements::Paragraph::new(share.pillar.label()))
                    .element(elements::Paragraph::new(share.total.to_string()))
                    .element(elements::Paragraph::new(format!("{}%", share.percentage)))
                    .push()
                    .map_err(pdf_error)?;
            }
            doc.push(pillars);
        }

        render(doc)
    }

    /// Carta de convite com o código e um QR code para o link de aceitação.
    pub fn invite_letter_pdf(&self, invite: &Invite, company_name: &str, accept_url: &str) -> Result<Vec<u8>, AppError> {
        let mut doc = self.new_document(&format!("Convite {}", invite.invite_code))?;

        doc.push(elements::Paragraph::new(company_name.to_string()).styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Paragraph::new("Programa de bem-estar").styled(style::Style::new().with_font_size(12)));
        doc.push(elements::Break::new(2));

        let greeting = match invite.full_name.as_deref() {
            Some(name) => format!("Olá {},", name),
            None => "Olá,".to_string(),
        };
        doc.push(elements::Paragraph::new(greeting));
        doc.push(elements::Paragraph::new(
            "Foi convidado(a) a aderir ao programa de bem-estar da sua empresa.",
        ));
        if invite.sessions_allocated > 0 {
            doc.push(elements::Paragraph::new(format!(
                "Tem {} sessões disponíveis com especialistas.",
                invite.sessions_allocated
            )));
        }
        doc.push(elements::Break::new(1.5));

        let mut code = elements::Paragraph::new(format!("CÓDIGO: {}", invite.invite_code));
        code.set_alignment(genpdf::Alignment::Center);
        doc.push(code.styled(style::Style::new().bold().with_font_size(16)));
        doc.push(elements::Break::new(1));

        // --- QR CODE ---
        let qr = QrCode::new(accept_url.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
        let image_buffer = qr.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);
        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
            .map_err(pdf_error)?
            .with_alignment(genpdf::Alignment::Center)
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new(format!("Ou aceda a: {}", accept_url)).styled(style::Style::new().with_font_size(9)));
        doc.push(
            elements::Paragraph::new(format!("Válido até {}", invite.expires_at.format("%d/%m/%Y")))
                .styled(style::Style::new().italic().with_font_size(8)),
        );

        render(doc)
    }
}

fn render(doc: genpdf::Document) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

fn pdf_error(e: genpdf::error::Error) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn period_label(summary: &ReportSummary) -> String {
    match (summary.from, summary.to) {
        (Some(from), Some(to)) => format!("{} a {}", from.format("%d/%m/%Y"), to.format("%d/%m/%Y")),
        (Some(from), None) => format!("desde {}", from.format("%d/%m/%Y")),
        (None, Some(to)) => format!("até {}", to.format("%d/%m/%Y")),
        (None, None) => "todo o histórico".to_string(),
    }
}

fn summary_rows(summary: &ReportSummary) -> Vec<(&'static str, String)> {
    vec![
        ("Total de marcações", summary.total_bookings.to_string()),
        ("Concluídas", summary.completed.to_string()),
        ("Canceladas", summary.cancelled.to_string()),
        ("Faltas", summary.no_show.to_string()),
        ("Taxa de conclusão", format!("{}%", summary.completion_rate)),
        ("Taxa de cancelamento", format!("{}%", summary.cancellation_rate)),
        ("Empresas ativas", format!("{} / {}", summary.active_companies, summary.total_companies)),
        ("Colaboradores ativos", summary.active_users.to_string()),
        ("Sessões usadas / alocadas", format!("{} / {}", summary.sessions_used, summary.sessions_allocated)),
        ("Taxa de utilização", format!("{}%", summary.utilization_rate)),
        (
            "Avaliação média",
            summary
                .average_rating
                .map(|r| format!("{} ({} avaliações)", r, summary.feedback_count))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn summary() -> ReportSummary {
        ReportSummary {
            from: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            to: None,
            company_id: None,
            total_bookings: 10,
            scheduled: 2,
            confirmed: 1,
            completed: 5,
            cancelled: 1,
            no_show: 1,
            completion_rate: Decimal::new(5000, 2),
            cancellation_rate: Decimal::new(1000, 2),
            no_show_rate: Decimal::new(1000, 2),
            by_pillar: vec![],
            total_companies: 3,
            active_companies: 2,
            active_users: 40,
            sessions_allocated: 100,
            sessions_used: 5,
            utilization_rate: Decimal::new(500, 2),
            average_rating: None,
            feedback_count: 0,
        }
    }

    #[test]
    fn open_ended_period_label() {
        assert_eq!(period_label(&summary()), "desde 01/01/2026");
    }

    #[test]
    fn rows_show_rates_and_missing_rating() {
        let rows = summary_rows(&summary());
        assert!(rows.contains(&("Taxa de conclusão", "50.00%".to_string())));
        assert!(rows.contains(&("Avaliação média", "-".to_string())));
    }

    #[test]
    fn missing_font_is_reported() {
        let service = DocumentService::new("/caminho/que/nao/existe".into());
        let err = service.report_pdf(&summary()).unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
