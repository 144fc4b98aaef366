// src/models/pillar.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// As quatro áreas de serviço oferecidas aos colaboradores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pillar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    SaudeMental,
    BemEstarFisico,
    AssistenciaFinanceira,
    AssistenciaJuridica,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::SaudeMental,
        Pillar::BemEstarFisico,
        Pillar::AssistenciaFinanceira,
        Pillar::AssistenciaJuridica,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::SaudeMental => "saude_mental",
            Pillar::BemEstarFisico => "bem_estar_fisico",
            Pillar::AssistenciaFinanceira => "assistencia_financeira",
            Pillar::AssistenciaJuridica => "assistencia_juridica",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pillar::SaudeMental => "Saúde Mental",
            Pillar::BemEstarFisico => "Bem-Estar Físico",
            Pillar::AssistenciaFinanceira => "Assistência Financeira",
            Pillar::AssistenciaJuridica => "Assistência Jurídica",
        }
    }
}
