// src/services/export_service.rs

use anyhow::Context;
use serde::Serialize;

/// Serializa linhas planas em CSV com cabeçalho (derivado dos nomes dos campos).
/// Sem linhas, o resultado é vazio.
pub fn to_csv<T: Serialize>(rows: &[T]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Falha ao serializar linha do CSV")?;
    }
    writer.flush().context("Falha ao finalizar o CSV")?;
    writer.into_inner().map_err(|e| anyhow::anyhow!("Falha ao finalizar o CSV: {}", e.error()))
}
