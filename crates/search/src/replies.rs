//! User-facing reply templates.

use mapion_registry::{LookupResult, NormalizedPlate, VehicleRecord};

/// Single-mode reply for input that is not a valid plate.
pub const INVALID_FORMAT: &str = "Placa não está em formato adequado";

pub const NOT_FOUND: &str = "❌❌ Placa não encontrada ❌❌";

pub const LOOKUP_ERROR: &str = "Erro ao consultar API.";

/// Sent when a search session's idle window elapses.
pub const SESSION_EXPIRED: &str =
    "⏰ Sua sessão de consulta expirou.\nEnvie /consultar para iniciar uma nova busca.";

/// Sent in response to the search command.
pub const SEARCH_PROMPT: &str = "🔎 Envie a placa que deseja consultar.";

/// Sent when a message contains no plate tokens at all.
pub const NO_PLATES: &str = "Nenhuma placa informada. Envie /consultar ou uma lista de placas \
                             separadas por vírgula.";

/// Multi-line block for a found plate.
#[must_use]
pub fn found(plate: &NormalizedPlate, record: &VehicleRecord) -> String {
    format!(
        "✅ Placa: {plate}\n🔧 Chassi: {}\n👤 Responsável: {}\n📞 Telefone: {}",
        record.chassis, record.responsible, record.phone
    )
}

/// Reply for a single-mode lookup.
#[must_use]
pub fn single(plate: &NormalizedPlate, result: &LookupResult) -> String {
    match result {
        LookupResult::Found(record) => found(plate, record),
        LookupResult::NotFound => NOT_FOUND.to_string(),
        LookupResult::AuthUnavailable | LookupResult::UpstreamError => LOOKUP_ERROR.to_string(),
    }
}

/// One batch line for a valid plate.
#[must_use]
pub fn batch_line(plate: &NormalizedPlate, result: &LookupResult) -> String {
    match result {
        LookupResult::Found(record) => {
            format!("{plate} → {} ({})", record.responsible, record.phone)
        },
        LookupResult::NotFound => format!("{plate} → não encontrada"),
        LookupResult::AuthUnavailable | LookupResult::UpstreamError => {
            format!("{plate} → erro na consulta")
        },
    }
}

/// One batch line for a token that failed validation; echoes what the user sent.
#[must_use]
pub fn batch_invalid(raw: &str) -> String {
    format!("{} → formato inválido", raw.trim())
}
