//! Business configuration records.

use crate::StoreError;
use ringline_types::{BusinessConfig, ServiceInfo, WeeklyHours};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Loads the full configuration for a business.
pub fn get_business(conn: &Connection, business_id: &str) -> Result<BusinessConfig, StoreError> {
    let raw = conn
        .query_row(
            "SELECT id, name, phone_number, instructions, voice, language, timezone,
                    hours_json, services_json, knowledge_base
             FROM businesses WHERE id = ?1",
            [business_id],
            map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity: "business",
            id: business_id.to_string(),
        })?;

    let hours: WeeklyHours = serde_json::from_str(&raw.hours_json)?;
    let services: Vec<ServiceInfo> = serde_json::from_str(&raw.services_json)?;

    Ok(BusinessConfig {
        id: raw.id,
        name: raw.name,
        phone_number: raw.phone_number,
        instructions: raw.instructions,
        voice: raw.voice,
        language: raw.language,
        timezone: raw.timezone,
        hours,
        services,
        knowledge_base: raw.knowledge_base,
    })
}

/// Inserts or replaces a business configuration.
pub fn upsert_business(conn: &Connection, business: &BusinessConfig) -> Result<(), StoreError> {
    let hours_json = serde_json::to_string(&business.hours)?;
    let services_json = serde_json::to_string(&business.services)?;
    conn.execute(
        "INSERT INTO businesses (
            id, name, phone_number, instructions, voice, language, timezone,
            hours_json, services_json, knowledge_base
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            phone_number = excluded.phone_number,
            instructions = excluded.instructions,
            voice = excluded.voice,
            language = excluded.language,
            timezone = excluded.timezone,
            hours_json = excluded.hours_json,
            services_json = excluded.services_json,
            knowledge_base = excluded.knowledge_base",
        params![
            business.id,
            business.name,
            business.phone_number,
            business.instructions,
            business.voice,
            business.language,
            business.timezone,
            hours_json,
            services_json,
            business.knowledge_base,
        ],
    )?;
    Ok(())
}

struct RawBusiness {
    id: String,
    name: String,
    phone_number: Option<String>,
    instructions: Option<String>,
    voice: String,
    language: String,
    timezone: String,
    hours_json: String,
    services_json: String,
    knowledge_base: Option<String>,
}

fn map_row(row: &Row) -> rusqlite::Result<RawBusiness> {
    Ok(RawBusiness {
        id: row.get(0)?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        instructions: row.get(3)?,
        voice: row.get(4)?,
        language: row.get(5)?,
        timezone: row.get(6)?,
        hours_json: row.get(7)?,
        services_json: row.get(8)?,
        knowledge_base: row.get(9)?,
    })
}
