//! Contact records and partial updates.

use crate::{new_id, StoreError};
use ringline_types::ContactSnapshot;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONTACT_COLUMNS: &str = "id, business_id, phone, name, email, notes, tags_json";

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: String,
    pub business_id: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl From<Contact> for ContactSnapshot {
    fn from(c: Contact) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            notes: c.notes,
            tags: c.tags,
        }
    }
}

/// Fields to change on a contact. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ContactUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.notes.is_none() && self.tags.is_none()
    }

    /// Names of the fields this update will write, in column order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.name.is_some() {
            names.push("name");
        }
        if self.email.is_some() {
            names.push("email");
        }
        if self.notes.is_some() {
            names.push("notes");
        }
        if self.tags.is_some() {
            names.push("tags");
        }
        names
    }
}

pub fn create_contact(
    conn: &Connection,
    business_id: &str,
    phone: Option<&str>,
    name: Option<&str>,
) -> Result<Contact, StoreError> {
    let id = new_id();
    conn.execute(
        "INSERT INTO contacts (id, business_id, phone, name) VALUES (?1, ?2, ?3, ?4)",
        params![id, business_id, phone, name],
    )?;
    get_contact(conn, business_id, &id)
}

pub fn get_contact(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
) -> Result<Contact, StoreError> {
    conn.query_row(
        &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE business_id = ?1 AND id = ?2"),
        params![business_id, contact_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "contact",
        id: contact_id.to_string(),
    })?
    .into_contact()
}

/// Finds the most recently updated contact with this phone number.
pub fn find_by_phone(
    conn: &Connection,
    business_id: &str,
    phone: &str,
) -> Result<Option<Contact>, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE business_id = ?1 AND phone = ?2
             ORDER BY updated_at DESC LIMIT 1"
        ),
        params![business_id, phone],
        map_row,
    )
    .optional()?
    .map(RawContact::into_contact)
    .transpose()
}

/// Applies a partial update in a single UPDATE statement.
///
/// Only fields that are `Some` are written. Returns the number of rows
/// changed (0 when the contact does not exist or the update is empty).
pub fn update_contact(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
    update: &ContactUpdate,
) -> Result<usize, StoreError> {
    if update.is_empty() {
        return Ok(0);
    }

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &update.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(email) = &update.email {
        set_parts.push(format!("email = ?{}", idx));
        values.push(Box::new(email.clone()));
        idx += 1;
    }
    if let Some(notes) = &update.notes {
        set_parts.push(format!("notes = ?{}", idx));
        values.push(Box::new(notes.clone()));
        idx += 1;
    }
    if let Some(tags) = &update.tags {
        set_parts.push(format!("tags_json = ?{}", idx));
        values.push(Box::new(serde_json::to_string(tags)?));
        idx += 1;
    }

    let sql = format!(
        "UPDATE contacts SET {}, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
         WHERE business_id = ?{} AND id = ?{}",
        set_parts.join(", "),
        idx,
        idx + 1
    );
    values.push(Box::new(business_id.to_string()));
    values.push(Box::new(contact_id.to_string()));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    Ok(conn.execute(&sql, param_refs.as_slice())?)
}

/// Sets the display name only when the contact has none yet.
///
/// Returns `true` if a name was written.
pub fn set_name_if_missing(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
    name: &str,
) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE contacts SET name = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
         WHERE business_id = ?2 AND id = ?3 AND (name IS NULL OR TRIM(name) = '')",
        params![name, business_id, contact_id],
    )?;
    Ok(changed > 0)
}

struct RawContact {
    id: String,
    business_id: String,
    phone: Option<String>,
    name: Option<String>,
    email: Option<String>,
    notes: Option<String>,
    tags_json: String,
}

impl RawContact {
    fn into_contact(self) -> Result<Contact, StoreError> {
        Ok(Contact {
            tags: serde_json::from_str(&self.tags_json)?,
            id: self.id,
            business_id: self.business_id,
            phone: self.phone,
            name: self.name,
            email: self.email,
            notes: self.notes,
        })
    }
}

fn map_row(row: &Row) -> rusqlite::Result<RawContact> {
    Ok(RawContact {
        id: row.get(0)?,
        business_id: row.get(1)?,
        phone: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        notes: row.get(5)?,
        tags_json: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_conn;

    #[test]
    fn email_only_update_leaves_other_fields_alone() {
        let conn = migrated_conn();
        let contact = create_contact(&conn, "biz-1", Some("+15551230000"), Some("Dana")).unwrap();
        update_contact(
            &conn,
            "biz-1",
            &contact.id,
            &ContactUpdate {
                notes: Some("prefers mornings".into()),
                tags: Some(vec!["vip".into()]),
                ..Default::default()
            },
        )
        .unwrap();

        let changed = update_contact(
            &conn,
            "biz-1",
            &contact.id,
            &ContactUpdate {
                email: Some("a@b.com".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(changed, 1);

        let after = get_contact(&conn, "biz-1", &contact.id).unwrap();
        assert_eq!(after.email.as_deref(), Some("a@b.com"));
        assert_eq!(after.name.as_deref(), Some("Dana"));
        assert_eq!(after.notes.as_deref(), Some("prefers mornings"));
        assert_eq!(after.tags, vec!["vip".to_string()]);
    }

    #[test]
    fn update_is_scoped_to_business() {
        let conn = migrated_conn();
        conn.execute("INSERT INTO businesses (id, name) VALUES ('biz-2', 'Other')", [])
            .unwrap();
        let contact = create_contact(&conn, "biz-1", None, None).unwrap();
        let changed = update_contact(
            &conn,
            "biz-2",
            &contact.id,
            &ContactUpdate {
                name: Some("Intruder".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(changed, 0);
        assert!(get_contact(&conn, "biz-1", &contact.id).unwrap().name.is_none());
    }

    #[test]
    fn name_backfill_only_when_missing() {
        let conn = migrated_conn();
        let unnamed = create_contact(&conn, "biz-1", Some("+1555"), None).unwrap();
        let named = create_contact(&conn, "biz-1", Some("+1666"), Some("Lee")).unwrap();

        assert!(set_name_if_missing(&conn, "biz-1", &unnamed.id, "Robin").unwrap());
        assert!(!set_name_if_missing(&conn, "biz-1", &named.id, "Robin").unwrap());

        assert_eq!(
            get_contact(&conn, "biz-1", &unnamed.id).unwrap().name.as_deref(),
            Some("Robin")
        );
        assert_eq!(
            get_contact(&conn, "biz-1", &named.id).unwrap().name.as_deref(),
            Some("Lee")
        );
    }

    #[test]
    fn find_by_phone_matches_within_business() {
        let conn = migrated_conn();
        let contact = create_contact(&conn, "biz-1", Some("+15550001111"), Some("Sam")).unwrap();
        let found = find_by_phone(&conn, "biz-1", "+15550001111").unwrap();
        assert_eq!(found.map(|c| c.id), Some(contact.id));
        assert!(find_by_phone(&conn, "biz-1", "+19999999999").unwrap().is_none());
    }
}
