use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One reconciled business-card contact.
///
/// All fields are text; `exchange_date` holds the canonical `YYYY-MM-DD`
/// rendering when the source cell parsed, or the raw cell text verbatim
/// when it did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub organization: String,
    pub person_name: String,
    pub department: String,
    pub position: String,
    pub email: String,
    pub postal_code: String,
    pub organization_address: String,
    pub organization_phone: String,
    pub organization_fax: String,
    pub mobile_phone: String,
    pub exchange_date: String,
    pub group_tag: String,
    pub note: String,
}

impl ContactRecord {
    /// Composite identity key. No two stored records share this triple.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.organization, &self.person_name, &self.department)
    }
}

// ============================================================================
// STORE ERRORS
// ============================================================================

/// Errors surfaced by the contact store.
///
/// `DuplicateKey` and `NotFound` are unreachable when the reconciler's
/// branching is correct; seeing one means a logic defect and the run
/// treats it as fatal.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate identity key: {organization} / {person_name} / {department}")]
    DuplicateKey {
        organization: String,
        person_name: String,
        department: String,
    },

    #[error("no record for identity key: {organization} / {person_name} / {department}")]
    NotFound {
        organization: String,
        person_name: String,
        department: String,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

// ============================================================================
// CONTACT STORE
// ============================================================================

/// Keyed persistent table of contacts, backed by SQLite.
///
/// Opened once per run; the table is created on first use. The store
/// persists across runs, which is what makes re-imports idempotent.
pub struct ContactStore {
    conn: Connection,
}

impl ContactStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::setup(&conn)?;
        Ok(ContactStore { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::setup(&conn)?;
        Ok(ContactStore { conn })
    }

    fn setup(conn: &Connection) -> Result<(), StoreError> {
        // WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // "group" is a reserved word and stays quoted in every statement.
        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS contacts (
                organization TEXT NOT NULL,
                person_name TEXT NOT NULL,
                department TEXT NOT NULL,
                position TEXT NOT NULL,
                email TEXT NOT NULL,
                postal_code TEXT NOT NULL,
                organization_address TEXT NOT NULL,
                organization_phone TEXT NOT NULL,
                organization_fax TEXT NOT NULL,
                mobile_phone TEXT NOT NULL,
                exchange_date TEXT NOT NULL,
                "group" TEXT NOT NULL,
                note TEXT NOT NULL,
                PRIMARY KEY (organization, person_name, department)
            )"#,
            [],
        )?;

        Ok(())
    }

    /// Stored exchange date for an identity key, or `None` when absent.
    pub fn lookup(
        &self,
        organization: &str,
        person_name: &str,
        department: &str,
    ) -> Result<Option<String>, StoreError> {
        let date = self
            .conn
            .query_row(
                "SELECT exchange_date FROM contacts
                 WHERE organization = ?1 AND person_name = ?2 AND department = ?3",
                params![organization, person_name, department],
                |row| row.get(0),
            )
            .optional()?;

        Ok(date)
    }

    /// Insert a brand-new record. Fails with `DuplicateKey` when the
    /// identity key already exists.
    pub fn insert(&self, record: &ContactRecord) -> Result<(), StoreError> {
        let result = self.conn.execute(
            r#"INSERT INTO contacts (
                organization, person_name, department, position, email,
                postal_code, organization_address, organization_phone,
                organization_fax, mobile_phone, exchange_date, "group", note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                record.organization,
                record.person_name,
                record.department,
                record.position,
                record.email,
                record.postal_code,
                record.organization_address,
                record.organization_phone,
                record.organization_fax,
                record.mobile_phone,
                record.exchange_date,
                record.group_tag,
                record.note,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey {
                    organization: record.organization.clone(),
                    person_name: record.person_name.clone(),
                    department: record.department.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite all non-key fields of the record matching the identity
    /// key. Fails with `NotFound` when no such record exists.
    pub fn update(&self, record: &ContactRecord) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            r#"UPDATE contacts SET
                position = ?1, email = ?2, postal_code = ?3,
                organization_address = ?4, organization_phone = ?5,
                organization_fax = ?6, mobile_phone = ?7,
                exchange_date = ?8, "group" = ?9, note = ?10
            WHERE organization = ?11 AND person_name = ?12 AND department = ?13"#,
            params![
                record.position,
                record.email,
                record.postal_code,
                record.organization_address,
                record.organization_phone,
                record.organization_fax,
                record.mobile_phone,
                record.exchange_date,
                record.group_tag,
                record.note,
                record.organization,
                record.person_name,
                record.department,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                organization: record.organization.clone(),
                person_name: record.person_name.clone(),
                department: record.department.clone(),
            });
        }

        Ok(())
    }

    /// Every organization currently present, deduplicated, in ascending
    /// lexicographic order.
    pub fn distinct_organizations(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT organization FROM contacts ORDER BY organization")?;

        let organizations = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(organizations)
    }

    /// All records for one organization, in insertion order. Both export
    /// layouts render from one fetch, so they always agree on row order.
    pub fn records_for(&self, organization: &str) -> Result<Vec<ContactRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT organization, person_name, department, position, email,
                      postal_code, organization_address, organization_phone,
                      organization_fax, mobile_phone, exchange_date, "group", note
               FROM contacts
               WHERE organization = ?1
               ORDER BY rowid"#,
        )?;

        let records = stmt
            .query_map([organization], |row| {
                Ok(ContactRecord {
                    organization: row.get(0)?,
                    person_name: row.get(1)?,
                    department: row.get(2)?,
                    position: row.get(3)?,
                    email: row.get(4)?,
                    postal_code: row.get(5)?,
                    organization_address: row.get(6)?,
                    organization_phone: row.get(7)?,
                    organization_fax: row.get(8)?,
                    mobile_phone: row.get(9)?,
                    exchange_date: row.get(10)?,
                    group_tag: row.get(11)?,
                    note: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Total number of stored contacts.
    pub fn count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;

        Ok(count)
    }
}
