use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{AppointmentFilter, AppointmentStore, Directory, StoreError};
use crate::models::{
    Actor, Appointment, AppointmentStatus, InsuranceProvider, Patient, Professional, Role,
};
use crate::session::SessionProvider;

/// Timestamps are stored as ISO-8601 text so range filters compare lexically.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const APPOINTMENT_COLUMNS: &str = "id, professional_id, patient_id, start_at, duration_minutes, \
     status, reason, notes, insurance_provider_id, affiliate_number, authorization_code, \
     created_at, updated_at";

/// SQLite-backed store. One connection, serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path and run migrations
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=DELETE;
             PRAGMA foreign_keys=ON;",
        )?;
        run_migrations(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn insert_professional(&self, professional: &Professional) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO professionals (id, name, specialty, active) VALUES (?1, ?2, ?3, ?4)",
            params![
                professional.id.to_string(),
                professional.name,
                professional.specialty,
                professional.active,
            ],
        )?;
        Ok(())
    }

    pub fn insert_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO patients (id, full_name, document_number, insurance_provider_id, affiliate_number)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                patient.id.to_string(),
                patient.full_name,
                patient.document_number,
                patient.insurance_provider_id.map(|id| id.to_string()),
                patient.affiliate_number,
            ],
        )?;
        Ok(())
    }

    pub fn insert_insurance_provider(&self, provider: &InsuranceProvider) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO insurance_providers (id, name, code, active) VALUES (?1, ?2, ?3, ?4)",
            params![provider.id.to_string(), provider.name, provider.code, provider.active],
        )?;
        Ok(())
    }

    /// Record a session, as the external login service does.
    pub fn insert_session(
        &self,
        token: &str,
        actor: &Actor,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO sessions (token, user_id, display_name, role, professional_id, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token,
                actor.user_id.to_string(),
                actor.display_name,
                actor.role.name(),
                actor.professional_id.map(|id| id.to_string()),
                format_timestamp(expires_at),
            ],
        )?;
        Ok(())
    }
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_sessions.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn optional_uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn row_to_appointment(row: &Row) -> rusqlite::Result<Appointment> {
    let status_text: String = row.get(5)?;
    let status = AppointmentStatus::from_string(&status_text).map_err(|_| {
        conversion_error(
            5,
            StoreError::Corrupt {
                field: "status",
                value: status_text.clone(),
            },
        )
    })?;

    Ok(Appointment {
        id: uuid_at(row, 0)?,
        professional_id: uuid_at(row, 1)?,
        patient_id: optional_uuid_at(row, 2)?,
        start: timestamp_at(row, 3)?,
        duration_minutes: row.get(4)?,
        status,
        reason: row.get(6)?,
        notes: row.get(7)?,
        insurance_provider_id: optional_uuid_at(row, 8)?,
        affiliate_number: row.get(9)?,
        authorization_code: row.get(10)?,
        created_at: timestamp_at(row, 11)?,
        updated_at: timestamp_at(row, 12)?,
    })
}

fn row_to_professional(row: &Row) -> rusqlite::Result<Professional> {
    Ok(Professional {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        active: row.get(3)?,
    })
}

fn row_to_insurance_provider(row: &Row) -> rusqlite::Result<InsuranceProvider> {
    Ok(InsuranceProvider {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        active: row.get(3)?,
    })
}

impl AppointmentStore for SqliteStore {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.conn()?.execute(
            &format!(
                "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                appointment.id.to_string(),
                appointment.professional_id.to_string(),
                appointment.patient_id.map(|id| id.to_string()),
                format_timestamp(appointment.start),
                appointment.duration_minutes,
                appointment.status.name(),
                appointment.reason,
                appointment.notes,
                appointment.insurance_provider_id.map(|id| id.to_string()),
                appointment.affiliate_number,
                appointment.authorization_code,
                format_timestamp(appointment.created_at),
                format_timestamp(appointment.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let conn = self.conn()?;
        let appointment = conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
                params![id.to_string()],
                row_to_appointment,
            )
            .optional()?;
        Ok(appointment)
    }

    fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1 = 1");
        let mut values: Vec<String> = Vec::new();

        if let Some(id) = filter.professional_id {
            sql.push_str(" AND professional_id = ?");
            values.push(id.to_string());
        }
        if let Some(id) = filter.patient_id {
            sql.push_str(" AND patient_id = ?");
            values.push(id.to_string());
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND start_at >= ?");
            values.push(format_timestamp(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND start_at < ?");
            values.push(format_timestamp(to));
        }
        if let Some(statuses) = &filter.statuses {
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
            values.extend(statuses.iter().map(|s| s.name().to_string()));
        }
        sql.push_str(" ORDER BY start_at");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_appointment)?;
        rows.map(|r| r.map_err(StoreError::from)).collect()
    }

    fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE appointments SET professional_id = ?2, patient_id = ?3, start_at = ?4,
                 duration_minutes = ?5, status = ?6, reason = ?7, notes = ?8,
                 insurance_provider_id = ?9, affiliate_number = ?10, authorization_code = ?11,
                 updated_at = ?12
             WHERE id = ?1",
            params![
                appointment.id.to_string(),
                appointment.professional_id.to_string(),
                appointment.patient_id.map(|id| id.to_string()),
                format_timestamp(appointment.start),
                appointment.duration_minutes,
                appointment.status.name(),
                appointment.reason,
                appointment.notes,
                appointment.insurance_provider_id.map(|id| id.to_string()),
                appointment.affiliate_number,
                appointment.authorization_code,
                format_timestamp(appointment.updated_at),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity_type: "appointment",
                id: appointment.id,
            });
        }
        Ok(())
    }
}

impl Directory for SqliteStore {
    fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, StoreError> {
        let conn = self.conn()?;
        let professional = conn
            .query_row(
                "SELECT id, name, specialty, active FROM professionals WHERE id = ?1",
                params![id.to_string()],
                row_to_professional,
            )
            .optional()?;
        Ok(professional)
    }

    fn list_professionals(&self, include_inactive: bool) -> Result<Vec<Professional>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, specialty, active FROM professionals
             WHERE active = 1 OR ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![include_inactive], row_to_professional)?;
        rows.map(|r| r.map_err(StoreError::from)).collect()
    }

    fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        let conn = self.conn()?;
        let patient = conn
            .query_row(
                "SELECT id, full_name, document_number, insurance_provider_id, affiliate_number
                 FROM patients WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(Patient {
                        id: uuid_at(row, 0)?,
                        full_name: row.get(1)?,
                        document_number: row.get(2)?,
                        insurance_provider_id: optional_uuid_at(row, 3)?,
                        affiliate_number: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(patient)
    }

    fn get_insurance_provider(&self, id: Uuid) -> Result<Option<InsuranceProvider>, StoreError> {
        let conn = self.conn()?;
        let provider = conn
            .query_row(
                "SELECT id, name, code, active FROM insurance_providers WHERE id = ?1",
                params![id.to_string()],
                row_to_insurance_provider,
            )
            .optional()?;
        Ok(provider)
    }

    fn list_insurance_providers(&self) -> Result<Vec<InsuranceProvider>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, code, active FROM insurance_providers ORDER BY name")?;
        let rows = stmt.query_map([], row_to_insurance_provider)?;
        rows.map(|r| r.map_err(StoreError::from)).collect()
    }
}

impl SessionProvider for SqliteStore {
    fn resolve(&self, token: &str, now: NaiveDateTime) -> Result<Option<Actor>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT user_id, display_name, role, professional_id FROM sessions
                 WHERE token = ?1 AND expires_at > ?2",
                params![token, format_timestamp(now)],
                |row| {
                    Ok((
                        uuid_at(row, 0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        optional_uuid_at(row, 3)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, display_name, role, professional_id)) = row else {
            return Ok(None);
        };
        let role = Role::from_string(&role).map_err(|_| StoreError::Corrupt {
            field: "role",
            value: role.clone(),
        })?;

        Ok(Some(Actor {
            user_id,
            display_name,
            role,
            professional_id,
        }))
    }
}
