//! SQLite adapter: Implementation of Storage.
//!
//! Provides local persistence for patients, screenings and recommendations.
//!
//! # Schema
//!
//! Screenings and appointments reference patients, recommendations reference
//! both patients and screenings, all with `ON DELETE CASCADE`. Foreign keys are enabled on every connection.
//! Risk levels are stored as "Low"/"Medium"/"High"; timestamps as RFC 3339.
//! Appointment dates use fixed-width nanoseconds with a `Z` suffix so they
//! compare correctly as text.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex surfaces as
//! `StorageError::LockPoisoned` instead of a panic.
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{
    Appointment, Gender, Patient, Recommendation, RecommendationRecord, Screening,
    ScreeningInput,
};
use crate::ports::{
    AppointmentFilter, RecommendationFilter, ScreeningFilter, ScreeningPage, Storage,
};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

const PATIENT_COLUMNS: &str =
    "id, full_name, age, gender, village, phone, registered_by, created_at";

const SCREENING_COLUMNS: &str = r"
    id, patient_id, height_cm, weight_kg, systolic_bp, diastolic_bp, heart_rate,
    smoking_status, alcohol_usage, physical_activity, glucose_level, cholesterol_level,
    risk_score, risk_level, risk_notes, ai_insights, created_at
";

const RECOMMENDATION_COLUMNS: &str =
    "id, patient_id, screening_id, category, title, description, priority, is_completed, created_at";

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, health_worker, scheduled_date, reason, notes, status, created_at, updated_at";

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                village TEXT NOT NULL,
                phone TEXT,
                registered_by TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS screenings (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                height_cm REAL,
                weight_kg REAL,
                systolic_bp INTEGER,
                diastolic_bp INTEGER,
                heart_rate INTEGER,
                smoking_status TEXT,
                alcohol_usage TEXT,
                physical_activity TEXT,
                glucose_level REAL,
                cholesterol_level REAL,
                risk_score INTEGER NOT NULL,
                risk_level TEXT NOT NULL,
                risk_notes TEXT NOT NULL,
                ai_insights TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recommendations (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                screening_id TEXT REFERENCES screenings(id) ON DELETE CASCADE,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                health_worker TEXT NOT NULL,
                scheduled_date TEXT NOT NULL,
                reason TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'scheduled',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_screenings_created
                ON screenings(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_screenings_patient
                ON screenings(patient_id);
            CREATE INDEX IF NOT EXISTS idx_recommendations_patient
                ON recommendations(patient_id);
            CREATE INDEX IF NOT EXISTS idx_appointments_patient
                ON appointments(patient_id, scheduled_date DESC);
            ",
        )?;

        Ok(())
    }
}

/// Parse a text column through `FromStr`, reporting failures as conversion errors.
fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let gender: String = row.get(3)?;
    let created_at: String = row.get(7)?;

    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        age: row.get(2)?,
        gender: parse_column::<Gender>(3, &gender)?,
        village: row.get(4)?,
        phone: row.get(5)?,
        registered_by: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
    })
}

fn screening_from_row(row: &Row<'_>) -> rusqlite::Result<Screening> {
    let smoking_status: Option<String> = row.get(7)?;
    let risk_level: String = row.get(13)?;
    let created_at: String = row.get(16)?;

    let input = ScreeningInput {
        height_cm: row.get(2)?,
        weight_kg: row.get(3)?,
        systolic_bp: row.get(4)?,
        diastolic_bp: row.get(5)?,
        heart_rate: row.get(6)?,
        smoking_status: smoking_status
            .as_deref()
            .map(|s| parse_column(7, s))
            .transpose()?,
        alcohol_usage: row.get(8)?,
        physical_activity: row.get(9)?,
        glucose_level: row.get(10)?,
        cholesterol_level: row.get(11)?,
    };

    Ok(Screening {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        input,
        risk_score: row.get(12)?,
        risk_level: parse_column(13, &risk_level)?,
        risk_notes: row.get(14)?,
        ai_insights: row.get(15)?,
        created_at: parse_timestamp(16, &created_at)?,
    })
}

fn recommendation_from_row(row: &Row<'_>) -> rusqlite::Result<RecommendationRecord> {
    let category: String = row.get(3)?;
    let priority: String = row.get(6)?;
    let created_at: String = row.get(8)?;

    Ok(RecommendationRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        screening_id: row.get(2)?,
        recommendation: Recommendation {
            category: parse_column(3, &category)?,
            title: row.get(4)?,
            description: row.get(5)?,
            priority: parse_column(6, &priority)?,
        },
        is_completed: row.get(7)?,
        created_at: parse_timestamp(8, &created_at)?,
    })
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let scheduled_date: String = row.get(3)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        health_worker: row.get(2)?,
        scheduled_date: parse_timestamp(3, &scheduled_date)?,
        reason: row.get(4)?,
        notes: row.get(5)?,
        status: parse_column(6, &status)?,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

fn sortable_timestamp(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| l as i64)
}

impl Storage for SqliteStorage {
    type Error = StorageError;

    fn save_patient(&self, patient: &Patient) -> Result<(), Self::Error> {
        let conn = self.conn()?;

        conn.execute(
            r"
            INSERT INTO patients (
                id, full_name, age, gender, village, phone, registered_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                patient.id,
                patient.full_name,
                patient.age,
                patient.gender.as_str(),
                patient.village,
                patient.phone,
                patient.registered_by,
                patient.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Saved patient {} to storage", patient.id);
        Ok(())
    }

    fn load_patient(&self, id: &str) -> Result<Option<Patient>, Self::Error> {
        let conn = self.conn()?;

        let patient = conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
                params![id],
                patient_from_row,
            )
            .optional()?;

        Ok(patient)
    }

    fn list_patients(&self, offset: usize, limit: usize) -> Result<Vec<Patient>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;

        let patients = stmt
            .query_map(params![limit as i64, offset as i64], patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    fn update_patient(&self, patient: &Patient) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r"
            UPDATE patients
            SET full_name = ?2, age = ?3, gender = ?4, village = ?5, phone = ?6
            WHERE id = ?1
            ",
            params![
                patient.id,
                patient.full_name,
                patient.age,
                patient.gender.as_str(),
                patient.village,
                patient.phone,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("patient {}", patient.id)));
        }
        Ok(())
    }

    fn delete_patient(&self, id: &str) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("patient {id}")));
        }
        tracing::info!("Deleted patient and linked screenings from storage");
        Ok(())
    }

    fn save_screening(
        &self,
        screening: &Screening,
        recommendations: &[RecommendationRecord],
    ) -> Result<(), Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let input = &screening.input;
        tx.execute(
            r"
            INSERT INTO screenings (
                id, patient_id, height_cm, weight_kg, systolic_bp, diastolic_bp, heart_rate,
                smoking_status, alcohol_usage, physical_activity, glucose_level, cholesterol_level,
                risk_score, risk_level, risk_notes, ai_insights, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ",
            params![
                screening.id,
                screening.patient_id,
                input.height_cm,
                input.weight_kg,
                input.systolic_bp,
                input.diastolic_bp,
                input.heart_rate,
                input.smoking_status.map(|s| s.as_str()),
                input.alcohol_usage,
                input.physical_activity,
                input.glucose_level,
                input.cholesterol_level,
                screening.risk_score,
                screening.risk_level.as_str(),
                screening.risk_notes,
                screening.ai_insights,
                screening.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO recommendations (
                    id, patient_id, screening_id, category, title, description,
                    priority, is_completed, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )?;
            for record in recommendations {
                stmt.execute(params![
                    record.id,
                    record.patient_id,
                    record.screening_id,
                    record.recommendation.category.as_str(),
                    record.recommendation.title,
                    record.recommendation.description,
                    record.recommendation.priority.as_str(),
                    record.is_completed,
                    record.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Saved screening {} with {} recommendations",
            screening.id,
            recommendations.len()
        );
        Ok(())
    }

    fn set_ai_insights(&self, screening_id: &str, insights: &str) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE screenings SET ai_insights = ?1 WHERE id = ?2",
            params![insights, screening_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("screening {screening_id}")));
        }
        Ok(())
    }

    fn load_screening(&self, id: &str) -> Result<Option<Screening>, Self::Error> {
        let conn = self.conn()?;

        let screening = conn
            .query_row(
                &format!("SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = ?1"),
                params![id],
                screening_from_row,
            )
            .optional()?;

        Ok(screening)
    }

    fn load_screenings(&self, filter: &ScreeningFilter) -> Result<Vec<Screening>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            r"
            SELECT {SCREENING_COLUMNS}
            FROM screenings
            WHERE (?1 IS NULL OR patient_id = ?1)
              AND (?2 IS NULL OR risk_level = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "
        ))?;

        let screenings = stmt
            .query_map(
                params![
                    filter.patient_id,
                    filter.risk_level.map(|l| l.as_str()),
                    sql_limit(filter.limit),
                ],
                screening_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(screenings)
    }

    fn load_screenings_paginated(&self, offset: usize, limit: usize) -> Result<ScreeningPage, Self::Error> {
        let conn = self.conn()?;

        let total_count: i64 = conn.query_row("SELECT COUNT(*) FROM screenings", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            r"
            SELECT {SCREENING_COLUMNS}
            FROM screenings
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1 OFFSET ?2
            "
        ))?;

        let screenings = stmt
            .query_map(params![limit as i64, offset as i64], screening_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScreeningPage::new(screenings, total_count as usize, offset, limit))
    }

    fn count_screenings(&self) -> Result<usize, Self::Error> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM screenings", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn load_recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            r"
            SELECT {RECOMMENDATION_COLUMNS}
            FROM recommendations
            WHERE (?1 IS NULL OR patient_id = ?1)
              AND (?2 IS NULL OR screening_id = ?2)
              AND (?3 = 0 OR is_completed = 0)
            ORDER BY rowid ASC
            "
        ))?;

        let records = stmt
            .query_map(
                params![filter.patient_id, filter.screening_id, filter.incomplete_only],
                recommendation_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn complete_recommendation(&self, id: &str) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE recommendations SET is_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(updated > 0)
    }

    fn save_appointment(&self, appointment: &Appointment) -> Result<(), Self::Error> {
        let conn = self.conn()?;

        conn.execute(
            r"
            INSERT INTO appointments (
                id, patient_id, health_worker, scheduled_date, reason, notes, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                appointment.id,
                appointment.patient_id,
                appointment.health_worker,
                sortable_timestamp(&appointment.scheduled_date),
                appointment.reason,
                appointment.notes,
                appointment.status.as_str(),
                appointment.created_at.to_rfc3339(),
                appointment.updated_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Saved appointment {} to storage", appointment.id);
        Ok(())
    }

    fn load_appointment(&self, id: &str) -> Result<Option<Appointment>, Self::Error> {
        let conn = self.conn()?;

        let appointment = conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
                params![id],
                appointment_from_row,
            )
            .optional()?;

        Ok(appointment)
    }

    fn load_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, Self::Error> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            r"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE (?1 IS NULL OR patient_id = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR (scheduled_date >= ?3 AND status = 'scheduled'))
            ORDER BY scheduled_date DESC, rowid DESC
            "
        ))?;

        let appointments = stmt
            .query_map(
                params![
                    filter.patient_id,
                    filter.status.map(|s| s.as_str()),
                    filter.upcoming_from.as_ref().map(sortable_timestamp),
                ],
                appointment_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(appointments)
    }

    fn update_appointment(&self, appointment: &Appointment) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r"
            UPDATE appointments
            SET scheduled_date = ?2, notes = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1
            ",
            params![
                appointment.id,
                sortable_timestamp(&appointment.scheduled_date),
                appointment.notes,
                appointment.status.as_str(),
                appointment.updated_at.to_rfc3339(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<(), Self::Error> {
        let conn = self.conn()?;
        conn.execute_batch(
            "DELETE FROM appointments; DELETE FROM recommendations; DELETE FROM screenings; DELETE FROM patients;",
        )?;
        tracing::warn!("Cleared all data from storage");
        Ok(())
    }
}
