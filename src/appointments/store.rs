//! Appointment Storage
//! Mission: Book appointments without breaking the per-user or per-hospital limits

use crate::appointments::models::{
    format_appt_date, Appointment, AppointmentChanges, AppointmentFilter, HospitalSummary,
    NewAppointment,
};
use crate::db::{is_unique_violation, Database};
use crate::error::{ApiError, ApiResult};
use crate::hospitals::store::{find_hospital, not_found as hospital_not_found};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};
use uuid::Uuid;

const APPOINTMENT_SELECT: &str = "SELECT a.id, a.appt_date, a.user_id, a.created_at,
        h.id, h.name, h.province, h.tel
     FROM appointments a
     JOIN hospitals h ON h.id = a.hospital_id";

#[derive(Clone)]
pub struct AppointmentStore {
    db: Database,
}

impl AppointmentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: AppointmentFilter) -> ApiResult<Vec<Appointment>> {
        let conn = self.db.conn().lock().await;
        let mut stmt = conn.prepare(&format!(
            "{APPOINTMENT_SELECT}
             WHERE (?1 IS NULL OR a.user_id = ?1)
               AND (?2 IS NULL OR a.hospital_id = ?2)
             ORDER BY a.appt_date ASC, a.rowid ASC"
        ))?;
        let appointments = stmt
            .query_map(
                params![
                    filter.user.map(|u| u.to_string()),
                    filter.hospital.map(|h| h.to_string()),
                ],
                row_to_appointment,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    pub async fn get(&self, id: &Uuid) -> ApiResult<Appointment> {
        let conn = self.db.conn().lock().await;
        find_appointment(&conn, id)?.ok_or_else(|| not_found(id))
    }

    /// Book an appointment. Hospital existence, the one-per-user rule and
    /// hospital capacity are checked and the row inserted in one transaction.
    pub async fn create(&self, booking: NewAppointment) -> ApiResult<Appointment> {
        let mut conn = self.db.conn().lock().await;
        let tx = conn.transaction()?;

        let hospital = find_hospital(&tx, &booking.hospital)?
            .ok_or_else(|| hospital_not_found(&booking.hospital))?;

        let user_exists: bool = tx
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![booking.user.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !user_exists {
            return Err(ApiError::not_found(format!(
                "No user with the id of {}",
                booking.user
            )));
        }

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM appointments WHERE user_id = ?1",
            params![booking.user.to_string()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            warn!(user_id = %booking.user, "Booking refused: user already has an appointment");
            return Err(ApiError::AlreadyBooked);
        }

        ensure_capacity(&tx, &booking.hospital, hospital.capacity, None)?;

        let id = Uuid::new_v4();
        let inserted = tx.execute(
            "INSERT INTO appointments (id, appt_date, user_id, hospital_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                format_appt_date(&booking.appt_date),
                booking.user.to_string(),
                booking.hospital.to_string(),
                Utc::now().to_rfc3339(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(ApiError::AlreadyBooked),
            Err(e) => return Err(e.into()),
        }

        let appointment = find_appointment(&tx, &id)?.ok_or_else(|| not_found(&id))?;
        tx.commit()?;

        info!(
            appointment_id = %id,
            user_id = %booking.user,
            hospital_id = %booking.hospital,
            "Appointment booked"
        );
        Ok(appointment)
    }

    pub async fn update(&self, id: &Uuid, changes: AppointmentChanges) -> ApiResult<Appointment> {
        let mut conn = self.db.conn().lock().await;
        let tx = conn.transaction()?;

        let current = find_appointment(&tx, id)?.ok_or_else(|| not_found(id))?;

        if let Some(hospital_id) = changes.hospital {
            if hospital_id != current.hospital.id {
                let hospital = find_hospital(&tx, &hospital_id)?
                    .ok_or_else(|| hospital_not_found(&hospital_id))?;
                ensure_capacity(&tx, &hospital_id, hospital.capacity, Some(id))?;
            }
        }

        let hospital_id = changes.hospital.unwrap_or(current.hospital.id);
        let appt_date = changes.appt_date.unwrap_or(current.appt_date);
        tx.execute(
            "UPDATE appointments SET appt_date = ?2, hospital_id = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                format_appt_date(&appt_date),
                hospital_id.to_string(),
            ],
        )?;

        let appointment = find_appointment(&tx, id)?.ok_or_else(|| not_found(id))?;
        tx.commit()?;

        info!(appointment_id = %id, "Appointment updated");
        Ok(appointment)
    }

    pub async fn delete(&self, id: &Uuid) -> ApiResult<()> {
        let conn = self.db.conn().lock().await;
        let rows_affected = conn.execute(
            "DELETE FROM appointments WHERE id = ?1",
            params![id.to_string()],
        )?;
        if rows_affected == 0 {
            return Err(not_found(id));
        }

        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }
}

fn ensure_capacity(
    conn: &Connection,
    hospital_id: &Uuid,
    capacity: Option<u32>,
    excluding: Option<&Uuid>,
) -> ApiResult<()> {
    let Some(capacity) = capacity else {
        return Ok(());
    };

    let booked: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE hospital_id = ?1 AND (?2 IS NULL OR id != ?2)",
        params![hospital_id.to_string(), excluding.map(|id| id.to_string())],
        |row| row.get(0),
    )?;
    if booked >= i64::from(capacity) {
        warn!(hospital_id = %hospital_id, capacity, "Booking refused: hospital is full");
        return Err(ApiError::HospitalFull);
    }
    Ok(())
}

fn find_appointment(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Appointment>> {
    conn.query_row(
        &format!("{APPOINTMENT_SELECT} WHERE a.id = ?1"),
        params![id.to_string()],
        row_to_appointment,
    )
    .optional()
}

fn not_found(id: &Uuid) -> ApiError {
    ApiError::not_found(format!("No appointment with the id of {}", id))
}

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let appt_date: String = row.get(1)?;
    Ok(Appointment {
        id: uuid_column(row, 0)?,
        appt_date: DateTime::parse_from_rfc3339(&appt_date)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc),
        user: uuid_column(row, 2)?,
        created_at: row.get(3)?,
        hospital: HospitalSummary {
            id: uuid_column(row, 4)?,
            name: row.get(5)?,
            province: row.get(6)?,
            tel: row.get(7)?,
        },
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{UserRole, UserStore};
    use crate::hospitals::{HospitalInput, HospitalStore};
    use chrono::TimeZone;

    struct Fixture {
        users: UserStore,
        hospitals: HospitalStore,
        appointments: AppointmentStore,
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        Fixture {
            users: UserStore::new(db.clone(), 4),
            hospitals: HospitalStore::new(db.clone()),
            appointments: AppointmentStore::new(db),
        }
    }

    impl Fixture {
        async fn user(&self, email: &str) -> Uuid {
            self.users
                .create_user("Test", email, None, "pw", UserRole::User)
                .await
                .unwrap()
                .id
        }

        async fn hospital(&self, name: &str, capacity: Option<u32>) -> Uuid {
            self.hospitals
                .create(&HospitalInput {
                    name: Some(name.into()),
                    address: Some("1 Road".into()),
                    capacity: Some(capacity),
                    ..Default::default()
                })
                .await
                .unwrap()
                .id
        }
    }

    fn booking(user: Uuid, hospital: Uuid) -> NewAppointment {
        NewAppointment {
            user,
            hospital,
            appt_date: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let f = fixture();
        let user = f.user("a@example.com").await;
        let hospital = f.hospital("Happy Hospital", None).await;

        let created = f.appointments.create(booking(user, hospital)).await.unwrap();
        assert_eq!(created.user, user);
        assert_eq!(created.hospital.id, hospital);
        assert_eq!(created.hospital.name, "Happy Hospital");

        let fetched = f.appointments.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_second_booking_refused_for_any_hospital() {
        let f = fixture();
        let user = f.user("a@example.com").await;
        let h1 = f.hospital("H1", None).await;
        let h2 = f.hospital("H2", None).await;

        f.appointments.create(booking(user, h1)).await.unwrap();

        let same = f.appointments.create(booking(user, h1)).await;
        assert!(matches!(same, Err(ApiError::AlreadyBooked)));
        let other = f.appointments.create(booking(user, h2)).await;
        assert!(matches!(other, Err(ApiError::AlreadyBooked)));
    }

    #[tokio::test]
    async fn test_missing_hospital_and_user() {
        let f = fixture();
        let user = f.user("a@example.com").await;
        let hospital = f.hospital("H1", None).await;

        let no_hospital = f.appointments.create(booking(user, Uuid::new_v4())).await;
        assert!(matches!(no_hospital, Err(ApiError::NotFound(_))));

        let no_user = f.appointments.create(booking(Uuid::new_v4(), hospital)).await;
        assert!(matches!(no_user, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_capacity_enforced() {
        let f = fixture();
        let hospital = f.hospital("Small Clinic", Some(1)).await;
        let a = f.user("a@example.com").await;
        let b = f.user("b@example.com").await;

        f.appointments.create(booking(a, hospital)).await.unwrap();
        let full = f.appointments.create(booking(b, hospital)).await;
        assert!(matches!(full, Err(ApiError::HospitalFull)));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_keep_one_per_user() {
        let f = fixture();
        let user = f.user("a@example.com").await;
        let h1 = f.hospital("H1", None).await;
        let h2 = f.hospital("H2", None).await;

        let (r1, r2) = tokio::join!(
            f.appointments.create(booking(user, h1)),
            f.appointments.create(booking(user, h2)),
        );
        assert_eq!([r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count(), 1);

        let mine = f
            .appointments
            .list(AppointmentFilter {
                user: Some(user),
                hospital: None,
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture();
        let a = f.user("a@example.com").await;
        let b = f.user("b@example.com").await;
        let h1 = f.hospital("H1", None).await;
        let h2 = f.hospital("H2", None).await;

        f.appointments.create(booking(a, h1)).await.unwrap();
        f.appointments.create(booking(b, h2)).await.unwrap();

        let all = f.appointments.list(AppointmentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_a = f
            .appointments
            .list(AppointmentFilter {
                user: Some(a),
                hospital: None,
            })
            .await
            .unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].user, a);

        let at_h2 = f
            .appointments
            .list(AppointmentFilter {
                user: None,
                hospital: Some(h2),
            })
            .await
            .unwrap();
        assert_eq!(at_h2.len(), 1);
        assert_eq!(at_h2[0].hospital.id, h2);
    }

    #[tokio::test]
    async fn test_update_moves_hospital_and_date() {
        let f = fixture();
        let user = f.user("a@example.com").await;
        let h1 = f.hospital("H1", None).await;
        let h2 = f.hospital("H2", Some(1)).await;
        let created = f.appointments.create(booking(user, h1)).await.unwrap();

        let new_date = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
        let updated = f
            .appointments
            .update(
                &created.id,
                AppointmentChanges {
                    hospital: Some(h2),
                    appt_date: Some(new_date),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.hospital.id, h2);
        assert_eq!(updated.appt_date, new_date);

        // Re-saving into the same full hospital doesn't count itself
        let again = f
            .appointments
            .update(
                &created.id,
                AppointmentChanges {
                    hospital: Some(h2),
                    appt_date: None,
                },
            )
            .await;
        assert!(again.is_ok());

        let missing = f
            .appointments
            .update(&Uuid::new_v4(), AppointmentChanges::default())
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_and_hospital_cascade() {
        let f = fixture();
        let a = f.user("a@example.com").await;
        let b = f.user("b@example.com").await;
        let hospital = f.hospital("H1", None).await;

        let first = f.appointments.create(booking(a, hospital)).await.unwrap();
        f.appointments.delete(&first.id).await.unwrap();
        assert!(matches!(
            f.appointments.get(&first.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            f.appointments.delete(&first.id).await,
            Err(ApiError::NotFound(_))
        ));

        // User can book again once the old appointment is gone
        f.appointments.create(booking(a, hospital)).await.unwrap();
        f.appointments.create(booking(b, hospital)).await.unwrap();

        assert_eq!(f.hospitals.delete(&hospital).await.unwrap(), 2);
        assert!(f
            .appointments
            .list(AppointmentFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
