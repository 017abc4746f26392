//! Hospital Storage
//! Mission: CRUD over hospital records

use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::hospitals::models::{Hospital, HospitalInput, VacCenter};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

const HOSPITAL_COLUMNS: &str =
    "id, ordinal, name, address, district, province, postalcode, tel, region, capacity, created_at";

#[derive(Clone)]
pub struct HospitalStore {
    db: Database,
}

impl HospitalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All hospitals in creation order
    pub async fn list(&self) -> ApiResult<Vec<Hospital>> {
        let conn = self.db.conn().lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals ORDER BY rowid ASC"
        ))?;
        let hospitals = stmt
            .query_map([], row_to_hospital)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hospitals)
    }

    pub async fn get(&self, id: &Uuid) -> ApiResult<Hospital> {
        let conn = self.db.conn().lock().await;
        find_hospital(&conn, id)?.ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, input: &HospitalInput) -> ApiResult<Hospital> {
        input.validate_new()?;

        let mut hospital = Hospital {
            id: Uuid::new_v4(),
            ordinal: None,
            name: String::new(),
            address: String::new(),
            district: None,
            province: None,
            postalcode: None,
            tel: None,
            region: None,
            capacity: None,
            created_at: Utc::now().to_rfc3339(),
        };
        input.apply_to(&mut hospital);

        let conn = self.db.conn().lock().await;
        conn.execute(
            &format!(
                "INSERT INTO hospitals ({HOSPITAL_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                hospital.id.to_string(),
                hospital.ordinal,
                hospital.name,
                hospital.address,
                hospital.district,
                hospital.province,
                hospital.postalcode,
                hospital.tel,
                hospital.region,
                hospital.capacity,
                hospital.created_at,
            ],
        )?;

        info!("Created hospital: {} ({})", hospital.name, hospital.id);
        Ok(hospital)
    }

    /// Partial update; absent fields keep their stored values.
    pub async fn update(&self, id: &Uuid, input: &HospitalInput) -> ApiResult<Hospital> {
        input.validate_update()?;

        let conn = self.db.conn().lock().await;
        let mut hospital = find_hospital(&conn, id)?.ok_or_else(|| not_found(id))?;
        input.apply_to(&mut hospital);

        conn.execute(
            "UPDATE hospitals
             SET ordinal = ?2, name = ?3, address = ?4, district = ?5, province = ?6,
                 postalcode = ?7, tel = ?8, region = ?9, capacity = ?10
             WHERE id = ?1",
            params![
                hospital.id.to_string(),
                hospital.ordinal,
                hospital.name,
                hospital.address,
                hospital.district,
                hospital.province,
                hospital.postalcode,
                hospital.tel,
                hospital.region,
                hospital.capacity,
            ],
        )?;

        info!("Updated hospital: {}", hospital.id);
        Ok(hospital)
    }

    /// Delete a hospital. Its appointments are removed with it;
    /// returns how many were dropped.
    pub async fn delete(&self, id: &Uuid) -> ApiResult<usize> {
        let mut conn = self.db.conn().lock().await;
        let tx = conn.transaction()?;

        let appointments: i64 = tx.query_row(
            "SELECT COUNT(*) FROM appointments WHERE hospital_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        let rows_affected =
            tx.execute("DELETE FROM hospitals WHERE id = ?1", params![id.to_string()])?;
        if rows_affected == 0 {
            return Err(not_found(id));
        }
        tx.commit()?;

        info!(
            hospital_id = %id,
            removed_appointments = appointments,
            "Deleted hospital"
        );
        Ok(appointments as usize)
    }

    pub async fn vac_centers(&self) -> ApiResult<Vec<VacCenter>> {
        let hospitals = self.list().await?;
        Ok(hospitals.iter().map(VacCenter::from).collect())
    }
}

pub(crate) fn find_hospital(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Hospital>> {
    conn.query_row(
        &format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = ?1"),
        params![id.to_string()],
        row_to_hospital,
    )
    .optional()
}

pub(crate) fn not_found(id: &Uuid) -> ApiError {
    ApiError::not_found(format!("No hospital with the id of {}", id))
}

fn row_to_hospital(row: &Row<'_>) -> rusqlite::Result<Hospital> {
    let id: String = row.get(0)?;
    Ok(Hospital {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        ordinal: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        district: row.get(4)?,
        province: row.get(5)?,
        postalcode: row.get(6)?,
        tel: row.get(7)?,
        region: row.get(8)?,
        capacity: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> HospitalStore {
        HospitalStore::new(Database::in_memory().unwrap())
    }

    fn happy_hospital() -> HospitalInput {
        HospitalInput {
            ordinal: Some("121".into()),
            name: Some("Happy Hospital".into()),
            address: Some("121 Sukhumvit Rd".into()),
            district: Some("Bang Na".into()),
            province: Some("Bangkok".into()),
            postalcode: Some("10110".into()),
            tel: Some("02-2187000".into()),
            region: Some("Bangkok".into()),
            capacity: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_fields() {
        let store = create_test_store();

        let created = store.create(&happy_hospital()).await.unwrap();
        let fetched = store.get(&created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.name, "Happy Hospital");
        assert_eq!(fetched.postalcode.as_deref(), Some("10110"));
    }

    #[tokio::test]
    async fn test_create_requires_name_and_address() {
        let store = create_test_store();
        let result = store
            .create(&HospitalInput {
                name: Some("No Address".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_partial_and_missing() {
        let store = create_test_store();
        let created = store.create(&happy_hospital()).await.unwrap();

        let updated = store
            .update(
                &created.id,
                &HospitalInput {
                    tel: Some("02-0000000".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tel.as_deref(), Some("02-0000000"));
        assert_eq!(updated.name, created.name);
        assert_eq!(store.get(&created.id).await.unwrap(), updated);

        let missing = store.update(&Uuid::new_v4(), &HospitalInput::default()).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = create_test_store();
        let created = store.create(&happy_hospital()).await.unwrap();

        assert_eq!(store.delete(&created.id).await.unwrap(), 0);
        assert!(matches!(
            store.get(&created.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&created.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_vac_centers() {
        let store = create_test_store();
        let first = store.create(&happy_hospital()).await.unwrap();
        let second = store
            .create(&HospitalInput {
                name: Some("Second".into()),
                address: Some("2 Road".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);

        let centers = store.vac_centers().await.unwrap();
        assert_eq!(
            centers,
            vec![
                VacCenter {
                    id: first.id,
                    name: "Happy Hospital".into(),
                    tel: Some("02-2187000".into()),
                },
                VacCenter {
                    id: second.id,
                    name: "Second".into(),
                    tel: None,
                },
            ]
        );
    }
}
