//! Reservation and condition-record methods on Repository

use chrono::NaiveDate;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    lifecycle::Transition,
    models::{
        ConditionRecord, NewReservation, Reservation, ReservationQuery, ReservationStatus,
    },
};

/// SQLSTATE raised by the `reservations_no_overlap` exclusion constraint
const EXCLUSION_VIOLATION: &str = "23P01";

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return AppError::Conflict(
                "Asset is already reserved for an overlapping window".to_string(),
            );
        }
    }
    AppError::Database(e)
}

impl Repository {
    /// Get reservation by ID
    pub async fn reservations_get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::reservation_not_found(id))
    }

    /// List reservations matching the query, oldest window first
    pub async fn reservations_list(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE ($1::int IS NULL OR item_id = $1)
              AND ($2::int IS NULL OR requester_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::date IS NULL OR end_date >= $4)
              AND ($5::date IS NULL OR start_date <= $5)
            ORDER BY start_date, id
            "#,
        )
        .bind(query.item_id)
        .bind(query.requester_id)
        .bind(query.status)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a pending reservation
    pub async fn reservations_create(&self, data: &NewReservation) -> AppResult<Reservation> {
        let row = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (item_id, requester_id, start_date, end_date, return_date, purpose, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.item_id)
        .bind(data.requester_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.return_date)
        .bind(&data.purpose)
        .bind(ReservationStatus::Pending)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Approved reservations of an item overlapping `[start, end]`
    /// (served by the `reservations_no_overlap` GiST index)
    pub async fn reservations_approved_in_window(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE item_id = $1
              AND status = 'approved'
              AND daterange(start_date, end_date, '[]') && daterange($2, $3, '[]')
            ORDER BY start_date
            "#,
        )
        .bind(item_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Condition history of a reservation, oldest first
    pub async fn condition_records_list(&self, reservation_id: i32) -> AppResult<Vec<ConditionRecord>> {
        let rows = sqlx::query_as::<_, ConditionRecord>(
            "SELECT * FROM condition_records WHERE reservation_id = $1 ORDER BY recorded_at, id",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Apply a lifecycle transition in a single database transaction
    pub async fn reservations_commit(&self, transition: &Transition) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(r) = transition.reservation() {
            let result = sqlx::query(
                r#"
                UPDATE reservations SET
                    status = $1,
                    checkout_date = $2,
                    item_condition_on_receive = $3,
                    damage_notes = $4,
                    returned_at = $5,
                    item_condition_on_return = $6,
                    return_notes = $7,
                    version = $8,
                    modif_date = $9
                WHERE id = $10 AND version = $11
                "#,
            )
            .bind(r.status)
            .bind(r.checkout_date)
            .bind(r.item_condition_on_receive)
            .bind(&r.damage_notes)
            .bind(r.returned_at)
            .bind(r.item_condition_on_return)
            .bind(&r.return_notes)
            .bind(r.version)
            .bind(r.modif_date)
            .bind(r.id)
            .bind(transition.expected_version())
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

            if result.rows_affected() == 0 {
                return Err(AppError::State(format!(
                    "Reservation {} was modified concurrently",
                    r.id
                )));
            }
        }

        if let Some(change) = transition.asset_change() {
            let result = sqlx::query(
                "UPDATE assets SET status = $1, modif_date = NOW() WHERE id = $2 AND status = $3",
            )
            .bind(change.to)
            .bind(change.asset_id)
            .bind(change.from)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::State(format!(
                    "Asset {} changed status concurrently",
                    change.asset_id
                )));
            }
        }

        if let Some(record) = transition.condition_record() {
            sqlx::query(
                r#"
                INSERT INTO condition_records (reservation_id, event_type, condition, notes, recorded_by, recorded_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(record.reservation_id)
            .bind(record.event_type)
            .bind(record.condition)
            .bind(&record.notes)
            .bind(record.recorded_by)
            .bind(record.recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
