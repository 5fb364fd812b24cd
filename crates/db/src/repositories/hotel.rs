use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use aerodesk_core::domain::booking::{DateRangeUpdate, Hotel, HotelId, StaySearch};
use aerodesk_core::domain::time::format_date;

use super::{date_column, decode_error, like_pattern, HotelRepository, RepositoryError};
use crate::DbPool;

const HOTEL_COLUMNS: &str =
    "id, name, location, price_tier, checkin_date, checkout_date, booked";

pub struct SqlHotelRepository {
    pool: DbPool,
}

impl SqlHotelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_hotel(row: &SqliteRow) -> Result<Hotel, RepositoryError> {
    let booked: i64 = row.try_get("booked").map_err(decode_error)?;
    Ok(Hotel {
        id: HotelId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        location: row.try_get("location").map_err(decode_error)?,
        price_tier: row.try_get("price_tier").map_err(decode_error)?,
        checkin_date: date_column(row, "checkin_date")?,
        checkout_date: date_column(row, "checkout_date")?,
        booked: booked != 0,
    })
}

#[async_trait::async_trait]
impl HotelRepository for SqlHotelRepository {
    async fn search(&self, search: &StaySearch) -> Result<Vec<Hotel>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {HOTEL_COLUMNS} FROM hotels WHERE 1 = 1"));
        if let Some(location) = &search.location {
            builder.push(" AND location LIKE ").push_bind(like_pattern(location));
        }
        if let Some(name) = &search.name {
            builder.push(" AND name LIKE ").push_bind(like_pattern(name));
        }
        builder.push(" ORDER BY id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_hotel).collect()
    }

    async fn find_by_id(&self, id: HotelId) -> Result<Option<Hotel>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {HOTEL_COLUMNS} FROM hotels WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_hotel).transpose()
    }

    async fn set_booked(&self, id: HotelId, booked: bool) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE hotels SET booked = ? WHERE id = ?")
            .bind(i64::from(booked))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_dates(
        &self,
        id: HotelId,
        update: &DateRangeUpdate,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE hotels
             SET checkin_date = COALESCE(?, checkin_date),
                 checkout_date = COALESCE(?, checkout_date)
             WHERE id = ?",
        )
        .bind(update.start_date.as_ref().map(format_date))
        .bind(update.end_date.as_ref().map(format_date))
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use aerodesk_core::domain::booking::{DateRangeUpdate, HotelId, StaySearch};

    use super::SqlHotelRepository;
    use crate::repositories::HotelRepository;
    use crate::{connect_with_settings, migrations, TravelSeedDataset};

    async fn seeded_repo() -> SqlHotelRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        TravelSeedDataset::load(&pool).await.expect("seed");
        SqlHotelRepository::new(pool)
    }

    #[tokio::test]
    async fn search_by_location_and_name() {
        let repo = seeded_repo().await;
        let zurich = repo
            .search(&StaySearch { location: Some("Zurich".to_string()), ..StaySearch::default() })
            .await
            .expect("search");
        assert_eq!(zurich.len(), 4);

        let hyatt = repo
            .search(&StaySearch { name: Some("hyatt".to_string()), ..StaySearch::default() })
            .await
            .expect("search");
        assert_eq!(
            hyatt.iter().map(|hotel| hotel.id).collect::<Vec<_>>(),
            vec![HotelId(3), HotelId(10)]
        );
    }

    #[tokio::test]
    async fn booking_a_missing_hotel_touches_nothing() {
        let repo = seeded_repo().await;
        assert_eq!(repo.set_booked(HotelId(404), true).await.expect("book"), 0);
        let untouched = repo.find_by_id(HotelId(1)).await.expect("find").expect("hotel");
        assert!(!untouched.booked);
    }

    #[tokio::test]
    async fn update_moves_both_dates() {
        let repo = seeded_repo().await;
        let checkin = NaiveDate::from_ymd_opt(2031, 3, 1).expect("date");
        let checkout = NaiveDate::from_ymd_opt(2031, 3, 4).expect("date");

        let touched = repo
            .update_dates(
                HotelId(2),
                &DateRangeUpdate { start_date: Some(checkin), end_date: Some(checkout) },
            )
            .await
            .expect("update");
        assert_eq!(touched, 1);

        let hotel = repo.find_by_id(HotelId(2)).await.expect("find").expect("hotel");
        assert_eq!((hotel.checkin_date, hotel.checkout_date), (checkin, checkout));
    }
}
