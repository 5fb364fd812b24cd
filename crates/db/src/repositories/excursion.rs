use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use aerodesk_core::domain::booking::{RecommendationId, TripRecommendation, TripSearch};

use super::{decode_error, like_pattern, ExcursionRepository, RepositoryError};
use crate::DbPool;

const TRIP_COLUMNS: &str = "id, name, location, keywords, details, booked";

pub struct SqlExcursionRepository {
    pool: DbPool,
}

impl SqlExcursionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_trip(row: &SqliteRow) -> Result<TripRecommendation, RepositoryError> {
    let booked: i64 = row.try_get("booked").map_err(decode_error)?;
    Ok(TripRecommendation {
        id: RecommendationId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        location: row.try_get("location").map_err(decode_error)?,
        keywords: row.try_get("keywords").map_err(decode_error)?,
        details: row.try_get("details").map_err(decode_error)?,
        booked: booked != 0,
    })
}

#[async_trait::async_trait]
impl ExcursionRepository for SqlExcursionRepository {
    async fn search(&self, search: &TripSearch) -> Result<Vec<TripRecommendation>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {TRIP_COLUMNS} FROM trip_recommendations WHERE 1 = 1"
        ));
        if let Some(location) = &search.location {
            builder.push(" AND location LIKE ").push_bind(like_pattern(location));
        }
        if let Some(name) = &search.name {
            builder.push(" AND name LIKE ").push_bind(like_pattern(name));
        }
        if !search.keywords.is_empty() {
            builder.push(" AND (");
            let mut keywords = builder.separated(" OR ");
            for keyword in &search.keywords {
                keywords.push("keywords LIKE ").push_bind_unseparated(like_pattern(keyword));
            }
            builder.push(")");
        }
        builder.push(" ORDER BY id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_trip).collect()
    }

    async fn find_by_id(
        &self,
        id: RecommendationId,
    ) -> Result<Option<TripRecommendation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TRIP_COLUMNS} FROM trip_recommendations WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_trip).transpose()
    }

    async fn set_booked(&self, id: RecommendationId, booked: bool) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE trip_recommendations SET booked = ? WHERE id = ?")
            .bind(i64::from(booked))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_details(
        &self,
        id: RecommendationId,
        details: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE trip_recommendations SET details = ? WHERE id = ?")
            .bind(details)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use aerodesk_core::domain::booking::{RecommendationId, TripSearch};

    use super::SqlExcursionRepository;
    use crate::repositories::ExcursionRepository;
    use crate::{connect_with_settings, migrations, TravelSeedDataset};

    async fn seeded_repo() -> SqlExcursionRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        TravelSeedDataset::load(&pool).await.expect("seed");
        SqlExcursionRepository::new(pool)
    }

    #[tokio::test]
    async fn keywords_are_or_matched_within_location() {
        let repo = seeded_repo().await;
        let search = TripSearch { location: Some("Lucerne".to_string()), ..TripSearch::default() }
            .with_keyword_list("museum, mountain");
        let trips = repo.search(&search).await.expect("search");

        assert_eq!(
            trips.iter().map(|trip| trip.id).collect::<Vec<_>>(),
            vec![RecommendationId(5), RecommendationId(6)]
        );
    }

    #[tokio::test]
    async fn details_update_and_booking_round_trip_storage() {
        let repo = seeded_repo().await;
        let id = RecommendationId(7);

        assert_eq!(repo.update_details(id, "Sunset cruise, 2 adults").await.expect("update"), 1);
        assert_eq!(repo.set_booked(id, true).await.expect("book"), 1);

        let trip = repo.find_by_id(id).await.expect("find").expect("trip");
        assert_eq!(trip.details, "Sunset cruise, 2 adults");
        assert!(trip.booked);
    }
}
