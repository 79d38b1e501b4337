use sqlx::{PgConnection, PgPool};

use crate::{
    error::{ApiError, ApiResult},
    models::preschool::PreschoolImage,
};

pub struct ImageService;

impl ImageService {
    /// Inserts an image; a primary image first demotes its siblings.
    pub async fn insert_in(
        conn: &mut PgConnection,
        preschool_id: i64,
        image_url: &str,
        is_primary: bool,
    ) -> anyhow::Result<PreschoolImage> {
        if is_primary {
            Self::clear_primary_in(conn, preschool_id).await?;
        }
        let image = sqlx::query_as::<_, PreschoolImage>(
            "INSERT INTO preschool_images (preschool_id, image_url, is_primary)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(preschool_id)
        .bind(image_url.trim())
        .bind(is_primary)
        .fetch_one(&mut *conn)
        .await?;
        Ok(image)
    }

    /// Drops the current primary image and inserts `image_url` as the new one.
    pub async fn replace_primary_in(
        conn: &mut PgConnection,
        preschool_id: i64,
        image_url: &str,
    ) -> anyhow::Result<PreschoolImage> {
        sqlx::query("DELETE FROM preschool_images WHERE preschool_id = $1 AND is_primary = TRUE")
            .bind(preschool_id)
            .execute(&mut *conn)
            .await?;
        Self::insert_in(conn, preschool_id, image_url, true).await
    }

    async fn clear_primary_in(conn: &mut PgConnection, preschool_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE preschool_images SET is_primary = FALSE
             WHERE preschool_id = $1 AND is_primary = TRUE",
        )
        .bind(preschool_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn add(
        pool: &PgPool,
        preschool_id: i64,
        image_url: &str,
        is_primary: bool,
    ) -> ApiResult<PreschoolImage> {
        let mut tx = pool.begin().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM preschools WHERE id = $1)")
            .bind(preschool_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(ApiError::NotFound("Preschool not found".into()));
        }
        let image = Self::insert_in(&mut tx, preschool_id, image_url, is_primary).await?;
        tx.commit().await?;
        Ok(image)
    }

    pub async fn set_primary(pool: &PgPool, image_id: i64, is_primary: bool) -> ApiResult<PreschoolImage> {
        let mut tx = pool.begin().await?;
        let preschool_id: i64 =
            sqlx::query_scalar("SELECT preschool_id FROM preschool_images WHERE id = $1 FOR UPDATE")
                .bind(image_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::NotFound("Image not found".into()))?;

        if is_primary {
            Self::clear_primary_in(&mut tx, preschool_id).await?;
        }
        let image = sqlx::query_as::<_, PreschoolImage>(
            "UPDATE preschool_images SET is_primary = $1 WHERE id = $2 RETURNING *",
        )
        .bind(is_primary)
        .bind(image_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    pub async fn delete(pool: &PgPool, image_id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM preschool_images WHERE id = $1")
            .bind(image_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Image not found".into()));
        }
        Ok(())
    }
}
