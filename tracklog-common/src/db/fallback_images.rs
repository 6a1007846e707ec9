//! Fallback image catalog operations

use crate::models::{ColorVariant, FallbackImage, LogoVariant};
use crate::time::{format_timestamp, now};
use crate::Result;
use sqlx::{Row, SqlitePool};

/// Load the whole catalog ordered by id
pub async fn load_catalog(pool: &SqlitePool) -> Result<Vec<FallbackImage>> {
    let rows = sqlx::query("SELECT id, url, logo, color FROM player_fallback_images ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<FallbackImage> {
            let logo: String = row.get("logo");
            let color: String = row.get("color");
            Ok(FallbackImage {
                id: row.get("id"),
                url: row.get("url"),
                logo: logo.parse()?,
                color: color.parse()?,
            })
        })
        .collect()
}

/// Add one placeholder image, returning its id
pub async fn insert_fallback_image(
    pool: &SqlitePool,
    url: &str,
    logo: LogoVariant,
    color: ColorVariant,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO player_fallback_images (url, logo, color, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(url)
    .bind(logo.as_str())
    .bind(color.as_str())
    .bind(format_timestamp(&now()))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Populate an empty catalog with every logo/color combination
///
/// Image URLs are `<url_prefix>/fallback-<logo>-<color>.jpg`. Returns the
/// number of images inserted (zero when the catalog already has entries).
pub async fn seed_fallback_catalog(pool: &SqlitePool, url_prefix: &str) -> Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player_fallback_images")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::info!(existing, "Fallback catalog already populated, not seeding");
        return Ok(0);
    }

    let prefix = url_prefix.trim_end_matches('/');
    let mut inserted = 0;
    for logo in LogoVariant::ALL {
        for color in ColorVariant::ALL {
            let url = format!("{}/fallback-{}-{}.jpg", prefix, logo, color);
            insert_fallback_image(pool, &url, logo, color).await?;
            inserted += 1;
        }
    }

    tracing::info!(inserted, "Seeded fallback catalog");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn test_seed_creates_six_combinations_once() {
        let pool = connect_in_memory().await.unwrap();

        assert_eq!(seed_fallback_catalog(&pool, "https://cdn.example/img/").await.unwrap(), 6);
        assert_eq!(seed_fallback_catalog(&pool, "https://cdn.example/img").await.unwrap(), 0);

        let catalog = load_catalog(&pool).await.unwrap();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog[0].url, "https://cdn.example/img/fallback-primary-red.jpg");
        assert_eq!(catalog[0].logo, LogoVariant::Primary);
        assert_eq!(catalog[5].color, ColorVariant::Yellow);
        assert!(catalog.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_bad_variant_in_table_is_an_error() {
        let pool = connect_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO player_fallback_images (url, logo, color, created_at) VALUES ('u', 'primary', 'green', 'x')",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(load_catalog(&pool).await.is_err());
    }
}
