//! `hero_slides`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::PgStore;
use crate::domain::aggregates::{hero, HeroDraft, HeroSlide};
use crate::store::HeroStore;
use crate::{EcommerceError, Result};

const HERO_COLUMNS: &str =
    "id, title, subtitle, button_text, button_link, image, is_active, sort_order, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct HeroRow {
    id: Uuid,
    title: String,
    subtitle: Option<String>,
    button_text: String,
    button_link: String,
    image: String,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HeroRow> for HeroSlide {
    fn from(row: HeroRow) -> Self {
        HeroSlide {
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
            button_text: row.button_text,
            button_link: row.button_link,
            image: row.image,
            is_active: row.is_active,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

async fn all_slides_locked(conn: &mut PgConnection) -> Result<Vec<HeroSlide>> {
    let rows = sqlx::query_as::<_, HeroRow>(&format!("SELECT {HERO_COLUMNS} FROM hero_slides FOR UPDATE"))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(HeroSlide::from).collect())
}

#[async_trait]
impl HeroStore for PgStore {
    async fn list_heroes(&self, active_only: bool) -> Result<Vec<HeroSlide>> {
        let rows = sqlx::query_as::<_, HeroRow>(&format!(
            "SELECT {HERO_COLUMNS} FROM hero_slides WHERE is_active OR NOT $1 ORDER BY sort_order ASC, created_at DESC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(HeroSlide::from).collect())
    }

    async fn get_hero(&self, id: Uuid) -> Result<Option<HeroSlide>> {
        let row = sqlx::query_as::<_, HeroRow>(&format!("SELECT {HERO_COLUMNS} FROM hero_slides WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(HeroSlide::from))
    }

    async fn insert_hero(&self, draft: HeroDraft) -> Result<HeroSlide> {
        let mut tx = self.pool.begin().await?;
        let existing = all_slides_locked(&mut tx).await?;
        let slide = HeroSlide::create(draft, &existing);
        sqlx::query(&format!("INSERT INTO hero_slides ({HERO_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
            .bind(slide.id)
            .bind(&slide.title)
            .bind(&slide.subtitle)
            .bind(&slide.button_text)
            .bind(&slide.button_link)
            .bind(&slide.image)
            .bind(slide.is_active)
            .bind(slide.order)
            .bind(slide.created_at)
            .bind(slide.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(slide)
    }

    async fn update_hero(&self, hero: &HeroSlide) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE hero_slides SET title = $2, subtitle = $3, button_text = $4, button_link = $5, image = $6, \
                 is_active = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(hero.id)
        .bind(&hero.title)
        .bind(&hero.subtitle)
        .bind(&hero.button_text)
        .bind(&hero.button_link)
        .bind(&hero.image)
        .bind(hero.is_active)
        .bind(hero.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 { return Err(EcommerceError::NotFound("Hero")); }
        Ok(())
    }

    async fn delete_hero(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM hero_slides WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn reorder_hero(&self, id: Uuid, new_order: i32) -> Result<HeroSlide> {
        let mut tx = self.pool.begin().await?;
        let mut slides = all_slides_locked(&mut tx).await?;
        let changed = hero::reorder(&mut slides, id, new_order)?;
        for (slide_id, order) in changed {
            sqlx::query("UPDATE hero_slides SET sort_order = $2, updated_at = NOW() WHERE id = $1")
                .bind(slide_id)
                .bind(order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        slides.into_iter().find(|h| h.id == id).ok_or(EcommerceError::NotFound("Hero"))
    }
}
