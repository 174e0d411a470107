use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{HeroDraft, HeroSlide};
use crate::{EcommerceError, Result};

impl Storefront {
    /// Slides shown on the homepage.
    pub async fn active_heroes(&self) -> Result<Vec<HeroSlide>> {
        self.store.list_heroes(true).await
    }

    pub async fn all_heroes(&self) -> Result<Vec<HeroSlide>> {
        self.store.list_heroes(false).await
    }

    pub async fn create_hero(&self, draft: HeroDraft) -> Result<HeroSlide> {
        self.store.insert_hero(draft).await
    }

    pub async fn update_hero(&self, id: Uuid, draft: HeroDraft) -> Result<HeroSlide> {
        let mut slide = self.store.get_hero(id).await?.ok_or(EcommerceError::NotFound("Hero"))?;
        slide.apply(draft);
        self.store.update_hero(&slide).await?;
        Ok(slide)
    }

    pub async fn delete_hero(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_hero(id).await? { return Err(EcommerceError::NotFound("Hero")); }
        Ok(())
    }

    pub async fn reorder_hero(&self, id: Uuid, new_order: i32) -> Result<HeroSlide> {
        self.store.reorder_hero(id, new_order).await
    }
}
