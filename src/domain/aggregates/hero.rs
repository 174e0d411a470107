//! Hero slide Aggregate (homepage carousel)

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub button_text: String,
    pub button_link: String,
    pub image: String,
    pub is_active: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct HeroDraft {
    pub title: String,
    pub subtitle: Option<String>,
    pub button_text: String,
    pub button_link: String,
    pub image: String,
    pub is_active: bool,
}

impl HeroSlide {
    /// New slides go after the current last position.
    pub fn create(draft: HeroDraft, existing: &[HeroSlide]) -> Self {
        let now = Utc::now();
        let order = existing.iter().map(|h| h.order).max().map_or(0, |max| max + 1);
        let mut slide = Self {
            id: Uuid::now_v7(), title: String::new(), subtitle: None, button_text: String::new(),
            button_link: String::new(), image: String::new(), is_active: true, order, created_at: now, updated_at: now,
        };
        slide.apply(draft);
        slide
    }

    pub fn apply(&mut self, draft: HeroDraft) {
        self.title = draft.title.trim().to_string();
        self.subtitle = draft.subtitle.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.button_text = draft.button_text.trim().to_string();
        self.button_link = draft.button_link.trim().to_string();
        self.image = draft.image;
        self.is_active = draft.is_active;
        self.updated_at = Utc::now();
    }
}

/// Storefront order: position ascending, newest first on equal positions.
pub fn sort_for_display(slides: &mut [HeroSlide]) {
    slides.sort_by(|a, b| a.order.cmp(&b.order).then(b.created_at.cmp(&a.created_at)));
}

/// Moves slide `id` to `new_order`, shifting the slides in between by one.
///
/// Moving down decrements the positions in `(current, new]`; moving up
/// increments the positions in `[new, current)`. Returns the `(id, order)`
/// pairs that changed.
pub fn reorder(slides: &mut [HeroSlide], id: Uuid, new_order: i32) -> Result<Vec<(Uuid, i32)>, HeroError> {
    if new_order < 0 { return Err(HeroError::NegativeOrder); }
    let current = slides.iter().find(|h| h.id == id).map(|h| h.order).ok_or(HeroError::NotFound)?;
    let now = Utc::now();
    let mut changed = Vec::new();
    for slide in slides.iter_mut() {
        let next = if slide.id == id {
            new_order
        } else if new_order > current && slide.order > current && slide.order <= new_order {
            slide.order - 1
        } else if new_order < current && slide.order >= new_order && slide.order < current {
            slide.order + 1
        } else {
            continue;
        };
        if next != slide.order {
            slide.order = next;
            slide.updated_at = now;
            changed.push((slide.id, next));
        }
    }
    Ok(changed)
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum HeroError { NotFound, NegativeOrder }
impl std::error::Error for HeroError {}
impl fmt::Display for HeroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Hero not found"),
            Self::NegativeOrder => write!(f, "order must not be negative"),
        }
    }
}
