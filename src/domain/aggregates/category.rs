//! Category Aggregate
//!
//! Categories form a forest through the optional `parent_id`. The tree helpers
//! below work on a full snapshot of the categories so both store backends share
//! the same cycle and cascade rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::product::UnknownVariant;
use crate::domain::value_objects::{Slug, SlugError};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: CategoryStatus,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus { #[default] Active, Inactive }

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive" }
    }
}

impl FromStr for CategoryStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: CategoryStatus,
    pub featured: bool,
}

/// Category annotated with the number of direct children, as listed to admins.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub children_count: usize,
}

impl Category {
    pub fn create(draft: CategoryDraft) -> Result<Self, CategoryError> {
        let now = Utc::now();
        let mut category = Self {
            id: Uuid::now_v7(), name: String::new(), slug: Slug::from_stored(""), description: None,
            parent_id: None, status: CategoryStatus::Active, featured: false, created_at: now, updated_at: now,
        };
        category.apply(draft)?;
        Ok(category)
    }

    pub fn apply(&mut self, draft: CategoryDraft) -> Result<(), CategoryError> {
        let name = draft.name.trim();
        self.slug = Slug::from_name(name).map_err(CategoryError::InvalidName)?;
        self.name = name.to_string();
        self.description = draft.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        self.parent_id = draft.parent_id;
        self.status = draft.status;
        self.featured = draft.featured;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Case-insensitive name clash against every category except `except`.
pub fn name_taken(categories: &[Category], name: &str, except: Option<Uuid>) -> bool {
    let wanted = name.trim().to_lowercase();
    categories.iter().any(|c| Some(c.id) != except && c.name.to_lowercase() == wanted)
}

/// Checks that `parent` may become the parent of `category`.
///
/// `category` is `None` while creating. Walks the ancestor chain of the proposed
/// parent, so descendants at any depth are rejected.
pub fn validate_parent(categories: &[Category], category: Option<Uuid>, parent: Uuid) -> Result<(), CategoryError> {
    if category == Some(parent) { return Err(CategoryError::SelfParent); }
    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    if !by_id.contains_key(&parent) { return Err(CategoryError::ParentNotFound(parent)); }
    let Some(category) = category else { return Ok(()) };

    let mut seen = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(id) = cursor {
        if id == category { return Err(CategoryError::DescendantParent); }
        if !seen.insert(id) { break; }
        cursor = by_id.get(&id).and_then(|c| c.parent_id);
    }
    Ok(())
}

/// `root` plus every category below it.
pub fn subtree_ids(categories: &[Category], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for c in categories {
        if let Some(parent) = c.parent_id { children.entry(parent).or_default().push(c.id); }
    }
    let mut out = vec![];
    let mut stack = vec![root];
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) { continue; }
        out.push(id);
        if let Some(kids) = children.get(&id) { stack.extend(kids.iter().copied()); }
    }
    out
}

pub fn children_count(categories: &[Category], id: Uuid) -> usize {
    categories.iter().filter(|c| c.parent_id == Some(id)).count()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryError { InvalidName(SlugError), SelfParent, DescendantParent, ParentNotFound(Uuid) }
impl std::error::Error for CategoryError {}
impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(e) => write!(f, "invalid category name: {e}"),
            Self::SelfParent => write!(f, "A category cannot be its own parent"),
            Self::DescendantParent => write!(f, "Cannot set a child category as parent"),
            Self::ParentNotFound(id) => write!(f, "parent category {id} does not exist"),
        }
    }
}
