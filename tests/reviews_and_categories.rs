//! Review rules, category tree rules and hero ordering against the in-memory store.

mod common;

use common::{category, category_draft, checkout, money, product, storefront};
use storefront::domain::aggregates::{HeroDraft, ProductDraft, ReviewSort};
use storefront::domain::value_objects::Rating;
use storefront::services::{CategoryFilter, ParentFilter};
use storefront::store::PageRequest;
use storefront::EcommerceError;

fn stars(value: u8) -> Rating { Rating::new(value).unwrap() }

#[tokio::test]
async fn one_review_per_user_and_product() {
    let s = storefront();
    let c = category(&s, "Cameras").await;
    let camera = product(&s, c.id, "Compact Camera", "199.00", 4).await;

    let (review, stats) = s
        .create_review(camera.id, "user-1", Some("Ada".into()), stars(5), "Sharp", "Great lens for the price.")
        .await
        .unwrap();
    assert_eq!(review.helpful, 0);
    assert!(!review.verified);
    assert_eq!(stats.total_reviews, 1);

    let again = s.create_review(camera.id, "user-1", None, stars(1), "Changed", "Changed my mind.").await;
    assert!(matches!(again, Err(EcommerceError::DuplicateReview)));

    let (_, stats) = s.create_review(camera.id, "user-2", None, stars(4), "Good", "Solid build.").await.unwrap();
    assert_eq!(stats.total_reviews, 2);
    assert_eq!(stats.average_rating, money("4.5"));
    assert_eq!(stats.rating_distribution[&5u8], 1);
    assert_eq!(stats.rating_distribution[&4u8], 1);
    assert_eq!(stats.rating_distribution[&1u8], 0);
}

#[tokio::test]
async fn review_is_verified_after_purchase() {
    let s = storefront();
    let c = category(&s, "Bags").await;
    let backpack = product(&s, c.id, "Day Pack", "45.00", 6).await;
    s.add_to_cart("buyer", backpack.id, 1).await.unwrap();
    s.place_order("buyer", checkout()).await.unwrap();

    let (review, _) = s.create_review(backpack.id, "buyer", None, stars(5), "Roomy", "Fits a laptop.").await.unwrap();
    assert!(review.verified);
}

#[tokio::test]
async fn helpful_vote_counts_once_per_user() {
    let s = storefront();
    let c = category(&s, "Lamps").await;
    let lamp = product(&s, c.id, "Desk Lamp", "35.00", 8).await;
    let other = product(&s, c.id, "Floor Lamp", "80.00", 8).await;
    let (review, _) = s.create_review(lamp.id, "author", None, stars(3), "Okay", "A bit dim.").await.unwrap();

    assert_eq!(s.mark_helpful(lamp.id, review.id, "reader-1").await.unwrap(), 1);
    assert_eq!(s.mark_helpful(lamp.id, review.id, "reader-2").await.unwrap(), 2);
    assert!(matches!(s.mark_helpful(lamp.id, review.id, "reader-1").await, Err(EcommerceError::AlreadyVoted)));
    assert!(matches!(s.mark_helpful(other.id, review.id, "reader-3").await, Err(EcommerceError::NotFound(_))));

    let (page, _) = s.reviews(lamp.id, ReviewSort::Helpful, PageRequest::default()).await.unwrap();
    assert_eq!(page.items[0].helpful, 2);
}

#[tokio::test]
async fn reviews_for_missing_product_are_not_found() {
    let s = storefront();
    let missing = uuid::Uuid::now_v7();
    assert!(matches!(s.reviews(missing, ReviewSort::Recent, PageRequest::default()).await, Err(EcommerceError::NotFound(_))));
}

#[tokio::test]
async fn category_parent_must_not_form_a_cycle() {
    let s = storefront();
    let root = category(&s, "Clothing").await;
    let child = s.create_category(category_draft("Jackets", Some(root.id))).await.unwrap();
    let grandchild = s.create_category(category_draft("Rain Jackets", Some(child.id))).await.unwrap();

    let onto_self = s.update_category(root.id, category_draft("Clothing", Some(root.id))).await;
    assert!(matches!(onto_self, Err(EcommerceError::Conflict(_))));

    let onto_descendant = s.update_category(root.id, category_draft("Clothing", Some(grandchild.id))).await;
    assert!(matches!(onto_descendant, Err(EcommerceError::Conflict(_))));

    let missing_parent = s.create_category(category_draft("Hats", Some(uuid::Uuid::now_v7()))).await;
    assert!(matches!(missing_parent, Err(EcommerceError::Validation { .. })));

    let roots = s.list_categories(&CategoryFilter { parent: ParentFilter::Root, ..Default::default() }).await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].children_count, 1);
}

#[tokio::test]
async fn category_names_are_unique_ignoring_case() {
    let s = storefront();
    category(&s, "Home Office").await;
    let clash = s.create_category(category_draft("home office", None)).await;
    assert!(matches!(clash, Err(EcommerceError::Conflict(_))));
}

#[tokio::test]
async fn category_delete_removes_subtree_unless_in_use() {
    let s = storefront();
    let root = category(&s, "Sports").await;
    let child = s.create_category(category_draft("Cycling", Some(root.id))).await.unwrap();
    s.create_category(category_draft("Helmets", Some(child.id))).await.unwrap();
    let bike = product(&s, child.id, "Road Bike", "899.00", 2).await;

    assert!(matches!(s.delete_category(root.id).await, Err(EcommerceError::Conflict(_))));

    s.archive_product(bike.id).await.unwrap();
    assert_eq!(s.delete_category(root.id).await.unwrap(), 3);
    assert!(s.list_categories(&CategoryFilter::default()).await.unwrap().is_empty());
    assert!(matches!(s.delete_category(root.id).await, Err(EcommerceError::NotFound(_))));
}

#[tokio::test]
async fn product_needs_an_existing_category() {
    let s = storefront();
    let draft = common::product_draft("Orphan", "5.00", 1, uuid::Uuid::now_v7());
    assert!(matches!(s.create_product(draft).await, Err(EcommerceError::Validation { .. })));
}

#[tokio::test]
async fn product_skus_are_unique_ignoring_case() {
    let s = storefront();
    let c = category(&s, "Apparel").await;
    let tee = ProductDraft { sku: Some("tee-001".into()), ..common::product_draft("Plain Tee", "12.00", 4, c.id) };
    let tee = s.create_product(tee).await.unwrap();
    assert_eq!(tee.sku.as_ref().map(|sku| sku.as_str()), Some("TEE-001"));

    let clash = ProductDraft { sku: Some(" TEE-001 ".into()), ..common::product_draft("Striped Tee", "14.00", 2, c.id) };
    let err = s.create_product(clash).await.unwrap_err();
    assert!(matches!(&err, EcommerceError::Conflict(m) if m == "A product with this SKU already exists"));

    // Products without a SKU never clash with each other.
    product(&s, c.id, "Socks", "4.00", 10).await;
    let hat = product(&s, c.id, "Hat", "9.00", 3).await;

    let steal = ProductDraft { sku: Some("Tee-001".into()), stock: None, ..common::product_draft("Hat", "9.00", 0, c.id) };
    assert!(matches!(s.update_product(hat.id, steal).await, Err(EcommerceError::Conflict(_))));
    assert!(s.product(hat.id).await.unwrap().sku.is_none());
}

fn slide(title: &str, is_active: bool) -> HeroDraft {
    HeroDraft {
        title: title.into(),
        subtitle: None,
        button_text: "Shop now".into(),
        button_link: "/products".into(),
        image: format!("/hero/{}.jpg", title.to_lowercase()),
        is_active,
    }
}

#[tokio::test]
async fn hero_slides_reorder_and_hide_inactive() {
    let s = storefront();
    let first = s.create_hero(slide("Spring", true)).await.unwrap();
    s.create_hero(slide("Summer", true)).await.unwrap();
    s.create_hero(slide("Draft", false)).await.unwrap();

    let moved = s.reorder_hero(first.id, 1).await.unwrap();
    assert_eq!(moved.order, 1);

    let active: Vec<String> = s.active_heroes().await.unwrap().into_iter().map(|h| h.title).collect();
    assert_eq!(active, vec!["Summer", "Spring"]);
    assert_eq!(s.all_heroes().await.unwrap().len(), 3);

    assert!(matches!(s.reorder_hero(first.id, -1).await, Err(EcommerceError::Validation { .. })));
    s.delete_hero(first.id).await.unwrap();
    assert!(matches!(s.delete_hero(first.id).await, Err(EcommerceError::NotFound(_))));
}
