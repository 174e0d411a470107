//! Cart to order flows against the in-memory store.

mod common;

use common::{category, checkout, money, product, product_draft, storefront};
use storefront::domain::aggregates::{OrderStatus, PaymentStatus, ProductDraft, ProductStatus, StockStatus};
use storefront::services::StatusChange;
use storefront::store::{CatalogStore, OrderStore, PageRequest};
use storefront::EcommerceError;

#[tokio::test]
async fn order_snapshots_cart_and_reserves_stock() {
    let s = storefront();
    let shoes = category(&s, "Shoes").await;
    let sneaker = product(&s, shoes.id, "Trail Sneaker", "20.00", 5).await;

    s.add_to_cart("user-1", sneaker.id, 2).await.unwrap();
    let cart = s.cart("user-1").await.unwrap();
    assert_eq!(cart.subtotal, money("40.00"));
    assert_eq!(cart.shipping_cost, money("4.99"));
    assert_eq!(cart.total, money("44.99"));

    let intent = s.request_intent("user-1").await.unwrap();
    assert_eq!(intent.amount, 4499);
    assert_eq!(intent.currency, "USD");

    let mut input = checkout();
    input.expected_total = Some(money("44.99"));
    input.expected_shipping = Some(money("4.99"));
    let order = s.place_order("user-1", input).await.unwrap();

    assert_eq!(order.total_amount, money("44.99"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].name, "Trail Sneaker");
    assert_eq!(order.items[0].price, money("20.00"));
    assert_eq!(order.order_status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Paid);

    let after = s.product(sneaker.id).await.unwrap();
    assert_eq!(after.stock(), 3);
    assert_eq!(after.stock_status(), StockStatus::LowStock);
    assert!(s.cart("user-1").await.unwrap().items.is_empty());

    let mine = s.orders_for("user-1", PageRequest::default()).await.unwrap();
    assert_eq!(mine.total, 1);
    assert!(matches!(s.order_for("user-2", order.id).await, Err(EcommerceError::NotFound(_))));
}

#[tokio::test]
async fn free_shipping_over_threshold() {
    let s = storefront();
    let c = category(&s, "Audio").await;
    let speaker = product(&s, c.id, "Bookshelf Speaker", "60.00", 10).await;
    s.add_to_cart("user-1", speaker.id, 2).await.unwrap();

    let cart = s.cart("user-1").await.unwrap();
    assert_eq!(cart.shipping_cost, money("0"));
    assert_eq!(cart.total, money("120.00"));
}

#[tokio::test]
async fn short_line_rejects_whole_order() {
    let s = storefront();
    let c = category(&s, "Kitchen").await;
    let kettle = product(&s, c.id, "Kettle", "30.00", 10).await;
    let toaster = product(&s, c.id, "Toaster", "25.00", 1).await;

    s.add_to_cart("user-1", kettle.id, 2).await.unwrap();
    s.add_to_cart("user-1", toaster.id, 3).await.unwrap();

    let err = s.place_order("user-1", checkout()).await.unwrap_err();
    assert!(matches!(err, EcommerceError::InsufficientStock { requested: 3, available: 1, .. }));

    assert_eq!(s.product(kettle.id).await.unwrap().stock(), 10);
    assert_eq!(s.product(toaster.id).await.unwrap().stock(), 1);
    assert_eq!(s.cart("user-1").await.unwrap().items.len(), 2);
    assert_eq!(s.all_orders(None, PageRequest::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn stale_client_total_is_rejected() {
    let s = storefront();
    let c = category(&s, "Books").await;
    let book = product(&s, c.id, "Field Guide", "12.50", 4).await;
    s.add_to_cart("user-1", book.id, 1).await.unwrap();

    let mut input = checkout();
    input.expected_total = Some(money("10.00"));
    assert!(matches!(s.place_order("user-1", input).await, Err(EcommerceError::Validation { .. })));
    assert_eq!(s.product(book.id).await.unwrap().stock(), 4);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let s = storefront();
    assert!(matches!(s.place_order("nobody", checkout()).await, Err(EcommerceError::Validation { .. })));
    assert!(matches!(s.request_intent("nobody").await, Err(EcommerceError::Validation { .. })));
}

#[tokio::test]
async fn incomplete_payment_details_are_refused() {
    let s = storefront();
    let c = category(&s, "Garden").await;
    let hose = product(&s, c.id, "Garden Hose", "15.00", 3).await;
    s.add_to_cart("user-1", hose.id, 1).await.unwrap();

    let mut input = checkout();
    input.payment_details.signature = String::new();
    assert!(matches!(s.place_order("user-1", input).await, Err(EcommerceError::Payment(_))));
    assert_eq!(s.cart("user-1").await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn cart_add_sums_and_set_replaces() {
    let s = storefront();
    let c = category(&s, "Toys").await;
    let kite = product(&s, c.id, "Kite", "8.00", 20).await;

    s.add_to_cart("user-1", kite.id, 2).await.unwrap();
    let cart = s.add_to_cart("user-1", kite.id, 3).await.unwrap();
    assert_eq!(cart.items[0].quantity, 5);

    let cart = s.set_cart_quantity("user-1", kite.id, 1).await.unwrap();
    assert_eq!(cart.items[0].quantity, 1);

    let cart = s.set_cart_quantity("user-1", kite.id, 0).await.unwrap();
    assert!(cart.items.is_empty());

    assert!(matches!(s.add_to_cart("user-1", kite.id, 0).await, Err(EcommerceError::Validation { .. })));
    assert!(matches!(s.remove_from_cart("user-1", kite.id).await, Err(EcommerceError::NotFound(_))));
}

#[tokio::test]
async fn archived_products_cannot_be_added() {
    let s = storefront();
    let c = category(&s, "Outdoor").await;
    let tent = product(&s, c.id, "Tent", "99.00", 2).await;
    s.archive_product(tent.id).await.unwrap();

    assert!(matches!(s.add_to_cart("user-1", tent.id, 1).await, Err(EcommerceError::Validation { .. })));
    assert!(matches!(s.product_by_slug("tent").await, Err(EcommerceError::NotFound(_))));
}

#[tokio::test]
async fn status_changes_follow_transitions() {
    let s = storefront();
    let c = category(&s, "Games").await;
    let puzzle = product(&s, c.id, "Puzzle", "18.00", 5).await;
    s.add_to_cart("user-1", puzzle.id, 1).await.unwrap();
    let order = s.place_order("user-1", checkout()).await.unwrap();

    let shipped_early = StatusChange { order_status: Some(OrderStatus::Shipped), payment_status: None };
    assert!(matches!(
        s.change_order_status(order.id, shipped_early).await,
        Err(EcommerceError::InvalidTransition { .. })
    ));

    for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        let change = StatusChange { order_status: Some(next), payment_status: None };
        let updated = s.change_order_status(order.id, change).await.unwrap();
        assert_eq!(updated.order_status(), next);
    }

    let cancel = StatusChange { order_status: Some(OrderStatus::Cancelled), payment_status: None };
    assert!(s.change_order_status(order.id, cancel).await.is_err());
    assert!(matches!(
        s.change_order_status(order.id, StatusChange::default()).await,
        Err(EcommerceError::Validation { .. })
    ));

    let delivered = s.all_orders(Some(OrderStatus::Delivered), PageRequest::default()).await.unwrap();
    assert_eq!(delivered.total, 1);
}

#[tokio::test]
async fn stale_status_write_is_a_conflict() {
    let s = storefront();
    let c = category(&s, "Music").await;
    let vinyl = product(&s, c.id, "Vinyl Record", "25.00", 5).await;
    s.add_to_cart("user-1", vinyl.id, 1).await.unwrap();
    let order = s.place_order("user-1", checkout()).await.unwrap();

    let err = s
        .store()
        .update_order_status(&order, (OrderStatus::Processing, PaymentStatus::Paid))
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::Conflict(_)));
}

#[tokio::test]
async fn archive_keeps_stock_sold_after_the_product_was_read() {
    let s = storefront();
    let c = category(&s, "Kitchen").await;
    let kettle = product(&s, c.id, "Kettle", "30.00", 5).await;
    let seen_by_admin = s.product(kettle.id).await.unwrap();

    s.add_to_cart("user-1", kettle.id, 2).await.unwrap();
    s.place_order("user-1", checkout()).await.unwrap();

    assert!(s.store().archive_product(seen_by_admin.id).await.unwrap());
    assert!(!s.store().archive_product(seen_by_admin.id).await.unwrap());
    let after = s.product(kettle.id).await.unwrap();
    assert_eq!(after.status, ProductStatus::Archived);
    assert_eq!(after.stock(), 3);
}

#[tokio::test]
async fn product_edit_without_stock_keeps_the_counter() {
    let s = storefront();
    let c = category(&s, "Kitchen").await;
    let pan = product(&s, c.id, "Frying Pan", "40.00", 5).await;

    s.add_to_cart("user-1", pan.id, 2).await.unwrap();
    s.place_order("user-1", checkout()).await.unwrap();

    let edit = ProductDraft { stock: None, ..product_draft("Frying Pan", "35.00", 5, c.id) };
    let updated = s.update_product(pan.id, edit).await.unwrap();
    assert_eq!(updated.price, money("35.00"));
    assert_eq!(updated.stock(), 3);
    assert_eq!(updated.stock_status(), StockStatus::LowStock);
    assert_eq!(s.product(pan.id).await.unwrap().stock(), 3);

    assert!(matches!(
        s.update_product(uuid::Uuid::now_v7(), product_draft("Ghost", "1.00", 1, c.id)).await,
        Err(EcommerceError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_archive_and_order_agree_on_stock() {
    let s = storefront();
    let c = category(&s, "Garden").await;
    let hose = product(&s, c.id, "Garden Hose", "22.00", 5).await;
    s.add_to_cart("user-1", hose.id, 2).await.unwrap();

    let (placed, archived) = tokio::join!(s.place_order("user-1", checkout()), s.archive_product(hose.id));
    archived.unwrap();

    let after = s.product(hose.id).await.unwrap();
    assert_eq!(after.status, ProductStatus::Archived);
    match placed {
        Ok(order) => {
            assert_eq!(order.items[0].quantity, 2);
            assert_eq!(after.stock(), 3);
        }
        Err(e) => {
            assert!(matches!(e, EcommerceError::Conflict(_)));
            assert_eq!(after.stock(), 5);
        }
    }
}
