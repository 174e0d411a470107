//! Aggregates module
pub mod product;
pub mod category;
pub mod cart;
pub mod order;
pub mod review;
pub mod hero;

pub use product::{Product, ProductDraft, ProductError, ProductStatus, StockStatus};
pub use category::{Category, CategoryDraft, CategoryError, CategoryStatus, CategorySummary};
pub use cart::{Cart, CartError, CartLine, CartView, CartViewLine, MAX_LINE_QUANTITY};
pub use order::{Checkout, Order, OrderError, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress, ShippingPolicy};
pub use review::{HelpfulVote, Review, ReviewError, ReviewSort, ReviewStats};
pub use hero::{HeroDraft, HeroError, HeroSlide};
