// ドメインモデル（エンティティと値オブジェクト）

mod cart;
mod customer;
mod movement;
mod order;
mod value_objects;
mod variant;

pub use value_objects::{
    CartId, CartStatus, CustomerInfo, CustomerProfileId, EmailAddress, LineRequest, Money,
    MovementId, MovementType, OrderId, OrderItemId, OrderNumber, OrderStatus, OrganizationId,
    OrganizationRole, PaymentStatus, ProductId, SessionId, ShippingAddress, UserId, VariantId,
};

pub use cart::{Cart, CartItem};
pub use customer::CustomerProfile;
pub use movement::Movement;
pub use order::{Order, OrderItem};
pub use variant::{Product, Variant};
