//! Persistence entities, one module per table.

pub mod cart;
pub mod cart_item;
pub mod contact_message;
pub mod coupon;
pub mod email_otp;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod product;
pub mod seller;
pub mod seller_request;
pub mod user;
pub mod wishlist;
pub mod wishlist_item;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use contact_message::{ContactStatus, Entity as ContactMessage, Model as ContactMessageModel};
pub use coupon::{CouponRule, Entity as Coupon, Model as CouponModel};
pub use email_otp::{Entity as EmailOtp, Model as EmailOtpModel};
pub use order::{
    Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_status_history::{Entity as OrderStatusHistory, Model as OrderStatusHistoryModel};
pub use product::{Category, Entity as Product, Model as ProductModel, ProductImage};
pub use seller::{BusinessType, Entity as Seller, Model as SellerModel, SellerStatus};
pub use seller_request::{Entity as SellerRequest, Model as SellerRequestModel, RequestStatus};
pub use user::{Address, AddressKind, Entity as User, Model as UserModel, Role};
pub use wishlist::{Entity as Wishlist, Model as WishlistModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
