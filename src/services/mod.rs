//! Business logic, one service per aggregate.

pub mod cart;
pub mod catalog;
pub mod contact;
pub mod coupons;
pub mod orders;
pub mod otp;
pub mod sellers;
pub mod users;
pub mod wishlist;

pub use cart::{AddItemInput, CartService, CartView};
pub use catalog::{CatalogService, CreateProductInput, ProductFilter, UpdateProductInput};
pub use contact::{ContactInput, ContactService};
pub use coupons::CouponService;
pub use orders::{OrderService, PlaceOrderInput, Requester};
pub use otp::{OtpRequestOutcome, OtpService};
pub use sellers::{SellerService, SubmitRequestInput};
pub use users::{RegisterInput, UpdateProfileInput, UserService};
pub use wishlist::WishlistService;
