//! Repositories: domain-facing adapters over the query executor.

mod session;
mod user;
mod wish;

pub use session::SessionRepository;
pub use user::{GoogleProfile, UserRecord, UserRepository};
pub use wish::{NewWish, WishRecord, WishRepository, WishView};
