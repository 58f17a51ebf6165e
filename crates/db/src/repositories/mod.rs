//! Repository abstractions for data access.

pub mod currency;
pub mod user;

pub use currency::{CurrencyError, CurrencyRepository, GraphModel};
pub use user::UserRepository;
