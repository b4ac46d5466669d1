pub mod manager;
pub mod memory;
pub mod models;
pub mod store;

pub use models::user::{NewUser, User, UserChanges};
pub use store::{StoreError, UserStore};
