//! Authentication Module
//! Mission: JWT sessions, bcrypt passwords and role-based guards

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, authorize, require_admin, CurrentUser};
pub use models::{Claims, User, UserRole};
pub use user_store::UserStore;
