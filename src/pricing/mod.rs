pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

pub use handlers::*;
pub use models::*;
pub use policy::*;
pub use repository::*;
