pub mod handlers;
pub mod models;
pub mod page_counter;
pub mod repository;

pub use handlers::*;
pub use models::*;
pub use page_counter::*;
pub use repository::*;
