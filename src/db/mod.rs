pub mod loader;
pub mod models;
pub mod schema;

pub use loader::SqliteLoader;
pub use models::TickRow;
