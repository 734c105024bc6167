pub mod decoder;
pub mod reader;

pub use reader::read_from;
