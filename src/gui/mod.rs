pub mod frontend;
pub mod painter;
pub mod render;
