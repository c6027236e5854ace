pub mod content;
pub mod graph;
pub mod layout;
pub mod text;
pub mod transform;
