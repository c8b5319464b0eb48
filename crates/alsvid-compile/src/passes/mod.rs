//! Built-in rewriting passes.

pub mod flatten;
pub mod inline;
pub mod reorder;
pub mod reverse;

pub use flatten::FlattenPass;
pub use inline::InlineAllPass;
pub use reorder::LayerReorderPass;
pub use reverse::ReverseEdgesPass;
