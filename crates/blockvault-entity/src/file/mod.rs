//! File domain entities.

pub mod category;
pub mod model;
pub mod version;

pub use category::FileCategory;
pub use model::{FileRecord, NewFile, NewVersion};
pub use version::FileVersion;
