pub mod model;
pub mod version;

pub use model::{SchemaModel, GALLERY, GALLERY_DETAIL, GALLERY_STATE};
pub use version::{SchemaVersion, VersionCatalog};
