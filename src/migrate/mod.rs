pub mod coordinator;
pub mod field;
pub mod mapping;
pub mod step;

pub use coordinator::MigrationCoordinator;
pub use mapping::{EntityTransform, MappingModel};
pub use step::MigrationStep;
