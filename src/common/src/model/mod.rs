pub mod dataset;
pub mod environment;
pub mod share;

pub use dataset::{Dataset, DatasetStorageLocation, DatasetTable};
pub use environment::{Environment, EnvironmentGroup};
pub use share::{
    ShareItem, ShareItemAction, ShareItemStatus, ShareObject, ShareObjectAction,
    ShareObjectStatus, ShareableType, UnknownVariant,
};
