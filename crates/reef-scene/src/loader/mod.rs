pub mod coordinator;
pub mod graph;
pub mod manifest;
pub mod source;

pub use coordinator::{LoadCoordinator, LoadError, LoadState, LoadStep};
pub use graph::{GraphError, JoinGraph};
pub use manifest::{Join, LoadManifest, LoadNode, ReadTask, PLANT_TEXTURE};
pub use source::{AssetSource, DirectorySource, MemorySource};
