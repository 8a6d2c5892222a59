mod backend;
mod backends;
mod registry;
mod result;
mod tiled;

pub use backend::DetectorBackend;
pub use backends::{LumaBackend, StubBackend};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection};
pub use tiled::{merge_overlapping, plan_tiles, Tile, TiledDetector, TilingConfig};
