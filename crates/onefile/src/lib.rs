//! Load `.ONE` volumetric scene containers and prepare them for rendering.
//!
//! This crate builds on [`onefile_decode`] with:
//!
//! - [`LoadController`]: single-flight background loading with start/finish
//!   events on an async channel
//! - [`SceneModel`]: the decoded scene, volumes and textures with
//!   volume-to-texture lookup
//! - [`composite`]: render order and per-volume transforms for nested or
//!   single-volume display
//! - [`ContainerSource`]: where container bytes come from (files or memory)
//!
//! # Example
//!
//! ```no_run
//! use onefile::{CompositeMode, LoadController, LoadEvent, LoaderConfig};
//!
//! # fn main() -> onefile::Result<()> {
//! let mut loader = LoadController::new(LoaderConfig::default())?;
//! let events = loader.events();
//! loader.load("scene.ONE");
//!
//! while let Ok(event) = events.recv_blocking() {
//!     if let LoadEvent::Finished { success: true, .. } = event {
//!         let model = loader.model();
//!         let composite = onefile::composite(&model, CompositeMode::Nested);
//!         println!("{} active volumes", composite.len());
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub mod compositor;
pub mod loader;
pub mod model;
pub mod source;

use std::path::Path;

pub use compositor::{
    Composite, CompositeEntry, CompositeMode, MAX_COMPOSITE_VOLUMES, SceneShading, composite,
    volume_transform,
};
pub use error::{Error, Result};
pub use loader::{LoadController, LoadEvent, LoadRequest, LoadState, LoaderConfig};
pub use model::{SceneModel, TEXTURE_BINDING_KEY};
pub use source::{ContainerSource, FileSource, MemorySource};

// Re-export the decoding layer for convenience.
pub use onefile_decode::{
    ColorEncoding, DecodeError, DecodeOptions, DenseField, Params, Scene, TexelFormat, Texture,
    Volume, VoxelBuffer,
};

/// Decode the container at `path` on the calling thread.
pub fn load_scene(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<SceneModel> {
    let path = path.as_ref();
    let reader = FileSource.open(path)?;
    let model = SceneModel::decode(reader, options, || false)?;
    tracing::info!(
        "Loaded {}: {} volumes, {} textures",
        path.display(),
        model.volumes().len(),
        model.textures().len()
    );
    Ok(model)
}
