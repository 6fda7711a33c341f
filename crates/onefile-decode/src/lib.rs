//! Decode `.ONE` volumetric scene containers.
//!
//! This crate provides pure synchronous decoding of the container format:
//! a trailer-anchored header describing one scene, its volumes and textures,
//! followed (from byte zero) by a sparse voxel stream per texture that is
//! assembled into a dense RGBA field. All functions can be called from any
//! threading context - the library user controls parallelism and
//! cancellation.
//!
//! # Key functions
//!
//! - [`decode_container`]: Decode a whole container in one call
//! - [`read_header`]: Locate and decode the header records only
//! - [`voxel_region`]: Open the voxel stream that follows from offset zero
//! - [`assemble_texture`]: Read one texture's voxels and build its dense field
//! - [`Params::parse`]: Parse a delimited `key:value!@key:value` string

mod error;

pub mod container;
#[cfg(any(test, feature = "test-tools"))]
pub mod fixture;
pub mod params;
pub mod reader;
pub mod voxels;

pub use container::{
    Container, ContainerHeader, SIGNATURE, decode_container, read_header, voxel_region,
};
pub use error::{DecodeError, DecodeResult};
pub use params::Params;
pub use reader::RecordReader;
pub use voxels::{
    DenseField, SparseVoxels, TexelFormat, VoxelBuffer, VoxelRecord, assemble_texture,
    read_sparse,
};

/// Parameter key selecting a texture's color encoding.
pub const TYPE_KEY: &str = "TYPE";

/// `TYPE` value selecting 32-bit float colors.
pub const RGBA_FLOAT: &str = "RGBA_FLOAT";

/// Scene-level settings record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub id: i64,
    pub name: String,
    pub params: Params,
}

/// Placement of a texture within the scene.
///
/// The bound texture is referenced through the `TEXTURE_ID_0` parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volume {
    pub id: i64,
    pub name: String,
    pub params: Params,
}

/// Texture record as declared in the header, before its voxels are read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureHeader {
    pub id: i64,
    pub name: String,
    pub params: Params,
}

impl TextureHeader {
    /// Color encoding selected by the `TYPE` parameter.
    #[must_use]
    pub fn encoding(&self) -> ColorEncoding {
        ColorEncoding::from_params(&self.params)
    }
}

/// How voxel colors are stored on disk and in the dense field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEncoding {
    /// Four `f32` channels.
    Float,
    /// Four `u8` channels normalized to `[0, 1]`.
    Byte,
}

impl ColorEncoding {
    /// `Float` when `TYPE` is exactly `RGBA_FLOAT`, `Byte` otherwise.
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        if params.get(TYPE_KEY) == Some(RGBA_FLOAT) {
            Self::Float
        } else {
            Self::Byte
        }
    }
}

/// A decoded texture: header record plus its dense voxel field.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub id: i64,
    pub name: String,
    pub params: Params,
    pub field: DenseField,
}

impl Texture {
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self.field.buffer(), VoxelBuffer::Float(_))
    }

    #[must_use]
    pub fn size_x(&self) -> u32 {
        self.field.extent().x
    }

    #[must_use]
    pub fn size_y(&self) -> u32 {
        self.field.extent().y
    }

    #[must_use]
    pub fn size_z(&self) -> u32 {
        self.field.extent().z
    }
}

/// Bounds applied while decoding untrusted containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Largest voxel count a single texture may declare.
    pub max_voxels_per_texture: u64,
    /// Largest dense field (in voxels, not channels) a texture may expand to.
    pub max_dense_cells: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_voxels_per_texture: 1 << 24,
            max_dense_cells: 1 << 27,
        }
    }
}
