//! Sparse voxel stream decoding and dense field assembly.
//!
//! Assembly is two passes: the sparse records are read and buffered while
//! the running bounding box is tracked, then a zeroed dense field of the
//! box's extents is allocated and every record is scattered into it.

use std::io::Read;

use glam::{IVec3, UVec3, Vec4};

use crate::error::{DecodeError, DecodeResult};
use crate::reader::RecordReader;
use crate::{ColorEncoding, DecodeOptions, Texture, TextureHeader};

/// Scalars per voxel.
pub const CHANNELS: usize = 4;

/// One voxel as stored in the stream, color normalized to `[0, 1]` for
/// byte-encoded textures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRecord {
    pub position: IVec3,
    /// Source channels in `r, g, b, a` order.
    pub color: Vec4,
}

/// The buffered voxel list of one texture plus its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVoxels {
    pub texture_id: i64,
    pub encoding: ColorEncoding,
    pub records: Vec<VoxelRecord>,
    min: IVec3,
    max: IVec3,
}

impl SparseVoxels {
    fn new(texture_id: i64, encoding: ColorEncoding, capacity: usize) -> Self {
        Self {
            texture_id,
            encoding,
            records: Vec::with_capacity(capacity),
            min: IVec3::MAX,
            max: IVec3::MIN,
        }
    }

    fn push(&mut self, record: VoxelRecord) {
        self.min = self.min.min(record.position);
        self.max = self.max.max(record.position);
        self.records.push(record);
    }

    /// Inclusive `(min, max)` corners, or `None` when there are no voxels.
    #[must_use]
    pub fn bounds(&self) -> Option<(IVec3, IVec3)> {
        (!self.records.is_empty()).then_some((self.min, self.max))
    }
}

/// Read the voxel block of one texture: id, count, then the records.
///
/// The id must match the header's id for this texture.
pub fn read_sparse<R: Read>(
    reader: &mut RecordReader<R>,
    header: &TextureHeader,
    options: &DecodeOptions,
) -> DecodeResult<SparseVoxels> {
    let found = reader.read_i64()?;
    if found != header.id {
        return Err(DecodeError::TextureIdMismatch {
            expected: header.id,
            found,
        });
    }

    let count = reader.read_count("voxel")?;
    if count as u64 > options.max_voxels_per_texture {
        return Err(DecodeError::TooManyVoxels {
            texture_id: header.id,
            count: count as u64,
            limit: options.max_voxels_per_texture,
        });
    }

    let encoding = header.encoding();
    // The count is untrusted; grow past the first chunk only as records arrive.
    let mut sparse = SparseVoxels::new(header.id, encoding, count.min(1 << 16));
    for _ in 0..count {
        let position = IVec3::new(reader.read_i32()?, reader.read_i32()?, reader.read_i32()?);
        let color = match encoding {
            ColorEncoding::Float => Vec4::new(
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ),
            ColorEncoding::Byte => {
                let rgba = [
                    reader.read_u8()?,
                    reader.read_u8()?,
                    reader.read_u8()?,
                    reader.read_u8()?,
                ];
                Vec4::from(rgba.map(|c| f32::from(c) / 255.0))
            }
        };
        sparse.push(VoxelRecord { position, color });
    }

    Ok(sparse)
}

/// Read one texture's voxel block and assemble its dense field.
pub fn assemble_texture<R: Read>(
    reader: &mut RecordReader<R>,
    header: &TextureHeader,
    options: &DecodeOptions,
) -> DecodeResult<Texture> {
    let sparse = read_sparse(reader, header, options)?;
    let field = DenseField::scatter(&sparse, options)?;
    Ok(Texture {
        id: header.id,
        name: header.name.clone(),
        params: header.params.clone(),
        field,
    })
}

/// GPU texel format matching a dense buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    Rgba32Float,
    Rgba8Unorm,
}

/// Dense channel storage.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelBuffer {
    Float(Vec<f32>),
    Byte(Vec<u8>),
}

impl VoxelBuffer {
    fn zeroed(encoding: ColorEncoding, len: usize) -> Self {
        match encoding {
            ColorEncoding::Float => Self::Float(vec![0.0; len]),
            ColorEncoding::Byte => Self::Byte(vec![0; len]),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Byte(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dense `extent.x * extent.y * extent.z * 4` field.
///
/// Voxel `(x, y, z)` in container coordinates lives at channel block
/// `((z - oz) * ey + (y - oy)) * ex + (x - ox)`, scaled by four, where `o`
/// is [`origin`](Self::origin) and `e` is [`extent`](Self::extent). Each
/// block holds the source channels in **G, B, R, A** order. Voxels absent
/// from the stream stay zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseField {
    origin: IVec3,
    extent: UVec3,
    buffer: VoxelBuffer,
}

impl DenseField {
    /// Zero-extent field holding no voxels.
    #[must_use]
    pub fn empty(encoding: ColorEncoding) -> Self {
        Self {
            origin: IVec3::ZERO,
            extent: UVec3::ZERO,
            buffer: VoxelBuffer::zeroed(encoding, 0),
        }
    }

    /// Allocate the bounding-box field and scatter every record into it.
    pub fn scatter(sparse: &SparseVoxels, options: &DecodeOptions) -> DecodeResult<Self> {
        let Some((min, max)) = sparse.bounds() else {
            return Ok(Self::empty(sparse.encoding));
        };

        let too_large = |cells| DecodeError::FieldTooLarge {
            texture_id: sparse.texture_id,
            cells,
            limit: options.max_dense_cells,
        };

        // Extents are computed in i64: a full-range axis does not fit in i32.
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).unsigned_abs();
        let spans = [span(min.x, max.x), span(min.y, max.y), span(min.z, max.z)];
        let cells = spans
            .iter()
            .try_fold(1u64, |acc, &s| acc.checked_mul(s))
            .ok_or_else(|| too_large(u64::MAX))?;
        if cells > options.max_dense_cells {
            return Err(too_large(cells));
        }

        let axis = |s: u64| u32::try_from(s).map_err(|_| too_large(cells));
        let extent = UVec3::new(axis(spans[0])?, axis(spans[1])?, axis(spans[2])?);
        let len = usize::try_from(cells)
            .ok()
            .and_then(|c| c.checked_mul(CHANNELS))
            .ok_or_else(|| too_large(cells))?;

        let mut field = Self {
            origin: min,
            extent,
            buffer: VoxelBuffer::zeroed(sparse.encoding, len),
        };

        for record in &sparse.records {
            // Every record lies inside the box it helped compute.
            let Some(base) = field.index_of(record.position) else {
                continue;
            };
            let [r, g, b, a] = record.color.to_array();
            let gbra = [g, b, r, a];
            match &mut field.buffer {
                VoxelBuffer::Float(data) => data[base..base + CHANNELS].copy_from_slice(&gbra),
                VoxelBuffer::Byte(data) => {
                    for (dst, v) in data[base..base + CHANNELS].iter_mut().zip(gbra) {
                        *dst = quantize(v);
                    }
                }
            }
        }

        Ok(field)
    }

    /// Minimum corner of the bounding box in container coordinates.
    #[must_use]
    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// Voxel extents per axis.
    #[must_use]
    pub fn extent(&self) -> UVec3 {
        self.extent
    }

    #[must_use]
    pub fn buffer(&self) -> &VoxelBuffer {
        &self.buffer
    }

    /// Number of voxels (not channels) in the field.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.buffer.len() / CHANNELS
    }

    #[must_use]
    pub fn texel_format(&self) -> TexelFormat {
        match self.buffer {
            VoxelBuffer::Float(_) => TexelFormat::Rgba32Float,
            VoxelBuffer::Byte(_) => TexelFormat::Rgba8Unorm,
        }
    }

    /// Raw bytes for upload, in native endianness.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            VoxelBuffer::Float(data) => bytemuck::cast_slice(data),
            VoxelBuffer::Byte(data) => data,
        }
    }

    /// Index of the first channel of the voxel at `position`, if inside the field.
    #[must_use]
    pub fn index_of(&self, position: IVec3) -> Option<usize> {
        let local = position.as_i64vec3() - self.origin.as_i64vec3();
        let (x, y, z) = (
            u64::try_from(local.x).ok()?,
            u64::try_from(local.y).ok()?,
            u64::try_from(local.z).ok()?,
        );
        let extent = self.extent.as_u64vec3();
        if x >= extent.x || y >= extent.y || z >= extent.z {
            return None;
        }
        let block = (z * extent.y + y) * extent.x + x;
        usize::try_from(block).ok()?.checked_mul(CHANNELS)
    }

    /// Stored channel block (`g, b, r, a`) at `position`, normalized to floats.
    #[must_use]
    pub fn voxel(&self, position: IVec3) -> Option<[f32; 4]> {
        let base = self.index_of(position)?;
        Some(match &self.buffer {
            VoxelBuffer::Float(data) => [data[base], data[base + 1], data[base + 2], data[base + 3]],
            VoxelBuffer::Byte(data) => {
                let block = [data[base], data[base + 1], data[base + 2], data[base + 3]];
                block.map(|c| f32::from(c) / 255.0)
            }
        })
    }
}

/// Re-quantize a normalized channel to a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(v: f32) -> u8 {
    (v * 255.0).round() as u8
}
