//! Container header location and record decoding.
//!
//! # Layout
//!
//! ```text
//! offset 0                                   header_start            end-8   end
//! | voxel blocks, one per texture (header order) | header records ... | i64 header_len |
//! ```
//!
//! `header_start = file_size - header_len - 8`. The header holds, in order:
//! signature (`i32`), version (`i32`), the scene record, a volume count and
//! records, and a texture count and records. Every record is
//! `{ i64 id, string name, string params }`.

use std::io::{Read, Seek, SeekFrom, Take};

use crate::error::{DecodeError, DecodeResult};
use crate::params::Params;
use crate::reader::RecordReader;
use crate::voxels::assemble_texture;
use crate::{DecodeOptions, Scene, Texture, TextureHeader, Volume};

/// Signature that opens every header region.
pub const SIGNATURE: i32 = 102_380;

/// Size of the trailing header-length field.
pub const TRAILER_LEN: u64 = 8;

/// Decoded header region.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHeader {
    /// Format version. Any value is accepted.
    pub version: i32,
    /// Byte offset of the header region; the voxel stream ends here.
    pub header_start: u64,
    pub scene: Scene,
    pub volumes: Vec<Volume>,
    pub textures: Vec<TextureHeader>,
}

/// A fully decoded container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub version: i32,
    pub scene: Scene,
    pub volumes: Vec<Volume>,
    pub textures: Vec<Texture>,
}

/// Find the header region from the trailer.
///
/// Returns `(header_start, header_len)`.
fn locate_header<R: Read + Seek>(reader: &mut R) -> DecodeResult<(u64, u64)> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    if file_size < TRAILER_LEN {
        return Err(DecodeError::Truncated { offset: file_size });
    }

    reader.seek(SeekFrom::Start(file_size - TRAILER_LEN))?;
    let header_len = RecordReader::new(reader.by_ref()).read_i64()?;
    let len = u64::try_from(header_len).map_err(|_| DecodeError::InvalidHeaderLength(header_len))?;

    let start = i128::from(file_size) - i128::from(TRAILER_LEN) - i128::from(len);
    let start = u64::try_from(start)
        .map_err(|_| DecodeError::NegativeHeaderOffset(i64::try_from(start).unwrap_or(i64::MIN)))?;
    Ok((start, len))
}

fn read_record<R: Read>(reader: &mut RecordReader<R>) -> DecodeResult<(i64, String, Params)> {
    let id = reader.read_i64()?;
    let name = reader.read_string()?;
    let params = Params::parse(&reader.read_string()?);
    Ok((id, name, params))
}

/// Locate, validate, and decode the header records.
///
/// Reads are confined to the header region. The reader is left positioned
/// somewhere inside it.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> DecodeResult<ContainerHeader> {
    let (header_start, header_len) = locate_header(reader)?;
    reader.seek(SeekFrom::Start(header_start))?;
    let mut r = RecordReader::new(reader.by_ref().take(header_len));

    let signature = r.read_i32()?;
    if signature != SIGNATURE {
        return Err(DecodeError::BadSignature {
            found: signature,
            expected: SIGNATURE,
        });
    }
    let version = r.read_i32()?;

    let (id, name, params) = read_record(&mut r)?;
    let scene = Scene { id, name, params };

    let volume_count = r.read_count("volume")?;
    let volumes = (0..volume_count)
        .map(|_| read_record(&mut r).map(|(id, name, params)| Volume { id, name, params }))
        .collect::<DecodeResult<Vec<_>>>()?;

    let texture_count = r.read_count("texture")?;
    let textures = (0..texture_count)
        .map(|_| {
            read_record(&mut r).map(|(id, name, params)| TextureHeader { id, name, params })
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(ContainerHeader {
        version,
        header_start,
        scene,
        volumes,
        textures,
    })
}

/// Rewind to offset zero and return a reader over the voxel stream.
///
/// The stream is limited to the bytes before the header region.
pub fn voxel_region<'a, R: Read + Seek>(
    reader: &'a mut R,
    header: &ContainerHeader,
) -> DecodeResult<RecordReader<Take<&'a mut R>>> {
    reader.seek(SeekFrom::Start(0))?;
    Ok(RecordReader::new(reader.take(header.header_start)))
}

/// Decode a whole container: header, then every texture's dense field in
/// header order.
pub fn decode_container<R: Read + Seek>(
    mut reader: R,
    options: &DecodeOptions,
) -> DecodeResult<Container> {
    let header = read_header(&mut reader)?;
    let mut stream = voxel_region(&mut reader, &header)?;
    let textures = header
        .textures
        .iter()
        .map(|texture| assemble_texture(&mut stream, texture, options))
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(Container {
        version: header.version,
        scene: header.scene,
        volumes: header.volumes,
        textures,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use glam::{IVec3, UVec3};

    use super::*;
    use crate::fixture::{ContainerBuilder, FixtureTexture};

    fn sample() -> ContainerBuilder {
        ContainerBuilder::new(1, "scene", "EMISSION:2.0!@OPACITY:300")
            .volume(10, "outer", "TEXTURE_ID_0:100!@ORDER:0")
            .volume(11, "inner", "TEXTURE_ID_0:101!@ORDER:1")
            .texture(
                FixtureTexture::float(100, "density")
                    .voxel([0, 0, 0], [0.1, 0.2, 0.3, 0.4])
                    .voxel([1, 1, 1], [1.0, 1.0, 1.0, 1.0]),
            )
            .texture(FixtureTexture::byte(101, "color").voxel_bytes([5, 6, 7], [255, 0, 0, 255]))
    }

    #[test]
    fn decodes_header_records() {
        let bytes = sample().build();
        let header = read_header(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.scene.id, 1);
        assert_eq!(header.scene.name, "scene");
        assert_eq!(header.scene.params.get("OPACITY"), Some("300"));
        assert_eq!(header.volumes.len(), 2);
        assert_eq!(header.volumes[1].name, "inner");
        assert_eq!(header.volumes[1].params.get("TEXTURE_ID_0"), Some("101"));
        assert_eq!(header.textures.len(), 2);
        assert_eq!(header.textures[0].params.get("TYPE"), Some("RGBA_FLOAT"));
    }

    #[test]
    fn decodes_textures_in_header_order() {
        let container = decode_container(Cursor::new(sample().build()), &DecodeOptions::default())
            .unwrap();
        assert_eq!(container.textures.len(), 2);

        let density = &container.textures[0];
        assert!(density.is_float());
        assert_eq!(density.field.extent(), UVec3::splat(2));
        assert_eq!(density.field.voxel(IVec3::ZERO), Some([0.2, 0.3, 0.1, 0.4]));

        let color = &container.textures[1];
        assert!(!color.is_float());
        assert_eq!(color.field.extent(), UVec3::ONE);
        assert_eq!(color.field.origin(), IVec3::new(5, 6, 7));
        assert_eq!(color.field.as_bytes(), &[0u8, 0, 255, 255]);
    }

    #[test]
    fn unknown_version_is_accepted() {
        let bytes = sample().version(42).build();
        let container =
            decode_container(Cursor::new(bytes), &DecodeOptions::default()).unwrap();
        assert_eq!(container.version, 42);
    }

    #[test]
    fn bad_signature_fails() {
        let bytes = sample().signature(12345).build();
        assert!(matches!(
            read_header(&mut Cursor::new(bytes)),
            Err(DecodeError::BadSignature {
                found: 12345,
                expected: SIGNATURE
            })
        ));
    }

    #[test]
    fn header_longer_than_file_is_negative_offset() {
        let mut bytes = vec![0u8; 16];
        bytes.extend_from_slice(&1000i64.to_be_bytes());
        assert!(matches!(
            read_header(&mut Cursor::new(bytes)),
            Err(DecodeError::NegativeHeaderOffset(-984))
        ));
    }

    #[test]
    fn negative_header_length_is_rejected() {
        let bytes = (-4i64).to_be_bytes().to_vec();
        assert!(matches!(
            read_header(&mut Cursor::new(bytes)),
            Err(DecodeError::InvalidHeaderLength(-4))
        ));
    }

    #[test]
    fn file_shorter_than_trailer_is_truncated() {
        assert!(matches!(
            read_header(&mut Cursor::new(vec![0u8; 5])),
            Err(DecodeError::Truncated { offset: 5 })
        ));
    }

    #[test]
    fn texture_id_mismatch_fails_whole_decode() {
        let bytes = sample()
            .texture(FixtureTexture::float(102, "third").stream_id(999))
            .build();
        assert!(matches!(
            decode_container(Cursor::new(bytes), &DecodeOptions::default()),
            Err(DecodeError::TextureIdMismatch {
                expected: 102,
                found: 999
            })
        ));
    }

    #[test]
    fn voxel_stream_cannot_run_into_header() {
        // Header declares a texture whose voxel block is missing entirely.
        let bytes = ContainerBuilder::new(1, "scene", "")
            .texture(FixtureTexture::float(5, "ghost").omit_stream())
            .build();
        assert!(matches!(
            decode_container(Cursor::new(bytes), &DecodeOptions::default()),
            Err(DecodeError::Truncated { offset: 0 })
        ));
    }

    #[test]
    fn header_records_are_confined_to_header_region() {
        // Cut the end of the last record and shrink the declared length to
        // match: the header start is unchanged but the final string would
        // now have to borrow bytes from the trailer.
        let bytes = sample().build();
        let len = bytes.len();
        let header_len = i64::from_be_bytes(bytes[len - 8..].try_into().unwrap());
        let header_end = len - 8;
        let mut cut = bytes[..header_end - 4].to_vec();
        cut.extend_from_slice(&(header_len - 4).to_be_bytes());
        assert!(matches!(
            read_header(&mut Cursor::new(cut)),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_scene_decodes() {
        let bytes = ContainerBuilder::new(7, "", "").build();
        let container =
            decode_container(Cursor::new(bytes), &DecodeOptions::default()).unwrap();
        assert_eq!(container.scene.id, 7);
        assert!(container.volumes.is_empty());
        assert!(container.textures.is_empty());
    }
}
