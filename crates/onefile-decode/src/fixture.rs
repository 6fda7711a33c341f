//! In-memory container builder for tests and tooling.
//!
//! Produces the byte layout [`crate::decode_container`] reads: voxel blocks
//! from offset zero, the header region, then the trailer. Builder knobs can
//! deliberately break the format (wrong signature, wrong stream id, missing
//! voxel block) to exercise failure paths.

use crate::container::SIGNATURE;

#[derive(Debug, Clone, Copy)]
enum FixtureColor {
    Float([f32; 4]),
    Byte([u8; 4]),
}

/// One texture's header record and voxel block.
#[derive(Debug, Clone)]
pub struct FixtureTexture {
    id: i64,
    stream_id: i64,
    name: String,
    params: String,
    voxels: Vec<([i32; 3], FixtureColor)>,
    write_stream: bool,
}

impl FixtureTexture {
    /// Texture declared `TYPE:RGBA_FLOAT`.
    #[must_use]
    pub fn float(id: i64, name: &str) -> Self {
        Self::with_params(id, name, "TYPE:RGBA_FLOAT")
    }

    /// Texture declared `TYPE:RGBA8`, stored as normalized bytes.
    #[must_use]
    pub fn byte(id: i64, name: &str) -> Self {
        Self::with_params(id, name, "TYPE:RGBA8")
    }

    #[must_use]
    pub fn with_params(id: i64, name: &str, params: &str) -> Self {
        Self {
            id,
            stream_id: id,
            name: name.to_owned(),
            params: params.to_owned(),
            voxels: Vec::new(),
            write_stream: true,
        }
    }

    /// Append a voxel with float channels (`r, g, b, a`).
    #[must_use]
    pub fn voxel(mut self, position: [i32; 3], rgba: [f32; 4]) -> Self {
        self.voxels.push((position, FixtureColor::Float(rgba)));
        self
    }

    /// Append a voxel with byte channels (`r, g, b, a`).
    #[must_use]
    pub fn voxel_bytes(mut self, position: [i32; 3], rgba: [u8; 4]) -> Self {
        self.voxels.push((position, FixtureColor::Byte(rgba)));
        self
    }

    /// Write a different id at the start of the voxel block.
    #[must_use]
    pub fn stream_id(mut self, id: i64) -> Self {
        self.stream_id = id;
        self
    }

    /// Declare the texture in the header but write no voxel block.
    #[must_use]
    pub fn omit_stream(mut self) -> Self {
        self.write_stream = false;
        self
    }
}

/// Builder for a complete container.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    signature: i32,
    version: i32,
    scene: (i64, String, String),
    volumes: Vec<(i64, String, String)>,
    textures: Vec<FixtureTexture>,
}

impl ContainerBuilder {
    #[must_use]
    pub fn new(scene_id: i64, scene_name: &str, scene_params: &str) -> Self {
        Self {
            signature: SIGNATURE,
            version: 1,
            scene: (scene_id, scene_name.to_owned(), scene_params.to_owned()),
            volumes: Vec::new(),
            textures: Vec::new(),
        }
    }

    #[must_use]
    pub fn signature(mut self, signature: i32) -> Self {
        self.signature = signature;
        self
    }

    #[must_use]
    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn volume(mut self, id: i64, name: &str, params: &str) -> Self {
        self.volumes.push((id, name.to_owned(), params.to_owned()));
        self
    }

    #[must_use]
    pub fn texture(mut self, texture: FixtureTexture) -> Self {
        self.textures.push(texture);
        self
    }

    /// Serialize the container.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for texture in self.textures.iter().filter(|t| t.write_stream) {
            put_i64(&mut out, texture.stream_id);
            put_count(&mut out, texture.voxels.len());
            for (position, color) in &texture.voxels {
                for c in position {
                    out.extend_from_slice(&c.to_be_bytes());
                }
                match color {
                    FixtureColor::Float(rgba) => {
                        for c in rgba {
                            out.extend_from_slice(&c.to_be_bytes());
                        }
                    }
                    FixtureColor::Byte(rgba) => out.extend_from_slice(rgba),
                }
            }
        }

        let mut header = Vec::new();
        header.extend_from_slice(&self.signature.to_be_bytes());
        header.extend_from_slice(&self.version.to_be_bytes());
        put_record(&mut header, self.scene.0, &self.scene.1, &self.scene.2);
        put_count(&mut header, self.volumes.len());
        for (id, name, params) in &self.volumes {
            put_record(&mut header, *id, name, params);
        }
        put_count(&mut header, self.textures.len());
        for texture in &self.textures {
            put_record(&mut header, texture.id, &texture.name, &texture.params);
        }

        let header_len = i64::try_from(header.len()).unwrap_or(i64::MAX);
        out.extend_from_slice(&header);
        put_i64(&mut out, header_len);
        out
    }
}

fn put_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_count(out: &mut Vec<u8>, n: usize) {
    let n = i32::try_from(n).unwrap_or(i32::MAX);
    out.extend_from_slice(&n.to_be_bytes());
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    let len = u16::try_from(s.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&s.as_bytes()[..usize::from(len)]);
}

fn put_record(out: &mut Vec<u8>, id: i64, name: &str, params: &str) {
    put_i64(out, id);
    put_string(out, name);
    put_string(out, params);
}
