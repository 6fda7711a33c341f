//! The in-memory scene graph produced by a load.

use std::io::{Read, Seek};

use onefile_decode::{
    Container, DecodeOptions, Scene, Texture, Volume, assemble_texture, read_header, voxel_region,
};

use crate::error::{Error, Result};

/// Volume parameter holding the id of the bound texture.
pub const TEXTURE_BINDING_KEY: &str = "TEXTURE_ID_0";

/// One decoded container: the scene, its volumes and textures in header
/// order.
///
/// A model is immutable once built; loads replace it as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneModel {
    scene: Scene,
    volumes: Vec<Volume>,
    textures: Vec<Texture>,
}

impl SceneModel {
    #[must_use]
    pub fn new(scene: Scene, volumes: Vec<Volume>, textures: Vec<Texture>) -> Self {
        Self {
            scene,
            volumes,
            textures,
        }
    }

    /// Decode a container, checking `cancelled` before each texture.
    pub fn decode<R: Read + Seek>(
        mut reader: R,
        options: &DecodeOptions,
        cancelled: impl Fn() -> bool,
    ) -> Result<Self> {
        if cancelled() {
            return Err(Error::Cancelled);
        }

        let header = read_header(&mut reader)?;
        tracing::debug!(
            "Decoded header: version={}, scene='{}', {} volumes, {} textures",
            header.version,
            header.scene.name,
            header.volumes.len(),
            header.textures.len()
        );

        let mut stream = voxel_region(&mut reader, &header)?;
        let mut textures = Vec::with_capacity(header.textures.len());
        for texture_header in &header.textures {
            if cancelled() {
                return Err(Error::Cancelled);
            }
            let texture = assemble_texture(&mut stream, texture_header, options)?;
            tracing::debug!(
                "Assembled texture {} '{}': {}x{}x{} ({:?})",
                texture.id,
                texture.name,
                texture.size_x(),
                texture.size_y(),
                texture.size_z(),
                texture.field.texel_format()
            );
            textures.push(texture);
        }

        Ok(Self::new(header.scene, header.volumes, textures))
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    #[must_use]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// True when there are no volumes and no textures.
    ///
    /// Holds for the model before a load and after a failed one, but also
    /// for a container that declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty() && self.textures.is_empty()
    }

    /// Index of the texture bound to `volume`, if any.
    ///
    /// The binding is the integer in the volume's `TEXTURE_ID_0` parameter;
    /// the first texture with that id wins. A missing or unparsable
    /// parameter means no texture.
    #[must_use]
    pub fn texture_index_for_volume(&self, volume: &Volume) -> Option<usize> {
        let id: i64 = volume.params.parse_value(TEXTURE_BINDING_KEY)?;
        self.textures.iter().position(|texture| texture.id == id)
    }

    /// The texture bound to `volume`, if any.
    #[must_use]
    pub fn texture_for_volume(&self, volume: &Volume) -> Option<&Texture> {
        self.texture_index_for_volume(volume)
            .map(|index| &self.textures[index])
    }
}

impl From<Container> for SceneModel {
    fn from(container: Container) -> Self {
        Self::new(container.scene, container.volumes, container.textures)
    }
}
