//! Per-volume render order and transforms.
//!
//! Volumes are composited in ascending `ORDER`: the lowest order is the
//! outermost shell. Each active volume contributes a model transform built
//! from its `SCALE_*`, `ROT_*` and `OFFSET_*` parameters along with blend
//! settings the renderer applies per layer.

use glam::{Mat4, Vec3};
use onefile_decode::{Params, Volume};

use crate::model::SceneModel;

/// Most volumes a nested composite can hold.
pub const MAX_COMPOSITE_VOLUMES: usize = 10;

const DEFAULT_EMISSION: f32 = 1.0;
const DEFAULT_OPACITY: f32 = 600.0;

/// How volumes are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompositeMode {
    /// Up to [`MAX_COMPOSITE_VOLUMES`] volumes layered by `ORDER`.
    #[default]
    Nested,
    /// Only the first declared volume, with its own shading overrides.
    Single,
}

/// Scene-wide emission and opacity scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneShading {
    pub emission: f32,
    pub opacity: f32,
}

impl SceneShading {
    /// Read `EMISSION` and `OPACITY` from scene parameters.
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        Self {
            emission: params.get_f32("EMISSION", DEFAULT_EMISSION),
            opacity: params.get_f32("OPACITY", DEFAULT_OPACITY),
        }
    }

    /// These values with any `EMISSION`/`OPACITY` in `params` taking precedence.
    #[must_use]
    pub fn overridden_by(self, params: &Params) -> Self {
        Self {
            emission: params.get_f32("EMISSION", self.emission),
            opacity: params.get_f32("OPACITY", self.opacity),
        }
    }
}

impl Default for SceneShading {
    fn default() -> Self {
        Self {
            emission: DEFAULT_EMISSION,
            opacity: DEFAULT_OPACITY,
        }
    }
}

/// One active volume in a composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeEntry {
    /// Index into [`SceneModel::volumes`].
    pub volume_index: usize,
    /// Index into [`SceneModel::textures`] of the bound texture.
    pub texture_index: usize,
    pub transform: Mat4,
    pub inverse_transform: Mat4,
    pub emission: f32,
    pub opacity: f32,
    pub blend: f32,
    pub replace: bool,
    mode: CompositeMode,
}

impl CompositeEntry {
    /// Matrix placing this volume's bounding box overlay.
    #[must_use]
    pub fn bounds_transform(&self) -> Mat4 {
        match self.mode {
            CompositeMode::Nested => self.inverse_transform,
            CompositeMode::Single => self.transform,
        }
    }
}

/// Active volumes in render order.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub mode: CompositeMode,
    pub shading: SceneShading,
    pub entries: Vec<CompositeEntry>,
}

impl Composite {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn axis_params(params: &Params, prefix: &str, default: f32) -> Vec3 {
    Vec3::new(
        params.get_f32(&format!("{prefix}_X"), default),
        params.get_f32(&format!("{prefix}_Y"), default),
        params.get_f32(&format!("{prefix}_Z"), default),
    )
}

/// Model transform for a volume.
///
/// Scales by the reciprocal of `SCALE_*`, rotates by `ROT_*` degrees about
/// X then Y then Z, and translates by `-0.5 * OFFSET_*`, composed so the
/// translation is the rightmost factor. A zero or non-finite scale is
/// treated as `1.0`.
#[must_use]
pub fn volume_transform(params: &Params) -> Mat4 {
    let scale = axis_params(params, "SCALE", 1.0);
    let scale = Vec3::new(
        if scale.x.is_normal() { scale.x } else { 1.0 },
        if scale.y.is_normal() { scale.y } else { 1.0 },
        if scale.z.is_normal() { scale.z } else { 1.0 },
    );
    let rotation = axis_params(params, "ROT", 0.0);
    let offset = axis_params(params, "OFFSET", 0.0);

    Mat4::from_scale(scale.recip())
        * Mat4::from_rotation_x(rotation.x.to_radians())
        * Mat4::from_rotation_y(rotation.y.to_radians())
        * Mat4::from_rotation_z(rotation.z.to_radians())
        * Mat4::from_translation(-0.5 * offset)
}

fn entry(
    model: &SceneModel,
    volume_index: usize,
    volume: &Volume,
    shading: SceneShading,
    mode: CompositeMode,
) -> Option<CompositeEntry> {
    let texture_index = model.texture_index_for_volume(volume)?;
    let transform = volume_transform(&volume.params);
    Some(CompositeEntry {
        volume_index,
        texture_index,
        transform,
        inverse_transform: transform.inverse(),
        emission: shading.emission,
        opacity: shading.opacity,
        blend: volume.params.get_f32("BLEND", 0.0),
        replace: volume.params.get_bool("REPLACE", false),
        mode,
    })
}

/// Build the composite for `model`.
///
/// In [`CompositeMode::Nested`] volumes are stably sorted by `ORDER`
/// (default `0`) and the first [`MAX_COMPOSITE_VOLUMES`] with a bound
/// texture are kept; unbound volumes do not take a slot. In
/// [`CompositeMode::Single`] only the first declared volume is considered.
#[must_use]
pub fn composite(model: &SceneModel, mode: CompositeMode) -> Composite {
    let shading = SceneShading::from_params(&model.scene().params);
    let volumes = model.volumes();

    let entries = match mode {
        CompositeMode::Nested => {
            let mut order: Vec<usize> = (0..volumes.len()).collect();
            order.sort_by_key(|&i| volumes[i].params.get_i32("ORDER", 0));
            order
                .into_iter()
                .filter_map(|i| entry(model, i, &volumes[i], shading, mode))
                .take(MAX_COMPOSITE_VOLUMES)
                .collect()
        }
        CompositeMode::Single => volumes
            .first()
            .and_then(|volume| {
                let shading = shading.overridden_by(&volume.params);
                entry(model, 0, volume, shading, mode)
            })
            .into_iter()
            .collect(),
    };

    Composite {
        mode,
        shading,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;
    use onefile_decode::{Scene, Texture, TextureHeader};

    use super::*;

    fn texture(id: i64) -> Texture {
        let header = TextureHeader {
            id,
            name: format!("t{id}"),
            params: Params::parse("TYPE:RGBA_FLOAT"),
        };
        Texture {
            id,
            name: header.name.clone(),
            params: header.params.clone(),
            field: onefile_decode::DenseField::empty(header.encoding()),
        }
    }

    fn volume(id: i64, params: &str) -> Volume {
        Volume {
            id,
            name: format!("v{id}"),
            params: Params::parse(params),
        }
    }

    fn model(scene_params: &str, volumes: Vec<Volume>, textures: Vec<Texture>) -> SceneModel {
        let scene = Scene {
            id: 1,
            name: "scene".into(),
            params: Params::parse(scene_params),
        };
        SceneModel::new(scene, volumes, textures)
    }

    fn ids(model: &SceneModel, composite: &Composite) -> Vec<i64> {
        composite
            .entries
            .iter()
            .map(|e| model.volumes()[e.volume_index].id)
            .collect()
    }

    #[test]
    fn nested_order_is_ascending() {
        let model = model(
            "",
            vec![
                volume(1, "TEXTURE_ID_0:10!@ORDER:3"),
                volume(2, "TEXTURE_ID_0:10!@ORDER:1"),
                volume(3, "TEXTURE_ID_0:10!@ORDER:2"),
            ],
            vec![texture(10)],
        );
        let composite = composite(&model, CompositeMode::Nested);
        assert_eq!(ids(&model, &composite), [2, 3, 1]);
    }

    #[test]
    fn equal_orders_keep_declaration_order() {
        let model = model(
            "",
            vec![
                volume(1, "TEXTURE_ID_0:10"),
                volume(2, "TEXTURE_ID_0:10!@ORDER:-1"),
                volume(3, "TEXTURE_ID_0:10!@ORDER:0"),
            ],
            vec![texture(10)],
        );
        assert_eq!(ids(&model, &composite(&model, CompositeMode::Nested)), [2, 1, 3]);
    }

    #[test]
    fn nested_is_capped() {
        let volumes = (0..15)
            .map(|i| volume(i, &format!("TEXTURE_ID_0:10!@ORDER:{}", 15 - i)))
            .collect();
        let model = model("", volumes, vec![texture(10)]);
        let composite = composite(&model, CompositeMode::Nested);
        assert_eq!(composite.len(), MAX_COMPOSITE_VOLUMES);
        assert_eq!(ids(&model, &composite)[0], 14);
    }

    #[test]
    fn unbound_volumes_do_not_take_slots() {
        let mut volumes: Vec<Volume> = (0..5)
            .map(|i| volume(i, &format!("TEXTURE_ID_0:999!@ORDER:{i}")))
            .collect();
        volumes.extend((5..15).map(|i| volume(i, &format!("TEXTURE_ID_0:10!@ORDER:{i}"))));
        let model = model("", volumes, vec![texture(10)]);
        let composite = composite(&model, CompositeMode::Nested);
        assert_eq!(composite.len(), 10);
        assert_eq!(ids(&model, &composite), (5..15).collect::<Vec<_>>());
    }

    #[test]
    fn transform_scales_rotates_then_translates() {
        let params = Params::parse(
            "SCALE_X:2!@SCALE_Y:4!@SCALE_Z:0.5!@ROT_Z:90!@OFFSET_X:2!@OFFSET_Y:0!@OFFSET_Z:-4",
        );
        let transform = volume_transform(&params);

        // Translation first: origin moves to (-1, 0, 2), then rotates 90 degrees
        // about Z to (0, -1, 2), then scales by (0.5, 0.25, 2).
        let p = transform * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(p.truncate().abs_diff_eq(Vec3::new(0.0, -0.25, 4.0), 1e-5));

        let inverse = transform.inverse();
        assert!((inverse * transform).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn defaults_give_identity() {
        assert!(volume_transform(&Params::new()).abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(volume_transform(&Params::parse("SCALE_X:0!@SCALE_Y:abc"))
            .abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn nested_uses_scene_shading() {
        let model = model(
            "EMISSION:2.5",
            vec![volume(
                1,
                "TEXTURE_ID_0:10!@EMISSION:9!@BLEND:0.25!@REPLACE:TRUE",
            )],
            vec![texture(10)],
        );
        let composite = composite(&model, CompositeMode::Nested);
        assert_eq!(
            composite.shading,
            SceneShading {
                emission: 2.5,
                opacity: 600.0
            }
        );
        let entry = &composite.entries[0];
        assert_eq!(entry.emission, 2.5);
        assert_eq!(entry.opacity, 600.0);
        assert_eq!(entry.blend, 0.25);
        assert!(entry.replace);
        assert_eq!(entry.bounds_transform(), entry.inverse_transform);
    }

    #[test]
    fn single_mode_uses_first_volume_overrides() {
        let model = model(
            "EMISSION:2.5!@OPACITY:100",
            vec![
                volume(1, "TEXTURE_ID_0:10!@OPACITY:50!@ORDER:5!@SCALE_X:2"),
                volume(2, "TEXTURE_ID_0:10!@ORDER:0"),
            ],
            vec![texture(10)],
        );
        let composite = composite(&model, CompositeMode::Single);
        assert_eq!(ids(&model, &composite), [1]);
        let entry = &composite.entries[0];
        assert_eq!(entry.emission, 2.5);
        assert_eq!(entry.opacity, 50.0);
        assert!(!entry.replace);
        assert_eq!(entry.bounds_transform(), entry.transform);
    }

    #[test]
    fn single_mode_needs_bound_first_volume() {
        let model = model(
            "",
            vec![volume(1, "ORDER:0"), volume(2, "TEXTURE_ID_0:10")],
            vec![texture(10)],
        );
        assert!(composite(&model, CompositeMode::Single).is_empty());
        assert!(composite(&SceneModel::default(), CompositeMode::Single).is_empty());
    }
}
