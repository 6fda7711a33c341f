//! Print a JSON summary of a `.ONE` container.
//!
//! Lists the scene, every volume with its bound texture, every texture with
//! its dense extents and storage format, and the nested composite order.
//!
//! Run: `cargo run -p onefile --features test-tools --bin dump_scene -- <file.ONE> [--single]`

use std::env;

use onefile::{CompositeMode, DecodeOptions, SceneModel, composite, load_scene};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: dump_scene <file.ONE> [--single]");
        std::process::exit(2);
    };
    let mode = if args.iter().any(|a| a == "--single") {
        CompositeMode::Single
    } else {
        CompositeMode::Nested
    };

    let model = load_scene(path, &DecodeOptions::default())?;
    let summary = summarize(&model, mode);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn summarize(model: &SceneModel, mode: CompositeMode) -> serde_json::Value {
    let scene = model.scene();
    let params = |p: &onefile::Params| {
        p.iter()
            .map(|(k, v)| (k.to_owned(), serde_json::Value::from(v)))
            .collect::<serde_json::Map<_, _>>()
    };

    let volumes: Vec<_> = model
        .volumes()
        .iter()
        .map(|volume| {
            serde_json::json!({
                "id": volume.id,
                "name": volume.name,
                "params": params(&volume.params),
                "texture": model.texture_for_volume(volume).map(|t| t.id),
            })
        })
        .collect();

    let textures: Vec<_> = model
        .textures()
        .iter()
        .map(|texture| {
            let origin = texture.field.origin();
            serde_json::json!({
                "id": texture.id,
                "name": texture.name,
                "params": params(&texture.params),
                "format": format!("{:?}", texture.field.texel_format()),
                "origin": [origin.x, origin.y, origin.z],
                "size": [texture.size_x(), texture.size_y(), texture.size_z()],
                "bytes": texture.field.as_bytes().len(),
            })
        })
        .collect();

    let composite = composite(model, mode);
    let entries: Vec<_> = composite
        .entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "volume": model.volumes()[entry.volume_index].id,
                "texture": model.textures()[entry.texture_index].id,
                "transform": entry.transform.to_cols_array(),
                "emission": entry.emission,
                "opacity": entry.opacity,
                "blend": entry.blend,
                "replace": entry.replace,
            })
        })
        .collect();

    serde_json::json!({
        "scene": {
            "id": scene.id,
            "name": scene.name,
            "params": params(&scene.params),
        },
        "volumes": volumes,
        "textures": textures,
        "composite": {
            "mode": format!("{mode:?}"),
            "emission": composite.shading.emission,
            "opacity": composite.shading.opacity,
            "entries": entries,
        },
    })
}
