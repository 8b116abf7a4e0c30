use std::path::Path;

use anyhow::{Context, Result};
use lumen_engine::scene::Scene;
use serde::{Deserialize, Serialize};

/// Human-readable description of a scene, written on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub cameras: Vec<CameraSnapshot>,
    pub objects: Vec<ObjectSnapshot>,
    pub images: Vec<ImageSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub name: String,
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub fov: f32,
    pub size: [u32; 2],
    /// Names of the linked objects, in draw order.
    pub objects: Vec<String>,
    pub tracks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub name: String,
    /// Column-major model matrix.
    pub model: [f32; 16],
    pub sideness: String,
    pub textures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSnapshot {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub format: String,
}

impl SceneSnapshot {
    pub fn capture(scene: &Scene) -> Self {
        let object_name = |id| scene.object(id).map(|o| o.name().to_string());
        let image_name = |id| scene.image(id).map(|i| i.name().to_string());

        let cameras = scene
            .cameras()
            .map(|(_, camera)| {
                let (w, h) = camera.size();
                CameraSnapshot {
                    name: camera.name().to_string(),
                    eye: camera.eye().to_array(),
                    target: camera.target().to_array(),
                    fov: camera.fov(),
                    size: [w, h],
                    objects: camera.objects().iter().filter_map(|&id| object_name(id)).collect(),
                    tracks: camera
                        .tracked()
                        .and_then(|id| scene.camera(id))
                        .map(|c| c.name().to_string()),
                }
            })
            .collect();

        let objects = scene
            .objects()
            .map(|(_, object)| ObjectSnapshot {
                name: object.name().to_string(),
                model: object.model().to_cols_array(),
                sideness: format!("{:?}", object.sideness()),
                textures: object.textures().iter().filter_map(|&id| image_name(id)).collect(),
            })
            .collect();

        let images = scene
            .images()
            .map(|(_, image)| {
                let spec = image.image().spec();
                ImageSnapshot {
                    name: image.name().to_string(),
                    width: spec.width,
                    height: spec.height,
                    channels: spec.channels,
                    format: format!("{:?}", spec.format),
                }
            })
            .collect();

        Self {
            cameras,
            objects,
            images,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to encode scene")?;
        std::fs::write(path, json).with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lumen_engine::image::Image;
    use lumen_engine::scene::{Camera, Object};

    use super::*;

    fn scene() -> Scene {
        let mut scene = Scene::new();
        let image = scene.add_image("pattern", Arc::new(Image::with_default_pattern()));
        let plane = scene.add_object(Object::plane("screen", 2.0, 2.0));
        scene.link_texture(plane, image);
        let main = scene.add_camera(Camera::new("main", 320, 240));
        let aux = scene.add_camera(Camera::new("aux", 64, 64));
        scene.link(main, plane.into());
        scene.link(main, aux.into());
        scene
    }

    #[test]
    fn capture_resolves_links_by_name() {
        let snap = SceneSnapshot::capture(&scene());
        let main = snap.cameras.iter().find(|c| c.name == "main").unwrap();
        assert_eq!(main.objects, ["screen"]);
        assert_eq!(main.tracks.as_deref(), Some("aux"));
        assert_eq!(main.size, [320, 240]);
        assert_eq!(snap.objects[0].textures, ["pattern"]);
        assert_eq!(snap.objects[0].sideness, "DoubleSided");
        assert_eq!(snap.images[0].width, 512);
    }

    #[test]
    fn json_keeps_every_field() {
        let snap = SceneSnapshot::capture(&scene());
        let json = serde_json::to_string(&snap).unwrap();
        let back: SceneSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
