use glam::{Affine3A, Mat4, Quat, Vec3};
use myth_scenegraph::scene::{CachedTransformations, Feature, Scene3D};

/// Keeps the world-space position of its object up to date.
#[derive(Default)]
struct WorldPosition {
    position: Vec3,
}

impl Feature<Affine3A> for WorldPosition {
    fn cached_transformations(&self) -> CachedTransformations {
        CachedTransformations::ABSOLUTE
    }

    fn clean(&mut self, absolute: &Mat4) {
        self.position = absolute.w_axis.truncate();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 1. A small solar system: sun -> planet -> moon
    let mut scene = Scene3D::new();
    let sun = scene.add_object(scene.root())?;
    let planet = scene.add_object_with(sun, Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)))?;
    let moon = scene.add_object_with(planet, Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0)))?;

    let tracker = scene.add_feature(moon, WorldPosition::default())?;

    // 2. Spin the sun and refresh only what the moon depends on
    let step = Affine3A::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
    for frame in 0..4 {
        scene.transform_local(sun, &step)?;
        let stats = scene.set_clean(moon);

        let position = scene
            .feature::<WorldPosition>(tracker)
            .map(|feature| feature.position)
            .unwrap_or_default();
        println!(
            "frame {frame}: moon at {position:.3} ({} objects cleaned)",
            stats.objects_cleaned
        );
    }

    // 3. Re-parent the moon to the sun without moving it
    scene.set_parent_keep_transformation(moon, sun)?;
    scene.set_clean_all();
    println!(
        "after re-parenting: moon at {:.3}",
        scene.absolute_transformation(moon)?.translation
    );

    Ok(())
}
