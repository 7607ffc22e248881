#[cfg(feature = "integration-tests")]
use crate::common::test_utils::waving_model;
#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn headless(clear_colour: wgpu::Color) -> vale_ngin::context::Context {
    use vale_ngin::{config::EngineSettings, context::Context};

    let settings = EngineSettings {
        clear_colour,
        ..Default::default()
    };
    futures::executor::block_on(Context::headless(settings, 64, 64)).unwrap()
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use vale_ngin::{flow, scene::Scene};

    let mut ctx = headless(wgpu::Color::WHITE);
    let (width, height) = ctx.size();
    let scene = Scene::new(&ctx.settings, width, height);

    let image = flow::render_to_image(&mut ctx, &scene).unwrap();
    assert_eq!(image.dimensions(), (64, 64));
    assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_draw_a_model_in_front_of_the_camera() {
    use cgmath::Vector3;
    use vale_ngin::{
        data_structures::{model::RenderObject, transform::Movable},
        flow,
        render::ShaderProgram,
        scene::Scene,
    };

    let mut ctx = headless(wgpu::Color::BLUE);
    let (width, height) = ctx.size();
    let mut scene = Scene::new(&ctx.settings, width, height);

    let mut object = RenderObject::from_imported(waving_model(), ShaderProgram::Normal);
    for material in object.materials_mut() {
        material.two_sided = true;
    }
    futures::executor::block_on(object.upload(&ctx.device, &ctx.queue, &ctx.layouts.material)).unwrap();
    object.set_position(Vector3::new(0.0, 0.0, 5.0));
    object.group_mut().scale = Vector3::new(2.0, 2.0, 2.0);
    scene.add(object);

    let image = flow::render_to_image(&mut ctx, &scene).unwrap();
    let centre = image.get_pixel(32, 32).0;
    assert_ne!(centre, [0, 0, 255, 255]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_particles_and_terrain_without_errors() {
    use cgmath::Vector3;
    use vale_ngin::{
        data_structures::{
            particle_system::{ParticleSettings, ParticleSystem},
            terrain::{HeightField, Terrain, TerrainSettings},
        },
        flow,
        scene::Scene,
    };

    let mut ctx = headless(wgpu::Color::BLACK);
    let (width, height) = ctx.size();
    let mut scene = Scene::new(&ctx.settings, width, height);

    let field = HeightField::from_elevations(4, 4, vec![0.0; 16]).unwrap();
    let mut terrain = Terrain::new(
        field,
        TerrainSettings {
            water_level: 1.0,
            ..Default::default()
        },
    )
    .unwrap();
    futures::executor::block_on(terrain.upload(&ctx.device, &ctx.queue, &ctx.layouts.material)).unwrap();
    scene.add(terrain);

    let mut particles = ParticleSystem::with_seed(Vector3::new(0.0, 0.0, 3.0), ParticleSettings::default(), 1);
    particles.set_max_particles(8);
    particles.upload(&ctx.device);
    particles.spawn(20);
    scene.add(particles);

    let image = flow::render_to_image(&mut ctx, &scene).unwrap();
    assert_eq!(image.dimensions(), (64, 64));
}
