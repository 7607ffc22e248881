use std::{cell::Cell, rc::Rc};

use approx::assert_relative_eq;
use cgmath::{Matrix4, Vector3};
use vale_ngin::{
    config::EngineSettings,
    data_structures::{
        day_cycle::DayCycle,
        light::Light,
        skybox::Skybox,
        transform::Movable,
    },
    render::{DrawCommand, DrawList, RenderBackend},
    scene::Scene,
};

use crate::common::test_utils::{Marker, Tracked};

mod common;

fn scene() -> Scene {
    Scene::new(&EngineSettings::default(), 800, 600)
}

#[test]
fn frame_starts_with_globals_and_the_skybox() {
    let mut scene = scene();
    scene.set_skybox(Skybox::new().unwrap());
    scene.add_object(Box::new(Marker::new("crate", Vector3::new(0.0, 0.0, 5.0))));
    scene.camera.borrow_mut().set_position(Vector3::new(1.0, 2.0, 3.0));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);

    let globals = list.globals().unwrap();
    assert_relative_eq!(globals.camera_position, Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(list.drawn_meshes(), vec!["skybox", "crate"]);

    // the sky follows the camera and is scaled to half the far plane
    let sky = list.mesh_transforms()[0].1;
    assert_relative_eq!(sky, Skybox::matrix(Vector3::new(1.0, 2.0, 3.0), 1000.0));
    assert_relative_eq!(
        sky,
        Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from_scale(500.0)
    );
}

#[test]
fn rendering_again_replaces_the_previous_frame() {
    let mut scene = scene();
    scene.add_object(Box::new(Marker::new("crate", Vector3::new(0.0, 0.0, 0.0))));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);
    scene.render(0.0, &mut list);
    assert_eq!(list.drawn_meshes(), vec!["crate"]);
}

#[test]
fn objects_render_in_insertion_order() {
    let mut scene = scene();
    scene.add(Marker::new("first", Vector3::new(0.0, 0.0, 0.0)));
    scene.add_object(Box::new(Marker::new("second", Vector3::new(0.0, 0.0, 0.0))));
    scene.add(Marker::new("third", Vector3::new(0.0, 0.0, 0.0)));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);
    assert_eq!(list.drawn_meshes(), vec!["first", "second", "third"]);
}

#[test]
fn shared_handles_move_scene_objects() {
    let mut scene = scene();
    let marker = scene.add(Marker::new("crate", Vector3::new(0.0, 0.0, 0.0)));
    marker.borrow_mut().group.set_position(Vector3::new(4.0, 0.0, 0.0));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);
    assert_relative_eq!(
        list.mesh_transforms()[0].1,
        Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0))
    );
}

#[test]
fn update_reaches_every_object() {
    let drops = Rc::new(Cell::new(0));
    let tracked = Tracked::new(&drops);
    let updates = tracked.updates.clone();

    let mut scene = scene();
    scene.add_object(Box::new(tracked));
    scene.update(0.1);
    scene.update(0.1);
    assert_eq!(updates.get(), 2);

    drop(scene);
    assert_eq!(drops.get(), 1);
}

#[test]
fn day_cycle_drives_the_ambient_light() {
    let mut scene = scene();
    scene.set_day_cycle(DayCycle::new(8.0, 1.0));
    assert_relative_eq!(scene.ambient_intensity, Vector3::new(0.6, 0.3, 0.3), epsilon = 1e-6);

    // six hours later it is midday
    scene.update(6.0);
    assert_relative_eq!(scene.ambient_intensity, Vector3::new(0.6, 0.6, 0.6), epsilon = 1e-5);
    assert_relative_eq!(
        scene.lights_uniform().ambient_intensity[1],
        0.6,
        epsilon = 1e-5
    );
}

#[test]
fn frame_globals_carry_the_lights() {
    let mut scene = scene();
    scene.add_light(Light::point(Vector3::new(1.0, 1.0, 1.0)));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);
    assert_eq!(list.globals().unwrap().lights.num_lights, 1);
}

#[test]
fn recorded_frames_interleave_matrices_and_draws() {
    let mut scene = scene();
    scene.add_object(Box::new(Marker::new("a", Vector3::new(0.0, 0.0, 0.0))));

    let mut list = DrawList::new();
    scene.render(0.0, &mut list);
    assert!(matches!(list.commands()[0], DrawCommand::ModelMatrices { .. }));
    assert!(matches!(list.commands()[1], DrawCommand::Mesh { .. }));

    list.begin_frame(&scene.frame_globals());
    assert!(list.commands().is_empty());
}
