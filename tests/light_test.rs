use approx::assert_relative_eq;
use cgmath::Vector3;
use vale_ngin::{
    config::EngineSettings,
    data_structures::{
        light::{Light, LightType, LightsUniform, MAX_NUM_LIGHTS, attenuation_for},
        model::RenderObject,
        transform::Movable,
    },
    render::ShaderProgram,
    scene::Scene,
};

use crate::common::{log_capture::warnings_during, test_utils::waving_model};

mod common;

#[test]
fn lights_past_the_cap_are_dropped() {
    let mut scene = Scene::new(&EngineSettings::default(), 640, 480);
    let (_, warnings) = warnings_during(|| {
        for i in 0..6 {
            let light = scene.add_light(Light::point(Vector3::new(1.0, 1.0, 1.0)));
            light.borrow_mut().set_position(Vector3::new(i as f32, 0.0, 0.0));
        }
    });
    assert_eq!(scene.lights().len(), 6);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("only the first 4 are used"));

    let (uniform, warnings) = warnings_during(|| {
        scene.lights_uniform();
        scene.lights_uniform()
    });
    // nothing more is reported frame after frame
    assert!(warnings.is_empty());
    assert_eq!(uniform.num_lights as usize, MAX_NUM_LIGHTS);
    // the first registered lights win
    let xs: Vec<f32> = uniform.active().iter().map(|l| l.position[0]).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn configured_light_limit_is_respected() {
    let settings = EngineSettings {
        max_lights: 2,
        ..Default::default()
    };
    let mut scene = Scene::new(&settings, 640, 480);
    for _ in 0..3 {
        scene.add_light(Light::point(Vector3::new(1.0, 1.0, 1.0)));
    }
    assert_eq!(scene.lights_uniform().num_lights, 2);
}

#[test]
fn uniform_packs_ambient_and_attenuation() {
    let uniform = LightsUniform::new(&[], Vector3::new(0.1, 0.2, 0.3), 0.5);
    assert_eq!(uniform.num_lights, 0);
    assert!(uniform.active().is_empty());
    assert_eq!(uniform.ambient_intensity, [0.1, 0.2, 0.3, 1.0]);
    assert_relative_eq!(uniform.attenuation, 0.5);
}

#[test]
fn attenuation_halves_intensity_at_the_half_distance() {
    let k = attenuation_for(10.0);
    assert_relative_eq!(k, 0.01);
    let falloff = 1.0 / (1.0 + k * 10.0 * 10.0);
    assert_relative_eq!(falloff, 0.5, epsilon = 1e-6);

    let mut light = Light::point(Vector3::new(1.0, 1.0, 1.0));
    light.set_half_light_distance(5.0);
    assert_relative_eq!(light.attenuation(), 0.04);
    assert_relative_eq!(light.shader_light().intensity[3], 0.04);
}

#[test]
fn shader_light_marks_points_and_directions() {
    let mut point = Light::point(Vector3::new(0.5, 0.5, 0.5));
    point.set_position(Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(point.shader_light().position, [1.0, 2.0, 3.0, 1.0]);

    let sun = Light::directional(Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.0, -1.0, 0.0));
    assert_eq!(sun.light_type, LightType::Directional);
    assert_eq!(sun.shader_light().position, [0.0, -1.0, 0.0, 0.0]);
}

#[test]
fn tagging_a_render_object_marks_every_material() {
    let mut marker = RenderObject::from_imported(waving_model(), ShaderProgram::Normal);
    let light = Light::point(Vector3::new(1.0, 0.5, 0.25));
    light.tag_render_object(&mut marker, 2, true);

    for material in marker.materials() {
        assert_eq!(material.attributes.extra, 3);
        assert_eq!(material.attributes.emission, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(material.attributes.diffuse, [1.0, 0.5, 0.25, 1.0]);
    }
}

#[test]
fn tagging_without_colours_keeps_the_material_colours() {
    let mut marker = RenderObject::from_imported(waving_model(), ShaderProgram::Normal);
    let before = marker.materials()[0].attributes.diffuse;
    Light::point(Vector3::new(1.0, 0.0, 0.0)).tag_render_object(&mut marker, 0, false);

    assert_eq!(marker.materials()[0].attributes.extra, 1);
    assert_eq!(marker.materials()[0].attributes.diffuse, before);
}
