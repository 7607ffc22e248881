//! The world a game builds in `setup` and mutates every frame.
//!
//! A [`Scene`] owns the camera, the light list, the top-level nodes and the
//! optional skybox and day cycle. Objects that also need to be reachable from
//! game logic are added through [`Scene::add`], which hands back a
//! [`Shared`] handle.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    config::EngineSettings,
    data_structures::{
        camera::{Camera, Projection},
        day_cycle::DayCycle,
        light::{Light, LightsUniform, MAX_NUM_LIGHTS, ShaderLight, attenuation_for},
        scene_graph::SceneNode,
        skybox::Skybox,
        transform::{Shared, Spatial, shared},
    },
    render::{FrameGlobals, RenderBackend},
};

pub struct Scene {
    pub camera: Shared<Camera>,
    pub projection: Projection,
    pub ambient_intensity: Vector3<f32>,
    /// Global attenuation factor, derived from the half-light distance.
    pub attenuation: f32,
    max_lights: usize,
    lights: Vec<Shared<Light>>,
    objects: Vec<Box<dyn SceneNode>>,
    skybox: Option<Skybox>,
    day_cycle: Option<DayCycle>,
}

impl Scene {
    pub fn new(settings: &EngineSettings, width: u32, height: u32) -> Self {
        Self {
            camera: shared(Camera::default()),
            projection: Projection::new(width, height, settings.fovy, settings.znear, settings.zfar),
            ambient_intensity: Vector3::new(0.2, 0.2, 0.2),
            attenuation: attenuation_for(settings.half_light_distance),
            max_lights: settings.max_lights.min(MAX_NUM_LIGHTS),
            lights: Vec::new(),
            objects: Vec::new(),
            skybox: None,
            day_cycle: None,
        }
    }

    /// Register a light and return the handle it can be moved through.
    pub fn add_light(&mut self, light: Light) -> Shared<Light> {
        let light = shared(light);
        self.add_shared_light(light.clone());
        light
    }

    /// Lights past the cap stay registered but never reach the GPU. The
    /// first one over the cap is reported.
    pub fn add_shared_light(&mut self, light: Shared<Light>) {
        self.lights.push(light);
        if self.lights.len() == self.max_lights + 1 {
            log::warn!(
                "More than {} lights registered, only the first {} are used.",
                self.max_lights,
                self.max_lights
            );
        }
    }

    pub fn lights(&self) -> &[Shared<Light>] {
        &self.lights
    }

    pub fn add_object(&mut self, object: Box<dyn SceneNode>) {
        self.objects.push(object);
    }

    /// Add `node` at the top level and keep a handle to it.
    pub fn add<T: SceneNode + 'static>(&mut self, node: T) -> Shared<T> {
        let node = shared(node);
        self.objects.push(Box::new(node.clone()));
        node
    }

    pub fn objects(&self) -> &[Box<dyn SceneNode>] {
        &self.objects
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = Some(skybox);
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    pub fn set_day_cycle(&mut self, day_cycle: DayCycle) {
        self.ambient_intensity = day_cycle.ambient();
        self.day_cycle = Some(day_cycle);
    }

    pub fn day_cycle(&self) -> Option<&DayCycle> {
        self.day_cycle.as_ref()
    }

    /// The lights block for this frame, holding the first `max_lights`
    /// registered lights.
    pub fn lights_uniform(&self) -> LightsUniform {
        let lights: Vec<ShaderLight> = self
            .lights
            .iter()
            .take(self.max_lights)
            .map(|light| light.borrow().shader_light())
            .collect();
        LightsUniform::new(&lights, self.ambient_intensity, self.attenuation)
    }

    pub fn frame_globals(&self) -> FrameGlobals {
        let camera = self.camera.borrow();
        FrameGlobals {
            projection_view: self.projection.calc_matrix() * camera.view_matrix(),
            camera_position: camera.transform().position(),
            lights: self.lights_uniform(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    /// World update: day cycle first, then every node in insertion order.
    pub fn update(&mut self, dt: f32) {
        if let Some(day_cycle) = self.day_cycle.as_mut() {
            self.ambient_intensity = day_cycle.advance(dt);
        }
        for object in self.objects.iter_mut() {
            object.update(dt);
        }
    }

    /// Record one frame: globals, skybox, then the scene graph from the
    /// identity matrix down.
    pub fn render(&self, dt: f32, backend: &mut dyn RenderBackend) {
        let globals = self.frame_globals();
        backend.begin_frame(&globals);
        if let Some(skybox) = &self.skybox {
            skybox.render(globals.camera_position, self.projection.zfar(), backend);
        }
        let root = Matrix4::identity();
        for object in &self.objects {
            object.render(dt, &root, backend);
        }
    }
}
