//! A valley with a lake, a sky, a wandering lantern and a camera circling
//! overhead while the day passes.
//!
//! Expects these assets below `./assets`:
//! - `valley/heightmap.png`, `valley/grass.png`, `valley/water.png`
//! - `skybox/{right,left,top,bottom,front,back}.png`
//! - `cube.obj`
//!
//! Run with `cargo run --example valley`. Press Escape to quit.

use cgmath::{Rad, Vector3, Vector4};
use vale_ngin::{
    KeyCode, PhysicalKey, WindowEvent,
    config::EngineSettings,
    context::Context,
    data_structures::{
        day_cycle::DayCycle,
        light::Light,
        model::RenderObject,
        particle_system::{BillboardStyle, ParticleSettings, ParticleSystem, Spread},
        scene_graph::MoveGroup,
        skybox::Skybox,
        terrain::{Terrain, TerrainSettings},
        transform::{Movable, Shared},
    },
    flow::{self, Control, Game},
    render::ShaderProgram,
    scene::Scene,
};

const ORBIT_RADIUS: f32 = 60.0;
const ORBIT_SPEED: f32 = 0.05;
const CAMERA_CLEARANCE: f32 = 15.0;
const LANTERN_SPEED: f32 = 4.0;

#[derive(Default)]
struct Valley {
    terrain: Option<Shared<Terrain>>,
    lantern: MoveGroup,
    orbit: f32,
    quit: bool,
}

impl Game for Valley {
    async fn setup(&mut self, ctx: &Context) -> anyhow::Result<Scene> {
        let (width, height) = ctx.size();
        let mut scene = Scene::new(&ctx.settings, width, height);

        let mut terrain = Terrain::load(
            "valley",
            TerrainSettings {
                horizontal_scale: 1.0,
                vertical_scale: 40.0,
                water_level: 12.0,
                start_height: 20.0,
                texture: Some("valley/grass.png".to_string()),
                water_texture: Some("valley/water.png".to_string()),
                ..Default::default()
            },
        )
        .await?;
        let (grid_w, grid_h) = (terrain.heights().width(), terrain.heights().height());
        // center the valley on the origin
        terrain.set_position(Vector3::new(-(grid_w as f32) / 2.0, -20.0, -(grid_h as f32) / 2.0));
        terrain
            .upload(&ctx.device, &ctx.queue, &ctx.layouts.material)
            .await?;
        self.terrain = Some(scene.add(terrain));

        scene.set_skybox(Skybox::load("skybox", &ctx.device, &ctx.queue, &ctx.layouts.cube).await?);

        let light = scene.add_light(Light::point(Vector3::new(1.0, 0.85, 0.6)));
        light.borrow_mut().set_half_light_distance(25.0);
        let mut marker = RenderObject::load("cube.obj", ShaderProgram::Normal).await?;
        marker
            .upload(&ctx.device, &ctx.queue, &ctx.layouts.material)
            .await?;
        light.borrow().tag_render_object(&mut marker, 0, true);
        marker.group_mut().scale = Vector3::new(0.25, 0.25, 0.25);
        let marker = scene.add(marker);

        self.lantern.add_object(Box::new(light));
        self.lantern.add_object(Box::new(marker));
        self.lantern.set_position(Vector3::new(10.0, 5.0, 0.0));

        let mut embers = ParticleSystem::new(
            Vector3::new(0.0, 0.0, 0.0),
            ParticleSettings {
                regeneration: 40.0,
                ttl: Spread::new(3.0, 1.0),
                speed: Spread::new(2.0, 0.5),
                deceleration: Spread::new(0.3, 0.1),
                direction_variance: Vector3::new(0.4, 0.0, 0.4),
                color_start: Vector4::new(1.0, 0.6, 0.1, 1.0),
                color_end: Vector4::new(1.0, 0.1, 0.0, 0.0),
                motion_randomization: 0.5,
                style: BillboardStyle::Cross,
                ..Default::default()
            },
        );
        embers.set_max_particles(ctx.settings.max_particles);
        embers.upload(&ctx.device);
        scene.add(embers);

        scene.set_day_cycle(DayCycle::new(6.0, 10.0));
        Ok(scene)
    }

    fn input(&mut self, _scene: &mut Scene, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                self.quit = true;
            }
        }
    }

    fn logic(&mut self, scene: &mut Scene, dt: f32) -> Control {
        if self.quit {
            return Control::Quit;
        }

        // the lantern drifts in a circle, turning as it goes
        self.lantern.relative_move(Vector3::new(0.0, 0.0, LANTERN_SPEED * dt));
        self.lantern.relative_rotate(Vector3::unit_y(), Rad(0.3 * dt));

        self.orbit += ORBIT_SPEED * dt;
        let (sin, cos) = self.orbit.sin_cos();
        let (x, z) = (cos * ORBIT_RADIUS, sin * ORBIT_RADIUS);
        let ground = self
            .terrain
            .as_ref()
            .map_or(0.0, |terrain| terrain.borrow().ground_height(x, z));

        let mut camera = scene.camera.borrow_mut();
        camera.set_position(Vector3::new(x, ground + CAMERA_CLEARANCE, z));
        // face the valley center, then tilt down a little
        camera.set_rotation(Vector3::unit_y(), Rad((-cos).atan2(-sin)));
        camera.relative_rotate(Vector3::unit_x(), Rad(0.25));
        Control::Continue
    }
}

fn main() -> anyhow::Result<()> {
    flow::run(
        Valley::default(),
        EngineSettings {
            window_title: "vale-ngin: valley".to_string(),
            ..Default::default()
        },
    )
}
