//! Emitter-driven particle effects.
//!
//! A [`ParticleSystem`] spawns particles at a steady rate, integrates them on
//! the CPU every tick and streams the live ones as textured quads. The index
//! buffer is static and sized for the cap; only the vertex prefix covering
//! the live particles is rewritten per frame.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4, VectorSpace, Zero};
use rand::{Rng, SeedableRng, rngs::StdRng};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        mesh::{GpuMesh, Vertex},
        scene_graph::{GroupNode, SceneNode},
        transform::{Spatial, Transform},
    },
    render::{ParticleBatch, RenderBackend},
};

/// Particles beyond this count are simulated but not drawn.
pub const MAX_NUM_PARTICLES: usize = 500;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl ParticleVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x4];
}

impl Vertex for ParticleVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// `average ± variance`, sampled uniformly.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spread {
    pub average: f32,
    pub variance: f32,
}

impl Spread {
    pub fn new(average: f32, variance: f32) -> Self {
        Self { average, variance }
    }

    pub fn fixed(value: f32) -> Self {
        Self::new(value, 0.0)
    }

    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        self.average + symmetric(rng, self.variance)
    }
}

/// Uniform in `[-variance, variance]`.
fn symmetric(rng: &mut impl Rng, variance: f32) -> f32 {
    variance * (rng.r#gen::<f32>() * 2.0 - 1.0)
}

fn symmetric_vec(rng: &mut impl Rng, variance: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(
        symmetric(rng, variance.x),
        symmetric(rng, variance.y),
        symmetric(rng, variance.z),
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BillboardStyle {
    /// One quad in the local xy plane.
    #[default]
    Single,
    /// Two perpendicular quads, visible from any side.
    Cross,
}

impl BillboardStyle {
    pub fn quads(&self) -> usize {
        match self {
            BillboardStyle::Single => 1,
            BillboardStyle::Cross => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParticleSettings {
    /// Half extents of the box particles spawn in around the system position.
    pub spawn_area: Vector3<f32>,
    /// New particles per second.
    pub regeneration: f32,
    pub ttl: Spread,
    pub speed: Spread,
    pub acceleration: Spread,
    pub deceleration: Spread,
    pub scale: Spread,
    pub direction: Vector3<f32>,
    pub direction_variance: Vector3<f32>,
    /// Each particle gets a random mix of these two colours.
    pub color_start: Vector4<f32>,
    pub color_end: Vector4<f32>,
    /// Per-second magnitude of random jitter added to every step.
    pub motion_randomization: f32,
    pub style: BillboardStyle,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            spawn_area: Vector3::new(0.5, 0.0, 0.5),
            regeneration: 10.0,
            ttl: Spread::new(2.0, 0.5),
            speed: Spread::new(1.0, 0.2),
            acceleration: Spread::fixed(0.0),
            deceleration: Spread::fixed(0.0),
            scale: Spread::new(0.1, 0.02),
            direction: Vector3::unit_y(),
            direction_variance: Vector3::new(0.2, 0.0, 0.2),
            color_start: Vector4::new(1.0, 1.0, 1.0, 1.0),
            color_end: Vector4::new(1.0, 1.0, 1.0, 0.0),
            motion_randomization: 0.0,
            style: BillboardStyle::Single,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub color: Vector4<f32>,
    pub direction: Vector3<f32>,
    pub ttl: f32,
    pub speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub scale: f32,
}

impl Particle {
    /// Advance by `dt`. Returns false once the particle has died.
    fn step(&mut self, dt: f32, jitter: Vector3<f32>) -> bool {
        self.ttl -= dt;
        if self.ttl <= 0.0 {
            return false;
        }
        self.acceleration -= self.deceleration * dt;
        self.speed += self.acceleration * dt;
        self.position += self.direction * (self.speed * dt) + jitter;
        true
    }

    fn write_vertices(&self, style: BillboardStyle, out: &mut Vec<ParticleVertex>) {
        const SINGLE: [[f32; 3]; 4] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        const CROSSED: [[f32; 3]; 4] = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

        let quads: &[[[f32; 3]; 4]] = match style {
            BillboardStyle::Single => &[SINGLE],
            BillboardStyle::Cross => &[SINGLE, CROSSED],
        };
        for quad in quads {
            for (corner, uv) in quad.iter().zip(UVS) {
                out.push(ParticleVertex {
                    position: (self.position + Vector3::from(*corner) * self.scale).into(),
                    tex_coords: uv,
                    color: self.color.into(),
                });
            }
        }
    }
}

/// Index pattern of quad `quad`: corners 0,1,3 and 0,3,2.
fn quad_indices(quad: u32) -> [u32; 6] {
    let b = quad * 4;
    [b, b + 1, b + 3, b, b + 3, b + 2]
}

pub struct ParticleSystem {
    group: GroupNode,
    settings: ParticleSettings,
    max_particles: usize,
    particles: Vec<Particle>,
    vertices: Vec<ParticleVertex>,
    rng: StdRng,
    spawn_remainder: f32,
    spawned_total: u64,
    over_cap_reported: bool,
    gpu: Option<GpuMesh>,
    texture: Option<wgpu::BindGroup>,
}

impl ParticleSystem {
    pub fn new(position: Vector3<f32>, settings: ParticleSettings) -> Self {
        Self::with_rng(position, settings, StdRng::from_entropy())
    }

    /// Deterministic system, e.g. for tests and replays.
    pub fn with_seed(position: Vector3<f32>, settings: ParticleSettings, seed: u64) -> Self {
        Self::with_rng(position, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(position: Vector3<f32>, settings: ParticleSettings, rng: StdRng) -> Self {
        Self {
            group: GroupNode::at(position),
            settings,
            max_particles: MAX_NUM_PARTICLES,
            particles: Vec::new(),
            vertices: Vec::new(),
            rng,
            spawn_remainder: 0.0,
            spawned_total: 0,
            over_cap_reported: false,
            gpu: None,
            texture: None,
        }
    }

    pub fn group(&self) -> &GroupNode {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut GroupNode {
        &mut self.group
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ParticleSettings {
        &mut self.settings
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Change the render cap. Takes effect on the GPU at the next upload.
    pub fn set_max_particles(&mut self, max_particles: usize) {
        self.max_particles = max_particles;
        self.rebuild_vertices();
    }

    /// Vertices of the particles that are drawn this frame.
    pub fn vertices(&self) -> &[ParticleVertex] {
        &self.vertices
    }

    /// Number of rendered particles, at most the cap.
    pub fn rendered_count(&self) -> usize {
        self.particles.len().min(self.max_particles)
    }

    pub fn index_count(&self) -> u32 {
        (self.rendered_count() * self.settings.style.quads() * 6) as u32
    }

    pub fn set_texture(&mut self, texture: Option<wgpu::BindGroup>) {
        self.texture = texture;
    }

    pub fn spawn(&mut self, count: usize) {
        self.spawn_particles(count);
        self.rebuild_vertices();
    }

    fn spawn_particles(&mut self, count: usize) {
        let base = self.group.transform().position();
        for _ in 0..count {
            let particle = self.make_particle(base);
            self.particles.push(particle);
        }
        self.spawned_total += count as u64;
    }

    fn make_particle(&mut self, base: Vector3<f32>) -> Particle {
        let s = &self.settings;
        let rng = &mut self.rng;
        let position = base + symmetric_vec(rng, s.spawn_area);
        let mix = rng.r#gen::<f32>();
        let color = s.color_start.lerp(s.color_end, mix);
        let noisy = s.direction + symmetric_vec(rng, s.direction_variance);
        let direction = if noisy.magnitude2() > f32::EPSILON {
            noisy.normalize()
        } else {
            s.direction
        };
        Particle {
            position,
            color,
            direction,
            ttl: s.ttl.sample(rng),
            speed: s.speed.sample(rng),
            acceleration: s.acceleration.sample(rng),
            deceleration: s.deceleration.sample(rng),
            scale: s.scale.sample(rng),
        }
    }

    fn rebuild_vertices(&mut self) {
        self.vertices.clear();
        for particle in self.particles.iter().take(self.max_particles) {
            particle.write_vertices(self.settings.style, &mut self.vertices);
        }
    }

    /// Allocate the vertex buffer for the cap and the static index buffer.
    pub fn upload(&mut self, device: &wgpu::Device) {
        let quads = (self.max_particles * self.settings.style.quads()) as u32;
        let indices: Vec<u32> = (0..quads).flat_map(quad_indices).collect();
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Vertex Buffer"),
            size: (quads as usize * 4 * std::mem::size_of::<ParticleVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.gpu = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        });
    }
}

impl Spatial for ParticleSystem {
    fn transform(&self) -> &Transform {
        self.group.transform()
    }

    fn transform_mut(&mut self) -> &mut Transform {
        self.group.transform_mut()
    }
}

impl SceneNode for ParticleSystem {
    fn matrix(&self) -> Matrix4<f32> {
        self.group.local_matrix()
    }

    fn update(&mut self, dt: f32) {
        let due = self.settings.regeneration * dt + self.spawn_remainder;
        let whole = due.floor().max(0.0);
        self.spawn_remainder = due - whole;
        self.spawn_particles(whole as usize);

        let jitter = self.settings.motion_randomization * dt;
        let rng = &mut self.rng;
        self.particles.retain_mut(|particle| {
            let noise = if jitter > 0.0 {
                symmetric_vec(rng, Vector3::new(jitter, jitter, jitter))
            } else {
                Vector3::zero()
            };
            particle.step(dt, noise)
        });
        let over_cap = self.particles.len() > self.max_particles;
        if over_cap && !self.over_cap_reported {
            log::warn!(
                "There are {} particles, but only {} will render.",
                self.particles.len(),
                self.max_particles
            );
        }
        self.over_cap_reported = over_cap;
        self.rebuild_vertices();
        self.group.update_children(dt);
    }

    /// Particles live in the parent's space, their spawn base already is the
    /// system position. Children get the full local matrix.
    fn render(&self, dt: f32, parent: &Matrix4<f32>, backend: &mut dyn RenderBackend) {
        if !self.vertices.is_empty() {
            backend.upload_model_matrices(parent);
            backend.draw_particles(&ParticleBatch {
                vertices: &self.vertices,
                index_count: self.index_count(),
                buffers: self.gpu.as_ref(),
                texture: self.texture.as_ref(),
            });
        }
        self.group.render_children(dt, &(parent * self.group.local_matrix()), backend);
    }
}
