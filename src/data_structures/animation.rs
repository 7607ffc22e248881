//! Node animation: keyframe tracks, sampling and the playback state machine.

use std::collections::HashMap;

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

use crate::data_structures::pose::Pose;

/// Used when an animation declares a tick rate of 0.
pub const DEFAULT_TICKS_PER_SECOND: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Independent translation, rotation and scale tracks of one node.
#[derive(Clone, Debug, Default)]
pub struct NodeChannel {
    pub positions: Vec<Keyframe<Vector3<f32>>>,
    pub rotations: Vec<Keyframe<Quaternion<f32>>>,
    pub scales: Vec<Keyframe<Vector3<f32>>>,
}

impl NodeChannel {
    /// Sample every track at `frame`. Empty tracks keep the bind pose
    /// component.
    pub fn sample(&self, frame: f32, bind_pose: &Pose) -> Pose {
        Pose {
            position: sample_keys(&self.positions, frame, |a, b, t| a.lerp(b, t))
                .unwrap_or(bind_pose.position),
            rotation: sample_keys(&self.rotations, frame, slerp)
                .unwrap_or(bind_pose.rotation),
            scale: sample_keys(&self.scales, frame, |a, b, t| a.lerp(b, t))
                .unwrap_or(bind_pose.scale),
        }
    }
}

/// Value of a track at `frame`.
///
/// Uses the first key whose time is greater than `frame` and the key before
/// it. Before the first key the first value is returned as is. Past the last
/// key the last bracket is used with the blend clamped to 1.
pub fn sample_keys<T: Copy>(
    keys: &[Keyframe<T>],
    frame: f32,
    interpolate: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let last = keys.len().checked_sub(1)?;
    let next = keys
        .iter()
        .position(|key| key.time > frame)
        .unwrap_or(last);
    if next == 0 {
        return Some(keys[0].value);
    }
    let (prev, next) = (&keys[next - 1], &keys[next]);
    let span = next.time - prev.time;
    let blend = if span > 0.0 {
        ((frame - prev.time) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some(interpolate(prev.value, next.value, blend))
}

/// Shortest-arc spherical interpolation, renormalized.
pub fn slerp(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    a.slerp(b, t).normalize()
}

/// A named set of node channels sharing one time base.
#[derive(Clone, Debug, Default)]
pub struct Animation {
    pub name: String,
    /// Length in ticks.
    pub duration: f32,
    /// As declared by the asset; 0 means unspecified.
    pub ticks_per_second: f32,
    /// Keyed by node name.
    pub channels: HashMap<String, NodeChannel>,
}

impl Animation {
    pub fn ticks_per_second(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            DEFAULT_TICKS_PER_SECOND
        }
    }
}

/// What happens once playback reaches its end frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndBehavior {
    /// Jump back to the start frame and keep running.
    #[default]
    Loop,
    StopAtEnd,
    /// Stop on the frame the animation was started from.
    StopAtStart,
    /// Stop on the frame given to a deferred [`Playback::stop`].
    StopAtEndThenPostFrame,
    /// Stop and return to the unanimated pose.
    Reset,
}

/// Which frame to land on when stopping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StopFrame {
    /// Drop the animation and show the bind pose.
    Unanimated,
    /// Freeze on whatever frame is current.
    Current,
    Frame(f32),
}

/// Playback state of one animated object.
#[derive(Clone, Debug, Default)]
pub struct Playback {
    current_frame: f32,
    current_animation: Option<usize>,
    running: bool,
    loop_back_frame: f32,
    end_frame: f32,
    post_frame: f32,
    end_behavior: EndBehavior,
}

impl Playback {
    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    pub fn current_animation(&self) -> Option<usize> {
        self.current_animation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn end_behavior(&self) -> EndBehavior {
        self.end_behavior
    }

    /// Start animation `index`. `None` for `start_frame` keeps the current
    /// frame; `None` for `end_frame` runs to the animation's duration.
    /// Returns false if there is no such animation.
    pub fn start(
        &mut self,
        animations: &[Animation],
        index: usize,
        start_frame: Option<f32>,
        end_frame: Option<f32>,
        end_behavior: EndBehavior,
    ) -> bool {
        let Some(animation) = animations.get(index) else {
            return false;
        };
        if let Some(start_frame) = start_frame {
            self.current_frame = start_frame;
        }
        self.current_animation = Some(index);
        self.loop_back_frame = self.current_frame;
        self.end_frame = end_frame.unwrap_or(animation.duration);
        self.end_behavior = end_behavior;
        self.running = true;
        true
    }

    /// Stop playback. With `end_frame` of `None` the stop is immediate and
    /// `set_frame` is applied now. Otherwise playback continues until
    /// `end_frame` and `set_frame` picks the end behavior used there.
    /// Returns false if nothing is running.
    pub fn stop(&mut self, end_frame: Option<f32>, set_frame: StopFrame) -> bool {
        if !self.running {
            return false;
        }
        match end_frame {
            None => {
                self.running = false;
                match set_frame {
                    StopFrame::Unanimated => {
                        self.current_animation = None;
                        self.current_frame = 0.0;
                    }
                    StopFrame::Current => (),
                    StopFrame::Frame(frame) => self.current_frame = frame,
                }
            }
            Some(end_frame) => {
                self.end_frame = end_frame;
                self.end_behavior = match set_frame {
                    StopFrame::Frame(frame) => {
                        self.post_frame = frame;
                        EndBehavior::StopAtEndThenPostFrame
                    }
                    StopFrame::Unanimated => EndBehavior::Reset,
                    StopFrame::Current => EndBehavior::StopAtEnd,
                };
            }
        }
        true
    }

    /// Advance by `dt` seconds and apply the end behavior once the end frame
    /// is reached.
    pub fn tick(&mut self, animations: &[Animation], dt: f32) {
        if !self.running {
            return;
        }
        let Some(animation) = self.current_animation.and_then(|i| animations.get(i)) else {
            self.running = false;
            return;
        };
        self.current_frame += animation.ticks_per_second() * dt;
        if self.current_frame < self.end_frame {
            return;
        }
        match self.end_behavior {
            EndBehavior::Loop => self.current_frame = self.loop_back_frame,
            EndBehavior::StopAtEnd => {
                self.current_frame = self.end_frame;
                self.running = false;
            }
            EndBehavior::StopAtStart => {
                self.current_frame = self.loop_back_frame;
                self.running = false;
            }
            EndBehavior::StopAtEndThenPostFrame => {
                self.current_frame = self.post_frame;
                self.running = false;
            }
            EndBehavior::Reset => {
                self.current_frame = 0.0;
                self.current_animation = None;
                self.running = false;
            }
        }
    }
}
