use approx::assert_relative_eq;
use cgmath::{Matrix4, Quaternion, Rotation3, SquareMatrix, Vector3, VectorSpace};
use vale_ngin::{
    data_structures::{
        animation::{Animation, EndBehavior, Keyframe, Playback, StopFrame, sample_keys, slerp},
        model::RenderObject,
        scene_graph::SceneNode,
    },
    render::{DrawList, ShaderProgram},
};

use crate::common::test_utils::waving_model;

mod common;

fn ten_tick_clip() -> Vec<Animation> {
    vec![Animation {
        name: "clip".to_string(),
        duration: 10.0,
        ticks_per_second: 1.0,
        ..Default::default()
    }]
}

#[test]
fn looping_playback_wraps_to_the_start_frame() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    assert!(playback.start(&animations, 0, Some(0.0), Some(10.0), EndBehavior::Loop));

    for _ in 0..15 {
        playback.tick(&animations, 1.0);
    }
    assert_relative_eq!(playback.current_frame(), 5.0);
    assert!(playback.is_running());
}

#[test]
fn stop_at_end_freezes_on_the_end_frame() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.start(&animations, 0, Some(2.0), Some(6.0), EndBehavior::StopAtEnd);

    for _ in 0..10 {
        playback.tick(&animations, 1.0);
    }
    assert_relative_eq!(playback.current_frame(), 6.0);
    assert!(!playback.is_running());
    assert_eq!(playback.current_animation(), Some(0));
}

#[test]
fn stop_at_start_returns_to_the_start_frame() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.start(&animations, 0, Some(3.0), None, EndBehavior::StopAtStart);

    for _ in 0..8 {
        playback.tick(&animations, 1.0);
    }
    assert_relative_eq!(playback.current_frame(), 3.0);
    assert!(!playback.is_running());
}

#[test]
fn reset_drops_the_animation() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.start(&animations, 0, Some(0.0), Some(4.0), EndBehavior::Reset);

    for _ in 0..4 {
        playback.tick(&animations, 1.0);
    }
    assert!(!playback.is_running());
    assert_eq!(playback.current_animation(), None);
    assert_relative_eq!(playback.current_frame(), 0.0);
}

#[test]
fn missing_start_frame_keeps_the_current_one() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.start(&animations, 0, Some(4.0), None, EndBehavior::Loop);
    playback.tick(&animations, 1.0);
    assert!(playback.stop(None, StopFrame::Current));

    playback.start(&animations, 0, None, None, EndBehavior::Loop);
    assert_relative_eq!(playback.current_frame(), 5.0);
}

#[test]
fn guarded_calls_report_failure() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    assert!(!playback.stop(None, StopFrame::Current));
    assert!(!playback.start(&animations, 3, Some(0.0), None, EndBehavior::Loop));
    assert!(!playback.is_running());
}

#[test]
fn immediate_stop_applies_the_requested_frame() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();

    playback.start(&animations, 0, Some(0.0), None, EndBehavior::Loop);
    playback.tick(&animations, 2.0);
    assert!(playback.stop(None, StopFrame::Frame(7.0)));
    assert!(!playback.is_running());
    assert_relative_eq!(playback.current_frame(), 7.0);

    playback.start(&animations, 0, Some(0.0), None, EndBehavior::Loop);
    playback.tick(&animations, 2.0);
    assert!(playback.stop(None, StopFrame::Unanimated));
    assert_eq!(playback.current_animation(), None);
    assert_relative_eq!(playback.current_frame(), 0.0);
}

#[test]
fn deferred_stop_runs_to_the_end_then_jumps_to_the_post_frame() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.start(&animations, 0, Some(0.0), None, EndBehavior::Loop);
    assert!(playback.stop(Some(4.0), StopFrame::Frame(1.0)));
    assert_eq!(playback.end_behavior(), EndBehavior::StopAtEndThenPostFrame);

    for _ in 0..3 {
        playback.tick(&animations, 1.0);
    }
    assert!(playback.is_running());
    playback.tick(&animations, 1.0);
    assert!(!playback.is_running());
    assert_relative_eq!(playback.current_frame(), 1.0);
}

#[test]
fn idle_playback_does_not_advance() {
    let animations = ten_tick_clip();
    let mut playback = Playback::default();
    playback.tick(&animations, 5.0);
    assert_relative_eq!(playback.current_frame(), 0.0);
}

#[test]
fn zero_tick_rate_uses_the_default() {
    let animation = Animation {
        ticks_per_second: 0.0,
        ..Default::default()
    };
    assert_relative_eq!(animation.ticks_per_second(), 50.0);
}

#[test]
fn sampling_clamps_outside_the_keys() {
    let keys = vec![
        Keyframe::new(2.0, Vector3::new(0.0, 0.0, 0.0)),
        Keyframe::new(4.0, Vector3::new(10.0, 0.0, 0.0)),
        Keyframe::new(8.0, Vector3::new(10.0, 20.0, 0.0)),
    ];
    let lerp = |a: Vector3<f32>, b: Vector3<f32>, t| a.lerp(b, t);

    assert_eq!(sample_keys(&keys, 0.0, lerp), Some(Vector3::new(0.0, 0.0, 0.0)));
    assert_relative_eq!(sample_keys(&keys, 3.0, lerp).unwrap(), Vector3::new(5.0, 0.0, 0.0));
    assert_relative_eq!(sample_keys(&keys, 6.0, lerp).unwrap(), Vector3::new(10.0, 10.0, 0.0));
    assert_relative_eq!(sample_keys(&keys, 100.0, lerp).unwrap(), Vector3::new(10.0, 20.0, 0.0));
    assert_eq!(sample_keys::<Vector3<f32>>(&[], 1.0, lerp), None);
}

#[test]
fn slerp_takes_the_short_way() {
    let a = Quaternion::from_angle_y(cgmath::Deg(10.0));
    let b = -Quaternion::from_angle_y(cgmath::Deg(30.0));
    let halfway = slerp(a, b, 0.5);
    let expected = Quaternion::from_angle_y(cgmath::Deg(20.0));
    let v = Vector3::new(1.0, 0.0, 0.0);
    assert_relative_eq!(halfway * v, expected * v, epsilon = 1e-5);
}

#[test]
fn render_object_draws_the_sampled_pose() {
    let mut object = RenderObject::from_imported(waving_model(), ShaderProgram::Normal);
    assert!(object.start_animation(0, Some(0.0), None, EndBehavior::StopAtEnd));
    object.update(5.0);
    assert_relative_eq!(object.current_frame(), 5.0);

    let mut list = DrawList::new();
    object.render(0.0, &Matrix4::identity(), &mut list);
    let transforms = list.mesh_transforms();
    assert_eq!(list.drawn_meshes(), vec!["body", "arm"]);

    // the arm is lifted halfway, below the model normalization
    let arm = object.normalization() * Matrix4::from_translation(Vector3::new(2.0, 5.0, 0.0));
    assert_relative_eq!(transforms[1].1, arm, epsilon = 1e-5);

    object.update(10.0);
    assert!(!object.is_running());
    assert!(!object.stop_animation(None, StopFrame::Current));
}

#[test]
fn stopped_unanimated_object_draws_the_bind_pose() {
    let mut object = RenderObject::from_imported(waving_model(), ShaderProgram::Normal);
    object.start_animation(0, Some(0.0), None, EndBehavior::Loop);
    object.update(3.0);
    assert!(object.stop_animation(None, StopFrame::Unanimated));

    let mut list = DrawList::new();
    object.render(0.0, &Matrix4::identity(), &mut list);
    let arm = object.normalization() * Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0));
    assert_relative_eq!(list.mesh_transforms()[1].1, arm, epsilon = 1e-5);
}
