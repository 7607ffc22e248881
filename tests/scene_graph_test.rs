use std::{cell::Cell, rc::Rc};

use approx::assert_relative_eq;
use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};
use vale_ngin::{
    data_structures::{
        scene_graph::{GroupNode, MoveGroup, SceneNode},
        transform::{Movable, Transform, shared},
    },
    render::DrawList,
};

use crate::common::test_utils::{Marker, Tracked};

mod common;

#[test]
fn index_returns_the_added_child() {
    let marker = shared(Marker::new("m", Vector3::new(1.0, 2.0, 3.0)));
    let mut group = GroupNode::new();
    group.add_object(Box::new(GroupNode::new()));
    group.add_object(Box::new(marker.clone()));

    assert_eq!(group.len(), 2);
    assert_relative_eq!(group[1].matrix(), Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)));

    // moving through the handle is visible through the group
    marker.borrow_mut().group.set_position(Vector3::new(-4.0, 0.0, 0.0));
    assert_relative_eq!(group[1].matrix(), Matrix4::from_translation(Vector3::new(-4.0, 0.0, 0.0)));
    assert!(group.get(2).is_none());
}

#[test]
fn dropping_a_group_drops_the_whole_subtree() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut leaf_group = GroupNode::new();
        leaf_group.add_object(Box::new(Tracked::new(&drops)));
        leaf_group.add_object(Box::new(Tracked::new(&drops)));

        let mut middle = GroupNode::new();
        middle.add_object(Box::new(leaf_group));
        middle.add_object(Box::new(Tracked::new(&drops)));

        let mut top = GroupNode::new();
        top.add_object(Box::new(middle));
        top.add_object(Box::new(Tracked::new(&drops)));
        assert_eq!(drops.get(), 0);
    }
    assert_eq!(drops.get(), 4);
}

#[test]
fn update_reaches_nested_children() {
    let drops = Rc::new(Cell::new(0));
    let tracked = Tracked::new(&drops);
    let updates = tracked.updates.clone();

    let mut inner = GroupNode::new();
    inner.add_object(Box::new(tracked));
    let mut outer = GroupNode::new();
    outer.add_object(Box::new(inner));

    outer.update(0.1);
    outer.update(0.1);
    assert_eq!(updates.get(), 2);
}

#[test]
fn render_composes_parent_matrices_and_isolates_siblings() {
    let mut root = GroupNode::at(Vector3::new(10.0, 0.0, 0.0));
    root.scale = Vector3::new(2.0, 2.0, 2.0);

    let mut a = Marker::new("a", Vector3::new(1.0, 0.0, 0.0));
    a.group.set_rotation(Vector3::unit_y(), Deg(90.0).into());
    a.group.add_object(Box::new(Marker::new("b", Vector3::new(0.0, 0.0, 1.0))));
    root.add_object(Box::new(a));
    root.add_object(Box::new(Marker::new("c", Vector3::new(0.0, 3.0, 0.0))));

    let mut list = DrawList::new();
    root.render(0.0, &Matrix4::identity(), &mut list);

    assert_eq!(list.drawn_meshes(), vec!["a", "b", "c"]);
    let transforms = list.mesh_transforms();

    let root_m = Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0)) * Matrix4::from_scale(2.0);
    let a_m = root_m * Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)) * Matrix4::from_angle_y(Deg(90.0));
    let b_m = a_m * Matrix4::from_translation(Vector3::new(0.0, 0.0, 1.0));
    let c_m = root_m * Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0));

    assert_relative_eq!(transforms[0].1, a_m, epsilon = 1e-5);
    assert_relative_eq!(transforms[1].1, b_m, epsilon = 1e-5);
    assert_relative_eq!(transforms[2].1, c_m, epsilon = 1e-5);
}

#[test]
fn render_with_a_parent_matrix_prefixes_every_draw() {
    let marker = Marker::new("m", Vector3::new(0.0, 1.0, 0.0));
    let parent = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));

    let mut list = DrawList::new();
    marker.render(0.0, &parent, &mut list);

    assert_relative_eq!(
        list.mesh_transforms()[0].1,
        Matrix4::from_translation(Vector3::new(0.0, 1.0, -5.0))
    );
}

#[test]
fn move_group_replays_commands_in_each_members_own_frame() {
    let facing_z = shared(Transform::new());
    let facing_x = shared(Transform::new());
    facing_x.borrow_mut().set_rotation(Vector3::unit_y(), Deg(90.0).into());

    let mut group = MoveGroup::new();
    group.add_object(Box::new(facing_z.clone()));
    group.add_object(Box::new(facing_x.clone()));
    assert_eq!(group.len(), 2);

    group.relative_move(Vector3::new(0.0, 0.0, 2.0));

    assert_relative_eq!(group.position(), Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-6);
    assert_relative_eq!(facing_z.borrow().position(), Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-6);
    assert_relative_eq!(facing_x.borrow().position(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
}

#[test]
fn move_group_absolute_commands_move_members_alike() {
    let a = shared(Transform::at(Vector3::new(1.0, 0.0, 0.0)));
    let b = shared(Transform::at(Vector3::new(0.0, 0.0, 1.0)));
    b.borrow_mut().set_rotation(Vector3::unit_x(), Deg(45.0).into());

    let mut group = MoveGroup::new();
    group.add_object(Box::new(a.clone()));
    group.add_object(Box::new(b.clone()));
    group.absolute_move(Vector3::new(0.0, 5.0, 0.0));

    assert_relative_eq!(a.borrow().position(), Vector3::new(1.0, 5.0, 0.0));
    assert_relative_eq!(b.borrow().position(), Vector3::new(0.0, 5.0, 1.0));

    group.set_position(Vector3::new(7.0, 7.0, 7.0));
    assert_relative_eq!(a.borrow().position(), Vector3::new(7.0, 7.0, 7.0));
    assert_relative_eq!(group.transform().position(), Vector3::new(7.0, 7.0, 7.0));
}

#[test]
fn move_groups_nest() {
    let member = shared(Transform::new());
    let mut inner = MoveGroup::new();
    inner.add_object(Box::new(member.clone()));
    let mut outer = MoveGroup::new();
    outer.add_object(Box::new(inner));

    outer.absolute_move(Vector3::new(1.0, 2.0, 3.0));
    assert_relative_eq!(member.borrow().position(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(outer.get(0).map(|g| g.position()), Some(Vector3::new(1.0, 2.0, 3.0)));
}
