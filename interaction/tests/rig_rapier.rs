use interaction::hand::HandFrame;
use interaction::scene::BodyControl;
use interaction::types::{Quat, Vec2, Vec3};
use interaction::{
    BodyDef, BodyFlags, BodyId, ColliderShapeDef, GrabEvent, Handedness, InteractionRig, Pose,
    RapierScene, RigEvent, RigInput,
};

fn at(x: f32, y: f32, z: f32) -> Pose {
    Pose::from_translation(Vec3::new(x, y, z))
}

fn room() -> (RapierScene, BodyId) {
    let defs = vec![
        BodyDef::fixed(0, Pose::identity(), ColliderShapeDef::Plane),
        BodyDef::grabbable(
            1,
            at(0.3, 1.0, -0.3),
            ColliderShapeDef::Sphere { radius: 0.05 },
        ),
    ];
    let (scene, ids) = RapierScene::build(Vec3::new(0.0, -9.81, 0.0), defs);
    let ball = ids
        .iter()
        .find(|(id, _)| *id == 1)
        .map(|(_, body)| *body)
        .unwrap();
    (scene, ball)
}

fn idle_input() -> RigInput {
    RigInput {
        head: at(0.0, 1.7, 0.0),
        left: HandFrame {
            pose: at(-0.3, 1.0, -0.3),
            ..Default::default()
        },
        right: HandFrame {
            pose: at(0.3, 1.0, -0.3),
            ..Default::default()
        },
    }
}

#[test]
fn grab_carry_and_drop_against_rapier() {
    let (mut scene, ball) = room();
    let mut rig = InteractionRig::default();
    let mut input = idle_input();

    input.right.controller.grip = 1.0;
    let events = rig.tick(&mut scene, &input, 1.0 / 60.0);
    assert!(events.iter().any(|e| matches!(
        e,
        RigEvent::Grab(GrabEvent::Grabbed { body, .. }) if *body == ball
    )));
    assert!(!scene.flags(ball).unwrap().gravity);

    input.right.pose = at(0.3, 1.4, -0.3);
    rig.tick(&mut scene, &input, 1.0 / 60.0);
    scene.step(1.0 / 60.0);
    let carried = scene.pose(ball).unwrap().translation;
    assert!((carried.y - 1.4).abs() < 1.0e-3);

    input.right.controller.grip = 0.0;
    rig.tick(&mut scene, &input, 1.0 / 60.0);
    assert_eq!(scene.flags(ball), Some(BodyFlags::default()));
    assert_eq!(rig.held(Handedness::Right), None);
    // The upward carry is handed over as a toss.
    assert!(scene.velocity(ball).unwrap().0.y > 0.0);
}

#[test]
fn teleport_onto_rapier_floor() {
    let (mut scene, _) = room();
    let mut rig = InteractionRig::default();
    let mut input = idle_input();
    // Aim clear of the ball so the curve lands on open floor.
    input.right.pose = at(1.0, 1.2, 0.5);

    input.right.controller.thumbstick = Vec2::new(0.0, 1.0);
    let events = rig.tick(&mut scene, &input, 1.0 / 60.0);
    assert!(events.contains(&RigEvent::TeleportStarted(Handedness::Right)));
    let cursor = *rig.hand(Handedness::Right).locomotion.cursor().unwrap();
    assert!(cursor.valid);
    assert!(cursor.position.y.abs() < 1.0e-4);

    input.right.controller.thumbstick = Vec2::zeros();
    rig.tick(&mut scene, &input, 1.0 / 60.0);
    let origin = rig.origin().translation;
    assert!((origin.x - cursor.position.x).abs() < 1.0e-4);
    assert!((origin.z - cursor.position.z).abs() < 1.0e-4);
}

#[test]
fn aiming_down_at_rapier_floor_teleports_there() {
    let (mut scene, _) = room();
    let mut rig = InteractionRig::default();
    let mut input = idle_input();
    input.right.pose = Pose::new(
        Vec3::new(1.0, 1.2, 0.5),
        Quat::from_axis_angle(&Vec3::x_axis(), -std::f32::consts::FRAC_PI_4),
    );

    input.right.controller.thumbstick = Vec2::new(0.0, 1.0);
    rig.tick(&mut scene, &input, 1.0 / 60.0);
    let hand = rig.hand(Handedness::Right);
    let floor = hand.pointer.floor_hit().copied().unwrap();
    assert!((floor.point.z + 0.7).abs() < 1.0e-3);
    let cursor = *hand.locomotion.cursor().unwrap();
    assert!(cursor.visible && cursor.valid);

    input.right.controller.thumbstick = Vec2::zeros();
    rig.tick(&mut scene, &input, 1.0 / 60.0);
    let origin = rig.origin().translation;
    assert!((origin.x - 1.0).abs() < 1.0e-3);
    assert!((origin.z + 0.7).abs() < 1.0e-3);
}
