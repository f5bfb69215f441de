use bevy::prelude::*;
use interaction::grab::{GrabTrigger, GrabbableConfig};
use interaction::types::Pose;
use interaction::{BodyDef, ColliderShapeDef};

use crate::convert::{pose_from, to_na};
use crate::physics::{Physics, PhysicsBody};
use crate::rig::Rig;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, setup);
}

const CUBE_HALF: f32 = 0.08;

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut physics: ResMut<Physics>,
    mut rig: ResMut<Rig>,
) {
    info!("World setup");

    physics.insert(&BodyDef::fixed(0, Pose::identity(), ColliderShapeDef::Plane));
    commands.spawn((
        Transform::from_xyz(0., 0., 0.),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(50., 50.).build())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(0.2, 0.3, 0.25),
            perceptual_roughness: 1.0,
            metallic: 0.0,
            ..default()
        })),
    ));

    // Low overhang: teleporting under it fails the headroom check.
    let shelf = Transform::from_xyz(-3.0, 1.2, -4.0);
    let shelf_half = Vec3::new(1.5, 0.05, 1.0);
    physics.insert(&BodyDef::fixed(
        1,
        pose_from(shelf.translation, shelf.rotation),
        ColliderShapeDef::Cuboid {
            half_extents: to_na(shelf_half),
        },
    ));
    commands.spawn((
        shelf,
        Mesh3d(meshes.add(Cuboid::from_size(shelf_half * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb_u8(150, 110, 80))),
    ));

    // Table holding the props.
    let table = Transform::from_xyz(0.0, 0.4, -0.6);
    let table_half = Vec3::new(0.6, 0.4, 0.3);
    physics.insert(&BodyDef::fixed(
        2,
        pose_from(table.translation, table.rotation),
        ColliderShapeDef::Cuboid {
            half_extents: to_na(table_half),
        },
    ));
    commands.spawn((
        table,
        Mesh3d(meshes.add(Cuboid::from_size(table_half * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb_u8(90, 70, 60))),
    ));

    let cube_mesh = meshes.add(Cuboid::new(CUBE_HALF * 2.0, CUBE_HALF * 2.0, CUBE_HALF * 2.0));
    let cube_material = materials.add(Color::srgb_u8(124, 144, 255));
    for (i, x) in [-0.4, -0.2, 0.0].into_iter().enumerate() {
        let at = Transform::from_xyz(x, 0.8 + CUBE_HALF, -0.55);
        let body = physics.insert(&BodyDef::grabbable(
            10 + i as u32,
            pose_from(at.translation, at.rotation),
            ColliderShapeDef::Cuboid {
                half_extents: to_na(Vec3::splat(CUBE_HALF)),
            },
        ));
        commands.spawn((
            PhysicsBody(body),
            at,
            Mesh3d(cube_mesh.clone()),
            MeshMaterial3d(cube_material.clone()),
        ));
    }

    // A rod with a snapping handle at one end, long enough to hold with both hands.
    let rod = Transform::from_xyz(0.35, 0.8 + 0.03, -0.55)
        .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
    let body = physics.insert(&BodyDef::grabbable(
        20,
        pose_from(rod.translation, rod.rotation),
        ColliderShapeDef::CapsuleY {
            radius: 0.03,
            half_height: 0.3,
        },
    ));
    rig.grabs.register(
        body,
        GrabbableConfig {
            triggers: vec![GrabTrigger::new(
                "handle",
                Pose::from_translation(to_na(Vec3::new(0.0, -0.25, 0.0))),
                true,
            )],
            ..default()
        },
    );
    commands.spawn((
        PhysicsBody(body),
        rod,
        Mesh3d(meshes.add(Capsule3d::new(0.03, 0.6))),
        MeshMaterial3d(materials.add(Color::srgb_u8(230, 180, 60))),
    ));

    physics.refresh();

    // light
    commands.spawn((
        PointLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0),
    ));
}
