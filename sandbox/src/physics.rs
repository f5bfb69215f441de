use bevy::prelude::*;
use interaction::scene::BodyControl;
use interaction::{BodyId, RapierScene};

use crate::convert::pose_to_transform;

/// The rapier world every interaction query runs against.
#[derive(Resource, Deref, DerefMut, Default)]
pub struct Physics(pub RapierScene);

/// Links a rendered entity to its rigid body.
#[derive(Component, Debug, Clone, Copy)]
pub struct PhysicsBody(pub BodyId);

/// Sets run in `FixedUpdate`, rig first so the step sees this tick's held poses.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimSet {
    Rig,
    Step,
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Physics>();
    app.configure_sets(FixedUpdate, (SimSet::Rig, SimSet::Step).chain());
    app.add_systems(FixedUpdate, step.in_set(SimSet::Step));
    app.add_systems(Update, sync_transforms);
}

fn step(mut physics: ResMut<Physics>, time: Res<Time<Fixed>>) {
    physics.step(time.delta_secs());
}

fn sync_transforms(physics: Res<Physics>, mut bodies: Query<(&PhysicsBody, &mut Transform)>) {
    for (body, mut transform) in &mut bodies {
        let Some(pose) = physics.pose(body.0) else {
            continue;
        };
        *transform = pose_to_transform(&pose);
    }
}
