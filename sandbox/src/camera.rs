use bevy::{
    camera::Exposure,
    pbr::{AtmosphereMode, AtmosphereSettings},
    prelude::*,
};

use crate::convert::pose_to_transform;
use crate::rig::{Fade, Rig};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, (add_camera, add_fade_overlay));
    app.add_systems(PostUpdate, (follow_head, apply_fade));
}

/// Full-screen quad darkened by teleport fades.
#[derive(Component)]
struct FadeOverlay;

fn add_camera(mut commands: Commands) {
    commands.spawn((
        Exposure { ev100: 16.0 },
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        Camera3d::default(),
        Transform::from_xyz(0.0, 1.7, 0.0),
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                1000.0, // Fog distance
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
        AtmosphereSettings {
            rendering_method: AtmosphereMode::Raymarched,
            ..default()
        },
    ));
}

fn add_fade_overlay(mut commands: Commands) {
    commands.spawn((
        FadeOverlay,
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.0)),
    ));
}

/// The desktop camera is the headset.
fn follow_head(rig: Res<Rig>, mut camera_query: Query<&mut Transform, With<Camera3d>>) {
    let Ok(mut cam_tf) = camera_query.single_mut() else {
        return;
    };
    *cam_tf = pose_to_transform(&rig.head());
}

fn apply_fade(fade: Res<Fade>, mut overlay: Single<&mut BackgroundColor, With<FadeOverlay>>) {
    overlay.0 = Color::srgba(0.0, 0.0, 0.0, fade.0.clamp(0.0, 1.0));
}
