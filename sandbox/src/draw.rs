//! Gizmo rendering of hands, pointer curves and the teleport cursor.

use bevy::prelude::*;
use interaction::{Handedness, LocomotionState};

use crate::convert::{point_to_bevy, to_bevy};
use crate::rig::Rig;

const CURVE_COLOR: Color = Color::srgb(0.3, 0.8, 1.0);
const CANDIDATE_COLOR: Color = Color::srgb(1.0, 1.0, 0.2);
const VALID_COLOR: Color = Color::srgb(0.2, 1.0, 0.3);
const INVALID_COLOR: Color = Color::srgb(1.0, 0.25, 0.2);

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Update, (draw_hands, draw_pointers, draw_cursor));
}

fn draw_hands(mut gizmos: Gizmos, rig: Res<Rig>) {
    for hand in [Handedness::Left, Handedness::Right] {
        let pose = rig.hand(hand).pose();
        let radius = rig.settings.grabber.radius;
        gizmos.sphere(to_bevy(&pose.translation), radius, Color::WHITE);

        let Some(candidate) = rig
            .grabs
            .grabber(rig.hand(hand).grabber_id())
            .and_then(|g| g.current())
        else {
            continue;
        };
        if rig.held(hand).is_none() {
            gizmos.line(
                to_bevy(&pose.translation),
                point_to_bevy(&candidate.anchor),
                CANDIDATE_COLOR,
            );
        }
    }
}

fn draw_pointers(mut gizmos: Gizmos, rig: Res<Rig>) {
    for hand in [Handedness::Left, Handedness::Right] {
        let h = rig.hand(hand);
        // The teleport hand shows its curve only while aiming.
        if h.locomotion.state() == LocomotionState::Idle && rig.teleport_hand == hand {
            continue;
        }
        let samples = h.pointer.samples();
        if samples.len() < 2 {
            continue;
        }
        gizmos.linestrip(samples.iter().map(point_to_bevy), CURVE_COLOR);
    }
}

fn draw_cursor(mut gizmos: Gizmos, rig: Res<Rig>) {
    for hand in [Handedness::Left, Handedness::Right] {
        let Some(cursor) = rig.hand(hand).locomotion.cursor() else {
            continue;
        };
        if !cursor.visible {
            continue;
        }
        let color = if cursor.valid {
            VALID_COLOR
        } else {
            INVALID_COLOR
        };
        let normal = to_bevy(&cursor.normal).try_normalize().unwrap_or(Vec3::Y);
        let at = point_to_bevy(&cursor.position) + normal * 0.01;
        let rotation = Quat::from_rotation_arc(Vec3::Z, normal);
        gizmos.circle(Isometry3d::new(at, rotation), 0.3, color);
        gizmos.arrow(at, at + normal * 0.4, color);
    }
}
