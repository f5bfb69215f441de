//! Debug/performance tooling for native dev builds.
//!
//! Adds the perf overlay plus a status line with the rig's pointer curve, teleport
//! strategy and each hand's locomotion state and finger curls.

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, SystemInformationDiagnosticsPlugin,
};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;
use interaction::Handedness;
use iyes_perf_ui::prelude::*;

use crate::rig::Rig;

#[derive(Component)]
struct RigStatus;

/// Add debug/perf tooling (intended for `dev_native` builds only).
pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        SystemInformationDiagnosticsPlugin::default(),
        RenderDiagnosticsPlugin,
        PerfUiPlugin,
    ));

    app.add_systems(Startup, (spawn_perf_ui, spawn_rig_status));
    app.add_systems(Update, update_rig_status);
}

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiAllEntries::default());
}

fn spawn_rig_status(mut commands: Commands) {
    commands.spawn((
        RigStatus,
        Text::new(""),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
}

fn update_rig_status(rig: Res<Rig>, mut status: Single<&mut Text, With<RigStatus>>) {
    let mut line = format!(
        "curve: {}  teleport: {}",
        rig.settings.pointer.curve.as_str(),
        rig.settings.locomotion.strategy.as_str()
    );
    for hand in [Handedness::Left, Handedness::Right] {
        let state = rig.hand(hand).locomotion.state();
        let index = rig
            .finger(&format!("{}_index", hand.as_str()))
            .unwrap_or_default();
        let middle = rig
            .finger(&format!("{}_middle", hand.as_str()))
            .unwrap_or_default();
        line.push_str(&format!(
            "  {}: {state:?} index {index:.1} middle {middle:.1}",
            hand.as_str()
        ));
    }
    status.0 = line;
}
