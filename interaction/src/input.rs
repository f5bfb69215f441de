//! Controller input abstraction.
//!
//! A host samples each tracked controller once per tick into a [`ControllerSnapshot`].
//! [`ControllerInput`] turns consecutive snapshots into edge events (press, release,
//! hold, thumbstick direction change) and [`InputDispatcher`] forwards them to
//! subscribed callbacks. [`HandRegistry`] holds named per-hand state.

use std::collections::HashMap;

use num_traits::{One, PrimInt};

use crate::error::{InteractionError, Result};
use crate::settings::InputSettings;
use crate::types::{Handedness, Vec2};

/// Something that occupies one bit of a [`ButtonFlags`] set.
pub trait FlagBit {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Digital button state packed into an integer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ButtonFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> ButtonFlags<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn set<U: FlagBit<Storage = T>>(&mut self, button: U, down: bool) {
        if down {
            self.bits = self.bits | button.mask();
        } else {
            self.bits = self.bits & !button.mask();
        }
    }

    pub fn with<U: FlagBit<Storage = T>>(mut self, button: U) -> Self {
        self.set(button, true);
        self
    }

    pub fn has<U: FlagBit<Storage = T>>(&self, button: U) -> bool {
        (self.bits & button.mask()) != T::zero()
    }

    /// Buttons set here but not in `previous`.
    pub fn pressed_since(&self, previous: &Self) -> Self {
        Self::new(self.bits & !previous.bits)
    }

    /// Buttons set in `previous` but not here.
    pub fn released_since(&self, previous: &Self) -> Self {
        Self::new(previous.bits & !self.bits)
    }
}

/// Digital inputs of a hand-held controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControllerButton {
    Trigger,
    Grip,
    Primary,
    Secondary,
    ThumbstickClick,
    Menu,
}

impl ControllerButton {
    pub const ALL: [ControllerButton; 6] = [
        ControllerButton::Trigger,
        ControllerButton::Grip,
        ControllerButton::Primary,
        ControllerButton::Secondary,
        ControllerButton::ThumbstickClick,
        ControllerButton::Menu,
    ];
}

impl FlagBit for ControllerButton {
    type Storage = u8;

    fn bit_index(&self) -> u8 {
        *self as u8
    }
}

pub type Buttons = ButtonFlags<u8>;

/// Quantized thumbstick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StickDirection {
    #[default]
    Center,
    Up,
    Down,
    Left,
    Right,
}

impl StickDirection {
    /// Dominant axis wins; values inside `dead_zone` are centered.
    pub fn from_axes(stick: Vec2, dead_zone: f32) -> Self {
        if stick.norm() <= dead_zone {
            return StickDirection::Center;
        }
        if stick.x.abs() > stick.y.abs() {
            if stick.x > 0.0 {
                StickDirection::Right
            } else {
                StickDirection::Left
            }
        } else if stick.y > 0.0 {
            StickDirection::Up
        } else {
            StickDirection::Down
        }
    }
}

/// Raw per-tick controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerSnapshot {
    pub buttons: Buttons,
    /// 0..=1
    pub trigger: f32,
    /// 0..=1
    pub grip: f32,
    pub thumbstick: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Pressed(ControllerButton),
    Released(ControllerButton),
    /// Emitted every tick the button stays down after its press tick.
    Held {
        button: ControllerButton,
        seconds: f32,
    },
    ThumbstickDirection {
        from: StickDirection,
        to: StickDirection,
    },
}

/// Edge detector for a single controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerInput {
    pub settings: InputSettings,
    previous: Buttons,
    held_for: [f32; ControllerButton::ALL.len()],
    direction: StickDirection,
    thumbstick: Vec2,
    trigger: f32,
    grip: f32,
}

impl ControllerInput {
    pub fn new(settings: InputSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn buttons(&self) -> Buttons {
        self.previous
    }

    pub fn is_down(&self, button: ControllerButton) -> bool {
        self.previous.has(button)
    }

    pub fn thumbstick(&self) -> Vec2 {
        self.thumbstick
    }

    pub fn direction(&self) -> StickDirection {
        self.direction
    }

    pub fn trigger(&self) -> f32 {
        self.trigger
    }

    pub fn grip(&self) -> f32 {
        self.grip
    }

    /// Analog axes act as buttons with hysteresis: press above `press_threshold`,
    /// release below `release_threshold`.
    fn digitize(&self, snapshot: &ControllerSnapshot) -> Buttons {
        let mut buttons = snapshot.buttons;
        for (button, value) in [
            (ControllerButton::Trigger, snapshot.trigger),
            (ControllerButton::Grip, snapshot.grip),
        ] {
            if buttons.has(button) {
                continue;
            }
            let threshold = if self.previous.has(button) {
                self.settings.release_threshold
            } else {
                self.settings.press_threshold
            };
            buttons.set(button, value >= threshold);
        }
        buttons
    }

    pub fn update(&mut self, snapshot: &ControllerSnapshot, dt: f32) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let current = self.digitize(snapshot);
        let pressed = current.pressed_since(&self.previous);
        let released = current.released_since(&self.previous);

        for (i, button) in ControllerButton::ALL.iter().copied().enumerate() {
            if pressed.has(button) {
                self.held_for[i] = 0.0;
                events.push(InputEvent::Pressed(button));
            } else if released.has(button) {
                self.held_for[i] = 0.0;
                events.push(InputEvent::Released(button));
            } else if current.has(button) {
                self.held_for[i] += dt.max(0.0);
                events.push(InputEvent::Held {
                    button,
                    seconds: self.held_for[i],
                });
            }
        }

        let direction = StickDirection::from_axes(snapshot.thumbstick, self.settings.dead_zone);
        if direction != self.direction {
            events.push(InputEvent::ThumbstickDirection {
                from: self.direction,
                to: direction,
            });
            self.direction = direction;
        }

        self.previous = current;
        self.thumbstick = snapshot.thumbstick;
        self.trigger = snapshot.trigger;
        self.grip = snapshot.grip;
        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Subscription {
    Button(ControllerButton),
    Direction(StickDirection),
}

type Callback = Box<dyn FnMut(Handedness, &InputEvent) + Send + Sync>;

/// Callback registry for input events.
///
/// Button subscribers receive press, release and hold events of that button. Direction
/// subscribers receive the change event when the thumbstick enters that direction.
#[derive(Default)]
pub struct InputDispatcher {
    subscribers: HashMap<Subscription, Vec<Callback>>,
}

impl InputDispatcher {
    pub fn on_button(
        &mut self,
        button: ControllerButton,
        callback: impl FnMut(Handedness, &InputEvent) + Send + Sync + 'static,
    ) {
        self.subscribers
            .entry(Subscription::Button(button))
            .or_default()
            .push(Box::new(callback));
    }

    pub fn on_direction(
        &mut self,
        direction: StickDirection,
        callback: impl FnMut(Handedness, &InputEvent) + Send + Sync + 'static,
    ) {
        self.subscribers
            .entry(Subscription::Direction(direction))
            .or_default()
            .push(Box::new(callback));
    }

    pub fn dispatch(&mut self, hand: Handedness, events: &[InputEvent]) {
        for event in events {
            let key = match *event {
                InputEvent::Pressed(button)
                | InputEvent::Released(button)
                | InputEvent::Held { button, .. } => Subscription::Button(button),
                InputEvent::ThumbstickDirection { to, .. } => Subscription::Direction(to),
            };
            if let Some(callbacks) = self.subscribers.get_mut(&key) {
                for callback in callbacks.iter_mut() {
                    callback(hand, event);
                }
            }
        }
    }
}

/// Named per-hand state, e.g. finger curl values keyed `"left_index"`.
///
/// Lookups of names that were never registered are reported as errors.
#[derive(Debug, Clone, Default)]
pub struct HandRegistry<T> {
    entries: HashMap<String, T>,
}

impl<T> HandRegistry<T> {
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(key.into(), value)
    }

    /// Key for `hand` and a part name: `("left", "index")` → `"left_index"`.
    pub fn key(hand: Handedness, part: &str) -> String {
        format!("{}_{}", hand.as_str(), part)
    }

    pub fn get(&self, key: &str) -> Result<&T> {
        self.entries
            .get(key)
            .ok_or_else(|| InteractionError::UnknownHand(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn snap(buttons: Buttons, trigger: f32, stick: Vec2) -> ControllerSnapshot {
        ControllerSnapshot {
            buttons,
            trigger,
            grip: 0.0,
            thumbstick: stick,
        }
    }

    #[test]
    fn press_hold_release_sequence() {
        let mut input = ControllerInput::default();
        let a = Buttons::default().with(ControllerButton::Primary);

        let e = input.update(&snap(a, 0.0, Vec2::zeros()), 0.1);
        assert_eq!(e, vec![InputEvent::Pressed(ControllerButton::Primary)]);

        let e = input.update(&snap(a, 0.0, Vec2::zeros()), 0.1);
        assert_eq!(
            e,
            vec![InputEvent::Held {
                button: ControllerButton::Primary,
                seconds: 0.1
            }]
        );

        let e = input.update(&snap(Buttons::default(), 0.0, Vec2::zeros()), 0.1);
        assert_eq!(e, vec![InputEvent::Released(ControllerButton::Primary)]);
    }

    #[test]
    fn analog_trigger_uses_hysteresis() {
        let mut input = ControllerInput::default();
        let none = Buttons::default();

        assert!(input.update(&snap(none, 0.5, Vec2::zeros()), 0.0).is_empty());
        let e = input.update(&snap(none, 0.6, Vec2::zeros()), 0.0);
        assert_eq!(e, vec![InputEvent::Pressed(ControllerButton::Trigger)]);
        // Between thresholds stays pressed.
        assert!(input.is_down(ControllerButton::Trigger));
        input.update(&snap(none, 0.4, Vec2::zeros()), 0.0);
        assert!(input.is_down(ControllerButton::Trigger));
        let e = input.update(&snap(none, 0.2, Vec2::zeros()), 0.0);
        assert_eq!(e, vec![InputEvent::Released(ControllerButton::Trigger)]);
    }

    #[test]
    fn thumbstick_reports_direction_changes_only() {
        let mut input = ControllerInput::default();
        let none = Buttons::default();

        assert!(input.update(&snap(none, 0.0, Vec2::new(0.1, 0.1)), 0.0).is_empty());
        let e = input.update(&snap(none, 0.0, Vec2::new(0.9, 0.2)), 0.0);
        assert_eq!(
            e,
            vec![InputEvent::ThumbstickDirection {
                from: StickDirection::Center,
                to: StickDirection::Right
            }]
        );
        assert!(input.update(&snap(none, 0.0, Vec2::new(0.8, 0.1)), 0.0).is_empty());
    }

    #[test]
    fn dispatcher_routes_to_button_subscribers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = InputDispatcher::default();
        let sink = seen.clone();
        dispatcher.on_button(ControllerButton::Grip, move |hand, event| {
            if let Ok(mut s) = sink.lock() {
                s.push((hand, *event));
            }
        });

        dispatcher.dispatch(
            Handedness::Left,
            &[
                InputEvent::Pressed(ControllerButton::Grip),
                InputEvent::Pressed(ControllerButton::Trigger),
            ],
        );

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(Handedness::Left, InputEvent::Pressed(ControllerButton::Grip))]
        );
    }

    #[test]
    fn unknown_hand_key_is_an_error() {
        let mut registry = HandRegistry::default();
        registry.insert(HandRegistry::<f32>::key(Handedness::Left, "index"), 0.5f32);
        assert_eq!(registry.get("left_index"), Ok(&0.5));
        assert_eq!(
            registry.get("right_index"),
            Err(InteractionError::UnknownHand("right_index".into()))
        );
    }
}
