pub mod gesture;
pub mod sink;

pub use gesture::{Events, GestureError, GestureMapper, GestureThresholds, Zone};
pub use sink::{dispatch, EventSink, JsonLineSink, LogSink, VecSink};

use std::fmt;

/// Buttons of the downstream control surface, numbered as the simulator expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Button {
    A = 0,
    B = 1,
    Up = 2,
    Down = 3,
    Left = 4,
    Right = 5,
    Menu = 6,
    Reset = 7,
}

impl Button {
    pub const COUNT: usize = 8;

    pub const ALL: [Button; Button::COUNT] = [
        Button::A,
        Button::B,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Menu,
        Button::Reset,
    ];

    /// The button driven by the pitch trigger.
    pub const PRIMARY_ACTION: Button = Button::A;

    pub fn id(self) -> u8 {
        self as u8
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::A => "A",
            Button::B => "B",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
            Button::Menu => "MENU",
            Button::Reset => "RESET",
        };
        f.write_str(name)
    }
}

/// A single press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn new(button: Button, pressed: bool) -> Self {
        Self { button, pressed }
    }

    pub fn press(button: Button) -> Self {
        Self::new(button, true)
    }

    pub fn release(button: Button) -> Self {
        Self::new(button, false)
    }
}

/// Pressed/released flag per button. Starts with everything released.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonState {
    pressed: [bool; Button::COUNT],
}

impl ButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `button`, yielding an event only when it changes.
    pub fn set(&mut self, button: Button, value: bool) -> Option<ButtonEvent> {
        let slot = &mut self.pressed[button.index()];
        if *slot == value {
            return None;
        }
        *slot = value;
        Some(ButtonEvent::new(button, value))
    }

    pub(crate) fn is_pressed(&self, button: Button) -> bool {
        self.pressed[button.index()]
    }
}
