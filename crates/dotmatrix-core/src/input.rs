/// The eight joypad buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

// P1 select lines are active low.
const SELECT_DIRECTIONS: u8 = 0x10;
const SELECT_ACTIONS: u8 = 0x20;

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
    ];

    /// Bit in the combined button byte: directions in the low nibble, actions
    /// in the high nibble, each in P1 bit order.
    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }

    /// Parse a button name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        let button = match name.to_ascii_lowercase().as_str() {
            "right" => Button::Right,
            "left" => Button::Left,
            "up" => Button::Up,
            "down" => Button::Down,
            "a" => Button::A,
            "b" => Button::B,
            "select" => Button::Select,
            "start" => Button::Start,
            _ => return None,
        };
        Some(button)
    }
}

/// Live button state as seen by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Input {
    pressed: u8,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&mut self, button: Button, down: bool) {
        if down {
            self.pressed |= button.mask();
        } else {
            self.pressed &= !button.mask();
        }
    }

    pub fn press(&mut self, button: Button) {
        self.set_pressed(button, true);
    }

    pub fn release(&mut self, button: Button) {
        self.set_pressed(button, false);
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed & button.mask() != 0
    }

    /// Active-low button nibble for the groups selected by P1 bits 4-5.
    pub fn matrix(&self, select: u8) -> u8 {
        let mut nibble = 0x0F;
        if select & SELECT_DIRECTIONS == 0 {
            nibble &= !(self.pressed & 0x0F);
        }
        if select & SELECT_ACTIONS == 0 {
            nibble &= !(self.pressed >> 4);
        }
        nibble
    }
}
