/// The delay and sound timers. The interpreter reads and writes them; a 60Hz
/// driver counts them down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    delay: u8,
    sound: u8,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn set_delay(&mut self, value: u8) {
        self.delay = value;
    }

    pub fn sound(&self) -> u8 {
        self.sound
    }

    pub fn set_sound(&mut self, value: u8) {
        self.sound = value;
    }

    /// Count both timers down by one, stopping at zero. Returns whether the
    /// buzzer should be on for this tick, decided before the decrement: a
    /// sound timer of N sounds for exactly N ticks.
    pub fn tick(&mut self) -> bool {
        let sounding = self.sound > 0;
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
        sounding
    }
}
