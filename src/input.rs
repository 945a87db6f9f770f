use crate::peripherals::{KeyState, KEY_COUNT};
use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::Duration;

/// maps the left-hand side of a qwerty keyboard onto the COSMAC hex keypad:
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// Terminals only report key presses (and auto-repeat), never releases, so a
/// key counts as held for this many polls after its last press.
const KEY_HOLD_POLLS: u8 = 8;

/// the result of one poll of the keyboard
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyPoll {
    pub keys: KeyState,
    /// the user asked to leave
    pub quit: bool,
}

/// reads keypresses
pub trait Input {
    /// the keypad as it stands right now
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error>;
}

/// keypad held in remaining-hold counters, one per key
#[derive(Debug, Default)]
struct HeldKeys([u8; KEY_COUNT]);

impl HeldKeys {
    fn press(&mut self, key: u8) {
        self.0[key as usize] = KEY_HOLD_POLLS;
    }

    /// state for this poll, then age every key by one poll
    fn age(&mut self) -> KeyState {
        let mut state = [false; KEY_COUNT];
        for (down, hold) in state.iter_mut().zip(self.0.iter_mut()) {
            *down = *hold > 0;
            *hold = hold.saturating_sub(1);
        }
        state
    }
}

/// keyboard input from the terminal, using crossterm in raw mode
pub struct TerminalInput {
    held: HeldKeys,
    keymap: HashMap<char, u8>,
}

impl TerminalInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TerminalInput {
            held: HeldKeys::default(),
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        })
    }

    fn read_terminal(&mut self) -> Result<bool, io::Error> {
        let mut quit = false;
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                        Some(&mapped_key) => self.held.press(mapped_key),
                        None => {
                            tracing::warn!(?key, "can't map key to a COSMAC key");
                        }
                    },
                    KeyCode::Esc => quit = true,
                    code => {
                        tracing::debug!(?code, "ignoring key");
                    }
                },
                other => {
                    tracing::debug!(?other, "ignoring terminal event");
                }
            }
        }
        Ok(quit)
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::error!(%e, "couldn't leave raw mode");
        }
    }
}

impl Input for TerminalInput {
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error> {
        let quit = self.read_terminal()?;
        Ok(KeyPoll {
            keys: self.held.age(),
            quit,
        })
    }
}

/// dummy Input implementation for testing; hands out scripted polls, then
/// repeats the last one forever
pub struct DummyInput {
    polls: Vec<KeyPoll>,
}

impl DummyInput {
    pub fn new(polls: &[KeyPoll]) -> Self {
        DummyInput {
            polls: polls.iter().rev().copied().collect(),
        }
    }

    /// these keys held down for `polls` polls, then quit
    pub fn holding(keys: &[u8], polls: usize) -> Self {
        let mut held = KeyPoll::default();
        for &k in keys {
            held.keys[k as usize] = true;
        }
        let mut script = vec![held; polls];
        script.push(KeyPoll {
            quit: true,
            ..KeyPoll::default()
        });
        Self::new(&script)
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error> {
        match self.polls.len() {
            0 => Ok(KeyPoll::default()),
            1 => Ok(self.polls[0]),
            _ => Ok(self.polls.pop().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_every_key() {
        let mut seen = [false; KEY_COUNT];
        for (_, k) in CHIP8_CONVENTIONAL_KEYMAP {
            seen[k as usize] = true;
        }
        assert_eq!(seen, [true; KEY_COUNT]);
    }

    #[test]
    fn test_held_keys_expire() {
        let mut held = HeldKeys::default();
        held.press(0xa);
        for _ in 0..KEY_HOLD_POLLS {
            assert!(held.age()[0xa]);
        }
        assert!(!held.age()[0xa]);
    }

    #[test]
    fn test_repress_extends_hold() {
        let mut held = HeldKeys::default();
        held.press(3);
        held.age();
        held.press(3);
        for _ in 0..KEY_HOLD_POLLS {
            assert!(held.age()[3]);
        }
    }

    #[test]
    fn test_dummy_input_script() -> Result<(), io::Error> {
        let quit = KeyPoll {
            quit: true,
            ..KeyPoll::default()
        };
        let mut input = DummyInput::new(&[KeyPoll::default(), quit]);
        assert!(!input.poll_keys()?.quit);
        assert!(input.poll_keys()?.quit);
        assert!(input.poll_keys()?.quit);
        Ok(())
    }

    #[test]
    fn test_dummy_input_holding() -> Result<(), io::Error> {
        let mut input = DummyInput::holding(&[0x1, 0xf], 2);
        for _ in 0..2 {
            let poll = input.poll_keys()?;
            assert!(poll.keys[0x1] && poll.keys[0xf]);
            assert!(!poll.keys[0x0] && !poll.quit);
        }
        assert!(input.poll_keys()?.quit);
        Ok(())
    }
}
