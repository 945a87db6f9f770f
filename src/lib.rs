//! A CHIP-8 interpreter.
//!
//! ## Design
//!
//! * bit-exact COSMAC VIP behaviour, quirks included
//! * map to instructions, not machine cycles; the host decides the rate
//! * abstract display, input and sound so alternatives can be plugged in;
//!   a TUI in-console host is included
//! * no globals: an interpreter is a value you construct and drive
//!
//! Model
//!
//! ```text
//! Environment (emulator)
//!  |-- display, input, sound, config
//!  |-- interpreter(peripherals)
//!  |    |-- memory (font + program)
//!  |    |-- register file (V0-VF, I, PC, stack)
//!  |    |-- decoder
//!  |    `-- executor
//!  |-- instruction-cycle thread
//!  |    `-- interpreter.step() at cycles_per_second
//!  `-- presentation loop at 60Hz
//!       |-- poll input -> publish key state (wakes FX0A)
//!       |-- tick timers -> sound on/off
//!       `-- redraw if the framebuffer changed
//! ```
//!
//! Screen, timers and keypad are the only state both loops touch; they sit
//! behind [`peripherals::SharedPeripherals`]. Memory and registers belong to
//! the instruction-cycle thread alone.
pub mod display;
pub mod emulator;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod peripherals;
pub mod registers;
pub mod sound;
pub mod timer;

pub use error::Chip8Error;
pub use interpreter::Chip8Interpreter;
