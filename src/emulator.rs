//! The environment: sets everything up and runs the two drivers.
//!
//! The instruction cycle gets its own thread and owns the interpreter (and
//! with it memory and registers). The calling thread runs the 60Hz loop that
//! polls the keypad, counts the timers down, drives the buzzer and redraws the
//! screen. The two only meet inside [`SharedPeripherals`].

use crate::display::Display;
use crate::error::{Chip8Error, ConfigError};
use crate::input::Input;
use crate::interpreter::Chip8Interpreter;
use crate::peripherals::SharedPeripherals;
use crate::sound::Sound;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmulatorConfig {
    /// instructions per second
    pub cycles_per_second: f64,
    /// timer/input/screen updates per second
    pub timer_hz: f64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            cycles_per_second: 700.0,
            timer_hz: 60.0,
        }
    }
}

impl EmulatorConfig {
    /// check both rates can actually be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        interval(self.cycles_per_second)?;
        interval(self.timer_hz)?;
        Ok(())
    }
}

/// time between iterations of something that happens `per_second` times a second
pub fn interval(per_second: f64) -> Result<Duration, ConfigError> {
    if !(per_second.is_finite() && per_second > 0.0) {
        return Err(ConfigError::BadRate(per_second));
    }
    // a rate so small that the interval won't fit a Duration
    Duration::try_from_secs_f64(1.0 / per_second).map_err(|_| ConfigError::BadRate(per_second))
}

/// Paces a loop to a fixed rate. Falling behind doesn't cause a burst of
/// catch-up iterations; the schedule just restarts from now.
struct Pacer {
    interval: Duration,
    next: Instant,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Pacer {
            interval,
            next: Instant::now() + interval,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next {
            spin_sleep::sleep(self.next - now);
            self.next += self.interval;
        } else {
            self.next = now + self.interval;
        }
    }
}

/// what's left once the user quits
pub struct Finished {
    pub interpreter: Chip8Interpreter<SharedPeripherals>,
    /// the error that halted the program, if one did
    pub fault: Option<Chip8Error>,
}

pub struct Emulator<D: Display, I: Input, S: Sound> {
    display: D,
    input: I,
    sound: S,
    config: EmulatorConfig,
    cycle_interval: Duration,
    frame_interval: Duration,
}

impl<D: Display, I: Input, S: Sound> Emulator<D, I, S> {
    /// Fails if either rate in `config` is zero, negative or not a number.
    pub fn new(
        display: D,
        input: I,
        sound: S,
        config: EmulatorConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Emulator {
            display,
            input,
            sound,
            cycle_interval: interval(config.cycles_per_second)?,
            frame_interval: interval(config.timer_hz)?,
            config,
        })
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until the input asks to quit. A fatal error stops the instruction
    /// cycle but the screen stays up, frozen, until then.
    pub fn run(
        &mut self,
        interpreter: Chip8Interpreter<SharedPeripherals>,
    ) -> Result<Finished, Box<dyn Error>> {
        let host = interpreter.peripherals().clone();
        let running = Arc::new(AtomicBool::new(true));

        let cycle_thread = {
            let running = Arc::clone(&running);
            let rate = self.config.cycles_per_second;
            let pacer = Pacer::new(self.cycle_interval);
            thread::Builder::new()
                .name("chip8-cycle".into())
                .spawn(move || run_cycles(interpreter, &running, pacer, rate))?
        };

        let result = self.present(&host, &cycle_thread);

        // let the cycle thread go, even if it is parked on FX0A
        running.store(false, Ordering::SeqCst);
        host.shutdown();
        let finished = cycle_thread
            .join()
            .map_err(|_| "instruction cycle thread panicked")?;
        self.sound.update(false)?;

        result.map(|_| finished)
    }

    fn present(
        &mut self,
        host: &SharedPeripherals,
        cycle_thread: &thread::JoinHandle<Finished>,
    ) -> Result<(), Box<dyn Error>> {
        let mut pacer = Pacer::new(self.frame_interval);
        let mut halted = false;
        tracing::debug!(hz = self.config.timer_hz, "presentation loop started");

        loop {
            let poll = self.input.poll_keys()?;
            if poll.quit {
                tracing::info!("quit requested");
                return Ok(());
            }
            host.publish_keys(poll.keys);

            let sounding = host.tick_timers();
            if let Err(e) = self.sound.update(sounding) {
                tracing::warn!(%e, "sound device failed");
            }

            if let Some(frame) = host.take_frame() {
                self.display.draw(&frame)?;
            }

            if !halted && cycle_thread.is_finished() {
                halted = true;
                tracing::info!("instruction cycle stopped; waiting for quit");
            }

            pacer.wait();
        }
    }
}

/// the instruction-cycle driver
fn run_cycles(
    mut interpreter: Chip8Interpreter<SharedPeripherals>,
    running: &AtomicBool,
    mut pacer: Pacer,
    cycles_per_second: f64,
) -> Finished {
    tracing::debug!(hz = cycles_per_second, "instruction cycle started");

    while running.load(Ordering::SeqCst) {
        if let Err(e) = interpreter.step() {
            let registers = interpreter.registers();
            tracing::error!(%e, pc = registers.pc, i = registers.i, "halted");
            return Finished {
                interpreter,
                fault: Some(e),
            };
        }
        pacer.wait();
    }

    Finished {
        interpreter,
        fault: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::{DummyInput, KeyPoll};
    use crate::sound::Mute;

    const FAST: EmulatorConfig = EmulatorConfig {
        cycles_per_second: 10_000.0,
        timer_hz: 200.0,
    };

    #[test]
    fn test_bad_rates_rejected() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e-300] {
            assert!(
                matches!(interval(rate), Err(ConfigError::BadRate(_))),
                "{} accepted",
                rate
            );
        }
        assert_eq!(interval(4.0), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn test_emulator_refuses_stopped_clock() {
        let stopped = EmulatorConfig {
            cycles_per_second: 0.0,
            ..EmulatorConfig::default()
        };
        assert!(Emulator::new(DummyDisplay::new(), quit_after(0), Mute::new(), stopped).is_err());
        let no_timers = EmulatorConfig {
            timer_hz: -60.0,
            ..EmulatorConfig::default()
        };
        assert!(
            Emulator::new(DummyDisplay::new(), quit_after(0), Mute::new(), no_timers).is_err()
        );
        assert!(EmulatorConfig::default().validate().is_ok());
    }

    fn quit_after(polls: usize) -> DummyInput {
        let mut script = vec![KeyPoll::default(); polls];
        script.push(KeyPoll {
            quit: true,
            ..KeyPoll::default()
        });
        DummyInput::new(&script)
    }

    fn interpreter(program: &[u8]) -> Chip8Interpreter<SharedPeripherals> {
        let mut i = Chip8Interpreter::with_seed(SharedPeripherals::new(), 0);
        i.load_program(program).unwrap();
        i
    }

    #[test]
    fn test_runs_program_and_draws() -> Result<(), Box<dyn Error>> {
        // draw glyph 0 at (0, 0), then spin
        let program = [0xd0, 0x15, 0x12, 0x02];
        let mut emu = Emulator::new(DummyDisplay::new(), quit_after(20), Mute::new(), FAST)?;
        let finished = emu.run(interpreter(&program))?;
        assert!(finished.fault.is_none());
        assert_eq!(finished.interpreter.registers().pc, 0x202);
        let frame = emu.display().last.as_ref().expect("a frame was drawn");
        assert!(frame.is_set(0, 0));
        Ok(())
    }

    #[test]
    fn test_fatal_error_is_reported() -> Result<(), Box<dyn Error>> {
        // return with nothing on the stack
        let mut emu = Emulator::new(DummyDisplay::new(), quit_after(10), Mute::new(), FAST)?;
        let finished = emu.run(interpreter(&[0x00, 0xee]))?;
        assert!(matches!(finished.fault, Some(Chip8Error::StackUnderflow)));
        // state as it was when it died
        assert_eq!(finished.interpreter.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_quit_releases_key_wait() -> Result<(), Box<dyn Error>> {
        let mut emu = Emulator::new(DummyDisplay::new(), quit_after(5), Mute::new(), FAST)?;
        let finished = emu.run(interpreter(&[0xf0, 0x0a]))?;
        assert!(finished.fault.is_none());
        assert_eq!(finished.interpreter.registers().pc, 0x200);
        Ok(())
    }

    #[test]
    fn test_key_wait_satisfied_by_input() -> Result<(), Box<dyn Error>> {
        // wait for a key into V3, then spin
        let mut held = KeyPoll::default();
        held.keys[0x5] = true;
        let mut script = vec![KeyPoll::default(), held, held, held, held];
        script.push(KeyPoll {
            quit: true,
            ..KeyPoll::default()
        });
        let mut emu = Emulator::new(
            DummyDisplay::new(),
            DummyInput::new(&script),
            Mute::new(),
            FAST,
        )?;
        let finished = emu.run(interpreter(&[0xf3, 0x0a, 0x12, 0x02]))?;
        assert_eq!(finished.interpreter.registers().v[3], 0x5);
        assert_eq!(finished.interpreter.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_held_key_reaches_skip() -> Result<(), Box<dyn Error>> {
        // V0 = 0xa; skip the spin at 0x204 once key A is down, then spin at 0x206
        let program = [0x60, 0x0a, 0xe0, 0x9e, 0x12, 0x02, 0x12, 0x06];
        let mut emu = Emulator::new(
            DummyDisplay::new(),
            DummyInput::holding(&[0xa], 20),
            Mute::new(),
            FAST,
        )?;
        let finished = emu.run(interpreter(&program))?;
        assert_eq!(finished.interpreter.registers().pc, 0x206);
        Ok(())
    }
}
