use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chip8vm::display::MonoTermDisplay;
use chip8vm::emulator::{interval, Emulator, EmulatorConfig};
use chip8vm::input::TerminalInput;
use chip8vm::interpreter::Chip8Interpreter;
use chip8vm::peripherals::SharedPeripherals;
use chip8vm::sound::{Mute, SimpleBeep, Sound};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run a CHIP-8 program in the terminal. Esc quits.
#[derive(Parser)]
#[clap(version, about)]
struct Opt {
    /// ROM image to load at 0x200
    rom: PathBuf,

    /// instructions executed per second
    #[clap(long, default_value_t = 700.0, value_parser = parse_rate)]
    cycles_per_second: f64,

    /// don't use the PC speaker
    #[clap(long)]
    mute: bool,

    /// seed for CXNN, for repeatable runs
    #[clap(long)]
    seed: Option<u64>,

    /// write logs here (filtered by RUST_LOG); the terminal is taken by the display
    #[clap(long)]
    log_file: Option<PathBuf>,
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{}", e))?;
    interval(rate).map_err(|e| e.to_string())?;
    Ok(rate)
}

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run<S: Sound>(opt: &Opt, sound: S) -> Result<(), Box<dyn Error>> {
    let peripherals = SharedPeripherals::new();
    let mut interpreter = match opt.seed {
        Some(seed) => Chip8Interpreter::with_seed(peripherals, seed),
        None => Chip8Interpreter::new(peripherals),
    };

    // load a program
    let mut f = File::open(&opt.rom)?;
    interpreter.load_program_from(&mut f)?;
    tracing::info!(rom = %opt.rom.display(), "loaded");

    let config = EmulatorConfig {
        cycles_per_second: opt.cycles_per_second,
        ..EmulatorConfig::default()
    };
    let input = TerminalInput::new()?;
    let display = MonoTermDisplay::new()?;
    let finished = Emulator::new(display, input, sound, config)?.run(interpreter)?;

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..4 {
        println!();
    }
    if let Some(fault) = finished.fault {
        let registers = finished.interpreter.registers();
        eprintln!(
            "halted: {} (pc={:03x} i={:03x} v={:02x?} stack={:03x?})",
            fault,
            registers.pc,
            registers.i,
            registers.v,
            registers.stack()
        );
        return Err(fault.into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::parse();
    if let Some(path) = &opt.log_file {
        init_logging(path)?;
    }

    if opt.mute {
        run(&opt, Mute::new())
    } else {
        run(&opt, SimpleBeep::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_per_second_must_be_positive() {
        for bad in ["0", "-5", "NaN", "inf", "fast"] {
            let arg = format!("--cycles-per-second={}", bad);
            assert!(
                Opt::try_parse_from(["chip8vm", arg.as_str(), "pong.ch8"]).is_err(),
                "{} accepted",
                bad
            );
        }
        let opt = Opt::try_parse_from(["chip8vm", "--cycles-per-second", "1000", "pong.ch8"])
            .unwrap();
        assert_eq!(opt.cycles_per_second, 1000.0);
        let opt = Opt::try_parse_from(["chip8vm", "pong.ch8"]).unwrap();
        assert_eq!(opt.cycles_per_second, 700.0);
    }
}
