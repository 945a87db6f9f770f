//! # interpreter
//!
//! Fetch, decode, execute. The interpreter owns memory and the register
//! file outright; the screen, timers and keypad are reached through
//! [`Peripherals`] so the host decides how they are shared.
//!
//! Quirks follow the original COSMAC VIP interpreter:
//!  * 8XY1/8XY2/8XY3 reset VF
//!  * 8XY6/8XYE shift VY into VX
//!  * BNNN always offsets by V0
//!  * FX55/FX65 leave I pointing just past the block
//!  * DXYN wraps the starting coordinate but clips the sprite at the edges
//!
//! Wherever an instruction writes both VX and VF, VF is written last.

use crate::error::Chip8Error;
use crate::framebuffer::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::instruction::{decode, Instruction, Operation};
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_FONT_ADDR, CHIP8_FONT_GLYPH_BYTES};
use crate::peripherals::{first_pressed, Peripherals, KEY_COUNT};
use crate::registers::{RegisterFile, VF};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

pub struct Chip8Interpreter<P: Peripherals> {
    memory: Chip8MemoryMap,
    registers: RegisterFile,
    peripherals: P,
    rng: StdRng,
}

impl<P: Peripherals> Chip8Interpreter<P> {
    pub fn new(peripherals: P) -> Self {
        Self::with_rng(peripherals, StdRng::from_entropy())
    }

    /// same as `new`, but CXNN produces a repeatable sequence
    pub fn with_seed(peripherals: P, seed: u64) -> Self {
        Self::with_rng(peripherals, StdRng::seed_from_u64(seed))
    }

    fn with_rng(peripherals: P, rng: StdRng) -> Self {
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: RegisterFile::new(),
            peripherals,
            rng,
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_program(program)
    }

    /// load a chip8 program from a ROM image
    pub fn load_program_from(&mut self, reader: &mut impl io::Read) -> Result<(), Chip8Error> {
        self.memory.load_program_from(reader)
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8MemoryMap {
        &mut self.memory
    }

    pub fn peripherals(&self) -> &P {
        &self.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut P {
        &mut self.peripherals
    }

    /// Run exactly one instruction. PC moves past the instruction before it
    /// executes, so jumps, calls and skips all work relative to the next one.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let pc = self.registers.pc;
        let word = self.memory.read_word(pc)?;
        self.registers.advance_pc();
        let op = decode(word);
        tracing::trace!(pc, %op, "step");
        self.execute(op)
    }

    pub fn execute(&mut self, op: Operation) -> Result<(), Chip8Error> {
        use Instruction::*;

        let r = &mut self.registers;
        match op.instruction {
            Clear => self.peripherals.clear_screen(),
            Return => r.pc = r.pop()?,
            Jump { addr } => r.pc = addr,
            Call { addr } => {
                r.push(r.pc)?;
                r.pc = addr;
            }
            SkipIfEqual { x, value } => {
                if r.v[x as usize] == value {
                    r.advance_pc();
                }
            }
            SkipIfNotEqual { x, value } => {
                if r.v[x as usize] != value {
                    r.advance_pc();
                }
            }
            SkipIfRegistersEqual { x, y } => {
                if r.v[x as usize] == r.v[y as usize] {
                    r.advance_pc();
                }
            }
            SkipIfRegistersNotEqual { x, y } => {
                if r.v[x as usize] != r.v[y as usize] {
                    r.advance_pc();
                }
            }
            SetImmediate { x, value } => r.v[x as usize] = value,
            AddImmediate { x, value } => {
                r.v[x as usize] = r.v[x as usize].wrapping_add(value);
            }
            Set { x, y } => r.v[x as usize] = r.v[y as usize],
            Or { x, y } => {
                r.v[x as usize] |= r.v[y as usize];
                r.v[VF] = 0;
            }
            And { x, y } => {
                r.v[x as usize] &= r.v[y as usize];
                r.v[VF] = 0;
            }
            Xor { x, y } => {
                r.v[x as usize] ^= r.v[y as usize];
                r.v[VF] = 0;
            }
            AddWithCarry { x, y } => {
                let (sum, carry) = r.v[x as usize].overflowing_add(r.v[y as usize]);
                r.v[x as usize] = sum;
                r.v[VF] = carry as u8;
            }
            Sub { x, y } => {
                let (vx, vy) = (r.v[x as usize], r.v[y as usize]);
                r.v[x as usize] = vx.wrapping_sub(vy);
                r.v[VF] = (vx >= vy) as u8;
            }
            SubReversed { x, y } => {
                let (vx, vy) = (r.v[x as usize], r.v[y as usize]);
                r.v[x as usize] = vy.wrapping_sub(vx);
                r.v[VF] = (vy >= vx) as u8;
            }
            ShiftRight { x, y } => {
                let vy = r.v[y as usize];
                r.v[x as usize] = vy >> 1;
                r.v[VF] = vy & 0x01;
            }
            ShiftLeft { x, y } => {
                let vy = r.v[y as usize];
                r.v[x as usize] = vy << 1;
                r.v[VF] = vy >> 7;
            }
            SetIndex { addr } => r.i = addr,
            JumpWithOffset { addr } => r.pc = addr.wrapping_add(r.v[0] as u16),
            Random { x, mask } => r.v[x as usize] = self.rng.gen::<u8>() & mask,
            Draw { x, y, rows } => self.draw(x, y, rows)?,
            SkipIfKeyPressed { x } => {
                if let Some(down) = self.key_down(x) {
                    if down {
                        self.registers.advance_pc();
                    }
                }
            }
            SkipIfKeyNotPressed { x } => {
                if let Some(down) = self.key_down(x) {
                    if !down {
                        self.registers.advance_pc();
                    }
                }
            }
            GetDelayTimer { x } => r.v[x as usize] = self.peripherals.delay_timer(),
            SetDelayTimer { x } => self.peripherals.set_delay_timer(r.v[x as usize]),
            SetSoundTimer { x } => self.peripherals.set_sound_timer(r.v[x as usize]),
            WaitForKey { x } => {
                let keys = self.peripherals.wait_for_key();
                match first_pressed(&keys) {
                    Some(key) => self.registers.v[x as usize] = key,
                    // nothing down yet: come back to this instruction next cycle
                    None => self.registers.pc = self.registers.pc.wrapping_sub(2),
                }
            }
            AddToIndex { x } => r.i = r.i.wrapping_add(r.v[x as usize] as u16),
            FontAddress { x } => {
                r.i = CHIP8_FONT_ADDR + r.v[x as usize] as u16 * CHIP8_FONT_GLYPH_BYTES;
            }
            Bcd { x } => {
                let value = r.v[x as usize];
                self.memory
                    .write(&[value / 100, value / 10 % 10, value % 10], r.i)?;
            }
            StoreRegisters { x } => {
                for reg in 0..=x as usize {
                    self.memory.write_byte(r.i, r.v[reg])?;
                    r.i = r.i.wrapping_add(1);
                }
            }
            LoadRegisters { x } => {
                for reg in 0..=x as usize {
                    r.v[reg] = self.memory.read_byte(r.i)?;
                    r.i = r.i.wrapping_add(1);
                }
            }
            Nop => {}
        }
        Ok(())
    }

    /// DXYN: N rows of sprite from I, drawn at (VX, VY)
    fn draw(&mut self, x: u8, y: u8, rows: u8) -> Result<(), Chip8Error> {
        // Only the start point wraps: a sprite at VX=66 lands at x=2, but one
        // at x=60 is still clipped at the right edge rather than wrapped.
        let left = self.registers.v[x as usize] as usize % SCREEN_WIDTH;
        let top = self.registers.v[y as usize] as usize % SCREEN_HEIGHT;
        self.registers.v[VF] = 0;

        // rows that would fall off the bottom are never read, let alone drawn
        let visible = (rows as usize).min(SCREEN_HEIGHT - top);
        let sprite = self.memory.get_ro_slice(self.registers.i, visible)?;
        let collision = self.peripherals.draw_sprite(left, top, sprite);
        self.registers.v[VF] = collision as u8;
        Ok(())
    }

    /// state of the key named by VX, or None when VX isn't a key
    fn key_down(&mut self, x: u8) -> Option<bool> {
        let key = self.registers.v[x as usize] as usize;
        if key >= KEY_COUNT {
            return None;
        }
        Some(self.peripherals.read_key_state()[key])
    }
}
