use crate::error::Chip8Error;
use crate::memory::CHIP8_PROGRAM_ADDR;

/// the flag register; lots of instructions clobber it
pub const VF: usize = 0xf;

/// the call stack is unbounded on paper, this just stops runaway recursion
/// eating all the host's memory
pub const MAX_STACK_DEPTH: usize = 1024;

/// V0-VF, the index register, the program counter and the return stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    stack: Vec<u16>,
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile {
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            stack: Vec::new(),
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Chip8Error> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(Chip8Error::StackOverflow {
                depth: MAX_STACK_DEPTH,
            });
        }
        self.stack.push(addr);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        self.stack.pop().ok_or(Chip8Error::StackUnderflow)
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    /// move on to the next instruction (or skip the next one)
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
