//! Turns 16-bit words into something the interpreter can match on.
//!
//! Decoding never fails: anything that isn't one of the 35 instructions comes
//! out as [`Instruction::Nop`]. That includes `0NNN` machine-code calls, which
//! no interpreter since the COSMAC VIP could actually run.

/// register index, 0x0-0xf
pub type Reg = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XNN
    SkipIfEqual { x: Reg, value: u8 },
    /// 4XNN
    SkipIfNotEqual { x: Reg, value: u8 },
    /// 5XY0
    SkipIfRegistersEqual { x: Reg, y: Reg },
    /// 9XY0
    SkipIfRegistersNotEqual { x: Reg, y: Reg },
    /// 6XNN
    SetImmediate { x: Reg, value: u8 },
    /// 7XNN
    AddImmediate { x: Reg, value: u8 },
    /// 8XY0
    Set { x: Reg, y: Reg },
    /// 8XY1
    Or { x: Reg, y: Reg },
    /// 8XY2
    And { x: Reg, y: Reg },
    /// 8XY3
    Xor { x: Reg, y: Reg },
    /// 8XY4
    AddWithCarry { x: Reg, y: Reg },
    /// 8XY5
    Sub { x: Reg, y: Reg },
    /// 8XY7
    SubReversed { x: Reg, y: Reg },
    /// 8XY6
    ShiftRight { x: Reg, y: Reg },
    /// 8XYE
    ShiftLeft { x: Reg, y: Reg },
    /// ANNN
    SetIndex { addr: u16 },
    /// BNNN
    JumpWithOffset { addr: u16 },
    /// CXNN
    Random { x: Reg, mask: u8 },
    /// DXYN
    Draw { x: Reg, y: Reg, rows: u8 },
    /// EX9E
    SkipIfKeyPressed { x: Reg },
    /// EXA1
    SkipIfKeyNotPressed { x: Reg },
    /// FX07
    GetDelayTimer { x: Reg },
    /// FX0A
    WaitForKey { x: Reg },
    /// FX15
    SetDelayTimer { x: Reg },
    /// FX18
    SetSoundTimer { x: Reg },
    /// FX1E
    AddToIndex { x: Reg },
    /// FX29
    FontAddress { x: Reg },
    /// FX33
    Bcd { x: Reg },
    /// FX55
    StoreRegisters { x: Reg },
    /// FX65
    LoadRegisters { x: Reg },
    Nop,
}

/// a decoded word: the raw bits plus what they mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub word: u16,
    pub instruction: Instruction,
}

impl Operation {
    pub fn x(&self) -> Reg {
        ((self.word & 0x0f00) >> 8) as u8
    }

    pub fn y(&self) -> Reg {
        ((self.word & 0x00f0) >> 4) as u8
    }

    pub fn n(&self) -> u8 {
        (self.word & 0x000f) as u8
    }

    pub fn nn(&self) -> u8 {
        (self.word & 0x00ff) as u8
    }

    pub fn nnn(&self) -> u16 {
        self.word & 0x0fff
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x} {:?}", self.word, self.instruction)
    }
}

pub fn decode(word: u16) -> Operation {
    use Instruction::*;

    let op = Operation {
        word,
        instruction: Nop,
    };
    let (x, y, n, nn, nnn) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());

    let instruction = match word {
        0x00e0 => Clear,
        0x00ee => Return,
        _ => match word >> 12 {
            0x0 => Nop,
            0x1 => Jump { addr: nnn },
            0x2 => Call { addr: nnn },
            0x3 => SkipIfEqual { x, value: nn },
            0x4 => SkipIfNotEqual { x, value: nn },
            0x5 => SkipIfRegistersEqual { x, y },
            0x6 => SetImmediate { x, value: nn },
            0x7 => AddImmediate { x, value: nn },
            0x8 => match n {
                0x0 => Set { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddWithCarry { x, y },
                0x5 => Sub { x, y },
                0x6 => ShiftRight { x, y },
                0x7 => SubReversed { x, y },
                0xe => ShiftLeft { x, y },
                _ => Nop,
            },
            0x9 => SkipIfRegistersNotEqual { x, y },
            0xa => SetIndex { addr: nnn },
            0xb => JumpWithOffset { addr: nnn },
            0xc => Random { x, mask: nn },
            0xd => Draw { x, y, rows: n },
            0xe => match nn {
                0x9e => SkipIfKeyPressed { x },
                0xa1 => SkipIfKeyNotPressed { x },
                _ => Nop,
            },
            // 0xf, the only nibble left
            _ => match nn {
                0x07 => GetDelayTimer { x },
                0x0a => WaitForKey { x },
                0x15 => SetDelayTimer { x },
                0x18 => SetSoundTimer { x },
                0x1e => AddToIndex { x },
                0x29 => FontAddress { x },
                0x33 => Bcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => Nop,
            },
        },
    };

    Operation { instruction, ..op }
}

#[cfg(test)]
mod tests {
    use super::Instruction::*;
    use super::*;

    #[test]
    fn test_zero_argument_words() {
        assert_eq!(decode(0x00e0).instruction, Clear);
        assert_eq!(decode(0x00ee).instruction, Return);
    }

    #[test]
    fn test_jump() {
        let op = decode(0x1abc);
        assert_eq!(op.instruction, Jump { addr: 0xabc });
        assert_eq!(op.word, 0x1abc);
    }

    #[test]
    fn test_fields() {
        let op = decode(0xd7b3);
        assert_eq!(op.x(), 0x7);
        assert_eq!(op.y(), 0xb);
        assert_eq!(op.n(), 0x3);
        assert_eq!(op.nn(), 0xb3);
        assert_eq!(op.nnn(), 0x7b3);
        assert_eq!(op.instruction, Draw { x: 7, y: 0xb, rows: 3 });
    }

    #[test]
    fn test_every_category() {
        let cases = [
            (0x2456, Call { addr: 0x456 }),
            (0x342a, SkipIfEqual { x: 4, value: 0x2a }),
            (0x4a75, SkipIfNotEqual { x: 0xa, value: 0x75 }),
            (0x5ae0, SkipIfRegistersEqual { x: 0xa, y: 0xe }),
            (0x63f5, SetImmediate { x: 3, value: 0xf5 }),
            (0x7b12, AddImmediate { x: 0xb, value: 0x12 }),
            (0x8590, Set { x: 5, y: 9 }),
            (0x8101, Or { x: 1, y: 0 }),
            (0x8642, And { x: 6, y: 4 }),
            (0x87f3, Xor { x: 7, y: 0xf }),
            (0x8264, AddWithCarry { x: 2, y: 6 }),
            (0x8c45, Sub { x: 0xc, y: 4 }),
            (0x8126, ShiftRight { x: 1, y: 2 }),
            (0x86d7, SubReversed { x: 6, y: 0xd }),
            (0x8e3e, ShiftLeft { x: 0xe, y: 3 }),
            (0x9990, SkipIfRegistersNotEqual { x: 9, y: 9 }),
            (0xa568, SetIndex { addr: 0x568 }),
            (0xbabc, JumpWithOffset { addr: 0xabc }),
            (0xc5af, Random { x: 5, mask: 0xaf }),
            (0xe49e, SkipIfKeyPressed { x: 4 }),
            (0xeca1, SkipIfKeyNotPressed { x: 0xc }),
            (0xf907, GetDelayTimer { x: 9 }),
            (0xfd0a, WaitForKey { x: 0xd }),
            (0xf315, SetDelayTimer { x: 3 }),
            (0xf718, SetSoundTimer { x: 7 }),
            (0xf91e, AddToIndex { x: 9 }),
            (0xff29, FontAddress { x: 0xf }),
            (0xf533, Bcd { x: 5 }),
            (0xf655, StoreRegisters { x: 6 }),
            (0xf265, LoadRegisters { x: 2 }),
        ];
        for (word, expected) in cases {
            assert_eq!(decode(word).instruction, expected, "{:04x}", word);
        }
    }

    #[test]
    fn test_unmatched_words_are_nops() {
        for word in [
            0x0000, 0x0123, 0x00e1, 0x00ff, 0x8008, 0x800f, 0x812d, 0xe100, 0xe19f, 0xf000,
            0xf130, 0xf0ff,
        ] {
            assert_eq!(decode(word).instruction, Nop, "{:04x}", word);
        }
    }

    #[test]
    fn test_total_over_all_words() {
        // nothing panics, and the raw word always survives
        for word in 0..=u16::MAX {
            assert_eq!(decode(word).word, word);
        }
    }
}
