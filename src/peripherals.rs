//! Everything the interpreter touches that isn't memory or registers: the
//! screen, the timers and the keypad.
//!
//! [`LocalPeripherals`] owns all of it directly, which suits tests and hosts
//! that run everything on one thread. [`SharedPeripherals`] is a cloneable
//! handle for hosts that run the instruction cycle and the 60Hz
//! presentation/timer loop on different threads; every piece sits behind its
//! own lock, and the keypad has a condition variable so `FX0A` can sleep
//! until a key goes down.

use crate::framebuffer::Framebuffer;
use crate::timer::TimerState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

pub const KEY_COUNT: usize = 16;

/// which of the 16 keys are held down, indexed by key value
pub type KeyState = [bool; KEY_COUNT];

/// lowest key that is down, if any
pub fn first_pressed(keys: &KeyState) -> Option<u8> {
    keys.iter().position(|&down| down).map(|k| k as u8)
}

/// What the executor needs from the outside world.
pub trait Peripherals {
    fn clear_screen(&mut self);

    /// XOR an 8-pixel row onto the screen, returning true on collision
    fn draw_row(&mut self, x: usize, y: usize, bits: u8) -> bool;

    /// XOR a sprite (one byte per row) onto the screen, returning true if any
    /// row collided. Implementations shared between threads should draw it
    /// in one go, so nobody sees half a sprite.
    fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut collision = false;
        for (row, &bits) in rows.iter().enumerate() {
            collision |= self.draw_row(x, y + row, bits);
        }
        collision
    }

    /// the key state as of the most recent poll
    fn read_key_state(&mut self) -> KeyState;

    /// Block until at least one key is down and return that state. An
    /// implementation that has nothing to block on (or is shutting down) may
    /// return a state with no keys down; the instruction is then retried on
    /// the next cycle.
    fn wait_for_key(&mut self) -> KeyState;

    fn delay_timer(&self) -> u8;
    fn set_delay_timer(&mut self, value: u8);
    fn sound_timer(&self) -> u8;
    fn set_sound_timer(&mut self, value: u8);
}

/// single-threaded peripherals; the host pokes the fields directly
#[derive(Debug, Default)]
pub struct LocalPeripherals {
    pub framebuffer: Framebuffer,
    pub timers: TimerState,
    pub keys: KeyState,
}

impl LocalPeripherals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripherals for LocalPeripherals {
    fn clear_screen(&mut self) {
        self.framebuffer.clear();
    }

    fn draw_row(&mut self, x: usize, y: usize, bits: u8) -> bool {
        self.framebuffer.draw_row(x, y, bits)
    }

    fn read_key_state(&mut self) -> KeyState {
        self.keys
    }

    // nobody else can change the keys while we hold &mut self, so there is
    // nothing to wait for
    fn wait_for_key(&mut self) -> KeyState {
        self.keys
    }

    fn delay_timer(&self) -> u8 {
        self.timers.delay()
    }

    fn set_delay_timer(&mut self, value: u8) {
        self.timers.set_delay(value);
    }

    fn sound_timer(&self) -> u8 {
        self.timers.sound()
    }

    fn set_sound_timer(&mut self, value: u8) {
        self.timers.set_sound(value);
    }
}

#[derive(Default)]
struct Screen {
    framebuffer: Framebuffer,
    dirty: bool,
}

#[derive(Default)]
struct Shared {
    screen: Mutex<Screen>,
    timers: Mutex<TimerState>,
    keys: Mutex<KeyState>,
    key_update: Condvar,
    shutdown: AtomicBool,
}

/// Peripherals shared between the instruction-cycle thread and the
/// presentation/timer thread. Clones are handles onto the same state.
#[derive(Clone, Default)]
pub struct SharedPeripherals {
    shared: Arc<Shared>,
}

// a panicking driver shouldn't take the other one down with it; the data
// behind these locks is always in a usable state
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedPeripherals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the key state with a fresh poll and wake anything waiting
    /// in `wait_for_key`.
    pub fn publish_keys(&self, keys: KeyState) {
        *lock(&self.shared.keys) = keys;
        self.shared.key_update.notify_all();
    }

    /// One 60Hz timer tick. Returns whether the buzzer should sound.
    pub fn tick_timers(&self) -> bool {
        lock(&self.shared.timers).tick()
    }

    /// A copy of the screen if it changed since the last call.
    pub fn take_frame(&self) -> Option<Framebuffer> {
        let mut screen = lock(&self.shared.screen);
        if !screen.dirty {
            return None;
        }
        screen.dirty = false;
        Some(screen.framebuffer.clone())
    }

    /// Release anything blocked in `wait_for_key`; it returns with no keys
    /// down from now on.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.key_update.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }
}

impl Peripherals for SharedPeripherals {
    fn clear_screen(&mut self) {
        let mut screen = lock(&self.shared.screen);
        screen.framebuffer.clear();
        screen.dirty = true;
    }

    fn draw_row(&mut self, x: usize, y: usize, bits: u8) -> bool {
        let mut screen = lock(&self.shared.screen);
        screen.dirty = true;
        screen.framebuffer.draw_row(x, y, bits)
    }

    // one lock for the whole sprite
    fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut screen = lock(&self.shared.screen);
        screen.dirty = true;
        screen.framebuffer.draw_sprite(x, y, rows)
    }

    fn read_key_state(&mut self) -> KeyState {
        *lock(&self.shared.keys)
    }

    fn wait_for_key(&mut self) -> KeyState {
        let keys = lock(&self.shared.keys);
        let keys = self
            .shared
            .key_update
            .wait_while(keys, |keys| {
                first_pressed(keys).is_none() && !self.shared.shutdown.load(Ordering::SeqCst)
            })
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_shut_down() {
            return [false; KEY_COUNT];
        }
        *keys
    }

    fn delay_timer(&self) -> u8 {
        lock(&self.shared.timers).delay()
    }

    fn set_delay_timer(&mut self, value: u8) {
        lock(&self.shared.timers).set_delay(value);
    }

    fn sound_timer(&self) -> u8 {
        lock(&self.shared.timers).sound()
    }

    fn set_sound_timer(&mut self, value: u8) {
        lock(&self.shared.timers).set_sound(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_first_pressed() {
        let mut keys = [false; KEY_COUNT];
        assert_eq!(first_pressed(&keys), None);
        keys[0xc] = true;
        keys[0xf] = true;
        assert_eq!(first_pressed(&keys), Some(0xc));
    }

    #[test]
    fn test_timers_shared_between_handles() {
        let mut cpu_side = SharedPeripherals::new();
        let timer_side = cpu_side.clone();
        cpu_side.set_delay_timer(3);
        cpu_side.set_sound_timer(1);
        assert!(timer_side.tick_timers());
        assert!(!timer_side.tick_timers());
        assert_eq!(cpu_side.delay_timer(), 1);
        assert_eq!(cpu_side.sound_timer(), 0);
    }

    #[test]
    fn test_take_frame_only_when_dirty() {
        let mut cpu_side = SharedPeripherals::new();
        let host_side = cpu_side.clone();
        assert!(host_side.take_frame().is_none());
        cpu_side.draw_row(0, 0, 0x80);
        let frame = host_side.take_frame().expect("frame should be dirty");
        assert!(frame.is_set(0, 0));
        assert!(host_side.take_frame().is_none());
    }

    #[test]
    fn test_frames_never_show_half_a_sprite() {
        let mut cpu_side = SharedPeripherals::new();
        let host_side = cpu_side.clone();
        let drawer = thread::spawn(move || {
            for _ in 0..500 {
                cpu_side.clear_screen();
                cpu_side.draw_sprite(0, 0, &[0xff; 15]);
            }
        });
        while !drawer.is_finished() {
            if let Some(frame) = host_side.take_frame() {
                let lit = frame.lit_pixels().count();
                assert!(lit == 0 || lit == 8 * 15, "{} pixels lit", lit);
            }
        }
        drawer.join().unwrap();
    }

    #[test]
    fn test_wait_for_key_wakes_on_publish() {
        let mut cpu_side = SharedPeripherals::new();
        let input_side = cpu_side.clone();
        let waiter = thread::spawn(move || cpu_side.wait_for_key());

        // a poll with nothing down must not wake it
        input_side.publish_keys([false; KEY_COUNT]);
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        let mut keys = [false; KEY_COUNT];
        keys[7] = true;
        input_side.publish_keys(keys);
        assert_eq!(waiter.join().unwrap(), keys);
    }

    #[test]
    fn test_wait_for_key_released_by_shutdown() {
        let mut cpu_side = SharedPeripherals::new();
        let host_side = cpu_side.clone();
        let waiter = thread::spawn(move || cpu_side.wait_for_key());
        thread::sleep(Duration::from_millis(10));
        host_side.shutdown();
        assert_eq!(waiter.join().unwrap(), [false; KEY_COUNT]);
    }
}
