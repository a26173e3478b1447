// kernel/src/keyboard/buffer.rs
//
// Fixed ring of KeyEvents.  Producer: the keyboard IRQ handler.
// Consumer: ordinary kernel context.  Single core, so the only hazard is
// the IRQ firing mid-pop; both sides therefore update head/tail/count
// with the keyboard IRQ line masked at the PIC.  That is the entire
// critical section: no global cli, no spinning.
//
// Overflow policy: a push into a full ring drops the INCOMING event, so
// a stuck key cannot overwrite older events (e.g. a pending release).

use core::cell::UnsafeCell;

use crate::interrupts::pic;

use super::KeyEvent;

pub const CAPACITY: usize = 256;

pub struct EventQueue {
    slots: UnsafeCell<[KeyEvent; CAPACITY]>,
    /// Next slot to pop
    head: UnsafeCell<usize>,
    /// Next slot to push
    tail: UnsafeCell<usize>,
    count: UnsafeCell<usize>,
}

// SAFETY: every access to the inner cells happens inside
// `with_keyboard_irq_masked`, which excludes the only other writer
// (the IRQ handler) on this single-core design.
unsafe impl Sync for EventQueue {}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            slots: UnsafeCell::new([KeyEvent::NONE; CAPACITY]),
            head: UnsafeCell::new(0),
            tail: UnsafeCell::new(0),
            count: UnsafeCell::new(0),
        }
    }

    /// Append one event.  Returns false if the ring was full and the
    /// event was dropped.
    pub fn push(&self, event: KeyEvent) -> bool {
        pic::with_keyboard_irq_masked(|| unsafe {
            let count = &mut *self.count.get();
            if *count == CAPACITY {
                return false;
            }
            let tail = &mut *self.tail.get();
            (*self.slots.get())[*tail] = event;
            *tail = (*tail + 1) % CAPACITY;
            *count += 1;
            true
        })
    }

    /// Remove the oldest event, if any.
    pub fn pop(&self) -> Option<KeyEvent> {
        pic::with_keyboard_irq_masked(|| unsafe {
            let count = &mut *self.count.get();
            if *count == 0 {
                return None;
            }
            let head = &mut *self.head.get();
            let event = (*self.slots.get())[*head];
            *head = (*head + 1) % CAPACITY;
            *count -= 1;
            Some(event)
        })
    }

    pub fn len(&self) -> usize {
        pic::with_keyboard_irq_masked(|| unsafe { *self.count.get() })
    }

    pub fn clear(&self) {
        pic::with_keyboard_irq_masked(|| unsafe {
            *self.head.get() = 0;
            *self.tail.get() = 0;
            *self.count.get() = 0;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::modifiers::Modifiers;

    fn event(scancode: u8) -> KeyEvent {
        KeyEvent {
            scancode,
            ascii: 0,
            modifiers: Modifiers::empty(),
            pressed: true,
        }
    }

    #[test_case]
    fn fifo_order_is_preserved() {
        let queue = EventQueue::new();
        for code in 0..8u8 {
            assert!(queue.push(event(code)));
        }
        assert_eq!(queue.len(), 8);
        for code in 0..8u8 {
            assert_eq!(queue.pop().unwrap().scancode, code);
        }
        assert!(queue.pop().is_none());
    }

    #[test_case]
    fn overflow_drops_the_incoming_event() {
        let queue = EventQueue::new();
        for i in 0..CAPACITY {
            assert!(queue.push(event(i as u8)));
        }
        // capacity + 1: rejected, count stays put
        assert!(!queue.push(event(0xAB)));
        assert_eq!(queue.len(), CAPACITY);

        // the oldest entry is still first out
        assert_eq!(queue.pop().unwrap().scancode, 0);
    }

    #[test_case]
    fn clear_resets_indices() {
        let queue = EventQueue::new();
        for code in 0..5u8 {
            queue.push(event(code));
        }
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());

        // usable again from slot zero
        queue.push(event(0x42));
        assert_eq!(queue.pop().unwrap().scancode, 0x42);
    }

    #[test_case]
    fn wrap_around_keeps_order() {
        let queue = EventQueue::new();
        for round in 0..3 {
            for i in 0..CAPACITY {
                assert!(queue.push(event((round + i) as u8)));
            }
            for i in 0..CAPACITY {
                assert_eq!(queue.pop().unwrap().scancode, (round + i) as u8);
            }
        }
    }
}
