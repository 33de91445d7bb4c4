//! Alternatives of a variant are never alive at the same time.

use std::cell::Cell;

use bytes::{Buf, BufMut};
use quickcheck_macros::quickcheck;
use wirekit_field::{variant_alternatives, CodecError, Field, Result, Variant};

thread_local! {
    static LIVE: Cell<usize> = const { Cell::new(0) };
    static PEAK: Cell<usize> = const { Cell::new(0) };
}

fn live() -> usize {
    LIVE.with(Cell::get)
}

fn peak() -> usize {
    PEAK.with(Cell::get)
}

fn reset_counters() {
    PEAK.with(|peak| peak.set(live()));
}

/// A one-byte field that only accepts its own tag and counts live instances.
#[derive(Debug, PartialEq)]
struct Tracked {
    tag: u8,
}

impl Tracked {
    fn new(tag: u8) -> Self {
        LIVE.with(|live| {
            let now = live.get() + 1;
            live.set(now);
            PEAK.with(|peak| peak.set(peak.get().max(now)));
        });
        Self { tag }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Self::new(self.tag)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        LIVE.with(|live| live.set(live.get() - 1));
    }
}

impl Field for Tracked {
    fn length(&self) -> usize {
        1
    }

    fn min_length(&self) -> usize {
        1
    }

    fn max_length(&self) -> usize {
        1
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Err(CodecError::NotEnoughData);
        }
        if buf[0] != self.tag {
            return Err(CodecError::ProtocolError);
        }
        buf.advance(1);
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        if buf.remaining_mut() < 1 {
            return Err(CodecError::BufferOverflow);
        }
        buf.put_u8(self.tag);
        Ok(())
    }
}

variant_alternatives! {
    #[derive(Debug, Clone, PartialEq)]
    enum Slot {
        First(Tracked) = Tracked::new(1),
        Second(Tracked) = Tracked::new(2),
        Third(Tracked) = Tracked::new(3),
    }
}

#[test]
fn read_attempts_do_not_overlap() {
    reset_counters();
    let mut field = Variant::<Slot>::new();
    field.select_field(0);
    assert_eq!(live(), 1);

    field.read(&mut &[3u8][..]).unwrap();
    assert_eq!(field.current_index(), Some(2));
    assert_eq!(live(), 1);
    assert_eq!(peak(), 1);

    assert_eq!(field.read(&mut &[9u8][..]), Err(CodecError::ProtocolError));
    assert_eq!(live(), 0);

    drop(field);
    assert_eq!(live(), 0);
}

#[test]
fn failed_read_reports_best_status() {
    let mut field = Variant::<Slot>::new();
    assert_eq!(field.read(&mut &[0u8; 0][..]), Err(CodecError::NotEnoughData));
    assert!(!field.current_field_valid());
}

#[test]
fn strict_variant_reset_before_drop() {
    reset_counters();
    let mut field = Variant::<Slot>::strict();
    field.read(&mut &[2u8][..]).unwrap();
    field.reset();
    assert_eq!(live(), 0);
}

#[test]
#[should_panic(expected = "strict variant dropped with live alternative")]
fn strict_variant_live_drop_is_caught() {
    let mut field = Variant::<Slot>::strict();
    field.read(&mut &[2u8][..]).unwrap();
}

#[quickcheck]
fn at_most_one_alternative_alive(ops: Vec<u8>) -> bool {
    reset_counters();
    let baseline = live();
    let mut field = Variant::<Slot>::new();
    for op in ops {
        match op % 3 {
            0 => {
                field.select_field(usize::from(op / 3 % 4));
            }
            1 => {
                let _ = field.read(&mut &[op % 4][..]);
            }
            _ => field.reset(),
        }
        let expected = baseline + usize::from(field.current_field_valid());
        if live() != expected || peak() > baseline + 1 {
            return false;
        }
    }
    drop(field);
    live() == baseline
}

#[test]
fn length_bounds_do_not_build_alternatives() {
    reset_counters();
    let baseline = live();
    let mut field = Variant::<Slot>::new();
    field.select_field(1);
    assert_eq!(live(), baseline + 1);

    assert_eq!(field.min_length(), 1);
    assert_eq!(field.max_length(), 1);
    assert_eq!(live(), baseline + 1);
    assert_eq!(peak(), baseline + 1);
}
