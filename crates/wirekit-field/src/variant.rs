//! Tagged union over a fixed set of alternative fields.
//!
//! The alternatives are an ordinary Rust enum, usually declared with
//! [`variant_alternatives!`](crate::variant_alternatives). A [`Variant`] owns
//! at most one live alternative; selecting or reading a new one always drops
//! the previous one first.

use bytes::BufMut;
use tracing::trace;

use crate::field::Field;
use crate::status::{CodecError, Result};

/// The closed set of alternatives a [`Variant`] can hold.
pub trait Alternatives: Sized {
    const COUNT: usize;

    /// A fresh alternative at `idx`, or `None` when out of range.
    fn create(idx: usize) -> Option<Self>;

    fn index(&self) -> usize;

    fn as_field(&self) -> &dyn Field;

    fn as_field_mut(&mut self) -> &mut dyn Field;
}

/// Declare an alternatives enum for [`Variant`](crate::Variant).
///
/// Each entry names the enum variant, the field type it wraps and the
/// expression that constructs a fresh instance. Read attempts follow
/// declaration order.
///
/// ```
/// use wirekit_field::{variant_alternatives, Field, IntValue, Variant};
///
/// variant_alternatives! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub enum Reading {
///         Small(IntValue<u8>) = IntValue::new(0).valid_range(0..=9)
///             .fail_on_invalid(wirekit_field::CodecError::ProtocolError),
///         Large(IntValue<u16>) = IntValue::new(0),
///     }
/// }
///
/// let mut value = Variant::<Reading>::new();
/// value.read(&mut &[0x20, 0x01][..]).unwrap();
/// assert!(matches!(value.current(), Some(Reading::Large(v)) if v.get() == 0x2001));
/// ```
#[macro_export]
macro_rules! variant_alternatives {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($alt:ident($ty:ty) = $ctor:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($alt($ty),)+
        }

        impl $crate::Alternatives for $name {
            const COUNT: usize = [$(stringify!($alt)),+].len();

            fn create(idx: usize) -> Option<Self> {
                let mut next = 0usize;
                $(
                    if idx == next {
                        return Some($name::$alt($ctor));
                    }
                    next += 1;
                )+
                let _ = next;
                None
            }

            fn index(&self) -> usize {
                let mut next = 0usize;
                $(
                    if let $name::$alt(_) = self {
                        return next;
                    }
                    next += 1;
                )+
                next
            }

            fn as_field(&self) -> &dyn $crate::Field {
                match self {
                    $($name::$alt(field) => field as &dyn $crate::Field,)+
                }
            }

            fn as_field_mut(&mut self) -> &mut dyn $crate::Field {
                match self {
                    $($name::$alt(field) => field as &mut dyn $crate::Field,)+
                }
            }
        }
    };
}

/// Field holding at most one of the alternatives in `A`.
///
/// By default a live alternative is simply dropped with the variant. A
/// [`Variant::strict`] variant instead requires an explicit
/// [`Variant::reset`] before it goes away and panics in debug builds when
/// dropped while an alternative is still live.
///
/// The length bounds over all alternatives are taken once, when the variant
/// is constructed, so querying them never builds a second alternative.
#[derive(Debug, PartialEq)]
pub struct Variant<A: Alternatives> {
    current: Option<A>,
    strict: bool,
    bounds: (usize, usize),
}

impl<A: Alternatives> Default for Variant<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Alternatives + Clone> Clone for Variant<A> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            strict: self.strict,
            bounds: self.bounds,
        }
    }
}

impl<A: Alternatives> Variant<A> {
    pub fn new() -> Self {
        Self {
            current: None,
            strict: false,
            bounds: Self::bounds(None),
        }
    }

    pub fn strict() -> Self {
        Self {
            current: None,
            strict: true,
            bounds: Self::bounds(None),
        }
    }

    pub fn with(alt: A) -> Self {
        Self {
            bounds: Self::bounds(Some(&alt)),
            current: Some(alt),
            strict: false,
        }
    }

    pub fn current(&self) -> Option<&A> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut A> {
        self.current.as_mut()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(Alternatives::index)
    }

    pub fn current_field(&self) -> Option<&dyn Field> {
        self.current.as_ref().map(Alternatives::as_field)
    }

    pub fn current_field_mut(&mut self) -> Option<&mut dyn Field> {
        self.current.as_mut().map(Alternatives::as_field_mut)
    }

    /// Whether an alternative is live.
    pub fn current_field_valid(&self) -> bool {
        self.current.is_some()
    }

    /// Drop the live alternative and construct a fresh one at `idx`.
    ///
    /// Returns `None`, leaving nothing live, when `idx` is out of range.
    pub fn select_field(&mut self, idx: usize) -> Option<&mut A> {
        self.current = None;
        self.current = A::create(idx);
        self.current.as_mut()
    }

    /// Same as [`Variant::select_field`], named after the construction step.
    pub fn init_field(&mut self, idx: usize) -> Option<&mut A> {
        self.select_field(idx)
    }

    pub fn set(&mut self, alt: A) {
        self.current = None;
        self.current = Some(alt);
    }

    pub fn take(&mut self) -> Option<A> {
        self.current.take()
    }

    /// Drop the live alternative, if any.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn deinit_field(&mut self) {
        self.reset();
    }

    /// Smallest minimum and largest maximum length over all alternatives.
    ///
    /// Alternatives are built one at a time; `held` stands in for its own
    /// index instead of being built again.
    fn bounds(held: Option<&A>) -> (usize, usize) {
        let skip = held.map(Alternatives::index);
        let mut min: Option<usize> = None;
        let mut max = 0;
        let mut note = |field: &dyn Field| {
            let low = field.min_length();
            min = Some(min.map_or(low, |seen| seen.min(low)));
            max = max.max(field.max_length());
        };
        if let Some(alt) = held {
            note(alt.as_field());
        }
        for idx in (0..A::COUNT).filter(|idx| Some(*idx) != skip) {
            if let Some(alt) = A::create(idx) {
                note(alt.as_field());
            }
        }
        (min.unwrap_or(0), max)
    }
}

impl<A: Alternatives> Drop for Variant<A> {
    fn drop(&mut self) {
        if self.strict && !std::thread::panicking() {
            debug_assert!(
                self.current.is_none(),
                "strict variant dropped with live alternative {:?}",
                self.current_index()
            );
        }
    }
}

impl<A: Alternatives> Field for Variant<A> {
    fn length(&self) -> usize {
        self.current_field().map_or(0, Field::length)
    }

    fn min_length(&self) -> usize {
        self.bounds.0
    }

    fn max_length(&self) -> usize {
        self.bounds.1
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        self.current = None;
        let mut best: Option<CodecError> = None;
        for idx in 0..A::COUNT {
            let Some(mut alt) = A::create(idx) else {
                continue;
            };
            let mut attempt = *buf;
            match alt.as_field_mut().read(&mut attempt) {
                Ok(()) => {
                    *buf = attempt;
                    self.current = Some(alt);
                    return Ok(());
                }
                Err(err) => {
                    trace!(alternative = idx, %err, "variant alternative rejected");
                    best = Some(best.map_or(err, |seen| seen.prefer(err)));
                }
            }
        }
        Err(best.unwrap_or(CodecError::ProtocolError))
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        match self.current_field() {
            Some(field) => field.write(buf),
            None => Ok(()),
        }
    }

    /// `false` while no alternative is live.
    fn valid(&self) -> bool {
        self.current_field().is_some_and(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        self.current_field_mut().is_some_and(|field| field.refresh())
    }

    fn can_write(&self) -> bool {
        self.current_field().is_none_or(Field::can_write)
    }
}
