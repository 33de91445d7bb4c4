//! Homogeneous sequences and their length-prefixing adapters.
//!
//! A [`Sequence`] combines element storage ([`Elements`]) with a
//! [`CountMode`] that decides how many elements are on the wire and an
//! [`ElemMode`] that decides how each element is delimited. An optional
//! trailing suffix field follows the elements.

use bytes::{Buf, BufMut};
use tracing::trace;

use crate::access::mask;
use crate::adapter::IntRepr;
use crate::field::{ensure_available, ensure_capacity, Field};
use crate::int::IntValue;
use crate::status::{CodecError, Result};

/// Element storage of a [`Sequence`].
pub trait Elements {
    fn count(&self) -> usize;

    /// An empty container configured like this one.
    fn empty(&self) -> Self
    where
        Self: Sized;

    fn elem_length(&self, idx: usize) -> usize;

    fn elem_min_length(&self) -> usize;

    fn elem_max_length(&self) -> usize;

    /// Length of the element used to pad fixed-count sequences.
    fn default_length(&self) -> usize;

    /// Decode one element and append it.
    fn read_elem(&mut self, buf: &mut &[u8]) -> Result<()>;

    fn write_elem(&self, idx: usize, buf: &mut dyn BufMut) -> Result<()>;

    fn write_default(&self, buf: &mut dyn BufMut) -> Result<()>;

    fn elem_valid(&self, _idx: usize) -> bool {
        true
    }

    fn elem_can_write(&self, _idx: usize) -> bool {
        true
    }

    fn refresh_elems(&mut self) -> bool {
        false
    }
}

impl Elements for Vec<u8> {
    fn count(&self) -> usize {
        self.len()
    }

    fn empty(&self) -> Self {
        Vec::new()
    }

    fn elem_length(&self, _idx: usize) -> usize {
        1
    }

    fn elem_min_length(&self) -> usize {
        1
    }

    fn elem_max_length(&self) -> usize {
        1
    }

    fn default_length(&self) -> usize {
        1
    }

    fn read_elem(&mut self, buf: &mut &[u8]) -> Result<()> {
        ensure_available(buf, 1)?;
        self.push(buf.get_u8());
        Ok(())
    }

    fn write_elem(&self, idx: usize, buf: &mut dyn BufMut) -> Result<()> {
        ensure_capacity(buf, 1)?;
        buf.put_u8(self.get(idx).copied().unwrap_or_default());
        Ok(())
    }

    fn write_default(&self, buf: &mut dyn BufMut) -> Result<()> {
        ensure_capacity(buf, 1)?;
        buf.put_u8(0);
        Ok(())
    }
}

/// A list of fields decoded by cloning a template element.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldList<E: Field + Clone> {
    template: E,
    items: Vec<E>,
}

impl<E: Field + Clone> FieldList<E> {
    pub fn new(template: E) -> Self {
        Self {
            template,
            items: Vec::new(),
        }
    }

    pub fn template(&self) -> &E {
        &self.template
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<E> {
        &mut self.items
    }

    /// A new element configured like the template.
    pub fn make(&self) -> E {
        self.template.clone()
    }
}

impl<E: Field + Clone> Elements for FieldList<E> {
    fn count(&self) -> usize {
        self.items.len()
    }

    fn empty(&self) -> Self {
        Self::new(self.template.clone())
    }

    fn elem_length(&self, idx: usize) -> usize {
        self.items.get(idx).map_or(0, Field::length)
    }

    fn elem_min_length(&self) -> usize {
        self.template.min_length()
    }

    fn elem_max_length(&self) -> usize {
        self.template.max_length()
    }

    fn default_length(&self) -> usize {
        self.template.length()
    }

    fn read_elem(&mut self, buf: &mut &[u8]) -> Result<()> {
        let mut elem = self.template.clone();
        elem.read(buf)?;
        self.items.push(elem);
        Ok(())
    }

    fn write_elem(&self, idx: usize, buf: &mut dyn BufMut) -> Result<()> {
        match self.items.get(idx) {
            Some(elem) => elem.write(buf),
            None => Ok(()),
        }
    }

    fn write_default(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.template.write(buf)
    }

    fn elem_valid(&self, idx: usize) -> bool {
        self.items.get(idx).is_some_and(Field::valid)
    }

    fn elem_can_write(&self, idx: usize) -> bool {
        self.items.get(idx).is_some_and(Field::can_write)
    }

    fn refresh_elems(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            changed |= item.refresh();
        }
        changed
    }
}

/// How the number of elements is determined.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CountMode {
    /// Elements fill all remaining input.
    #[default]
    Unbounded,
    /// Exactly `n` elements; writes pad with default elements.
    Fixed(usize),
    /// A prefix carrying the element count.
    CountPrefix(IntValue<u64>),
    /// A prefix carrying the serialized length of the elements.
    LengthPrefix(IntValue<u64>),
    /// Elements until a terminator with the given value.
    Terminated(IntValue<u64>),
}

/// How each element is delimited.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ElemMode {
    #[default]
    Natural,
    /// Every element occupies exactly this many bytes.
    Forced(usize),
    /// Every element is preceded by its serialized length. A prefix with all
    /// bits set reports `escape` instead, when configured.
    LengthPrefix {
        prefix: IntValue<u64>,
        escape: Option<CodecError>,
    },
}

/// A sequence field. See the module docs for the available modes.
///
/// Equality compares elements and configuration. The value held by a count
/// or length prefix follows from the elements and is not compared.
#[derive(Debug, Clone)]
pub struct Sequence<S: Elements> {
    elems: S,
    count: CountMode,
    elem: ElemMode,
    suffix: Option<IntValue<u64>>,
    capacity: Option<usize>,
}

impl<S: Elements + PartialEq> PartialEq for Sequence<S> {
    fn eq(&self, other: &Self) -> bool {
        let count_eq = match (&self.count, &other.count) {
            (CountMode::CountPrefix(a), CountMode::CountPrefix(b))
            | (CountMode::LengthPrefix(a), CountMode::LengthPrefix(b)) => {
                prefixed(a, 0) == prefixed(b, 0)
            }
            (a, b) => a == b,
        };
        count_eq
            && self.elems == other.elems
            && self.elem == other.elem
            && self.suffix == other.suffix
            && self.capacity == other.capacity
    }
}

/// Raw bytes.
pub type RawData = Sequence<Vec<u8>>;

/// A list of fields.
pub type ArrayList<E> = Sequence<FieldList<E>>;

impl<S: Elements> Sequence<S> {
    pub fn new(elems: S) -> Self {
        Self {
            elems,
            count: CountMode::Unbounded,
            elem: ElemMode::Natural,
            suffix: None,
            capacity: None,
        }
    }

    pub fn count_mode(mut self, mode: CountMode) -> Self {
        self.count = mode;
        self
    }

    pub fn fixed_count(self, n: usize) -> Self {
        self.count_mode(CountMode::Fixed(n))
    }

    pub fn count_prefix(self, prefix: IntValue<u64>) -> Self {
        self.count_mode(CountMode::CountPrefix(prefix))
    }

    pub fn length_prefix(self, prefix: IntValue<u64>) -> Self {
        self.count_mode(CountMode::LengthPrefix(prefix))
    }

    pub fn terminated_by(self, terminator: IntValue<u64>) -> Self {
        self.count_mode(CountMode::Terminated(terminator))
    }

    pub fn elem_mode(mut self, mode: ElemMode) -> Self {
        self.elem = mode;
        self
    }

    pub fn forced_elem_length(self, len: usize) -> Self {
        self.elem_mode(ElemMode::Forced(len))
    }

    pub fn elem_length_prefix(self, prefix: IntValue<u64>, escape: Option<CodecError>) -> Self {
        self.elem_mode(ElemMode::LengthPrefix { prefix, escape })
    }

    /// Append a fixed trailing field after the elements.
    pub fn suffix(mut self, suffix: IntValue<u64>) -> Self {
        self.suffix = Some(suffix);
        self
    }

    /// Reject reads with more than `max` elements.
    pub fn capacity(mut self, max: usize) -> Self {
        self.capacity = Some(max);
        self
    }

    pub fn elems(&self) -> &S {
        &self.elems
    }

    pub fn elems_mut(&mut self) -> &mut S {
        &mut self.elems
    }

    pub fn into_elems(self) -> S {
        self.elems
    }

    pub fn count(&self) -> usize {
        self.elems.count()
    }

    pub fn count_config(&self) -> &CountMode {
        &self.count
    }

    /// The prefix as last read or refreshed.
    pub fn prefix(&self) -> Option<&IntValue<u64>> {
        match &self.count {
            CountMode::CountPrefix(prefix) | CountMode::LengthPrefix(prefix) => Some(prefix),
            _ => None,
        }
    }

    /// Replace the contents with exactly `n` elements read from `buf`.
    pub fn read_n(&mut self, buf: &mut &[u8], n: usize) -> Result<()> {
        let mut elems = self.elems.empty();
        let mut cursor = *buf;
        self.read_elems(&mut elems, &mut cursor, n)?;
        self.elems = elems;
        *buf = cursor;
        Ok(())
    }

    /// Write the first `n` elements, with no count information.
    pub fn write_n(&self, buf: &mut dyn BufMut, n: usize) -> Result<()> {
        let n = n.min(self.elems.count());
        ensure_capacity(buf, (0..n).map(|idx| self.elem_len(Some(idx))).sum())?;
        for idx in 0..n {
            self.write_one(Some(idx), buf)?;
        }
        Ok(())
    }

    fn fixed_len(&self) -> Option<usize> {
        match self.count {
            CountMode::Fixed(n) => Some(n),
            _ => None,
        }
    }

    /// Serialized length of element `idx`, or of a padding element.
    fn elem_len(&self, idx: Option<usize>) -> usize {
        let natural = idx.map_or_else(|| self.elems.default_length(), |idx| self.elems.elem_length(idx));
        match &self.elem {
            ElemMode::Natural => natural,
            ElemMode::Forced(len) => *len,
            ElemMode::LengthPrefix { prefix, .. } => prefixed(prefix, natural).length() + natural,
        }
    }

    fn slots(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        let count = self.elems.count();
        let total = self.fixed_len().unwrap_or(count);
        (0..total).map(move |idx| (idx < count).then_some(idx))
    }

    fn elems_length(&self) -> usize {
        self.slots().map(|slot| self.elem_len(slot)).sum()
    }

    fn check_capacity(&self, count: usize) -> Result<()> {
        match self.capacity {
            Some(max) if count > max => {
                trace!(count, max, "sequence capacity exceeded");
                Err(CodecError::ProtocolError)
            }
            _ => Ok(()),
        }
    }

    fn read_one(&self, elems: &mut S, cursor: &mut &[u8]) -> Result<()> {
        match &self.elem {
            ElemMode::Natural => elems.read_elem(cursor),
            ElemMode::Forced(len) => within(cursor, *len, |window| elems.read_elem(window)),
            ElemMode::LengthPrefix { prefix, escape } => {
                let mut prefix = prefix.clone();
                prefix.read(cursor)?;
                if let Some(status) = escape {
                    if is_escape(&prefix) {
                        return Err(*status);
                    }
                }
                let len = usize::try_from(prefix.get()).map_err(|_| CodecError::ProtocolError)?;
                within(cursor, len, |window| elems.read_elem(window))
            }
        }
    }

    fn read_elems(&self, elems: &mut S, cursor: &mut &[u8], n: usize) -> Result<()> {
        for _ in 0..n {
            self.read_one(elems, cursor)?;
        }
        Ok(())
    }

    fn read_to_end(&self, elems: &mut S, window: &mut &[u8]) -> Result<()> {
        while !window.is_empty() {
            let before = window.len();
            self.read_one(elems, window)?;
            if window.len() == before {
                return Err(CodecError::ProtocolError);
            }
            self.check_capacity(elems.count())?;
        }
        Ok(())
    }

    fn write_one(&self, idx: Option<usize>, buf: &mut dyn BufMut) -> Result<()> {
        let write = |buf: &mut dyn BufMut| match idx {
            Some(idx) => self.elems.write_elem(idx, buf),
            None => self.elems.write_default(buf),
        };
        let natural = idx.map_or_else(|| self.elems.default_length(), |idx| self.elems.elem_length(idx));
        match &self.elem {
            ElemMode::Natural => write(buf),
            ElemMode::Forced(len) => {
                let pad = len.checked_sub(natural).ok_or(CodecError::InvalidMsgData)?;
                write(buf)?;
                buf.put_bytes(0, pad);
                Ok(())
            }
            ElemMode::LengthPrefix { prefix, .. } => {
                prefixed(prefix, natural).write(buf)?;
                write(buf)
            }
        }
    }

    fn elem_writable(&self, idx: Option<usize>) -> bool {
        if let Some(idx) = idx {
            if !self.elems.elem_can_write(idx) {
                return false;
            }
        }
        let natural = idx.map_or_else(|| self.elems.default_length(), |idx| self.elems.elem_length(idx));
        match &self.elem {
            ElemMode::Natural => true,
            ElemMode::Forced(len) => natural <= *len,
            ElemMode::LengthPrefix { prefix, escape } => {
                let prefix = prefixed(prefix, natural);
                prefix.can_write() && (escape.is_none() || !is_escape(&prefix))
            }
        }
    }
}

/// `prefix` carrying `value`.
fn prefixed(prefix: &IntValue<u64>, value: usize) -> IntValue<u64> {
    prefix.clone().with_value(value as u64)
}

/// Whether a length prefix holds the all-ones escape value.
fn is_escape(prefix: &IntValue<u64>) -> bool {
    !matches!(prefix.repr(), IntRepr::Var { .. }) && prefix.get() == mask(prefix.bit_length())
}

/// Run `read` over exactly `len` bytes of `cursor` and consume them all.
fn within(
    cursor: &mut &[u8],
    len: usize,
    read: impl FnOnce(&mut &[u8]) -> Result<()>,
) -> Result<()> {
    ensure_available(cursor, len)?;
    let mut window = &cursor[..len];
    match read(&mut window) {
        Ok(()) => {}
        Err(CodecError::NotEnoughData) => return Err(CodecError::ProtocolError),
        Err(err) => return Err(err),
    }
    *cursor = &cursor[len..];
    Ok(())
}

impl<S: Elements> Field for Sequence<S> {
    fn length(&self) -> usize {
        let elems = self.elems_length();
        let head = match &self.count {
            CountMode::CountPrefix(prefix) => prefixed(prefix, self.elems.count()).length(),
            CountMode::LengthPrefix(prefix) => prefixed(prefix, elems).length(),
            _ => 0,
        };
        let tail = match &self.count {
            CountMode::Terminated(term) => term.length(),
            _ => 0,
        };
        head + elems + tail + self.suffix.as_ref().map_or(0, Field::length)
    }

    fn min_length(&self) -> usize {
        let elem_min = match &self.elem {
            ElemMode::Natural => self.elems.elem_min_length(),
            ElemMode::Forced(len) => *len,
            ElemMode::LengthPrefix { prefix, .. } => {
                prefix.min_length() + self.elems.elem_min_length()
            }
        };
        let count = match &self.count {
            CountMode::Fixed(n) => n * elem_min,
            CountMode::CountPrefix(prefix) | CountMode::LengthPrefix(prefix) => {
                prefix.min_length()
            }
            CountMode::Terminated(term) => term.length(),
            CountMode::Unbounded => 0,
        };
        count + self.suffix.as_ref().map_or(0, Field::length)
    }

    fn max_length(&self) -> usize {
        let elem_max = match &self.elem {
            ElemMode::Natural => self.elems.elem_max_length(),
            ElemMode::Forced(len) => *len,
            ElemMode::LengthPrefix { prefix, .. } => prefix
                .max_length()
                .saturating_add(self.elems.elem_max_length()),
        };
        let count = self.fixed_len().or(self.capacity);
        let elems = count.map_or(usize::MAX, |n| n.saturating_mul(elem_max));
        let extra = match &self.count {
            CountMode::CountPrefix(prefix) | CountMode::LengthPrefix(prefix) => {
                prefix.max_length()
            }
            CountMode::Terminated(term) => term.length(),
            _ => 0,
        };
        elems
            .saturating_add(extra)
            .saturating_add(self.suffix.as_ref().map_or(0, Field::length))
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        let mut elems = self.elems.empty();
        let mut cursor = *buf;
        let mut prefix_read = None;
        let suffix_len = self.suffix.as_ref().map_or(0, Field::length);

        match &self.count {
            CountMode::Unbounded => {
                let avail = cursor
                    .len()
                    .checked_sub(suffix_len)
                    .ok_or(CodecError::NotEnoughData)?;
                let mut window = &cursor[..avail];
                self.read_to_end(&mut elems, &mut window)?;
                cursor = &cursor[avail..];
            }
            CountMode::Fixed(n) => self.read_elems(&mut elems, &mut cursor, *n)?,
            CountMode::CountPrefix(prefix) => {
                let mut prefix = prefix.clone();
                prefix.read(&mut cursor)?;
                let n = usize::try_from(prefix.get()).map_err(|_| CodecError::ProtocolError)?;
                self.check_capacity(n)?;
                self.read_elems(&mut elems, &mut cursor, n)?;
                prefix_read = Some(prefix);
            }
            CountMode::LengthPrefix(prefix) => {
                let mut prefix = prefix.clone();
                prefix.read(&mut cursor)?;
                let len = usize::try_from(prefix.get()).map_err(|_| CodecError::ProtocolError)?;
                within(&mut cursor, len, |window| self.read_to_end(&mut elems, window))?;
                prefix_read = Some(prefix);
            }
            CountMode::Terminated(term) => loop {
                let mut candidate = term.clone();
                let mut peek = cursor;
                if candidate.read(&mut peek).is_ok() && candidate.get() == term.get() {
                    cursor = peek;
                    break;
                }
                self.read_one(&mut elems, &mut cursor)?;
                self.check_capacity(elems.count())?;
            },
        }

        let suffix = match &self.suffix {
            Some(suffix) => {
                let mut suffix = suffix.clone();
                suffix.read(&mut cursor)?;
                Some(suffix)
            }
            None => None,
        };

        self.elems = elems;
        if let Some(read) = prefix_read {
            if let CountMode::CountPrefix(prefix) | CountMode::LengthPrefix(prefix) = &mut self.count
            {
                *prefix = read;
            }
        }
        if suffix.is_some() {
            self.suffix = suffix;
        }
        *buf = cursor;
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        if !self.can_write() {
            return Err(CodecError::InvalidMsgData);
        }
        ensure_capacity(buf, self.length())?;

        match &self.count {
            CountMode::CountPrefix(prefix) => prefixed(prefix, self.elems.count()).write(buf)?,
            CountMode::LengthPrefix(prefix) => prefixed(prefix, self.elems_length()).write(buf)?,
            _ => {}
        }
        for slot in self.slots() {
            self.write_one(slot, buf)?;
        }
        if let CountMode::Terminated(term) = &self.count {
            term.write(buf)?;
        }
        if let Some(suffix) = &self.suffix {
            suffix.write(buf)?;
        }
        Ok(())
    }

    fn valid(&self) -> bool {
        let count = self.elems.count();
        self.capacity.is_none_or(|max| count <= max)
            && (0..count).all(|idx| self.elems.elem_valid(idx))
    }

    fn refresh(&mut self) -> bool {
        let mut changed = self.elems.refresh_elems();
        let value = match &self.count {
            CountMode::CountPrefix(_) => self.elems.count(),
            CountMode::LengthPrefix(_) => self.elems_length(),
            _ => return changed,
        };
        if let CountMode::CountPrefix(prefix) | CountMode::LengthPrefix(prefix) = &mut self.count {
            if prefix.get() != value as u64 {
                prefix.set(value as u64);
                changed = true;
            }
        }
        changed
    }

    fn can_write(&self) -> bool {
        let count = self.elems.count();
        let head_fits = match &self.count {
            CountMode::CountPrefix(prefix) => prefixed(prefix, count).can_write(),
            CountMode::LengthPrefix(prefix) => prefixed(prefix, self.elems_length()).can_write(),
            CountMode::Fixed(_) => true,
            _ => self.capacity.is_none_or(|max| count <= max),
        };
        head_fits && self.slots().all(|slot| self.elem_writable(slot))
    }
}

impl Sequence<Vec<u8>> {
    /// Unbounded raw bytes.
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.elems
    }

    pub fn set_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.elems = bytes.into();
    }
}

impl<E: Field + Clone> Sequence<FieldList<E>> {
    /// Unbounded list of fields shaped like `template`.
    pub fn list(template: E) -> Self {
        Self::new(FieldList::new(template))
    }

    pub fn items(&self) -> &[E] {
        self.elems.items()
    }

    pub fn items_mut(&mut self) -> &mut Vec<E> {
        self.elems.items_mut()
    }

    /// Append an element holding `f(template)`.
    pub fn push_with(&mut self, f: impl FnOnce(&mut E)) {
        let mut elem = self.elems.make();
        f(&mut elem);
        self.elems.items_mut().push(elem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::to_vec;

    fn u8_prefix() -> IntValue<u64> {
        IntValue::new(0).fixed_length(1)
    }

    #[test]
    fn decoded_prefixed_data_equals_original() {
        let mut sent = RawData::raw(Vec::new()).count_prefix(u8_prefix());
        sent.set_bytes(b"abc".to_vec());
        let wire = to_vec(&sent).unwrap();

        let mut received = RawData::raw(Vec::new()).count_prefix(u8_prefix());
        received.read(&mut &wire[..]).unwrap();
        assert_eq!(received.prefix().map(IntValue::get), Some(3));
        assert_eq!(received, sent);

        let other = RawData::raw(b"abc".to_vec()).count_prefix(IntValue::new(0).fixed_length(2));
        assert_ne!(received, other);
    }

    #[test]
    fn unbounded_raw_data_takes_everything() {
        let mut data = RawData::raw(Vec::new());
        let mut buf: &[u8] = &[1, 2, 3];
        data.read(&mut buf).unwrap();
        assert_eq!(data.bytes(), &[1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn count_prefixed_list() {
        let mut list = ArrayList::list(IntValue::<u16>::default()).count_prefix(u8_prefix());
        list.push_with(|e| e.set(0x0102));
        list.push_with(|e| e.set(0x0304));
        assert_eq!(list.length(), 5);
        assert_eq!(to_vec(&list).unwrap(), vec![2, 1, 2, 3, 4]);

        let mut decoded = ArrayList::list(IntValue::<u16>::default()).count_prefix(u8_prefix());
        decoded.read(&mut &[1u8, 9, 9, 0xFF][..]).unwrap();
        assert_eq!(decoded.items().len(), 1);
        assert_eq!(decoded.items()[0].get(), 0x0909);
    }

    #[test]
    fn length_prefixed_raw_data() {
        let mut data = RawData::raw(b"abc".to_vec()).length_prefix(u8_prefix());
        assert_eq!(to_vec(&data).unwrap(), vec![3, b'a', b'b', b'c']);
        assert!(data.refresh());
        assert_eq!(data.prefix().map(IntValue::get), Some(3));

        let err = data.read(&mut &[5u8, 1, 2][..]);
        assert_eq!(err, Err(CodecError::NotEnoughData));
        assert_eq!(data.bytes(), b"abc");
    }

    #[test]
    fn length_prefix_overflow_is_invalid() {
        let data = RawData::raw(vec![0; 300]).length_prefix(u8_prefix());
        assert!(!data.can_write());
        assert_eq!(to_vec(&data), Err(CodecError::InvalidMsgData));
    }

    #[test]
    fn fixed_count_pads_and_truncates() {
        let data = RawData::raw(vec![7]).fixed_count(3);
        assert_eq!(data.length(), 3);
        assert_eq!(to_vec(&data).unwrap(), vec![7, 0, 0]);

        let data = RawData::raw(vec![1, 2, 3, 4]).fixed_count(2);
        assert_eq!(to_vec(&data).unwrap(), vec![1, 2]);

        let mut decoded = RawData::raw(Vec::new()).fixed_count(2);
        let mut buf: &[u8] = &[5, 6, 7];
        decoded.read(&mut buf).unwrap();
        assert_eq!(decoded.bytes(), &[5, 6]);
        assert_eq!(buf, &[7]);
    }

    #[test]
    fn forced_element_length() {
        let mut list = ArrayList::list(IntValue::<u8>::default())
            .fixed_count(2)
            .forced_elem_length(3);
        list.read(&mut &[1u8, 0xEE, 0xEE, 2, 0xEE, 0xEE][..]).unwrap();
        assert_eq!(list.items()[1].get(), 2);
        assert_eq!(to_vec(&list).unwrap(), vec![1, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn element_length_prefix_with_escape() {
        let template = IntValue::<u16>::default();
        let make = || {
            ArrayList::list(template.clone())
                .elem_length_prefix(u8_prefix(), Some(CodecError::InvalidMsgData))
        };

        let mut list = make();
        list.read(&mut &[3u8, 0x01, 0x02, 0x99][..]).unwrap();
        assert_eq!(list.items()[0].get(), 0x0102);
        assert_eq!(to_vec(&list).unwrap(), vec![2, 1, 2]);

        let mut list = make();
        assert_eq!(
            list.read(&mut &[0xFFu8, 0, 0][..]),
            Err(CodecError::InvalidMsgData)
        );

        let mut list = make();
        assert_eq!(
            list.read(&mut &[1u8, 0x01][..]),
            Err(CodecError::ProtocolError)
        );
    }

    #[test]
    fn terminated_sequence() {
        let mut data = RawData::raw(Vec::new()).terminated_by(u8_prefix());
        let mut buf: &[u8] = b"hi\0rest";
        data.read(&mut buf).unwrap();
        assert_eq!(data.bytes(), b"hi");
        assert_eq!(buf, b"rest");
        assert_eq!(to_vec(&data).unwrap(), b"hi\0".to_vec());

        let mut data = RawData::raw(Vec::new()).terminated_by(u8_prefix());
        assert_eq!(data.read(&mut &b"hi"[..]), Err(CodecError::NotEnoughData));
    }

    #[test]
    fn trailing_suffix() {
        let mut data = RawData::raw(Vec::new())
            .suffix(IntValue::new(0x0D0A).fixed_length(2));
        let mut buf: &[u8] = &[1, 2, 0x0D, 0x0A];
        data.read(&mut buf).unwrap();
        assert_eq!(data.bytes(), &[1, 2]);
        assert_eq!(data.length(), 4);
        assert_eq!(to_vec(&data).unwrap(), vec![1, 2, 0x0D, 0x0A]);
    }

    #[test]
    fn capacity_limits() {
        let mut data = RawData::raw(Vec::new()).capacity(2);
        assert_eq!(
            data.read(&mut &[1u8, 2, 3][..]),
            Err(CodecError::ProtocolError)
        );

        let data = RawData::raw(vec![1, 2, 3]).capacity(2);
        assert!(!data.valid());
        assert_eq!(to_vec(&data), Err(CodecError::InvalidMsgData));
        assert_eq!(data.max_length(), 2);
    }

    #[test]
    fn partial_read_and_write() {
        let mut data = RawData::raw(Vec::new());
        let mut buf: &[u8] = &[1, 2, 3];
        data.read_n(&mut buf, 2).unwrap();
        assert_eq!(data.bytes(), &[1, 2]);
        assert_eq!(buf, &[3]);

        let mut out = Vec::new();
        data.write_n(&mut out, 1).unwrap();
        assert_eq!(out, vec![1]);
    }

    #[quickcheck_macros::quickcheck]
    fn count_prefixed_bytes_round_trip(bytes: Vec<u8>) -> bool {
        let prefix = IntValue::<u64>::new(0).var_length(1, 4);
        let data = RawData::raw(bytes.clone()).count_prefix(prefix.clone());
        let encoded = match to_vec(&data) {
            Ok(encoded) => encoded,
            Err(_) => return false,
        };
        let mut decoded = RawData::raw(Vec::new()).count_prefix(prefix);
        let mut buf = &encoded[..];
        decoded.read(&mut buf).is_ok() && decoded.bytes() == &bytes[..] && buf.is_empty()
    }
}
