use super::decode::{Error, FromCbor, Value, parse_value};
use alloc::string::ToString;

/// A stateful iterator over the items of a CBOR array (`D` = 1), map
/// (`D` = 2), or bare top-level sequence (`D` = 0).
pub struct Series<'a, const D: usize> {
    data: &'a [u8],
    count: Option<usize>,
    offset: &'a mut usize,
    parsed: usize,
}

impl<'a, const D: usize> Series<'a, D> {
    pub(super) fn new(data: &'a [u8], count: Option<usize>, offset: &'a mut usize) -> Self {
        Self {
            data,
            count,
            offset,
            parsed: 0,
        }
    }

    /// Number of items already consumed, or the declared definite length.
    pub fn len(&self) -> Option<usize> {
        self.count.map(|c| if D == 0 { c } else { c / D })
    }

    pub fn is_definite(&self) -> bool {
        self.count.is_some()
    }

    pub fn offset(&self) -> usize {
        *self.offset
    }

    fn check_for_end(&mut self) -> Result<bool, Error> {
        if let Some(count) = self.count {
            Ok(self.parsed >= count)
        } else if *self.offset >= self.data.len() {
            if D == 0 {
                self.count = Some(self.parsed);
                Ok(true)
            } else {
                Err(Error::NeedMoreData(1))
            }
        } else if self.data[*self.offset] == 0xFF {
            if D == 2 && self.parsed % 2 == 1 {
                Err(Error::PartialMap)
            } else {
                *self.offset += 1;
                self.count = Some(self.parsed);
                Ok(true)
            }
        } else {
            Ok(false)
        }
    }

    /// `Some(offset)` if the sequence has ended at the current position.
    pub fn end(&mut self) -> Result<Option<usize>, Error> {
        if self.check_for_end()? {
            Ok(Some(*self.offset))
        } else {
            Ok(None)
        }
    }

    pub(super) fn complete<T>(mut self, r: T) -> Result<T, Error> {
        if self.check_for_end()? {
            Ok(r)
        } else {
            Err(Error::AdditionalItems)
        }
    }

    /// Parses and discards the next single item of the sequence.
    pub fn skip_value(&mut self) -> Result<(), Error> {
        if self.check_for_end()? {
            return Err(Error::NoMoreItems);
        }
        let item_start = *self.offset;
        let (_, len) = parse_value(&self.data[item_start..], |mut value, s, tags| {
            value.skip(usize::MAX)?;
            Ok::<_, Error>((s, tags.len()))
        })?;
        self.parsed += 1;
        *self.offset += len;
        Ok(())
    }

    /// Parses and discards the remaining items of the sequence, returning
    /// whether every skipped item (recursively) was in canonical form.
    pub fn skip_to_end(&mut self, max_recursion: usize) -> Result<bool, Error> {
        let mut shortest = true;
        loop {
            if self.check_for_end()? {
                return Ok(shortest);
            }
            let item_start = *self.offset;
            let (s, len) = parse_value(&self.data[item_start..], |mut value, s, tags| {
                let s2 = value.skip(max_recursion)?;
                Ok::<_, Error>(s && s2 && tags.is_empty())
            })?;
            shortest = shortest && s;
            self.parsed += 1;
            *self.offset += len;
        }
    }

    /// Parses the next item of the sequence with a closure, returning its
    /// result and the number of bytes the item occupied.
    pub fn parse_value<T, F, E>(&mut self, f: F) -> Result<(T, usize), E>
    where
        F: FnOnce(Value, bool, &[u64]) -> Result<T, E>,
        E: From<Error>,
    {
        if self.check_for_end()? {
            return Err(Error::NoMoreItems.into());
        }
        let item_start = *self.offset;
        let (r, len) = parse_value(&self.data[item_start..], f)?;
        self.parsed += 1;
        *self.offset += len;
        Ok((r, len))
    }

    /// Parses the next item as `T`, returning the value and whether it was
    /// encoded in canonical (shortest) form.
    pub fn parse<T>(&mut self) -> Result<(T, bool), T::Error>
    where
        T: FromCbor,
        T::Error: From<Error>,
    {
        if self.check_for_end()? {
            return Err(Error::NoMoreItems.into());
        }
        let item_start = *self.offset;
        let (v, shortest, len) = T::from_cbor(&self.data[item_start..])?;
        self.parsed += 1;
        *self.offset += len;
        Ok((v, shortest))
    }

    /// Parses the next item as a nested array.
    pub fn parse_array<T, F, E>(&mut self, f: F) -> Result<(T, usize), E>
    where
        F: FnOnce(&mut Series<1>, bool, &[u64]) -> Result<T, E>,
        E: From<Error>,
    {
        self.parse_value(|value, shortest, tags| match value {
            Value::Array(a) => f(a, shortest, tags),
            _ => Err(Error::IncorrectType(
                "Array".to_string(),
                value.type_name(!tags.is_empty()),
            )
            .into()),
        })
    }

    /// Parses the next item as a nested map.
    pub fn parse_map<T, F, E>(&mut self, f: F) -> Result<(T, usize), E>
    where
        F: FnOnce(&mut Series<2>, bool, &[u64]) -> Result<T, E>,
        E: From<Error>,
    {
        self.parse_value(|value, shortest, tags| match value {
            Value::Map(m) => f(m, shortest, tags),
            _ => Err(Error::IncorrectType(
                "Map".to_string(),
                value.type_name(!tags.is_empty()),
            )
            .into()),
        })
    }
}

impl<const D: usize> core::fmt::Debug for Series<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Series(parsed={}, count={:?})",
            self.parsed, self.count
        )
    }
}
