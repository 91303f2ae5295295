//! Parameter blocks carried in frame bodies.
//!
//! A body is a `u16` parameter count followed by entries of
//! `field_id: u16, len: u32, bytes`. Only [`FieldId::repeatable`] fields may
//! appear more than once; repeated values keep their wire order.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use std::collections::{HashMap, HashSet};

use super::{FieldId, FrameError, read_u16, read_u32};

/// Width of the `field_id` and `len` prefix of every entry.
const ENTRY_PREFIX_LEN: usize = 6;

fn check_duplicate(fid: FieldId, seen: &mut HashSet<u16>) -> Result<(), FrameError> {
    let raw: u16 = fid.into();
    if !fid.repeatable() && !seen.insert(raw) {
        return Err(FrameError::DuplicateField(raw));
    }
    Ok(())
}

/// Walk a parameter block, yielding each field id with its value slice.
fn walk_params<'a>(
    buf: &'a [u8],
    mut visit: impl FnMut(FieldId, &'a [u8]),
) -> Result<(), FrameError> {
    if buf.is_empty() {
        return Ok(());
    }
    let count = read_u16(buf).map_err(|_| FrameError::SizeMismatch)?;
    let mut rest = buf.get(2..).ok_or(FrameError::SizeMismatch)?;
    let mut seen = HashSet::new();
    for _ in 0..count {
        if rest.len() < ENTRY_PREFIX_LEN {
            return Err(FrameError::SizeMismatch);
        }
        let fid = FieldId::from(read_u16(rest)?);
        let len = read_u32(rest.get(2..).ok_or(FrameError::SizeMismatch)?)? as usize;
        let value_end = ENTRY_PREFIX_LEN
            .checked_add(len)
            .ok_or(FrameError::SizeMismatch)?;
        let value = rest
            .get(ENTRY_PREFIX_LEN..value_end)
            .ok_or(FrameError::SizeMismatch)?;
        check_duplicate(fid, &mut seen)?;
        visit(fid, value);
        rest = rest.get(value_end..).ok_or(FrameError::SizeMismatch)?;
    }
    if !rest.is_empty() {
        return Err(FrameError::SizeMismatch);
    }
    Ok(())
}

/// Build a parameter block from field id/data pairs.
///
/// Accepts any slice of pairs where the second element can be borrowed as
/// `&[u8]`.
///
/// # Errors
/// Returns [`FrameError::PayloadTooLarge`] if the number of parameters exceeds
/// `u16::MAX` or a value exceeds `u32::MAX` bytes.
pub fn encode_params<T: AsRef<[u8]>>(params: &[(FieldId, T)]) -> Result<Vec<u8>, FrameError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(
        &u16::try_from(params.len())
            .map_err(|_| FrameError::PayloadTooLarge)?
            .to_be_bytes(),
    );
    for (id, data) in params {
        let raw: u16 = (*id).into();
        let data_bytes = data.as_ref();
        buf.extend_from_slice(&raw.to_be_bytes());
        buf.extend_from_slice(
            &u32::try_from(data_bytes.len())
                .map_err(|_| FrameError::PayloadTooLarge)?
                .to_be_bytes(),
        );
        buf.extend_from_slice(data_bytes);
    }
    Ok(buf)
}

/// Decoded parameter block indexed by field.
#[derive(Debug, Default)]
pub struct Params {
    fields: HashMap<FieldId, Vec<Vec<u8>>>,
}

impl Params {
    /// Parse and index a body.
    ///
    /// # Errors
    /// Returns an error if the buffer cannot be parsed.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        let mut fields: HashMap<FieldId, Vec<Vec<u8>>> = HashMap::new();
        walk_params(buf, |fid, value| {
            fields.entry(fid).or_default().push(value.to_vec());
        })?;
        Ok(Self { fields })
    }

    fn first(&self, field: FieldId) -> Option<&[u8]> {
        self.fields
            .get(&field)
            .and_then(|v| v.first())
            .map(Vec::as_slice)
    }

    /// Every value recorded for `field`, in wire order.
    #[must_use]
    pub fn all(&self, field: FieldId) -> &[Vec<u8>] {
        self.fields.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Return the value for `field` as a `String` if present.
    ///
    /// # Errors
    /// Returns [`FrameError::InvalidParamValue`] if the bytes are not UTF-8.
    pub fn string(&self, field: FieldId) -> Result<Option<String>, FrameError> {
        self.first(field)
            .map(|bytes| {
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|_| FrameError::InvalidParamValue(field))
            })
            .transpose()
    }

    /// Return the value for `field` as a `String` or an error if missing.
    ///
    /// # Errors
    /// Returns [`FrameError::MissingField`] if the field is absent, or
    /// [`FrameError::InvalidParamValue`] if the value is not UTF-8.
    pub fn required_string(&self, field: FieldId) -> Result<String, FrameError> {
        self.string(field)?.ok_or(FrameError::MissingField(field))
    }

    fn fixed<const N: usize>(&self, field: FieldId) -> Result<Option<[u8; N]>, FrameError> {
        self.first(field)
            .map(|bytes| {
                <[u8; N]>::try_from(bytes).map_err(|_| FrameError::InvalidParamValue(field))
            })
            .transpose()
    }

    /// Decode the value for `field` as a big-endian `i32`.
    ///
    /// # Errors
    /// Returns [`FrameError::MissingField`] if the field is absent, or
    /// [`FrameError::InvalidParamValue`] if the value is not four bytes wide.
    pub fn required_i32(&self, field: FieldId) -> Result<i32, FrameError> {
        self.fixed::<4>(field)?
            .map(i32::from_be_bytes)
            .ok_or(FrameError::MissingField(field))
    }

    /// Decode the value for `field` as a big-endian `i64`.
    ///
    /// # Errors
    /// Returns [`FrameError::MissingField`] if the field is absent, or
    /// [`FrameError::InvalidParamValue`] if the value is not eight bytes wide.
    pub fn required_i64(&self, field: FieldId) -> Result<i64, FrameError> {
        self.fixed::<8>(field)?
            .map(i64::from_be_bytes)
            .ok_or(FrameError::MissingField(field))
    }

    /// Decode the value for `field` as a big-endian `u64` if present.
    ///
    /// # Errors
    /// Returns [`FrameError::InvalidParamValue`] if the value is not eight
    /// bytes wide.
    pub fn u64(&self, field: FieldId) -> Result<Option<u64>, FrameError> {
        Ok(self.fixed::<8>(field)?.map(u64::from_be_bytes))
    }
}
