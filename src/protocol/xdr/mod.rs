//! XDR (External Data Representation, RFC 4506) encoding used for every
//! message exchanged between the math client and server.
//!
//! <https://datatracker.ietf.org/doc/html/rfc4506>
//!
//! XDR types are mapped onto their Rust counterparts: `int` is `i32`,
//! `unsigned int` is `u32`, `float` is `f32`, `opaque<>` is `[u8]`/`Vec<u8>`
//! and `string<>` is `str`/`String`. Every item occupies a multiple of four
//! bytes on the wire and is encoded big endian.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod math;
pub mod rpc;
mod utils;

/// XDR assumes big endian encoding.
pub type XDREndian = BigEndian;

pub trait Serialize {
    /// Writes the XDR encoding of `self` to `dest`.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Replaces `self` with the value decoded from `src`.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Decodes a fresh `T` from `src`, starting from `T::default()`.
pub fn deserialize<T>(src: &mut impl Read) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Marker trait for XDR `enum` type serialization.
pub trait SerializeEnum: ToPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self.to_i32() {
            Some(val) => dest.write_i32::<XDREndian>(val),
            None => Err(utils::invalid_data("Invalid enum value")),
        }
    }
}

/// Marker trait for XDR `enum` type deserialization.
pub trait DeserializeEnum: FromPrimitive {}

impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let raw = src.read_i32::<XDREndian>()?;
        match FromPrimitive::from_i32(raw) {
            Some(val) => {
                *self = val;
                Ok(())
            }
            None => Err(utils::invalid_data(&format!("Invalid enum value {raw}"))),
        }
    }
}

/// `bool` is `enum { FALSE = 0, TRUE = 1 }`.
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(i32::from(*self))
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match src.read_i32::<XDREndian>()? {
            0 => false,
            1 => true,
            _ => return Err(utils::invalid_data("Invalid value for bool enum")),
        };
        Ok(())
    }
}

/// `void` takes no space on the wire.
impl Serialize for () {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

impl Deserialize for () {
    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Implements XDR encoding for a fixed-width scalar using the matching
/// `byteorder` read/write pair.
macro_rules! scalar {
    ($t:ty, $read:ident, $write:ident) => {
        impl Serialize for $t {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                dest.$write::<XDREndian>(*self)
            }
        }

        impl Deserialize for $t {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                *self = src.$read::<XDREndian>()?;
                Ok(())
            }
        }
    };
}

// int, unsigned int, hyper, unsigned hyper, float, double
scalar!(i32, read_i32, write_i32);
scalar!(u32, read_u32, write_u32);
scalar!(i64, read_i64, write_i64);
scalar!(u64, read_u64, write_u64);
scalar!(f32, read_f32, write_f32);
scalar!(f64, read_f64, write_f64);

/// Lengths are always `unsigned int` on the wire.
fn write_len<W: Write>(len: usize, dest: &mut W) -> std::io::Result<()> {
    let Some(len) = len.to_u32() else {
        return Err(utils::invalid_data("cannot cast `usize` to `u32`"));
    };
    len.serialize(dest)
}

fn read_len<R: Read>(src: &mut R) -> std::io::Result<usize> {
    deserialize::<u32>(src)?
        .to_usize()
        .ok_or_else(|| utils::invalid_data("cannot cast `u32` to `usize`"))
}

/// Variable-length opaque data: length, bytes, padding.
impl Serialize for [u8] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        write_len(self.len(), dest)?;
        dest.write_all(self)?;
        utils::write_padding(self.len(), dest)
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = read_len(src)?;
        // grow through `take` so a bogus length cannot allocate up front
        self.clear();
        let read = src.take(length as u64).read_to_end(self)?;
        if read != length {
            self.clear();
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        utils::read_padding(length, src)
    }
}

/// XDR strings are ASCII and share the opaque encoding.
impl Serialize for str {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if !self.is_ascii() {
            return Err(utils::invalid_data("Not ASCII string"));
        }
        self.as_bytes().serialize(dest)
    }
}

impl Deserialize for String {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let bytes = deserialize::<Vec<u8>>(src)?;
        if !bytes.is_ascii() {
            return Err(utils::invalid_data("Not ASCII string"));
        }
        *self = String::from_utf8(bytes).map_err(|_| utils::invalid_data("Not ASCII string"))?;
        Ok(())
    }
}

/// Implements [`Serialize`] for a struct by encoding the listed fields in order.
#[macro_export]
macro_rules! SerializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                use $crate::xdr::Serialize as _;
                $(self.$element.serialize(dest)?;)*
                Ok(())
            }
        }
    };
}

/// Implements [`Deserialize`] for a struct by decoding the listed fields in order.
#[macro_export]
macro_rules! DeserializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                use $crate::xdr::Deserialize as _;
                $(self.$element.deserialize(src)?;)*
                Ok(())
            }
        }
    };
}

pub use crate::DeserializeStruct;
pub use crate::SerializeStruct;
