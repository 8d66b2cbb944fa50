use super::{WireError, WireReader, WireWriter};

/// A value with a self-contained binary wire form.
///
/// Implemented for the primitive field types that travel alongside storages in
/// a sync batch. `Option<T>` encodes a presence flag followed by the value.
pub trait WireValue: Clone + PartialEq {
    fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError>;

    fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError>;
}

macro_rules! unsigned_wire_value {
    ($($ty:ty),*) => {$(
        impl WireValue for $ty {
            fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
                writer.write_varint(u64::from(*self));
                Ok(())
            }

            fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
                let raw = reader.read_varint()?;
                <$ty>::try_from(raw).map_err(|_| WireError::VarintOverflow)
            }
        }
    )*};
}

macro_rules! signed_wire_value {
    ($($ty:ty),*) => {$(
        impl WireValue for $ty {
            fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
                writer.write_signed(i64::from(*self));
                Ok(())
            }

            fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
                let raw = reader.read_signed()?;
                <$ty>::try_from(raw).map_err(|_| WireError::VarintOverflow)
            }
        }
    )*};
}

unsigned_wire_value!(u8, u16, u32, u64);
signed_wire_value!(i8, i16, i32, i64);

impl WireValue for bool {
    fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        writer.write_bool(*self);
        Ok(())
    }

    fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        reader.read_bool()
    }
}

impl WireValue for String {
    fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        writer.write_str(self)
    }

    fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        reader.read_str().map(str::to_owned)
    }
}

impl<T: WireValue> WireValue for Option<T> {
    fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        match self {
            Some(value) => {
                writer.write_bool(true);
                value.write_wire(writer)
            }
            None => {
                writer.write_bool(false);
                Ok(())
            }
        }
    }

    fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        if reader.read_bool()? {
            T::read_wire(reader).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: WireValue + core::fmt::Debug>(value: T) {
        let mut writer = WireWriter::new();
        value.write_wire(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(T::read_wire(&mut reader).unwrap(), value);
        reader.finish().unwrap();
    }

    #[test]
    fn primitive_values() {
        round_trip(200u8);
        round_trip(-40i32);
        round_trip(true);
        round_trip(String::from("minecraft:water"));
        round_trip(Some(7u64));
        round_trip(None::<u64>);
    }

    #[test]
    fn oversized_string_is_refused_before_any_bytes_are_written() {
        let text = "x".repeat(crate::StorageConfig::MAX_WIRE_STRING_LEN + 1);
        let mut writer = WireWriter::new();
        assert_eq!(
            text.write_wire(&mut writer),
            Err(WireError::StringTooLong {
                len: crate::StorageConfig::MAX_WIRE_STRING_LEN + 1,
                max: crate::StorageConfig::MAX_WIRE_STRING_LEN,
            })
        );
        assert!(writer.is_empty());

        let limit = "x".repeat(crate::StorageConfig::MAX_WIRE_STRING_LEN);
        round_trip(limit);
    }

    #[test]
    fn narrowing_overflow_is_rejected() {
        let mut writer = WireWriter::new();
        writer.write_varint(300);
        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(u8::read_wire(&mut reader), Err(WireError::VarintOverflow));
    }
}
