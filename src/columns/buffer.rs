//! Typed column storage.
//!
//! [`ColumnBuffer`] holds the value of one column for the current record;
//! [`ColumnData`] holds a whole column of a tree. Both are closed enums with
//! one variant per [`ColumnType`], generated from a single table so that
//! allocation, copying and release can never drift apart.

use crate::columns::kind::{ColumnType, Depth, ScalarKind};
use serde::{Deserialize, Serialize};

mod sealed {
    pub trait Sealed {}
}

/// Rust types that can back a column.
///
/// Implemented for the ten scalar kinds, `Vec` of them and `Vec<Vec<_>>` of
/// them. The trait is sealed: binding any other type does not compile.
pub trait ColumnValue: Clone + Default + 'static + sealed::Sealed {
    const COLUMN_TYPE: ColumnType;

    fn from_buffer(buffer: &ColumnBuffer) -> Option<&Self>;

    fn from_buffer_mut(buffer: &mut ColumnBuffer) -> Option<&mut Self>;

    fn into_buffer(self) -> ColumnBuffer;

    fn values(data: &ColumnData) -> Option<&[Self]>;

    fn into_data(values: Vec<Self>) -> ColumnData;
}

macro_rules! column_types {
    ($($variant:ident($ty:ty) => $depth:ident $kind:ident),* $(,)?) => {
        /// Value of one column for one record.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum ColumnBuffer {
            $($variant($ty),)*
        }

        /// All values of one column, one entry per record.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum ColumnData {
            $($variant(Vec<$ty>),)*
        }

        impl ColumnBuffer {
            /// Allocate a default-valued buffer of `column_type`.
            pub fn new(column_type: ColumnType) -> Self {
                match (column_type.depth, column_type.kind) {
                    $((Depth::$depth, ScalarKind::$kind) => ColumnBuffer::$variant(Default::default()),)*
                }
            }

            pub fn column_type(&self) -> ColumnType {
                match self {
                    $(ColumnBuffer::$variant(_) => ColumnType::new(Depth::$depth, ScalarKind::$kind),)*
                }
            }

            /// Drop the buffer through its concrete type, returning that type.
            pub fn release(self) -> ColumnType {
                match self {
                    $(ColumnBuffer::$variant(value) => {
                        drop::<$ty>(value);
                        ColumnType::new(Depth::$depth, ScalarKind::$kind)
                    })*
                }
            }
        }

        impl ColumnData {
            pub fn new(column_type: ColumnType) -> Self {
                match (column_type.depth, column_type.kind) {
                    $((Depth::$depth, ScalarKind::$kind) => ColumnData::$variant(Vec::new()),)*
                }
            }

            pub fn column_type(&self) -> ColumnType {
                match self {
                    $(ColumnData::$variant(_) => ColumnType::new(Depth::$depth, ScalarKind::$kind),)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(ColumnData::$variant(values) => values.len(),)*
                }
            }

            /// Copy entry `entry` into `buffer`.
            ///
            /// Returns `false` if the entry is out of range or the buffer has
            /// another type; the buffer is untouched in that case.
            pub fn read_into(&self, entry: usize, buffer: &mut ColumnBuffer) -> bool {
                match (self, buffer) {
                    $((ColumnData::$variant(values), ColumnBuffer::$variant(slot)) => {
                        match values.get(entry) {
                            Some(value) => {
                                slot.clone_from(value);
                                true
                            }
                            None => false,
                        }
                    })*
                    _ => false,
                }
            }

            /// Append a copy of `buffer`. Returns `false` on a type mismatch.
            pub fn push(&mut self, buffer: &ColumnBuffer) -> bool {
                match (self, buffer) {
                    $((ColumnData::$variant(values), ColumnBuffer::$variant(value)) => {
                        values.push(value.clone());
                        true
                    })*
                    _ => false,
                }
            }

            pub fn push_default(&mut self) {
                match self {
                    $(ColumnData::$variant(values) => values.push(Default::default()),)*
                }
            }
        }

        $(
            impl sealed::Sealed for $ty {}

            impl ColumnValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::new(Depth::$depth, ScalarKind::$kind);

                fn from_buffer(buffer: &ColumnBuffer) -> Option<&Self> {
                    match buffer {
                        ColumnBuffer::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn from_buffer_mut(buffer: &mut ColumnBuffer) -> Option<&mut Self> {
                    match buffer {
                        ColumnBuffer::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_buffer(self) -> ColumnBuffer {
                    ColumnBuffer::$variant(self)
                }

                fn values(data: &ColumnData) -> Option<&[Self]> {
                    match data {
                        ColumnData::$variant(values) => Some(values),
                        _ => None,
                    }
                }

                fn into_data(values: Vec<Self>) -> ColumnData {
                    ColumnData::$variant(values)
                }
            }
        )*
    };
}

column_types! {
    UChar(u8) => Scalar UChar,
    Short(i16) => Scalar Short,
    UShort(u16) => Scalar UShort,
    Int(i32) => Scalar Int,
    UInt(u32) => Scalar UInt,
    Float(f32) => Scalar Float,
    Double(f64) => Scalar Double,
    Long(i64) => Scalar Long,
    ULong(u64) => Scalar ULong,
    Bool(bool) => Scalar Bool,

    VecUChar(Vec<u8>) => Seq UChar,
    VecShort(Vec<i16>) => Seq Short,
    VecUShort(Vec<u16>) => Seq UShort,
    VecInt(Vec<i32>) => Seq Int,
    VecUInt(Vec<u32>) => Seq UInt,
    VecFloat(Vec<f32>) => Seq Float,
    VecDouble(Vec<f64>) => Seq Double,
    VecLong(Vec<i64>) => Seq Long,
    VecULong(Vec<u64>) => Seq ULong,
    VecBool(Vec<bool>) => Seq Bool,

    VecVecUChar(Vec<Vec<u8>>) => Nested UChar,
    VecVecShort(Vec<Vec<i16>>) => Nested Short,
    VecVecUShort(Vec<Vec<u16>>) => Nested UShort,
    VecVecInt(Vec<Vec<i32>>) => Nested Int,
    VecVecUInt(Vec<Vec<u32>>) => Nested UInt,
    VecVecFloat(Vec<Vec<f32>>) => Nested Float,
    VecVecDouble(Vec<Vec<f64>>) => Nested Double,
    VecVecLong(Vec<Vec<i64>>) => Nested Long,
    VecVecULong(Vec<Vec<u64>>) => Nested ULong,
    VecVecBool(Vec<Vec<bool>>) => Nested Bool,
}

impl ColumnData {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the column values.
    pub fn values<T: ColumnValue>(&self) -> Option<&[T]> {
        T::values(self)
    }

    pub fn from_values<T: ColumnValue>(values: Vec<T>) -> Self {
        T::into_data(values)
    }
}

impl ColumnBuffer {
    /// Typed view of the buffer.
    pub fn get<T: ColumnValue>(&self) -> Option<&T> {
        T::from_buffer(self)
    }

    pub fn get_mut<T: ColumnValue>(&mut self) -> Option<&mut T> {
        T::from_buffer_mut(self)
    }

    /// Reset to the default value of the same type.
    pub fn reset(&mut self) {
        *self = ColumnBuffer::new(self.column_type());
    }
}
