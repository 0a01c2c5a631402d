//! Voxel buffers over the standard fixed-width scalar types.
//!
//! A volume's voxels live in one [`VoxelData`] variant; algorithms that must
//! work on every scalar type are written once against [`Scalar`] and
//! dispatched with `with_voxels!`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar type of a voxel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::U8 => "u8",
            ScalarType::I8 => "i8",
            ScalarType::U16 => "u16",
            ScalarType::I16 => "i16",
            ScalarType::U32 => "u32",
            ScalarType::I32 => "i32",
            ScalarType::U64 => "u64",
            ScalarType::I64 => "i64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A voxel scalar.
///
/// `Key` is a totally ordered stand-in for the value so that histograms can
/// be built for floating point voxels too; `from_key(key(x)) == x` bitwise.
pub trait Scalar: Copy + PartialEq + PartialOrd + Send + Sync + fmt::Debug + 'static {
    const SCALAR_TYPE: ScalarType;
    type Key: Ord + Copy + Send + Sync + fmt::Debug;

    fn key(self) -> Self::Key;
    fn from_key(key: Self::Key) -> Self;
    fn to_f64(self) -> f64;
    /// Convert from `f64`, rounding to nearest and saturating for integers.
    fn from_f64(value: f64) -> Self;
    fn wrap(values: Vec<Self>) -> VoxelData;
    fn slice_of(data: &VoxelData) -> Option<&[Self]>;
}

macro_rules! impl_integer_scalar {
    ($t:ty, $variant:ident) => {
        impl Scalar for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;
            type Key = $t;

            fn key(self) -> Self::Key {
                self
            }

            fn from_key(key: Self::Key) -> Self {
                key
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                // `as` saturates and maps NaN to zero
                value.round() as $t
            }

            fn wrap(values: Vec<Self>) -> VoxelData {
                VoxelData::$variant(values)
            }

            fn slice_of(data: &VoxelData) -> Option<&[Self]> {
                match data {
                    VoxelData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_integer_scalar!(u8, U8);
impl_integer_scalar!(i8, I8);
impl_integer_scalar!(u16, U16);
impl_integer_scalar!(i16, I16);
impl_integer_scalar!(u32, U32);
impl_integer_scalar!(i32, I32);
impl_integer_scalar!(u64, U64);
impl_integer_scalar!(i64, I64);

macro_rules! impl_float_scalar {
    ($t:ty, $bits:ty, $variant:ident, $sign:expr) => {
        impl Scalar for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;
            type Key = $bits;

            fn key(self) -> Self::Key {
                let bits = self.to_bits();
                if bits & $sign != 0 {
                    !bits
                } else {
                    bits | $sign
                }
            }

            fn from_key(key: Self::Key) -> Self {
                let bits = if key & $sign != 0 { key & !$sign } else { !key };
                <$t>::from_bits(bits)
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn wrap(values: Vec<Self>) -> VoxelData {
                VoxelData::$variant(values)
            }

            fn slice_of(data: &VoxelData) -> Option<&[Self]> {
                match data {
                    VoxelData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_float_scalar!(f32, u32, F32, 0x8000_0000u32);
impl_float_scalar!(f64, u64, F64, 0x8000_0000_0000_0000u64);

/// Voxel buffer, x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoxelData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Bind the typed vector inside a [`VoxelData`] and evaluate `$body` once
/// per variant, so `$body` is compiled for every scalar type.
macro_rules! with_voxels {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::image::VoxelData::U8($v) => $body,
            $crate::image::VoxelData::I8($v) => $body,
            $crate::image::VoxelData::U16($v) => $body,
            $crate::image::VoxelData::I16($v) => $body,
            $crate::image::VoxelData::U32($v) => $body,
            $crate::image::VoxelData::I32($v) => $body,
            $crate::image::VoxelData::U64($v) => $body,
            $crate::image::VoxelData::I64($v) => $body,
            $crate::image::VoxelData::F32($v) => $body,
            $crate::image::VoxelData::F64($v) => $body,
        }
    };
}
pub(crate) use with_voxels;

fn convert_f64<T: Scalar>(values: &[f64]) -> VoxelData {
    T::wrap(values.iter().map(|&v| T::from_f64(v)).collect())
}

impl VoxelData {
    /// Build a buffer of `scalar_type` from `f64` values (rounded and
    /// saturated for integer types).
    pub fn from_f64_slice(scalar_type: ScalarType, values: &[f64]) -> Self {
        match scalar_type {
            ScalarType::U8 => convert_f64::<u8>(values),
            ScalarType::I8 => convert_f64::<i8>(values),
            ScalarType::U16 => convert_f64::<u16>(values),
            ScalarType::I16 => convert_f64::<i16>(values),
            ScalarType::U32 => convert_f64::<u32>(values),
            ScalarType::I32 => convert_f64::<i32>(values),
            ScalarType::U64 => convert_f64::<u64>(values),
            ScalarType::I64 => convert_f64::<i64>(values),
            ScalarType::F32 => convert_f64::<f32>(values),
            ScalarType::F64 => convert_f64::<f64>(values),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            VoxelData::U8(_) => ScalarType::U8,
            VoxelData::I8(_) => ScalarType::I8,
            VoxelData::U16(_) => ScalarType::U16,
            VoxelData::I16(_) => ScalarType::I16,
            VoxelData::U32(_) => ScalarType::U32,
            VoxelData::I32(_) => ScalarType::I32,
            VoxelData::U64(_) => ScalarType::U64,
            VoxelData::I64(_) => ScalarType::I64,
            VoxelData::F32(_) => ScalarType::F32,
            VoxelData::F64(_) => ScalarType::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_voxels!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view, `None` if `T` is not the buffer's scalar type.
    pub fn as_slice<T: Scalar>(&self) -> Option<&[T]> {
        T::slice_of(self)
    }

    /// Value at a flat offset, widened to `f64`.
    pub fn value_f64(&self, offset: usize) -> Option<f64> {
        with_voxels!(self, v => v.get(offset).map(|x| x.to_f64()))
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_voxels!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// Values narrowed to `f32`, the element type handed to tensors.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        with_voxels!(self, v => v.iter().map(|x| x.to_f64() as f32).collect())
    }

    /// Convert to another scalar type; a clone when the type already matches.
    pub fn cast(&self, scalar_type: ScalarType) -> VoxelData {
        if self.scalar_type() == scalar_type {
            return self.clone();
        }
        Self::from_f64_slice(scalar_type, &self.to_f64_vec())
    }
}

impl<T: Scalar> From<Vec<T>> for VoxelData {
    fn from(values: Vec<T>) -> Self {
        T::wrap(values)
    }
}
