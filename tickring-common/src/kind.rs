//! Per-kind element policy: sentinel value and element width.
//!
//! Every ring is generic over a [`RingElement`]. The trait is the only place
//! where scalar kinds differ, so the store and accessor code is written once.

use std::sync::Arc;

/// Runtime tag for the scalar kinds a ring column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingKind {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Instant,
    Object,
}

impl RingKind {
    pub const ALL: [RingKind; 10] = [
        RingKind::Byte,
        RingKind::Char,
        RingKind::Short,
        RingKind::Int,
        RingKind::Long,
        RingKind::Float,
        RingKind::Double,
        RingKind::Boolean,
        RingKind::Instant,
        RingKind::Object,
    ];

    /// Bytes occupied by one slot of the backing array.
    pub fn element_width(self) -> usize {
        match self {
            RingKind::Byte | RingKind::Boolean => 1,
            RingKind::Char | RingKind::Short => 2,
            RingKind::Int | RingKind::Float => 4,
            RingKind::Long | RingKind::Double | RingKind::Instant => 8,
            RingKind::Object => std::mem::size_of::<Option<Arc<str>>>(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RingKind::Byte => "byte",
            RingKind::Char => "char",
            RingKind::Short => "short",
            RingKind::Int => "int",
            RingKind::Long => "long",
            RingKind::Float => "float",
            RingKind::Double => "double",
            RingKind::Boolean => "boolean",
            RingKind::Instant => "instant",
            RingKind::Object => "object",
        }
    }

    pub fn parse(name: &str) -> Option<RingKind> {
        RingKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

/// A value that can live in a ring slot.
///
/// `NULL` is the reserved "no value" sentinel returned by bounds-checked reads
/// outside the window and used to pre-fill fresh backing arrays.
pub trait RingElement: Clone + Send + Sync + 'static {
    const KIND: RingKind;
    const NULL: Self;

    fn is_null(&self) -> bool;
}

macro_rules! primitive_element {
    ($ty:ty, $kind:ident, $null:expr) => {
        impl RingElement for $ty {
            const KIND: RingKind = RingKind::$kind;
            const NULL: Self = $null;

            #[inline]
            fn is_null(&self) -> bool {
                *self == $null
            }
        }
    };
}

primitive_element!(i8, Byte, i8::MIN);
primitive_element!(u16, Char, u16::MAX);
primitive_element!(i16, Short, i16::MIN);
primitive_element!(i32, Int, i32::MIN);
primitive_element!(i64, Long, i64::MIN);
primitive_element!(f32, Float, -f32::MAX);
primitive_element!(f64, Double, -f64::MAX);

impl RingElement for Option<bool> {
    const KIND: RingKind = RingKind::Boolean;
    const NULL: Self = None;

    #[inline]
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl<V> RingElement for Option<Arc<V>>
where
    V: ?Sized + Send + Sync + 'static,
{
    const KIND: RingKind = RingKind::Object;
    const NULL: Self = None;

    #[inline]
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

pub const NULL_BYTE: i8 = <i8 as RingElement>::NULL;
pub const NULL_CHAR: u16 = <u16 as RingElement>::NULL;
pub const NULL_SHORT: i16 = <i16 as RingElement>::NULL;
pub const NULL_INT: i32 = <i32 as RingElement>::NULL;
pub const NULL_LONG: i64 = <i64 as RingElement>::NULL;
pub const NULL_FLOAT: f32 = <f32 as RingElement>::NULL;
pub const NULL_DOUBLE: f64 = <f64 as RingElement>::NULL;
