use crate::kstrtox::{kstrtobool, kstrtox};
use crate::{ModuleErr, Result};
use alloc::{string::String, vec::Vec};
use core::fmt::{Display, Write};
use paste::paste;

/// Longest value a `charp` parameter accepts, as in `param_set_charp`.
pub const MAX_CHARP_LEN: usize = 1024;

/// Element types a parameter (or an array parameter's elements) can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    HexInt,
    Bool,
    InvBool,
    Charp,
}

impl ScalarKind {
    /// The type name `modinfo` reports in `parmtype`.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Byte => "byte",
            ScalarKind::Short => "short",
            ScalarKind::UShort => "ushort",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Long => "long",
            ScalarKind::ULong => "ulong",
            ScalarKind::HexInt => "hexint",
            ScalarKind::Bool => "bool",
            ScalarKind::InvBool => "invbool",
            ScalarKind::Charp => "charp",
        }
    }

    pub(crate) fn ops(self) -> &'static ParamOps {
        match self {
            ScalarKind::Byte => &PARAM_OPS_BYTE,
            ScalarKind::Short => &PARAM_OPS_SHORT,
            ScalarKind::UShort => &PARAM_OPS_USHORT,
            ScalarKind::Int => &PARAM_OPS_INT,
            ScalarKind::UInt => &PARAM_OPS_UINT,
            ScalarKind::Long => &PARAM_OPS_LONG,
            ScalarKind::ULong => &PARAM_OPS_ULONG,
            ScalarKind::HexInt => &PARAM_OPS_HEXINT,
            ScalarKind::Bool => &PARAM_OPS_BOOL,
            ScalarKind::InvBool => &PARAM_OPS_INVBOOL,
            ScalarKind::Charp => &PARAM_OPS_CHARP,
        }
    }

    /// Coerce the textual form of one value.
    pub fn parse(self, s: &str) -> Result<ParamValue> {
        (self.ops().set)(s)
    }

    /// Whether a bare `name` with no `=value` is accepted.
    pub const fn takes_flag(self) -> bool {
        matches!(self, ScalarKind::Bool | ScalarKind::InvBool)
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set/get pair for one scalar kind, mirroring `struct kernel_param_ops`.
pub(crate) struct ParamOps {
    pub(crate) set: fn(&str) -> Result<ParamValue>,
    pub(crate) get: fn(&ParamValue, &mut String),
}

/// The value held by one parameter cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    HexInt(u32),
    Bool(bool),
    /// Holds the stored (already inverted) value.
    InvBool(bool),
    Str(String),
    Array(ArrayValue),
}

impl ParamValue {
    /// Scalar kind of this value; strings report `Charp`, arrays `None`.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            ParamValue::Byte(_) => ScalarKind::Byte,
            ParamValue::Short(_) => ScalarKind::Short,
            ParamValue::UShort(_) => ScalarKind::UShort,
            ParamValue::Int(_) => ScalarKind::Int,
            ParamValue::UInt(_) => ScalarKind::UInt,
            ParamValue::Long(_) => ScalarKind::Long,
            ParamValue::ULong(_) => ScalarKind::ULong,
            ParamValue::HexInt(_) => ScalarKind::HexInt,
            ParamValue::Bool(_) => ScalarKind::Bool,
            ParamValue::InvBool(_) => ScalarKind::InvBool,
            ParamValue::Str(_) => ScalarKind::Charp,
            ParamValue::Array(_) => return None,
        })
    }

    /// Render the value the way the sysfs `get` operation does, without
    /// the trailing newline.
    pub fn format(&self, buf: &mut String) {
        match self {
            ParamValue::Array(array) => {
                for (i, elem) in array.supplied().iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    elem.format(buf);
                }
            }
            scalar => {
                if let Some(kind) = scalar.scalar_kind() {
                    (kind.ops().get)(scalar, buf);
                }
            }
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut buf = String::new();
        self.format(&mut buf);
        f.write_str(&buf)
    }
}

/// A fixed-capacity array cell plus the number of elements the loader
/// actually supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayValue {
    elem: ScalarKind,
    elems: Vec<ParamValue>,
    count: usize,
}

impl ArrayValue {
    /// Every element must be of kind `elem`; the length is the capacity.
    pub fn new(elem: ScalarKind, elems: Vec<ParamValue>) -> Self {
        ArrayValue {
            elem,
            elems,
            count: 0,
        }
    }

    pub fn elem_kind(&self) -> ScalarKind {
        self.elem
    }

    pub fn capacity(&self) -> usize {
        self.elems.len()
    }

    /// Number of elements supplied at load time, 0 if none were.
    pub fn count(&self) -> usize {
        self.count
    }

    /// All slots, including the ones still holding their default.
    pub fn elements(&self) -> &[ParamValue] {
        &self.elems
    }

    /// The slots written by the loader.
    pub fn supplied(&self) -> &[ParamValue] {
        &self.elems[..self.count]
    }

    /// Overwrite the leading slots with `supplied`, leaving the rest
    /// untouched. Elements past the capacity are dropped; callers check
    /// the capacity before getting here.
    pub fn overwrite_prefix(&mut self, supplied: Vec<ParamValue>) {
        let mut count = 0;
        for (slot, value) in self.elems.iter_mut().zip(supplied) {
            *slot = value;
            count += 1;
        }
        self.count = count;
    }
}

/// A Rust type that can be stored in a parameter cell.
pub trait KernelParamValue: Sized {
    const KIND: ScalarKind;
    fn parse(s: &str) -> Result<Self>;
    fn into_value(self) -> ParamValue;
    fn from_value(value: &ParamValue) -> Option<Self>;
}

macro_rules! impl_macro {
    ($name:ident, $type:ty, $variant:ident, $format:expr) => {
        impl KernelParamValue for $type {
            const KIND: ScalarKind = ScalarKind::$variant;

            fn parse(s: &str) -> Result<Self> {
                kstrtox::<$type>(s)
            }

            fn into_value(self) -> ParamValue {
                ParamValue::$variant(self)
            }

            fn from_value(value: &ParamValue) -> Option<Self> {
                match value {
                    ParamValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }

        paste! {
            fn [<param_set_ $name>](val: &str) -> Result<ParamValue> {
                <$type as KernelParamValue>::parse(val).map(ParamValue::$variant)
            }

            fn [<param_get_ $name>](value: &ParamValue, buf: &mut String) {
                if let ParamValue::$variant(v) = value {
                    let _ = write!(buf, $format, v);
                }
            }

            static [<PARAM_OPS_ $name:upper>]: ParamOps = ParamOps {
                set: [<param_set_ $name>],
                get: [<param_get_ $name>],
            };
        }
    };
}

impl_macro!(byte, u8, Byte, "{}");
impl_macro!(short, i16, Short, "{}");
impl_macro!(ushort, u16, UShort, "{}");
impl_macro!(int, i32, Int, "{}");
impl_macro!(uint, u32, UInt, "{}");
impl_macro!(long, i64, Long, "{}");
impl_macro!(ulong, u64, ULong, "{}");

/// An unsigned int shown in hex (`param_ops_hexint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexInt(pub u32);

impl KernelParamValue for HexInt {
    const KIND: ScalarKind = ScalarKind::HexInt;

    fn parse(s: &str) -> Result<Self> {
        kstrtox::<u32>(s).map(HexInt)
    }

    fn into_value(self) -> ParamValue {
        ParamValue::HexInt(self.0)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::HexInt(v) => Some(HexInt(*v)),
            _ => None,
        }
    }
}

fn param_set_hexint(val: &str) -> Result<ParamValue> {
    HexInt::parse(val).map(HexInt::into_value)
}

fn param_get_hexint(value: &ParamValue, buf: &mut String) {
    if let ParamValue::HexInt(v) = value {
        let _ = write!(buf, "{:#08x}", v);
    }
}

static PARAM_OPS_HEXINT: ParamOps = ParamOps {
    set: param_set_hexint,
    get: param_get_hexint,
};

impl KernelParamValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse(s: &str) -> Result<Self> {
        kstrtobool(s)
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Bool(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) | ParamValue::InvBool(v) => Some(*v),
            _ => None,
        }
    }
}

fn param_set_bool(val: &str) -> Result<ParamValue> {
    kstrtobool(val).map(ParamValue::Bool)
}

fn param_get_bool(value: &ParamValue, buf: &mut String) {
    if let ParamValue::Bool(v) = value {
        buf.push(if *v { 'Y' } else { 'N' });
    }
}

static PARAM_OPS_BOOL: ParamOps = ParamOps {
    set: param_set_bool,
    get: param_get_bool,
};

/// A bool whose stored value is the inverse of what was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvBool(pub bool);

impl KernelParamValue for InvBool {
    const KIND: ScalarKind = ScalarKind::InvBool;

    fn parse(s: &str) -> Result<Self> {
        kstrtobool(s).map(|v| InvBool(!v))
    }

    fn into_value(self) -> ParamValue {
        ParamValue::InvBool(self.0)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::InvBool(v) => Some(InvBool(*v)),
            _ => None,
        }
    }
}

fn param_set_invbool(val: &str) -> Result<ParamValue> {
    InvBool::parse(val).map(InvBool::into_value)
}

fn param_get_invbool(value: &ParamValue, buf: &mut String) {
    if let ParamValue::InvBool(v) = value {
        buf.push(if *v { 'N' } else { 'Y' });
    }
}

static PARAM_OPS_INVBOOL: ParamOps = ParamOps {
    set: param_set_invbool,
    get: param_get_invbool,
};

impl KernelParamValue for String {
    const KIND: ScalarKind = ScalarKind::Charp;

    fn parse(s: &str) -> Result<Self> {
        if s.len() > MAX_CHARP_LEN {
            return Err(ModuleErr::ENOSPC);
        }
        Ok(String::from(s))
    }

    fn into_value(self) -> ParamValue {
        ParamValue::Str(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

fn param_set_charp(val: &str) -> Result<ParamValue> {
    <String as KernelParamValue>::parse(val).map(ParamValue::Str)
}

fn param_get_charp(value: &ParamValue, buf: &mut String) {
    if let ParamValue::Str(s) = value {
        buf.push_str(s);
    }
}

static PARAM_OPS_CHARP: ParamOps = ParamOps {
    set: param_set_charp,
    get: param_get_charp,
};
