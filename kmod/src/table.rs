use crate::param::{ArrayValue, KernelParamValue, MAX_CHARP_LEN, ParamValue, ScalarKind};
use crate::{ParamError, ParamPerm, ParamResult};
use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::fmt::Display;

/// The shape of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar(ScalarKind),
    /// A string copied into a `max_len` byte buffer (`module_param_string`).
    /// The buffer keeps room for the terminating NUL, so values hold at
    /// most `max_len - 1` bytes.
    String { max_len: usize },
    /// A fixed-capacity array (`module_param_array`).
    Array { elem: ScalarKind, capacity: usize },
}

impl ParamKind {
    /// Whether `value` may be stored in a cell of this kind.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamKind::Scalar(kind), value) => value.scalar_kind() == Some(*kind),
            (ParamKind::String { max_len }, ParamValue::Str(s)) => s.len() < *max_len,
            (ParamKind::Array { elem, capacity }, ParamValue::Array(array)) => {
                array.elem_kind() == *elem
                    && array.capacity() == *capacity
                    && array
                        .elements()
                        .iter()
                        .all(|v| v.scalar_kind() == Some(*elem))
            }
            _ => false,
        }
    }
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamKind::Scalar(kind) => write!(f, "{}", kind),
            ParamKind::String { .. } => write!(f, "string"),
            ParamKind::Array { elem, .. } => write!(f, "array of {}", elem),
        }
    }
}

/// One entry of a component's declaration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    name: String,
    kind: ParamKind,
    default: ParamValue,
    perm: ParamPerm,
    description: Option<String>,
}

impl ParamSpec {
    fn with_kind(name: &str, kind: ParamKind, default: ParamValue) -> Self {
        ParamSpec {
            name: name.to_string(),
            kind,
            default,
            perm: ParamPerm::empty(),
            description: None,
        }
    }

    /// A scalar parameter (`module_param`).
    pub fn new<T: KernelParamValue>(name: &str, default: T) -> Self {
        Self::with_kind(name, ParamKind::Scalar(T::KIND), default.into_value())
    }

    /// A `charp` parameter.
    pub fn charp(name: &str, default: &str) -> Self {
        Self::new(name, default.to_string())
    }

    /// A bounded string parameter (`module_param_string`).
    pub fn string(name: &str, default: &str, max_len: usize) -> Self {
        Self::with_kind(
            name,
            ParamKind::String { max_len },
            ParamValue::Str(default.to_string()),
        )
    }

    /// An array parameter whose capacity is the number of defaults given.
    pub fn array<T, I>(name: &str, defaults: I) -> Self
    where
        T: KernelParamValue,
        I: IntoIterator<Item = T>,
    {
        let elems: Vec<ParamValue> = defaults.into_iter().map(T::into_value).collect();
        let kind = ParamKind::Array {
            elem: T::KIND,
            capacity: elems.len(),
        };
        Self::with_kind(name, kind, ParamValue::Array(ArrayValue::new(T::KIND, elems)))
    }

    pub fn perm(mut self, perm: ParamPerm) -> Self {
        self.perm = perm;
        self
    }

    /// Attach the text `modinfo` shows for this parameter (`MODULE_PARM_DESC`).
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    pub fn permissions(&self) -> ParamPerm {
        self.perm
    }

    pub fn desc(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn validate(&self) -> ParamResult<()> {
        let invalid = |reason| ParamError::InvalidDeclaration {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("empty name"));
        }
        if self
            .name
            .chars()
            .any(|c| c == '=' || c == '"' || c.is_whitespace())
        {
            return Err(invalid("name contains '=', '\"' or whitespace"));
        }
        match (&self.kind, &self.default) {
            (ParamKind::Array { capacity: 0, .. }, _) => {
                return Err(invalid("array needs a capacity of at least 1"));
            }
            (ParamKind::String { max_len }, ParamValue::Str(s)) if s.len() >= *max_len => {
                return Err(invalid("default does not fit the string buffer"));
            }
            (ParamKind::Scalar(ScalarKind::Charp), ParamValue::Str(s))
                if s.len() > MAX_CHARP_LEN =>
            {
                return Err(invalid("default longer than a charp allows"));
            }
            _ => {}
        }
        self.perm.verify().map_err(invalid)
    }
}

/// Compare parameter names treating `-` and `_` as the same character.
///
/// See <https://elixir.bootlin.com/linux/v6.6/source/kernel/params.c#L89>
pub fn parameq(a: &str, b: &str) -> bool {
    fn dash2underscore(c: u8) -> u8 {
        if c == b'-' { b'_' } else { c }
    }
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .all(|(x, y)| dash2underscore(x) == dash2underscore(y))
}

/// A component's parameter declarations. Cloning shares the entries.
#[derive(Debug, Clone)]
pub struct ParamTable {
    specs: Arc<[ParamSpec]>,
}

impl Default for ParamTable {
    fn default() -> Self {
        ParamTable {
            specs: Arc::from(Vec::new()),
        }
    }
}

impl ParamTable {
    pub fn builder() -> ParamTableBuilder {
        ParamTableBuilder::default()
    }

    pub fn empty() -> Self {
        ParamTable::default()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ParamSpec> {
        self.specs.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&ParamSpec> {
        self.specs.get(idx)
    }

    /// Look a parameter up by name, returning its index and declaration.
    pub fn find(&self, name: &str) -> Option<(usize, &ParamSpec)> {
        self.specs
            .iter()
            .enumerate()
            .find(|(_, spec)| parameq(spec.name(), name))
    }
}

/// Collects declarations and rejects duplicates and malformed entries.
#[derive(Debug, Default)]
pub struct ParamTableBuilder {
    specs: Vec<ParamSpec>,
    error: Option<ParamError>,
}

impl ParamTableBuilder {
    /// Add one declaration, failing right away if it is invalid or its
    /// name is already taken.
    pub fn register(&mut self, spec: ParamSpec) -> ParamResult<()> {
        spec.validate()?;
        if self.specs.iter().any(|s| parameq(s.name(), spec.name())) {
            return Err(ParamError::Duplicate { name: spec.name });
        }
        log::trace!("declared parameter '{}' ({})", spec.name, spec.kind);
        self.specs.push(spec);
        Ok(())
    }

    /// Chaining form of [`register`](Self::register). The first error is
    /// kept and reported by [`build`](Self::build).
    pub fn param(mut self, spec: ParamSpec) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.register(spec) {
                self.error = Some(err);
            }
        }
        self
    }

    pub fn build(self) -> ParamResult<ParamTable> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(ParamTable {
                specs: self.specs.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_table() -> ParamResult<ParamTable> {
        ParamTable::builder()
            .param(ParamSpec::new("myshort", 1i16).perm(ParamPerm::from_mode(0o660)))
            .param(ParamSpec::new("myint", 420i32).perm(ParamPerm::from_mode(0o644)))
            .param(ParamSpec::charp("mystring", "blah"))
            .param(ParamSpec::array("myintArray", [420i32, 420]))
            .build()
    }

    #[test]
    fn test_build_and_find() {
        let table = hello_table().expect("valid table");
        assert_eq!(table.len(), 4);

        let (idx, spec) = table.find("myint").expect("declared");
        assert_eq!(idx, 1);
        assert_eq!(spec.kind(), ParamKind::Scalar(ScalarKind::Int));
        assert_eq!(spec.default_value(), &ParamValue::Int(420));

        let (_, array) = table.find("myintArray").expect("declared");
        assert_eq!(
            array.kind(),
            ParamKind::Array {
                elem: ScalarKind::Int,
                capacity: 2
            }
        );
        assert!(table.find("nope").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = ParamTable::builder();
        builder.register(ParamSpec::new("my_int", 1i32)).unwrap();
        assert_eq!(
            builder.register(ParamSpec::new("my-int", 2i32)),
            Err(ParamError::Duplicate {
                name: "my-int".to_string()
            })
        );

        let chained = ParamTable::builder()
            .param(ParamSpec::new("a", 1u8))
            .param(ParamSpec::new("a", 2u8))
            .param(ParamSpec::new("", 3u8))
            .build();
        assert!(matches!(chained, Err(ParamError::Duplicate { .. })));
    }

    #[test]
    fn test_invalid_declarations() {
        let bad = [
            ParamSpec::new("", 1i32),
            ParamSpec::new("a=b", 1i32),
            ParamSpec::new("a b", 1i32),
            ParamSpec::array::<i32, _>("empty", []),
            ParamSpec::string("buf", "too long", 3),
            ParamSpec::string("nul", "four", 4),
            ParamSpec::new("open", 1i32).perm(ParamPerm::from_mode(0o666)),
        ];
        for spec in bad {
            let name = spec.name().to_string();
            let err = ParamTable::builder().param(spec).build().unwrap_err();
            assert!(
                matches!(err, ParamError::InvalidDeclaration { .. }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn test_parameq() {
        assert!(parameq("my-int", "my_int"));
        assert!(parameq("myint", "myint"));
        assert!(!parameq("myint", "myInt"));
        assert!(!parameq("myint", "myint2"));
    }

    #[test]
    fn test_kind_display() {
        let table = hello_table().unwrap();
        let kinds: Vec<String> = table.iter().map(|s| s.kind().to_string()).collect();
        assert_eq!(kinds, ["short", "int", "charp", "array of int"]);
        assert_eq!(ParamKind::String { max_len: 8 }.to_string(), "string");
    }

    #[test]
    fn test_accepts() {
        let kind = ParamKind::String { max_len: 4 };
        assert!(kind.accepts(&ParamValue::Str("abc".to_string())));
        assert!(!kind.accepts(&ParamValue::Str("abcd".to_string())));
        assert!(!ParamKind::Scalar(ScalarKind::Int).accepts(&ParamValue::Long(1)));
    }
}
