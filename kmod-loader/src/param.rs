//! Parsing of load-time arguments such as `foo=bar,bar2 baz=fuz wiz`.
//!
//! See <https://elixir.bootlin.com/linux/v6.6/source/kernel/params.c>

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use kmod::{
    MAX_CHARP_LEN, ModuleErr, ParamError, ParamKind, ParamResult, ParamTable, ParamValue,
    ParamValues, ScalarKind,
};

/// What to do with an argument naming a parameter the module never declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownParamPolicy {
    /// Log it, record it as a warning and keep going.
    #[default]
    Ignore,
    /// Fail the whole load.
    Reject,
}

/// Arguments that have been parsed and coerced but not yet stored.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub(crate) staged: BTreeMap<usize, ParamValue>,
    pub(crate) warnings: Vec<ParamError>,
    pub(crate) after_dashes: String,
}

impl ParsedArgs {
    /// Staged values by table index.
    pub fn staged(&self) -> impl Iterator<Item = (usize, &ParamValue)> + '_ {
        self.staged.iter().map(|(idx, value)| (*idx, value))
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Unknown parameters that were skipped.
    pub fn warnings(&self) -> &[ParamError] {
        &self.warnings
    }

    /// Whatever followed a bare `--`, untouched.
    pub fn after_dashes(&self) -> &str {
        &self.after_dashes
    }

    /// Write every staged value into `values` in one step. Staged values
    /// are consumed; calling it again applies nothing.
    pub fn apply(&mut self, values: &mut ParamValues) -> ParamResult<()> {
        values.commit(core::mem::take(&mut self.staged))
    }
}

/// Split the next `param[=value]` off `args`, which must not start with
/// whitespace. Returns the raw token, the name, the value and the rest.
///
/// Quotes may wrap the whole token (`"foo=bar baz"`) or only the value
/// (`foo="bar baz"`); whitespace inside them does not end the token.
fn next_arg(args: &str) -> ParamResult<(&str, &str, Option<&str>, &str)> {
    let bytes = args.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() && !in_quote {
            break;
        }
        if c == b'"' {
            in_quote = !in_quote;
        }
        i += 1;
    }

    let token = &args[..i];
    if in_quote {
        return Err(ParamError::Malformed {
            token: token.to_string(),
        });
    }
    let rest = args[i..].trim_start_matches(|c: char| c.is_ascii_whitespace());

    let body = match token.strip_prefix('"') {
        Some(inner) => inner.strip_suffix('"').unwrap_or(inner),
        None => token,
    };
    let (param, val) = match body.split_once('=') {
        Some((param, val)) => {
            let val = match val.strip_prefix('"') {
                Some(inner) => inner.strip_suffix('"').unwrap_or(inner),
                None => val,
            };
            (param, Some(val))
        }
        None => (body, None),
    };
    Ok((token, param, val, rest))
}

/// Coerce one textual value into `kind`.
fn coerce(name: &str, kind: ScalarKind, text: &str) -> ParamResult<ParamValue> {
    kind.parse(text).map_err(|err| match err {
        ModuleErr::ENOSPC => ParamError::StringTooLong {
            name: name.to_string(),
            max_len: MAX_CHARP_LEN,
        },
        _ => ParamError::TypeCoercion {
            name: name.to_string(),
            value: text.to_string(),
            kind: kind.name(),
        },
    })
}

struct ArgParser<'a> {
    doing: &'a str,
    table: &'a ParamTable,
    policy: UnknownParamPolicy,
    scalars: BTreeMap<usize, ParamValue>,
    arrays: BTreeMap<usize, Vec<ParamValue>>,
    warnings: Vec<ParamError>,
}

impl<'a> ArgParser<'a> {
    fn new(doing: &'a str, table: &'a ParamTable, policy: UnknownParamPolicy) -> Self {
        ArgParser {
            doing,
            table,
            policy,
            scalars: BTreeMap::new(),
            arrays: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Handle one `param[=val]`. Nothing is written to any cell here.
    fn parse_one(&mut self, token: &str, param: &str, val: Option<&str>) -> ParamResult<()> {
        let malformed = || ParamError::Malformed {
            token: token.to_string(),
        };
        if param.is_empty() {
            return Err(malformed());
        }

        let table = self.table;
        let Some((idx, spec)) = table.find(param) else {
            if val.is_none() {
                return Err(malformed());
            }
            let err = ParamError::Unknown {
                name: param.to_string(),
            };
            return match self.policy {
                UnknownParamPolicy::Ignore => {
                    log::warn!("{}: unknown parameter '{}' ignored", self.doing, param);
                    self.warnings.push(err);
                    Ok(())
                }
                UnknownParamPolicy::Reject => Err(err),
            };
        };

        match spec.kind() {
            ParamKind::Scalar(kind) => {
                let val = match val {
                    Some(val) => val,
                    // Bare flag: a bool set with no value means "true".
                    None if kind.takes_flag() => "1",
                    None => return Err(malformed()),
                };
                let value = coerce(spec.name(), kind, val)?;
                log::debug!("{}: handling {}={}", self.doing, spec.name(), val);
                if self.scalars.insert(idx, value).is_some() {
                    log::debug!("{}: '{}' given again, last one wins", self.doing, spec.name());
                }
            }
            ParamKind::String { max_len } => {
                let val = val.ok_or_else(malformed)?;
                // The buffer also holds the terminating NUL.
                if val.len() + 1 > max_len {
                    return Err(ParamError::StringTooLong {
                        name: spec.name().to_string(),
                        max_len: max_len.saturating_sub(1),
                    });
                }
                log::debug!("{}: handling {}={}", self.doing, spec.name(), val);
                self.scalars.insert(idx, ParamValue::Str(val.to_string()));
            }
            ParamKind::Array { elem, capacity } => {
                let val = val.ok_or_else(malformed)?;
                let elems = self.arrays.entry(idx).or_default();
                for piece in val.split(',') {
                    if elems.len() == capacity {
                        return Err(ParamError::ArrayOverflow {
                            name: spec.name().to_string(),
                            capacity,
                        });
                    }
                    elems.push(coerce(spec.name(), elem, piece)?);
                }
                log::debug!(
                    "{}: handling {}={} ({} of {})",
                    self.doing,
                    spec.name(),
                    val,
                    elems.len(),
                    capacity
                );
            }
        }
        Ok(())
    }

    fn finish(self, after_dashes: &str) -> ParsedArgs {
        let mut staged = self.scalars;
        for (idx, elems) in self.arrays {
            let Some(ParamValue::Array(default)) = self.table.get(idx).map(|s| s.default_value())
            else {
                continue;
            };
            let mut array = default.clone();
            array.overwrite_prefix(elems);
            staged.insert(idx, ParamValue::Array(array));
        }
        ParsedArgs {
            staged,
            warnings: self.warnings,
            after_dashes: after_dashes.to_string(),
        }
    }
}

/// Parse a whitespace-separated argument string against `table`.
///
/// `doing` names the module in log messages. Parsing stops at a bare
/// `--`; the remainder is kept in [`ParsedArgs::after_dashes`].
pub fn parse_args(
    doing: &str,
    args: &str,
    table: &ParamTable,
    policy: UnknownParamPolicy,
) -> ParamResult<ParsedArgs> {
    log::debug!("doing {}, parsing ARGS: '{}'", doing, args);
    let mut parser = ArgParser::new(doing, table, policy);
    let mut args = args.trim_start_matches(|c: char| c.is_ascii_whitespace());
    while !args.is_empty() {
        let (token, param, val, rest) = next_arg(args)?;
        if token == "--" {
            return Ok(parser.finish(rest));
        }
        parser.parse_one(token, param, val)?;
        args = rest;
    }
    Ok(parser.finish(""))
}

/// Parse arguments that were already split into tokens, e.g. a command
/// line's argv. Each token is `name=value` as-is; no quote handling.
pub fn parse_tokens<'t, I>(
    doing: &str,
    tokens: I,
    table: &ParamTable,
    policy: UnknownParamPolicy,
) -> ParamResult<ParsedArgs>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut parser = ArgParser::new(doing, table, policy);
    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        if token == "--" {
            let rest: Vec<&str> = tokens.collect();
            return Ok(parser.finish(&rest.join(" ")));
        }
        let (param, val) = match token.split_once('=') {
            Some((param, val)) => (param, Some(val)),
            None => (token, None),
        };
        parser.parse_one(token, param, val)?;
    }
    Ok(parser.finish(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmod::{HexInt, InvBool, ParamPerm, ParamSpec};

    fn table() -> ParamTable {
        ParamTable::builder()
            .param(ParamSpec::new("myshort", 1i16).perm(ParamPerm::from_mode(0o660)))
            .param(ParamSpec::new("myint", 420i32))
            .param(ParamSpec::new("mylong", 9999i64))
            .param(ParamSpec::charp("mystring", "blah"))
            .param(ParamSpec::array("myintArray", [420i32, 420]))
            .param(ParamSpec::new("verbose", false))
            .param(ParamSpec::new("quiet", InvBool(true)))
            .param(ParamSpec::new("mask", HexInt(0xff)))
            .param(ParamSpec::string("label", "none", 8))
            .build()
            .expect("valid table")
    }

    fn load(args: &str) -> ParamResult<ParamValues> {
        let table = table();
        let mut values = ParamValues::new(&table);
        parse_args("test", args, &table, UnknownParamPolicy::Ignore)?.apply(&mut values)?;
        Ok(values)
    }

    #[test]
    fn test_next_arg() {
        assert_eq!(
            next_arg("foo=bar baz").unwrap(),
            ("foo=bar", "foo", Some("bar"), "baz")
        );
        assert_eq!(next_arg("wiz").unwrap(), ("wiz", "wiz", None, ""));
        assert_eq!(
            next_arg("foo=\"a b\"   next").unwrap(),
            ("foo=\"a b\"", "foo", Some("a b"), "next")
        );
        assert_eq!(
            next_arg("\"foo=a b\"").unwrap(),
            ("\"foo=a b\"", "foo", Some("a b"), "")
        );
        assert_eq!(next_arg("a=b=c").unwrap(), ("a=b=c", "a", Some("b=c"), ""));
        assert!(matches!(
            next_arg("foo=\"open"),
            Err(ParamError::Malformed { .. })
        ));
    }

    #[test]
    fn test_no_args_keeps_defaults() {
        let values = load("").unwrap();
        for (spec, value) in values.iter() {
            assert_eq!(value, spec.default_value(), "{}", spec.name());
        }
        let values = load("   ").unwrap();
        assert_eq!(values.get::<i32>("myint"), Some(420));
    }

    #[test]
    fn test_assigns_only_named() {
        let values = load("myshort=-3 mylong=0x10 mystring=hello").unwrap();
        assert_eq!(values.get::<i16>("myshort"), Some(-3));
        assert_eq!(values.get::<i64>("mylong"), Some(16));
        assert_eq!(values.get::<String>("mystring").as_deref(), Some("hello"));
        for name in ["myint", "myintArray", "verbose", "quiet", "mask", "label"] {
            assert_eq!(values.is_default(name), Some(true), "{name}");
        }
    }

    #[test]
    fn test_array_short_and_overflow() {
        let values = load("myintArray=-1").unwrap();
        let array = values.array::<i32>("myintArray").unwrap();
        assert_eq!(array.elements(), &[-1, 420]);
        assert_eq!(array.count(), 1);

        let values = load("myintArray=-1,7").unwrap();
        let array = values.array::<i32>("myintArray").unwrap();
        assert_eq!(array.elements(), &[-1, 7]);
        assert_eq!(array.count(), 2);

        assert_eq!(
            load("myintArray=1,2,3").unwrap_err(),
            ParamError::ArrayOverflow {
                name: "myintArray".to_string(),
                capacity: 2
            }
        );
    }

    #[test]
    fn test_array_repeated_flag_form() {
        let values = load("myintArray=5 myintArray=6").unwrap();
        let array = values.array::<i32>("myintArray").unwrap();
        assert_eq!(array.supplied(), &[5, 6]);

        assert!(matches!(
            load("myintArray=5 myintArray=6,7"),
            Err(ParamError::ArrayOverflow { .. })
        ));
    }

    #[test]
    fn test_type_coercion() {
        assert_eq!(
            load("myint=abc").unwrap_err(),
            ParamError::TypeCoercion {
                name: "myint".to_string(),
                value: "abc".to_string(),
                kind: "int",
            }
        );
        assert!(matches!(
            load("myshort=40000"),
            Err(ParamError::TypeCoercion { .. })
        ));
        assert!(matches!(
            load("myintArray=1,x"),
            Err(ParamError::TypeCoercion { .. })
        ));
        assert!(matches!(load("myint="), Err(ParamError::TypeCoercion { .. })));
    }

    #[test]
    fn test_failure_applies_nothing() {
        let table = table();
        let mut values = ParamValues::new(&table);
        let result = parse_args("test", "myint=1 mylong=bad", &table, UnknownParamPolicy::Ignore)
            .and_then(|mut parsed| parsed.apply(&mut values));
        assert!(result.is_err());
        assert_eq!(values.get::<i32>("myint"), Some(420));
    }

    #[test]
    fn test_unknown_policy() {
        let table = table();
        let parsed =
            parse_args("test", "nosuch=1 myint=2", &table, UnknownParamPolicy::Ignore).unwrap();
        assert_eq!(
            parsed.warnings(),
            &[ParamError::Unknown {
                name: "nosuch".to_string()
            }]
        );
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed.staged().collect::<Vec<_>>(),
            [(1, &ParamValue::Int(2))]
        );

        let rejected = parse_args("test", "nosuch=1 myint=2", &table, UnknownParamPolicy::Reject);
        assert!(matches!(rejected, Err(ParamError::Unknown { .. })));
    }

    #[test]
    fn test_malformed() {
        for args in ["myint", "=5", "nosuch", "mystring=\"oops"] {
            assert!(
                matches!(load(args), Err(ParamError::Malformed { .. })),
                "{args}"
            );
        }
    }

    #[test]
    fn test_bools_and_flags() {
        let values = load("verbose quiet").unwrap();
        assert_eq!(values.get::<bool>("verbose"), Some(true));
        assert_eq!(values.get::<InvBool>("quiet"), Some(InvBool(false)));

        let values = load("verbose=n quiet=n").unwrap();
        assert_eq!(values.get::<bool>("verbose"), Some(false));
        assert_eq!(values.get::<InvBool>("quiet"), Some(InvBool(true)));
        assert_eq!(values.show("quiet").as_deref(), Some("N\n"));
    }

    #[test]
    fn test_strings() {
        let values = load("mystring=\"hello world\" label=short").unwrap();
        assert_eq!(values.get::<String>("mystring").as_deref(), Some("hello world"));
        assert_eq!(values.get::<String>("label").as_deref(), Some("short"));

        assert_eq!(
            load("label=waytoolong").unwrap_err(),
            ParamError::StringTooLong {
                name: "label".to_string(),
                max_len: 7
            }
        );
        let values = load("label=1234567").unwrap();
        assert_eq!(values.get::<String>("label").as_deref(), Some("1234567"));
        assert!(matches!(
            load("label=12345678"),
            Err(ParamError::StringTooLong { max_len: 7, .. })
        ));
        let long = alloc::format!("mystring={}", "x".repeat(MAX_CHARP_LEN + 1));
        assert!(matches!(load(&long), Err(ParamError::StringTooLong { .. })));
    }

    #[test]
    fn test_dashes_and_names() {
        let table = table();
        let parsed =
            parse_args("test", "mask=0x10 -- myint=1 foo", &table, UnknownParamPolicy::Reject)
                .unwrap();
        assert_eq!(parsed.after_dashes(), "myint=1 foo");
        assert_eq!(parsed.len(), 1);

        let table = ParamTable::builder()
            .param(ParamSpec::new("max_count", 1u32))
            .build()
            .unwrap();
        let mut values = ParamValues::new(&table);
        parse_args("test", "max-count=3", &table, UnknownParamPolicy::Reject)
            .and_then(|mut parsed| parsed.apply(&mut values))
            .unwrap();
        assert_eq!(values.get::<u32>("max_count"), Some(3));
    }

    #[test]
    fn test_last_scalar_wins() {
        let values = load("myint=1 myint=2").unwrap();
        assert_eq!(values.get::<i32>("myint"), Some(2));
    }

    #[test]
    fn test_parse_tokens() {
        let table = table();
        let mut values = ParamValues::new(&table);
        let mut parsed = parse_tokens(
            "test",
            ["mystring=two words", "myintArray=3,4", "verbose", "--", "x=1"],
            &table,
            UnknownParamPolicy::Reject,
        )
        .unwrap();
        assert_eq!(parsed.after_dashes(), "x=1");
        assert_eq!(parsed.staged().count(), 3);
        parsed.apply(&mut values).unwrap();
        assert!(parsed.is_empty());

        assert_eq!(values.get::<String>("mystring").as_deref(), Some("two words"));
        assert_eq!(values.array::<i32>("myintArray").unwrap().supplied(), &[3, 4]);
        assert_eq!(values.get::<bool>("verbose"), Some(true));
    }
}
