//! Integer and boolean conversion with the kernel's `kstrto*` rules.
//!
//! See <https://elixir.bootlin.com/linux/v6.6/source/lib/kstrtox.c>

use crate::{ModuleErr, Result};

/// Pick the radix the way `_parse_integer_fixup_radix` does for base 0.
fn fixup_radix(s: &str) -> (u32, &str) {
    let bytes = s.as_bytes();
    if bytes.len() > 2
        && bytes[0] == b'0'
        && (bytes[1] | 0x20) == b'x'
        && bytes[2].is_ascii_hexdigit()
    {
        (16, &s[2..])
    } else if bytes.len() > 1 && bytes[0] == b'0' {
        (8, &s[1..])
    } else {
        (10, s)
    }
}

/// Parse a signed or unsigned integer of any width.
///
/// Accepts an optional sign, `0x` hex and leading-`0` octal prefixes and a
/// single trailing newline. Values that do not fit `T` yield `ERANGE`.
pub fn kstrtox<T>(s: &str) -> Result<T>
where
    T: TryFrom<i128>,
{
    let s = s.strip_suffix('\n').unwrap_or(s);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = fixup_radix(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ModuleErr::EINVAL);
    }

    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| ModuleErr::ERANGE)?;
    let v = if negative { -magnitude } else { magnitude };

    T::try_from(v).map_err(|_| ModuleErr::ERANGE)
}

/// Parse a boolean the way `kstrtobool` does: only the first one or two
/// characters are significant.
pub fn kstrtobool(s: &str) -> Result<bool> {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b'y' | b'Y' | b't' | b'T' | b'1') => Ok(true),
        Some(b'n' | b'N' | b'f' | b'F' | b'0') => Ok(false),
        Some(b'o' | b'O') => match bytes.get(1) {
            Some(b'n' | b'N') => Ok(true),
            Some(b'f' | b'F') => Ok(false),
            _ => Err(ModuleErr::EINVAL),
        },
        _ => Err(ModuleErr::EINVAL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal() {
        assert_eq!(kstrtox::<i32>("420"), Ok(420));
        assert_eq!(kstrtox::<i32>("-1"), Ok(-1));
        assert_eq!(kstrtox::<i32>("+7"), Ok(7));
        assert_eq!(kstrtox::<i16>("-32768"), Ok(i16::MIN));
        assert_eq!(kstrtox::<i64>("9999\n"), Ok(9999));
    }

    #[test]
    fn test_prefixed() {
        assert_eq!(kstrtox::<u8>("0x7F"), Ok(127));
        assert_eq!(kstrtox::<u8>("0377"), Ok(255));
        assert_eq!(kstrtox::<u32>("0XDEADBEEF"), Ok(0xDEAD_BEEF));
        assert_eq!(kstrtox::<i32>("-0x10"), Ok(-16));
        assert_eq!(kstrtox::<i32>("0"), Ok(0));
    }

    #[test]
    fn test_invalid() {
        assert_eq!(kstrtox::<i32>(""), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>("abc"), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>("12abc"), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>("0x"), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>("09"), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>("0x-5"), Err(ModuleErr::EINVAL));
        assert_eq!(kstrtox::<i32>(" 5"), Err(ModuleErr::EINVAL));
    }

    #[test]
    fn test_range() {
        assert_eq!(kstrtox::<i16>("32768"), Err(ModuleErr::ERANGE));
        assert_eq!(kstrtox::<u8>("256"), Err(ModuleErr::ERANGE));
        assert_eq!(kstrtox::<u32>("-1"), Err(ModuleErr::ERANGE));
    }

    #[test]
    fn test_bool() {
        for s in ["y", "Y", "1", "true", "on", "ON"] {
            assert_eq!(kstrtobool(s), Ok(true), "{s}");
        }
        for s in ["n", "N", "0", "false", "off", "Of"] {
            assert_eq!(kstrtobool(s), Ok(false), "{s}");
        }
        for s in ["", "o", "maybe", "2"] {
            assert_eq!(kstrtobool(s), Err(ModuleErr::EINVAL), "{s}");
        }
    }
}
