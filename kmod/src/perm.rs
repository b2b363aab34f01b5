use bitflags::bitflags;
use core::fmt::Display;

bitflags! {
    /// Permission bits of a parameter's sysfs entry. Informational only:
    /// they decide whether a parameter is listed as visible, nothing more.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamPerm: u16 {
        const S_IRUSR = 0o400;
        const S_IWUSR = 0o200;
        const S_IRGRP = 0o040;
        const S_IWGRP = 0o020;
        const S_IROTH = 0o004;
        const S_IWOTH = 0o002;
    }
}

impl Display for ParamPerm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let pairs = [
            (ParamPerm::S_IRUSR, ParamPerm::S_IWUSR),
            (ParamPerm::S_IRGRP, ParamPerm::S_IWGRP),
            (ParamPerm::S_IROTH, ParamPerm::S_IWOTH),
        ];
        for (r, w) in pairs {
            let r = if self.contains(r) { 'r' } else { '-' };
            let w = if self.contains(w) { 'w' } else { '-' };
            write!(f, "{}{}-", r, w)?;
        }
        Ok(())
    }
}

impl ParamPerm {
    /// Build from an octal mode such as `0o644`. Unknown bits are dropped.
    pub const fn from_mode(mode: u16) -> Self {
        Self::from_bits_truncate(mode)
    }

    /// Check the bits the way `VERIFY_OCTAL_PERMISSIONS` does.
    ///
    /// See <https://elixir.bootlin.com/linux/v6.6/source/include/linux/kernel.h#L414>
    pub fn verify(self) -> core::result::Result<(), &'static str> {
        let mode = self.bits();
        if (mode >> 6) & 4 < (mode >> 3) & 4 {
            return Err("group readable but not user readable");
        }
        if (mode >> 3) & 4 < mode & 4 {
            return Err("other readable but not group readable");
        }
        if (mode >> 6) & 2 < (mode >> 3) & 2 {
            return Err("group writable but not user writable");
        }
        if mode & 2 != 0 {
            return Err("world writable");
        }
        Ok(())
    }
}
