use core::fmt;

/// A four-byte ASCII chunk tag (`SHEX`, `RDEF`, `ISGN`, ...).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// The two shader-code chunk tags.
    pub const SHDR: FourCC = FourCC(*b"SHDR");
    pub const SHEX: FourCC = FourCC(*b"SHEX");
    /// Resource definition (reflection) chunk.
    pub const RDEF: FourCC = FourCC(*b"RDEF");
    /// Input signature tags.
    pub const ISGN: FourCC = FourCC(*b"ISGN");
    pub const ISG1: FourCC = FourCC(*b"ISG1");
    /// Output signature tags.
    pub const OSGN: FourCC = FourCC(*b"OSGN");
    pub const OSG5: FourCC = FourCC(*b"OSG5");
    pub const OSG1: FourCC = FourCC(*b"OSG1");
    /// Patch-constant signature tag.
    pub const PCSG: FourCC = FourCC(*b"PCSG");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}
