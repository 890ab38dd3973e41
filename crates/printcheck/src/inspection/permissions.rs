//! Permission flags as granted by a document's `/P` entry.

use std::fmt;

/// One user-access permission, numbered by its bit in `/P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionFlag {
    Print,
    ModifyContents,
    Copy,
    ModifyAnnotations,
    FillInteractiveForms,
    CopyForAccessibility,
    Assemble,
    PrintHighQuality,
}

impl PermissionFlag {
    /// Every flag, in reporting order.
    pub const ALL: [PermissionFlag; 8] = [
        PermissionFlag::Print,
        PermissionFlag::ModifyContents,
        PermissionFlag::Copy,
        PermissionFlag::ModifyAnnotations,
        PermissionFlag::FillInteractiveForms,
        PermissionFlag::CopyForAccessibility,
        PermissionFlag::Assemble,
        PermissionFlag::PrintHighQuality,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            PermissionFlag::Print => 0x04,
            PermissionFlag::ModifyContents => 0x08,
            PermissionFlag::Copy => 0x10,
            PermissionFlag::ModifyAnnotations => 0x20,
            PermissionFlag::FillInteractiveForms => 0x100,
            PermissionFlag::CopyForAccessibility => 0x200,
            PermissionFlag::Assemble => 0x400,
            PermissionFlag::PrintHighQuality => 0x800,
        }
    }

    /// Flags that allow printing at some quality.
    pub const fn is_print_class(self) -> bool {
        matches!(self, PermissionFlag::Print | PermissionFlag::PrintHighQuality)
    }

    pub const fn name(self) -> &'static str {
        match self {
            PermissionFlag::Print => "PRINT",
            PermissionFlag::ModifyContents => "MODIFY_CONTENTS",
            PermissionFlag::Copy => "COPY",
            PermissionFlag::ModifyAnnotations => "MODIFY_ANNOTATIONS",
            PermissionFlag::FillInteractiveForms => "FILL_INTERACTIVE_FORMS",
            PermissionFlag::CopyForAccessibility => "COPY_FOR_ACCESSIBILITY",
            PermissionFlag::Assemble => "ASSEMBLE",
            PermissionFlag::PrintHighQuality => "PRINT_HIGH_QUALITY",
        }
    }
}

impl fmt::Display for PermissionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.bit())
    }
}

/// The permissions a document grants.
///
/// An **empty set means unrestricted**: documents without a security
/// handler carry no permission list at all, and that absence grants
/// everything. Only an explicit list restricts, to exactly its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    flags: Vec<PermissionFlag>,
}

impl PermissionSet {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Explicit list. Duplicates are dropped and order normalized.
    pub fn from_flags(flags: impl IntoIterator<Item = PermissionFlag>) -> Self {
        let wanted: Vec<PermissionFlag> = flags.into_iter().collect();
        Self {
            flags: PermissionFlag::ALL
                .into_iter()
                .filter(|f| wanted.contains(f))
                .collect(),
        }
    }

    /// Flags whose bit is set in a `/P` value.
    pub fn from_p_value(p: i32) -> Self {
        let bits = p as u32;
        Self {
            flags: PermissionFlag::ALL
                .into_iter()
                .filter(|f| bits & f.bit() != 0)
                .collect(),
        }
    }

    pub fn flags(&self) -> &[PermissionFlag] {
        &self.flags
    }

    pub fn is_unrestricted(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn contains(&self, flag: PermissionFlag) -> bool {
        self.is_unrestricted() || self.flags.contains(&flag)
    }

    pub fn can_print(&self) -> bool {
        can_print(self)
    }

    /// Each known flag with whether it is granted.
    pub fn breakdown(&self) -> impl Iterator<Item = (PermissionFlag, bool)> + '_ {
        PermissionFlag::ALL
            .into_iter()
            .map(move |flag| (flag, self.contains(flag)))
    }
}

/// True when the set is unrestricted or grants a print-class flag.
pub fn can_print(permissions: &PermissionSet) -> bool {
    permissions.is_unrestricted() || permissions.flags.iter().any(|f| f.is_print_class())
}
