#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// DMG hardware revision.
///
/// Only the boot ROM's leftover register contents differ between revisions
/// as far as this core is concerned.
pub enum DmgRevision {
    Rev0,
    RevA,
    RevB,
    #[default]
    RevC,
}

impl DmgRevision {
    /// Parse a revision name such as `"0"`, `"A"` or `"revc"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "0" | "REV0" => Some(DmgRevision::Rev0),
            "A" | "REVA" => Some(DmgRevision::RevA),
            "B" | "REVB" => Some(DmgRevision::RevB),
            "C" | "REVC" => Some(DmgRevision::RevC),
            _ => None,
        }
    }

    /// Short name accepted by [`DmgRevision::parse`].
    pub fn name(self) -> &'static str {
        match self {
            DmgRevision::Rev0 => "0",
            DmgRevision::RevA => "A",
            DmgRevision::RevB => "B",
            DmgRevision::RevC => "C",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for rev in [
            DmgRevision::Rev0,
            DmgRevision::RevA,
            DmgRevision::RevB,
            DmgRevision::RevC,
        ] {
            assert_eq!(DmgRevision::parse(rev.name()), Some(rev));
        }
        assert_eq!(DmgRevision::parse("revb"), Some(DmgRevision::RevB));
        assert_eq!(DmgRevision::parse("D"), None);
    }
}
