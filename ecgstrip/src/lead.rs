/// One of the twelve standard ECG leads.
///
/// The discriminant is the panel index in the fixed output order:
/// limb leads top-to-bottom in the left column, then chest leads
/// top-to-bottom in the right column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lead {
    I,
    II,
    III,
    #[cfg_attr(feature = "serde", serde(rename = "aVR"))]
    AVR,
    #[cfg_attr(feature = "serde", serde(rename = "aVL"))]
    AVL,
    #[cfg_attr(feature = "serde", serde(rename = "aVF"))]
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

/// Number of lead panels produced per strip.
pub const LEAD_COUNT: usize = 12;

impl Lead {
    /// All leads in output order.
    pub const ALL: [Lead; LEAD_COUNT] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    /// Panel index, 0–11.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a lead by its panel index.
    pub fn from_index(index: usize) -> Option<Lead> {
        Lead::ALL.get(index).copied()
    }

    /// Conventional display name ("I", "aVR", "V1", ...).
    pub fn name(self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
        }
    }

    /// Look up a lead by its display name.
    pub fn from_name(name: &str) -> Option<Lead> {
        Lead::ALL.iter().find(|l| l.name() == name).copied()
    }

    /// Limb leads sit in the left column, chest leads in the right.
    pub fn is_limb(self) -> bool {
        self.index() < LEAD_COUNT / 2
    }
}

impl std::fmt::Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
