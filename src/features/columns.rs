//! Column naming
//!
//! Every feature column either belongs to one competitor slot or is shared
//! by the bout. Slot-owned columns are renamed between slots structurally,
//! never by string substitution on arbitrary names.

use crate::Slot;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKey {
    /// A column describing the competitor in the given slot
    Competitor(Slot, String),
    /// A column describing the bout or comparing both competitors
    Shared(String),
}

impl ColumnKey {
    pub fn competitor(slot: Slot, base: &str) -> Self {
        ColumnKey::Competitor(slot, base.to_string())
    }

    pub fn shared(name: &str) -> Self {
        ColumnKey::Shared(name.to_string())
    }

    /// Both slot variants of a competitor column
    pub fn both(base: &str) -> [ColumnKey; 2] {
        [
            ColumnKey::competitor(Slot::A, base),
            ColumnKey::competitor(Slot::B, base),
        ]
    }

    /// Slot variants for every base name, slot A first
    pub fn per_slot(bases: &[&str]) -> Vec<ColumnKey> {
        Slot::BOTH
            .iter()
            .flat_map(|slot| bases.iter().map(move |base| ColumnKey::competitor(*slot, base)))
            .collect()
    }

    /// Flat column name, e.g. `fighter_b_win_rate_last_5`
    pub fn name(&self) -> String {
        match self {
            ColumnKey::Competitor(slot, base) => format!("{}{}", slot.prefix(), base),
            ColumnKey::Shared(name) => name.clone(),
        }
    }

    /// Recover the structured key from a flat column name
    pub fn parse(name: &str) -> Self {
        for slot in Slot::BOTH {
            if let Some(base) = name.strip_prefix(slot.prefix()) {
                return ColumnKey::Competitor(slot, base.to_string());
            }
        }
        ColumnKey::Shared(name.to_string())
    }

    pub fn slot(&self) -> Option<Slot> {
        match self {
            ColumnKey::Competitor(slot, _) => Some(*slot),
            ColumnKey::Shared(_) => None,
        }
    }

    /// Name without the slot prefix
    pub fn base(&self) -> &str {
        match self {
            ColumnKey::Competitor(_, base) => base,
            ColumnKey::Shared(name) => name,
        }
    }

    /// The same column seen from another slot; shared columns are unchanged
    pub fn in_slot(&self, slot: Slot) -> Self {
        match self {
            ColumnKey::Competitor(_, base) => ColumnKey::Competitor(slot, base.clone()),
            ColumnKey::Shared(name) => ColumnKey::Shared(name.clone()),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
