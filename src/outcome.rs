/// What a fetch did to the visible result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The response was applied; `added` new items became visible.
    Applied { added: usize },
    /// A newer request superseded this one; the response was dropped.
    Stale,
    /// Nothing more to load.
    Exhausted,
    /// The query was too short (or cleared), so search state was reset.
    Cleared,
}

impl PageOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
