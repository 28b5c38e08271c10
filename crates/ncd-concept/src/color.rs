//! Colour/icon heuristic used when a concept or code lookup carries no
//! explicit `color`/`icon` hint. Keyed by context, not scattered magic
//! strings at call sites.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicContext {
    VisitStatus,
    Gender,
    VitalStatus,
    Severity,
}

/// Best-effort colour for a label within a context. Returns `None` when no
/// rule matches, signalling the caller should use its own default.
pub fn color_for(context: HeuristicContext, label: &str) -> Option<&'static str> {
    let label = label.to_lowercase();
    let table: &[(&str, &str)] = match context {
        HeuristicContext::VisitStatus => &[
            ("active", "green"),
            ("inactive", "grey"),
            ("discharged", "blue"),
            ("admitted", "orange"),
        ],
        HeuristicContext::Gender => &[("male", "blue"), ("female", "pink"), ("other", "purple")],
        HeuristicContext::VitalStatus => &[("alive", "green"), ("deceased", "black")],
        HeuristicContext::Severity => &[
            ("mild", "yellow"),
            ("moderate", "orange"),
            ("severe", "red"),
            ("critical", "darkred"),
        ],
    };
    table.iter().find(|(key, _)| label.contains(key)).map(|(_, color)| *color)
}
