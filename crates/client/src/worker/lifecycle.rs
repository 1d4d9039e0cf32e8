//! Worker lifecycle phases.

use serde::Serialize;

/// Lifecycle phase of one cache generation's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Constructed, install not yet attempted.
    Parsed,
    Installing,
    /// Installed and waiting to take over.
    Installed,
    Activating,
    /// Controlling pages and intercepting fetches.
    Activated,
    /// Failed to install, or replaced by a newer worker.
    Redundant,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parsed => "parsed",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
            Phase::Redundant => "redundant",
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Any phase may become redundant; otherwise phases only move forward
    /// one step at a time.
    pub fn can_advance_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Parsed, Phase::Installing)
                | (Phase::Installing, Phase::Installed)
                | (Phase::Installed, Phase::Activating)
                | (Phase::Activating, Phase::Activated)
                | (_, Phase::Redundant)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_steps() {
        assert!(Phase::Parsed.can_advance_to(Phase::Installing));
        assert!(Phase::Installing.can_advance_to(Phase::Installed));
        assert!(Phase::Installed.can_advance_to(Phase::Activating));
        assert!(Phase::Activating.can_advance_to(Phase::Activated));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!Phase::Parsed.can_advance_to(Phase::Activated));
        assert!(!Phase::Installing.can_advance_to(Phase::Activating));
        assert!(!Phase::Activated.can_advance_to(Phase::Installing));
        assert!(!Phase::Redundant.can_advance_to(Phase::Installed));
    }

    #[test]
    fn test_anything_can_become_redundant() {
        for phase in [Phase::Parsed, Phase::Installing, Phase::Installed, Phase::Activated] {
            assert!(phase.can_advance_to(Phase::Redundant));
        }
    }
}
