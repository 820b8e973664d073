//! Phases and entity kinds

use std::fmt;

/// One of the four lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    Read,
    Update,
    Delete,
}

impl Phase {
    /// Execution order within a test set
    pub const ALL: [Phase; 4] = [Phase::Create, Phase::Read, Phase::Update, Phase::Delete];

    /// Character that selects this phase in a `Test` string
    pub fn letter(self) -> char {
        match self {
            Phase::Create => 'C',
            Phase::Read => 'R',
            Phase::Update => 'U',
            Phase::Delete => 'D',
        }
    }

    /// Whether a `Test` string selects this phase
    ///
    /// Membership only: case and position don't matter beyond the exact
    /// upper-case letter being present.
    pub fn is_selected(self, test: &str) -> bool {
        test.contains(self.letter())
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Create => "Create",
            Phase::Read => "Read",
            Phase::Update => "Update",
            Phase::Delete => "Delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The nine kinds of remote entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Group,
    Application,
    Project,
    Role,
    User,
    Query,
    Preset,
    Scan,
    Result,
}

impl EntityKind {
    /// Order in which kinds run within every phase
    ///
    /// Kinds that others reference by name come first.
    pub const ORDER: [EntityKind; 9] = [
        EntityKind::Group,
        EntityKind::Application,
        EntityKind::Project,
        EntityKind::Role,
        EntityKind::User,
        EntityKind::Query,
        EntityKind::Preset,
        EntityKind::Scan,
        EntityKind::Result,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Group => "Group",
            EntityKind::Application => "Application",
            EntityKind::Project => "Project",
            EntityKind::Role => "Role",
            EntityKind::User => "User",
            EntityKind::Query => "Query",
            EntityKind::Preset => "Preset",
            EntityKind::Scan => "Scan",
            EntityKind::Result => "Result",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label used in log lines and the summary, e.g. `Create User`
pub fn label(phase: Phase, kind: EntityKind) -> String {
    format!("{} {}", phase, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_membership() {
        assert!(Phase::Create.is_selected("CRUD"));
        assert!(Phase::Delete.is_selected("DC"));
        assert!(Phase::Read.is_selected("xRx"));
        assert!(!Phase::Update.is_selected("CRD"));
        assert!(!Phase::Update.is_selected(""));
    }

    #[test]
    fn test_selection_is_case_sensitive() {
        for phase in Phase::ALL {
            assert!(!phase.is_selected("crud"));
        }
    }

    #[test]
    fn test_kind_order_puts_referenced_kinds_first() {
        let position = |kind| EntityKind::ORDER.iter().position(|k| *k == kind).unwrap();
        assert!(position(EntityKind::Group) < position(EntityKind::User));
        assert!(position(EntityKind::Role) < position(EntityKind::User));
        assert!(position(EntityKind::Application) < position(EntityKind::Project));
        assert!(position(EntityKind::Preset) < position(EntityKind::Scan));
        assert!(position(EntityKind::Scan) < position(EntityKind::Result));
    }

    #[test]
    fn test_label() {
        assert_eq!(label(Phase::Update, EntityKind::Preset), "Update Preset");
    }
}
