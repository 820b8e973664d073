//! Diff-based membership reconciliation
//!
//! Compares the names a declaration asks for with the memberships the
//! remote currently holds. Additions are names, resolved by the caller;
//! removals are the remote objects themselves, which already carry IDs.

/// Changes needed to make remote memberships match a declaration
#[derive(Debug, PartialEq, Eq)]
pub struct MembershipDiff<'a, T> {
    /// Declared names missing remotely, in declaration order, deduplicated
    pub additions: Vec<&'a str>,
    /// Remote memberships the declaration doesn't name
    pub removals: Vec<&'a T>,
}

impl<T> MembershipDiff<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Compute the additions and removals between desired names and current
/// memberships
pub fn diff<'a, T, F>(desired: &'a [String], current: &'a [T], name_of: F) -> MembershipDiff<'a, T>
where
    F: Fn(&T) -> &str,
{
    let mut additions: Vec<&str> = Vec::new();
    for name in desired {
        let held = current.iter().any(|item| name_of(item) == name);
        if !held && !additions.contains(&name.as_str()) {
            additions.push(name);
        }
    }

    let removals = current
        .iter()
        .filter(|item| !desired.iter().any(|name| name == name_of(item)))
        .collect();

    MembershipDiff {
        additions,
        removals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Member {
        id: u32,
        name: &'static str,
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_additions_and_removals() {
        let current = vec![
            Member { id: 1, name: "keep" },
            Member { id: 2, name: "drop" },
        ];
        let desired = names(&["keep", "new"]);

        let diff = diff(&desired, &current, |m| m.name);
        assert_eq!(diff.additions, vec!["new"]);
        assert_eq!(diff.removals, vec![&current[1]]);
    }

    #[test]
    fn test_matching_state_is_empty() {
        let current = vec![Member { id: 1, name: "a" }, Member { id: 2, name: "b" }];
        let desired = names(&["b", "a"]);
        assert!(diff(&desired, &current, |m| m.name).is_empty());
    }

    #[test]
    fn test_empty_declaration_removes_everything() {
        let current = vec![Member { id: 7, name: "a" }];
        let diff = diff(&[], &current, |m| m.name);
        assert!(diff.additions.is_empty());
        assert_eq!(diff.removals.len(), 1);
    }

    #[test]
    fn test_duplicate_names_are_added_once() {
        let current: Vec<Member> = Vec::new();
        let desired = names(&["g", "g"]);
        assert_eq!(diff(&desired, &current, |m| m.name).additions, vec!["g"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let current = vec![Member { id: 1, name: "Admin" }];
        let desired = names(&["admin"]);
        let diff = diff(&desired, &current, |m| m.name);
        assert_eq!(diff.additions, vec!["admin"]);
        assert_eq!(diff.removals.len(), 1);
    }
}
