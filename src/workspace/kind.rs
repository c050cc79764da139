//! The nine workspace kinds and the table that produces them.

use serde::{Deserialize, Serialize};

/// What sort of unit a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Project,
    Ecosystem,
    NonGrove,
}

/// What a unit sits inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// No enclosing ecosystem.
    Standalone,
    /// Inside an ecosystem, with no ecosystem worktree on the chain.
    Ecosystem,
    /// Inside an ecosystem worktree somewhere on the chain.
    EcosystemWorktree,
}

/// The classification of a workspace entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    StandaloneProject,
    StandaloneProjectWorktree,
    EcosystemRoot,
    EcosystemWorktree,
    EcosystemSubProject,
    EcosystemSubProjectWorktree,
    EcosystemWorktreeSubProject,
    EcosystemWorktreeSubProjectWorktree,
    NonGroveRepo,
}

impl Kind {
    /// Every kind, in declaration order.
    pub const ALL: [Kind; 9] = [
        Kind::StandaloneProject,
        Kind::StandaloneProjectWorktree,
        Kind::EcosystemRoot,
        Kind::EcosystemWorktree,
        Kind::EcosystemSubProject,
        Kind::EcosystemSubProjectWorktree,
        Kind::EcosystemWorktreeSubProject,
        Kind::EcosystemWorktreeSubProjectWorktree,
        Kind::NonGroveRepo,
    ];

    /// The decision table.
    ///
    /// A worktree of an ecosystem is an ecosystem worktree whatever it sits
    /// in. An ecosystem inside another one is that ecosystem's sub-project.
    /// Bare repositories ignore both axes.
    pub fn decide(unit: Unit, is_worktree: bool, context: Context) -> Kind {
        match (unit, is_worktree, context) {
            (Unit::NonGrove, _, _) => Kind::NonGroveRepo,

            (Unit::Ecosystem, true, _) => Kind::EcosystemWorktree,
            (Unit::Ecosystem, false, Context::Standalone) => Kind::EcosystemRoot,
            (Unit::Ecosystem, false, Context::Ecosystem) => Kind::EcosystemSubProject,
            (Unit::Ecosystem, false, Context::EcosystemWorktree) => {
                Kind::EcosystemWorktreeSubProject
            }

            (Unit::Project, false, Context::Standalone) => Kind::StandaloneProject,
            (Unit::Project, true, Context::Standalone) => Kind::StandaloneProjectWorktree,
            (Unit::Project, false, Context::Ecosystem) => Kind::EcosystemSubProject,
            (Unit::Project, true, Context::Ecosystem) => Kind::EcosystemSubProjectWorktree,
            (Unit::Project, false, Context::EcosystemWorktree) => Kind::EcosystemWorktreeSubProject,
            (Unit::Project, true, Context::EcosystemWorktree) => {
                Kind::EcosystemWorktreeSubProjectWorktree
            }
        }
    }

    /// Whether this kind is one of the four worktree variants.
    pub fn is_worktree(&self) -> bool {
        matches!(
            self,
            Self::StandaloneProjectWorktree
                | Self::EcosystemWorktree
                | Self::EcosystemSubProjectWorktree
                | Self::EcosystemWorktreeSubProjectWorktree
        )
    }

    /// Nesting depth implied by the kind alone.
    pub fn depth(&self) -> usize {
        match self {
            Self::StandaloneProject | Self::EcosystemRoot | Self::NonGroveRepo => 0,
            Self::StandaloneProjectWorktree
            | Self::EcosystemWorktree
            | Self::EcosystemSubProject => 1,
            Self::EcosystemSubProjectWorktree | Self::EcosystemWorktreeSubProject => 2,
            Self::EcosystemWorktreeSubProjectWorktree => 3,
        }
    }

    /// Whether the entity lives inside some ecosystem's reach.
    pub fn in_ecosystem(&self) -> bool {
        !matches!(
            self,
            Self::StandaloneProject | Self::StandaloneProjectWorktree | Self::NonGroveRepo
        )
    }

    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandaloneProject => "standalone_project",
            Self::StandaloneProjectWorktree => "standalone_project_worktree",
            Self::EcosystemRoot => "ecosystem_root",
            Self::EcosystemWorktree => "ecosystem_worktree",
            Self::EcosystemSubProject => "ecosystem_sub_project",
            Self::EcosystemSubProjectWorktree => "ecosystem_sub_project_worktree",
            Self::EcosystemWorktreeSubProject => "ecosystem_worktree_sub_project",
            Self::EcosystemWorktreeSubProjectWorktree => "ecosystem_worktree_sub_project_worktree",
            Self::NonGroveRepo => "non_grove_repo",
        }
    }

    /// Parse a kind from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_examples() {
        assert_eq!(
            Kind::decide(Unit::Ecosystem, false, Context::Standalone),
            Kind::EcosystemRoot
        );
        assert_eq!(
            Kind::decide(Unit::Ecosystem, true, Context::Ecosystem),
            Kind::EcosystemWorktree
        );
        assert_eq!(
            Kind::decide(Unit::Project, true, Context::EcosystemWorktree),
            Kind::EcosystemWorktreeSubProjectWorktree
        );
        assert_eq!(
            Kind::decide(Unit::NonGrove, true, Context::Ecosystem),
            Kind::NonGroveRepo
        );
    }

    #[test]
    fn test_every_kind_is_reachable() {
        let units = [Unit::Project, Unit::Ecosystem, Unit::NonGrove];
        let contexts = [Context::Standalone, Context::Ecosystem, Context::EcosystemWorktree];
        let mut seen: Vec<Kind> = units
            .iter()
            .flat_map(|u| {
                contexts
                    .iter()
                    .flat_map(move |c| [false, true].map(|w| Kind::decide(*u, w, *c)))
            })
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen, Kind::ALL.to_vec());
    }

    #[test]
    fn test_depths() {
        assert_eq!(Kind::EcosystemRoot.depth(), 0);
        assert_eq!(Kind::EcosystemWorktree.depth(), 1);
        assert_eq!(Kind::EcosystemWorktreeSubProject.depth(), 2);
        assert_eq!(Kind::EcosystemWorktreeSubProjectWorktree.depth(), 3);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Kind::parse("ecosystem_root"), Some(Kind::EcosystemRoot));
        assert_eq!(Kind::parse("bogus"), None);
        assert_eq!(Kind::NonGroveRepo.to_string(), "non_grove_repo");
        let json = serde_json::to_string(&Kind::EcosystemSubProjectWorktree).unwrap();
        assert_eq!(json, "\"ecosystem_sub_project_worktree\"");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_unit() -> impl Strategy<Value = Unit> {
            prop_oneof![
                Just(Unit::Project),
                Just(Unit::Ecosystem),
                Just(Unit::NonGrove),
            ]
        }

        fn arb_context() -> impl Strategy<Value = Context> {
            prop_oneof![
                Just(Context::Standalone),
                Just(Context::Ecosystem),
                Just(Context::EcosystemWorktree),
            ]
        }

        proptest! {
            // Property: the worktree axis survives the table (bare repos excepted)
            #[test]
            fn prop_worktree_axis_preserved(unit in arb_unit(), wt in any::<bool>(), ctx in arb_context()) {
                let kind = Kind::decide(unit, wt, ctx);
                prop_assert_eq!(kind.is_worktree(), wt && unit != Unit::NonGrove);
            }

            // Property: depth stays within 0..=3
            #[test]
            fn prop_depth_bounded(unit in arb_unit(), wt in any::<bool>(), ctx in arb_context()) {
                prop_assert!(Kind::decide(unit, wt, ctx).depth() <= 3);
            }

            // Property: a standalone context never yields an in-ecosystem kind,
            // except an ecosystem worktree
            #[test]
            fn prop_standalone_stays_standalone(unit in arb_unit(), wt in any::<bool>()) {
                let kind = Kind::decide(unit, wt, Context::Standalone);
                prop_assert!(
                    !kind.in_ecosystem()
                        || kind == Kind::EcosystemRoot
                        || kind == Kind::EcosystemWorktree
                );
            }

            // Property: worktrees are one level below their non-worktree sibling
            #[test]
            fn prop_worktree_adds_one_level(ctx in arb_context()) {
                let plain = Kind::decide(Unit::Project, false, ctx);
                let worktree = Kind::decide(Unit::Project, true, ctx);
                prop_assert_eq!(worktree.depth(), plain.depth() + 1);
            }
        }
    }
}
