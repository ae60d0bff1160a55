//! Compiler profiles and the selection of profiles per contract source

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    path::Path,
    str::FromStr,
};

use glob::Pattern;

use crate::errors::ConfigError;

/// A `major.minor.patch` compiler version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompilerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CompilerVersion {
    /// Version from its three components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        CompilerVersion {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for CompilerVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDeclaration(format!("invalid compiler version {s:?}"));

        let parts = s
            .split('.')
            .map(|part| {
                // Reject signs and empty segments, which `u32::from_str` would let through
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u32>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [major, minor, patch] => Ok(CompilerVersion::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

impl Display for CompilerVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Comparison operator of a single range clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Caret,
    Tilde,
}

/// A pragma-like version range such as `>=0.8.19 <0.8.20` or `^0.8.0`.
/// Clauses separated by whitespace must all hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    clauses: Vec<(RangeOp, CompilerVersion)>,
}

impl VersionRange {
    /// Whether `version` satisfies every clause
    pub fn matches(&self, version: &CompilerVersion) -> bool {
        self.clauses.iter().all(|(op, bound)| {
            let ord = version.cmp(bound);
            match op {
                RangeOp::Exact => ord == Ordering::Equal,
                RangeOp::Greater => ord == Ordering::Greater,
                RangeOp::GreaterEq => ord != Ordering::Less,
                RangeOp::Less => ord == Ordering::Less,
                RangeOp::LessEq => ord != Ordering::Greater,
                RangeOp::Caret => ord != Ordering::Less && below(version, caret_upper(bound)),
                RangeOp::Tilde => {
                    let upper = bound
                        .minor
                        .checked_add(1)
                        .map(|minor| CompilerVersion::new(bound.major, minor, 0));
                    ord != Ordering::Less && below(version, upper)
                }
            }
        })
    }
}

/// Exclusive upper bound of `^bound`: the left-most non zero component is bumped.
/// `None` when the bump overflows, the range is then unbounded above.
fn caret_upper(bound: &CompilerVersion) -> Option<CompilerVersion> {
    match (bound.major, bound.minor) {
        (0, 0) => Some(CompilerVersion::new(0, 0, bound.patch.checked_add(1)?)),
        (0, minor) => Some(CompilerVersion::new(0, minor.checked_add(1)?, 0)),
        (major, _) => Some(CompilerVersion::new(major.checked_add(1)?, 0, 0)),
    }
}

fn below(version: &CompilerVersion, upper: Option<CompilerVersion>) -> bool {
    upper.map_or(true, |upper| *version < upper)
}

impl FromStr for VersionRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clauses = s
            .split_whitespace()
            .map(|clause| {
                // Longest operators first
                let (op, rest) = [
                    (">=", RangeOp::GreaterEq),
                    ("<=", RangeOp::LessEq),
                    (">", RangeOp::Greater),
                    ("<", RangeOp::Less),
                    ("=", RangeOp::Exact),
                    ("^", RangeOp::Caret),
                    ("~", RangeOp::Tilde),
                ]
                .iter()
                .find_map(|(prefix, op)| clause.strip_prefix(prefix).map(|rest| (*op, rest)))
                .unwrap_or((RangeOp::Exact, clause));
                Ok((op, rest.parse::<CompilerVersion>()?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        if clauses.is_empty() {
            return Err(ConfigError::InvalidDeclaration(String::from(
                "empty version range",
            )));
        }
        Ok(VersionRange { clauses })
    }
}

/// Optimizer settings of a compiler profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

/// A compiler version with its optimizer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerProfile {
    pub version: CompilerVersion,
    pub optimizer: OptimizerSettings,
}

impl CompilerProfile {
    /// Build a profile, rejecting an enabled optimizer with zero runs
    pub fn new(version: CompilerVersion, enabled: bool, runs: u32) -> Result<Self, ConfigError> {
        if enabled && runs == 0 {
            return Err(ConfigError::InvalidDeclaration(format!(
                "compiler {version}: optimizer runs must be positive when enabled"
            )));
        }
        Ok(CompilerProfile {
            version,
            optimizer: OptimizerSettings { enabled, runs },
        })
    }
}

/// Narrows the profiles used for sources matching a glob pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSelector {
    pub pattern: Pattern,
    pub range: VersionRange,
}

impl ProfileSelector {
    /// Parse the glob `pattern` and the version `range`
    pub fn new(pattern: &str, range: &str) -> Result<Self, ConfigError> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            ConfigError::InvalidDeclaration(format!("invalid source pattern {pattern:?}: {e}"))
        })?;
        Ok(ProfileSelector {
            pattern,
            range: range.parse()?,
        })
    }

    fn applies_to(&self, source: &Path) -> bool {
        self.pattern.matches_path(source)
    }
}

/// Ordered compiler profiles plus the selectors narrowing them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTable {
    profiles: Vec<CompilerProfile>,
    selectors: Vec<ProfileSelector>,
}

impl ProfileTable {
    /// Build the table. There must be at least one profile and no version twice.
    pub fn new(
        profiles: Vec<CompilerProfile>,
        selectors: Vec<ProfileSelector>,
    ) -> Result<Self, ConfigError> {
        if profiles.is_empty() {
            return Err(ConfigError::InvalidDeclaration(String::from(
                "at least one compiler profile is required",
            )));
        }
        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.version == profile.version) {
                return Err(ConfigError::InvalidDeclaration(format!(
                    "compiler version {} declared twice",
                    profile.version
                )));
            }
        }
        Ok(ProfileTable {
            profiles,
            selectors,
        })
    }

    /// Profiles in declaration order
    pub fn profiles(&self) -> &[CompilerProfile] {
        &self.profiles
    }

    /// Selectors in declaration order
    pub fn selectors(&self) -> &[ProfileSelector] {
        &self.selectors
    }

    /// Profiles a source is compiled under, in declaration order.
    ///
    /// Without a matching selector the source gets every profile. Matching selectors keep
    /// the profiles inside any of their ranges; if none remains, the last declared
    /// profile wins. Never fails: a bad pairing is left for the compiler to report.
    pub fn resolve_profiles_for_source(&self, source: impl AsRef<Path>) -> Vec<CompilerProfile> {
        let source = source.as_ref();
        let matching: Vec<&ProfileSelector> = self
            .selectors
            .iter()
            .filter(|selector| selector.applies_to(source))
            .collect();

        if matching.is_empty() {
            return self.profiles.clone();
        }

        let selected: Vec<CompilerProfile> = self
            .profiles
            .iter()
            .filter(|p| matching.iter().any(|s| s.range.matches(&p.version)))
            .cloned()
            .collect();

        if selected.is_empty() {
            // `new` guarantees at least one profile
            return self.profiles.last().cloned().into_iter().collect();
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> CompilerVersion {
        s.parse().unwrap()
    }

    fn table(selectors: Vec<ProfileSelector>) -> ProfileTable {
        ProfileTable::new(
            vec![
                CompilerProfile::new(v("0.8.19"), true, 200).unwrap(),
                CompilerProfile::new(v("0.8.20"), true, 200).unwrap(),
            ],
            selectors,
        )
        .unwrap()
    }

    fn versions(profiles: &[CompilerProfile]) -> Vec<String> {
        profiles.iter().map(|p| p.version.to_string()).collect()
    }

    #[test]
    fn ranges_at_the_top_of_u32_have_no_upper_bound() {
        let top = CompilerVersion::new(0, 0, u32::MAX);
        let caret: VersionRange = "^0.0.4294967295".parse().unwrap();
        assert!(caret.matches(&top));
        assert!(!caret.matches(&CompilerVersion::new(0, 0, u32::MAX - 1)));

        let tilde: VersionRange = "~1.4294967295.0".parse().unwrap();
        assert!(tilde.matches(&CompilerVersion::new(1, u32::MAX, 7)));
        assert!(!tilde.matches(&CompilerVersion::new(1, 0, 0)));

        let table = ProfileTable::new(
            vec![CompilerProfile::new(top, false, 0).unwrap()],
            vec![ProfileSelector::new("**/*.sol", "^0.0.4294967295").unwrap()],
        )
        .unwrap();
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/Token.sol")),
            ["0.0.4294967295"]
        );
    }

    #[test]
    fn parses_versions_strictly() {
        assert_eq!(v("0.8.19"), CompilerVersion::new(0, 8, 19));
        for bad in ["0.8", "0.8.19.1", "v0.8.19", "0.8.+1", "", "0..1"] {
            assert!(bad.parse::<CompilerVersion>().is_err(), "{bad}");
        }
    }

    #[test]
    fn range_clauses_all_apply() {
        let range: VersionRange = ">=0.8.19 <0.8.20".parse().unwrap();
        assert!(range.matches(&v("0.8.19")));
        assert!(!range.matches(&v("0.8.20")));
        assert!(!range.matches(&v("0.8.18")));
    }

    #[test]
    fn caret_and_tilde_ranges() {
        let caret: VersionRange = "^0.8.0".parse().unwrap();
        assert!(caret.matches(&v("0.8.20")));
        assert!(!caret.matches(&v("0.9.0")));

        let caret_major: VersionRange = "^1.2.0".parse().unwrap();
        assert!(caret_major.matches(&v("1.9.9")));
        assert!(!caret_major.matches(&v("2.0.0")));

        let tilde: VersionRange = "~0.8.19".parse().unwrap();
        assert!(tilde.matches(&v("0.8.25")));
        assert!(!tilde.matches(&v("0.8.18")));

        let exact: VersionRange = "0.8.20".parse().unwrap();
        assert!(exact.matches(&v("0.8.20")));
        assert!(!exact.matches(&v("0.8.19")));
    }

    #[test]
    fn enabled_optimizer_needs_runs() {
        assert!(CompilerProfile::new(v("0.8.19"), true, 0).is_err());
        assert!(CompilerProfile::new(v("0.8.19"), false, 0).is_ok());
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let p = CompilerProfile::new(v("0.8.19"), true, 200).unwrap();
        assert!(ProfileTable::new(vec![p.clone(), p], vec![]).is_err());
        assert!(ProfileTable::new(vec![], vec![]).is_err());
    }

    #[test]
    fn unselected_source_gets_every_profile() {
        let table = table(vec![]);
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/Token.sol")),
            ["0.8.19", "0.8.20"]
        );
    }

    #[test]
    fn selector_narrows_matching_sources() {
        let table = table(vec![ProfileSelector::new("contracts/legacy/*.sol", "<0.8.20").unwrap()]);
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/legacy/Old.sol")),
            ["0.8.19"]
        );
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/Token.sol")),
            ["0.8.19", "0.8.20"]
        );
    }

    #[test]
    fn overlapping_selectors_keep_both_profiles() {
        let table = table(vec![
            ProfileSelector::new("contracts/**/*.sol", "0.8.19").unwrap(),
            ProfileSelector::new("contracts/dual/*.sol", "^0.8.20").unwrap(),
        ]);
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/dual/Bridge.sol")),
            ["0.8.19", "0.8.20"]
        );
    }

    #[test]
    fn unmatched_range_falls_back_to_last_profile() {
        let table = table(vec![ProfileSelector::new("contracts/*.sol", "^0.7.0").unwrap()]);
        assert_eq!(
            versions(&table.resolve_profiles_for_source("contracts/Token.sol")),
            ["0.8.20"]
        );
    }
}
