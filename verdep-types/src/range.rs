//! Semver range algebra.
//!
//! A [`SemverRange`] is a disjunction of intervals over semver precedence.
//! Ranges parse from the usual requirement syntax (`^`, `~`, comparators,
//! `,` for conjunction, `||` for alternatives, trailing wildcards) and
//! support the intersection the solver needs when composing constraints
//! from multiple dependers.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    str::FromStr,
};

use semver::Version as SemverVersion;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A set of admissible semantic versions.
///
/// Ranges are kept normalized: intervals are non-empty, sorted by their
/// lower bound and merged when they overlap or touch. An empty range admits
/// nothing; parsing cannot produce one directly, but intersection can.
///
/// ## Examples
/// ```
/// use semver::Version;
/// use verdep_types::SemverRange;
///
/// let range: SemverRange = "^1.2.0".parse().unwrap();
/// assert!(range.admits(&Version::parse("1.9.3").unwrap()));
/// assert!(!range.admits(&Version::parse("2.0.0").unwrap()));
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct SemverRange {
    intervals: Vec<Interval>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
struct Interval {
    min: Bound,
    max: Bound,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
enum Bound {
    Unbounded,
    Inclusive(SemverVersion),
    Exclusive(SemverVersion),
}

impl SemverRange {
    /// Returns the range admitting every version.
    pub fn any() -> Self {
        Self {
            intervals: vec![Interval {
                min: Bound::Unbounded,
                max: Bound::Unbounded,
            }],
        }
    }

    /// Returns the range admitting exactly one version.
    pub fn exact(version: SemverVersion) -> Self {
        Self {
            intervals: vec![Interval {
                min: Bound::Inclusive(version.clone()),
                max: Bound::Inclusive(version),
            }],
        }
    }

    /// Parses a range expression.
    ///
    /// Alternatives are separated by `||`, comparators within an
    /// alternative by `,`. Each comparator is one of `^v`, `~v`, `>=v`,
    /// `>v`, `<=v`, `<v`, `=v`, a bare version (exact), a partial version
    /// or trailing-wildcard form (`1`, `1.2`, `1.x`, `1.2.*`, admitting the
    /// implied interval), or `*`.
    ///
    /// # Errors
    ///
    /// Returns an error if any comparator is malformed.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRange(input.to_string()));
        }
        let mut intervals = Vec::new();
        for alternative in trimmed.split("||") {
            intervals.push(parse_interval(alternative.trim(), input)?);
        }
        Ok(Self::from_intervals(intervals))
    }

    /// Returns whether this range admits no version at all.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns whether `version` is admissible.
    ///
    /// Pre-release versions are only admitted by intervals that carry a
    /// pre-release bound with the same major, minor and patch numbers, so a
    /// plain `>=1.0.0` never admits a pre-release.
    pub fn admits(&self, version: &SemverVersion) -> bool {
        self.intervals
            .iter()
            .any(|interval| interval.admits(version))
    }

    /// Intersects two ranges.
    ///
    /// The result may be empty. Intersection is commutative and
    /// associative.
    pub fn intersect(&self, other: &SemverRange) -> SemverRange {
        let mut intervals = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                let min = pick_tighter_min(&a.min, &b.min).clone();
                let max = pick_tighter_max(&a.max, &b.max).clone();
                intervals.push(Interval { min, max });
            }
        }
        Self::from_intervals(intervals)
    }

    /// Builds a normalized range from raw intervals.
    fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.retain(|interval| !interval.is_empty());
        intervals.sort_by(|a, b| {
            lower_cmp(&a.min, &b.min).then_with(|| upper_cmp(&a.max, &b.max))
        });
        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if last.joins(&interval) => {
                    if upper_cmp(&interval.max, &last.max) == Ordering::Greater {
                        last.max = interval.max;
                    }
                }
                _ => merged.push(interval),
            }
        }
        Self { intervals: merged }
    }
}

impl FromStr for SemverRange {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl Display for SemverRange {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        if self.intervals.is_empty() {
            return write!(fmt, "none");
        }
        for (index, interval) in self.intervals.iter().enumerate() {
            if index > 0 {
                write!(fmt, " || ")?;
            }
            write!(fmt, "{interval}")?;
        }
        Ok(())
    }
}

impl Interval {
    fn is_empty(&self) -> bool {
        match (&self.min, &self.max) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (
                Bound::Inclusive(low) | Bound::Exclusive(low),
                Bound::Inclusive(high) | Bound::Exclusive(high),
            ) => match low.cmp(high) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => !matches!(
                    (&self.min, &self.max),
                    (Bound::Inclusive(_), Bound::Inclusive(_))
                ),
            },
        }
    }

    fn admits(&self, version: &SemverVersion) -> bool {
        let above_min = match &self.min {
            Bound::Unbounded => true,
            Bound::Inclusive(low) => version >= low,
            Bound::Exclusive(low) => version > low,
        };
        let below_max = match &self.max {
            Bound::Unbounded => true,
            Bound::Inclusive(high) => version <= high,
            Bound::Exclusive(high) => version < high,
        };
        if !above_min || !below_max {
            return false;
        }
        if version.pre.is_empty() {
            return true;
        }
        self.mentions_prerelease_family(version)
    }

    /// Returns whether a bound names a pre-release of the same
    /// major.minor.patch family as `version`.
    fn mentions_prerelease_family(&self, version: &SemverVersion) -> bool {
        [&self.min, &self.max].into_iter().any(|bound| match bound {
            Bound::Unbounded => false,
            Bound::Inclusive(bound) | Bound::Exclusive(bound) => {
                !bound.pre.is_empty()
                    && bound.major == version.major
                    && bound.minor == version.minor
                    && bound.patch == version.patch
            }
        })
    }

    /// Returns whether `other` overlaps or touches this interval, assuming
    /// `other` does not start below it.
    fn joins(&self, other: &Interval) -> bool {
        match (&self.max, &other.min) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
            (
                Bound::Inclusive(high) | Bound::Exclusive(high),
                Bound::Inclusive(low) | Bound::Exclusive(low),
            ) => match low.cmp(high) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => matches!(
                    (&self.max, &other.min),
                    (Bound::Inclusive(_), _) | (_, Bound::Inclusive(_))
                ),
            },
        }
    }
}

impl Display for Interval {
    fn fmt(&self, fmt: &mut Formatter) -> std::fmt::Result {
        match (&self.min, &self.max) {
            (Bound::Unbounded, Bound::Unbounded) => write!(fmt, "*"),
            (Bound::Inclusive(low), Bound::Inclusive(high)) if low == high => {
                write!(fmt, "{low}")
            }
            (min, max) => {
                let mut wrote = false;
                match min {
                    Bound::Unbounded => {}
                    Bound::Inclusive(low) => {
                        write!(fmt, ">={low}")?;
                        wrote = true;
                    }
                    Bound::Exclusive(low) => {
                        write!(fmt, ">{low}")?;
                        wrote = true;
                    }
                }
                match max {
                    Bound::Unbounded => {}
                    Bound::Inclusive(high) => {
                        if wrote {
                            write!(fmt, ", ")?;
                        }
                        write!(fmt, "<={high}")?;
                    }
                    Bound::Exclusive(high) => {
                        if wrote {
                            write!(fmt, ", ")?;
                        }
                        write!(fmt, "<{high}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Lower-bound order; an unbounded minimum admits the most.
fn lower_cmp(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (
            Bound::Inclusive(low) | Bound::Exclusive(low),
            Bound::Inclusive(high) | Bound::Exclusive(high),
        ) => low.cmp(high).then_with(|| match (a, b) {
            (Bound::Inclusive(_), Bound::Exclusive(_)) => Ordering::Less,
            (Bound::Exclusive(_), Bound::Inclusive(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
    }
}

/// Upper-bound order; an unbounded maximum admits the most.
fn upper_cmp(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (
            Bound::Inclusive(low) | Bound::Exclusive(low),
            Bound::Inclusive(high) | Bound::Exclusive(high),
        ) => low.cmp(high).then_with(|| match (a, b) {
            (Bound::Exclusive(_), Bound::Inclusive(_)) => Ordering::Less,
            (Bound::Inclusive(_), Bound::Exclusive(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
    }
}

fn pick_tighter_min<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    if lower_cmp(a, b) == Ordering::Less { b } else { a }
}

fn pick_tighter_max<'a>(a: &'a Bound, b: &'a Bound) -> &'a Bound {
    if upper_cmp(a, b) == Ordering::Greater { b } else { a }
}

/// A version token with the precision it was written at.
struct VersionToken {
    version: SemverVersion,
    minor_given: bool,
    patch_given: bool,
}

fn tighten_min(candidate: Bound, min: &mut Bound) {
    if lower_cmp(min, &candidate) == Ordering::Less {
        *min = candidate;
    }
}

fn tighten_max(candidate: Bound, max: &mut Bound) {
    if upper_cmp(max, &candidate) == Ordering::Greater {
        *max = candidate;
    }
}

fn parse_interval(alternative: &str, whole: &str) -> Result<Interval, Error> {
    let mut min = Bound::Unbounded;
    let mut max = Bound::Unbounded;
    let mut saw_comparator = false;
    for part in alternative.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Error::InvalidRange(whole.to_string()));
        }
        saw_comparator = true;
        if part == "*" || part == "any" {
            continue;
        }
        if let Some(rest) = part.strip_prefix(">=") {
            let token = parse_version_token(rest, whole)?;
            tighten_min(Bound::Inclusive(token.version), &mut min);
        } else if let Some(rest) = part.strip_prefix('>') {
            let token = parse_version_token(rest, whole)?;
            tighten_min(Bound::Exclusive(token.version), &mut min);
        } else if let Some(rest) = part.strip_prefix("<=") {
            let token = parse_version_token(rest, whole)?;
            tighten_max(Bound::Inclusive(token.version), &mut max);
        } else if let Some(rest) = part.strip_prefix('<') {
            let token = parse_version_token(rest, whole)?;
            tighten_max(Bound::Exclusive(token.version), &mut max);
        } else if let Some(rest) = part.strip_prefix('^') {
            let token = parse_version_token(rest, whole)?;
            let upper = caret_upper(&token);
            tighten_min(Bound::Inclusive(token.version), &mut min);
            tighten_max(Bound::Exclusive(upper), &mut max);
        } else if let Some(rest) = part.strip_prefix('~') {
            let token = parse_version_token(rest, whole)?;
            let upper = tilde_upper(&token);
            tighten_min(Bound::Inclusive(token.version), &mut min);
            tighten_max(Bound::Exclusive(upper), &mut max);
        } else {
            let rest = part.strip_prefix('=').unwrap_or(part);
            let token = parse_version_token(rest, whole)?;
            if token.patch_given {
                tighten_min(Bound::Inclusive(token.version.clone()), &mut min);
                tighten_max(Bound::Inclusive(token.version), &mut max);
            } else {
                // A partial or wildcard version admits its implied interval.
                let upper = wildcard_upper(&token);
                tighten_min(Bound::Inclusive(token.version), &mut min);
                tighten_max(Bound::Exclusive(upper), &mut max);
            }
        }
    }
    if !saw_comparator {
        return Err(Error::InvalidRange(whole.to_string()));
    }
    Ok(Interval { min, max })
}

fn caret_upper(token: &VersionToken) -> SemverVersion {
    let v = &token.version;
    if v.major > 0 || !token.minor_given {
        SemverVersion::new(v.major + 1, 0, 0)
    } else if v.minor > 0 || !token.patch_given {
        SemverVersion::new(0, v.minor + 1, 0)
    } else {
        SemverVersion::new(0, 0, v.patch + 1)
    }
}

fn tilde_upper(token: &VersionToken) -> SemverVersion {
    let v = &token.version;
    if token.minor_given {
        SemverVersion::new(v.major, v.minor + 1, 0)
    } else {
        SemverVersion::new(v.major + 1, 0, 0)
    }
}

fn wildcard_upper(token: &VersionToken) -> SemverVersion {
    let v = &token.version;
    if token.minor_given {
        SemverVersion::new(v.major, v.minor + 1, 0)
    } else {
        SemverVersion::new(v.major + 1, 0, 0)
    }
}

fn parse_version_token(input: &str, whole: &str) -> Result<VersionToken, Error> {
    let input = input.trim();
    let input = input.strip_prefix('v').unwrap_or(input);
    if input.is_empty() {
        return Err(Error::InvalidRange(whole.to_string()));
    }

    // Anything carrying pre-release or build metadata must be a full
    // version.
    if input.contains('-') || input.contains('+') {
        let version = SemverVersion::parse(input)
            .map_err(|_| Error::InvalidRange(whole.to_string()))?;
        return Ok(VersionToken {
            version,
            minor_given: true,
            patch_given: true,
        });
    }

    let mut numbers = [0_u64; 3];
    let mut given = [false; 3];
    for (index, component) in input.split('.').enumerate() {
        if index > 2 {
            return Err(Error::InvalidRange(whole.to_string()));
        }
        if matches!(component, "x" | "X" | "*") {
            break;
        }
        numbers[index] = component
            .parse()
            .map_err(|_| Error::InvalidRange(whole.to_string()))?;
        given[index] = true;
    }
    if !given[0] {
        return Err(Error::InvalidRange(whole.to_string()));
    }
    let version = SemverVersion::new(numbers[0], numbers[1], numbers[2]);
    Ok(VersionToken {
        version,
        minor_given: given[1],
        patch_given: given[2],
    })
}
