//! Include/exclude filtering over `(type, property, value)` triples.
//!
//! A [`Selector`] scopes what gets scored. Patterns name a type, a type and
//! property, or a type, property and value; `"*"` matches anything at its
//! position. Patterns are normalized into sets at construction, so each
//! query is a handful of fixed set-membership tests.

use std::collections::HashSet;

/// One inclusion or exclusion pattern: 1 to 3 positions, each a literal or
/// the `"*"` wildcard.
pub type Pattern = Vec<String>;

/// Include/exclude filter with wildcard support.
///
/// With an `include` set configured, a query is accepted only if some
/// supplied granularity (type; type+property; type+property+value) matches
/// an include pattern. An `exclude` set is evaluated independently and
/// vetoes a query whose granularity matches, even one the include set
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    include: Option<HashSet<Pattern>>,
    exclude: Option<HashSet<Pattern>>,
}

impl Selector {
    /// A selector that accepts everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a selector from pattern lists. `None` means unconstrained.
    #[must_use]
    pub fn new(include: Option<Vec<Pattern>>, exclude: Option<Vec<Pattern>>) -> Self {
        Self {
            include: include.map(|patterns| patterns.into_iter().collect()),
            exclude: exclude.map(|patterns| patterns.into_iter().collect()),
        }
    }

    /// Build a selector from `type[:property[:value]]` expressions, the
    /// form used on the command line.
    ///
    /// Empty lists mean unconstrained.
    #[must_use]
    pub fn from_exprs(include: &[String], exclude: &[String]) -> Self {
        let parse = |exprs: &[String]| -> Option<Vec<Pattern>> {
            if exprs.is_empty() {
                None
            } else {
                Some(
                    exprs
                        .iter()
                        .map(|expr| expr.split(':').map(str::to_string).collect())
                        .collect(),
                )
            }
        };
        Self::new(parse(include), parse(exclude))
    }

    /// Decide whether a type (and optionally a property, and optionally a
    /// property value) is in scope.
    #[must_use]
    pub fn selects(&self, type_name: &str, property: Option<&str>, value: Option<&str>) -> bool {
        let mut granularities: Vec<Vec<Pattern>> = vec![expand(&[type_name])];
        if let Some(property) = property {
            granularities.push(expand(&[type_name, property]));
            if let Some(value) = value {
                granularities.push(expand(&[type_name, property, value]));
            }
        }

        if let Some(include) = &self.include {
            let any_included = granularities
                .iter()
                .any(|candidates| candidates.iter().any(|c| include.contains(c)));
            if !any_included {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            let any_excluded = granularities
                .iter()
                .any(|candidates| candidates.iter().any(|c| exclude.contains(c)));
            if any_excluded {
                return false;
            }
        }
        true
    }

    /// Shorthand for a type-only query.
    #[must_use]
    pub fn selects_type(&self, type_name: &str) -> bool {
        self.selects(type_name, None, None)
    }

    /// Shorthand for a type+property query.
    #[must_use]
    pub fn selects_property(&self, type_name: &str, property: &str) -> bool {
        self.selects(type_name, Some(property), None)
    }
}

/// All wildcard-substituted variants of a query tuple: each position is
/// either its literal or `"*"`.
fn expand(parts: &[&str]) -> Vec<Pattern> {
    let mut variants: Vec<Pattern> = vec![Vec::new()];
    for part in parts {
        let mut next = Vec::with_capacity(variants.len() * 2);
        for variant in &variants {
            let mut literal = variant.clone();
            literal.push((*part).to_string());
            next.push(literal);
            let mut wildcard = variant.clone();
            wildcard.push("*".to_string());
            next.push(wildcard);
        }
        variants = next;
    }
    variants
}
