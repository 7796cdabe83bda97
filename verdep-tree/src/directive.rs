//! Build-configuration directives.
//!
//! Source files can restrict the configurations they apply to with a
//! `//build: <expr>` comment line before the package clause. The expression
//! is boolean algebra over configuration tags: identifiers, `!`, `&&`,
//! `||` and parentheses. A file applies to a configuration when every one
//! of its directives evaluates to true under that configuration's tag set.

use std::collections::BTreeSet;

use winnow::{
    ModalResult,
    Parser,
    ascii::{multispace0, space0},
    combinator::{alt, cut_err, delimited, eof, preceded, separated_foldl1},
    error::{StrContext, StrContextValue},
    token::take_while,
};

/// The comment prefix introducing a build directive.
pub const DIRECTIVE_PREFIX: &str = "//build:";

/// A parsed build-directive expression.
///
/// ## Examples
/// ```
/// use std::collections::BTreeSet;
/// use verdep_tree::DirectiveExpr;
///
/// let expr: DirectiveExpr = "linux && !test".parse().unwrap();
/// let mut tags = BTreeSet::new();
/// assert!(!expr.evaluate(&tags));
/// tags.insert("linux".to_string());
/// assert!(expr.evaluate(&tags));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectiveExpr(Expr);

#[derive(Clone, Debug, Eq, PartialEq)]
enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl DirectiveExpr {
    /// Evaluates the expression under a set of active tags.
    pub fn evaluate(&self, tags: &BTreeSet<String>) -> bool {
        self.0.evaluate(tags)
    }
}

impl Expr {
    fn evaluate(&self, tags: &BTreeSet<String>) -> bool {
        match self {
            Self::Tag(tag) => tags.contains(tag),
            Self::Not(inner) => !inner.evaluate(tags),
            Self::And(left, right) => left.evaluate(tags) && right.evaluate(tags),
            Self::Or(left, right) => left.evaluate(tags) || right.evaluate(tags),
        }
    }
}

impl std::str::FromStr for DirectiveExpr {
    type Err = String;

    /// Parses a directive expression.
    ///
    /// # Errors
    ///
    /// Returns the rendered parse error if the expression is malformed.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut rest = input;
        let expr = (delimited(multispace0, or_expr, multispace0), eof)
            .parse_next(&mut rest)
            .map(|(expr, _)| expr)
            .map_err(|error| error.to_string())?;
        Ok(Self(expr))
    }
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    separated_foldl1(and_expr, (space0, "||", space0), |left, _, right| {
        Expr::Or(Box::new(left), Box::new(right))
    })
    .parse_next(input)
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    separated_foldl1(unary_expr, (space0, "&&", space0), |left, _, right| {
        Expr::And(Box::new(left), Box::new(right))
    })
    .parse_next(input)
}

fn unary_expr(input: &mut &str) -> ModalResult<Expr> {
    alt((
        preceded(('!', space0), unary_expr).map(|inner| Expr::Not(Box::new(inner))),
        delimited(('(', space0), or_expr, (space0, cut_err(')'))),
        tag_name,
    ))
    .parse_next(input)
}

fn tag_name(input: &mut &str) -> ModalResult<Expr> {
    cut_err(take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '.'
    }))
    .context(StrContext::Label("configuration tag"))
    .context(StrContext::Expected(StrContextValue::Description(
        "an identifier of alphanumeric characters, '_' or '.'",
    )))
    .map(|tag: &str| Expr::Tag(tag.to_string()))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case("linux", &["linux"], true)]
    #[case("linux", &[], false)]
    #[case("!ignore", &[], true)]
    #[case("!ignore", &["ignore"], false)]
    #[case("linux && amd64", &["linux", "amd64"], true)]
    #[case("linux && amd64", &["linux"], false)]
    #[case("linux || darwin", &["darwin"], true)]
    #[case("a && b || c", &["c"], true)]
    #[case("a && (b || c)", &["a", "c"], true)]
    #[case("a && (b || c)", &["c"], false)]
    #[case("!(a || b)", &[], true)]
    fn evaluation(#[case] input: &str, #[case] active: &[&str], #[case] expected: bool) {
        let expr: DirectiveExpr = input.parse().unwrap();
        assert_eq!(expr.evaluate(&tags(active)), expected);
    }

    #[rstest]
    #[case("")]
    #[case("&&")]
    #[case("a &&")]
    #[case("(a")]
    #[case("a b")]
    fn malformed(#[case] input: &str) {
        assert!(input.parse::<DirectiveExpr>().is_err());
    }
}
