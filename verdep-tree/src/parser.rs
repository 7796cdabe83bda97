//! The parser for source file headers.
//!
//! The analyzer only needs the header of a source file: its build
//! directives, the package clause (with an optional canonical import
//! comment) and the import declarations that follow it. Everything after
//! the import section is ignored.

use winnow::{
    ModalResult,
    Parser,
    ascii::{line_ending, space0, space1, till_line_ending},
    combinator::{alt, cut_err, delimited, eof, opt, preceded, repeat, terminated},
    error::{StrContext, StrContextValue},
    token::take_while,
};

use crate::directive::{DIRECTIVE_PREFIX, DirectiveExpr};

/// The parsed header of one source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedSource {
    /// Build directives found before the package clause.
    pub(crate) directives: Vec<DirectiveExpr>,
    /// The declared package name.
    pub(crate) package_name: String,
    /// The canonical import path from an import comment, if present.
    pub(crate) import_comment: Option<String>,
    /// Declared imports, in file order.
    pub(crate) imports: Vec<String>,
}

/// Parses a source file's header.
///
/// # Errors
///
/// Returns a rendered parse error if the header is malformed, including
/// when a build directive does not parse.
pub(crate) fn parse_source(input: &str) -> Result<ParsedSource, String> {
    let mut rest = input;
    let (raw_directives, (package_name, import_comment), imports) =
        (preamble, package_clause, import_section)
            .parse_next(&mut rest)
            .map_err(|error| error.to_string())?;

    let mut directives = Vec::with_capacity(raw_directives.len());
    for raw in raw_directives {
        directives.push(
            raw.parse::<DirectiveExpr>()
                .map_err(|error| format!("invalid build directive {raw:?}: {error}"))?,
        );
    }

    Ok(ParsedSource {
        directives,
        package_name,
        import_comment,
        imports,
    })
}

/// Recognizes a line ending or the end of input.
fn line_end(input: &mut &str) -> ModalResult<()> {
    alt((line_ending.void(), eof.void())).parse_next(input)
}

/// Recognizes one blank line.
fn blank_line(input: &mut &str) -> ModalResult<()> {
    (space0, line_ending).void().parse_next(input)
}

/// Recognizes one comment line that is not a build directive.
fn comment_line(input: &mut &str) -> ModalResult<()> {
    ("//", till_line_ending, line_end).void().parse_next(input)
}

/// Recognizes one build-directive line and returns the raw expression.
fn directive_line(input: &mut &str) -> ModalResult<String> {
    terminated(
        preceded((DIRECTIVE_PREFIX, space0), till_line_ending),
        line_end,
    )
    .map(|raw: &str| raw.trim_end().to_string())
    .parse_next(input)
}

/// Collects build directives from the lines before the package clause.
fn preamble(input: &mut &str) -> ModalResult<Vec<String>> {
    repeat(
        0..,
        alt((
            directive_line.map(Some),
            comment_line.map(|()| None),
            blank_line.map(|()| None),
        )),
    )
    .map(|lines: Vec<Option<String>>| lines.into_iter().flatten().collect())
    .parse_next(input)
}

/// Recognizes a package name.
fn package_name(input: &mut &str) -> ModalResult<String> {
    cut_err(take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'))
        .context(StrContext::Label("package name"))
        .context(StrContext::Expected(StrContextValue::Description(
            "an identifier of alphanumeric characters or '_'",
        )))
        .map(|name: &str| name.to_string())
        .parse_next(input)
}

/// Recognizes a quoted import path.
fn quoted_path<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited(
        '"',
        take_while(0.., |c| c != '"' && c != '\n' && c != '\r'),
        cut_err('"').context(StrContext::Expected(StrContextValue::CharLiteral('"'))),
    )
    .parse_next(input)
}

/// Recognizes the package clause with its optional import comment.
fn package_clause(input: &mut &str) -> ModalResult<(String, Option<String>)> {
    let name = preceded(("package", space1), package_name).parse_next(input)?;
    let comment = opt(preceded(
        (space0, "//", space0, "import", space1),
        quoted_path,
    ))
    .parse_next(input)?
    .map(ToString::to_string);
    cut_err((space0, line_end))
        .context(StrContext::Label("package clause"))
        .context(StrContext::Expected(StrContextValue::Description(
            "the end of the line after the package name",
        )))
        .parse_next(input)?;
    Ok((name, comment))
}

/// Recognizes a single-path import declaration.
fn import_single(input: &mut &str) -> ModalResult<String> {
    terminated(
        preceded(("import", space1), quoted_path),
        (space0, line_end),
    )
    .map(ToString::to_string)
    .parse_next(input)
}

/// Recognizes a parenthesized import block.
fn import_block(input: &mut &str) -> ModalResult<Vec<String>> {
    let items = preceded(
        ("import", space0, '('),
        repeat(
            0..,
            alt((
                terminated(preceded(space0, quoted_path), (space0, line_end))
                    .map(|path: &str| Some(path.to_string())),
                blank_line.map(|()| None),
                preceded(space0, comment_line).map(|()| None),
            )),
        ),
    )
    .map(|items: Vec<Option<String>>| items.into_iter().flatten().collect())
    .parse_next(input)?;
    cut_err((space0, ')', space0, line_end))
        .context(StrContext::Label("import block"))
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(items)
}

/// Collects every import declared after the package clause.
///
/// Parsing stops at the first line that is neither an import declaration,
/// a comment nor blank; the remainder of the file is irrelevant to the
/// analyzer.
fn import_section(input: &mut &str) -> ModalResult<Vec<String>> {
    repeat(
        0..,
        alt((
            import_block,
            import_single.map(|path| vec![path]),
            comment_line.map(|()| Vec::new()),
            blank_line.map(|()| Vec::new()),
        )),
    )
    .map(|groups: Vec<Vec<String>>| groups.into_iter().flatten().collect())
    .parse_next(input)
}
