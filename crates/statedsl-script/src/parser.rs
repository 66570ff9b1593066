//! Parser for state scripts.
//!
//! The language is the small fluent-call subset used to declare states:
//!
//! ```text
//! include('base.users')
//! web = state('web').service.running(enable=True) \
//!          .watch(file='/etc/nginx.conf')
//! state('X').cmd('run', 'echo hello', cwd='/')   # call spelling
//! ```
//!
//! One statement per line (or separated by `;`). A trailing `\` continues a
//! line and newlines are insignificant inside brackets.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_a, is_not, tag, take_until},
    character::complete::{
        alpha1, alphanumeric1, char, digit1, line_ending, multispace1, not_line_ending,
    },
    combinator::{cut, eof, map, not, opt, recognize, value},
    error::{ErrorKind, ParseError, VerboseError, context, convert_error},
    multi::many0_count,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
};

use crate::ast::{CallArg, Expr, Literal, Program, Statement, StatementKind};
use crate::error::{Result, ScriptError};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parse a complete script.
pub fn parse_program(source: &str) -> Result<Program> {
    match program(source) {
        Ok((_, program)) => Ok(program),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
            let line = err
                .errors
                .first()
                .map_or(1, |(rest, _)| error_line(source, rest));
            Err(ScriptError::Parse {
                line,
                message: convert_error(source, err),
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(ScriptError::Parse {
            line: 1,
            message: "incomplete input".to_string(),
        }),
    }
}

fn line_of(source: &str, rest: &str) -> usize {
    let offset = source.len().saturating_sub(rest.len());
    source[..offset].matches('\n').count() + 1
}

/// Errors at the end of input belong to the last line with content.
fn error_line(source: &str, rest: &str) -> usize {
    if rest.trim().is_empty() {
        source.trim_end().matches('\n').count() + 1
    } else {
        line_of(source, rest)
    }
}

// Statements

fn program(source: &str) -> Res<'_, Program> {
    let mut statements = Vec::new();
    let mut input = source;
    loop {
        let (rest, _) = many0_count(alt((multispace1, comment, tag(";"), continuation)))(input)?;
        if rest.is_empty() {
            return Ok((rest, Program { statements }));
        }
        let line = line_of(source, rest);
        let (rest, kind) = context("statement", statement)(rest)?;
        let (rest, ()) = cut(context("end of statement", end_of_statement))(rest)?;
        statements.push(Statement { line, kind });
        input = rest;
    }
}

fn statement(input: &str) -> Res<'_, StatementKind> {
    alt((assignment, map(|i| expr(i, false), StatementKind::Expr)))(input)
}

fn assignment(input: &str) -> Res<'_, StatementKind> {
    let (input, target) = identifier(input)?;
    let (input, ()) = inline_ws(input)?;
    let (input, _) = char('=')(input)?;
    let (input, ()) = not(char('='))(input)?;
    let (input, ()) = inline_ws(input)?;
    let (input, value) = cut(context("expression", |i| expr(i, false)))(input)?;
    Ok((
        input,
        StatementKind::Assign {
            target: target.to_string(),
            value,
        },
    ))
}

fn end_of_statement(input: &str) -> Res<'_, ()> {
    let (input, ()) = inline_ws(input)?;
    let (input, _) = opt(comment)(input)?;
    value((), alt((line_ending, tag(";"), eof)))(input)
}

// Whitespace

fn comment(input: &str) -> Res<'_, &str> {
    preceded(char('#'), not_line_ending)(input)
}

fn continuation(input: &str) -> Res<'_, &str> {
    alt((tag("\\\r\n"), tag("\\\n")))(input)
}

/// Spaces, tabs and line continuations.
fn inline_ws(input: &str) -> Res<'_, ()> {
    value((), many0_count(alt((is_a(" \t"), continuation))))(input)
}

/// Any whitespace including newlines and comments (inside brackets).
fn bracket_ws(input: &str) -> Res<'_, ()> {
    value((), many0_count(alt((multispace1, comment, continuation))))(input)
}

fn skip(input: &str, multiline: bool) -> Res<'_, ()> {
    if multiline {
        bracket_ws(input)
    } else {
        inline_ws(input)
    }
}

// Expressions

enum Postfix {
    Attr(String),
    Call(Vec<CallArg>),
}

/// A primary followed by any number of `.name`, `(args)` and `["name"]`.
fn expr(input: &str, multiline: bool) -> Res<'_, Expr> {
    let (mut input, mut expr) = primary(input)?;
    loop {
        let (rest, ()) = skip(input, multiline)?;
        match postfix(rest) {
            Ok((rest, Postfix::Attr(name))) => {
                expr = expr.attr(name);
                input = rest;
            }
            Ok((rest, Postfix::Call(args))) => {
                expr = expr.call(args);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, expr)),
            Err(err) => return Err(err),
        }
    }
}

fn postfix(input: &str) -> Res<'_, Postfix> {
    alt((
        map(
            preceded(char('.'), cut(context("attribute name", identifier))),
            |name| Postfix::Attr(name.to_string()),
        ),
        map(
            delimited(
                char('('),
                |i| separated(i, call_arg),
                cut(context("closing parenthesis", char(')'))),
            ),
            Postfix::Call,
        ),
        map(
            delimited(
                pair(char('['), bracket_ws),
                cut(context("string key", string_literal)),
                cut(preceded(bracket_ws, char(']'))),
            ),
            Postfix::Attr,
        ),
    ))(input)
}

fn call_arg(input: &str) -> Res<'_, CallArg> {
    alt((
        map(
            separated_pair(
                identifier,
                tuple((bracket_ws, char('='), not(char('=')), bracket_ws)),
                |i| expr(i, true),
            ),
            |(name, value)| CallArg::Keyword(name.to_string(), value),
        ),
        map(|i| expr(i, true), CallArg::Positional),
    ))(input)
}

/// Comma-separated items inside brackets; a trailing comma is allowed.
fn separated<'a, T>(
    mut input: &'a str,
    mut item: impl FnMut(&'a str) -> Res<'a, T>,
) -> Res<'a, Vec<T>> {
    let mut items = Vec::new();
    loop {
        let (rest, ()) = bracket_ws(input)?;
        match item(rest) {
            Ok((rest, parsed)) => {
                items.push(parsed);
                let (rest, ()) = bracket_ws(rest)?;
                match char::<_, VerboseError<&str>>(',')(rest) {
                    Ok((rest, _)) => input = rest,
                    Err(_) => return Ok((rest, items)),
                }
            }
            Err(nom::Err::Error(_)) => return Ok((rest, items)),
            Err(err) => return Err(err),
        }
    }
}

fn primary(input: &str) -> Res<'_, Expr> {
    alt((
        map(string_literal, |s| Expr::Literal(Literal::Str(s))),
        map(number, Expr::Literal),
        name_or_keyword,
        list,
        dict,
        parenthesized,
    ))(input)
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn name_or_keyword(input: &str) -> Res<'_, Expr> {
    map(identifier, |name| match name {
        "True" => Expr::Literal(Literal::Bool(true)),
        "False" => Expr::Literal(Literal::Bool(false)),
        "None" => Expr::Literal(Literal::None),
        _ => Expr::Name(name.to_string()),
    })(input)
}

fn list(input: &str) -> Res<'_, Expr> {
    map(
        delimited(
            char('['),
            |i| separated(i, |i| expr(i, true)),
            cut(context("closing bracket", char(']'))),
        ),
        Expr::List,
    )(input)
}

fn dict(input: &str) -> Res<'_, Expr> {
    map(
        delimited(
            char('{'),
            |i| separated(i, dict_entry),
            cut(context("closing brace", char('}'))),
        ),
        Expr::Dict,
    )(input)
}

fn dict_entry(input: &str) -> Res<'_, (Expr, Expr)> {
    let (input, key) = expr(input, true)?;
    let (input, ()) = bracket_ws(input)?;
    let (input, _) = char(':')(input)?;
    let (input, ()) = bracket_ws(input)?;
    let (input, value) = cut(context("dict value", |i| expr(i, true)))(input)?;
    Ok((input, (key, value)))
}

fn parenthesized(input: &str) -> Res<'_, Expr> {
    delimited(
        pair(char('('), bracket_ws),
        |i| expr(i, true),
        cut(preceded(bracket_ws, char(')'))),
    )(input)
}

// Literals

fn number(input: &str) -> Res<'_, Literal> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let literal = if text.contains('.') {
        text.parse().ok().map(Literal::Float)
    } else {
        text.parse().ok().map(Literal::Int)
    };
    match literal {
        Some(literal) => Ok((rest, literal)),
        None => Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Digit,
        ))),
    }
}

fn string_literal(input: &str) -> Res<'_, String> {
    alt((
        triple_quoted("\"\"\""),
        triple_quoted("'''"),
        quoted('"'),
        quoted('\''),
    ))(input)
}

fn triple_quoted<'a>(delimiter: &'static str) -> impl FnMut(&'a str) -> Res<'a, String> {
    map(
        delimited(
            tag(delimiter),
            take_until(delimiter),
            cut(context("closing quotes", tag(delimiter))),
        ),
        str::to_string,
    )
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> Res<'a, String> {
    let plain = if quote == '"' { "\"\\\n" } else { "'\\\n" };
    map(
        delimited(
            char(quote),
            opt(escaped_transform(
                is_not(plain),
                '\\',
                alt((
                    value("\\", char('\\')),
                    value("'", char('\'')),
                    value("\"", char('"')),
                    value("\n", char('n')),
                    value("\t", char('t')),
                    value("\r", char('r')),
                )),
            )),
            cut(context("closing quote", char(quote))),
        ),
        Option::unwrap_or_default,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single(source: &str) -> StatementKind {
        let mut program = parse_program(source).expect("parse");
        assert_eq!(program.statements.len(), 1);
        program.statements.remove(0).kind
    }

    #[test]
    fn fluent_chain() {
        let kind = single("state('A').cmd.run('ls -la', cwd=\"/var/tmp\")");
        let expected = Expr::name("state")
            .call(vec![CallArg::Positional(Expr::str("A"))])
            .attr("cmd")
            .attr("run")
            .call(vec![
                CallArg::Positional(Expr::str("ls -la")),
                CallArg::Keyword("cwd".to_string(), Expr::str("/var/tmp")),
            ]);
        assert_eq!(kind, StatementKind::Expr(expected));
    }

    #[test]
    fn assignment_and_literals() {
        let kind = single("x = [1, -2.5, True, None, {'k': 'v'},]");
        let StatementKind::Assign { target, value } = kind else {
            panic!("expected an assignment");
        };
        assert_eq!(target, "x");
        assert_eq!(
            value,
            Expr::List(vec![
                Expr::Literal(Literal::Int(1)),
                Expr::Literal(Literal::Float(-2.5)),
                Expr::Literal(Literal::Bool(true)),
                Expr::Literal(Literal::None),
                Expr::Dict(vec![(Expr::str("k"), Expr::str("v"))]),
            ])
        );
    }

    #[test]
    fn continuations_and_brackets_span_lines() {
        let source = "state('B').cmd.run('ls') \\\n    .require(cmd='A')\ninclude(\n  'a',  # first\n  'b',\n)\n";
        let program = parse_program(source).expect("parse");
        let lines: Vec<usize> = program.statements.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn strings_and_escapes() {
        let kind = single(r#"f("a\"b", 'it\'s', '', """multi
line""", x["key"])"#);
        let StatementKind::Expr(Expr::Call { args, .. }) = kind else {
            panic!("expected a call");
        };
        let values: Vec<CallArg> = vec![
            CallArg::Positional(Expr::str("a\"b")),
            CallArg::Positional(Expr::str("it's")),
            CallArg::Positional(Expr::str("")),
            CallArg::Positional(Expr::str("multi\nline")),
            CallArg::Positional(Expr::name("x").attr("key")),
        ];
        assert_eq!(args, values);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let program = parse_program("# header\n\n  \nstate('A'); state('B')  # trailing\n")
            .expect("parse");
        let lines: Vec<usize> = program.statements.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![4, 4]);
    }

    #[test]
    fn syntax_errors_report_the_line() {
        let err = parse_program("state('A')\nstate('B'.cmd\n").expect_err("syntax error");
        assert_eq!(err.line(), Some(2));

        let err = parse_program("state('A') state('B')\n").expect_err("syntax error");
        assert_eq!(err.line(), Some(1));
    }
}
