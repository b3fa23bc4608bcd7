//! IMAP command-line tokenizer.
//!
//! Splits a client line into its tag, command name and argument tokens. Only
//! the argument forms the registration command needs are understood: atoms,
//! quoted strings and parenthesised lists (nested lists included). Literals
//! (`{n}`) are rejected because the line-oriented host cannot supply their
//! continuation.

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit1, none_of, one_of, space0, space1};
use nom::combinator::{all_consuming, map, opt, recognize, rest};
use nom::error::ErrorKind;
use nom::multi::{fold_many0, separated_list0};
use nom::sequence::{delimited, preceded, terminated, tuple};
use thiserror::Error;

/// A single argument token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImapArg {
    /// Bare atom such as `aps-version` or `INBOX`.
    Atom(String),
    /// Quoted string with escapes already resolved.
    Quoted(String),
    /// Parenthesised list.
    List(Vec<ImapArg>),
}

impl ImapArg {
    /// Returns the string content of an atom or quoted string.
    #[must_use]
    pub fn as_astring(&self) -> Option<&str> {
        match self {
            Self::Atom(value) | Self::Quoted(value) => Some(value),
            Self::List(_) => None,
        }
    }
}

/// Tag, command name and unparsed argument text of a client line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Client-chosen tag echoed on the completion line.
    pub tag: &'a str,
    /// Command name as sent, case preserved.
    pub name: &'a str,
    /// Everything after the command name.
    pub arguments: &'a str,
}

/// Errors raised while tokenizing a client line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// The line did not start with a tag.
    #[error("missing command tag")]
    MissingTag,
    /// A tag was present but no command name followed it.
    #[error("missing command name")]
    MissingCommand,
    /// The client sent a literal, which this host does not accept.
    #[error("literals are not supported")]
    LiteralUnsupported,
    /// The argument text was not well formed.
    #[error("malformed arguments near '{near}'")]
    Malformed {
        /// Up to 16 characters from where parsing stopped.
        near: String,
    },
}

fn is_atom_char(character: char) -> bool {
    !matches!(character, '(' | ')' | '{' | '"' | '\\' | ' ') && !character.is_control()
}

fn is_tag_char(character: char) -> bool {
    is_atom_char(character) && character != '+'
}

fn atom(input: &str) -> IResult<&str, String> {
    map(take_while1(is_atom_char), str::to_owned)(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let quoted_char = alt((preceded(char('\\'), one_of("\"\\")), none_of("\"\\\r\n")));
    delimited(
        char('"'),
        fold_many0(quoted_char, String::new, |mut text, character| {
            text.push(character);
            text
        }),
        char('"'),
    )(input)
}

/// Recognises a `{n}` or `{n+}` literal marker and fails hard on it.
fn literal(input: &str) -> IResult<&str, ImapArg> {
    recognize(tuple((char('{'), digit1, opt(char('+')), char('}'))))(input)?;
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        ErrorKind::Verify,
    )))
}

fn list(input: &str) -> IResult<&str, Vec<ImapArg>> {
    delimited(
        terminated(char('('), space0),
        separated_list0(space1, argument),
        preceded(space0, char(')')),
    )(input)
}

fn argument(input: &str) -> IResult<&str, ImapArg> {
    alt((
        literal,
        map(quoted, ImapArg::Quoted),
        map(list, ImapArg::List),
        map(atom, ImapArg::Atom),
    ))(input)
}

fn header(input: &str) -> IResult<&str, (&str, Option<&str>, &str)> {
    tuple((
        take_while1(is_tag_char),
        opt(preceded(space1, take_while1(is_atom_char))),
        rest,
    ))(input)
}

/// Splits a line into tag, command name and argument text.
///
/// Trailing CR/LF is ignored.
///
/// # Errors
///
/// Returns [`TokenizeError::MissingTag`] or [`TokenizeError::MissingCommand`]
/// when the line lacks either part.
pub fn split_command_line(line: &str) -> Result<CommandLine<'_>, TokenizeError> {
    let Ok((_, (tag, name, arguments))) = header(line.trim_end_matches(['\r', '\n'])) else {
        return Err(TokenizeError::MissingTag);
    };
    let command = name.ok_or(TokenizeError::MissingCommand)?;
    Ok(CommandLine {
        tag,
        name: command,
        arguments: arguments.trim_start_matches(' '),
    })
}

/// Tokenizes the argument text that follows a command name.
///
/// # Errors
///
/// Returns [`TokenizeError::LiteralUnsupported`] for `{n}` literals and
/// [`TokenizeError::Malformed`] for any other unparsable input.
pub fn parse_arguments(input: &str) -> Result<Vec<ImapArg>, TokenizeError> {
    let mut parser = all_consuming(terminated(separated_list0(space1, argument), space0));
    match parser(input.trim_start_matches(' ')) {
        Ok((_, arguments)) => Ok(arguments),
        Err(nom::Err::Failure(error)) if error.code == ErrorKind::Verify => {
            Err(TokenizeError::LiteralUnsupported)
        }
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => Err(TokenizeError::Malformed {
            near: error.input.chars().take(16).collect(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(TokenizeError::Malformed {
            near: input.chars().take(16).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn atom_arg(value: &str) -> ImapArg {
        ImapArg::Atom(value.to_owned())
    }

    #[test]
    fn splits_tag_command_and_arguments() {
        let line = split_command_line("A1 XAPPLEPUSHSERVICE aps-version 2\r\n").expect("split");
        assert_eq!(line.tag, "A1");
        assert_eq!(line.name, "XAPPLEPUSHSERVICE");
        assert_eq!(line.arguments, "aps-version 2");
    }

    #[test]
    fn command_without_arguments_has_empty_argument_text() {
        let line = split_command_line("a NOOP").expect("split");
        assert_eq!(line.arguments, "");
    }

    #[rstest]
    #[case("", TokenizeError::MissingTag)]
    #[case(" NOOP", TokenizeError::MissingTag)]
    #[case("A1", TokenizeError::MissingCommand)]
    #[case("A1 ", TokenizeError::MissingCommand)]
    fn rejects_incomplete_lines(#[case] line: &str, #[case] expected: TokenizeError) {
        assert_eq!(split_command_line(line), Err(expected));
    }

    #[test]
    fn parses_atoms_quoted_strings_and_lists() {
        let arguments =
            parse_arguments(r#"aps-version "2" mailboxes (INBOX "Sent Items")"#).expect("parse");
        assert_eq!(
            arguments,
            vec![
                atom_arg("aps-version"),
                ImapArg::Quoted("2".to_owned()),
                atom_arg("mailboxes"),
                ImapArg::List(vec![
                    atom_arg("INBOX"),
                    ImapArg::Quoted("Sent Items".to_owned()),
                ]),
            ]
        );
    }

    #[test]
    fn resolves_quoted_escapes() {
        let arguments = parse_arguments(r#""say \"hi\" \\ bye""#).expect("parse");
        assert_eq!(
            arguments,
            vec![ImapArg::Quoted(r#"say "hi" \ bye"#.to_owned())]
        );
    }

    #[test]
    fn accepts_empty_quoted_string_and_empty_list() {
        let arguments = parse_arguments(r#""" ()"#).expect("parse");
        assert_eq!(
            arguments,
            vec![ImapArg::Quoted(String::new()), ImapArg::List(Vec::new())]
        );
    }

    #[test]
    fn parses_nested_lists() {
        let arguments = parse_arguments("(a (b c))").expect("parse");
        assert_eq!(
            arguments,
            vec![ImapArg::List(vec![
                atom_arg("a"),
                ImapArg::List(vec![atom_arg("b"), atom_arg("c")]),
            ])]
        );
    }

    #[test]
    fn keeps_mailbox_brackets_in_atoms() {
        let arguments = parse_arguments("([Gmail]/Sent)").expect("parse");
        assert_eq!(
            arguments,
            vec![ImapArg::List(vec![atom_arg("[Gmail]/Sent")])]
        );
    }

    #[test]
    fn empty_argument_text_yields_no_tokens() {
        assert_eq!(parse_arguments(""), Ok(Vec::new()));
    }

    #[test]
    fn rejects_literals() {
        assert_eq!(
            parse_arguments("aps-account-id {5}"),
            Err(TokenizeError::LiteralUnsupported)
        );
    }

    #[test]
    fn braces_inside_quotes_are_not_literals() {
        let arguments = parse_arguments(r#""{5}""#).expect("parse");
        assert_eq!(arguments, vec![ImapArg::Quoted("{5}".to_owned())]);
    }

    #[rstest]
    #[case(r#""unterminated"#)]
    #[case("(INBOX")]
    #[case("INBOX)")]
    fn rejects_malformed_input(#[case] input: &str) {
        assert!(matches!(
            parse_arguments(input),
            Err(TokenizeError::Malformed { .. })
        ));
    }
}
