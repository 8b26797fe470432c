//! Parser for text templates using `{{ }}` actions
//!
//! The grammar follows the familiar text/template syntax: actions hold
//! pipelines of commands separated by `|`, control flow uses `if`, `range`,
//! `with`, `else` and `end`, and `{{-`/`-}}` trim surrounding whitespace.
//! The whole grammar is parsed so that every construct can be reported
//! precisely; which constructs are accepted is decided by key extraction
//! and rendering.

use std::fmt;

/// Functions predefined by the template language; any other identifier in
/// command position is a parse error
const BUILTIN_FUNCTIONS: &[&str] = &[
    "and", "call", "eq", "ge", "gt", "html", "index", "js", "le", "len", "lt", "ne", "not", "or",
    "print", "printf", "println", "slice", "urlquery",
];

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub root: Vec<Node>,
}

/// One element of a template's node list
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Node {
    Text(String),
    Action {
        pipeline: Pipeline,
        line: usize,
    },
    Branch {
        kind: BranchKind,
        pipeline: Pipeline,
        list: Vec<Node>,
        else_list: Vec<Node>,
        line: usize,
    },
    Template {
        name: String,
        pipeline: Option<Pipeline>,
        line: usize,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    If,
    Range,
    With,
}

/// Commands chained with `|`, optionally preceded by a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub decl: Vec<String>,
    pub reassign: bool,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Arg>,
}

/// An operand of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `.a.b.c`: a path off the root value
    Field(Vec<String>),
    /// `.`
    Dot,
    /// `$name.a.b`
    Variable(String, Vec<String>),
    /// Function name
    Identifier(String),
    String(String),
    Number(String),
    Bool(bool),
    Nil,
    /// Parenthesised sub-pipeline
    Pipeline(Pipeline),
}

/// Syntax error with the line it was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse `source` into a template named `name`
pub fn parse(name: &str, source: &str) -> Result<Template, ParseError> {
    let items = lex(source)?;
    let mut parser = Parser {
        items: items.into_iter(),
        loop_depth: 0,
    };
    let root = match parser.parse_list()? {
        (list, Terminator::Eof) => list,
        (_, Terminator::End { line }) => return Err(ParseError::new(line, "unexpected {{end}}")),
        (_, Terminator::Else { line, .. }) => {
            return Err(ParseError::new(line, "unexpected {{else}}"));
        }
    };

    Ok(Template {
        name: name.to_owned(),
        root,
    })
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Dot,
    Variable(String, Vec<String>),
    Ident(String),
    Str(String),
    Number(String),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    Declare,
    Assign,
    Comma,
}

#[derive(Debug)]
enum Item {
    Text(String),
    Action { tokens: Vec<Token>, line: usize },
}

fn lex(source: &str) -> Result<Vec<Item>, ParseError> {
    let mut items = Vec::new();
    let mut pos = 0;
    let mut trim_next_text = false;

    loop {
        let Some(offset) = source[pos..].find("{{") else {
            push_text(&mut items, &source[pos..], trim_next_text, false);
            break;
        };
        let open = pos + offset;
        let line = 1 + source[..open].matches('\n').count();

        let mut inner = open + 2;
        let trim_left = trim_marker_at(source, inner);
        if trim_left {
            inner += 1;
        }
        push_text(&mut items, &source[pos..open], trim_next_text, trim_left);

        let body = skip_whitespace(source, inner);
        let (close, trim_right) = if source[body..].starts_with("/*") {
            lex_comment(source, body, line)?
        } else {
            let (tokens, close, trim_right) = lex_action(source, inner, line)?;
            items.push(Item::Action { tokens, line });
            (close, trim_right)
        };

        pos = close;
        trim_next_text = trim_right;
    }

    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        items.push(Item::Text(text.to_owned()));
    }
}

/// `{{- ` needs whitespace after the dash, otherwise it is a negative number
fn trim_marker_at(source: &str, at: usize) -> bool {
    let mut chars = source[at..].chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn skip_whitespace(source: &str, from: usize) -> usize {
    source[from..]
        .char_indices()
        .find(|&(_, c)| !c.is_whitespace())
        .map_or(source.len(), |(i, _)| from + i)
}

/// Skip a `/* */` comment; returns the position after `}}` and the trim flag
fn lex_comment(source: &str, start: usize, line: usize) -> Result<(usize, bool), ParseError> {
    let end = source[start + 2..]
        .find("*/")
        .map(|i| start + 2 + i + 2)
        .ok_or_else(|| ParseError::new(line, "unclosed comment"))?;

    let after = skip_whitespace(source, end);
    let trim_right = after > end && source[after..].starts_with("-}}");
    let close = if trim_right { after + 1 } else { end };

    if source[close..].starts_with("}}") {
        Ok((close + 2, trim_right))
    } else {
        Err(ParseError::new(line, "comment ends before closing delimiter"))
    }
}

/// Tokenize one action; returns the tokens, the position after `}}` and
/// whether the following text is trimmed
fn lex_action(
    source: &str,
    start: usize,
    line: usize,
) -> Result<(Vec<Token>, usize, bool), ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = start;

    loop {
        let next = skip_whitespace(source, pos);
        let had_space = next > pos;
        pos = next;
        let rest = &source[pos..];

        if rest.is_empty() {
            return Err(ParseError::new(line, "unclosed action"));
        }
        if had_space && rest.starts_with("-}}") {
            return Ok((tokens, pos + 3, true));
        }
        if rest.starts_with("}}") {
            return Ok((tokens, pos + 2, false));
        }

        let c = bytes[pos];
        match c {
            b'|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            b'(' => {
                tokens.push(Token::LeftParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RightParen);
                pos += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            b':' if rest.starts_with(":=") => {
                tokens.push(Token::Declare);
                pos += 2;
            }
            b'=' => {
                tokens.push(Token::Assign);
                pos += 1;
            }
            b'"' => {
                let (value, end) = lex_quoted(source, pos, line)?;
                tokens.push(Token::Str(value));
                pos = end;
            }
            b'`' => {
                let end = source[pos + 1..]
                    .find('`')
                    .map(|i| pos + 1 + i)
                    .ok_or_else(|| ParseError::new(line, "unterminated raw quoted string"))?;
                tokens.push(Token::Str(source[pos + 1..end].to_owned()));
                pos = end + 1;
            }
            b'\'' => {
                let end = source[pos + 1..]
                    .find('\'')
                    .map(|i| pos + 1 + i)
                    .ok_or_else(|| ParseError::new(line, "unterminated character constant"))?;
                tokens.push(Token::Number(source[pos..=end].to_owned()));
                pos = end + 1;
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let end = scan_number(source, pos);
                tokens.push(Token::Number(source[pos..end].to_owned()));
                pos = end;
            }
            b'.' => {
                let (fields, end) = scan_fields(source, pos);
                if fields.is_empty() {
                    tokens.push(Token::Dot);
                    pos += 1;
                } else {
                    tokens.push(Token::Field(fields));
                    pos = end;
                }
            }
            b'$' => {
                let name_end = scan_identifier(source, pos + 1);
                let name = source[pos..name_end].to_owned();
                let (fields, end) = scan_fields(source, name_end);
                tokens.push(Token::Variable(name, fields));
                pos = end;
            }
            b'0'..=b'9' => {
                let end = scan_number(source, pos);
                tokens.push(Token::Number(source[pos..end].to_owned()));
                pos = end;
            }
            b'+' | b'-' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let end = scan_number(source, pos + 1);
                tokens.push(Token::Number(source[pos..end].to_owned()));
                pos = end;
            }
            _ if is_identifier_start(rest) => {
                let end = scan_identifier(source, pos);
                let word = &source[pos..end];
                tokens.push(match word {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "nil" => Token::Nil,
                    _ => Token::Ident(word.to_owned()),
                });
                pos = end;
            }
            _ => {
                let found = rest.chars().next().unwrap_or_default();
                return Err(ParseError::new(
                    line,
                    format!("unexpected {found:?} in command"),
                ));
            }
        }
    }
}

fn is_identifier_start(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
}

fn scan_identifier(source: &str, from: usize) -> usize {
    source[from..]
        .char_indices()
        .find(|&(_, c)| !(c == '_' || c.is_alphanumeric()))
        .map_or(source.len(), |(i, _)| from + i)
}

/// Read a chain of `.name` selectors starting at `from`
fn scan_fields(source: &str, from: usize) -> (Vec<String>, usize) {
    let mut fields = Vec::new();
    let mut pos = from;
    while source[pos..].starts_with('.') && is_identifier_start(&source[pos + 1..]) {
        let end = scan_identifier(source, pos + 1);
        fields.push(source[pos + 1..end].to_owned());
        pos = end;
    }
    (fields, pos)
}

fn scan_number(source: &str, from: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        let c = bytes[pos];
        let exponent_sign = (c == b'+' || c == b'-')
            && pos > from
            && matches!(bytes[pos - 1], b'e' | b'E' | b'p' | b'P');
        if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || exponent_sign {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn lex_quoted(source: &str, start: usize, line: usize) -> Result<(String, usize), ParseError> {
    let mut value = String::new();
    let mut chars = source[start + 1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, start + 1 + i + 1)),
            '\n' => break,
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            _ => value.push(c),
        }
    }

    Err(ParseError::new(line, "unterminated quoted string"))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

enum Terminator {
    Eof,
    End { line: usize },
    Else { tokens: Vec<Token>, line: usize },
}

struct Parser {
    items: std::vec::IntoIter<Item>,
    loop_depth: usize,
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), ParseError> {
        let mut nodes = Vec::new();

        while let Some(item) = self.items.next() {
            let (mut tokens, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { tokens, line } => (tokens, line),
            };

            let keyword = match tokens.first() {
                Some(Token::Ident(word)) => word.clone(),
                _ => String::new(),
            };

            match keyword.as_str() {
                "end" => {
                    if tokens.len() > 1 {
                        return Err(ParseError::new(line, "unexpected token in {{end}}"));
                    }
                    return Ok((nodes, Terminator::End { line }));
                }
                "else" => {
                    tokens.remove(0);
                    return Ok((nodes, Terminator::Else { tokens, line }));
                }
                "if" | "range" | "with" => {
                    tokens.remove(0);
                    let kind = match keyword.as_str() {
                        "if" => BranchKind::If,
                        "range" => BranchKind::Range,
                        _ => BranchKind::With,
                    };
                    nodes.push(self.parse_branch(kind, tokens, line)?);
                }
                "template" => {
                    tokens.remove(0);
                    nodes.push(parse_template_call(tokens, line)?);
                }
                "define" | "block" => {
                    return Err(ParseError::new(
                        line,
                        format!("{{{{{keyword}}}}} is not supported"),
                    ));
                }
                "break" | "continue" => {
                    if self.loop_depth == 0 {
                        return Err(ParseError::new(
                            line,
                            format!("{{{{{keyword}}}}} outside {{{{range}}}}"),
                        ));
                    }
                    if tokens.len() > 1 {
                        return Err(ParseError::new(
                            line,
                            format!("unexpected token in {{{{{keyword}}}}}"),
                        ));
                    }
                    nodes.push(if keyword == "break" {
                        Node::Break { line }
                    } else {
                        Node::Continue { line }
                    });
                }
                _ => {
                    let pipeline = parse_pipeline(&tokens, line, true)?;
                    nodes.push(Node::Action { pipeline, line });
                }
            }
        }

        Ok((nodes, Terminator::Eof))
    }

    /// Parse a branch whose keyword has been consumed, up to and including
    /// its `{{end}}`
    fn parse_branch(
        &mut self,
        kind: BranchKind,
        tokens: Vec<Token>,
        line: usize,
    ) -> Result<Node, ParseError> {
        let name = branch_keyword(kind);
        if tokens.is_empty() {
            return Err(ParseError::new(line, format!("missing value for {name}")));
        }
        let pipeline = parse_pipeline(&tokens, line, kind == BranchKind::Range)?;

        if kind == BranchKind::Range {
            self.loop_depth += 1;
        }
        let body = self.parse_list();
        if kind == BranchKind::Range {
            self.loop_depth -= 1;
        }
        let (list, terminator) = body?;

        let else_list = match terminator {
            Terminator::End { .. } => Vec::new(),
            Terminator::Eof => {
                return Err(ParseError::new(line, format!("unexpected EOF in {name}")));
            }
            Terminator::Else {
                mut tokens,
                line: else_line,
            } => {
                let chained = match tokens.first() {
                    Some(Token::Ident(word)) if word == "if" => Some(BranchKind::If),
                    Some(Token::Ident(word)) if word == "with" => Some(BranchKind::With),
                    _ => None,
                };
                if let Some(chained_kind) = chained {
                    // `else if` shares the enclosing `{{end}}`
                    tokens.remove(0);
                    vec![self.parse_branch(chained_kind, tokens, else_line)?]
                } else if tokens.is_empty() {
                    match self.parse_list()? {
                        (list, Terminator::End { .. }) => list,
                        (_, Terminator::Else { line, .. }) => {
                            return Err(ParseError::new(line, "expected end; found {{else}}"));
                        }
                        (_, Terminator::Eof) => {
                            return Err(ParseError::new(
                                else_line,
                                format!("unexpected EOF in {name}"),
                            ));
                        }
                    }
                } else {
                    return Err(ParseError::new(else_line, "unexpected token in {{else}}"));
                }
            }
        };

        Ok(Node::Branch {
            kind,
            pipeline,
            list,
            else_list,
            line,
        })
    }
}

const fn branch_keyword(kind: BranchKind) -> &'static str {
    match kind {
        BranchKind::If => "if",
        BranchKind::Range => "range",
        BranchKind::With => "with",
    }
}

fn parse_template_call(tokens: Vec<Token>, line: usize) -> Result<Node, ParseError> {
    let mut tokens = tokens.into_iter();
    let Some(Token::Str(name)) = tokens.next() else {
        return Err(ParseError::new(line, "template name must be a string"));
    };
    let rest: Vec<Token> = tokens.collect();
    let pipeline = if rest.is_empty() {
        None
    } else {
        Some(parse_pipeline(&rest, line, false)?)
    };

    Ok(Node::Template {
        name,
        pipeline,
        line,
    })
}

/// Parse a pipeline from the tokens of one action
///
/// `allow_pair` permits the `$i, $e :=` form used by `range`.
fn parse_pipeline(tokens: &[Token], line: usize, allow_pair: bool) -> Result<Pipeline, ParseError> {
    let (decl, reassign, rest) = split_declaration(tokens, allow_pair);
    if rest.is_empty() {
        return Err(ParseError::new(line, "missing value for command"));
    }

    let mut pos = 0;
    let pipeline = parse_commands(rest, &mut pos, line, false)?;
    Ok(Pipeline {
        decl,
        reassign,
        commands: pipeline,
    })
}

fn split_declaration(tokens: &[Token], allow_pair: bool) -> (Vec<String>, bool, &[Token]) {
    match tokens {
        [Token::Variable(name, fields), op @ (Token::Declare | Token::Assign), rest @ ..]
            if fields.is_empty() =>
        {
            (vec![name.clone()], *op == Token::Assign, rest)
        }
        [
            Token::Variable(first, first_fields),
            Token::Comma,
            Token::Variable(second, second_fields),
            op @ (Token::Declare | Token::Assign),
            rest @ ..,
        ] if allow_pair && first_fields.is_empty() && second_fields.is_empty() => (
            vec![first.clone(), second.clone()],
            *op == Token::Assign,
            rest,
        ),
        _ => (Vec::new(), false, tokens),
    }
}

/// Parse `cmd | cmd | ...` until the end of input or, when `nested`, a
/// closing parenthesis
fn parse_commands(
    tokens: &[Token],
    pos: &mut usize,
    line: usize,
    nested: bool,
) -> Result<Vec<Command>, ParseError> {
    let mut commands = Vec::new();
    let mut args = Vec::new();

    loop {
        let Some(token) = tokens.get(*pos) else {
            if nested {
                return Err(ParseError::new(line, "unclosed left paren"));
            }
            break;
        };
        *pos += 1;

        match token {
            Token::Pipe => {
                if args.is_empty() {
                    return Err(ParseError::new(line, "missing command before '|'"));
                }
                commands.push(Command {
                    args: std::mem::take(&mut args),
                });
            }
            Token::RightParen => {
                if !nested {
                    return Err(ParseError::new(line, "unexpected right paren"));
                }
                break;
            }
            Token::LeftParen => {
                let inner = parse_commands(tokens, pos, line, true)?;
                if inner.is_empty() {
                    return Err(ParseError::new(line, "missing value for parenthesized pipeline"));
                }
                args.push(Arg::Pipeline(Pipeline {
                    decl: Vec::new(),
                    reassign: false,
                    commands: inner,
                }));
            }
            Token::Ident(name) => {
                if !BUILTIN_FUNCTIONS.contains(&name.as_str()) {
                    return Err(ParseError::new(line, format!("function {name:?} not defined")));
                }
                args.push(Arg::Identifier(name.clone()));
            }
            Token::Field(path) => args.push(Arg::Field(path.clone())),
            Token::Dot => args.push(Arg::Dot),
            Token::Variable(name, fields) => args.push(Arg::Variable(name.clone(), fields.clone())),
            Token::Str(value) => args.push(Arg::String(value.clone())),
            Token::Number(value) => args.push(Arg::Number(value.clone())),
            Token::Bool(value) => args.push(Arg::Bool(*value)),
            Token::Nil => args.push(Arg::Nil),
            Token::Declare | Token::Assign | Token::Comma => {
                return Err(ParseError::new(line, "unexpected declaration in command"));
            }
        }
    }

    if args.is_empty() {
        if !commands.is_empty() {
            return Err(ParseError::new(line, "missing command after '|'"));
        }
    } else {
        commands.push(Command { args });
    }

    Ok(commands)
}

// ---------------------------------------------------------------------------
// Display: renders nodes back to template syntax for error messages
// ---------------------------------------------------------------------------

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Text(ref text) => f.write_str(text),
            Self::Action { ref pipeline, .. } => write!(f, "{{{{{pipeline}}}}}"),
            Self::Branch {
                kind,
                ref pipeline,
                ref list,
                ref else_list,
                ..
            } => {
                write!(f, "{{{{{} {pipeline}}}}}", branch_keyword(kind))?;
                write_list(f, list)?;
                if !else_list.is_empty() {
                    f.write_str("{{else}}")?;
                    write_list(f, else_list)?;
                }
                f.write_str("{{end}}")
            }
            Self::Template {
                ref name,
                ref pipeline,
                ..
            } => match *pipeline {
                Some(ref pipeline) => write!(f, "{{{{template {name:?} {pipeline}}}}}"),
                None => write!(f, "{{{{template {name:?}}}}}"),
            },
            Self::Break { .. } => f.write_str("{{break}}"),
            Self::Continue { .. } => f.write_str("{{continue}}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Node]) -> fmt::Result {
    for node in list {
        write!(f, "{node}")?;
    }
    Ok(())
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            let op = if self.reassign { "=" } else { ":=" };
            write!(f, "{} {op} ", self.decl.join(", "))?;
        }
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Field(ref path) => {
                for key in path {
                    write!(f, ".{key}")?;
                }
                Ok(())
            }
            Self::Dot => f.write_str("."),
            Self::Variable(ref name, ref fields) => {
                f.write_str(name)?;
                for key in fields {
                    write!(f, ".{key}")?;
                }
                Ok(())
            }
            Self::Identifier(ref name) | Self::Number(ref name) => f.write_str(name),
            Self::String(ref value) => write!(f, "{value:?}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Nil => f.write_str("nil"),
            Self::Pipeline(ref pipeline) => write!(f, "({pipeline})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(path: &[&str]) -> Arg {
        Arg::Field(path.iter().map(|s| (*s).to_owned()).collect())
    }

    #[test]
    fn parses_text_and_field_actions() {
        let template = parse("t", "name: {{ .Name }}\nregion: {{.Cloud.Region}}\n").unwrap();

        assert_eq!(template.root.len(), 5);
        assert_eq!(template.root[0], Node::Text("name: ".to_owned()));
        assert_eq!(template.root[2], Node::Text("\nregion: ".to_owned()));
        match template.root[1] {
            Node::Action {
                ref pipeline,
                line,
            } => {
                assert_eq!(line, 1);
                assert_eq!(pipeline.commands.len(), 1);
                assert_eq!(pipeline.commands[0].args, vec![field(&["Name"])]);
            }
            ref other => panic!("expected action, got {other:?}"),
        }
        match template.root[3] {
            Node::Action { line, .. } => assert_eq!(line, 2),
            ref other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn trim_markers_strip_adjacent_whitespace() {
        let template = parse("t", "a  \n {{- .X -}} \n  b").unwrap();
        assert_eq!(template.root[0], Node::Text("a".to_owned()));
        assert_eq!(template.root[2], Node::Text("b".to_owned()));
    }

    #[test]
    fn negative_numbers_are_not_trim_markers() {
        let template = parse("t", "{{-3}}").unwrap();
        match template.root[0] {
            Node::Action { ref pipeline, .. } => {
                assert_eq!(pipeline.commands[0].args, vec![Arg::Number("-3".to_owned())]);
            }
            ref other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn comments_are_dropped() {
        let template = parse("t", "a{{/* note */}}b{{- /* trimmed */ -}} c").unwrap();
        assert_eq!(
            template.root,
            vec![
                Node::Text("a".to_owned()),
                Node::Text("b".to_owned()),
                Node::Text("c".to_owned()),
            ]
        );
    }

    #[test]
    fn branches_nest_and_chain_else_if() {
        let source = "{{if .A}}a{{else if .B}}b{{else}}c{{end}}";
        let template = parse("t", source).unwrap();
        assert_eq!(template.root.len(), 1);
        assert_eq!(
            template.root[0].to_string(),
            "{{if .A}}a{{else}}{{if .B}}b{{else}}c{{end}}{{end}}"
        );
    }

    #[test]
    fn range_with_declaration_round_trips_through_display() {
        let template = parse("t", "{{range $i, $e := .Items}}{{$e.Name}}{{end}}").unwrap();
        assert_eq!(
            template.root[0].to_string(),
            "{{range $i, $e := .Items}}{{$e.Name}}{{end}}"
        );
    }

    #[test]
    fn pipelines_and_parentheses() {
        let template = parse("t", r#"{{ .A | printf "%s-%s" (index .B "k") }}"#).unwrap();
        match template.root[0] {
            Node::Action { ref pipeline, .. } => {
                assert_eq!(pipeline.commands.len(), 2);
                assert_eq!(pipeline.commands[1].args.len(), 3);
                assert!(matches!(pipeline.commands[1].args[2], Arg::Pipeline(_)));
            }
            ref other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_templates() {
        for source in [
            "{{ .A ",
            "{{if .A}}x",
            "{{end}}",
            "{{else}}",
            "{{ \"unterminated }}",
            "{{ define \"x\" }}y{{end}}",
            "{{ block \"x\" . }}y{{end}}",
            "{{ unknownFunc .A }}",
            "{{ break }}",
            "{{}}",
            "{{ (.A }}",
            "{{ .A | }}",
        ] {
            assert!(parse("t", source).is_err(), "expected error for {source:?}");
        }
    }

    #[test]
    fn parse_errors_carry_the_line() {
        let err = parse("t", "ok\nok\n{{ .A | }}").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn break_inside_range_is_accepted() {
        let template = parse("t", "{{range .X}}{{if .Stop}}{{break}}{{end}}{{end}}").unwrap();
        assert_eq!(template.root.len(), 1);
    }
}
