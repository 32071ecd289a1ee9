//! Template language with `[%` `%]` delimiters.
//!
//! A subset of Go's `text/template`, evaluated against a JSON value:
//!
//! ```text
//! [% .GitInfo.Version %]            print a field of `.`
//! [% $v := .PoMap %]                declare a variable
//! [% if .A %]…[% else if .B %]…[% else %]…[% end %]
//! [% range $k, $v := .PoMap %]…[% else %]…[% end %]
//! [% with .GitInfo %][% .Hash %][% end %]
//! [%/* comment */%]
//! [%- trims whitespace before, -%] trims whitespace after
//! ```
//!
//! Unknown functions evaluate to an empty string. Fields named in `maps`
//! hold maps: a missing key there reads as nil instead of failing.

use serde_json::{
    Number,
    Value,
};

use super::TemplateError;
use crate::catalog::quote::unquote;

/// Opens an action.
const OPEN: &str = "[%";
/// Closes an action.
const CLOSE: &str = "%]";
/// Opens a comment inside an action.
const COMMENT_OPEN: &str = "/*";
/// Closes a comment.
const COMMENT_CLOSE: &str = "*/";

/// Lexed piece of template source.
#[derive(Debug)]
enum Token {
    /// Literal text between actions.
    Text(String),
    /// Trimmed action body and the line it starts on.
    Action {
        /// Body without delimiters or trim markers.
        body: String,
        /// Line the action starts on.
        line: usize,
    },
}

/// Word inside an action.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    /// Unquoted word.
    Bare(String),
    /// Decoded string literal.
    Str(String),
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `:=`
    Declare,
}

/// Argument of a command.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// `.`
    Dot,
    /// `.A.B`
    Field(Vec<String>),
    /// `$`, `$v` or `$v.A.B`
    Variable {
        /// `$` or `$name`.
        name: String,
        /// Fields followed from the variable.
        fields: Vec<String>,
    },
    /// Constant.
    Literal(Value),
}

/// One stage of a pipeline.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    /// Operand evaluated as is.
    Value(Operand),
    /// Builtin call; a piped value becomes the last argument.
    Call {
        /// Builtin name.
        function: String,
        /// Explicit arguments.
        args: Vec<Operand>,
    },
}

/// Commands joined by `|`.
#[derive(Debug, Clone, PartialEq)]
struct Pipeline {
    /// Stages of the pipeline.
    commands: Vec<Command>,
    /// Source line for errors.
    line: usize,
}

/// Parsed template element.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    /// Literal text.
    Text(String),
    /// Print a pipeline.
    Print(Pipeline),
    /// `$v := pipeline`
    Declare {
        /// Declared variable, with its `$`.
        name: String,
        /// Initial value.
        value: Pipeline,
    },
    /// `if` with its `else if` branches.
    If {
        /// Conditions and bodies, tried in order.
        branches: Vec<(Pipeline, Vec<Node>)>,
        /// `else` body.
        otherwise: Vec<Node>,
    },
    /// `range`, with up to two declared variables.
    Range {
        /// `$v` or `$k, $v`, possibly none.
        variables: Vec<String>,
        /// Value iterated over.
        over: Pipeline,
        /// Body run per element.
        body: Vec<Node>,
        /// Run when there are no elements.
        otherwise: Vec<Node>,
    },
    /// `with` block.
    With {
        /// New `.` when truthy.
        value: Pipeline,
        /// Body run with the new `.`.
        body: Vec<Node>,
        /// Run when the value is falsy.
        otherwise: Vec<Node>,
    },
}

/// Parsed template, ready to render any number of times.
#[derive(Debug, Clone)]
pub struct Template {
    /// Label used in errors.
    name: String,
    /// Top-level nodes.
    nodes: Vec<Node>,
}

impl Template {
    /// Parses `text`; `name` labels errors.
    ///
    /// # Errors
    /// Returns [`TemplateError::Parse`] for unterminated actions, unbalanced
    /// `end`/`else` and malformed operands.
    pub fn parse(name: &str, text: &str) -> Result<Self, TemplateError> {
        let tokens = lex(name, text)?;
        let mut parser = Parser { name, tokens: tokens.into_iter(), line: 1 };
        let (nodes, stop) = parser.parse_list()?;
        match stop {
            Stop::Eof => Ok(Self { name: name.to_string(), nodes }),
            Stop::End => Err(parser.error("unexpected end")),
            Stop::Else(_) => Err(parser.error("unexpected else")),
        }
    }

    /// Renders the template with `.` bound to `data`. `maps` names the
    /// fields whose objects are maps rather than records.
    ///
    /// # Errors
    /// Returns [`TemplateError::Eval`] for missing record fields, undefined
    /// variables and values that cannot be iterated.
    pub fn render(&self, data: &Value, maps: &[&str]) -> Result<String, TemplateError> {
        let mut exec = Exec { name: &self.name, root: data, maps, variables: Vec::new(), out: String::new() };
        exec.walk(&Datum::record(data.clone()), &self.nodes)?;
        Ok(exec.out)
    }
}

/// Parses and renders in one step.
///
/// # Errors
/// See [`Template::parse`] and [`Template::render`].
pub fn render(name: &str, text: &str, data: &Value, maps: &[&str]) -> Result<String, TemplateError> {
    Template::parse(name, text)?.render(data, maps)
}

/// Builds a [`TemplateError::Parse`].
fn parse_error(name: &str, line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Parse { name: name.to_string(), line, message: message.into() }
}

/// Splits source into text and action tokens, applying trim markers and
/// dropping comments.
fn lex(name: &str, text: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    let mut trim_next = false;

    while let Some(start) = rest.find(OPEN) {
        let (before, after) = rest.split_at(start);
        let after = after.get(OPEN.len()..).unwrap_or_default();
        let offset = text.len() - rest.len() + start;
        let line = 1 + text.get(..offset).unwrap_or_default().matches('\n').count();

        let (after, trim_left) = match after.strip_prefix('-') {
            Some(stripped) if stripped.starts_with(char::is_whitespace) => (stripped, true),
            _ => (after, false),
        };
        let mut before = if trim_next { before.trim_start() } else { before };
        if trim_left {
            before = before.trim_end();
        }
        if !before.is_empty() {
            tokens.push(Token::Text(before.to_string()));
        }

        let end =
            find_close(after).ok_or_else(|| parse_error(name, line, "unterminated action"))?;
        let (raw_body, tail) = after.split_at(end);
        rest = tail.get(CLOSE.len()..).unwrap_or_default();

        let (body, trim_right) = match raw_body.strip_suffix('-') {
            Some(stripped) if stripped.ends_with(char::is_whitespace) => (stripped, true),
            _ => (raw_body, false),
        };
        trim_next = trim_right;

        let body = body.trim();
        if body.starts_with(COMMENT_OPEN) {
            if !body.ends_with(COMMENT_CLOSE) {
                return Err(parse_error(name, line, "unclosed comment"));
            }
            continue;
        }
        tokens.push(Token::Action { body: body.to_string(), line });
    }

    let tail = if trim_next { rest.trim_start() } else { rest };
    if !tail.is_empty() {
        tokens.push(Token::Text(tail.to_string()));
    }
    Ok(tokens)
}

/// Byte offset of the closing delimiter, skipping quoted strings and
/// comments.
fn find_close(body: &str) -> Option<usize> {
    if body.trim_start().starts_with(COMMENT_OPEN) {
        let comment_end = body.find(COMMENT_CLOSE)? + COMMENT_CLOSE.len();
        return body.get(comment_end..)?.find(CLOSE).map(|i| i + comment_end);
    }

    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '`' => quote = Some(c),
            None if body.get(i..).is_some_and(|s| s.starts_with(CLOSE)) => return Some(i),
            None => {}
        }
    }
    None
}

/// Splits an action body into words.
fn split_words(body: &str) -> Result<Vec<Word>, String> {
    let mut words = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                words.push(Word::Pipe);
            }
            ',' => {
                chars.next();
                words.push(Word::Comma);
            }
            ':' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err("expected := ".to_string());
                }
                words.push(Word::Declare);
            }
            '"' | '`' => {
                chars.next();
                let mut escaped = false;
                let mut end = None;
                for (i, next) in chars.by_ref() {
                    if c == '"' && escaped {
                        escaped = false;
                    } else if c == '"' && next == '\\' {
                        escaped = true;
                    } else if next == c {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or_else(|| "unterminated quoted string".to_string())?;
                let literal = body.get(start..=end).unwrap_or_default();
                let value = if c == '"' {
                    unquote(literal).map_err(|e| e.to_string())?
                } else {
                    literal.strip_prefix('`').and_then(|l| l.strip_suffix('`')).unwrap_or_default().to_string()
                };
                words.push(Word::Str(value));
            }
            '(' | ')' => return Err("parenthesized pipelines are not supported".to_string()),
            _ => {
                let mut end = body.len();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '|' | ',' | ':' | '"' | '`' | '(' | ')') {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                words.push(Word::Bare(body.get(start..end).unwrap_or_default().to_string()));
            }
        }
    }
    Ok(words)
}

/// Go identifier: a letter or `_`, then letters, digits or `_`.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Splits `A.B` into field names.
fn parse_fields(path: &str) -> Result<Vec<String>, String> {
    path.split('.')
        .map(|field| {
            if is_identifier(field) {
                Ok(field.to_string())
            } else {
                Err(format!("bad field name {field:?}"))
            }
        })
        .collect()
}

/// Parses a bare word as an operand.
fn parse_operand(word: &str) -> Result<Operand, String> {
    if word == "." {
        return Ok(Operand::Dot);
    }
    if let Some(path) = word.strip_prefix('.') {
        return parse_fields(path).map(Operand::Field);
    }
    if word.starts_with('$') {
        let (name, path) = word.split_once('.').map_or((word, None), |(n, p)| (n, Some(p)));
        if name != "$" && !name.strip_prefix('$').is_some_and(is_identifier) {
            return Err(format!("bad variable {word:?}"));
        }
        let fields = path.map(parse_fields).transpose()?.unwrap_or_default();
        return Ok(Operand::Variable { name: name.to_string(), fields });
    }
    match word {
        "true" => return Ok(Operand::Literal(Value::Bool(true))),
        "false" => return Ok(Operand::Literal(Value::Bool(false))),
        "nil" => return Ok(Operand::Literal(Value::Null)),
        _ => {}
    }
    if let Ok(n) = word.parse::<i64>() {
        return Ok(Operand::Literal(Value::from(n)));
    }
    if let Some(n) = word.parse::<f64>().ok().and_then(Number::from_f64) {
        return Ok(Operand::Literal(Value::Number(n)));
    }
    Err(format!("unexpected {word:?}"))
}

/// Parses one pipeline stage.
fn parse_command(words: &[Word]) -> Result<Command, String> {
    match words {
        [] => Err("missing value for command".to_string()),
        [Word::Bare(function), args @ ..]
            if is_identifier(function) && !matches!(function.as_str(), "true" | "false" | "nil") =>
        {
            let args = args
                .iter()
                .map(|word| match word {
                    Word::Bare(word) => parse_operand(word),
                    Word::Str(s) => Ok(Operand::Literal(Value::String(s.clone()))),
                    other => Err(format!("unexpected {other:?} in command")),
                })
                .collect::<Result<_, _>>()?;
            Ok(Command::Call { function: function.clone(), args })
        }
        [Word::Bare(word)] => parse_operand(word).map(Command::Value),
        [Word::Str(s)] => Ok(Command::Value(Operand::Literal(Value::String(s.clone())))),
        [_, extra, ..] => Err(format!("unexpected {extra:?} in operand")),
        [other] => Err(format!("unexpected {other:?}")),
    }
}

/// Parses a whole pipeline.
fn parse_pipeline(words: &[Word], line: usize) -> Result<Pipeline, String> {
    let commands = words.split(|w| *w == Word::Pipe).map(parse_command).collect::<Result<_, _>>()?;
    Ok(Pipeline { commands, line })
}

/// Splits `$a, $b := rest` into the declared names and `rest`.
fn split_declaration(words: &[Word]) -> Result<(Vec<String>, &[Word]), String> {
    let Some(position) = words.iter().position(|w| *w == Word::Declare) else {
        return Ok((Vec::new(), words));
    };
    let (names, rest) = words.split_at(position);
    let mut variables = Vec::new();
    for word in names.iter().filter(|w| **w != Word::Comma) {
        match word {
            Word::Bare(name) if name.strip_prefix('$').is_some_and(is_identifier) => {
                variables.push(name.clone());
            }
            other => return Err(format!("bad variable declaration {other:?}")),
        }
    }
    Ok((variables, rest.get(1..).unwrap_or_default()))
}

/// Why `parse_list` stopped.
#[derive(Debug)]
enum Stop {
    /// `end`
    End,
    /// `else`, or `else if` with its condition
    Else(Option<Pipeline>),
    /// End of input.
    Eof,
}

/// Recursive-descent parser over lexed tokens.
struct Parser<'a> {
    /// Template name for errors.
    name: &'a str,
    /// Remaining tokens.
    tokens: std::vec::IntoIter<Token>,
    /// Line of the most recent action.
    line: usize,
}

impl Parser<'_> {
    /// Parse error at the current line.
    fn error(&self, message: impl Into<String>) -> TemplateError {
        parse_error(self.name, self.line, message)
    }

    /// Parses `body` as a pipeline.
    fn pipeline(&self, body: &str) -> Result<Pipeline, TemplateError> {
        let words = split_words(body).map_err(|m| self.error(m))?;
        parse_pipeline(&words, self.line).map_err(|m| self.error(m))
    }

    /// Parses nodes until `end`, `else` or end of input.
    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            let (body, line) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Token::Action { body, line } => (body, line),
            };
            self.line = line;

            let (keyword, rest) = body.split_once(char::is_whitespace).unwrap_or((&body, ""));
            let rest = rest.trim();
            match keyword {
                "end" if rest.is_empty() => return Ok((nodes, Stop::End)),
                "else" if rest.is_empty() => return Ok((nodes, Stop::Else(None))),
                "else" => {
                    let condition = rest
                        .strip_prefix("if")
                        .filter(|c| c.starts_with(char::is_whitespace))
                        .ok_or_else(|| self.error(format!("unexpected {rest:?} after else")))?;
                    let condition = self.pipeline(condition)?;
                    return Ok((nodes, Stop::Else(Some(condition))));
                }
                "if" => {
                    let condition = self.pipeline(rest)?;
                    nodes.push(self.parse_if(condition)?);
                }
                "range" => nodes.push(self.parse_range(rest)?),
                "with" => {
                    let value = self.pipeline(rest)?;
                    let (body, otherwise) = self.parse_body("with")?;
                    nodes.push(Node::With { value, body, otherwise });
                }
                _ => nodes.push(self.parse_action(&body)?),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Parses a print or declaration action.
    fn parse_action(&self, body: &str) -> Result<Node, TemplateError> {
        let words = split_words(body).map_err(|m| self.error(m))?;
        let (variables, rest) = split_declaration(&words).map_err(|m| self.error(m))?;
        let value = parse_pipeline(rest, self.line).map_err(|m| self.error(m))?;
        match variables.as_slice() {
            [] => Ok(Node::Print(value)),
            [name] => Ok(Node::Declare { name: name.clone(), value }),
            _ => Err(self.error("too many declarations")),
        }
    }

    /// Parses the branches of an `if` block.
    fn parse_if(&mut self, first: Pipeline) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = first;
        loop {
            let (body, stop) = self.parse_list()?;
            branches.push((condition, body));
            match stop {
                Stop::End => return Ok(Node::If { branches, otherwise: Vec::new() }),
                Stop::Else(Some(next)) => condition = next,
                Stop::Else(None) => {
                    let otherwise = self.parse_else_tail("if")?;
                    return Ok(Node::If { branches, otherwise });
                }
                Stop::Eof => return Err(self.error("missing end for if")),
            }
        }
    }

    /// Parses a `range` block.
    fn parse_range(&mut self, header: &str) -> Result<Node, TemplateError> {
        let words = split_words(header).map_err(|m| self.error(m))?;
        let (variables, rest) = split_declaration(&words).map_err(|m| self.error(m))?;
        if variables.len() > 2 {
            return Err(self.error("too many range variables"));
        }
        let over = parse_pipeline(rest, self.line).map_err(|m| self.error(m))?;
        let (body, otherwise) = self.parse_body("range")?;
        Ok(Node::Range { variables, over, body, otherwise })
    }

    /// Body of a `range` or `with` block and its optional `else` part.
    fn parse_body(&mut self, block: &str) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        let (body, stop) = self.parse_list()?;
        match stop {
            Stop::End => Ok((body, Vec::new())),
            Stop::Else(None) => Ok((body, self.parse_else_tail(block)?)),
            Stop::Else(Some(_)) => Err(self.error(format!("else if inside {block}"))),
            Stop::Eof => Err(self.error(format!("missing end for {block}"))),
        }
    }

    /// Parses the `else` part up to `end`.
    fn parse_else_tail(&mut self, block: &str) -> Result<Vec<Node>, TemplateError> {
        let (nodes, stop) = self.parse_list()?;
        match stop {
            Stop::End => Ok(nodes),
            Stop::Else(_) => Err(self.error(format!("unexpected else in {block}"))),
            Stop::Eof => Err(self.error(format!("missing end for {block}"))),
        }
    }
}

/// Go template truthiness.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Type name used in errors.
const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Value of a missing map key.
static NIL: Value = Value::Null;

/// Evaluated value, tagged with whether it is a map.
#[derive(Debug, Clone, Default)]
struct Datum {
    /// The value itself.
    value: Value,
    /// Missing keys read as nil instead of failing.
    map: bool,
}

impl Datum {
    /// Value that is not a map.
    const fn record(value: Value) -> Self {
        Self { value, map: false }
    }
}

/// Render state for one [`Template::render`] call.
struct Exec<'a> {
    /// Template name for error messages.
    name: &'a str,
    /// Value of `$`.
    root: &'a Value,
    /// Field names whose objects are maps.
    maps: &'a [&'a str],
    /// Variables in declaration order; blocks truncate back on exit.
    variables: Vec<(String, Datum)>,
    /// Rendered text so far.
    out: String,
}

impl Exec<'_> {
    /// Eval error at `line`.
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Eval { name: self.name.to_string(), line, message: message.into() }
    }

    /// Renders `nodes` with `.` bound to `dot`. Variables declared inside
    /// go out of scope on return.
    fn walk(&mut self, dot: &Datum, nodes: &[Node]) -> Result<(), TemplateError> {
        let scope = self.variables.len();
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Print(pipeline) => {
                    let value = self.pipeline(dot, pipeline)?;
                    self.print(&value.value, pipeline.line)?;
                }
                Node::Declare { name, value } => {
                    let value = self.pipeline(dot, value)?;
                    self.variables.push((name.clone(), value));
                }
                Node::If { branches, otherwise } => {
                    let mut chosen = otherwise;
                    for (condition, body) in branches {
                        if truthy(&self.pipeline(dot, condition)?.value) {
                            chosen = body;
                            break;
                        }
                    }
                    self.walk(dot, chosen)?;
                }
                Node::With { value, body, otherwise } => {
                    let value = self.pipeline(dot, value)?;
                    if truthy(&value.value) {
                        self.walk(&value, body)?;
                    } else {
                        self.walk(dot, otherwise)?;
                    }
                }
                Node::Range { variables, over, body, otherwise } => {
                    let value = self.pipeline(dot, over)?.value;
                    let items: Vec<(Value, Value)> = match value {
                        Value::Null => Vec::new(),
                        Value::Array(items) => {
                            items.into_iter().enumerate().map(|(i, v)| (Value::from(i), v)).collect()
                        }
                        Value::Object(map) => {
                            let mut entries: Vec<_> = map.into_iter().collect();
                            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                            entries.into_iter().map(|(k, v)| (Value::String(k), v)).collect()
                        }
                        other => {
                            return Err(self.error(
                                over.line,
                                format!("range can't iterate over {}", kind(&other)),
                            ));
                        }
                    };
                    if items.is_empty() {
                        self.walk(dot, otherwise)?;
                    }
                    for (key, item) in items {
                        let mark = self.variables.len();
                        let item = Datum::record(item);
                        match variables.as_slice() {
                            [value_name] => self.variables.push((value_name.clone(), item.clone())),
                            [key_name, value_name] => {
                                self.variables.push((key_name.clone(), Datum::record(key)));
                                self.variables.push((value_name.clone(), item.clone()));
                            }
                            _ => {}
                        }
                        self.walk(&item, body)?;
                        self.variables.truncate(mark);
                    }
                }
            }
        }
        self.variables.truncate(scope);
        Ok(())
    }

    /// Appends `value` to the output.
    fn print(&mut self, value: &Value, line: usize) -> Result<(), TemplateError> {
        match value {
            Value::Null => self.out.push_str("<no value>"),
            Value::String(s) => self.out.push_str(s),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.out.push_str(&n.to_string()),
            Value::Array(_) | Value::Object(_) => {
                let json = serde_json::to_string(value).map_err(|e| self.error(line, e.to_string()))?;
                self.out.push_str(&json);
            }
        }
        Ok(())
    }

    /// Evaluates a pipeline; each stage's result becomes the last argument
    /// of the next call.
    fn pipeline(&self, dot: &Datum, pipeline: &Pipeline) -> Result<Datum, TemplateError> {
        let mut previous: Option<Datum> = None;
        for command in &pipeline.commands {
            let value = match command {
                Command::Value(operand) => {
                    if previous.is_some() {
                        return Err(self.error(pipeline.line, "can't give argument to non-function"));
                    }
                    self.operand(dot, operand, pipeline.line)?
                }
                Command::Call { function, args } => {
                    let mut values = args
                        .iter()
                        .map(|arg| self.operand(dot, arg, pipeline.line).map(|datum| datum.value))
                        .collect::<Result<Vec<_>, _>>()?;
                    values.extend(previous.take().map(|datum| datum.value));
                    Datum::record(self.call(function, &values, pipeline.line)?)
                }
            };
            previous = Some(value);
        }
        Ok(previous.unwrap_or_default())
    }

    /// Evaluates one argument.
    fn operand(&self, dot: &Datum, operand: &Operand, line: usize) -> Result<Datum, TemplateError> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Literal(value) => Ok(Datum::record(value.clone())),
            Operand::Field(fields) => self.fields(dot, fields, line),
            Operand::Variable { name, fields } => {
                let root;
                let base = if name == "$" {
                    root = Datum::record(self.root.clone());
                    &root
                } else {
                    self.variables
                        .iter()
                        .rev()
                        .find(|(declared, _)| declared == name)
                        .map(|(_, value)| value)
                        .ok_or_else(|| self.error(line, format!("undefined variable {name}")))?
                };
                self.fields(base, fields, line)
            }
        }
    }

    /// Follows `.A.B` from `base`.
    fn fields(&self, base: &Datum, fields: &[String], line: usize) -> Result<Datum, TemplateError> {
        let mut current = &base.value;
        let mut is_map = base.map;
        for field in fields {
            current = match current {
                Value::Object(object) => match object.get(field) {
                    Some(value) => value,
                    None if is_map => &NIL,
                    None => return Err(self.error(line, format!("can't evaluate field {field}"))),
                },
                other => {
                    return Err(self.error(
                        line,
                        format!("can't evaluate field {field} in type {}", kind(other)),
                    ));
                }
            };
            is_map = self.maps.contains(&field.as_str());
        }
        Ok(Datum { value: current.clone(), map: is_map })
    }

    /// Runs a builtin; unknown names yield an empty string.
    fn call(&self, function: &str, args: &[Value], line: usize) -> Result<Value, TemplateError> {
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(self.error(line, format!("{function} expects {expected} arguments, got {}", args.len())))
            }
        };
        let value = match function {
            "not" => {
                arity(1)?;
                Value::Bool(!args.first().is_some_and(truthy))
            }
            "and" => args.iter().find(|v| !truthy(v)).or_else(|| args.last()).cloned().unwrap_or_default(),
            "or" => args.iter().find(|v| truthy(v)).or_else(|| args.last()).cloned().unwrap_or_default(),
            "eq" => match args {
                [first, rest @ ..] if !rest.is_empty() => Value::Bool(rest.contains(first)),
                _ => return Err(self.error(line, "eq expects at least 2 arguments")),
            },
            "ne" => {
                arity(2)?;
                Value::Bool(args.first() != args.get(1))
            }
            "len" => {
                arity(1)?;
                match args.first() {
                    Some(Value::String(s)) => Value::from(s.chars().count()),
                    Some(Value::Array(items)) => Value::from(items.len()),
                    Some(Value::Object(map)) => Value::from(map.len()),
                    Some(other) => return Err(self.error(line, format!("len of {}", kind(other)))),
                    None => Value::Null,
                }
            }
            // Registered helpers such as EXAMPLE are no-ops.
            _ => Value::String(String::new()),
        };
        Ok(value)
    }
}
