//! Explicit query text attached to a repository method
//!
//! A small query language for the cases a method name cannot express:
//!
//! ```text
//! [where] <expr> [order by <path> [asc|desc], ...]
//! select <path> [where <expr>] [group by <path>] [order by <path> [asc|desc]]
//! update set <attr> = <value>, ... [where <expr>]
//! delete [where <expr>]
//! ```
//!
//! Expressions combine comparisons with `and`, `or`, `not` and parentheses.
//! Comparisons: `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`, `[not] like`,
//! `is [not] null`, `is [not] true|false`, `[not] in`, `between .. and ..`.
//! Values: `?1` (positional, 1-based), `:name` (named), `'text'`, numbers,
//! `true`, `false`, `null`.
//!
//! `select` projects a single attribute instead of whole entities. With
//! `group by` equal values collapse into one row.
//!
//! Query text is parsed with `nom` into a syntax tree, then its paths and
//! parameters are resolved once, when the method is registered. Binding
//! happens per call.

use crate::core::error::{ParseError, RepositoryError, RepositoryResult};
use crate::core::field::FieldValue;
use crate::core::metadata::{EntityMetadata, MetadataCatalog};
use crate::core::service::Mutation;
use crate::query::parser::PropertyResolver;
use crate::query::predicate::{Condition, Operand, Operator, Predicate, PropertyPath};
use crate::query::sort::{Direction, Order, Sort};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char as pchar, digit1, multispace0, satisfy};
use nom::combinator::{eof, map, map_res, not, opt, recognize, value, verify};
use nom::error::{ErrorKind, FromExternalError, ParseError as NomParseError};
use nom::multi::{fold_many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use serde::{Deserialize, Serialize};

/// How parameters in query text refer to method arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamBindingMode {
    /// `?1`, `?2`, ... in declaration order
    #[default]
    Positional,
    /// `:name`, matched against declared parameter names
    Named,
}

/// A value slot: literal or argument index (0-based)
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Literal(FieldValue),
    Param(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperandTemplate {
    None,
    Value(ValueExpr),
    Range(ValueExpr, ValueExpr),
    List(Vec<ValueExpr>),
}

/// Filter expression with unbound parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ExprTemplate {
    Condition {
        path: PropertyPath,
        operator: Operator,
        operand: OperandTemplate,
    },
    And(Vec<ExprTemplate>),
    Or(Vec<ExprTemplate>),
    Not(Box<ExprTemplate>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        filter: Option<ExprTemplate>,
        order_by: Sort,
    },
    /// Values of one attribute; `order_by` only names that attribute
    Project {
        path: PropertyPath,
        filter: Option<ExprTemplate>,
        grouped: bool,
        order_by: Sort,
    },
    Update {
        assignments: Vec<(String, ValueExpr)>,
        filter: Option<ExprTemplate>,
    },
    Delete {
        filter: Option<ExprTemplate>,
    },
}

/// A statement with every parameter replaced by its argument
#[derive(Debug, Clone, PartialEq)]
pub enum BoundStatement {
    Select {
        predicate: Option<Predicate>,
        sort: Sort,
    },
    Project {
        path: PropertyPath,
        predicate: Option<Predicate>,
        grouped: bool,
        sort: Sort,
    },
    Update {
        predicate: Option<Predicate>,
        mutation: Mutation,
    },
    Delete {
        predicate: Option<Predicate>,
    },
}

/// Parsed, validated query text
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitQuery {
    method: String,
    text: String,
    binding: ParamBindingMode,
    statement: Statement,
    arity: usize,
}

impl ExplicitQuery {
    /// Parse and validate query text for `method`
    ///
    /// `param_names` are the declared value parameter names, used when
    /// `binding` is [`ParamBindingMode::Named`].
    pub fn parse(
        method: &str,
        text: &str,
        binding: ParamBindingMode,
        param_names: &[String],
        root: &EntityMetadata,
        catalog: &MetadataCatalog,
    ) -> Result<Self, ParseError> {
        let (_, syntax) = query(text).map_err(|err| {
            let (rest, message) = match err {
                nom::Err::Error(e) | nom::Err::Failure(e) => (e.input, e.message),
                nom::Err::Incomplete(_) => ("", "incomplete query"),
            };
            ParseError::InvalidQuery {
                method: method.to_string(),
                position: text.len() - rest.len(),
                message: message.to_string(),
            }
        })?;

        let mut compiler = QueryCompiler {
            method,
            text,
            resolver: PropertyResolver::new(root, catalog, method),
            binding,
            param_names,
            max_param: None,
        };
        let statement = compiler.statement(syntax)?;
        let arity = compiler.max_param.map_or(0, |max| max + 1);

        Ok(Self {
            method: method.to_string(),
            text: text.to_string(),
            binding,
            statement,
            arity,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn binding(&self) -> ParamBindingMode {
        self.binding
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Number of leading method arguments the text refers to
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_modifying(&self) -> bool {
        matches!(
            self.statement,
            Statement::Update { .. } | Statement::Delete { .. }
        )
    }

    /// Substitute arguments; each argument is a value or a list
    pub fn bind(&self, args: &[Operand]) -> RepositoryResult<BoundStatement> {
        if args.len() < self.arity {
            return Err(RepositoryError::ArgumentCountMismatch {
                method: self.method.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }

        let bind_filter = |filter: &Option<ExprTemplate>| {
            filter
                .as_ref()
                .map(|expr| self.bind_expr(expr, args))
                .transpose()
        };

        Ok(match &self.statement {
            Statement::Select { filter, order_by } => BoundStatement::Select {
                predicate: bind_filter(filter)?,
                sort: order_by.clone(),
            },
            Statement::Project {
                path,
                filter,
                grouped,
                order_by,
            } => BoundStatement::Project {
                path: path.clone(),
                predicate: bind_filter(filter)?,
                grouped: *grouped,
                sort: order_by.clone(),
            },
            Statement::Update {
                assignments,
                filter,
            } => {
                let mut mutation = Mutation::new();
                for (attribute, value) in assignments {
                    mutation = mutation.set(attribute.clone(), self.bind_value(value, args)?);
                }
                BoundStatement::Update {
                    predicate: bind_filter(filter)?,
                    mutation,
                }
            }
            Statement::Delete { filter } => BoundStatement::Delete {
                predicate: bind_filter(filter)?,
            },
        })
    }

    fn bind_expr(&self, expr: &ExprTemplate, args: &[Operand]) -> RepositoryResult<Predicate> {
        Ok(match expr {
            ExprTemplate::Condition {
                path,
                operator,
                operand,
            } => {
                let operand = match operand {
                    OperandTemplate::None => Operand::None,
                    OperandTemplate::Value(v) => Operand::Value(self.bind_value(v, args)?),
                    OperandTemplate::Range(low, high) => Operand::Range(
                        self.bind_value(low, args)?,
                        self.bind_value(high, args)?,
                    ),
                    OperandTemplate::List(values) => Operand::List(self.bind_list(values, args)?),
                };
                Predicate::Condition(Condition::new(path.clone(), *operator, operand))
            }
            ExprTemplate::And(children) => Predicate::And(
                children
                    .iter()
                    .map(|c| self.bind_expr(c, args))
                    .collect::<RepositoryResult<_>>()?,
            ),
            ExprTemplate::Or(children) => Predicate::Or(
                children
                    .iter()
                    .map(|c| self.bind_expr(c, args))
                    .collect::<RepositoryResult<_>>()?,
            ),
            ExprTemplate::Not(inner) => self.bind_expr(inner, args)?.negate(),
        })
    }

    fn bind_value(&self, value: &ValueExpr, args: &[Operand]) -> RepositoryResult<FieldValue> {
        match value {
            ValueExpr::Literal(v) => Ok(v.clone()),
            ValueExpr::Param(index) => match args.get(*index) {
                Some(Operand::Value(v)) => Ok(v.clone()),
                Some(Operand::None) => Ok(FieldValue::Null),
                Some(_) => Err(RepositoryError::ArgumentType {
                    method: self.method.clone(),
                    index: *index,
                    expected: "a single value",
                }),
                None => Err(RepositoryError::ArgumentCountMismatch {
                    method: self.method.clone(),
                    expected: self.arity,
                    actual: args.len(),
                }),
            },
        }
    }

    fn bind_list(&self, values: &[ValueExpr], args: &[Operand]) -> RepositoryResult<Vec<FieldValue>> {
        let mut bound = Vec::with_capacity(values.len());
        for value in values {
            match value {
                ValueExpr::Param(index) => match args.get(*index) {
                    Some(Operand::List(items)) => bound.extend(items.iter().cloned()),
                    _ => bound.push(self.bind_value(value, args)?),
                },
                ValueExpr::Literal(v) => bound.push(v.clone()),
            }
        }
        Ok(bound)
    }
}

// =============================================================================
// Syntax
// =============================================================================

/// Where a syntax error was detected and what was expected there
#[derive(Debug, Clone, PartialEq)]
struct SyntaxError<'a> {
    input: &'a str,
    message: &'static str,
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            message: "unexpected input",
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    /// Keep the branch that got further
    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

impl<'a, E> FromExternalError<&'a str, E> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, _error: E) -> Self {
        Self {
            input,
            message: "invalid number",
        }
    }
}

type Res<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

/// Output paired with the input it was parsed from, for error positions
#[derive(Debug, Clone, PartialEq)]
struct Located<'a, T> {
    at: &'a str,
    node: T,
}

#[derive(Debug, Clone, PartialEq)]
enum RawValue<'a> {
    Literal(FieldValue),
    Positional(usize),
    Named(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
enum RawOperand<'a> {
    None,
    Value(Located<'a, RawValue<'a>>),
    Range(Located<'a, RawValue<'a>>, Located<'a, RawValue<'a>>),
    List(Vec<Located<'a, RawValue<'a>>>),
}

#[derive(Debug, Clone, PartialEq)]
enum RawExpr<'a> {
    Condition {
        path: Located<'a, &'a str>,
        operator: Operator,
        operand: RawOperand<'a>,
    },
    And(Vec<RawExpr<'a>>),
    Or(Vec<RawExpr<'a>>),
    Not(Box<RawExpr<'a>>),
}

type RawOrder<'a> = (Located<'a, &'a str>, Direction);

#[derive(Debug, Clone, PartialEq)]
enum RawStatement<'a> {
    Select {
        filter: Option<RawExpr<'a>>,
        order_by: Vec<RawOrder<'a>>,
    },
    Project {
        selected: Located<'a, &'a str>,
        filter: Option<RawExpr<'a>>,
        group_by: Option<Located<'a, &'a str>>,
        order_by: Vec<RawOrder<'a>>,
    },
    Update {
        assignments: Vec<(Located<'a, &'a str>, Located<'a, RawValue<'a>>)>,
        filter: Option<RawExpr<'a>>,
    },
    Delete {
        filter: Option<RawExpr<'a>>,
    },
}

/// Operator and operand following a path
struct Test<'a> {
    operator: Operator,
    operand: RawOperand<'a>,
    /// `is not true` and `is not false` wrap the condition in NOT
    negated: bool,
}

impl<'a> Test<'a> {
    fn new(operator: Operator, operand: RawOperand<'a>) -> Self {
        Self {
            operator,
            operand,
            negated: false,
        }
    }

    fn inverted(mut self) -> Self {
        self.operator = match self.operator {
            Operator::Like => Operator::NotLike,
            Operator::In => Operator::NotIn,
            other => other,
        };
        self
    }
}

const RESERVED: &[&str] = &[
    "and", "asc", "between", "by", "delete", "desc", "false", "group", "in", "is", "like", "not",
    "null", "or", "order", "select", "set", "true", "update", "where",
];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn skip_space(input: &str) -> &str {
    input.trim_start_matches([' ', '\t', '\r', '\n'])
}

fn ws<'a, O>(inner: impl FnMut(&'a str) -> Res<'a, O>) -> impl FnMut(&'a str) -> Res<'a, O> {
    preceded(multispace0, inner)
}

/// A case-insensitive keyword that is not the prefix of a longer word
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    ws(terminated(tag_no_case(word), not(satisfy(is_word_char))))
}

fn symbol<'a>(text: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    ws(tag(text))
}

/// Commit to `parser`: a miss becomes a hard error at the next token
fn expect<'a, O>(
    message: &'static str,
    mut parser: impl FnMut(&'a str) -> Res<'a, O>,
) -> impl FnMut(&'a str) -> Res<'a, O> {
    move |input: &'a str| {
        parser(input).map_err(|err| match err {
            nom::Err::Error(_) => nom::Err::Failure(SyntaxError {
                input: skip_space(input),
                message,
            }),
            other => other,
        })
    }
}

fn located<'a, O>(
    mut parser: impl FnMut(&'a str) -> Res<'a, O>,
) -> impl FnMut(&'a str) -> Res<'a, Located<'a, O>> {
    move |input: &'a str| {
        let (at, _) = multispace0::<_, SyntaxError<'a>>(input)?;
        let (rest, node) = parser(at)?;
        Ok((rest, Located { at, node }))
    }
}

fn query(input: &str) -> Res<'_, RawStatement<'_>> {
    let (input, statement) = alt((update, delete, projection, selection))(input)?;
    let (input, _) = multispace0::<_, SyntaxError<'_>>(input)?;
    let (input, _) = expect("unexpected trailing input", eof)(input)?;
    Ok((input, statement))
}

fn selection(input: &str) -> Res<'_, RawStatement<'_>> {
    let (input, _) = opt(keyword("where"))(input)?;
    let (input, filter) = opt(expr)(input)?;
    let (input, order_by) = opt(order_by)(input)?;
    Ok((
        input,
        RawStatement::Select {
            filter,
            order_by: order_by.unwrap_or_default(),
        },
    ))
}

fn projection(input: &str) -> Res<'_, RawStatement<'_>> {
    let (input, _) = keyword("select")(input)?;
    let (input, selected) = expect("expected an attribute path", located(path))(input)?;
    let (input, filter) = where_clause(input)?;
    let (input, group_by) = opt(preceded(
        pair(keyword("group"), expect("expected 'by'", keyword("by"))),
        expect("expected an attribute path", located(path)),
    ))(input)?;
    let (input, order_by) = opt(order_by)(input)?;
    Ok((
        input,
        RawStatement::Project {
            selected,
            filter,
            group_by,
            order_by: order_by.unwrap_or_default(),
        },
    ))
}

fn update(input: &str) -> Res<'_, RawStatement<'_>> {
    let (input, _) = keyword("update")(input)?;
    let (input, _) = expect("expected 'set'", keyword("set"))(input)?;
    let (input, assignments) = separated_list1(symbol(","), assignment)(input)?;
    let (input, filter) = where_clause(input)?;
    Ok((
        input,
        RawStatement::Update {
            assignments,
            filter,
        },
    ))
}

fn delete(input: &str) -> Res<'_, RawStatement<'_>> {
    let (input, _) = keyword("delete")(input)?;
    let (input, filter) = where_clause(input)?;
    Ok((input, RawStatement::Delete { filter }))
}

fn assignment(input: &str) -> Res<'_, (Located<'_, &str>, Located<'_, RawValue<'_>>)> {
    pair(
        expect("expected an attribute path", located(path)),
        preceded(
            expect("expected '='", symbol("=")),
            expect("expected a value", value_expr),
        ),
    )(input)
}

fn where_clause(input: &str) -> Res<'_, Option<RawExpr<'_>>> {
    opt(preceded(keyword("where"), expect("expected a condition", expr)))(input)
}

fn order_by(input: &str) -> Res<'_, Vec<RawOrder<'_>>> {
    preceded(
        pair(keyword("order"), expect("expected 'by'", keyword("by"))),
        expect(
            "expected an attribute path",
            separated_list1(symbol(","), pair(located(path), direction)),
        ),
    )(input)
}

fn direction(input: &str) -> Res<'_, Direction> {
    map(
        opt(alt((
            value(Direction::Asc, keyword("asc")),
            value(Direction::Desc, keyword("desc")),
        ))),
        Option::unwrap_or_default,
    )(input)
}

fn expr(input: &str) -> Res<'_, RawExpr<'_>> {
    map(separated_list1(keyword("or"), and_expr), |mut children| {
        if children.len() == 1 {
            children.remove(0)
        } else {
            RawExpr::Or(children)
        }
    })(input)
}

fn and_expr(input: &str) -> Res<'_, RawExpr<'_>> {
    map(separated_list1(keyword("and"), unary), |mut children| {
        if children.len() == 1 {
            children.remove(0)
        } else {
            RawExpr::And(children)
        }
    })(input)
}

fn unary(input: &str) -> Res<'_, RawExpr<'_>> {
    alt((
        map(preceded(keyword("not"), unary), |inner| {
            RawExpr::Not(Box::new(inner))
        }),
        delimited(symbol("("), expr, expect("expected ')'", symbol(")"))),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> Res<'_, RawExpr<'_>> {
    let (input, path) = located(path)(input)?;
    let (input, test) = alt((
        preceded(keyword("is"), is_test),
        preceded(
            keyword("not"),
            expect(
                "expected 'like' or 'in' after 'not'",
                map(alt((like_test, in_test)), Test::inverted),
            ),
        ),
        expect(
            "expected a comparison operator",
            alt((like_test, in_test, between_test, binary_test)),
        ),
    ))(input)?;

    let condition = RawExpr::Condition {
        path,
        operator: test.operator,
        operand: test.operand,
    };
    Ok((
        input,
        if test.negated {
            RawExpr::Not(Box::new(condition))
        } else {
            condition
        },
    ))
}

fn is_test(input: &str) -> Res<'_, Test<'_>> {
    let (input, negated) = opt(keyword("not"))(input)?;
    let (input, operator) = expect(
        "expected null, true or false after 'is'",
        alt((
            value(Operator::IsNull, keyword("null")),
            value(Operator::IsTrue, keyword("true")),
            value(Operator::IsFalse, keyword("false")),
        )),
    )(input)?;

    let test = match (operator, negated.is_some()) {
        (Operator::IsNull, true) => Test::new(Operator::IsNotNull, RawOperand::None),
        (operator, negated) => Test {
            negated,
            ..Test::new(operator, RawOperand::None)
        },
    };
    Ok((input, test))
}

fn like_test(input: &str) -> Res<'_, Test<'_>> {
    map(
        preceded(keyword("like"), expect("expected a value", value_expr)),
        |pattern| Test::new(Operator::Like, RawOperand::Value(pattern)),
    )(input)
}

fn in_test(input: &str) -> Res<'_, Test<'_>> {
    let list = delimited(
        symbol("("),
        separated_list1(symbol(","), expect("expected a value", value_expr)),
        expect("expected ')'", symbol(")")),
    );
    map(
        preceded(
            keyword("in"),
            expect(
                "expected a value or a list",
                alt((list, map(value_expr, |v| vec![v]))),
            ),
        ),
        |values| Test::new(Operator::In, RawOperand::List(values)),
    )(input)
}

fn between_test(input: &str) -> Res<'_, Test<'_>> {
    map(
        tuple((
            keyword("between"),
            expect("expected a value", value_expr),
            expect("expected 'and'", keyword("and")),
            expect("expected a value", value_expr),
        )),
        |(_, low, _, high)| Test::new(Operator::Between, RawOperand::Range(low, high)),
    )(input)
}

fn binary_test(input: &str) -> Res<'_, Test<'_>> {
    let operator = ws(alt((
        value(Operator::LessThanEqual, tag("<=")),
        value(Operator::GreaterThanEqual, tag(">=")),
        value(Operator::NotEquals, tag("<>")),
        value(Operator::NotEquals, tag("!=")),
        value(Operator::Equals, tag("=")),
        value(Operator::LessThan, tag("<")),
        value(Operator::GreaterThan, tag(">")),
    )));
    map(
        pair(operator, expect("expected a value", value_expr)),
        |(operator, operand)| Test::new(operator, RawOperand::Value(operand)),
    )(input)
}

/// An attribute path; keywords are never paths
fn path(input: &str) -> Res<'_, &str> {
    ws(verify(
        recognize(pair(
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_word_char),
        )),
        |word: &str| !RESERVED.iter().any(|k| k.eq_ignore_ascii_case(word)),
    ))(input)
}

fn value_expr(input: &str) -> Res<'_, Located<'_, RawValue<'_>>> {
    located(alt((
        map(quoted, |s| RawValue::Literal(FieldValue::String(s))),
        number,
        map(
            preceded(
                pchar('?'),
                expect(
                    "positional parameters are written ?1, ?2, ...",
                    verify(map_res(digit1, str::parse::<usize>), |n: &usize| *n > 0),
                ),
            ),
            RawValue::Positional,
        ),
        map(
            preceded(
                pchar(':'),
                expect(
                    "expected a parameter name after ':'",
                    take_while1(|c: char| c.is_alphanumeric() || c == '_'),
                ),
            ),
            RawValue::Named,
        ),
        value(RawValue::Literal(FieldValue::Boolean(true)), keyword("true")),
        value(RawValue::Literal(FieldValue::Boolean(false)), keyword("false")),
        value(RawValue::Literal(FieldValue::Null), keyword("null")),
    )))(input)
}

/// `'text'`, with `''` standing for one quote
fn quoted(input: &str) -> Res<'_, String> {
    let (rest, _) = pchar::<_, SyntaxError<'_>>('\'')(input)?;
    let body: Res<'_, String> = fold_many0(
        alt((is_not("'"), value("'", tag("''")))),
        String::new,
        |mut text, piece: &str| {
            text.push_str(piece);
            text
        },
    )(rest);
    let (rest, text) = body?;
    match pchar::<_, SyntaxError<'_>>('\'')(rest) {
        Ok((rest, _)) => Ok((rest, text)),
        Err(_) => Err(nom::Err::Failure(SyntaxError {
            input,
            message: "unterminated string literal",
        })),
    }
}

fn number(input: &str) -> Res<'_, RawValue<'_>> {
    let literal: Res<'_, &str> = recognize(tuple((
        opt(pchar('-')),
        digit1,
        opt(pair(pchar('.'), digit1)),
    )))(input);
    let (rest, literal) = literal?;
    let parsed = if literal.contains('.') {
        literal.parse().ok().map(FieldValue::Float)
    } else {
        literal.parse().ok().map(FieldValue::Integer)
    };
    match parsed {
        Some(number) => Ok((rest, RawValue::Literal(number))),
        None => Err(nom::Err::Failure(SyntaxError {
            input,
            message: "invalid number",
        })),
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves paths and parameters of a syntax tree against the entity model
struct QueryCompiler<'a> {
    method: &'a str,
    text: &'a str,
    resolver: PropertyResolver<'a>,
    binding: ParamBindingMode,
    param_names: &'a [String],
    max_param: Option<usize>,
}

impl QueryCompiler<'_> {
    fn statement(&mut self, syntax: RawStatement<'_>) -> Result<Statement, ParseError> {
        Ok(match syntax {
            RawStatement::Select { filter, order_by } => Statement::Select {
                filter: self.filter(filter)?,
                order_by: self.sort(&order_by)?,
            },
            RawStatement::Project {
                selected,
                filter,
                group_by,
                order_by,
            } => {
                let path = self.path(&selected)?;
                if let Some(group) = &group_by {
                    if self.path(group)? != path {
                        return Err(self.error(group.at, "group by must name the selected attribute"));
                    }
                }
                for (order, _) in &order_by {
                    if self.path(order)? != path {
                        return Err(self.error(
                            order.at,
                            "a projection can only be ordered by the selected attribute",
                        ));
                    }
                }
                Statement::Project {
                    filter: self.filter(filter)?,
                    grouped: group_by.is_some(),
                    order_by: self.sort(&order_by)?,
                    path,
                }
            }
            RawStatement::Update {
                assignments,
                filter,
            } => {
                let mut resolved = Vec::with_capacity(assignments.len());
                for (target, value) in &assignments {
                    let path = self.path(target)?;
                    if path.is_nested() {
                        return Err(self.error(target.at, &format!("cannot assign to '{path}'")));
                    }
                    resolved.push((path.leaf().to_string(), self.value(value)?));
                }
                Statement::Update {
                    assignments: resolved,
                    filter: self.filter(filter)?,
                }
            }
            RawStatement::Delete { filter } => Statement::Delete {
                filter: self.filter(filter)?,
            },
        })
    }

    fn filter(&mut self, filter: Option<RawExpr<'_>>) -> Result<Option<ExprTemplate>, ParseError> {
        filter.map(|expr| self.expr(expr)).transpose()
    }

    fn sort(&self, orders: &[RawOrder<'_>]) -> Result<Sort, ParseError> {
        let orders = orders
            .iter()
            .map(|(path, direction)| Ok(Order::new(*direction, self.path(path)?.to_string())))
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(Sort::new(orders))
    }

    fn expr(&mut self, expr: RawExpr<'_>) -> Result<ExprTemplate, ParseError> {
        Ok(match expr {
            RawExpr::Condition {
                path,
                operator,
                operand,
            } => ExprTemplate::Condition {
                path: self.path(&path)?,
                operator,
                operand: match operand {
                    RawOperand::None => OperandTemplate::None,
                    RawOperand::Value(v) => OperandTemplate::Value(self.value(&v)?),
                    RawOperand::Range(low, high) => {
                        OperandTemplate::Range(self.value(&low)?, self.value(&high)?)
                    }
                    RawOperand::List(values) => OperandTemplate::List(
                        values
                            .iter()
                            .map(|v| self.value(v))
                            .collect::<Result<_, _>>()?,
                    ),
                },
            },
            RawExpr::And(children) => ExprTemplate::And(
                children
                    .into_iter()
                    .map(|c| self.expr(c))
                    .collect::<Result<_, _>>()?,
            ),
            RawExpr::Or(children) => ExprTemplate::Or(
                children
                    .into_iter()
                    .map(|c| self.expr(c))
                    .collect::<Result<_, _>>()?,
            ),
            RawExpr::Not(inner) => ExprTemplate::Not(Box::new(self.expr(*inner)?)),
        })
    }

    fn path(&self, path: &Located<'_, &str>) -> Result<PropertyPath, ParseError> {
        self.resolver.resolve_dotted(path.node)
    }

    fn value(&mut self, value: &Located<'_, RawValue<'_>>) -> Result<ValueExpr, ParseError> {
        match &value.node {
            RawValue::Literal(literal) => Ok(ValueExpr::Literal(literal.clone())),
            RawValue::Positional(n) => {
                if self.binding != ParamBindingMode::Positional {
                    return Err(self.error(value.at, "positional parameter in a query bound by name"));
                }
                Ok(self.param(n - 1))
            }
            RawValue::Named(name) => {
                if self.binding != ParamBindingMode::Named {
                    return Err(self.error(value.at, "named parameter in a query bound by position"));
                }
                match self.param_names.iter().position(|p| p == name) {
                    Some(index) => Ok(self.param(index)),
                    None => Err(self.error(value.at, &format!("unknown parameter ':{name}'"))),
                }
            }
        }
    }

    fn param(&mut self, index: usize) -> ValueExpr {
        self.max_param = Some(self.max_param.map_or(index, |max| max.max(index)));
        ValueExpr::Param(index)
    }

    fn error(&self, at: &str, message: &str) -> ParseError {
        ParseError::InvalidQuery {
            method: self.method.to_string(),
            position: self.text.len() - at.len(),
            message: message.to_string(),
        }
    }
}
