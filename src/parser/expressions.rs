//! Expression grammar for field code
//!
//! Precedence, lowest first: conditional (`a if c else b`), `or`, `and`, `not`,
//! comparisons (chained), `+ -`, `* / // %`, unary `+ -`, `**`, then postfix
//! calls, subscripts, slices and attributes on atoms.

use chumsky::prelude::*;

use crate::lexer::{Token, TokenSpan};
use crate::parser::ast::{
    Argument, BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp,
};
use crate::parser::combinators::{literal, name, strings, token, ParserError};
use crate::parser::literals::LiteralOptions;

/// Postfix operations applied left to right after an atom
#[derive(Debug, Clone)]
enum Postfix {
    Call(Vec<Argument>),
    Index(Expr),
    Slice(Option<Expr>, Option<Expr>),
    Attribute(String),
}

/// What follows the first element inside `[ ... ]`
#[derive(Debug, Clone)]
enum ListTail {
    Display(Vec<Expr>),
    Comprehension {
        targets: Vec<String>,
        iterable: Expr,
        condition: Option<Expr>,
    },
}

/// Comma-separated names bound by `for` loops and comprehensions
pub(crate) fn loop_targets() -> impl Parser<TokenSpan, Vec<String>, Error = ParserError> + Clone {
    name().separated_by(token(Token::Comma)).at_least(1)
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

/// Parse a complete expression
pub fn expression(options: LiteralOptions) -> impl Parser<TokenSpan, Expr, Error = ParserError> + Clone {
    recursive(|expr| {
        // Parenthesised expression, tuple, or the empty tuple
        let parenthesised = token(Token::LParen)
            .ignore_then(
                expr.clone()
                    .then(token(Token::Comma).ignore_then(expr.clone()).repeated())
                    .then(token(Token::Comma).or_not())
                    .map(|((first, rest), trailing)| {
                        if rest.is_empty() && trailing.is_none() {
                            first
                        } else {
                            let mut items = vec![first];
                            items.extend(rest);
                            Expr::Tuple(items)
                        }
                    })
                    .or_not(),
            )
            .then_ignore(token(Token::RParen))
            .map(|inner| inner.unwrap_or(Expr::Tuple(Vec::new())));

        let comprehension_tail = token(Token::For)
            .ignore_then(loop_targets())
            .then_ignore(token(Token::In))
            .then(expr.clone())
            .then(token(Token::If).ignore_then(expr.clone()).or_not())
            .map(|((targets, iterable), condition)| ListTail::Comprehension {
                targets,
                iterable,
                condition,
            });

        let display_tail = token(Token::Comma)
            .ignore_then(expr.clone())
            .repeated()
            .then_ignore(token(Token::Comma).or_not())
            .map(ListTail::Display);

        let list = token(Token::LBracket)
            .ignore_then(expr.clone().then(comprehension_tail.or(display_tail)).or_not())
            .then_ignore(token(Token::RBracket))
            .map(|inner| match inner {
                None => Expr::List(Vec::new()),
                Some((first, ListTail::Display(rest))) => {
                    let mut items = vec![first];
                    items.extend(rest);
                    Expr::List(items)
                }
                Some((
                    element,
                    ListTail::Comprehension {
                        targets,
                        iterable,
                        condition,
                    },
                )) => Expr::ListComp {
                    element: Box::new(element),
                    targets,
                    iterable: Box::new(iterable),
                    condition: condition.map(Box::new),
                },
            });

        let dict = expr
            .clone()
            .then_ignore(token(Token::Colon))
            .then(expr.clone())
            .separated_by(token(Token::Comma))
            .allow_trailing()
            .delimited_by(token(Token::LBrace), token(Token::RBrace))
            .map(Expr::Dict);

        let atom = choice((
            literal(),
            strings(options),
            name().map(Expr::Name),
            parenthesised,
            list,
            dict,
        ))
        .boxed();

        // Postfix: calls, subscripts, slices, attributes
        let argument = name()
            .then_ignore(token(Token::Assign))
            .then(expr.clone())
            .map(|(key, value)| Argument::Keyword(key, value))
            .or(expr.clone().map(Argument::Positional));

        let call = argument
            .separated_by(token(Token::Comma))
            .allow_trailing()
            .delimited_by(token(Token::LParen), token(Token::RParen))
            .map(Postfix::Call);

        let subscript = expr
            .clone()
            .or_not()
            .then(token(Token::Colon).ignore_then(expr.clone().or_not()).or_not())
            .delimited_by(token(Token::LBracket), token(Token::RBracket))
            .try_map(|(start, stop), span| match (start, stop) {
                (start, Some(stop)) => Ok(Postfix::Slice(start, stop)),
                (Some(index), None) => Ok(Postfix::Index(index)),
                (None, None) => Err(Simple::custom(span, "empty subscript")),
            });

        let attribute = token(Token::Dot).ignore_then(name()).map(Postfix::Attribute);

        let postfix = atom
            .then(choice((call, subscript, attribute)).repeated())
            .foldl(|object, op| match op {
                Postfix::Call(args) => Expr::Call {
                    callee: Box::new(object),
                    args,
                },
                Postfix::Index(index) => Expr::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                },
                Postfix::Slice(start, stop) => Expr::Slice {
                    object: Box::new(object),
                    start: start.map(Box::new),
                    stop: stop.map(Box::new),
                },
                Postfix::Attribute(name) => Expr::Attribute {
                    object: Box::new(object),
                    name,
                },
            })
            .boxed();

        // Unary signs bind looser than `**`, whose exponent may itself be signed
        let signed = recursive(|signed| {
            let power = postfix
                .clone()
                .then(token(Token::DoubleStar).ignore_then(signed.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => binary(BinaryOp::Pow, base, exponent),
                    None => base,
                });

            choice((
                token(Token::Minus)
                    .ignore_then(signed.clone())
                    .map(|operand| unary(UnaryOp::Neg, operand)),
                token(Token::Plus)
                    .ignore_then(signed)
                    .map(|operand| unary(UnaryOp::Pos, operand)),
                power,
            ))
        })
        .boxed();

        let product_op = choice((
            token(Token::Star).to(BinaryOp::Mul),
            token(Token::DoubleSlash).to(BinaryOp::FloorDiv),
            token(Token::Slash).to(BinaryOp::Div),
            token(Token::Percent).to(BinaryOp::Mod),
        ));
        let product = signed
            .clone()
            .then(product_op.then(signed).repeated())
            .foldl(|left, (op, right)| binary(op, left, right))
            .boxed();

        let sum_op = choice((
            token(Token::Plus).to(BinaryOp::Add),
            token(Token::Minus).to(BinaryOp::Sub),
        ));
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated())
            .foldl(|left, (op, right)| binary(op, left, right))
            .boxed();

        let compare_op = choice((
            token(Token::EqEq).to(CompareOp::Eq),
            token(Token::NotEq).to(CompareOp::NotEq),
            token(Token::LtEq).to(CompareOp::LtEq),
            token(Token::Lt).to(CompareOp::Lt),
            token(Token::GtEq).to(CompareOp::GtEq),
            token(Token::Gt).to(CompareOp::Gt),
            token(Token::Not).then(token(Token::In)).to(CompareOp::NotIn),
            token(Token::In).to(CompareOp::In),
            token(Token::Is).then(token(Token::Not)).to(CompareOp::IsNot),
            token(Token::Is).to(CompareOp::Is),
        ));
        let comparison = sum
            .clone()
            .then(compare_op.then(sum).repeated())
            .map(|(left, links)| {
                if links.is_empty() {
                    left
                } else {
                    Expr::Compare {
                        left: Box::new(left),
                        links,
                    }
                }
            })
            .boxed();

        let negation = recursive(|negation| {
            token(Token::Not)
                .ignore_then(negation)
                .map(|operand| unary(UnaryOp::Not, operand))
                .or(comparison)
        })
        .boxed();

        let conjunction = negation
            .clone()
            .then(token(Token::And).ignore_then(negation).repeated())
            .foldl(|left, right| logical(LogicalOp::And, left, right))
            .boxed();

        let disjunction = conjunction
            .clone()
            .then(token(Token::Or).ignore_then(conjunction).repeated())
            .foldl(|left, right| logical(LogicalOp::Or, left, right))
            .boxed();

        disjunction
            .clone()
            .then(
                token(Token::If)
                    .ignore_then(disjunction)
                    .then_ignore(token(Token::Else))
                    .then(expr)
                    .or_not(),
            )
            .map(|(then, conditional)| match conditional {
                Some((condition, otherwise)) => Expr::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
                None => then,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_with_spans;
    use crate::parser::ast::Literal;

    fn parse(source: &str) -> Expr {
        expression(LiteralOptions::default())
            .then_ignore(end())
            .parse(tokenize_with_spans(source).unwrap())
            .unwrap_or_else(|errs| panic!("failed to parse {:?}: {:?}", source, errs))
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n))
    }

    fn var(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3"),
            binary(BinaryOp::Add, int(1), binary(BinaryOp::Mul, int(2), int(3)))
        );
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_minus() {
        assert_eq!(
            parse("-2 ** 3 ** 2"),
            unary(
                UnaryOp::Neg,
                binary(
                    BinaryOp::Pow,
                    int(2),
                    binary(BinaryOp::Pow, int(3), int(2))
                )
            )
        );
    }

    #[test]
    fn test_method_call_chain() {
        assert_eq!(
            parse("'why not?'.rjust(10)"),
            Expr::Call {
                callee: Box::new(Expr::Attribute {
                    object: Box::new(Expr::Literal(Literal::Str("why not?".to_string()))),
                    name: "rjust".to_string(),
                }),
                args: vec![Argument::Positional(int(10))],
            }
        );
    }

    #[test]
    fn test_keyword_arguments() {
        assert_eq!(
            parse("format('{top}! = ', top=top)"),
            Expr::Call {
                callee: Box::new(var("format")),
                args: vec![
                    Argument::Positional(Expr::Literal(Literal::Str("{top}! = ".to_string()))),
                    Argument::Keyword("top".to_string(), var("top")),
                ],
            }
        );
    }

    #[test]
    fn test_tuples_and_parens() {
        assert_eq!(parse("(1)"), int(1));
        assert_eq!(parse("(1,)"), Expr::Tuple(vec![int(1)]));
        assert_eq!(parse("()"), Expr::Tuple(vec![]));
    }

    #[test]
    fn test_list_comprehension() {
        assert_eq!(
            parse("[x * 2 for x in xs if x]"),
            Expr::ListComp {
                element: Box::new(binary(BinaryOp::Mul, var("x"), int(2))),
                targets: vec!["x".to_string()],
                iterable: Box::new(var("xs")),
                condition: Some(Box::new(var("x"))),
            }
        );
    }

    #[test]
    fn test_slices_and_index() {
        assert_eq!(
            parse("s[1:]"),
            Expr::Slice {
                object: Box::new(var("s")),
                start: Some(Box::new(int(1))),
                stop: None,
            }
        );
        assert_eq!(
            parse("s[0]"),
            Expr::Index {
                object: Box::new(var("s")),
                index: Box::new(int(0)),
            }
        );
    }

    #[test]
    fn test_chained_comparison_and_membership() {
        assert_eq!(
            parse("1 < x not in y"),
            Expr::Compare {
                left: Box::new(int(1)),
                links: vec![(CompareOp::Lt, var("x")), (CompareOp::NotIn, var("y"))],
            }
        );
    }

    #[test]
    fn test_conditional_and_logic() {
        assert_eq!(
            parse("a if not b or c else d"),
            Expr::Conditional {
                condition: Box::new(logical(
                    LogicalOp::Or,
                    unary(UnaryOp::Not, var("b")),
                    var("c")
                )),
                then: Box::new(var("a")),
                otherwise: Box::new(var("d")),
            }
        );
    }

    #[test]
    fn test_dict_display() {
        assert_eq!(
            parse("{'a': 1}"),
            Expr::Dict(vec![(Expr::Literal(Literal::Str("a".to_string())), int(1))])
        );
    }

    #[test]
    fn test_assignment_is_not_an_expression() {
        let result = expression(LiteralOptions::default())
            .then_ignore(end())
            .parse(tokenize_with_spans("x = 1").unwrap());
        assert!(result.is_err());
    }
}
