//! Statement grammar for multi-line fields
//!
//! A statement parser yields `Vec<Stmt>` because one logical line may hold
//! several simple statements separated by `;`. Blocks are the
//! `Newline Indent ... Dedent` sequences produced by the logical-line pass.

use chumsky::prelude::*;

use crate::lexer::{Token, TokenSpan};
use crate::parser::ast::{BinaryOp, Expr, Stmt, Target};
use crate::parser::combinators::{token, ParserError};
use crate::parser::expressions::{expression, loop_targets};
use crate::parser::literals::LiteralOptions;

/// `=` or one of the augmented assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignOp {
    Plain,
    Augmented(BinaryOp),
}

fn assign_op() -> impl Parser<TokenSpan, AssignOp, Error = ParserError> + Clone {
    choice((
        token(Token::Assign).to(AssignOp::Plain),
        token(Token::PlusAssign).to(AssignOp::Augmented(BinaryOp::Add)),
        token(Token::MinusAssign).to(AssignOp::Augmented(BinaryOp::Sub)),
        token(Token::StarAssign).to(AssignOp::Augmented(BinaryOp::Mul)),
        token(Token::SlashAssign).to(AssignOp::Augmented(BinaryOp::Div)),
        token(Token::DoubleSlashAssign).to(AssignOp::Augmented(BinaryOp::FloorDiv)),
        token(Token::PercentAssign).to(AssignOp::Augmented(BinaryOp::Mod)),
        token(Token::DoubleStarAssign).to(AssignOp::Augmented(BinaryOp::Pow)),
    ))
}

/// Only names and subscripts can be assigned to
fn assignment_target(expr: Expr) -> Result<Target, &'static str> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Index { object, index } => Ok(Target::Index {
            object: *object,
            index: *index,
        }),
        _ => Err("cannot assign to expression"),
    }
}

/// Simple statements: `pass`, `break`, `continue`, assignments, expressions
fn simple_statement(
    options: LiteralOptions,
) -> impl Parser<TokenSpan, Stmt, Error = ParserError> + Clone {
    let expr_or_assignment = expression(options)
        .then(assign_op().then(expression(options)).or_not())
        .try_map(|(lhs, assignment), span| match assignment {
            None => Ok(Stmt::Expr(lhs)),
            Some((op, value)) => {
                let target =
                    assignment_target(lhs).map_err(|msg| Simple::custom(span, msg))?;
                Ok(match op {
                    AssignOp::Plain => Stmt::Assign { target, value },
                    AssignOp::Augmented(op) => Stmt::AugAssign { target, op, value },
                })
            }
        });

    choice((
        token(Token::Pass).to(Stmt::Pass),
        token(Token::Break).to(Stmt::Break),
        token(Token::Continue).to(Stmt::Continue),
        expr_or_assignment,
    ))
}

/// Parse one statement line or compound statement
pub fn statement(
    options: LiteralOptions,
) -> impl Parser<TokenSpan, Vec<Stmt>, Error = ParserError> + Clone {
    recursive(|stmt| {
        let simple_line = simple_statement(options)
            .separated_by(token(Token::Semicolon))
            .at_least(1)
            .then_ignore(token(Token::Semicolon).or_not())
            .then_ignore(token(Token::Newline))
            .boxed();

        let block = token(Token::Newline)
            .ignore_then(token(Token::Indent))
            .ignore_then(stmt.repeated().at_least(1))
            .then_ignore(token(Token::Dedent))
            .map(|lines: Vec<Vec<Stmt>>| lines.into_iter().flatten().collect::<Vec<_>>());

        let suite = block.or(simple_line.clone()).boxed();

        let header = |keyword: Token| {
            token(keyword)
                .ignore_then(expression(options))
                .then_ignore(token(Token::Colon))
                .then(suite.clone())
        };

        let if_stmt = header(Token::If)
            .then(header(Token::Elif).repeated())
            .then(
                token(Token::Else)
                    .ignore_then(token(Token::Colon))
                    .ignore_then(suite.clone())
                    .or_not(),
            )
            .map(|((first, rest), otherwise)| {
                let mut branches = vec![first];
                branches.extend(rest);
                Stmt::If {
                    branches,
                    otherwise,
                }
            });

        let for_stmt = token(Token::For)
            .ignore_then(loop_targets())
            .then_ignore(token(Token::In))
            .then(expression(options))
            .then_ignore(token(Token::Colon))
            .then(suite.clone())
            .map(|((targets, iterable), body)| Stmt::For {
                targets,
                iterable,
                body,
            });

        let while_stmt = header(Token::While).map(|(condition, body)| Stmt::While {
            condition,
            body,
        });

        choice((if_stmt, for_stmt, while_stmt))
            .map(|compound| vec![compound])
            .or(simple_line)
    })
}

/// A sequence of statements covering the whole token stream
pub fn statements(
    options: LiteralOptions,
) -> impl Parser<TokenSpan, Vec<Stmt>, Error = ParserError> + Clone {
    statement(options)
        .repeated()
        .then_ignore(end())
        .map(|lines| lines.into_iter().flatten().collect())
}
