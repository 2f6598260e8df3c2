//! 表达式解析
//!
//! 每个表达式在解析过程中直接求出一个 IR 值，常量子表达式由引擎折叠。

use crate::error::SscResult;
use crate::ir::Value;
use crate::lexer::Token;
use super::{Parser, located};

/// 解析表达式（入口点）
pub fn parse_expression(parser: &mut Parser) -> SscResult<Value> {
    parse_additive(parser)
}

/// 解析加减表达式
fn parse_additive(parser: &mut Parser) -> SscResult<Value> {
    let mut left = parse_term(parser)?;

    while matches!(parser.current_token(), Some(Token::Plus | Token::Minus)) {
        left = parse_binary_tail(parser, left, parse_term)?;
    }

    Ok(left)
}

/// 解析乘除模表达式
fn parse_term(parser: &mut Parser) -> SscResult<Value> {
    let mut left = parse_unary(parser)?;

    while matches!(parser.current_token(), Some(Token::Star | Token::Slash | Token::Percent)) {
        left = parse_binary_tail(parser, left, parse_unary)?;
    }

    Ok(left)
}

fn parse_binary_tail(
    parser: &mut Parser,
    left: Value,
    operand: fn(&mut Parser) -> SscResult<Value>,
) -> SscResult<Value> {
    let loc = parser.current_loc();
    let op = match parser.advance().as_ref().and_then(Token::operator) {
        Some(op) => op,
        None => return Err(parser.error("Expected operator")),
    };
    let right = operand(parser)?;
    located(loc, parser.ctx.binary_op(left, right, op))
}

/// 解析一元负号，按 `0 - x` 降级
fn parse_unary(parser: &mut Parser) -> SscResult<Value> {
    let loc = parser.current_loc();
    if parser.match_token(&Token::Minus) {
        let operand = parse_unary(parser)?;
        return located(loc, parser.ctx.binary_op(Value::Double(0.0), operand, '-'));
    }
    parse_primary(parser)
}

fn parse_primary(parser: &mut Parser) -> SscResult<Value> {
    let loc = parser.current_loc();

    match parser.current_token().cloned() {
        Some(Token::Number(n)) => {
            parser.advance();
            Ok(parser.ctx.const_double(n))
        }
        Some(Token::Identifier(name)) => {
            parser.advance();
            if parser.check(&Token::LParen) {
                let args = parse_arguments(parser)?;
                parser.trace_event("call");
                located(loc, parser.ctx.call(&name, args))
            } else {
                located(loc, parser.ctx.read(&name))
            }
        }
        Some(Token::LParen) => {
            parser.advance();
            let value = parse_expression(parser)?;
            parser.consume(&Token::RParen, "Expected ')' after expression")?;
            Ok(value)
        }
        _ => Err(parser.error("Expected expression")),
    }
}

fn parse_arguments(parser: &mut Parser) -> SscResult<Vec<Value>> {
    parser.consume(&Token::LParen, "Expected '(' before arguments")?;
    let mut args = Vec::new();

    if !parser.check(&Token::RParen) {
        loop {
            args.push(parse_expression(parser)?);
            if !parser.match_token(&Token::Comma) {
                break;
            }
        }
    }

    parser.consume(&Token::RParen, "Expected ')' after arguments")?;
    Ok(args)
}
