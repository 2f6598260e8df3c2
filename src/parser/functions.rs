//! 函数原型与函数定义

use crate::error::SscResult;
use crate::lexer::Token;
use crate::types::Type;
use super::{Parser, located};
use super::statements::parse_block;

/// 解析返回类型或参数类型
fn parse_type(parser: &mut Parser) -> SscResult<Type> {
    let ty = match parser.current_token() {
        Some(Token::Int) => Type::Int32,
        Some(Token::Double) => Type::Float64,
        Some(Token::Void) => Type::Void,
        _ => return Err(parser.error("Expected type")),
    };
    parser.advance();
    Ok(ty)
}

fn parse_parameters(parser: &mut Parser) -> SscResult<Vec<(Type, String)>> {
    parser.consume(&Token::LParen, "Expected '(' after function name")?;
    let mut params = Vec::new();

    if !parser.check(&Token::RParen) {
        loop {
            if parser.check(&Token::Void) {
                return Err(parser.error("Parameter type must be int or double"));
            }
            let ty = parse_type(parser)?;
            let name = parser.consume_identifier("Expected parameter name")?;
            params.push((ty, name));
            if !parser.match_token(&Token::Comma) {
                break;
            }
        }
    }

    parser.consume(&Token::RParen, "Expected ')' after parameters")?;
    Ok(params)
}

/// `func` 类型 名称 `(` 参数 `)`，后跟 `;`（原型）或函数体
pub fn parse_function(parser: &mut Parser) -> SscResult<()> {
    let loc = parser.current_loc();
    parser.consume(&Token::Func, "Expected 'func'")?;
    let return_type = parse_type(parser)?;
    let name = parser.consume_identifier("Expected function name")?;
    let params = parse_parameters(parser)?;
    let (types, names): (Vec<Type>, Vec<String>) = params.into_iter().unzip();

    if parser.match_token(&Token::Semicolon) {
        parser.trace_event("function prototype");
        located(loc, parser.ctx.declare_function(&name, return_type, types))?;
        return Ok(());
    }

    parser.trace_event("function definition");
    located(loc, parser.ctx.define_function(&name, return_type, types))?;
    if parser.bind_parameters {
        located(loc, parser.ctx.bind_parameters(&names))?;
    }

    parse_block(parser)?;
    // 缺少 return 等错误报告在函数体的右花括号处
    let end_loc = parser.tokens.get(parser.pos.saturating_sub(1)).map_or(loc, |t| t.loc);
    located(end_loc, parser.ctx.end_function())?;
    Ok(())
}
