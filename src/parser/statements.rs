use crate::error::SscResult;
use crate::lexer::Token;
use super::{Parser, located};
use super::expressions::parse_expression;

pub fn parse_statement(parser: &mut Parser) -> SscResult<()> {
    match parser.current_token() {
        Some(Token::Print) => parse_print(parser),
        Some(Token::If) => parse_if(parser),
        Some(Token::Return) => parse_return(parser),
        Some(Token::Func) => Err(parser.error("Function definitions are only allowed at top level")),
        Some(Token::Identifier(_)) if parser.peek_token(1) == Some(&Token::Assign) => {
            parse_assignment(parser)
        }
        _ => {
            parse_expression(parser)?;
            parser.consume(&Token::Semicolon, "Expected ';' after expression")
        }
    }
}

fn parse_print(parser: &mut Parser) -> SscResult<()> {
    let loc = parser.current_loc();
    parser.consume(&Token::Print, "Expected 'print'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'print'")?;

    if let Some(Token::StringLiteral(text)) = parser.current_token() {
        let text = text.clone();
        parser.advance();
        parser.trace_event("print string");
        located(loc, parser.ctx.print_string(&text))?;
    } else {
        let value = parse_expression(parser)?;
        parser.trace_event("print double");
        located(loc, parser.ctx.print_double(value))?;
    }

    parser.consume(&Token::RParen, "Expected ')' after print argument")?;
    parser.consume(&Token::Semicolon, "Expected ';' after print statement")
}

/// if 语句；`else if` 作为 else 分支中唯一的语句嵌套处理
fn parse_if(parser: &mut Parser) -> SscResult<()> {
    let loc = parser.current_loc();
    parser.consume(&Token::If, "Expected 'if'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'if'")?;
    let condition = parse_expression(parser)?;
    parser.consume(&Token::RParen, "Expected ')' after if condition")?;

    parser.trace_event("begin if");
    located(loc, parser.ctx.begin_if(condition))?;
    parse_block(parser)?;

    if parser.check(&Token::Else) {
        let else_loc = parser.current_loc();
        parser.advance();
        parser.trace_event("begin else");
        located(else_loc, parser.ctx.begin_else())?;
        if parser.check(&Token::If) {
            parse_if(parser)?;
        } else {
            parse_block(parser)?;
        }
    }

    parser.trace_event("end if");
    located(loc, parser.ctx.end_if())?;
    Ok(())
}

fn parse_return(parser: &mut Parser) -> SscResult<()> {
    let loc = parser.current_loc();
    parser.consume(&Token::Return, "Expected 'return'")?;
    let value = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Token::Semicolon, "Expected ';' after return")?;
    parser.trace_event("return");
    located(loc, parser.ctx.emit_return(value))
}

fn parse_assignment(parser: &mut Parser) -> SscResult<()> {
    let loc = parser.current_loc();
    let name = parser.consume_identifier("Expected variable name")?;
    parser.consume(&Token::Assign, "Expected '=' in assignment")?;
    let value = parse_expression(parser)?;
    parser.consume(&Token::Semicolon, "Expected ';' after assignment")?;
    located(loc, parser.ctx.write(&name, value))
}

pub fn parse_block(parser: &mut Parser) -> SscResult<()> {
    parser.consume(&Token::LBrace, "Expected '{' to start block")?;
    while !parser.check(&Token::RBrace) && !parser.is_at_end() {
        parse_statement(parser)?;
    }
    parser.consume(&Token::RBrace, "Expected '}' to end block")
}
