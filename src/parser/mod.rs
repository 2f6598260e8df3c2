//! 语法分析器
//!
//! 单遍递归下降分析。每识别出一个语法结构就立即调用代码生成引擎对应的操作，
//! 不构建语法树，事件顺序与源码顺序一致。

mod functions;
mod statements;
mod expressions;

use log::trace;

use crate::codegen::CodegenContext;
use crate::error::{CodegenResult, SscError, SscResult, SourceLocation, codegen_error, parser_error};
use crate::lexer::{Token, TokenWithLocation};

/// 语法分析器
pub struct Parser<'ctx> {
    /// 令牌流
    pub tokens: Vec<TokenWithLocation>,
    /// 当前解析位置
    pub pos: usize,
    /// 接收事件的代码生成上下文
    pub ctx: &'ctx mut CodegenContext,
    /// 定义函数时是否绑定形参
    pub bind_parameters: bool,
}

impl<'ctx> Parser<'ctx> {
    pub fn new(tokens: Vec<TokenWithLocation>, ctx: &'ctx mut CodegenContext) -> Self {
        Self {
            tokens,
            pos: 0,
            ctx,
            bind_parameters: true,
        }
    }

    /// 解析整个程序，所有事件都已送达上下文
    pub fn parse_program(&mut self) -> SscResult<()> {
        while !self.is_at_end() {
            if self.check(&Token::Func) {
                functions::parse_function(self)?;
            } else {
                statements::parse_statement(self)?;
            }
        }
        Ok(())
    }

    // 辅助方法

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    pub(crate) fn peek_token(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    pub(crate) fn current_loc(&self) -> SourceLocation {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(t) => t.loc,
            None => SourceLocation { line: 1, column: 1 },
        }
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        self.current_token() == Some(token)
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn consume(&mut self, token: &Token, message: &str) -> SscResult<()> {
        if self.match_token(token) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    pub(crate) fn consume_identifier(&mut self, message: &str) -> SscResult<String> {
        match self.current_token() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    pub(crate) fn error(&self, message: &str) -> SscError {
        let loc = self.current_loc();
        let found = match self.current_token() {
            Some(token) => format!("{:?}", token),
            None => "end of input".to_string(),
        };
        parser_error(loc.line, loc.column, format!("{} (found {})", message, found))
    }

    pub(crate) fn trace_event(&self, event: &str) {
        trace!("{} at {}", event, self.current_loc());
    }
}

/// 把引擎错误标上触发它的源码位置
pub(crate) fn located<T>(loc: SourceLocation, result: CodegenResult<T>) -> SscResult<T> {
    result.map_err(|e| codegen_error(loc, e))
}

/// 解析令牌流并把事件送入 ctx
pub fn parse(tokens: Vec<TokenWithLocation>, ctx: &mut CodegenContext, bind_parameters: bool) -> SscResult<()> {
    let mut parser = Parser::new(tokens, ctx);
    parser.bind_parameters = bind_parameters;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::error::CodegenError;
    use crate::lexer::lex;

    fn run(source: &str) -> (CodegenContext, SscResult<()>) {
        let mut ctx = CodegenContext::new(&CompileOptions::default());
        let result = parse(lex(source).unwrap(), &mut ctx, true);
        (ctx, result)
    }

    #[test]
    fn test_assignment_and_print() {
        let (ctx, result) = run("x = 3 + 4; print(x); print(\"done\");");
        result.unwrap();
        assert_eq!(ctx.variables().len(), 1);
        assert!(ctx.functions().lookup("printf").is_some());
    }

    #[test]
    fn test_if_else_chain_leaves_stack_balanced() {
        let (ctx, result) = run("if (a) { y = 1; } else if (b) { y = 2; } else { y = 3; }");
        result.unwrap();
        assert_eq!(ctx.open_conditionals(), 0);
    }

    #[test]
    fn test_function_definition_restores_cursor() {
        let (ctx, result) = run("x = 1; func double twice(double v) { return v * 2; } y = twice(x);");
        result.unwrap();
        assert_eq!(ctx.current_function(), ctx.main_function());
        assert!(ctx.variables().get("v").is_some());
    }

    #[test]
    fn test_codegen_error_carries_location() {
        let (_, result) = run("x = 1;\ny = x % 2;");
        match result.unwrap_err() {
            SscError::CodeGen { line, source, .. } => {
                assert_eq!(line, 2);
                assert_eq!(source, CodegenError::IllegalBinaryOp('%'));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        let (_, result) = run("x = ;");
        assert!(matches!(result.unwrap_err(), SscError::Parser { line: 1, column: 5, .. }));
    }

    #[test]
    fn test_nested_function_definition_is_rejected() {
        let (_, result) = run("func void f() { func void g() { } }");
        assert!(matches!(result.unwrap_err(), SscError::Parser { .. }));
    }
}
