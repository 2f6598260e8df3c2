pub mod error;
pub mod types;
pub mod config;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod codegen;

use log::debug;

use codegen::CodegenContext;
use config::CompileOptions;
use error::{SscError, SscResult};
use ir::Module;

pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    /// 把源码降级为 IR 模块
    pub fn lower(&self, source: &str) -> SscResult<Module> {
        // 1. 词法分析
        let tokens = lexer::lex(source)?;
        debug!("lexed {} tokens", tokens.len());

        // 2. 语法分析，同时驱动代码生成
        let mut ctx = CodegenContext::new(&self.options);
        parser::parse(tokens, &mut ctx, self.options.bind_parameters)?;

        // 3. 收尾并校验
        let module = ctx.finalize()?;
        Ok(module)
    }

    /// 生成 LLVM IR 文本
    pub fn compile_to_ir(&self, source: &str) -> SscResult<String> {
        let module = self.lower(source)?;
        Ok(ir::printer::render(&module))
    }

    /// 生成 LLVM IR 并写入 output_path
    pub fn compile(&self, source: &str, output_path: &str) -> SscResult<()> {
        let ir = self.compile_to_ir(source)?;
        std::fs::write(output_path, ir)
            .map_err(|e| SscError::Io(format!("{}: {}", output_path, e)))?;
        debug!("wrote {}", output_path);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodegenError;

    #[test]
    fn test_empty_program_returns_zero() {
        let ir = Compiler::new().compile_to_ir("").unwrap();
        assert!(ir.starts_with("; ModuleID = 'top'"));
        assert!(ir.contains("define i32 @main() {"));
        assert!(ir.contains("  ret i32 0"));
    }

    #[test]
    fn test_options_reach_module_header() {
        let options = CompileOptions {
            module_name: "demo".to_string(),
            target_triple: "aarch64-unknown-linux-gnu".to_string(),
            ..CompileOptions::default()
        };
        let module = Compiler::with_options(options).lower("x = 1;").unwrap();
        assert_eq!(module.name, "demo");
        assert_eq!(module.target_triple, "aarch64-unknown-linux-gnu");
    }

    #[test]
    fn test_unclosed_if_surfaces_at_finalize() {
        // 语法上完整的程序不会留下未闭合的 if，直接驱动上下文
        let mut ctx = CodegenContext::new(&CompileOptions::default());
        ctx.begin_if(ir::Value::Double(1.0)).unwrap();
        let err: SscError = ctx.finalize().unwrap_err().into();
        assert_eq!(err.codegen_error(), Some(&CodegenError::UnclosedIf));
        assert_eq!(err.to_string(), format!("Code generation error: {}", CodegenError::UnclosedIf));
    }

    #[test]
    fn test_compile_reports_io_failure() {
        let err = Compiler::new()
            .compile("x = 1;", "/nonexistent-dir/out.ll")
            .unwrap_err();
        assert!(matches!(err, SscError::Io(_)));
    }
}
