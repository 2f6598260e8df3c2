use thiserror::Error;
use std::fmt;

use crate::types::Type;

/// 代码生成引擎报告的错误，每个变体对应一种致命错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Else without matching if")]
    ElseWithoutIf,

    #[error("Unmatched end of if statement")]
    UnmatchedEndIf,

    #[error("Unclosed if statement")]
    UnclosedIf,

    #[error("Function redefinition with different signature: {name}")]
    SignatureConflict { name: String },

    #[error("Function '{name}' already has a body")]
    DuplicateBody { name: String },

    #[error("Function '{name}' not found")]
    FunctionNotFound { name: String },

    #[error("Incorrect number of arguments for function '{name}'. Expected {expected}, got {found}")]
    ArgumentCount { name: String, expected: usize, found: usize },

    #[error("illegal binary operation")]
    IllegalBinaryOp(char),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Type, found: Type },

    #[error("Instruction emitted after terminator in block '{label}'")]
    TerminatedBlock { label: String },

    #[error("Block '{label}' in function '{function}' has no terminator")]
    UnterminatedBlock { function: String, label: String },

    #[error("Branch in function '{function}' targets block '{label}' outside its layout")]
    ForeignBlock { function: String, label: String },

    #[error("Function '{name}' is missing a return statement")]
    MissingReturn { name: String },

    #[error("Function '{name}' body is never closed")]
    UnclosedFunction { name: String },

    #[error("No function body is open")]
    NotInFunction,
}

pub type CodegenResult<T> = Result<T, CodegenError>;

#[derive(Error, Debug, Clone)]
pub enum SscError {
    #[error("Lexer error at line {line}, column {column}: {message}")]
    Lexer { line: usize, column: usize, message: String },

    #[error("Parser error at line {line}, column {column}: {message}")]
    Parser { line: usize, column: usize, message: String },

    #[error("Code generation error at line {line}, column {column}: {source}")]
    CodeGen {
        line: usize,
        column: usize,
        #[source]
        source: CodegenError,
    },

    #[error("Code generation error: {0}")]
    Lowering(#[from] CodegenError),

    #[error("IO error: {0}")]
    Io(String),
}

impl SscError {
    /// 若错误来自代码生成引擎，返回其具体种类
    pub fn codegen_error(&self) -> Option<&CodegenError> {
        match self {
            SscError::CodeGen { source, .. } => Some(source),
            SscError::Lowering(err) => Some(err),
            _ => None,
        }
    }
}

pub type SscResult<T> = Result<T, SscError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub fn lexer_error(line: usize, column: usize, message: impl Into<String>) -> SscError {
    SscError::Lexer {
        line,
        column,
        message: message.into(),
    }
}

pub fn parser_error(line: usize, column: usize, message: impl Into<String>) -> SscError {
    SscError::Parser {
        line,
        column,
        message: message.into(),
    }
}

pub fn codegen_error(loc: SourceLocation, source: CodegenError) -> SscError {
    SscError::CodeGen {
        line: loc.line,
        column: loc.column,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_source_wording() {
        assert_eq!(CodegenError::IllegalBinaryOp('%').to_string(), "illegal binary operation");
        assert_eq!(
            CodegenError::ArgumentCount { name: "f".into(), expected: 2, found: 1 }.to_string(),
            "Incorrect number of arguments for function 'f'. Expected 2, got 1"
        );
        assert_eq!(
            CodegenError::SignatureConflict { name: "f".into() }.to_string(),
            "Function redefinition with different signature: f"
        );
    }

    #[test]
    fn test_located_error_exposes_kind() {
        let err = codegen_error(SourceLocation { line: 3, column: 7 }, CodegenError::ElseWithoutIf);
        assert_eq!(err.codegen_error(), Some(&CodegenError::ElseWithoutIf));
        assert!(err.to_string().starts_with("Code generation error at line 3, column 7"));
    }
}
