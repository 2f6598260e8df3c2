//! 函数注册表：声明、定义、调用与返回
use std::collections::HashMap;

use log::debug;

use crate::codegen::context::CodegenContext;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{BlockId, FuncId, FunctionState, Instruction, Terminator, Value};
use crate::types::{Signature, Type};

/// 名称到函数的映射，同名函数只能有一个签名
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: HashMap<String, FuncId>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    pub fn register(&mut self, name: &str, id: FuncId) {
        self.by_name.insert(name.to_string(), id);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// 正在生成的函数体
#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyFrame {
    pub function: FuncId,
    /// 函数体结束后插入点回到这里
    pub resume: BlockId,
    /// 进入函数体时条件栈的深度
    pub cond_depth: usize,
}

impl CodegenContext {
    /// 声明或定义函数
    ///
    /// 名称未注册时创建函数及其入口块，并把插入点移到入口块。
    /// 已注册且签名相同则原样返回，不移动插入点；只有原型（没有函数体）时才开始生成函数体。
    /// 签名不同是致命错误。
    pub fn declare_or_define(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Type>,
    ) -> CodegenResult<FuncId> {
        let id = self.register_signature(name, return_type, params)?;
        if self.module.function(id).state == FunctionState::Declared {
            self.open_body(id);
        }
        Ok(id)
    }

    /// 只登记签名（函数原型），不创建函数体
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Type>,
    ) -> CodegenResult<FuncId> {
        self.register_signature(name, return_type, params)
    }

    /// 定义函数，函数已有函数体时报错
    pub fn define_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Type>,
    ) -> CodegenResult<FuncId> {
        let had_body = self
            .functions
            .lookup(name)
            .is_some_and(|id| self.module.function(id).has_body());
        let id = self.declare_or_define(name, return_type, params)?;
        if had_body {
            return Err(CodegenError::DuplicateBody { name: name.to_string() });
        }
        Ok(id)
    }

    fn register_signature(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Type>,
    ) -> CodegenResult<FuncId> {
        if let Some(bad) = params.iter().find(|t| !t.is_parameter_type()) {
            return Err(CodegenError::TypeMismatch { expected: Type::Float64, found: *bad });
        }
        let signature = Signature::new(return_type, params);
        debug!(
            "function {} with {} parameters: {}",
            name,
            signature.params.len(),
            signature
        );

        match self.functions.lookup(name) {
            Some(id) => {
                if self.module.function(id).signature != signature {
                    return Err(CodegenError::SignatureConflict { name: name.to_string() });
                }
                Ok(id)
            }
            None => {
                let id = self.module.add_function(name, signature);
                self.functions.register(name, id);
                Ok(id)
            }
        }
    }

    fn open_body(&mut self, id: FuncId) {
        let entry = self.module.begin_body(id);
        self.bodies.push(BodyFrame {
            function: id,
            resume: self.cursor,
            cond_depth: self.cond_stack.len(),
        });
        self.set_cursor(entry);
    }

    /// 在函数入口把每个实参存入以形参命名的存储槽
    ///
    /// 槽是全局共享的，递归调用会覆盖外层调用的参数值。
    pub fn bind_parameters(&mut self, names: &[String]) -> CodegenResult<()> {
        let frame = self.bodies.last().copied().ok_or(CodegenError::NotInFunction)?;
        let params = self.module.function(frame.function).signature.params.clone();
        if names.len() != params.len() {
            return Err(CodegenError::ArgumentCount {
                name: self.module.function(frame.function).name.clone(),
                expected: params.len(),
                found: names.len(),
            });
        }
        for (index, (name, ty)) in names.iter().zip(params).enumerate() {
            self.write(name, Value::Param { index, ty })?;
        }
        Ok(())
    }

    /// 结束当前函数体并把插入点还给定义之前的位置
    pub fn end_function(&mut self) -> CodegenResult<FuncId> {
        let frame = self.bodies.last().copied().ok_or(CodegenError::NotInFunction)?;
        if self.cond_stack.len() > frame.cond_depth {
            return Err(CodegenError::UnclosedIf);
        }

        if !self.is_terminated() {
            let function = self.module.function(frame.function);
            if function.signature.return_type == Type::Void {
                self.terminate(Terminator::Ret(None))?;
            } else if self.is_dead() {
                // 所有分支都已返回后剩下的合并块
                self.terminate(Terminator::Unreachable)?;
            } else {
                return Err(CodegenError::MissingReturn { name: function.name.clone() });
            }
        }

        self.bodies.pop();
        self.module.function_mut(frame.function).state = FunctionState::Defined;
        self.set_cursor(frame.resume);
        Ok(frame.function)
    }

    /// 以当前函数的返回类型返回
    pub fn emit_return(&mut self, value: Option<Value>) -> CodegenResult<()> {
        let func = self.current_function();
        let return_type = self.module.function(func).signature.return_type;
        let term = match (return_type, value) {
            (Type::Void, None) => Terminator::Ret(None),
            (Type::Void, Some(v)) => {
                return Err(CodegenError::TypeMismatch { expected: Type::Void, found: v.ty() });
            }
            (ty, None) => {
                return Err(CodegenError::TypeMismatch { expected: ty, found: Type::Void });
            }
            (ty, Some(v)) => {
                self.ensure_open()?;
                Terminator::Ret(Some(self.coerce(v, ty)?))
            }
        };
        self.terminate(term)
    }

    /// 调用已注册的函数
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> CodegenResult<Value> {
        let id = self
            .functions
            .lookup(name)
            .ok_or_else(|| CodegenError::FunctionNotFound { name: name.to_string() })?;
        let signature = self.module.function(id).signature.clone();
        if !signature.accepts_arity(args.len()) {
            return Err(CodegenError::ArgumentCount {
                name: name.to_string(),
                expected: signature.params.len(),
                found: args.len(),
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let arg = match signature.params.get(i) {
                Some(ty) => self.coerce(arg, *ty)?,
                // 可变参数部分原样传递
                None if arg.ty() == Type::Void => {
                    return Err(CodegenError::TypeMismatch { expected: Type::Float64, found: Type::Void });
                }
                None => arg,
            };
            lowered.push(arg);
        }

        self.ensure_open()?;
        if signature.return_type == Type::Void {
            self.emit(Instruction::Call { dest: None, callee: id, args: lowered })?;
            return Ok(Value::Void);
        }
        let dest = self.new_temp();
        self.emit(Instruction::Call { dest: Some(dest), callee: id, args: lowered })?;
        Ok(Value::Temp { id: dest, ty: signature.return_type })
    }

    /// 获取外部函数，不存在时按给定签名声明
    pub(crate) fn external_function(&mut self, name: &str, signature: Signature) -> CodegenResult<FuncId> {
        match self.functions.lookup(name) {
            Some(id) if self.module.function(id).signature == signature => Ok(id),
            Some(_) => Err(CodegenError::SignatureConflict { name: name.to_string() }),
            None => {
                debug!("declaring external function {} {}", name, signature);
                let id = self.module.add_function(name, signature);
                self.functions.register(name, id);
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::CodegenContext;
    use crate::config::CompileOptions;
    use crate::error::CodegenError;
    use crate::ir::printer::render;
    use crate::ir::{FunctionState, Instruction, Terminator, Value};
    use crate::types::Type;

    fn context() -> CodegenContext {
        CodegenContext::new(&CompileOptions::default())
    }

    #[test]
    fn test_first_declaration_opens_body() {
        let mut ctx = context();
        let main_entry = ctx.current_block();
        let f = ctx.declare_or_define("f", Type::Float64, vec![Type::Float64]).unwrap();
        let function = ctx.module().function(f);
        assert_eq!(function.state, FunctionState::Defining);
        assert_eq!(function.entry, Some(ctx.current_block()));
        assert_ne!(ctx.current_block(), main_entry);
        assert_eq!(ctx.current_function(), f);
    }

    #[test]
    fn test_identical_redeclaration_returns_same_function() {
        let mut ctx = context();
        let first = ctx.declare_or_define("f", Type::Float64, vec![Type::Float64]).unwrap();
        let cursor = ctx.current_block();
        let blocks_before = ctx.module().blocks_of(first).count();

        let second = ctx.declare_or_define("f", Type::Float64, vec![Type::Float64]).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.current_block(), cursor);
        assert_eq!(ctx.module().blocks_of(first).count(), blocks_before);
        // main 与 f
        assert_eq!(ctx.functions().len(), 2);
    }

    #[test]
    fn test_conflicting_redeclaration_is_fatal() {
        let mut ctx = context();
        ctx.declare_or_define("f", Type::Float64, vec![Type::Float64]).unwrap();
        assert_eq!(
            ctx.declare_or_define("f", Type::Int32, vec![Type::Float64]).unwrap_err(),
            CodegenError::SignatureConflict { name: "f".into() }
        );
        assert_eq!(
            ctx.declare_or_define("f", Type::Float64, vec![Type::Float64, Type::Float64]).unwrap_err(),
            CodegenError::SignatureConflict { name: "f".into() }
        );
        assert_eq!(
            ctx.declare_or_define("f", Type::Float64, vec![Type::Int32]).unwrap_err(),
            CodegenError::SignatureConflict { name: "f".into() }
        );
    }

    #[test]
    fn test_prototype_then_definition() {
        let mut ctx = context();
        let main_entry = ctx.current_block();
        let f = ctx.declare_function("f", Type::Float64, vec![Type::Float64]).unwrap();
        assert_eq!(ctx.current_block(), main_entry);
        assert_eq!(ctx.module().function(f).state, FunctionState::Declared);

        let same = ctx.define_function("f", Type::Float64, vec![Type::Float64]).unwrap();
        assert_eq!(same, f);
        assert_eq!(ctx.current_function(), f);
        ctx.emit_return(Some(Value::Param { index: 0, ty: Type::Float64 })).unwrap();
        ctx.end_function().unwrap();
        assert_eq!(ctx.current_block(), main_entry);
        assert_eq!(ctx.module().function(f).state, FunctionState::Defined);
    }

    #[test]
    fn test_second_body_is_rejected() {
        let mut ctx = context();
        ctx.define_function("f", Type::Void, vec![]).unwrap();
        ctx.end_function().unwrap();
        assert_eq!(
            ctx.define_function("f", Type::Void, vec![]).unwrap_err(),
            CodegenError::DuplicateBody { name: "f".into() }
        );
    }

    #[test]
    fn test_call_unknown_function() {
        let mut ctx = context();
        assert_eq!(
            ctx.call("g", vec![Value::Double(1.0)]).unwrap_err(),
            CodegenError::FunctionNotFound { name: "g".into() }
        );
    }

    #[test]
    fn test_call_arity() {
        let mut ctx = context();
        ctx.declare_function("add", Type::Float64, vec![Type::Float64, Type::Float64]).unwrap();
        for args in [vec![Value::Double(1.0)], vec![Value::Double(1.0); 3]] {
            let found = args.len();
            assert_eq!(
                ctx.call("add", args).unwrap_err(),
                CodegenError::ArgumentCount { name: "add".into(), expected: 2, found }
            );
        }
        let result = ctx.call("add", vec![Value::Double(1.0), Value::Double(2.0)]).unwrap();
        assert_eq!(result.ty(), Type::Float64);
    }

    #[test]
    fn test_call_converts_arguments_to_parameter_types() {
        let mut ctx = context();
        let f = ctx.declare_function("f", Type::Int32, vec![Type::Int32]).unwrap();
        let x = ctx.read("x").unwrap();
        let result = ctx.call("f", vec![x]).unwrap();
        assert_eq!(result, Value::Temp { id: 2, ty: Type::Int32 });

        let block = ctx.module().block(ctx.current_block());
        assert_eq!(
            block.instructions.last(),
            Some(&Instruction::Call {
                dest: Some(2),
                callee: f,
                args: vec![Value::Temp { id: 1, ty: Type::Int32 }],
            })
        );
    }

    #[test]
    fn test_void_call_has_no_result() {
        let mut ctx = context();
        ctx.declare_function("log_it", Type::Void, vec![]).unwrap();
        assert_eq!(ctx.call("log_it", vec![]).unwrap(), Value::Void);
    }

    #[test]
    fn test_void_function_gets_implicit_return() {
        let mut ctx = context();
        let f = ctx.define_function("f", Type::Void, vec![]).unwrap();
        ctx.end_function().unwrap();
        let entry = ctx.module().function(f).entry.unwrap();
        assert_eq!(ctx.module().block(entry).terminator, Some(Terminator::Ret(None)));
    }

    #[test]
    fn test_missing_return_is_fatal() {
        let mut ctx = context();
        ctx.define_function("f", Type::Float64, vec![]).unwrap();
        assert_eq!(
            ctx.end_function().unwrap_err(),
            CodegenError::MissingReturn { name: "f".into() }
        );
    }

    #[test]
    fn test_dead_merge_block_becomes_unreachable() {
        let mut ctx = context();
        ctx.define_function("sign", Type::Float64, vec![Type::Float64]).unwrap();
        ctx.begin_if(Value::Param { index: 0, ty: Type::Float64 }).unwrap();
        ctx.emit_return(Some(Value::Double(1.0))).unwrap();
        ctx.begin_else().unwrap();
        ctx.emit_return(Some(Value::Double(-1.0))).unwrap();
        let merge = ctx.end_if().unwrap();
        ctx.end_function().unwrap();
        assert_eq!(ctx.module().block(merge).terminator, Some(Terminator::Unreachable));
        assert!(ctx.finalize().is_ok());
    }

    #[test]
    fn test_bind_parameters_stores_arguments() {
        let mut ctx = context();
        ctx.define_function("f", Type::Float64, vec![Type::Float64, Type::Int32]).unwrap();
        ctx.bind_parameters(&["a".to_string(), "n".to_string()]).unwrap();
        let a = ctx.read("a").unwrap();
        ctx.emit_return(Some(a)).unwrap();
        ctx.end_function().unwrap();

        let ir = render(&ctx.finalize().unwrap());
        assert!(ir.contains("define double @f(double %arg0, i32 %arg1) {"));
        assert!(ir.contains("store double %arg0, double* @var.a, align 8"));
        assert!(ir.contains("%t0 = sitofp i32 %arg1 to double"));
        assert!(ir.contains("store double %t0, double* @var.n, align 8"));
    }

    #[test]
    fn test_bind_parameters_outside_function() {
        let mut ctx = context();
        assert_eq!(ctx.bind_parameters(&[]).unwrap_err(), CodegenError::NotInFunction);
    }

    #[test]
    fn test_return_type_checks() {
        let mut ctx = context();
        ctx.define_function("v", Type::Void, vec![]).unwrap();
        assert_eq!(
            ctx.emit_return(Some(Value::Double(1.0))).unwrap_err(),
            CodegenError::TypeMismatch { expected: Type::Void, found: Type::Float64 }
        );
        ctx.end_function().unwrap();
        ctx.define_function("d", Type::Float64, vec![]).unwrap();
        assert_eq!(
            ctx.emit_return(None).unwrap_err(),
            CodegenError::TypeMismatch { expected: Type::Float64, found: Type::Void }
        );
    }

    #[test]
    fn test_void_parameter_is_rejected() {
        let mut ctx = context();
        assert_eq!(
            ctx.declare_or_define("f", Type::Void, vec![Type::Void]).unwrap_err(),
            CodegenError::TypeMismatch { expected: Type::Float64, found: Type::Void }
        );
    }

    #[test]
    fn test_entry_function_cannot_be_redefined() {
        let mut ctx = context();
        assert_eq!(
            ctx.define_function("main", Type::Int32, vec![]).unwrap_err(),
            CodegenError::DuplicateBody { name: "main".into() }
        );
        assert_eq!(
            ctx.define_function("main", Type::Void, vec![]).unwrap_err(),
            CodegenError::SignatureConflict { name: "main".into() }
        );
    }
}
