//! 变量存储
//!
//! 整个程序只有一张扁平的表：标识符第一次出现时分配一个零初始化的 double 存储槽，
//! 之后所有函数共享同一个槽。没有词法作用域，函数体内的变量对其他函数同样可见。
use std::collections::HashMap;

use log::trace;

use crate::codegen::context::CodegenContext;
use crate::error::CodegenResult;
use crate::ir::{Instruction, SlotId, Value};
use crate::types::Type;

#[derive(Debug, Default)]
pub struct VariableStore {
    slots: HashMap<String, SlotId>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<SlotId> {
        self.slots.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn insert(&mut self, name: &str, slot: SlotId) {
        self.slots.insert(name.to_string(), slot);
    }
}

impl CodegenContext {
    /// 返回标识符对应的存储槽，不存在时分配。永不失败。
    pub fn resolve(&mut self, name: &str) -> SlotId {
        if let Some(slot) = self.variables.get(name) {
            return slot;
        }
        let slot = self.module.add_slot(name);
        self.variables.insert(name, slot);
        trace!("allocated storage slot for '{}'", name);
        slot
    }

    /// 把值转换为 double 后存入标识符的存储槽
    pub fn write(&mut self, name: &str, value: Value) -> CodegenResult<()> {
        let slot = self.resolve(name);
        let value = self.to_double(value)?;
        self.emit(Instruction::Store { slot, value })
    }

    /// 从标识符的存储槽加载当前值
    pub fn read(&mut self, name: &str) -> CodegenResult<Value> {
        let slot = self.resolve(name);
        let dest = self.new_temp();
        self.emit(Instruction::Load { dest, slot })?;
        Ok(Value::Temp { id: dest, ty: Type::Float64 })
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::CodegenContext;
    use crate::config::CompileOptions;
    use crate::error::CodegenError;
    use crate::ir::{Instruction, Value};
    use crate::types::Type;

    fn context() -> CodegenContext {
        CodegenContext::new(&CompileOptions::default())
    }

    #[test]
    fn test_resolve_is_stable() {
        let mut ctx = context();
        let first = ctx.resolve("x");
        let second = ctx.resolve("x");
        assert_eq!(first, second);
        assert_ne!(first, ctx.resolve("y"));
        assert_eq!(ctx.variables().len(), 2);
        assert_eq!(ctx.module().slots().len(), 2);
    }

    #[test]
    fn test_write_then_read_uses_same_slot() {
        let mut ctx = context();
        ctx.write("x", Value::Double(2.5)).unwrap();
        let loaded = ctx.read("x").unwrap();
        assert_eq!(loaded.ty(), Type::Float64);

        let slot = ctx.variables().get("x").unwrap();
        let block = ctx.module().block(ctx.current_block());
        assert_eq!(
            block.instructions,
            vec![
                Instruction::Store { slot, value: Value::Double(2.5) },
                Instruction::Load { dest: 0, slot },
            ]
        );
    }

    #[test]
    fn test_write_converts_int_to_double() {
        let mut ctx = context();
        ctx.write("n", Value::Int(3)).unwrap();
        let slot = ctx.variables().get("n").unwrap();
        let block = ctx.module().block(ctx.current_block());
        assert_eq!(block.instructions, vec![Instruction::Store { slot, value: Value::Double(3.0) }]);
    }

    #[test]
    fn test_write_rejects_string_value() {
        let mut ctx = context();
        let text = Value::Str(crate::ir::StrId(0));
        assert_eq!(
            ctx.write("s", text).unwrap_err(),
            CodegenError::TypeMismatch { expected: Type::Float64, found: Type::Str }
        );
    }

    #[test]
    fn test_variables_are_shared_across_functions() {
        let mut ctx = context();
        let outer = ctx.resolve("shared");
        ctx.declare_or_define("f", Type::Void, vec![]).unwrap();
        assert_eq!(ctx.resolve("shared"), outer);
    }
}
