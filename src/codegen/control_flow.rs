//! if/else 降级为基本块
//!
//! 每个尚未结束的条件语句在栈上占一帧。帧带标签：`Then` 表示仍在 then 分支中，
//! `Else` 表示已经进入 else 分支。栈顶永远对应词法上最内层的条件语句。
//!
//! 合并块在 begin_if 时创建但不挂接，直到 end_if 才追加到函数布局末尾，
//! 这样输出中的块顺序与源码顺序一致。
use log::debug;

use crate::codegen::context::CodegenContext;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{BlockId, Instruction, Terminator, Value};
use crate::types::Type;

/// 一个条件语句涉及的块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditional {
    /// 以条件跳转结束的块
    pub head: BlockId,
    /// then 块或 else 块
    pub branch: BlockId,
    pub merge: BlockId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondFrame {
    Then(Conditional),
    Else(Conditional),
}

impl CondFrame {
    pub fn conditional(&self) -> &Conditional {
        match self {
            CondFrame::Then(c) | CondFrame::Else(c) => c,
        }
    }
}

impl CodegenContext {
    /// 开始 if 语句，返回 then 块
    pub fn begin_if(&mut self, condition: Value) -> CodegenResult<BlockId> {
        self.ensure_open()?;
        let cond = self.to_condition(condition)?;

        let func = self.current_function();
        let head = self.cursor;
        let then_block = self.module.create_block(func, "then", true);
        let merge = self.module.create_block(func, "ifcont", false);
        self.terminate(Terminator::CondBr { cond, then_block, else_block: merge })?;

        self.cond_stack.push(CondFrame::Then(Conditional { head, branch: then_block, merge }));
        self.set_cursor(then_block);
        Ok(then_block)
    }

    /// 开始 else 分支，返回 else 块
    pub fn begin_else(&mut self) -> CodegenResult<BlockId> {
        let frame = match self.cond_stack.last() {
            Some(CondFrame::Then(c)) if self.cond_stack.len() > self.body_floor() => *c,
            _ => return Err(CodegenError::ElseWithoutIf),
        };
        self.cond_stack.pop();

        // then 分支的尾块（可能已不是 then 块本身）跳到合并块
        self.branch_to(frame.merge)?;

        let func = self.current_function();
        let else_block = self.module.create_block(func, "else", true);
        // 条件为假时改为进入 else 块
        self.module.retarget(frame.head, frame.merge, else_block);

        self.cond_stack.push(CondFrame::Else(Conditional { branch: else_block, ..frame }));
        self.set_cursor(else_block);
        Ok(else_block)
    }

    /// 结束 if 语句：当前块跳到合并块，挂接合并块并把插入点移到那里
    pub fn end_if(&mut self) -> CodegenResult<BlockId> {
        if self.cond_stack.len() <= self.body_floor() {
            return Err(CodegenError::UnmatchedEndIf);
        }
        let Some(frame) = self.cond_stack.pop() else {
            return Err(CodegenError::UnmatchedEndIf);
        };
        let merge = frame.conditional().merge;

        self.branch_to(merge)?;
        if self.module.attach_block(merge) {
            debug!("attached merge block '{}'", self.module.block(merge).label);
        }
        self.set_cursor(merge);
        Ok(merge)
    }

    /// 无条件跳转到 target。当前块已终结（例如分支以 return 结尾）时不再追加跳转；
    /// 当前块从入口不可达时以 unreachable 结束，不给 target 增加前驱。
    pub(crate) fn branch_to(&mut self, target: BlockId) -> CodegenResult<()> {
        if self.is_terminated() {
            debug!(
                "block '{}' already terminated, no branch to '{}'",
                self.module.block(self.cursor).label,
                self.module.block(target).label
            );
            return Ok(());
        }
        if self.is_dead() {
            debug!(
                "block '{}' is unreachable, no branch to '{}'",
                self.module.block(self.cursor).label,
                self.module.block(target).label
            );
            return self.terminate(Terminator::Unreachable);
        }
        self.terminate(Terminator::Br(target))
    }

    /// 当前函数体之下的条件栈深度，函数体内的 else/end-if 不能越过它
    pub(crate) fn body_floor(&self) -> usize {
        self.bodies.last().map_or(0, |b| b.cond_depth)
    }

    /// 非布尔条件与同类型零值做“不等于”比较
    fn to_condition(&mut self, value: Value) -> CodegenResult<Value> {
        match value {
            Value::Bool(_) => Ok(value),
            Value::Double(c) => Ok(Value::Bool(!c.is_nan() && c != 0.0)),
            Value::Int(c) => Ok(Value::Bool(c != 0)),
            v if v.ty() == Type::Bool => Ok(v),
            v if matches!(v.ty(), Type::Float64 | Type::Int32) => {
                let dest = self.new_temp();
                self.emit(Instruction::CmpNonZero { dest, value: v })?;
                Ok(Value::Temp { id: dest, ty: Type::Bool })
            }
            v => Err(CodegenError::TypeMismatch { expected: Type::Bool, found: v.ty() }),
        }
    }
}
