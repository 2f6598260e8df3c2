//! 值、基本块与模块模型
//!
//! 代码生成引擎把指令直接追加到这里的基本块中，最终由 `printer` 渲染为 LLVM IR 文本。
//! 所有块存放在模块级的表中，函数只记录自己的块布局（按挂接顺序）。

pub mod printer;

use std::collections::{HashMap, HashSet};

use crate::error::{CodegenError, CodegenResult};
use crate::types::{Signature, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub usize);

/// 带类型的值句柄
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Int(i32),
    Bool(bool),
    /// 指向字符串常量首字节的指针
    Str(StrId),
    /// 指令结果
    Temp { id: u32, ty: Type },
    /// 当前函数的第 index 个参数
    Param { index: usize, ty: Type },
    /// void 函数调用的“结果”
    Void,
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Double(_) => Type::Float64,
            Value::Int(_) => Type::Int32,
            Value::Bool(_) => Type::Bool,
            Value::Str(_) => Type::Str,
            Value::Temp { ty, .. } | Value::Param { ty, .. } => *ty,
            Value::Void => Type::Void,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl BinaryOp {
    pub fn from_operator(op: char) -> Option<BinaryOp> {
        match op {
            '+' => Some(BinaryOp::FAdd),
            '-' => Some(BinaryOp::FSub),
            '*' => Some(BinaryOp::FMul),
            '/' => Some(BinaryOp::FDiv),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
        }
    }

    pub fn fold(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::FAdd => lhs + rhs,
            BinaryOp::FSub => lhs - rhs,
            BinaryOp::FMul => lhs * rhs,
            BinaryOp::FDiv => lhs / rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    SiToFp,
    FpToSi,
}

impl CastOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CastOp::SiToFp => "sitofp",
            CastOp::FpToSi => "fptosi",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Load { dest: u32, slot: SlotId },
    Store { slot: SlotId, value: Value },
    Binary { dest: u32, op: BinaryOp, lhs: Value, rhs: Value },
    /// 与同类型零值比较，产生 i1
    CmpNonZero { dest: u32, value: Value },
    Cast { dest: u32, op: CastOp, value: Value, to: Type },
    Call { dest: Option<u32>, callee: FuncId, args: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br(BlockId),
    CondBr { cond: Value, then_block: BlockId, else_block: BlockId },
    Ret(Option<Value>),
    Unreachable,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr { then_block, else_block, .. } => vec![*then_block, *else_block],
            Terminator::Ret(_) | Terminator::Unreachable => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    /// 所属函数，创建时即确定
    pub function: FuncId,
    /// 是否已挂接到函数的块布局中
    pub attached: bool,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// 函数的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    /// 只有签名（原型或外部函数）
    Declared,
    /// 函数体正在生成
    Defining,
    Defined,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub signature: Signature,
    pub state: FunctionState,
    pub entry: Option<BlockId>,
    /// 已挂接的块，按挂接顺序
    pub layout: Vec<BlockId>,
    temp_counter: u32,
    label_counter: usize,
}

impl Function {
    pub fn has_body(&self) -> bool {
        self.entry.is_some()
    }
}

/// 一个存储槽对应一个源语言标识符
#[derive(Debug, Clone)]
pub struct StorageSlot {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub target_triple: String,
    functions: Vec<Function>,
    blocks: Vec<BasicBlock>,
    slots: Vec<StorageSlot>,
    strings: Vec<String>,
    string_index: HashMap<String, StrId>,
}

impl Module {
    pub fn new(name: impl Into<String>, target_triple: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_triple: target_triple.into(),
            functions: Vec::new(),
            blocks: Vec::new(),
            slots: Vec::new(),
            strings: Vec::new(),
            string_index: HashMap::new(),
        }
    }

    // ---- 函数 ----

    /// 添加只有签名的函数。名称唯一性由函数注册表保证。
    pub fn add_function(&mut self, name: &str, signature: Signature) -> FuncId {
        let id = FuncId(self.functions.len());
        self.functions.push(Function {
            name: name.to_string(),
            signature,
            state: FunctionState::Declared,
            entry: None,
            layout: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
        });
        id
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions.iter().enumerate().map(|(i, f)| (FuncId(i), f))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// 为函数创建入口块并进入 Defining 状态
    pub fn begin_body(&mut self, func: FuncId) -> BlockId {
        let entry = self.create_block(func, "entry", true);
        let function = self.function_mut(func);
        function.entry = Some(entry);
        function.state = FunctionState::Defining;
        entry
    }

    /// 分配函数内唯一的临时值编号
    pub fn new_temp(&mut self, func: FuncId) -> u32 {
        let function = self.function_mut(func);
        let id = function.temp_counter;
        function.temp_counter += 1;
        id
    }

    // ---- 基本块 ----

    /// 创建属于 func 的新块。`attach` 为 false 时块暂不进入布局（用于合并块）。
    pub fn create_block(&mut self, func: FuncId, prefix: &str, attach: bool) -> BlockId {
        let label = if prefix == "entry" && self.function(func).entry.is_none() {
            prefix.to_string()
        } else {
            let function = self.function_mut(func);
            let label = format!("{}.{}", prefix, function.label_counter);
            function.label_counter += 1;
            label
        };
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            label,
            function: func,
            attached: false,
            instructions: Vec::new(),
            terminator: None,
        });
        if attach {
            self.attach_block(id);
        }
        id
    }

    /// 把块追加到所属函数的布局末尾。重复挂接不做任何事，返回是否实际挂接。
    pub fn attach_block(&mut self, block: BlockId) -> bool {
        let func = self.blocks[block.0].function;
        if self.blocks[block.0].attached {
            return false;
        }
        self.blocks[block.0].attached = true;
        self.functions[func.0].layout.push(block);
        true
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn blocks_of(&self, func: FuncId) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.function == func)
            .map(|(i, b)| (BlockId(i), b))
    }

    pub fn push_instruction(&mut self, block: BlockId, inst: Instruction) -> CodegenResult<()> {
        let target = &mut self.blocks[block.0];
        if target.is_terminated() {
            return Err(CodegenError::TerminatedBlock { label: target.label.clone() });
        }
        target.instructions.push(inst);
        Ok(())
    }

    pub fn set_terminator(&mut self, block: BlockId, term: Terminator) -> CodegenResult<()> {
        let target = &mut self.blocks[block.0];
        if target.is_terminated() {
            return Err(CodegenError::TerminatedBlock { label: target.label.clone() });
        }
        target.terminator = Some(term);
        Ok(())
    }

    /// 把 block 终结指令中指向 from 的边改为指向 to
    pub fn retarget(&mut self, block: BlockId, from: BlockId, to: BlockId) {
        let redirect = |target: &mut BlockId| {
            if *target == from {
                *target = to;
            }
        };
        match self.blocks[block.0].terminator.as_mut() {
            Some(Terminator::Br(target)) => redirect(target),
            Some(Terminator::CondBr { then_block, else_block, .. }) => {
                redirect(then_block);
                redirect(else_block);
            }
            _ => {}
        }
    }

    /// 同一函数内以 block 为后继的所有块
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        let func = self.blocks[block.0].function;
        self.blocks_of(func)
            .filter(|(_, b)| {
                b.terminator
                    .as_ref()
                    .is_some_and(|t| t.successors().contains(&block))
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// 从所属函数的入口块沿终结指令的边能否到达 block
    pub fn is_reachable(&self, block: BlockId) -> bool {
        let func = self.blocks[block.0].function;
        let Some(entry) = self.function(func).entry else {
            return false;
        };
        let mut visited = HashSet::new();
        let mut pending = vec![entry];
        while let Some(current) = pending.pop() {
            if current == block {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(term) = &self.blocks[current.0].terminator {
                pending.extend(term.successors());
            }
        }
        false
    }

    // ---- 存储槽与字符串常量 ----

    pub fn add_slot(&mut self, name: &str) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(StorageSlot { name: name.to_string() });
        id
    }

    pub fn slot(&self, id: SlotId) -> &StorageSlot {
        &self.slots[id.0]
    }

    pub fn slots(&self) -> &[StorageSlot] {
        &self.slots
    }

    /// 获取或创建字符串常量
    pub fn intern_string(&mut self, s: &str) -> StrId {
        if let Some(id) = self.string_index.get(s) {
            return *id;
        }
        let id = StrId(self.strings.len());
        self.strings.push(s.to_string());
        self.string_index.insert(s.to_string(), id);
        id
    }

    pub fn string(&self, id: StrId) -> &str {
        &self.strings[id.0]
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// 检查所有已定义函数：块都有终结指令且只跳转到本函数的块
    pub fn verify(&self) -> CodegenResult<()> {
        for (func_id, function) in self.functions() {
            if !function.has_body() {
                continue;
            }
            for (_, block) in self.blocks_of(func_id) {
                let term = block.terminator.as_ref().ok_or_else(|| CodegenError::UnterminatedBlock {
                    function: function.name.clone(),
                    label: block.label.clone(),
                })?;
                for target in term.successors() {
                    let target_block = self.block(target);
                    if target_block.function != func_id || !target_block.attached {
                        return Err(CodegenError::ForeignBlock {
                            function: function.name.clone(),
                            label: target_block.label.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
