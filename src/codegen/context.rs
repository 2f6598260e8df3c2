//! 编译上下文：模块、插入点以及各组件的状态
use log::debug;

use crate::codegen::control_flow::CondFrame;
use crate::codegen::functions::{BodyFrame, FunctionRegistry};
use crate::codegen::variables::VariableStore;
use crate::config::CompileOptions;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{BlockId, FuncId, Instruction, Module, Terminator, Value};
use crate::types::{Signature, Type};

/// 程序入口函数名
pub const ENTRY_FUNCTION: &str = "main";

/// 单次编译的全部状态
pub struct CodegenContext {
    pub(crate) module: Module,
    pub(crate) main: FuncId,
    /// 新指令写入的块
    pub(crate) cursor: BlockId,
    pub(crate) variables: VariableStore,
    pub(crate) functions: FunctionRegistry,
    /// 尚未结束的条件语句，栈顶是最内层
    pub(crate) cond_stack: Vec<CondFrame>,
    /// 正在生成函数体的函数
    pub(crate) bodies: Vec<BodyFrame>,
}

impl CodegenContext {
    /// 创建模块，同时创建入口函数 `i32 main()` 及其入口块，并把插入点设在那里
    pub fn new(options: &CompileOptions) -> Self {
        let mut module = Module::new(options.module_name.clone(), options.target_triple.clone());
        let main = module.add_function(ENTRY_FUNCTION, Signature::new(Type::Int32, Vec::new()));
        let entry = module.begin_body(main);

        let mut functions = FunctionRegistry::new();
        functions.register(ENTRY_FUNCTION, main);

        Self {
            module,
            main,
            cursor: entry,
            variables: VariableStore::new(),
            functions,
            cond_stack: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn main_function(&self) -> FuncId {
        self.main
    }

    pub fn current_block(&self) -> BlockId {
        self.cursor
    }

    /// 插入点所在的函数
    pub fn current_function(&self) -> FuncId {
        self.module.block(self.cursor).function
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// 尚未结束的条件语句个数
    pub fn open_conditionals(&self) -> usize {
        self.cond_stack.len()
    }

    pub fn cond_stack(&self) -> &[CondFrame] {
        &self.cond_stack
    }

    pub(crate) fn set_cursor(&mut self, block: BlockId) {
        self.cursor = block;
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.module.block(self.cursor).is_terminated()
    }

    /// 当前块从函数入口不可达，例如所有分支都已返回后的合并块
    pub(crate) fn is_dead(&self) -> bool {
        !self.module.is_reachable(self.cursor)
    }

    /// 当前块已有终结指令时报错
    pub(crate) fn ensure_open(&self) -> CodegenResult<()> {
        let block = self.module.block(self.cursor);
        if block.is_terminated() {
            return Err(CodegenError::TerminatedBlock { label: block.label.clone() });
        }
        Ok(())
    }

    pub(crate) fn new_temp(&mut self) -> u32 {
        let func = self.current_function();
        self.module.new_temp(func)
    }

    /// 向当前块追加指令
    pub(crate) fn emit(&mut self, inst: Instruction) -> CodegenResult<()> {
        self.module.push_instruction(self.cursor, inst)
    }

    /// 给当前块设置终结指令
    pub(crate) fn terminate(&mut self, term: Terminator) -> CodegenResult<()> {
        self.module.set_terminator(self.cursor, term)
    }

    /// 在当前块插入程序返回 `ret i32 0`
    pub fn emit_program_return(&mut self) -> CodegenResult<()> {
        self.terminate(Terminator::Ret(Some(Value::Int(0))))
    }

    /// 结束编译：补上程序返回，检查所有块都已终结，交出模块
    pub fn finalize(mut self) -> CodegenResult<Module> {
        if let Some(frame) = self.bodies.last() {
            return Err(CodegenError::UnclosedFunction {
                name: self.module.function(frame.function).name.clone(),
            });
        }
        if !self.cond_stack.is_empty() {
            return Err(CodegenError::UnclosedIf);
        }
        if !self.is_terminated() {
            self.emit_program_return()?;
        }
        self.module.verify()?;

        debug!(
            "finalized module '{}': {} functions, {} storage slots",
            self.module.name,
            self.module.function_count(),
            self.module.slots().len()
        );
        Ok(self.module)
    }
}
