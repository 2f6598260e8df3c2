//! 增量 IR 构建引擎
//!
//! 语法分析器按源码顺序逐个调用这里的操作，引擎立即把对应指令写入当前插入点所在的基本块，
//! 没有回溯也没有单独的降级阶段。全部可变状态都封装在一个 `CodegenContext` 中，
//! 每次编译各自持有一个实例。

pub mod context;
mod variables;
mod control_flow;
mod functions;
mod emission;

pub use context::CodegenContext;
pub use control_flow::{CondFrame, Conditional};
pub use emission::PrintFormat;
pub use functions::FunctionRegistry;
pub use variables::VariableStore;
