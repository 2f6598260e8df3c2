//! 编译选项

pub const DEFAULT_MODULE_NAME: &str = "top";
pub const DEFAULT_TARGET_TRIPLE: &str = "x86_64-pc-linux-gnu";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub module_name: String,
    pub target_triple: String,
    /// 定义函数时把实参写入以形参命名的存储槽
    pub bind_parameters: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            target_triple: DEFAULT_TARGET_TRIPLE.to_string(),
            bind_parameters: true,
        }
    }
}
