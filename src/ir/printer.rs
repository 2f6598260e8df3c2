//! 模块的 LLVM IR 文本渲染
use std::fmt;

use crate::ir::{BlockId, Function, Instruction, Module, StrId, Terminator, Value};
use crate::types::Type;

/// 渲染整个模块
pub fn render(module: &Module) -> String {
    let mut printer = Printer::new(module);
    printer.emit_module();
    printer.output
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

/// double 常量：2^53 以内的整数值用十进制，其余用精确的十六进制位模式
pub fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{:.1}", value)
    } else {
        format!("0x{:016X}", value.to_bits())
    }
}

/// 转义字符串常量中的非打印字符
pub fn escape_bytes(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'"' | b'\\' => escaped.push_str(&format!("\\{:02X}", byte)),
            0x20..=0x7E => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:02X}", byte)),
        }
    }
    escaped
}

struct Printer<'m> {
    module: &'m Module,
    output: String,
    indent: usize,
}

impl<'m> Printer<'m> {
    fn new(module: &'m Module) -> Self {
        Self {
            module,
            output: String::new(),
            indent: 0,
        }
    }

    fn emit_line(&mut self, line: &str) {
        if !line.is_empty() {
            self.output.push_str(&"  ".repeat(self.indent));
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_module(&mut self) {
        let module = self.module;
        self.emit_line(&format!("; ModuleID = '{}'", module.name));
        self.emit_line(&format!("source_filename = \"{}\"", module.name));
        self.emit_line(&format!("target triple = \"{}\"", module.target_triple));
        self.emit_line("");

        if !module.strings().is_empty() {
            for (i, s) in module.strings().iter().enumerate() {
                self.emit_line(&format!(
                    "@.str.{} = private unnamed_addr constant [{} x i8] c\"{}\\00\", align 1",
                    i,
                    s.len() + 1,
                    escape_bytes(s)
                ));
            }
            self.emit_line("");
        }

        if !module.slots().is_empty() {
            for slot in module.slots() {
                self.emit_line(&format!("@var.{} = global double 0.0, align 8", slot.name));
            }
            self.emit_line("");
        }

        for (_, function) in module.functions() {
            if function.has_body() {
                self.emit_definition(function);
            } else {
                self.emit_declaration(function);
            }
        }
    }

    fn emit_declaration(&mut self, function: &Function) {
        let mut params: Vec<String> = function
            .signature
            .params
            .iter()
            .map(|t| t.llvm_name().to_string())
            .collect();
        if function.signature.variadic {
            params.push("...".to_string());
        }
        self.emit_line(&format!(
            "declare {} @{}({})",
            function.signature.return_type.llvm_name(),
            function.name,
            params.join(", ")
        ));
        self.emit_line("");
    }

    fn emit_definition(&mut self, function: &Function) {
        let params: Vec<String> = function
            .signature
            .params
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{} %arg{}", t.llvm_name(), i))
            .collect();
        self.emit_line(&format!(
            "define {} @{}({}) {{",
            function.signature.return_type.llvm_name(),
            function.name,
            params.join(", ")
        ));
        for block in &function.layout {
            self.emit_block(*block);
        }
        self.emit_line("}");
        self.emit_line("");
    }

    fn emit_block(&mut self, id: BlockId) {
        let module = self.module;
        let block = module.block(id);
        self.emit_line(&format!("{}:", block.label));
        self.indent += 1;
        for inst in &block.instructions {
            let line = self.instruction(inst);
            self.emit_line(&line);
        }
        if let Some(term) = &block.terminator {
            let line = self.terminator(term);
            self.emit_line(&line);
        }
        self.indent -= 1;
    }

    fn instruction(&self, inst: &Instruction) -> String {
        match inst {
            Instruction::Load { dest, slot } => format!(
                "%t{} = load double, double* @var.{}, align 8",
                dest,
                self.module.slot(*slot).name
            ),
            Instruction::Store { slot, value } => format!(
                "store {}, double* @var.{}, align 8",
                self.typed(value),
                self.module.slot(*slot).name
            ),
            Instruction::Binary { dest, op, lhs, rhs } => format!(
                "%t{} = {} double {}, {}",
                dest,
                op.mnemonic(),
                self.value(lhs),
                self.value(rhs)
            ),
            Instruction::CmpNonZero { dest, value } => match value.ty() {
                Type::Float64 => format!("%t{} = fcmp one double {}, 0.0", dest, self.value(value)),
                ty => format!("%t{} = icmp ne {} {}, 0", dest, ty.llvm_name(), self.value(value)),
            },
            Instruction::Cast { dest, op, value, to } => format!(
                "%t{} = {} {} to {}",
                dest,
                op.mnemonic(),
                self.typed(value),
                to.llvm_name()
            ),
            Instruction::Call { dest, callee, args } => {
                let function = self.module.function(*callee);
                let sig = &function.signature;
                let args: Vec<String> = args.iter().map(|a| self.typed(a)).collect();
                // 可变参数函数的调用需要写出完整函数类型
                let callee_ty = if sig.variadic {
                    let mut params: Vec<&str> = sig.params.iter().map(|t| t.llvm_name()).collect();
                    params.push("...");
                    format!("{} ({})", sig.return_type.llvm_name(), params.join(", "))
                } else {
                    sig.return_type.llvm_name().to_string()
                };
                let call = format!("call {} @{}({})", callee_ty, function.name, args.join(", "));
                match dest {
                    Some(dest) => format!("%t{} = {}", dest, call),
                    None => call,
                }
            }
        }
    }

    fn terminator(&self, term: &Terminator) -> String {
        match term {
            Terminator::Br(target) => format!("br label %{}", self.module.block(*target).label),
            Terminator::CondBr { cond, then_block, else_block } => format!(
                "br i1 {}, label %{}, label %{}",
                self.value(cond),
                self.module.block(*then_block).label,
                self.module.block(*else_block).label
            ),
            Terminator::Ret(Some(value)) => format!("ret {}", self.typed(value)),
            Terminator::Ret(None) => "ret void".to_string(),
            Terminator::Unreachable => "unreachable".to_string(),
        }
    }

    fn typed(&self, value: &Value) -> String {
        format!("{} {}", value.ty().llvm_name(), self.value(value))
    }

    fn value(&self, value: &Value) -> String {
        match value {
            Value::Double(v) => format_double(*v),
            Value::Int(v) => v.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Str(id) => self.string_pointer(*id),
            Value::Temp { id, .. } => format!("%t{}", id),
            Value::Param { index, .. } => format!("%arg{}", index),
            Value::Void => "void".to_string(),
        }
    }

    fn string_pointer(&self, id: StrId) -> String {
        let len = self.module.string(id).len() + 1;
        format!(
            "getelementptr inbounds ([{len} x i8], [{len} x i8]* @.str.{}, i64 0, i64 0)",
            id.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Module};
    use crate::types::Signature;

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(7.0), "7.0");
        assert_eq!(format_double(-3.0), "-3.0");
        assert_eq!(format_double(0.5), "0x3FE0000000000000");
        assert_eq!(format_double(f64::INFINITY), "0x7FF0000000000000");
    }

    #[test]
    fn test_escape_bytes() {
        assert_eq!(escape_bytes("%f\n"), "%f\\0A");
        assert_eq!(escape_bytes("say \"hi\""), "say \\22hi\\22");
    }

    #[test]
    fn test_render_small_function() {
        let mut module = Module::new("top", "x86_64-pc-linux-gnu");
        let f = module.add_function("f", Signature::new(Type::Float64, vec![Type::Float64]));
        let entry = module.begin_body(f);
        let dest = module.new_temp(f);
        module
            .push_instruction(
                entry,
                Instruction::Binary {
                    dest,
                    op: BinaryOp::FMul,
                    lhs: Value::Param { index: 0, ty: Type::Float64 },
                    rhs: Value::Double(2.0),
                },
            )
            .unwrap();
        module
            .set_terminator(entry, Terminator::Ret(Some(Value::Temp { id: dest, ty: Type::Float64 })))
            .unwrap();
        module.add_function("g", Signature::new(Type::Void, vec![Type::Int32]));

        let ir = render(&module);
        assert!(ir.contains("target triple = \"x86_64-pc-linux-gnu\""));
        assert!(ir.contains("define double @f(double %arg0) {\nentry:\n  %t0 = fmul double %arg0, 2.0\n  ret double %t0\n}"));
        assert!(ir.contains("declare void @g(i32)"));
    }
}
