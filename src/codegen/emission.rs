//! 算术与输出指令，以及值的类型转换
use crate::codegen::context::CodegenContext;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::{BinaryOp, CastOp, FuncId, Instruction, Value};
use crate::types::{Signature, Type};

/// print 的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFormat {
    String,
    Double,
}

impl PrintFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            PrintFormat::String => "%s\n",
            PrintFormat::Double => "%f\n",
        }
    }

    fn value_type(&self) -> Type {
        match self {
            PrintFormat::String => Type::Str,
            PrintFormat::Double => Type::Float64,
        }
    }
}

impl CodegenContext {
    pub fn const_double(&self, value: f64) -> Value {
        Value::Double(value)
    }

    /// 四则运算，两个操作数都按 double 处理；常量操作数直接折叠
    pub fn binary_op(&mut self, lhs: Value, rhs: Value, op: char) -> CodegenResult<Value> {
        let op = BinaryOp::from_operator(op).ok_or(CodegenError::IllegalBinaryOp(op))?;
        let lhs = self.to_double(lhs)?;
        let rhs = self.to_double(rhs)?;

        if let (Value::Double(a), Value::Double(b)) = (&lhs, &rhs) {
            return Ok(Value::Double(op.fold(*a, *b)));
        }
        let dest = self.new_temp();
        self.emit(Instruction::Binary { dest, op, lhs, rhs })?;
        Ok(Value::Temp { id: dest, ty: Type::Float64 })
    }

    pub fn print_string(&mut self, text: &str) -> CodegenResult<()> {
        let text = self.module.intern_string(text);
        self.print_value(PrintFormat::String, Value::Str(text))
    }

    pub fn print_double(&mut self, value: Value) -> CodegenResult<()> {
        self.print_value(PrintFormat::Double, value)
    }

    /// 以给定格式调用 printf 输出一个值
    pub fn print_value(&mut self, format: PrintFormat, value: Value) -> CodegenResult<()> {
        let printf = self.printf()?;
        let value = self.coerce(value, format.value_type())?;
        let pattern = Value::Str(self.module.intern_string(format.pattern()));
        self.ensure_open()?;
        let dest = self.new_temp();
        self.emit(Instruction::Call { dest: Some(dest), callee: printf, args: vec![pattern, value] })
    }

    /// 第一次需要时声明 `i32 printf(i8*, ...)`
    fn printf(&mut self) -> CodegenResult<FuncId> {
        self.external_function("printf", Signature::variadic(Type::Int32, vec![Type::Str]))
    }

    pub(crate) fn to_double(&mut self, value: Value) -> CodegenResult<Value> {
        self.coerce(value, Type::Float64)
    }

    /// 把值转换为目标类型：整数转 double，double 转 int；常量在编译期转换
    pub(crate) fn coerce(&mut self, value: Value, to: Type) -> CodegenResult<Value> {
        let from = value.ty();
        if from == to {
            return Ok(value);
        }
        let op = match (from, to) {
            (Type::Int32, Type::Float64) => CastOp::SiToFp,
            (Type::Float64, Type::Int32) => CastOp::FpToSi,
            _ => return Err(CodegenError::TypeMismatch { expected: to, found: from }),
        };
        match value {
            Value::Int(c) => Ok(Value::Double(c as f64)),
            // as 转换在越界时饱和
            Value::Double(c) => Ok(Value::Int(c as i32)),
            value => {
                let dest = self.new_temp();
                self.emit(Instruction::Cast { dest, op, value, to })?;
                Ok(Value::Temp { id: dest, ty: to })
            }
        }
    }
}
