use std::fmt;

/// 引擎支持的全部值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int32,
    Float64,
    Bool,
    /// 只用于 print 的格式串和字符串常量
    Str,
}

impl Type {
    /// 按类型名查找，未知名称返回 None
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int32),
            "double" => Some(Type::Float64),
            "void" => Some(Type::Void),
            _ => None,
        }
    }

    pub fn llvm_name(&self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::Int32 => "i32",
            Type::Float64 => "double",
            Type::Bool => "i1",
            Type::Str => "i8*",
        }
    }

    /// 可以作为函数参数的类型
    pub fn is_parameter_type(&self) -> bool {
        matches!(self, Type::Int32 | Type::Float64)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int32 => write!(f, "int"),
            Type::Float64 => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "string"),
        }
    }
}

/// 函数签名：返回类型加有序参数类型列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub return_type: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(return_type: Type, params: Vec<Type>) -> Self {
        Self {
            return_type,
            params,
            variadic: false,
        }
    }

    pub fn variadic(return_type: Type, params: Vec<Type>) -> Self {
        Self {
            return_type,
            params,
            variadic: true,
        }
    }

    /// 检查实参个数；可变参数函数只要求不少于固定参数个数
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.variadic {
            write!(f, ", ...")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Type::from_name("int"), Some(Type::Int32));
        assert_eq!(Type::from_name("double"), Some(Type::Float64));
        assert_eq!(Type::from_name("void"), Some(Type::Void));
        assert_eq!(Type::from_name("float"), None);
    }

    #[test]
    fn test_signature_equality_is_field_by_field() {
        let a = Signature::new(Type::Float64, vec![Type::Float64]);
        assert_eq!(a, Signature::new(Type::Float64, vec![Type::Float64]));
        assert_ne!(a, Signature::new(Type::Int32, vec![Type::Float64]));
        assert_ne!(a, Signature::new(Type::Float64, vec![Type::Int32]));
        assert_ne!(a, Signature::new(Type::Float64, vec![]));
    }

    #[test]
    fn test_variadic_arity() {
        let printf = Signature::variadic(Type::Int32, vec![Type::Str]);
        assert!(printf.accepts_arity(2));
        assert!(!printf.accepts_arity(0));
        assert_eq!(printf.to_string(), "fn(string, ...) -> int");
    }
}
