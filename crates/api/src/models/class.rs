//! Mutable in-memory representation of a class as handed to transformers
//! before definition.

use super::annotation::{AnnotationRef, AnnotationType};
use super::identifier::{FieldIdentifier, MethodIdentifier};
use super::naming;
use crate::error::ApiResult;
use crate::hook::HookCall;
use crate::inject::{Instance, Key};
use crate::service::HandlerType;
use ristretto_classfile::attributes::{Attribute, Instruction};
use ristretto_classfile::{BaseType, ClassFile, ConstantPool, FieldType};
pub use ristretto_classfile::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Directly callable entry point of a method: `(receiver, arguments) -> return value`.
pub type MethodInvoker =
    Arc<dyn Fn(&Instance, &[Instance]) -> ApiResult<Option<Instance>> + Send + Sync>;

/// Looks up classes by binary name.
pub trait ClassPool: Send + Sync {
    fn class(&self, name: &str) -> Option<Arc<ClassNode>>;
}

#[derive(Debug, Clone)]
pub struct ClassNode {
    /// Binary name, e.g. `net.game.Entity`.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: ClassAccessFlags,
    pub annotations: Vec<AnnotationRef>,
    pub methods: Vec<MethodNode>,
    pub fields: Vec<FieldNode>,
    /// Set when the class is a [`crate::ServiceHandler`] implementation.
    pub handler: Option<HandlerType>,
}

impl ClassNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: None,
            interfaces: Vec::new(),
            access: ClassAccessFlags::PUBLIC,
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            handler: None,
        }
    }

    /// Parses raw class file bytes. Method bodies keep their return and throw
    /// points; every other instruction becomes an opaque mnemonic.
    pub fn from_class_file(bytes: &[u8]) -> ApiResult<Self> {
        let class = ClassFile::from_bytes(&mut Cursor::new(bytes))?;
        let pool = &class.constant_pool;

        let mut node = ClassNode::new(naming::to_binary(class.class_name()?)).with_access(class.access_flags);
        if class.super_class != 0 {
            node.super_name = Some(naming::to_binary(pool.try_get_class(class.super_class)?));
        }
        for &interface in &class.interfaces {
            node.interfaces.push(naming::to_binary(pool.try_get_class(interface)?));
        }

        for method in &class.methods {
            let name = pool.try_get_utf8(method.name_index)?;
            let descriptor = pool.try_get_utf8(method.descriptor_index)?;
            let (parameters, return_type) = FieldType::parse_method_descriptor(descriptor)?;

            let body = method
                .attributes
                .iter()
                .find_map(|attribute| match attribute {
                    Attribute::Code { code, .. } => Some(code.iter().map(Insn::from_instruction).collect()),
                    _ => None,
                })
                .unwrap_or_default();

            node.methods.push(
                MethodNode::new(
                    name,
                    parameters.iter().map(|p| Parameter::of(field_type_name(p))).collect(),
                    return_type.as_ref().map_or_else(|| "void".to_string(), field_type_name),
                )
                .with_access(method.access_flags)
                .with_body(body),
            );
        }

        for field in &class.fields {
            let mut field_node = FieldNode::new(pool.try_get_utf8(field.name_index)?, field_type_name(&field.field_type));
            field_node.access = field.access_flags;
            node.fields.push(field_node);
        }

        Ok(node)
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_access(mut self, access: ClassAccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationRef) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_method(mut self, method: MethodNode) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_handler(mut self, handler: HandlerType) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn is_public(&self) -> bool {
        self.access.contains(ClassAccessFlags::PUBLIC)
    }

    /// Widens the class to public. Returns `true` if the flags changed.
    pub fn make_public(&mut self) -> bool {
        if self.is_public() {
            return false;
        }
        self.access.insert(ClassAccessFlags::PUBLIC);
        true
    }

    pub fn has_annotation(&self, kind: &AnnotationType) -> bool {
        self.annotations
            .iter()
            .any(|a| kind.is_assignable_from(&a.annotation_type()))
    }

    pub fn declared_method<S: AsRef<str>>(&self, name: &str, parameters: &[S]) -> Option<&MethodNode> {
        self.methods.iter().find(|m| m.matches(name, parameters))
    }

    pub fn declared_method_mut<S: AsRef<str>>(
        &mut self,
        name: &str,
        parameters: &[S],
    ) -> Option<&mut MethodNode> {
        self.methods.iter_mut().find(|m| m.matches(name, parameters))
    }

    pub fn declared_field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A declared method parameter. The qualifier lets injected callbacks ask for
/// a specific value of a given type (e.g. `"args"` or `"instance"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub type_name: String,
    pub qualifier: Option<String>,
}

impl Parameter {
    pub fn of(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: None,
        }
    }

    pub fn named(type_name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    pub fn key(&self) -> Key {
        Key {
            type_name: self.type_name.clone(),
            qualifier: self.qualifier.clone(),
        }
    }
}

/// Body instruction. Only the shape needed for splicing is modelled; every
/// other opcode is carried as an opaque mnemonic.
#[derive(Debug, Clone)]
pub enum Insn {
    Op(String),
    Invoke {
        owner: String,
        name: String,
        descriptor: String,
    },
    Throw,
    Return,
    Hook(HookCall),
}

impl Insn {
    pub fn op(mnemonic: impl Into<String>) -> Self {
        Insn::Op(mnemonic.into())
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Insn::Return)
    }

    fn from_instruction(instruction: &Instruction) -> Self {
        match instruction {
            Instruction::Ireturn
            | Instruction::Lreturn
            | Instruction::Freturn
            | Instruction::Dreturn
            | Instruction::Areturn
            | Instruction::Return => Insn::Return,
            Instruction::Athrow => Insn::Throw,
            other => Insn::op(other.to_string()),
        }
    }
}

/// Binary type name of a descriptor type, e.g. `int`, `net.game.World[]`.
fn field_type_name(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Base(BaseType::Byte) => "byte".to_string(),
        FieldType::Base(BaseType::Char) => "char".to_string(),
        FieldType::Base(BaseType::Double) => "double".to_string(),
        FieldType::Base(BaseType::Float) => "float".to_string(),
        FieldType::Base(BaseType::Int) => "int".to_string(),
        FieldType::Base(BaseType::Long) => "long".to_string(),
        FieldType::Base(BaseType::Short) => "short".to_string(),
        FieldType::Base(BaseType::Boolean) => "boolean".to_string(),
        FieldType::Object(name) => naming::to_binary(name),
        FieldType::Array(component) => format!("{}[]", field_type_name(component)),
    }
}

#[derive(Clone)]
pub struct MethodNode {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub access: MethodAccessFlags,
    pub annotations: Vec<AnnotationRef>,
    pub body: Vec<Insn>,
    pub invoker: Option<MethodInvoker>,
}

impl MethodNode {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type: return_type.into(),
            access: MethodAccessFlags::PUBLIC,
            annotations: Vec::new(),
            body: vec![Insn::Return],
            invoker: None,
        }
    }

    pub fn with_access(mut self, access: MethodAccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationRef) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_body(mut self, body: Vec<Insn>) -> Self {
        self.body = body;
        self
    }

    pub fn with_invoker(
        mut self,
        invoker: impl Fn(&Instance, &[Instance]) -> ApiResult<Option<Instance>> + Send + Sync + 'static,
    ) -> Self {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    pub fn parameter_types(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.type_name.as_str()).collect()
    }

    pub fn descriptor(&self) -> String {
        naming::method_descriptor(&self.parameter_types(), &self.return_type)
    }

    pub fn matches<S: AsRef<str>>(&self, name: &str, parameters: &[S]) -> bool {
        self.name == name
            && self.parameters.len() == parameters.len()
            && self
                .parameters
                .iter()
                .zip(parameters)
                .all(|(declared, wanted)| declared.type_name == wanted.as_ref())
    }

    pub fn identifier(&self, owner: &str) -> MethodIdentifier {
        MethodIdentifier {
            owner: owner.to_string(),
            name: self.name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| p.type_name.clone())
                .collect(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.access.contains(MethodAccessFlags::PUBLIC)
    }

    /// Widens the method to public. Returns `true` if the flags changed.
    pub fn make_public(&mut self) -> bool {
        if self.is_public() {
            return false;
        }
        self.access
            .remove(MethodAccessFlags::PRIVATE | MethodAccessFlags::PROTECTED);
        self.access.insert(MethodAccessFlags::PUBLIC);
        true
    }

    pub fn return_points(&self) -> usize {
        self.body.iter().filter(|insn| insn.is_return()).count()
    }
}

impl fmt::Debug for MethodNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodNode")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("access", &self.access)
            .field("annotations", &self.annotations)
            .field("body", &self.body)
            .field("invoker", &self.invoker.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub name: String,
    pub field_type: String,
    pub access: FieldAccessFlags,
    pub annotations: Vec<AnnotationRef>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            access: FieldAccessFlags::PRIVATE,
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: AnnotationRef) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn identifier(&self, owner: &str) -> FieldIdentifier {
        FieldIdentifier {
            owner: owner.to_string(),
            name: self.name.clone(),
        }
    }
}
