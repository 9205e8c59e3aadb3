//! Type, constant and struct declarations.
//!
//! Everything here goes through the [`TypeCache`](crate::TypeCache), so a
//! structurally identical declaration is only emitted once per module.

use crate::error::Result;
use crate::id::Id;
use crate::instruction::Instruction;
use crate::module::ModuleBuilder;
use crate::operand::Operands;
use crate::operands;
use crate::section::Section;
use log::trace;
use spirv::{Op, StorageClass};

/// Field types a struct member can have.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Int32,
    UInt32,
    Float,
    /// Vector of `f32` with the given component count.
    Vector(u32),
    /// Column-major matrix of `f32`.
    Matrix { columns: u32, rows: u32 },
    /// Nested struct, registered on first use.
    Struct(StructDecl),
    /// Struct registered earlier, referenced by name.
    Named(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// Layout of a named struct type.
///
/// ```
/// use spirv_assembler::{FieldKind, StructDecl};
///
/// let cat = StructDecl::new("Cat").field("c", FieldKind::Float);
/// let frog = StructDecl::new("Frog")
///     .field("a", FieldKind::Int32)
///     .field("b", FieldKind::Struct(cat));
/// assert_eq!(frog.fields.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

impl StructDecl {
    pub fn new(name: impl Into<String>) -> StructDecl {
        StructDecl {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
        });
        self
    }
}

/// Value of a constant, possibly composite.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int32(i32),
    UInt32(u32),
    Float(f32),
    Vector(Vec<f32>),
    /// Columns of a matrix. The column type is taken from the first column;
    /// the other columns are not checked against it.
    Matrix(Vec<Vec<f32>>),
    Struct(StructValue),
}

/// Field values of a registered struct, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    pub name: String,
    pub fields: Vec<ConstValue>,
}

impl StructValue {
    pub fn new(name: impl Into<String>, fields: Vec<ConstValue>) -> StructValue {
        StructValue {
            name: name.into(),
            fields,
        }
    }
}

impl ModuleBuilder {
    /// Declares a type, reusing a previous declaration with identical operands.
    ///
    /// The result id is allocated by this call and must not be part of `operands`.
    pub fn declare_type(&mut self, opcode: Op, operands: Operands) -> Result<Id> {
        if let Some(id) = self.types.try_get(opcode, &operands) {
            return Ok(id);
        }
        // Only cache what made it into the section.
        let id = self.ids.allocate();
        self.sections.append(
            Section::GlobalDeclarations,
            &Instruction::new(opcode, operands.clone()).with_result_id(id),
        )?;
        self.types.insert(opcode, &operands, id);
        Ok(id)
    }

    /// Declares a constant of type `ty`, reusing an identical earlier one.
    pub fn declare_constant(&mut self, opcode: Op, ty: Id, values: Operands) -> Result<Id> {
        let key = operands![ty, values];
        if let Some(id) = self.types.try_get(opcode, &key) {
            return Ok(id);
        }
        let id = self.ids.allocate();
        self.sections.append(
            Section::GlobalDeclarations,
            &Instruction::new(opcode, values)
                .with_result_type(ty)
                .with_result_id(id),
        )?;
        self.types.insert(opcode, &key, id);
        Ok(id)
    }

    pub fn type_void(&mut self) -> Result<Id> {
        self.declare_type(Op::TypeVoid, operands![])
    }

    pub fn type_bool(&mut self) -> Result<Id> {
        self.declare_type(Op::TypeBool, operands![])
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Result<Id> {
        self.declare_type(Op::TypeInt, operands![width, signed])
    }

    pub fn type_float(&mut self, width: u32) -> Result<Id> {
        self.declare_type(Op::TypeFloat, operands![width])
    }

    pub fn type_vector(&mut self, component: Id, count: u32) -> Result<Id> {
        self.declare_type(Op::TypeVector, operands![component, count])
    }

    pub fn type_matrix(&mut self, column: Id, columns: u32) -> Result<Id> {
        self.declare_type(Op::TypeMatrix, operands![column, columns])
    }

    pub fn type_array(&mut self, element: Id, length: u32) -> Result<Id> {
        let length = self.constant_u32(length)?;
        self.declare_type(Op::TypeArray, operands![element, length])
    }

    pub fn type_pointer(&mut self, storage_class: StorageClass, pointee: Id) -> Result<Id> {
        self.declare_type(Op::TypePointer, operands![storage_class, pointee])
    }

    pub fn type_function(&mut self, ret_ty: Id, param_tys: &[Id]) -> Result<Id> {
        self.declare_type(Op::TypeFunction, operands![ret_ty, param_tys])
    }

    pub fn constant_i32(&mut self, value: i32) -> Result<Id> {
        let ty = self.type_int(32, true)?;
        self.declare_constant(Op::Constant, ty, operands![value])
    }

    pub fn constant_u32(&mut self, value: u32) -> Result<Id> {
        let ty = self.type_int(32, false)?;
        self.declare_constant(Op::Constant, ty, operands![value])
    }

    pub fn constant_f32(&mut self, value: f32) -> Result<Id> {
        let ty = self.type_float(32)?;
        self.declare_constant(Op::Constant, ty, operands![value])
    }

    pub fn constant_bool(&mut self, value: bool) -> Result<Id> {
        let ty = self.type_bool()?;
        let opcode = if value {
            Op::ConstantTrue
        } else {
            Op::ConstantFalse
        };
        self.declare_constant(opcode, ty, operands![])
    }

    pub fn constant_composite(&mut self, ty: Id, constituents: &[Id]) -> Result<Id> {
        self.declare_constant(Op::ConstantComposite, ty, operands![constituents])
    }

    /// Writes a (possibly composite) constant, constituents first.
    pub fn constant(&mut self, value: &ConstValue) -> Result<Id> {
        match value {
            ConstValue::Int32(v) => self.constant_i32(*v),
            ConstValue::UInt32(v) => self.constant_u32(*v),
            ConstValue::Float(v) => self.constant_f32(*v),
            ConstValue::Vector(components) => self.vector_constant(components),
            ConstValue::Matrix(columns) => {
                let rows = columns.first().map_or(0, Vec::len) as u32;
                let float = self.type_float(32)?;
                let column_ty = self.type_vector(float, rows)?;
                let ty = self.type_matrix(column_ty, columns.len() as u32)?;
                let columns = columns
                    .iter()
                    .map(|column| self.vector_constant(column))
                    .collect::<Result<Vec<_>>>()?;
                self.constant_composite(ty, &columns)
            }
            ConstValue::Struct(value) => {
                let ty = self.struct_type(&value.name)?;
                let fields = value
                    .fields
                    .iter()
                    .map(|field| self.constant(field))
                    .collect::<Result<Vec<_>>>()?;
                self.constant_composite(ty, &fields)
            }
        }
    }

    fn vector_constant(&mut self, components: &[f32]) -> Result<Id> {
        let float = self.type_float(32)?;
        let ty = self.type_vector(float, components.len() as u32)?;
        let components = components
            .iter()
            .map(|&c| self.constant_f32(c))
            .collect::<Result<Vec<_>>>()?;
        self.constant_composite(ty, &components)
    }

    /// Declares a module-scope variable.
    pub fn global_variable(&mut self, pointer_ty: Id, storage_class: StorageClass) -> Result<Id> {
        let id = self.id();
        self.emit(
            Section::GlobalDeclarations,
            Instruction::new(Op::Variable, operands![storage_class])
                .with_result_type(pointer_ty)
                .with_result_id(id),
        )?;
        Ok(id)
    }

    fn field_type(&mut self, kind: &FieldKind) -> Result<Id> {
        match kind {
            FieldKind::Int32 => self.type_int(32, true),
            FieldKind::UInt32 => self.type_int(32, false),
            FieldKind::Float => self.type_float(32),
            FieldKind::Vector(count) => {
                let float = self.type_float(32)?;
                self.type_vector(float, *count)
            }
            FieldKind::Matrix { columns, rows } => {
                let float = self.type_float(32)?;
                let column = self.type_vector(float, *rows)?;
                self.type_matrix(column, *columns)
            }
            FieldKind::Struct(decl) => self.register_struct(decl),
            FieldKind::Named(name) => self.struct_type(name),
        }
    }

    /// Registers a struct type, emitting its declaration and debug names once.
    ///
    /// Later registrations of the same name return the first id without
    /// emitting anything, even if the layout differs.
    pub fn register_struct(&mut self, decl: &StructDecl) -> Result<Id> {
        if let Some(id) = self.types.try_get_struct(&decl.name) {
            trace!("struct `{}` already registered as {}", decl.name, id);
            return Ok(id);
        }

        // Member types have to be declared before the struct itself.
        let members = decl
            .fields
            .iter()
            .map(|field| self.field_type(&field.kind))
            .collect::<Result<Vec<_>>>()?;

        // A member may have registered a struct of the same name.
        if let Some(id) = self.types.try_get_struct(&decl.name) {
            trace!("struct `{}` registered by one of its members as {}", decl.name, id);
            return Ok(id);
        }

        let id = self.ids.allocate();
        self.sections.append(
            Section::GlobalDeclarations,
            &Instruction::new(Op::TypeStruct, operands![members]).with_result_id(id),
        )?;
        self.types.insert_struct(&decl.name, id);
        self.name(id, &decl.name)?;
        for (index, field) in decl.fields.iter().enumerate() {
            self.member_name(id, index as u32, &field.name)?;
        }
        Ok(id)
    }

    /// Id of a struct registered earlier.
    pub fn struct_type(&self, name: &str) -> Result<Id> {
        self.types.require_struct(name)
    }

    pub fn struct_pointer(&mut self, name: &str, storage_class: StorageClass) -> Result<Id> {
        let ty = self.struct_type(name)?;
        self.type_pointer(storage_class, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn count(b: &ModuleBuilder, section: Section, op: Op) -> usize {
        crate::instruction::Instructions::new(b.sections().words(section), 0)
            .filter(|inst| inst.as_ref().unwrap().op() == Some(op))
            .count()
    }

    #[test]
    fn repeated_type_is_deduplicated() {
        let mut b = ModuleBuilder::new();
        let a = b.type_int(32, true).unwrap();
        let last = b.ids().last_allocated();
        let c = b.type_int(32, true).unwrap();
        assert_eq!(a, c);
        assert_eq!(b.ids().last_allocated(), last);
        assert_eq!(count(&b, Section::GlobalDeclarations, Op::TypeInt), 1);

        let u = b.type_int(32, false).unwrap();
        assert_ne!(a, u);
    }

    #[test]
    fn constants_share_cache_by_type() {
        let mut b = ModuleBuilder::new();
        let signed = b.constant_i32(1).unwrap();
        let unsigned = b.constant_u32(1).unwrap();
        assert_ne!(signed, unsigned);
        assert_eq!(b.constant_i32(1).unwrap(), signed);
        assert_eq!(b.constant_bool(true).unwrap(), b.constant_bool(true).unwrap());
        assert_ne!(b.constant_bool(true).unwrap(), b.constant_bool(false).unwrap());
    }

    #[test]
    fn nested_struct_registered_once() {
        let cat = StructDecl::new("Cat").field("c", FieldKind::Float);
        let frog = StructDecl::new("Frog")
            .field("a", FieldKind::Int32)
            .field("b", FieldKind::Struct(cat.clone()));
        let toad = StructDecl::new("Toad")
            .field("m", FieldKind::Matrix { columns: 4, rows: 4 })
            .field("b", FieldKind::Named("Cat".into()));

        let mut b = ModuleBuilder::new();
        let frog_id = b.register_struct(&frog).unwrap();
        let cat_id = b.struct_type("Cat").unwrap();
        assert!(cat_id < frog_id);

        assert_eq!(b.register_struct(&cat).unwrap(), cat_id);
        assert_eq!(b.register_struct(&frog).unwrap(), frog_id);
        b.register_struct(&toad).unwrap();

        assert_eq!(count(&b, Section::GlobalDeclarations, Op::TypeStruct), 3);
        assert_eq!(count(&b, Section::DebugNames, Op::Name), 3);
        // Cat.c, Frog.a, Frog.b, Toad.m, Toad.b
        assert_eq!(count(&b, Section::DebugNames, Op::MemberName), 5);
        assert_eq!(
            b.type_cache()
                .registered_structs()
                .map(|(name, _)| name)
                .collect::<Vec<_>>(),
            vec!["Cat", "Frog", "Toad"]
        );
    }

    #[test]
    fn failed_declaration_is_not_cached() {
        let mut b = ModuleBuilder::new();
        let void = b.type_void().unwrap();
        let params = vec![void; 70_000];
        let key = operands![void, params.as_slice()];

        assert!(matches!(
            b.type_function(void, &params),
            Err(Error::EncodingSizeExceeded { opcode: Op::TypeFunction, .. })
        ));
        assert_eq!(b.type_cache().try_get(Op::TypeFunction, &key), None);
        assert_eq!(count(&b, Section::GlobalDeclarations, Op::TypeFunction), 0);

        // A retry fails the same way instead of handing out the dead id.
        assert!(b.type_function(void, &params).is_err());
        assert_eq!(b.type_cache().try_get(Op::TypeFunction, &key), None);
    }

    #[test]
    fn failed_constant_is_not_cached() {
        let mut b = ModuleBuilder::new();
        let float = b.type_float(32).unwrap();
        let constituents = vec![float; 70_000];

        assert!(b.constant_composite(float, &constituents).is_err());
        let key = operands![float, constituents.as_slice()];
        assert_eq!(b.type_cache().try_get(Op::ConstantComposite, &key), None);
    }

    #[test]
    fn struct_nesting_its_own_name_registers_once() {
        let inner = StructDecl::new("Frog").field("x", FieldKind::Float);
        let outer = StructDecl::new("Frog").field("inner", FieldKind::Struct(inner));

        let mut b = ModuleBuilder::new();
        let id = b.register_struct(&outer).unwrap();
        assert_eq!(b.struct_type("Frog").unwrap(), id);
        assert_eq!(b.register_struct(&outer).unwrap(), id);

        assert_eq!(count(&b, Section::GlobalDeclarations, Op::TypeStruct), 1);
        assert_eq!(count(&b, Section::DebugNames, Op::Name), 1);
        assert_eq!(b.type_cache().registered_structs().count(), 1);
    }

    #[test]
    fn named_field_before_registration_fails() {
        let mut b = ModuleBuilder::new();
        let decl = StructDecl::new("Pond").field("frog", FieldKind::Named("Frog".into()));
        match b.register_struct(&decl) {
            Err(Error::UseBeforeDeclaration { name }) => assert_eq!(name, "Frog"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(b.type_cache().try_get_struct("Pond"), None);
    }

    #[test]
    fn struct_pointer_requires_registration() {
        let mut b = ModuleBuilder::new();
        assert!(matches!(
            b.struct_pointer("Frog", StorageClass::Output),
            Err(Error::UseBeforeDeclaration { .. })
        ));

        let frog = b
            .register_struct(&StructDecl::new("Frog").field("a", FieldKind::Int32))
            .unwrap();
        let pointer = b.struct_pointer("Frog", StorageClass::Output).unwrap();
        assert_eq!(b.type_pointer(StorageClass::Output, frog).unwrap(), pointer);
    }

    #[test]
    fn struct_constant_is_built_bottom_up() {
        let cat = StructDecl::new("Cat").field("c", FieldKind::Float);
        let frog = StructDecl::new("Frog")
            .field("a", FieldKind::Int32)
            .field("b", FieldKind::Struct(cat));

        let mut b = ModuleBuilder::new();
        b.register_struct(&frog).unwrap();
        let value = ConstValue::Struct(StructValue::new(
            "Frog",
            vec![
                ConstValue::Int32(1),
                ConstValue::Struct(StructValue::new("Cat", vec![ConstValue::Float(2.5)])),
            ],
        ));
        let id = b.constant(&value).unwrap();
        assert_eq!(b.constant(&value).unwrap(), id);

        let words = b.sections().words(Section::GlobalDeclarations);
        let last = crate::instruction::Instructions::new(words, 0)
            .map(|inst| inst.unwrap())
            .last()
            .unwrap();
        assert_eq!(last.op(), Some(Op::ConstantComposite));
        assert_eq!(last.operands[0], b.struct_type("Frog").unwrap().word());
        assert_eq!(last.operands[1], id.word());
    }

    #[test]
    fn matrix_constant_declares_column_type() {
        let mut b = ModuleBuilder::new();
        let m = b
            .constant(&ConstValue::Matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]]))
            .unwrap();

        // Everything below was declared by the matrix constant already.
        let ids_before = b.ids().last_allocated();
        let float = b.type_float(32).unwrap();
        let column = b.type_vector(float, 2).unwrap();
        let ty = b.type_matrix(column, 2).unwrap();
        let x = b.constant(&ConstValue::Vector(vec![1.0, 0.0])).unwrap();
        let y = b.constant(&ConstValue::Vector(vec![0.0, 1.0])).unwrap();
        assert_eq!(b.constant_composite(ty, &[x, y]).unwrap(), m);
        assert_eq!(b.ids().last_allocated(), ids_before);
    }

    #[test]
    fn matrix_column_type_follows_first_column() {
        let mut b = ModuleBuilder::new();
        b.constant(&ConstValue::Matrix(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0]]))
            .unwrap();

        let float = b.type_float(32).unwrap();
        let ids_before = b.ids().last_allocated();
        let column = b.type_vector(float, 3).unwrap();
        b.type_matrix(column, 2).unwrap();
        assert_eq!(b.ids().last_allocated(), ids_before);
    }

    #[test]
    fn array_length_is_a_constant() {
        let mut b = ModuleBuilder::new();
        let float = b.type_float(32).unwrap();
        let array = b.type_array(float, 8).unwrap();
        let length = b.constant_u32(8).unwrap();
        assert!(length < array);
        assert_eq!(b.type_array(float, 8).unwrap(), array);
    }

    #[test]
    fn global_variables_are_distinct() {
        let mut b = ModuleBuilder::new();
        let float = b.type_float(32).unwrap();
        let pointer = b.type_pointer(StorageClass::Output, float).unwrap();
        let a = b.global_variable(pointer, StorageClass::Output).unwrap();
        let c = b.global_variable(pointer, StorageClass::Output).unwrap();
        assert_ne!(a, c);
    }
}
