//! Programmatic assembly of SPIR-V binary modules.
//!
//! A [`ModuleBuilder`] is the scope of one build: it allocates result ids,
//! deduplicates type and constant declarations, buffers instructions into the
//! section they belong to and finally serializes header and sections in the
//! order mandated by the SPIR-V logical layout.
//!
//! ```
//! use spirv::{AddressingModel, Capability, ExecutionModel, FunctionControl, MemoryModel};
//!
//! let module = spirv_assembler::assemble(|b| {
//!     b.capability(Capability::Shader)?;
//!     b.memory_model(AddressingModel::Logical, MemoryModel::GLSL450)?;
//!
//!     let void = b.type_void()?;
//!     let main = b.begin_function(void, &[], FunctionControl::NONE)?;
//!     b.ret()?;
//!     b.end_function()?;
//!
//!     b.entry_point(ExecutionModel::Vertex, main.id, "main", &[])?;
//!     b.name(main.id, "main")
//! })
//! .unwrap();
//!
//! assert_eq!(module.words()[0], spirv::MAGIC_NUMBER);
//! ```
//!
//! Opcodes and operand enumerants come from the [`spirv`] crate and are
//! treated as plain numbers; beyond section routing and type caching nothing
//! about their semantics is checked.

pub mod cache;
pub mod cfg;
pub mod error;
pub mod function;
pub mod id;
pub mod instruction;
pub mod module;
pub mod operand;
pub mod section;
pub mod types;

pub use crate::cache::TypeCache;
pub use crate::error::{Error, Result};
pub use crate::function::{Argument, Function, FunctionAssembly};
pub use crate::id::{Id, IdAllocator};
pub use crate::instruction::{decode, Instruction, Instructions, RawInstruction};
pub use crate::module::{assemble, Header, Module, ModuleBuilder, HEADER_LEN};
pub use crate::operand::{Operand, Operands};
pub use crate::section::{Section, Sections};
pub use crate::types::{ConstValue, Field, FieldKind, StructDecl, StructValue};

pub use spirv;
