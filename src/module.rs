use crate::cache::TypeCache;
use crate::error::{Error, Result};
use crate::function::FunctionAssembly;
use crate::id::{Id, IdAllocator};
use crate::instruction::{Instruction, Instructions};
use crate::operand::Operands;
use crate::operands;
use crate::section::{Section, Sections};
use log::debug;
use spirv::{
    AddressingModel, Capability, Decoration, ExecutionMode, ExecutionModel, MemoryModel, Op,
    SourceLanguage,
};
use std::io::Write;

pub const HEADER_LEN: usize = 5;

/// Generator tag written into the header. Zero is "unregistered tool".
pub const DEFAULT_GENERATOR: u32 = 0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub magic_number: u32,
    pub version: u32,
    pub generator: u32,
    pub bound: u32,
    pub schema: u32,
}

impl Header {
    pub fn words(&self) -> [u32; HEADER_LEN] {
        [
            self.magic_number,
            self.version,
            self.generator,
            self.bound,
            self.schema,
        ]
    }

    /// `(major, minor)` decoded from the version word.
    pub fn version(&self) -> (u8, u8) {
        ((self.version >> 16) as u8, (self.version >> 8) as u8)
    }
}

fn version_word(major: u8, minor: u8) -> u32 {
    u32::from(major) << 16 | u32::from(minor) << 8
}

/// A finished module: header followed by all sections in module order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    header: Header,
    words: Vec<u32>,
}

impl Module {
    pub fn header(&self) -> Header {
        self.header
    }

    pub fn bound(&self) -> u32 {
        self.header.bound
    }

    /// All words, header included.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }

    /// Instructions following the header.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.words[HEADER_LEN..], HEADER_LEN)
    }

    /// Little-endian byte form, as stored in `.spv` files.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    pub fn export_binary<W: Write>(&self, mut inner: W) -> Result<()> {
        inner.write_all(&self.to_bytes())?;
        Ok(())
    }
}

/// Scope of a single module build.
///
/// Owns the id allocator, the type cache, the section buffers and the stack
/// of functions under assembly. Every emission goes through a `&mut`
/// reference, so one scope can never be driven by two builds at once; a
/// nested build is just another `ModuleBuilder` living on the stack.
pub struct ModuleBuilder {
    version: (u8, u8),
    generator: u32,

    pub(crate) ids: IdAllocator,
    pub(crate) types: TypeCache,
    pub(crate) sections: Sections,
    pub(crate) functions: Vec<FunctionAssembly>,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        ModuleBuilder::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> ModuleBuilder {
        ModuleBuilder {
            version: (spirv::MAJOR_VERSION, spirv::MINOR_VERSION),
            generator: DEFAULT_GENERATOR,

            ids: IdAllocator::new(),
            types: TypeCache::new(),
            sections: Sections::new(),
            functions: Vec::new(),
        }
    }

    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn with_generator(mut self, generator: u32) -> Self {
        self.generator = generator;
        self
    }

    /// Runs `body` against this scope and serializes the result.
    ///
    /// Any error from `body` aborts the build; no partial module is produced.
    pub fn build<F>(mut self, body: F) -> Result<Module>
    where
        F: FnOnce(&mut ModuleBuilder) -> Result<()>,
    {
        body(&mut self)?;
        self.finish()
    }

    pub fn finish(self) -> Result<Module> {
        if !self.functions.is_empty() {
            return Err(Error::UnterminatedFunction {
                depth: self.functions.len(),
            });
        }

        let header = Header {
            magic_number: spirv::MAGIC_NUMBER,
            version: version_word(self.version.0, self.version.1),
            generator: self.generator,
            bound: self.ids.bound(),
            schema: 0,
        };

        let structs = self.types.registered_structs().count();
        let body = self.sections.finalize();
        debug!(
            "module finished: bound {}, {} cached types, {} structs, {} words",
            header.bound,
            self.types.len(),
            structs,
            HEADER_LEN + body.len()
        );

        let mut words = Vec::with_capacity(HEADER_LEN + body.len());
        words.extend_from_slice(&header.words());
        words.extend(body);
        Ok(Module { header, words })
    }

    pub fn id(&mut self) -> Id {
        self.ids.allocate()
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn type_cache(&self) -> &TypeCache {
        &self.types
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    pub fn emit(&mut self, section: Section, instruction: Instruction) -> Result<()> {
        self.sections.append(section, &instruction)
    }

    /// Allocates a result id, emits `opcode` with it in front of `operands`
    /// and returns the id.
    pub fn emit_result(&mut self, section: Section, opcode: Op, operands: Operands) -> Result<Id> {
        let id = self.id();
        self.emit(section, Instruction::new(opcode, operands).with_result_id(id))?;
        Ok(id)
    }

    pub fn capability(&mut self, capability: Capability) -> Result<()> {
        self.emit(
            Section::Capabilities,
            Instruction::new(Op::Capability, operands![capability]),
        )
    }

    pub fn extension(&mut self, name: &str) -> Result<()> {
        self.emit(
            Section::Extensions,
            Instruction::new(Op::Extension, operands![name]),
        )
    }

    pub fn ext_inst_import(&mut self, name: &str) -> Result<Id> {
        self.emit_result(Section::ExtInstImports, Op::ExtInstImport, operands![name])
    }

    pub fn memory_model(&mut self, addressing: AddressingModel, memory: MemoryModel) -> Result<()> {
        self.emit(
            Section::MemoryModel,
            Instruction::new(Op::MemoryModel, operands![addressing, memory]),
        )
    }

    pub fn entry_point(
        &mut self,
        model: ExecutionModel,
        function: Id,
        name: &str,
        interface: &[Id],
    ) -> Result<()> {
        self.emit(
            Section::EntryPoints,
            Instruction::new(Op::EntryPoint, operands![model, function, name, interface]),
        )
    }

    pub fn execution_mode(&mut self, entry_point: Id, mode: ExecutionMode, literals: &[u32]) -> Result<()> {
        self.emit(
            Section::ExecutionModes,
            Instruction::new(Op::ExecutionMode, operands![entry_point, mode, literals]),
        )
    }

    pub fn source(&mut self, language: SourceLanguage, version: u32) -> Result<()> {
        self.emit(
            Section::DebugSources,
            Instruction::new(Op::Source, operands![language, version]),
        )
    }

    pub fn name(&mut self, target: Id, name: &str) -> Result<()> {
        self.emit(
            Section::DebugNames,
            Instruction::new(Op::Name, operands![target, name]),
        )
    }

    pub fn member_name(&mut self, ty: Id, member: u32, name: &str) -> Result<()> {
        self.emit(
            Section::DebugNames,
            Instruction::new(Op::MemberName, operands![ty, member, name]),
        )
    }

    pub fn module_processed(&mut self, process: &str) -> Result<()> {
        self.emit(
            Section::DebugModuleProcessed,
            Instruction::new(Op::ModuleProcessed, operands![process]),
        )
    }

    pub fn decorate(&mut self, target: Id, decoration: Decoration, literals: &[u32]) -> Result<()> {
        self.emit(
            Section::Annotations,
            Instruction::new(Op::Decorate, operands![target, decoration, literals]),
        )
    }

    pub fn member_decorate(
        &mut self,
        ty: Id,
        member: u32,
        decoration: Decoration,
        literals: &[u32],
    ) -> Result<()> {
        self.emit(
            Section::Annotations,
            Instruction::new(Op::MemberDecorate, operands![ty, member, decoration, literals]),
        )
    }
}

/// Builds a module with default settings.
///
/// ```
/// use spirv::{AddressingModel, Capability, MemoryModel};
///
/// let module = spirv_assembler::assemble(|b| {
///     b.capability(Capability::Shader)?;
///     b.memory_model(AddressingModel::Logical, MemoryModel::GLSL450)
/// })
/// .unwrap();
/// assert_eq!(module.bound(), 1);
/// assert_eq!(module.words().len(), 5 + 2 + 3);
/// ```
pub fn assemble<F>(body: F) -> Result<Module>
where
    F: FnOnce(&mut ModuleBuilder) -> Result<()>,
{
    ModuleBuilder::new().build(body)
}
