use crate::error::Result;
use crate::instruction::Instruction;

/// Logical layout of a SPIR-V module (Specification, Section 2.4).
///
/// Variants are declared in serialization order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// `OpCapability`
    Capabilities,
    /// `OpExtension`
    Extensions,
    /// `OpExtInstImport`
    ExtInstImports,
    /// The single `OpMemoryModel`
    MemoryModel,
    /// `OpEntryPoint`
    EntryPoints,
    /// `OpExecutionMode`, `OpExecutionModeId`
    ExecutionModes,
    /// `OpString`, `OpSource*`
    DebugSources,
    /// `OpName`, `OpMemberName`
    DebugNames,
    /// `OpModuleProcessed`
    DebugModuleProcessed,
    /// Decorations
    Annotations,
    /// Types, constants and non-function variables
    GlobalDeclarations,
    /// Functions without a body
    FunctionDeclarations,
    /// Functions with a body
    FunctionDefinitions,
}

impl Section {
    pub const COUNT: usize = 13;

    pub const ALL: [Section; Section::COUNT] = [
        Section::Capabilities,
        Section::Extensions,
        Section::ExtInstImports,
        Section::MemoryModel,
        Section::EntryPoints,
        Section::ExecutionModes,
        Section::DebugSources,
        Section::DebugNames,
        Section::DebugModuleProcessed,
        Section::Annotations,
        Section::GlobalDeclarations,
        Section::FunctionDeclarations,
        Section::FunctionDefinitions,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Append-only word streams for each section of a module under construction.
///
/// Routing an instruction to the right section is the caller's job; nothing
/// here inspects opcodes.
#[derive(Debug, Default)]
pub struct Sections {
    words: [Vec<u32>; Section::COUNT],
}

impl Sections {
    pub fn new() -> Sections {
        Sections::default()
    }

    pub fn append(&mut self, section: Section, instruction: &Instruction) -> Result<()> {
        instruction.encode_into(&mut self.words[section.index()])
    }

    pub fn words(&self, section: Section) -> &[u32] {
        &self.words[section.index()]
    }

    /// Total number of words across all sections.
    pub fn len_words(&self) -> usize {
        self.words.iter().map(Vec::len).sum()
    }

    /// Concatenates all sections in module order.
    pub fn finalize(self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len_words());
        for section in self.words {
            out.extend(section);
        }
        out
    }
}
