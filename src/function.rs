use crate::error::{Error, Result};
use crate::id::Id;
use crate::instruction::Instruction;
use crate::module::ModuleBuilder;
use crate::operand::Operands;
use crate::operands;
use crate::section::{Section, Sections};
use log::debug;
use spirv::{FunctionControl, Op, StorageClass};

/// Staging area for the instructions of one function.
///
/// `head` receives `OpFunction`, the parameters, the entry label and any
/// function-scoped `OpVariable`s; `body` receives everything else. Both are
/// written out head first, which lets variables be declared in the entry
/// block after body instructions have already been queued.
#[derive(Clone, Debug, Default)]
pub struct FunctionAssembly {
    head: Vec<Instruction>,
    body: Vec<Instruction>,
}

impl FunctionAssembly {
    pub fn new() -> FunctionAssembly {
        FunctionAssembly::default()
    }

    pub fn push_head(&mut self, instruction: Instruction) {
        self.head.push(instruction);
    }

    pub fn push_body(&mut self, instruction: Instruction) {
        self.body.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    /// Moves head then body into the function definitions section and
    /// leaves the assembly empty.
    pub fn flush(&mut self, sections: &mut Sections) -> Result<()> {
        debug!(
            "flushing function: {} head, {} body instructions",
            self.head.len(),
            self.body.len()
        );
        for instruction in self.head.drain(..).chain(self.body.drain(..)) {
            sections.append(Section::FunctionDefinitions, &instruction)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    pub id: Id,
    pub ty: Id,
}

/// A function defined in the module under construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub id: Id,
    pub ret_ty: Id,
    /// The `OpTypeFunction` of this function.
    pub ty: Id,
    pub params: Vec<Argument>,
    /// Label of the entry block.
    pub entry: Id,
}

impl ModuleBuilder {
    /// Starts staging a new function without emitting anything.
    ///
    /// Functions nest: the innermost one receives head and body instructions
    /// until it is closed.
    pub fn open_function(&mut self) {
        self.functions.push(FunctionAssembly::new());
    }

    /// Flushes the innermost staged function into the module.
    pub fn close_function(&mut self) -> Result<()> {
        let mut function = self.functions.pop().ok_or(Error::NoOpenFunction)?;
        function.flush(&mut self.sections)
    }

    fn current_function(&mut self) -> Result<&mut FunctionAssembly> {
        self.functions.last_mut().ok_or(Error::NoOpenFunction)
    }

    pub fn push_head(&mut self, instruction: Instruction) -> Result<()> {
        self.current_function()?.push_head(instruction);
        Ok(())
    }

    pub fn push_body(&mut self, instruction: Instruction) -> Result<()> {
        self.current_function()?.push_body(instruction);
        Ok(())
    }

    /// Emits a body instruction with a result type and a fresh result id.
    pub fn emit_body(&mut self, opcode: Op, result_type: Id, operands: Operands) -> Result<Id> {
        let id = self.id();
        self.push_body(
            Instruction::new(opcode, operands)
                .with_result_type(result_type)
                .with_result_id(id),
        )?;
        Ok(id)
    }

    /// Opens a function and emits its `OpFunction`, parameters and entry label.
    pub fn begin_function(
        &mut self,
        ret_ty: Id,
        param_tys: &[Id],
        control: FunctionControl,
    ) -> Result<Function> {
        let ty = self.type_function(ret_ty, param_tys)?;

        self.open_function();
        let id = self.id();
        self.push_head(
            Instruction::new(Op::Function, operands![control, ty])
                .with_result_type(ret_ty)
                .with_result_id(id),
        )?;

        let mut params = Vec::with_capacity(param_tys.len());
        for &param_ty in param_tys {
            let param = self.id();
            self.push_head(
                Instruction::new(Op::FunctionParameter, operands![])
                    .with_result_type(param_ty)
                    .with_result_id(param),
            )?;
            params.push(Argument {
                id: param,
                ty: param_ty,
            });
        }

        let entry = self.id();
        self.push_head(Instruction::new(Op::Label, operands![]).with_result_id(entry))?;

        Ok(Function {
            id,
            ret_ty,
            ty,
            params,
            entry,
        })
    }

    /// Terminates the innermost function with `OpFunctionEnd` and flushes it.
    pub fn end_function(&mut self) -> Result<()> {
        self.push_body(Instruction::new(Op::FunctionEnd, operands![]))?;
        self.close_function()
    }

    /// Defines a complete function.
    ///
    /// `body` must terminate every block it opens, including the entry block
    /// (usually with [`ret`](Self::ret) or [`ret_value`](Self::ret_value)).
    /// A missing `ret_ty` means `void`.
    pub fn define_function<F>(
        &mut self,
        name: Option<&str>,
        ret_ty: Option<Id>,
        param_tys: &[Id],
        body: F,
    ) -> Result<Function>
    where
        F: FnOnce(&mut ModuleBuilder, &[Argument]) -> Result<()>,
    {
        let ret_ty = match ret_ty {
            Some(ty) => ty,
            None => self.type_void()?,
        };
        let function = self.begin_function(ret_ty, param_tys, FunctionControl::NONE)?;
        if let Some(name) = name {
            self.name(function.id, name)?;
        }

        body(self, &function.params)?;
        self.end_function()?;
        Ok(function)
    }

    pub fn call(&mut self, function: &Function, args: &[Id]) -> Result<Id> {
        self.emit_body(
            Op::FunctionCall,
            function.ret_ty,
            operands![function.id, args],
        )
    }

    /// Declares a function-scoped variable in the entry block.
    pub fn local_variable(&mut self, pointee: Id) -> Result<Id> {
        let pointer = self.type_pointer(StorageClass::Function, pointee)?;
        let id = self.id();
        self.push_head(
            Instruction::new(Op::Variable, operands![StorageClass::Function])
                .with_result_type(pointer)
                .with_result_id(id),
        )?;
        Ok(id)
    }

    /// Starts the block labelled `label`.
    pub fn label(&mut self, label: Id) -> Result<()> {
        self.push_body(Instruction::new(Op::Label, operands![]).with_result_id(label))
    }

    pub fn branch(&mut self, target: Id) -> Result<()> {
        self.push_body(Instruction::new(Op::Branch, operands![target]))
    }

    pub fn ret(&mut self) -> Result<()> {
        self.push_body(Instruction::new(Op::Return, operands![]))
    }

    pub fn ret_value(&mut self, value: Id) -> Result<()> {
        self.push_body(Instruction::new(Op::ReturnValue, operands![value]))
    }

    pub fn load(&mut self, ty: Id, pointer: Id) -> Result<Id> {
        self.emit_body(Op::Load, ty, operands![pointer])
    }

    pub fn store(&mut self, pointer: Id, value: Id) -> Result<()> {
        self.push_body(Instruction::new(Op::Store, operands![pointer, value]))
    }
}
