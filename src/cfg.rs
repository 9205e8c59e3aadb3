//! Lowering of structured control flow into labelled blocks.
//!
//! Each construct opens its own blocks and always leaves a fresh merge block
//! as the current one, so closures passed as arms or loop bodies must not
//! terminate the block they are emitting into.

use crate::error::Result;
use crate::id::Id;
use crate::instruction::Instruction;
use crate::module::ModuleBuilder;
use crate::operands;
use spirv::{LoopControl, Op, SelectionControl};

impl ModuleBuilder {
    fn selection_header(&mut self, cond: Id, on_true: Id, on_false: Id, merge: Id) -> Result<()> {
        self.push_body(Instruction::new(
            Op::SelectionMerge,
            operands![merge, SelectionControl::NONE],
        ))?;
        self.push_body(Instruction::new(
            Op::BranchConditional,
            operands![cond, on_true, on_false],
        ))
    }

    /// `if cond { then }`
    pub fn if_then<T>(&mut self, cond: Id, then: T) -> Result<()>
    where
        T: FnOnce(&mut ModuleBuilder) -> Result<()>,
    {
        let then_label = self.id();
        let merge = self.id();

        self.selection_header(cond, then_label, merge, merge)?;

        self.label(then_label)?;
        then(self)?;
        self.branch(merge)?;

        self.label(merge)
    }

    /// `if cond { then } else { els }`
    pub fn if_else<T, E>(&mut self, cond: Id, then: T, els: E) -> Result<()>
    where
        T: FnOnce(&mut ModuleBuilder) -> Result<()>,
        E: FnOnce(&mut ModuleBuilder) -> Result<()>,
    {
        let then_label = self.id();
        let else_label = self.id();
        let merge = self.id();

        self.selection_header(cond, then_label, else_label, merge)?;

        self.label(then_label)?;
        then(self)?;
        self.branch(merge)?;

        self.label(else_label)?;
        els(self)?;
        self.branch(merge)?;

        self.label(merge)
    }

    /// `for i in 0..count { body(i) }` over a signed 32-bit counter.
    ///
    /// The counter lives in a function-scoped variable declared in the entry
    /// block. `body` receives the counter value loaded for this iteration.
    pub fn for_range<F>(&mut self, count: i32, body: F) -> Result<()>
    where
        F: FnOnce(&mut ModuleBuilder, Id) -> Result<()>,
    {
        let int = self.type_int(32, true)?;
        let bool_ty = self.type_bool()?;
        let zero = self.constant_i32(0)?;
        let one = self.constant_i32(1)?;
        let end = self.constant_i32(count)?;

        let counter = self.local_variable(int)?;
        self.store(counter, zero)?;

        let header = self.id();
        let check = self.id();
        let body_label = self.id();
        let continue_label = self.id();
        let merge = self.id();

        self.branch(header)?;

        self.label(header)?;
        self.push_body(Instruction::new(
            Op::LoopMerge,
            operands![merge, continue_label, LoopControl::NONE],
        ))?;
        self.branch(check)?;

        self.label(check)?;
        let index = self.load(int, counter)?;
        let in_range = self.emit_body(Op::SLessThan, bool_ty, operands![index, end])?;
        self.push_body(Instruction::new(
            Op::BranchConditional,
            operands![in_range, body_label, merge],
        ))?;

        self.label(body_label)?;
        body(self, index)?;
        self.branch(continue_label)?;

        self.label(continue_label)?;
        let current = self.load(int, counter)?;
        let next = self.emit_body(Op::IAdd, int, operands![current, one])?;
        self.store(counter, next)?;
        self.branch(header)?;

        self.label(merge)
    }
}
