use crate::error::{Error, Result};
use crate::id::{Id, IdAllocator};
use linked_hash_map::LinkedHashMap;
use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use spirv::Op;

/// Opcode followed by the flattened operand words.
type TypeKey = SmallVec<[u32; 4]>;

fn type_key(opcode: Op, operands: &[u32]) -> TypeKey {
    let mut key = TypeKey::with_capacity(1 + operands.len());
    key.push(opcode as u32);
    key.extend_from_slice(operands);
    key
}

/// Deduplicates declarations within one module build.
///
/// Keys compare word for word, so two declarations only share an id when
/// their operands (including referenced sub-type ids) are identical.
/// Lookups and allocations are separate steps: callers check [`try_get`]
/// first and only emit and [`allocate_new`] on a miss. Callers whose emission
/// can fail reserve an id themselves and [`insert`] it once the declaration
/// has been written.
///
/// [`try_get`]: TypeCache::try_get
/// [`allocate_new`]: TypeCache::allocate_new
/// [`insert`]: TypeCache::insert
#[derive(Debug, Default)]
pub struct TypeCache {
    types: FxHashMap<TypeKey, Id>,
    structs: LinkedHashMap<String, Id>,
}

impl TypeCache {
    pub fn new() -> TypeCache {
        TypeCache::default()
    }

    pub fn try_get(&self, opcode: Op, operands: &[u32]) -> Option<Id> {
        let id = self.types.get(&type_key(opcode, operands)).copied();
        if let Some(id) = id {
            trace!("type cache hit: {:?} {:?} -> {}", opcode, operands, id);
        }
        id
    }

    pub fn allocate_new(&mut self, ids: &mut IdAllocator, opcode: Op, operands: &[u32]) -> Id {
        let id = ids.allocate();
        self.insert(opcode, operands, id);
        id
    }

    /// Maps a declaration to an id that was allocated and emitted already.
    pub fn insert(&mut self, opcode: Op, operands: &[u32], id: Id) {
        trace!("type cache insert: {:?} {:?} -> {}", opcode, operands, id);
        self.types.insert(type_key(opcode, operands), id);
    }

    pub fn try_get_struct(&self, name: &str) -> Option<Id> {
        self.structs.get(name).copied()
    }

    pub fn allocate_new_struct(&mut self, ids: &mut IdAllocator, name: &str) -> Id {
        let id = ids.allocate();
        self.insert_struct(name, id);
        id
    }

    pub fn insert_struct(&mut self, name: &str, id: Id) {
        trace!("struct `{}` registered as {}", name, id);
        self.structs.insert(name.to_owned(), id);
    }

    /// Looks up a struct that must already have been registered.
    pub fn require_struct(&self, name: &str) -> Result<Id> {
        self.try_get_struct(name)
            .ok_or_else(|| Error::UseBeforeDeclaration { name: name.to_owned() })
    }

    /// Registered structs in registration order.
    pub fn registered_structs(&self) -> impl Iterator<Item = (&str, Id)> {
        self.structs.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
