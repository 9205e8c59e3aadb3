use std::fmt;

/// Result id of a type, value or label, unique within one module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u32);

impl Id {
    pub fn word(self) -> u32 {
        self.0
    }
}

impl From<Id> for u32 {
    fn from(id: Id) -> u32 {
        id.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Monotonic id counter for a single module build.
///
/// The first allocation returns `%1`; id 0 is never handed out. Running past
/// `u32::MAX` wraps around silently, producing duplicate ids.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: u32,
}

impl IdAllocator {
    pub fn new() -> IdAllocator {
        IdAllocator { last: 0 }
    }

    pub fn allocate(&mut self) -> Id {
        self.last = self.last.wrapping_add(1);
        Id(self.last)
    }

    /// Only valid when starting a new, empty build.
    pub fn reset(&mut self) {
        self.last = 0;
    }

    pub fn last_allocated(&self) -> u32 {
        self.last
    }

    /// One past the highest id handed out so far.
    pub fn bound(&self) -> u32 {
        self.last.wrapping_add(1)
    }
}
