//! Property tests for the encoding and bookkeeping laws of the assembler.

use proptest::prelude::*;
use spirv::Op;
use spirv_assembler::operand::string;
use spirv_assembler::{
    decode, Instruction, Instructions, IdAllocator, ModuleBuilder, Operands, Section, Sections,
};

fn opcode() -> impl Strategy<Value = Op> {
    prop::sample::select(vec![
        Op::Nop,
        Op::Capability,
        Op::Name,
        Op::TypeInt,
        Op::TypeStruct,
        Op::Constant,
        Op::ConstantComposite,
        Op::Function,
        Op::Label,
        Op::Store,
        Op::Return,
        Op::ExtInst,
    ])
}

fn section() -> impl Strategy<Value = Section> {
    prop::sample::select(Section::ALL.to_vec())
}

proptest! {
    #[test]
    fn encode_then_decode_is_identity(
        op in opcode(),
        words in prop::collection::vec(any::<u32>(), 0..256),
    ) {
        let encoded = Instruction::new(op, Operands::from_vec(words.clone()))
            .encode()
            .unwrap();
        let (raw, rest) = decode(&encoded, 0).unwrap();
        prop_assert!(rest.is_empty());
        prop_assert_eq!(raw.op(), Some(op));
        prop_assert_eq!(raw.operands, &words[..]);
    }

    #[test]
    fn allocator_counts_from_one(n in 0usize..500) {
        let mut ids = IdAllocator::new();
        let allocated = (0..n).map(|_| ids.allocate().word()).collect::<Vec<_>>();
        prop_assert_eq!(allocated, (1..=n as u32).collect::<Vec<_>>());
        prop_assert_eq!(ids.bound(), n as u32 + 1);
    }

    #[test]
    fn identical_declarations_allocate_once(
        keys in prop::collection::vec((prop::sample::select(vec![8u32, 16, 32, 64]), any::<bool>()), 1..32),
    ) {
        let mut b = ModuleBuilder::new();
        let mut seen = Vec::new();
        for &(width, signed) in &keys {
            let before = b.ids().last_allocated();
            let first = b.type_int(width, signed).unwrap();
            let after_first = b.ids().last_allocated();
            let second = b.type_int(width, signed).unwrap();

            prop_assert_eq!(first, second);
            prop_assert_eq!(b.ids().last_allocated(), after_first);
            if seen.contains(&(width, signed)) {
                prop_assert_eq!(after_first, before);
            } else {
                prop_assert_eq!(after_first, before + 1);
                seen.push((width, signed));
            }
        }

        let mut distinct = keys.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(b.type_cache().len(), distinct.len());
        prop_assert_eq!(b.ids().last_allocated() as usize, distinct.len());
    }

    #[test]
    fn bound_is_one_past_last_id(n in 0u32..200) {
        let module = ModuleBuilder::new()
            .build(|b| {
                for _ in 0..n {
                    b.id();
                }
                Ok(())
            })
            .unwrap();
        prop_assert_eq!(module.bound(), n + 1);
        prop_assert_eq!(module.header().bound, module.words()[3]);
    }

    #[test]
    fn sections_serialize_in_fixed_order(targets in prop::collection::vec(section(), 0..64)) {
        let mut sections = Sections::new();
        for (seq, &target) in targets.iter().enumerate() {
            let tag = Operands::from_slice(&[target as u32, seq as u32]);
            sections.append(target, &Instruction::new(Op::Nop, tag)).unwrap();
        }

        let words = sections.finalize();
        let tags = Instructions::new(&words, 0)
            .map(|inst| {
                let inst = inst.unwrap();
                (inst.operands[0], inst.operands[1])
            })
            .collect::<Vec<_>>();

        prop_assert_eq!(tags.len(), targets.len());
        // Sorted by section; insertion order kept within a section.
        prop_assert!(tags.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn strings_are_nul_terminated(s in "\\PC{0,40}") {
        let words = string(&s);
        prop_assert_eq!(words.len(), s.len() / 4 + 1);

        let bytes = words.iter().flat_map(|w| w.to_le_bytes()).collect::<Vec<_>>();
        prop_assert_eq!(&bytes[..s.len()], s.as_bytes());
        prop_assert!(bytes[s.len()..].iter().all(|&b| b == 0));
    }
}
