// This test suite walks the whole encoding table through the public API. For every opcode
// it builds an instruction whose operands suit each field's value encoder, encodes it, and
// reads every field back with extract to confirm the value landed in the declared ranges
// and nowhere else: all bits outside the mapped fields must still equal the descriptor's
// base bytes. Instruction flags are toggled one at a time to confirm each flag owns exactly
// its bit. Mnemonics round-trip through Opcode::from_name.

//! Encoding table coverage tests.

use shader_backend::isa::encoder::bank_select;
use shader_backend::isa::table::{descriptor, FieldSource};
use shader_backend::isa::{extract, BitRange, ValueEncoder};
use shader_backend::{encode_instr, validate_table, Instruction, Opcode, Operand, RegBank};

/// An operand every mapping with `encoder` accepts, and its raw field value.
fn sample_operand(encoder: ValueEncoder) -> (Operand, u64) {
    match encoder {
        ValueEncoder::Register { num_bits, .. } => {
            (Operand::temp(3), (bank_select(RegBank::Temp) << num_bits) | 3)
        }
        ValueEncoder::Drc => (Operand::drc(1).unwrap(), 1),
        ValueEncoder::LimitedScale1To16 => (Operand::imm(9), 9),
        ValueEncoder::PassThrough => (Operand::imm(0x1234), 0x1234),
    }
}

fn sample_instruction(opcode: Opcode) -> (Instruction, Vec<Option<u64>>) {
    let desc = descriptor(opcode);
    let mut operands = vec![Operand::imm(0); opcode.num_operands()];
    let mut expected = vec![None; desc.mappings.len()];
    for (i, mapping) in desc.mappings.iter().enumerate() {
        if let FieldSource::Operand(index) = mapping.source {
            let (operand, raw) = sample_operand(mapping.encoder);
            operands[index] = operand;
            expected[i] = Some(raw);
        }
    }
    (Instruction::new(opcode, operands), expected)
}

fn bit_is_set(bytes: &[u8], bit: usize) -> bool {
    let byte = bytes.len() - 1 - bit / 8;
    bytes[byte] & (1 << (bit % 8)) != 0
}

#[test]
fn test_table_is_consistent() {
    assert_eq!(validate_table(), Ok(()));
}

#[test]
fn test_every_field_lands_in_its_ranges() {
    let _ = env_logger::builder().is_test(true).try_init();

    for opcode in Opcode::ALL {
        let desc = descriptor(opcode);
        let (instr, expected) = sample_instruction(opcode);
        let encoded = encode_instr(&instr).unwrap();
        let word = encoded.as_bytes();
        assert_eq!(word.len(), desc.width(), "{opcode}");

        let mut covered: Vec<&BitRange> = Vec::new();
        for (mapping, want) in desc.mappings.iter().zip(&expected) {
            let got = extract(mapping.ranges, word).unwrap();
            match want {
                Some(raw) => assert_eq!(got, *raw, "{opcode} {:?}", mapping.source),
                // Flags are clear on the sample instruction.
                None => assert_eq!(got, 0, "{opcode} {:?}", mapping.source),
            }
            covered.extend(mapping.ranges.iter());
        }

        for bit in 0..desc.width() * 8 {
            if covered.iter().any(|r| r.bits().any(|b| b == bit)) {
                continue;
            }
            assert_eq!(
                bit_is_set(word, bit),
                bit_is_set(desc.bytes, bit),
                "{opcode}: bit {bit} outside every field changed"
            );
        }
    }
}

#[test]
fn test_each_flag_owns_one_bit() {
    for opcode in Opcode::ALL {
        let desc = descriptor(opcode);
        let (instr, _) = sample_instruction(opcode);
        let plain = encode_instr(&instr).unwrap();

        for mapping in desc.mappings {
            let FieldSource::InstrFlag(flag) = mapping.source else {
                continue;
            };
            let flagged = encode_instr(&instr.clone().with_flag(flag)).unwrap();
            assert_eq!(extract(mapping.ranges, flagged.as_bytes()).unwrap(), 1);

            let differing: usize = plain
                .as_bytes()
                .iter()
                .zip(flagged.as_bytes())
                .map(|(a, b)| (a ^ b).count_ones() as usize)
                .sum();
            assert_eq!(differing, 1, "{opcode}.{}", flag.suffix());
        }
    }
}

#[test]
fn test_mnemonics_round_trip() {
    for opcode in Opcode::ALL {
        assert_eq!(Opcode::from_name(opcode.name()), Some(opcode));
        assert_eq!(opcode.to_string(), opcode.name());
    }
    assert_eq!(Opcode::from_name("div"), None);
}
