use pretty_assertions::assert_eq;
use r8asm::isa::{Category, Opcode};
use r8asm::{assemble, Addressing, AsmConfig};

fn asm(src: &str) -> Vec<u8> {
    assemble(src, &AsmConfig::default()).unwrap().code
}

#[test]
fn loop_branches_to_itself() {
    let code = asm("mvi r0, 5\n.loop\nbra loop\n");
    assert_eq!(code, vec![0x08, 5, 0x38, 0xFE]);
}

#[test]
fn encodes_each_fixed_category() {
    let src = "\
.start
    nop
    mvi  r3, -1
    addi r1, 0x7f
    subi r2, 0b101
    addr r1, r2
    notr r7, r0
    ldr  r2, 0x1234
    strb r1, 0x0005
    jmp  start
";
    let code = asm(src);
    assert_eq!(
        code,
        vec![
            0x00, 0x00, // nop
            0x0B, 0xFF, // mvi r3, -1
            0x11, 0x7F, // addi r1, 0x7f
            0x1A, 0x05, // subi r2, 0b101
            0x89, 0x02, // addr r1, r2
            0xAF, 0x00, // notr r7, r0
            0xBA, 0x00, 0x12, 0x34, // ldr r2, 0x1234
            0xD1, 0x00, 0x00, 0x05, // strb r1, 5
            0xF8, 0x00, 0x00, 0x00, // jmp start
        ]
    );
}

#[test]
fn negative_addresses_wrap_to_sixteen_bits() {
    assert_eq!(asm("ldrb r0, -1"), vec![0xC0, 0x00, 0xFF, 0xFF]);
    assert_eq!(asm("ldr r1, -2"), vec![0xB9, 0x00, 0xFF, 0xFE]);
    assert_eq!(asm("strb r2, -32768"), vec![0xD2, 0x00, 0x80, 0x00]);
}

#[test]
fn program_may_fill_the_address_space() {
    let code = asm("#org 0xfffc\n.last\nbra last\nbra last\n");
    assert_eq!(code.len(), 0x10000);
    assert_eq!(code[0xfffc..].to_vec(), vec![0x38, 0xFE, 0x38, 0xFC]);
}

#[test]
fn forward_branch() {
    let code = asm("beq done\nnop\nnop\n.done\nnop\n");
    assert_eq!(code, vec![0x48, 4, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn branch_displacement_limits() {
    // target 100 bytes past the branch's successor
    let code = asm("bra far\n#org 0x66\n.far\nnop\n");
    assert_eq!(code[..2].to_vec(), vec![0x38, 100]);
    assert_eq!(code.len(), 0x68);

    // bra at 126, successor at 128, target 0
    let code = asm(".top\n#org 126\nbra top\n");
    assert_eq!(code[126..].to_vec(), vec![0x38, 0x80]);
}

#[test]
fn word_addressing_halves_displacement() {
    let cfg = AsmConfig { addressing: Addressing::Word };
    let code = assemble("bra far\nnop\nnop\n.far\n", &cfg).unwrap().code;
    assert_eq!(code, vec![0x38, 2, 0, 0, 0, 0]);

    let code = assemble(".back\nnop\nbne back\n", &cfg).unwrap().code;
    assert_eq!(code, vec![0, 0, 0x40, 0xFE]);
}

#[test]
fn org_pads_with_nops() {
    let code = asm("nop\nnop\n#org 0x10\nmvi r1, 1\n");
    let mut expected = vec![0u8; 0x10];
    expected.extend([0x09, 0x01]);
    assert_eq!(code, expected);
}

#[test]
fn org_at_current_pc_is_a_no_op() {
    assert_eq!(asm("nop\n#org 2\nnop\n"), vec![0, 0, 0, 0]);
}

#[test]
fn stack_instructions() {
    let code = asm("push r1\npop r2\ncall sub\nret\n.sub\nret\n");
    assert_eq!(
        code,
        vec![
            0xD9, 0x00, // push r1
            0xE2, 0x00, // pop r2
            0xE8, 0x00, 0x00, 0x0A, // call sub
            0xF0, 0x00, // ret
            0xF0, 0x00, // sub: ret
        ]
    );
}

#[test]
fn case_comments_and_blank_lines() {
    let src = "  MVI R0, 0X0A ; load ten\n; whole-line comment\n\n.Loop\n\tBRA LOOP\n";
    let out = assemble(src, &AsmConfig::default()).unwrap();
    assert_eq!(out.code, vec![0x08, 0x0A, 0x38, 0xFE]);
    assert_eq!(out.symbols["loop"], 2);
}

#[test]
fn labels_resolve_to_pass_one_addresses() {
    let src = ".a\nldr r0, 0\n.b\nmvi r1, 1\n#org 0x20\n.c\njmp a\njmp b\njmp c\n";
    let out = assemble(src, &AsmConfig::default()).unwrap();
    assert_eq!(out.symbols["a"], 0);
    assert_eq!(out.symbols["b"], 4);
    assert_eq!(out.symbols["c"], 0x20);
    assert_eq!(
        out.code[0x20..].to_vec(),
        vec![0xF8, 0, 0, 0, 0xF8, 0, 0, 4, 0xF8, 0, 0, 0x20]
    );
}

fn sample_operands(op: Opcode) -> &'static str {
    match op.category() {
        Category::Nop => "",
        Category::Immediate => " r1, 1",
        Category::Register => " r1, r2",
        Category::Ram => " r1, 0x10",
        Category::Branch | Category::Jump => " end",
        Category::Stack => match op {
            Opcode::Push | Opcode::Pop => " r1",
            Opcode::Call => " end",
            _ => "",
        },
    }
}

#[test]
fn emitted_width_matches_pass_one_width() {
    for op in Opcode::ALL {
        let src = format!("{op}{}\n.end\n", sample_operands(op));
        let out = assemble(&src, &AsmConfig::default()).unwrap();
        assert_eq!(out.code.len(), op.width() as usize, "{op}");
        assert_eq!(out.symbols["end"], op.width(), "{op}");
        assert_eq!(out.code[0] >> 3, op.code(), "{op}");
    }
}

#[test]
fn output_is_deterministic() {
    let src = ".l\nmvi r0, 1\nsubi r0, 1\nbne l\ncall l\njmp l\n";
    assert_eq!(asm(src), asm(src));
}

#[test]
fn fibonacci_demo() {
    let out = assemble(include_str!("../demos/fibonacci.txt"), &AsmConfig::default()).unwrap();
    assert_eq!(out.symbols["next"], 6);
    assert_eq!(out.symbols["halt"], 0x18);
    assert_eq!(out.symbols["emit"], 0x40);
    assert_eq!(out.code.len(), 0x4A);
    // call emit
    assert_eq!(out.code[10..14].to_vec(), vec![0xE8, 0, 0x00, 0x40]);
    // bne next: successor at 0x18, displacement -18
    assert_eq!(out.code[0x16..0x18].to_vec(), vec![0x40, 0xEE]);
    // bra halt
    assert_eq!(out.code[0x18..0x1A].to_vec(), vec![0x38, 0xFE]);
}
