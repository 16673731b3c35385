//! End-to-end scenarios: build a module through the public API, write it,
//! and check both the in-memory bookkeeping (interning, merge metadata,
//! entry-point interfaces) and the emitted word stream.
use spirv::{AddressingModel, Capability, ExecutionMode, ExecutionModel, MemoryModel, Op, StorageClass};

use spvbuild::constant::Constant;
use spvbuild::func::FunctionControl;
use spvbuild::module::make_version;
use spvbuild::ty::Type;
use spvbuild::writer::VecWriter;
use spvbuild::Module;

const MAGIC: u32 = 0x0723_0203;

/// Split the instruction stream (skipping the 5-word header) into
/// `(opcode, word_count)` pairs.
fn decode_ops(words: &[u32]) -> Vec<(u16, u16)> {
    let mut out = Vec::new();
    let mut i = 5;
    while i < words.len() {
        let header = words[i];
        let wc = ((header >> 16) as u16).max(1);
        let op = (header & 0xFFFF) as u16;
        out.push((op, wc));
        i += wc as usize;
    }
    out
}

fn op_count(words: &[u32], op: Op) -> usize {
    let target = op as u32 as u16;
    decode_ops(words).iter().filter(|(o, _)| *o == target).count()
}

#[test]
fn empty_module_header() {
    let mut m = Module::new(make_version(1, 0));
    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
    let words = sink.into_words();

    assert_eq!(words.len(), 5);
    assert_eq!(words[0], MAGIC);
    assert_eq!(words[1], make_version(1, 0));
    assert_eq!(words[2], 0);
    assert_eq!(words[3], 1, "id bound with no ids assigned is 1");
    assert_eq!(words[4], 0);
}

#[test]
fn scalar_constant_and_type_are_interned() {
    let mut m = Module::new(make_version(1, 0));
    let a = m.constant(Constant::scalar(42i32));
    let b = m.constant(Constant::scalar(42i32));
    assert_eq!(a, b, "same structural constant must reuse its instruction");

    let ta = m.add_type(Type::int(32));
    let tb = m.add_type(Type::int(32));
    assert_eq!(ta, tb);

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
    let words = sink.into_words();
    assert_eq!(op_count(&words, Op::Constant), 1);
    assert_eq!(op_count(&words, Op::TypeInt), 1);
}

#[test]
fn if_else_lowering_shapes_the_header_block() {
    let mut m = Module::new(make_version(1, 3));
    let func = m.add_function(Type::Void, vec![], FunctionControl::empty());
    let header = m.add_block(func);
    let cond = m.constant(Constant::bool(true));
    let ib = m.build_if(func, header, cond, true);

    m.cursor(ib.then_block).branch(ib.merge_block);
    m.cursor(ib.else_block.unwrap()).branch(ib.merge_block);
    m.cursor(ib.merge_block).return_void();

    assert_eq!(m.block(header).merge, Some(ib.merge_block));
    let instrs = m.block(header).instrs.clone();
    assert_eq!(instrs.len(), 2);
    assert_eq!(m.instr(instrs[0]).opcode, Op::SelectionMerge);
    assert_eq!(m.instr(instrs[1]).opcode, Op::BranchConditional);

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
}

#[test]
fn if_without_else_branches_false_edge_to_merge() {
    let mut m = Module::new(make_version(1, 3));
    let func = m.add_function(Type::Void, vec![], FunctionControl::empty());
    let header = m.add_block(func);
    let cond = m.constant(Constant::bool(false));
    let ib = m.build_if(func, header, cond, false);
    assert!(ib.else_block.is_none());

    m.cursor(ib.then_block).branch(ib.merge_block);
    m.cursor(ib.merge_block).return_void();

    let instrs = m.block(header).instrs.clone();
    let branch = m.instr(instrs[1]);
    assert_eq!(branch.opcode, Op::BranchConditional);
    assert_eq!(branch.operands.len(), 3);

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
}

#[test]
fn loop_lowering_shapes_header_and_back_edge() {
    let mut m = Module::new(make_version(1, 3));
    let func = m.add_function(Type::Void, vec![], FunctionControl::empty());
    let entry = m.add_block(func);
    let lb = m.build_loop(func);
    m.cursor(entry).branch(lb.header);
    m.close_loop_header(&lb, lb.body);

    let cond = m.constant(Constant::bool(true));
    m.cursor(lb.body)
        .branch_conditional(cond, lb.continue_block, lb.merge_block);
    m.cursor(lb.continue_block).branch(lb.header);
    m.cursor(lb.merge_block).return_void();

    assert_eq!(m.block(lb.header).merge, Some(lb.merge_block));
    assert_eq!(m.block(lb.header).cont, Some(lb.continue_block));
    let header_instrs = m.block(lb.header).instrs.clone();
    assert_eq!(m.instr(header_instrs[header_instrs.len() - 2]).opcode, Op::LoopMerge);
    assert_eq!(m.instr(header_instrs[header_instrs.len() - 1]).opcode, Op::Branch);

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
}

#[test]
fn switch_lowering_creates_one_block_per_case() {
    let mut m = Module::new(make_version(1, 3));
    let func = m.add_function(Type::Void, vec![], FunctionControl::empty());
    let header = m.add_block(func);
    let selector = m.constant(Constant::scalar(2i32));
    let sb = m.build_switch(func, header, selector, &[1, 2, 3]);
    assert_eq!(sb.cases.len(), 3);

    for &(_, block) in &sb.cases {
        m.cursor(block).branch(sb.merge_block);
    }
    m.cursor(sb.default).branch(sb.merge_block);
    m.cursor(sb.merge_block).return_void();

    let header_instrs = m.block(header).instrs.clone();
    assert_eq!(m.instr(header_instrs[0]).opcode, Op::SelectionMerge);
    let switch_instr = m.instr(header_instrs[1]);
    assert_eq!(switch_instr.opcode, Op::Switch);
    // selector + default + (literal, label) per case.
    assert_eq!(switch_instr.operands.len(), 2 + sb.cases.len() * 2);

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
}

#[test]
fn entry_point_interface_pre_1_4_excludes_non_io_storage() {
    let mut m = Module::new(make_version(1, 3));
    let f32_ty = Type::float(32);
    let input_var = m.variable(StorageClass::Input, f32_ty.clone(), None);
    let uniform_var = m.variable(StorageClass::Uniform, f32_ty, None);

    let ep = m.add_entry_point(
        ExecutionModel::Fragment,
        "main",
        Type::Void,
        vec![],
        FunctionControl::empty(),
    );
    let entry = m.add_block(ep);
    {
        let mut cur = m.cursor(entry);
        cur.load(input_var).unwrap();
        cur.load(uniform_var).unwrap();
        cur.return_void();
    }

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();

    let interface = &m.entry_point(ep).interface;
    assert!(interface.contains(&input_var));
    assert!(!interface.contains(&uniform_var));
}

#[test]
fn entry_point_interface_at_1_4_includes_all_non_function_storage() {
    let mut m = Module::new(make_version(1, 4));
    let f32_ty = Type::float(32);
    let uniform_var = m.variable(StorageClass::Uniform, f32_ty, None);

    let ep = m.add_entry_point(
        ExecutionModel::Fragment,
        "main",
        Type::Void,
        vec![],
        FunctionControl::empty(),
    );
    let entry = m.add_block(ep);
    {
        let mut cur = m.cursor(entry);
        cur.load(uniform_var).unwrap();
        cur.return_void();
    }

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();

    assert!(m.entry_point(ep).interface.contains(&uniform_var));
}

#[test]
fn fragment_shader_end_to_end() {
    let mut m = Module::new(make_version(1, 3));
    m.add_capability(Capability::Shader);
    let glsl = m.ext_inst_import("GLSL.std.450");
    m.set_memory_model(AddressingModel::Logical, MemoryModel::GLSL450);

    let f32_ty = Type::float(32);
    let output_var = m.variable(StorageClass::Output, f32_ty.clone(), None);
    m.name(output_var, "frag_color");

    let ep = m.add_entry_point(
        ExecutionModel::Fragment,
        "main",
        Type::Void,
        vec![],
        FunctionControl::empty(),
    );
    m.execution_mode(ep, ExecutionMode::OriginUpperLeft, &[]);
    let entry = m.add_block(ep);

    let one = m.constant(Constant::scalar(1.0f32));
    let ty_f32 = m.add_type(f32_ty);
    let mut cur = m.cursor(entry);
    let sq = cur.fmul(one, one).unwrap();
    let abs = cur.f_abs(glsl, ty_f32, sq);
    cur.store(output_var, abs);
    cur.return_void();

    let mut sink = VecWriter::new();
    m.write(&mut sink).unwrap();
    let words = sink.into_words();

    assert_eq!(words[0], MAGIC);
    assert!(words.len() > 5);
    assert_eq!(op_count(&words, Op::TypeFloat), 1);
    assert_eq!(op_count(&words, Op::EntryPoint), 1);
    assert_eq!(op_count(&words, Op::ExtInst), 1);
    assert_eq!(op_count(&words, Op::FunctionEnd), 1);
}

#[test]
fn unterminated_block_is_rejected() {
    let mut m = Module::new(make_version(1, 3));
    let func = m.add_function(Type::Void, vec![], FunctionControl::empty());
    m.add_block(func);

    let mut sink = VecWriter::new();
    let err = m.write(&mut sink).unwrap_err();
    assert_eq!(err, spvbuild::BuildError::UnterminatedBlock);

    // A module that failed to write is poisoned and refuses to try again.
    let mut sink2 = VecWriter::new();
    let err2 = m.write(&mut sink2).unwrap_err();
    assert_eq!(err2, spvbuild::BuildError::Poisoned);
}
