//! The module builder itself: arenas, interning tables, section storage, and
//! the binary emitter. Section order and the id-bound backfill follow
//! `original_source/lib/source/Module.cpp::write` exactly; interning follows
//! `spirq-core`'s structural-equality style, just in the opposite direction
//! (building instructions instead of parsing them back apart).
use std::collections::HashSet;

use fnv::FnvHashMap;
use spirv::Op;

pub use spirv::{AddressingModel, Capability, Decoration, ExecutionMode, MemoryModel, SourceLanguage};

use crate::block::BasicBlockData;
use crate::constant::Constant;
use crate::error::{BuildError, BuildResult};
use crate::func::{EntryPoint, ExecutionModel, Function, FunctionControl};
use crate::id::{BlockId, EpId, FuncHandle, FuncId, IdCounter, InstrId};
use crate::infer::{DefaultInferResultType, InferResultType};
use crate::instr::Instruction;
use crate::logger::{LogLevel, Logger, StdLogger};
use crate::operand::Operand;
use crate::ty::{StorageClass, Type};
use crate::writer::Writer;

/// `spv::MagicNumber` from the SPIR-V binary header.
const MAGIC: u32 = 0x0723_0203;
/// Generator magic number. Real tools register one with Khronos; an
/// in-house builder has no registration, so this stays zero like an
/// unregistered generator is expected to.
const GENERATOR_MAGIC: u32 = 0;

/// Pack `(major, minor)` the way the SPIR-V header version word expects:
/// `major << 16 | minor << 8`.
pub fn make_version(major: u32, minor: u32) -> u32 {
    (major << 16) | (minor << 8)
}

/// An in-memory SPIR-V module: an arena of instructions and blocks, a set of
/// section lists that order references into that arena, and the interning
/// tables that keep `add_type`/`constant` idempotent.
pub struct Module {
    pub version: u32,
    logger: Box<dyn Logger>,
    infer: Box<dyn InferResultType>,

    instrs: Vec<Instruction>,
    blocks: Vec<BasicBlockData>,

    capabilities: Vec<InstrId>,
    extensions: Vec<InstrId>,
    ext_inst_imports: Vec<(String, InstrId)>,
    memory_model: Option<InstrId>,
    entry_points: Vec<EntryPoint>,
    decorations: Vec<InstrId>,
    types_and_constants: Vec<InstrId>,
    global_variables: Vec<InstrId>,
    functions: Vec<Function>,
    source_instrs: Vec<InstrId>,
    name_instrs: Vec<InstrId>,
    module_processed_instrs: Vec<InstrId>,

    type_cache: FnvHashMap<Type, InstrId>,
    /// Reverse of `type_cache`: lets anything holding only an already-interned
    /// type's `InstrId` (e.g. `BlockCursor::ext_inst`'s `ret_ty` parameter)
    /// recover its structural `Type` for `result_tys` bookkeeping.
    ty_of_interned: FnvHashMap<InstrId, Type>,
    const_cache: FnvHashMap<Constant, InstrId>,
    /// Structural type of every value-producing instruction seen so far, so
    /// `BlockCursor`'s arithmetic/load/access-chain helpers can infer result
    /// types without the caller repeating them.
    result_tys: FnvHashMap<InstrId, Type>,

    poisoned: bool,
}

impl Module {
    pub fn new(version: u32) -> Self {
        Self::with_logger(version, Box::new(StdLogger))
    }

    pub fn with_logger(version: u32, logger: Box<dyn Logger>) -> Self {
        Module {
            version,
            logger,
            infer: Box::new(DefaultInferResultType),
            instrs: Vec::new(),
            blocks: Vec::new(),
            capabilities: Vec::new(),
            extensions: Vec::new(),
            ext_inst_imports: Vec::new(),
            memory_model: None,
            entry_points: Vec::new(),
            decorations: Vec::new(),
            types_and_constants: Vec::new(),
            global_variables: Vec::new(),
            functions: Vec::new(),
            source_instrs: Vec::new(),
            name_instrs: Vec::new(),
            module_processed_instrs: Vec::new(),
            type_cache: FnvHashMap::default(),
            ty_of_interned: FnvHashMap::default(),
            const_cache: FnvHashMap::default(),
            result_tys: FnvHashMap::default(),
            poisoned: false,
        }
    }

    pub fn set_infer(&mut self, infer: Box<dyn InferResultType>) {
        self.infer = infer;
    }

    fn log(&self, level: LogLevel, msg: &str) {
        self.logger.log(level, msg);
    }

    fn poison(&mut self, msg: &str) {
        self.log(LogLevel::Fatal, msg);
        self.poisoned = true;
    }

    // -- arena access ------------------------------------------------------

    pub(crate) fn push_instr(&mut self, instr: Instruction) -> InstrId {
        self.instrs.push(instr);
        InstrId((self.instrs.len() - 1) as u32)
    }

    fn push_block(&mut self, label: InstrId) -> BlockId {
        self.blocks.push(BasicBlockData::new(label));
        BlockId((self.blocks.len() - 1) as u32)
    }

    pub fn instr(&self, id: InstrId) -> &Instruction {
        &self.instrs[id.index()]
    }
    pub fn instr_mut(&mut self, id: InstrId) -> &mut Instruction {
        &mut self.instrs[id.index()]
    }
    pub fn block(&self, id: BlockId) -> &BasicBlockData {
        &self.blocks[id.index()]
    }
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlockData {
        &mut self.blocks[id.index()]
    }
    pub fn result_ty_of(&self, id: InstrId) -> Option<&Type> {
        self.result_tys.get(&id)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }
    pub fn entry_point(&self, id: EpId) -> &EntryPoint {
        &self.entry_points[id.index()]
    }

    pub(crate) fn func(&self, handle: FuncHandle) -> &Function {
        match handle {
            FuncHandle::Function(id) => &self.functions[id.index()],
            FuncHandle::EntryPoint(id) => &self.entry_points[id.index()].function,
        }
    }
    pub(crate) fn func_mut(&mut self, handle: FuncHandle) -> &mut Function {
        match handle {
            FuncHandle::Function(id) => &mut self.functions[id.index()],
            FuncHandle::EntryPoint(id) => &mut self.entry_points[id.index()].function,
        }
    }
    pub(crate) fn block_data_mut(&mut self, id: BlockId) -> &mut BasicBlockData {
        &mut self.blocks[id.index()]
    }

    // -- capabilities / extensions / memory model --------------------------

    pub fn add_capability(&mut self, cap: Capability) -> InstrId {
        let mut instr = Instruction::new(Op::Capability);
        instr.add_operand_literal(cap as u32);
        let id = self.push_instr(instr);
        self.capabilities.push(id);
        id
    }

    pub fn add_extension(&mut self, name: &str) -> InstrId {
        let mut instr = Instruction::new(Op::Extension);
        instr.append_str(name);
        let id = self.push_instr(instr);
        self.extensions.push(id);
        id
    }

    /// Import an extended instruction set, e.g. `"GLSL.std.450"`. Imports of
    /// the same name share one `OpExtInstImport`.
    pub fn ext_inst_import(&mut self, name: &str) -> InstrId {
        if let Some((_, id)) = self.ext_inst_imports.iter().find(|(n, _)| n == name) {
            return *id;
        }
        let mut instr = Instruction::new_with_id(Op::ExtInstImport);
        instr.append_str(name);
        let id = self.push_instr(instr);
        self.ext_inst_imports.push((name.to_string(), id));
        id
    }

    pub fn set_memory_model(&mut self, addressing: AddressingModel, memory: MemoryModel) {
        let mut instr = Instruction::new(Op::MemoryModel);
        instr
            .add_operand_literal(addressing as u32)
            .add_operand_literal(memory as u32);
        let id = self.push_instr(instr);
        self.memory_model = Some(id);
    }

    // -- debug / decorations -------------------------------------------------
    // Source strings, names, and module-processed notes are kept as three
    // separate ordered sections (rather than one merged debug section) so
    // their relative write order is fixed regardless of call order: a
    // caller naming an id before declaring `OpSource` must not flip the
    // emitted section order, since SPIR-V's logical layout fixes source
    // before names before module-processed.

    pub fn source(&mut self, lang: SourceLanguage, version: u32, source: Option<&str>) -> InstrId {
        let mut instr = Instruction::new(Op::Source);
        instr
            .add_operand_literal(lang as u32)
            .add_operand_literal(version);
        if let Some(s) = source {
            instr.append_str(s);
        }
        let id = self.push_instr(instr);
        self.source_instrs.push(id);
        id
    }

    pub fn name(&mut self, target: InstrId, name: &str) -> InstrId {
        let mut instr = Instruction::new(Op::Name);
        instr.add_operand(target).append_str(name);
        let id = self.push_instr(instr);
        self.name_instrs.push(id);
        id
    }

    pub fn member_name(&mut self, target: InstrId, member: u32, name: &str) -> InstrId {
        let mut instr = Instruction::new(Op::MemberName);
        instr
            .add_operand(target)
            .add_operand_literal(member)
            .append_str(name);
        let id = self.push_instr(instr);
        self.name_instrs.push(id);
        id
    }

    pub fn module_processed(&mut self, process: &str) -> InstrId {
        let mut instr = Instruction::new(Op::ModuleProcessed);
        instr.append_str(process);
        let id = self.push_instr(instr);
        self.module_processed_instrs.push(id);
        id
    }

    pub fn decorate(&mut self, target: InstrId, decoration: Decoration, extra: &[u32]) -> InstrId {
        let mut instr = Instruction::new(Op::Decorate);
        instr.add_operand(target).add_operand_literal(decoration as u32);
        for &w in extra {
            instr.add_operand_literal(w);
        }
        let id = self.push_instr(instr);
        self.decorations.push(id);
        id
    }

    pub fn member_decorate(
        &mut self,
        target: InstrId,
        member: u32,
        decoration: Decoration,
        extra: &[u32],
    ) -> InstrId {
        let mut instr = Instruction::new(Op::MemberDecorate);
        instr
            .add_operand(target)
            .add_operand_literal(member)
            .add_operand_literal(decoration as u32);
        for &w in extra {
            instr.add_operand_literal(w);
        }
        let id = self.push_instr(instr);
        self.decorations.push(id);
        id
    }

    // -- types / constants ---------------------------------------------------

    /// Intern a type, recursively interning its component types first.
    /// Returns the existing `InstrId` if this exact structural `Type` was
    /// already added.
    pub fn add_type(&mut self, ty: Type) -> InstrId {
        if let Some(&id) = self.type_cache.get(&ty) {
            return id;
        }
        let instr = self.build_type_instr(&ty);
        let id = self.push_instr(instr);
        self.types_and_constants.push(id);
        self.type_cache.insert(ty.clone(), id);
        self.ty_of_interned.insert(id, ty);
        id
    }

    fn build_type_instr(&mut self, ty: &Type) -> Instruction {
        let mut instr = Instruction::new_with_id(ty.opcode());
        match ty {
            Type::Void
            | Type::Bool
            | Type::Sampler
            | Type::Event
            | Type::DeviceEvent
            | Type::ReserveId
            | Type::Queue
            | Type::PipeStorage
            | Type::NamedBarrier
            | Type::AccelStruct
            | Type::RayQuery => {}
            Type::Int { width, is_signed } => {
                instr
                    .add_operand_literal(*width)
                    .add_operand_literal(*is_signed as u32);
            }
            Type::Float { width } => {
                instr.add_operand_literal(*width);
            }
            Type::Vector { elem, count } => {
                let elem_id = self.add_type((**elem).clone());
                instr.add_operand(elem_id).add_operand_literal(*count);
            }
            Type::Matrix { column, count } => {
                let col_id = self.add_type((**column).clone());
                instr.add_operand(col_id).add_operand_literal(*count);
            }
            Type::Image {
                sampled_ty,
                dim,
                depth,
                arrayed,
                ms,
                sampled,
                format,
                access,
            } => {
                let sid = self.add_type((**sampled_ty).clone());
                instr
                    .add_operand(sid)
                    .add_operand_literal(*dim as u32)
                    .add_operand_literal(*depth)
                    .add_operand_literal(*arrayed)
                    .add_operand_literal(*ms)
                    .add_operand_literal(*sampled)
                    .add_operand_literal(*format as u32);
                if let Some(acc) = access {
                    instr.add_operand_literal(*acc as u32);
                }
            }
            Type::SampledImage { image_ty } => {
                let iid = self.add_type((**image_ty).clone());
                instr.add_operand(iid);
            }
            Type::Array { elem, length } => {
                let eid = self.add_type((**elem).clone());
                let len_id = self.constant(Constant::scalar(*length));
                instr.add_operand(eid).add_operand(len_id);
            }
            Type::RuntimeArray { elem } => {
                let eid = self.add_type((**elem).clone());
                instr.add_operand(eid);
            }
            Type::Struct { members } => {
                let ids: Vec<InstrId> = members.iter().map(|m| self.add_type(m.clone())).collect();
                for id in ids {
                    instr.add_operand(id);
                }
            }
            Type::Pointer {
                storage_class,
                pointee,
            } => {
                let pid = self.add_type((**pointee).clone());
                instr.add_operand_literal(*storage_class as u32).add_operand(pid);
            }
            Type::ForwardPointer { .. } => {
                // Never interned through `add_type`: a self-referential
                // pointee can't be expressed as a finite `Type` value. Built
                // through `forward_declare_pointer`/`complete_forward_pointer`
                // instead, which work on raw ids.
                unreachable!("Type::ForwardPointer is not interned; use forward_declare_pointer")
            }
            Type::Function { ret, params } => {
                let rid = self.add_type((**ret).clone());
                let pids: Vec<InstrId> = params.iter().map(|p| self.add_type(p.clone())).collect();
                instr.add_operand(rid);
                for id in pids {
                    instr.add_operand(id);
                }
            }
        }
        instr
    }

    /// Intern a constant, recursively interning its type and (for
    /// composites) its component constants first.
    pub fn constant(&mut self, c: Constant) -> InstrId {
        if let Some(&id) = self.const_cache.get(&c) {
            return id;
        }
        let ty_id = self.add_type(c.ty.clone());
        let mut instr = Instruction::new_typed(c.opcode(), ty_id);
        match &c.data {
            crate::constant::ConstantData::True
            | crate::constant::ConstantData::False
            | crate::constant::ConstantData::Null => {}
            crate::constant::ConstantData::Scalar(v) => {
                for w in v.to_words() {
                    instr.add_operand_literal(w);
                }
            }
            crate::constant::ConstantData::Composite(components) => {
                let ids: Vec<InstrId> = components.iter().cloned().map(|comp| self.constant(comp)).collect();
                for id in ids {
                    instr.add_operand(id);
                }
            }
            crate::constant::ConstantData::Sampler(modes) => {
                instr
                    .add_operand_literal(modes.addressing_mode)
                    .add_operand_literal(modes.normalized as u32)
                    .add_operand_literal(modes.filter_mode);
            }
        }
        let id = self.push_instr(instr);
        self.types_and_constants.push(id);
        self.result_tys.insert(id, c.ty.clone());
        let spec_id = c.spec_id;
        let is_spec = c.is_spec;
        self.const_cache.insert(c, id);
        if is_spec {
            if let Some(spec_id) = spec_id {
                self.decorate(id, Decoration::SpecId, &[spec_id]);
            }
        }
        id
    }

    /// Reserve an id for a pointer type whose pointee isn't known yet (the
    /// recursive-struct-via-pointer case `add_type` can't express). The
    /// returned `InstrId` is already safe to use as a struct member operand;
    /// fill in its storage class and pointee with `complete_forward_pointer`
    /// before `write`.
    pub fn forward_declare_pointer(&mut self, storage_class: StorageClass) -> InstrId {
        let ptr_id = self.push_instr(Instruction::new_with_id(Op::TypePointer));
        let mut fwd = Instruction::new(Op::TypeForwardPointer);
        fwd.add_operand(ptr_id).add_operand_literal(storage_class as u32);
        let fwd_id = self.push_instr(fwd);
        self.types_and_constants.push(fwd_id);
        ptr_id
    }

    pub fn complete_forward_pointer(&mut self, ptr_id: InstrId, storage_class: StorageClass, pointee: InstrId) {
        self.instr_mut(ptr_id)
            .add_operand_literal(storage_class as u32)
            .add_operand(pointee);
        self.types_and_constants.push(ptr_id);
    }

    /// Build an `OpType*` instruction from already-known member/operand ids
    /// rather than structural `Type` values. The only legitimate use is the
    /// recursive-struct-via-pointer case `forward_declare_pointer` sets up;
    /// it does not participate in `add_type`'s interning cache.
    pub fn add_raw_type(&mut self, opcode: Op, operands: Vec<Operand>) -> InstrId {
        let mut instr = Instruction::new_with_id(opcode);
        for op in operands {
            instr.add_operand(op);
        }
        let id = self.push_instr(instr);
        self.types_and_constants.push(id);
        id
    }

    // -- global variables -----------------------------------------------------

    /// Declare a variable. Non-`Function` storage classes go in the global
    /// variable section automatically; `Function`-storage variables are
    /// returned for the caller to place at the head of the entry block's
    /// instruction list, per the SPIR-V rule that they must precede every
    /// other instruction in the function.
    pub fn variable(&mut self, storage_class: StorageClass, ty: Type, initializer: Option<InstrId>) -> InstrId {
        let pointer_ty = Type::pointer(storage_class, ty.clone());
        let pointer_ty_id = self.add_type(pointer_ty.clone());
        let mut instr = Instruction::new_typed(Op::Variable, pointer_ty_id);
        instr.add_operand_literal(storage_class as u32);
        if let Some(init) = initializer {
            instr.add_operand(init);
        }
        let id = self.push_instr(instr);
        self.result_tys.insert(id, pointer_ty);
        if storage_class != StorageClass::Function {
            self.global_variables.push(id);
        }
        id
    }

    // -- functions / entry points ---------------------------------------------

    fn build_function_header(
        &mut self,
        ret_ty: Type,
        param_tys: Vec<Type>,
        control: FunctionControl,
    ) -> (InstrId, Vec<InstrId>, InstrId) {
        let ret_id = self.add_type(ret_ty.clone());
        let fn_ty_id = self.add_type(Type::func(ret_ty, param_tys.clone()));
        let mut def_instr = Instruction::new_typed(Op::Function, ret_id);
        def_instr.add_operand_literal(control.bits()).add_operand(fn_ty_id);
        let def = self.push_instr(def_instr);

        let mut params = Vec::with_capacity(param_tys.len());
        for pty in &param_tys {
            let pty_id = self.add_type(pty.clone());
            let p_id = self.push_instr(Instruction::new_typed(Op::FunctionParameter, pty_id));
            self.result_tys.insert(p_id, pty.clone());
            params.push(p_id);
        }
        (def, params, fn_ty_id)
    }

    pub fn add_function(&mut self, ret_ty: Type, param_tys: Vec<Type>, control: FunctionControl) -> FuncId {
        let (def, params, fn_ty) = self.build_function_header(ret_ty.clone(), param_tys.clone(), control);
        self.functions.push(Function {
            ret_ty,
            param_tys,
            fn_ty,
            control,
            def,
            params,
            blocks: Vec::new(),
        });
        FuncId((self.functions.len() - 1) as u32)
    }

    pub fn add_entry_point(
        &mut self,
        exec_model: ExecutionModel,
        name: &str,
        ret_ty: Type,
        param_tys: Vec<Type>,
        control: FunctionControl,
    ) -> EpId {
        let (def, params, fn_ty) = self.build_function_header(ret_ty.clone(), param_tys.clone(), control);
        let function = Function {
            ret_ty,
            param_tys,
            fn_ty,
            control,
            def,
            params,
            blocks: Vec::new(),
        };
        self.entry_points.push(EntryPoint {
            exec_model,
            name: name.to_string(),
            function,
            exec_modes: Vec::new(),
            interface: Vec::new(),
        });
        EpId((self.entry_points.len() - 1) as u32)
    }

    pub fn execution_mode(&mut self, ep: EpId, mode: ExecutionMode, extra: &[u32]) -> InstrId {
        let target = self.entry_points[ep.index()].function.def;
        let mut instr = Instruction::new(Op::ExecutionMode);
        instr.add_operand(target).add_operand_literal(mode as u32);
        for &w in extra {
            instr.add_operand_literal(w);
        }
        let id = self.push_instr(instr);
        self.entry_points[ep.index()].exec_modes.push(id);
        id
    }

    pub fn add_block(&mut self, func: impl Into<FuncHandle>) -> BlockId {
        let label = self.push_instr(Instruction::new_with_id(Op::Label));
        let block_id = self.push_block(label);
        self.func_mut(func.into()).blocks.push(block_id);
        block_id
    }

    // -- entry-point interface -------------------------------------------------

    /// Walk every instruction reachable from this entry point's own blocks
    /// and collect the unique non-`Function`-storage `OpVariable`s they
    /// reference, per spec.md's interface-finalization rule. Below SPIR-V
    /// 1.4 the result is restricted to `Input`/`Output` storage, matching
    /// the pre-1.4 `OpEntryPoint` interface rule.
    /// Never returns `BuildError::MissingInterfaceVariable`: every operand
    /// `InstrId` walked here was produced by `push_instr` into this same
    /// arena, so `self.instrs[oid.index()]` always resolves. There is no
    /// "id not found" state to report in this model.
    fn finalize_interface(&mut self, i: usize) {
        let all_storage = self.version >= make_version(1, 4);
        let blocks = self.entry_points[i].function.blocks.clone();
        let mut seen = HashSet::new();
        let mut interface = Vec::new();
        for bid in blocks {
            let instrs = self.blocks[bid.index()].instrs.clone();
            for iid in instrs {
                let operands = self.instrs[iid.index()].operands.clone();
                for op in operands {
                    let oid = match op {
                        Operand::Instr(oid) => oid,
                        _ => continue,
                    };
                    if self.instrs[oid.index()].opcode != Op::Variable {
                        continue;
                    }
                    let sc = match self.instrs[oid.index()].operands.first() {
                        Some(Operand::Literal(w)) => *w,
                        _ => continue,
                    };
                    let is_function_storage = sc == StorageClass::Function as u32;
                    let included = if all_storage {
                        !is_function_storage
                    } else {
                        sc == StorageClass::Input as u32 || sc == StorageClass::Output as u32
                    };
                    if included && seen.insert(oid) {
                        interface.push(oid);
                    }
                }
            }
        }
        self.entry_points[i].interface = interface;
    }

    // -- validation --------------------------------------------------------

    /// Structural checks that don't require a writer: every non-declaration
    /// function/entry-point block ends in a terminal instruction.
    pub fn validate(&self) -> Vec<BuildError> {
        let mut errs = Vec::new();
        for func in &self.functions {
            if !func.is_declaration_only() {
                for &bid in &func.blocks {
                    if self.blocks[bid.index()].terminator(&self.instrs).is_none() {
                        errs.push(BuildError::UnterminatedBlock);
                    }
                }
            }
        }
        for ep in &self.entry_points {
            for &bid in &ep.function.blocks {
                if self.blocks[bid.index()].terminator(&self.instrs).is_none() {
                    errs.push(BuildError::UnterminatedBlock);
                }
            }
        }
        errs
    }

    // -- emission ------------------------------------------------------------

    /// Serialize the module as a SPIR-V binary word stream into `sink`,
    /// following the section order `original_source`'s writer uses:
    /// capabilities, extensions, ext-inst imports, memory model, entry
    /// points, execution modes, source strings, names, module-processed
    /// notes, decorations, types-and-constants, global variables, function
    /// declarations, function definitions, entry point function
    /// definitions — then the id bound is backfilled.
    pub fn write(&mut self, sink: &mut dyn Writer) -> BuildResult<()> {
        if self.poisoned {
            return Err(BuildError::Poisoned);
        }
        if !self.validate().is_empty() {
            self.poison("validation failed before write");
            return Err(BuildError::UnterminatedBlock);
        }

        let mut counter = IdCounter::new();

        sink.put(MAGIC);
        sink.put(self.version);
        sink.put(GENERATOR_MAGIC);
        let bound_offset = sink.put(0);
        sink.put(0);

        for i in 0..self.capabilities.len() {
            let id = self.capabilities[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.extensions.len() {
            let id = self.extensions[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.ext_inst_imports.len() {
            let id = self.ext_inst_imports[i].1;
            self.write_instr(id, &mut counter, sink)?;
        }
        if let Some(mm) = self.memory_model {
            self.write_instr(mm, &mut counter, sink)?;
        }

        for i in 0..self.entry_points.len() {
            self.finalize_interface(i);
            self.write_entry_point_instr(i, &mut counter, sink)?;
        }
        for i in 0..self.entry_points.len() {
            let modes = self.entry_points[i].exec_modes.clone();
            for id in modes {
                self.write_instr(id, &mut counter, sink)?;
            }
        }

        for i in 0..self.source_instrs.len() {
            let id = self.source_instrs[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.name_instrs.len() {
            let id = self.name_instrs[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.module_processed_instrs.len() {
            let id = self.module_processed_instrs[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.decorations.len() {
            let id = self.decorations[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.types_and_constants.len() {
            let id = self.types_and_constants[i];
            self.write_instr(id, &mut counter, sink)?;
        }
        for i in 0..self.global_variables.len() {
            let id = self.global_variables[i];
            self.write_instr(id, &mut counter, sink)?;
        }

        for i in 0..self.functions.len() {
            if self.functions[i].is_declaration_only() {
                self.write_function(FuncHandle::Function(FuncId(i as u32)), &mut counter, sink)?;
            }
        }
        for i in 0..self.functions.len() {
            if !self.functions[i].is_declaration_only() {
                self.write_function(FuncHandle::Function(FuncId(i as u32)), &mut counter, sink)?;
            }
        }
        for i in 0..self.entry_points.len() {
            self.write_function(FuncHandle::EntryPoint(EpId(i as u32)), &mut counter, sink)?;
        }

        sink.put_at(counter.max_id() + 1, bound_offset);
        Ok(())
    }

    fn write_entry_point_instr(&mut self, i: usize, counter: &mut IdCounter, sink: &mut dyn Writer) -> BuildResult<()> {
        let exec_model = self.entry_points[i].exec_model;
        let func_def = self.entry_points[i].function.def;
        let name = self.entry_points[i].name.clone();
        let interface = self.entry_points[i].interface.clone();
        let mut instr = Instruction::new(Op::EntryPoint);
        instr
            .add_operand_literal(exec_model as u32)
            .add_operand(func_def)
            .append_str(&name);
        for id in interface {
            instr.add_operand(id);
        }
        let id = self.push_instr(instr);
        self.write_instr(id, counter, sink)
    }

    fn write_function(&mut self, handle: FuncHandle, counter: &mut IdCounter, sink: &mut dyn Writer) -> BuildResult<()> {
        let def = self.func(handle).def;
        self.write_instr(def, counter, sink)?;
        let params = self.func(handle).params.clone();
        for p in params {
            self.write_instr(p, counter, sink)?;
        }
        if !self.func(handle).is_declaration_only() {
            self.preassign_function_ids(handle, counter);
            let blocks = self.func(handle).blocks.clone();
            for bid in blocks {
                if self.blocks[bid.index()].terminator(&self.instrs).is_none() {
                    self.poison("unterminated basic block at emission time");
                    return Err(BuildError::UnterminatedBlock);
                }
                let label = self.blocks[bid.index()].label;
                self.write_instr(label, counter, sink)?;
                let instrs = self.blocks[bid.index()].instrs.clone();
                for iid in instrs {
                    self.write_instr(iid, counter, sink)?;
                }
            }
        }
        let end_id = self.push_instr(Instruction::new(Op::FunctionEnd));
        self.write_instr(end_id, counter, sink)
    }

    /// Assign ids to every label and instruction of a function body in
    /// declaration order before any of its words are written, so a forward
    /// branch (e.g. a loop's back-edge into its own header) resolves to the
    /// id that position would have gotten anyway, rather than whatever id
    /// happened to be free at the point of first reference.
    fn preassign_function_ids(&mut self, handle: FuncHandle, counter: &mut IdCounter) {
        let blocks = self.func(handle).blocks.clone();
        for bid in blocks {
            let label = self.blocks[bid.index()].label;
            self.instrs[label.index()].assign_id(counter);
            let instrs = self.blocks[bid.index()].instrs.clone();
            for iid in instrs {
                self.instrs[iid.index()].assign_id(counter);
            }
        }
    }

    fn write_instr(&mut self, id: InstrId, counter: &mut IdCounter, sink: &mut dyn Writer) -> BuildResult<()> {
        let word_count = self.instrs[id.index()].word_count();
        let opcode = self.instrs[id.index()].opcode;
        let header = (opcode as u32 & 0xFFFF) | (word_count << 16);
        sink.put(header);

        if let Some(rt) = self.instrs[id.index()].result_type {
            let rt_id = self.resolve_id(rt, counter)?;
            sink.put(rt_id);
        }
        if self.instrs[id.index()].has_result_id() {
            let self_id = self.instrs[id.index()].assign_id(counter);
            sink.put(self_id);
        }
        let operands = self.instrs[id.index()].operands.clone();
        for operand in operands {
            match operand {
                Operand::Instr(oid) => {
                    let w = self.resolve_id(oid, counter)?;
                    sink.put(w);
                }
                Operand::Block(bid) => {
                    let w = self.resolve_block_id(bid, counter)?;
                    sink.put(w);
                }
                Operand::RawId(rid) => {
                    if rid == 0 {
                        return Err(BuildError::DanglingId);
                    }
                    sink.put(rid);
                }
                Operand::Literal(word) => {
                    sink.put(word);
                }
            }
        }
        Ok(())
    }

    /// Resolve a sibling instruction's result id, assigning it on the spot
    /// if this is its first reference (the forward-reference case: e.g. an
    /// `OpEntryPoint` naming a function that's written later).
    fn resolve_id(&mut self, id: InstrId, counter: &mut IdCounter) -> BuildResult<u32> {
        if !self.instrs[id.index()].has_result_id() {
            return Err(BuildError::DanglingId);
        }
        Ok(self.instrs[id.index()].assign_id(counter))
    }

    fn resolve_block_id(&mut self, id: BlockId, counter: &mut IdCounter) -> BuildResult<u32> {
        let label = self.blocks[id.index()].label;
        self.resolve_id(label, counter)
    }

    // -- cursor ----------------------------------------------------------------

    pub fn cursor(&mut self, block: BlockId) -> BlockCursor<'_> {
        BlockCursor { module: self, block }
    }
}

/// Ergonomic handle for appending instructions to one basic block. Mirrors
/// the original source's `BasicBlock` builder methods, generalized from its
/// fixed GLSL-extension-call surface to the generic `ext_inst` plus
/// table-generated wrappers spec.md's design notes call for.
pub struct BlockCursor<'m> {
    module: &'m mut Module,
    block: BlockId,
}

impl<'m> BlockCursor<'m> {
    pub fn block_id(&self) -> BlockId {
        self.block
    }

    fn push(&mut self, instr: Instruction) -> InstrId {
        if self.module.blocks[self.block.index()].is_terminated(&self.module.instrs) {
            self.module.log(LogLevel::Fatal, "appended instruction to a block that already has a terminator");
        }
        let id = self.module.push_instr(instr);
        self.module.blocks[self.block.index()].instrs.push(id);
        id
    }

    /// Low-level escape hatch: emit any opcode with an explicit result type
    /// and operand list.
    pub fn emit(&mut self, opcode: Op, result_ty: Option<InstrId>, operands: Vec<Operand>) -> InstrId {
        let mut instr = match result_ty {
            Some(ty) => Instruction::new_typed(opcode, ty),
            None => Instruction::new(opcode),
        };
        for op in operands {
            instr.add_operand(op);
        }
        self.push(instr)
    }

    pub fn load(&mut self, pointer: InstrId) -> BuildResult<InstrId> {
        let ptr_ty = self
            .module
            .result_tys
            .get(&pointer)
            .cloned()
            .ok_or(BuildError::DanglingId)?;
        let pointee = match ptr_ty {
            Type::Pointer { pointee, .. } => *pointee,
            _ => return Err(BuildError::UnimplementedOpcode("Load operand is not a pointer")),
        };
        let ty_id = self.module.add_type(pointee.clone());
        let mut instr = Instruction::new_typed(Op::Load, ty_id);
        instr.add_operand(pointer);
        let id = self.push(instr);
        self.module.result_tys.insert(id, pointee);
        Ok(id)
    }

    pub fn store(&mut self, pointer: InstrId, value: InstrId) -> InstrId {
        let mut instr = Instruction::new(Op::Store);
        instr.add_operand(pointer).add_operand(value);
        self.push(instr)
    }

    /// Build an access chain. The element type is supplied explicitly
    /// rather than derived from `base`'s type plus `indices`: resolving a
    /// struct member index to its member type needs the member list, which
    /// a plain `InstrId` index doesn't carry, so the caller (which built the
    /// aggregate type) is in a better position to know it.
    pub fn access_chain(
        &mut self,
        result_ty: Type,
        storage_class: StorageClass,
        base: InstrId,
        indices: Vec<InstrId>,
    ) -> InstrId {
        let ptr_ty = Type::pointer(storage_class, result_ty);
        let ty_id = self.module.add_type(ptr_ty.clone());
        let mut instr = Instruction::new_typed(Op::AccessChain, ty_id);
        instr.add_operand(base);
        for idx in indices {
            instr.add_operand(idx);
        }
        let id = self.push(instr);
        self.module.result_tys.insert(id, ptr_ty);
        id
    }

    fn binary(&mut self, opcode: Op, lhs: InstrId, rhs: InstrId) -> BuildResult<InstrId> {
        let lty = self.module.result_tys.get(&lhs).cloned().ok_or(BuildError::DanglingId)?;
        let inferred = self
            .module
            .infer
            .infer(opcode, &[&lty])
            .ok_or(BuildError::UnimplementedOpcode("binary op result type not inferable"))?;
        let ty_id = self.module.add_type(inferred.clone());
        let mut instr = Instruction::new_typed(opcode, ty_id);
        instr.add_operand(lhs).add_operand(rhs);
        let id = self.push(instr);
        self.module.result_tys.insert(id, inferred);
        Ok(id)
    }

    fn unary(&mut self, opcode: Op, operand: InstrId) -> BuildResult<InstrId> {
        let ty = self
            .module
            .result_tys
            .get(&operand)
            .cloned()
            .ok_or(BuildError::DanglingId)?;
        let inferred = self
            .module
            .infer
            .infer(opcode, &[&ty])
            .ok_or(BuildError::UnimplementedOpcode("unary op result type not inferable"))?;
        let ty_id = self.module.add_type(inferred.clone());
        let mut instr = Instruction::new_typed(opcode, ty_id);
        instr.add_operand(operand);
        let id = self.push(instr);
        self.module.result_tys.insert(id, inferred);
        Ok(id)
    }

    pub fn iadd(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::IAdd, l, r)
    }
    pub fn fadd(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::FAdd, l, r)
    }
    pub fn isub(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::ISub, l, r)
    }
    pub fn fsub(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::FSub, l, r)
    }
    pub fn imul(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::IMul, l, r)
    }
    pub fn fmul(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::FMul, l, r)
    }
    pub fn sdiv(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::SDiv, l, r)
    }
    pub fn udiv(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::UDiv, l, r)
    }
    pub fn fdiv(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::FDiv, l, r)
    }
    pub fn bitwise_and(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::BitwiseAnd, l, r)
    }
    pub fn bitwise_or(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::BitwiseOr, l, r)
    }
    pub fn logical_and(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::LogicalAnd, l, r)
    }
    pub fn logical_or(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::LogicalOr, l, r)
    }
    pub fn i_equal(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::IEqual, l, r)
    }
    pub fn s_less_than(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::SLessThan, l, r)
    }
    pub fn f_ord_less_than(&mut self, l: InstrId, r: InstrId) -> BuildResult<InstrId> {
        self.binary(Op::FOrdLessThan, l, r)
    }

    pub fn f_negate(&mut self, operand: InstrId) -> BuildResult<InstrId> {
        self.unary(Op::FNegate, operand)
    }
    pub fn s_negate(&mut self, operand: InstrId) -> BuildResult<InstrId> {
        self.unary(Op::SNegate, operand)
    }
    pub fn logical_not(&mut self, operand: InstrId) -> BuildResult<InstrId> {
        self.unary(Op::LogicalNot, operand)
    }

    pub fn select(&mut self, cond: InstrId, true_v: InstrId, false_v: InstrId) -> BuildResult<InstrId> {
        let ty = self
            .module
            .result_tys
            .get(&true_v)
            .cloned()
            .ok_or(BuildError::DanglingId)?;
        let ty_id = self.module.add_type(ty.clone());
        let mut instr = Instruction::new_typed(Op::Select, ty_id);
        instr.add_operand(cond).add_operand(true_v).add_operand(false_v);
        let id = self.push(instr);
        self.module.result_tys.insert(id, ty);
        Ok(id)
    }

    pub fn call(&mut self, func: FuncId, ret_ty: Type, args: Vec<InstrId>) -> InstrId {
        let ty_id = self.module.add_type(ret_ty.clone());
        let target = self.module.func(FuncHandle::Function(func)).def;
        let mut instr = Instruction::new_typed(Op::FunctionCall, ty_id);
        instr.add_operand(target);
        for a in args {
            instr.add_operand(a);
        }
        let id = self.push(instr);
        self.module.result_tys.insert(id, ret_ty);
        id
    }

    pub fn composite_construct(&mut self, ty: Type, components: Vec<InstrId>) -> InstrId {
        let ty_id = self.module.add_type(ty.clone());
        let mut instr = Instruction::new_typed(Op::CompositeConstruct, ty_id);
        for c in components {
            instr.add_operand(c);
        }
        let id = self.push(instr);
        self.module.result_tys.insert(id, ty);
        id
    }

    pub fn composite_extract(&mut self, ty: Type, composite: InstrId, indices: &[u32]) -> InstrId {
        let ty_id = self.module.add_type(ty.clone());
        let mut instr = Instruction::new_typed(Op::CompositeExtract, ty_id);
        instr.add_operand(composite);
        for &i in indices {
            instr.add_operand_literal(i);
        }
        let id = self.push(instr);
        self.module.result_tys.insert(id, ty);
        id
    }

    // -- extended instructions --------------------------------------------

    pub fn ext_inst(&mut self, set: InstrId, opcode: u32, ret_ty: InstrId, args: Vec<InstrId>) -> InstrId {
        let mut instr = Instruction::new_typed(Op::ExtInst, ret_ty);
        instr.add_operand(set).add_operand_literal(opcode);
        for a in args {
            instr.add_operand(a);
        }
        let id = self.push(instr);
        if let Some(ty) = self.module.ty_of_interned.get(&ret_ty).cloned() {
            self.module.result_tys.insert(id, ty);
        }
        id
    }

    crate::glsl_ext_inst_wrappers! {
        round => Round(x),
        round_even => RoundEven(x),
        trunc => Trunc(x),
        f_abs => FAbs(x),
        s_abs => SAbs(x),
        f_sign => FSign(x),
        s_sign => SSign(x),
        floor => Floor(x),
        ceil => Ceil(x),
        fract => Fract(x),
        sin => Sin(x),
        cos => Cos(x),
        tan => Tan(x),
        pow => Pow(x, y),
        exp => Exp(x),
        log => Log(x),
        exp2 => Exp2(x),
        log2 => Log2(x),
        sqrt => Sqrt(x),
        inverse_sqrt => InverseSqrt(x),
        f_min => FMin(x, y),
        u_min => UMin(x, y),
        s_min => SMin(x, y),
        f_max => FMax(x, y),
        u_max => UMax(x, y),
        s_max => SMax(x, y),
        f_clamp => FClamp(x, min_v, max_v),
        f_mix => FMix(x, y, a),
        fma => Fma(a, b, c),
        length => Length(x),
        distance => Distance(p0, p1),
        cross => Cross(x, y),
        normalize => Normalize(x),
        reflect => Reflect(i, n),
    }

    // -- terminators --------------------------------------------------------

    pub fn branch(&mut self, target: BlockId) -> InstrId {
        let mut instr = Instruction::new(Op::Branch);
        instr.add_operand_block(target);
        self.push(instr)
    }

    pub fn branch_conditional(&mut self, cond: InstrId, true_b: BlockId, false_b: BlockId) -> InstrId {
        let mut instr = Instruction::new(Op::BranchConditional);
        instr
            .add_operand(cond)
            .add_operand_block(true_b)
            .add_operand_block(false_b);
        self.push(instr)
    }

    pub fn return_void(&mut self) -> InstrId {
        self.push(Instruction::new(Op::Return))
    }

    pub fn return_value(&mut self, value: InstrId) -> InstrId {
        let mut instr = Instruction::new(Op::ReturnValue);
        instr.add_operand(value);
        self.push(instr)
    }

    pub fn unreachable(&mut self) -> InstrId {
        self.push(Instruction::new(Op::Unreachable))
    }

    pub fn kill(&mut self) -> InstrId {
        self.push(Instruction::new(Op::Kill))
    }
}
