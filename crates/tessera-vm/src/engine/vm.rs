//! Program interpreter.
//!
//! Serializers write builder 0 in place and finish chained builders into
//! references of their parent. Parsers read slice 0 in place and open chained
//! slices from the next reference of their parent. Nested structs call the
//! nested type's own program, exactly like the emitted procedures do.

use num_bigint::{BigInt, BigUint};
use tessera_cell::{
    Cell, CellBuilder, CellError, CellIndex, CellSlice, DefaultValue, FieldOp, HEADER_BITS, Instr,
    Program, ProgramKind, ProgramSet, RefKind, names,
};
use tessera_core::IntFormat;

use super::error::{Result, RuntimeError};
use super::value::Value;

/// Execution limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuelLimits {
    /// Maximum instructions per top-level call (default: 1,000,000).
    pub(crate) exec_fuel: u32,
    /// Maximum nested program depth (default: 256).
    pub(crate) recursion_limit: u32,
}

impl Default for FuelLimits {
    fn default() -> Self {
        Self {
            exec_fuel: 1_000_000,
            recursion_limit: 256,
        }
    }
}

impl FuelLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exec_fuel(mut self, fuel: u32) -> Self {
        self.exec_fuel = fuel;
        self
    }

    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn get_exec_fuel(&self) -> u32 {
        self.exec_fuel
    }

    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }
}

/// Contract persistent data as read back by the storage loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractData {
    /// Initialization flag set: the full field tensor.
    Initialized(Value),
    /// Initialization flag clear: only the init arguments are stored.
    Pending(Value),
}

/// Interpreter over a compiled program set.
pub struct VM<'p> {
    programs: &'p ProgramSet,
    limits: FuelLimits,
}

impl<'p> VM<'p> {
    pub fn new(programs: &'p ProgramSet) -> Self {
        Self {
            programs,
            limits: FuelLimits::default(),
        }
    }

    pub fn limits(mut self, limits: FuelLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs `$T$_store` on a fresh builder, like `$T$_store_cell`.
    pub fn serialize(&self, ty: &str, value: &Value) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        self.store(&names::store(ty), &mut builder, value)?;
        Ok(builder.end_cell())
    }

    /// Presence bit plus a reference to the serialized value, like `$T$_store_opt`.
    pub fn serialize_opt(&self, ty: &str, value: &Value) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        if value.is_null() {
            builder.store_bit(false)?;
        } else {
            builder.store_bit(true)?;
            builder.store_ref(self.serialize(ty, value)?)?;
        }
        Ok(builder.end_cell())
    }

    /// Runs `$T$_load` from the start of `cell`, like `$T$_load_cell`.
    pub fn parse(&self, ty: &str, cell: &Cell) -> Result<Value> {
        self.load(&names::load(ty), &mut cell.parse())
    }

    pub fn parse_no_opcode(&self, ty: &str, cell: &Cell) -> Result<Value> {
        self.load(&names::load_no_opcode(ty), &mut cell.parse())
    }

    /// Reads a bounced message body. Fields past the first cell come back as defaults.
    pub fn parse_bounced(&self, ty: &str, cell: &Cell) -> Result<Value> {
        self.load(&names::load_bounced(ty), &mut cell.parse())
    }

    pub fn parse_opt(&self, ty: &str, cell: &Cell) -> Result<Value> {
        let mut slice = cell.parse();
        if !slice.load_bit()? {
            return Ok(Value::Null);
        }
        self.parse(ty, slice.load_ref()?)
    }

    /// Data cell of a deployed but not yet initialized contract, like `$C$_init_data`.
    pub fn init_data(&self, contract: &str, params: &Value) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bit(false)?;
        self.store(&names::store(&names::init_id(contract)), &mut builder, params)?;
        Ok(builder.end_cell())
    }

    /// Data cell written by `$C$_contract_store`.
    pub fn contract_data(&self, contract: &str, state: &Value) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bit(true)?;
        self.store(&names::store(contract), &mut builder, state)?;
        Ok(builder.end_cell())
    }

    pub fn load_contract(&self, contract: &str, data: &Cell) -> Result<ContractData> {
        let mut slice = data.parse();
        if slice.load_bit()? {
            let state = self.load(&names::load_no_opcode(contract), &mut slice)?;
            return Ok(ContractData::Initialized(state));
        }
        let params = self.load(&names::load(&names::init_id(contract)), &mut slice)?;
        Ok(ContractData::Pending(params))
    }

    /// Executes the serializer `program` on `builder`.
    pub fn store(&self, program: &str, builder: &mut CellBuilder, value: &Value) -> Result<()> {
        Run::new(self).store(program, builder, value)
    }

    /// Executes the parser `program`, advancing `slice` past what it read.
    pub fn load(&self, program: &str, slice: &mut CellSlice<'_>) -> Result<Value> {
        Run::new(self).load(program, slice)
    }
}

/// Fuel and depth accounting for one top-level call.
struct Run<'v, 'p> {
    vm: &'v VM<'p>,
    fuel: u32,
    depth: u32,
}

impl<'v, 'p> Run<'v, 'p> {
    fn new(vm: &'v VM<'p>) -> Self {
        Self {
            vm,
            fuel: vm.limits.exec_fuel,
            depth: 0,
        }
    }

    fn program(&self, name: &str, parser: bool) -> Result<&'p Program> {
        let program = self
            .vm
            .programs
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownProgram(name.to_owned()))?;
        let is_parser = program.kind != ProgramKind::Serializer;
        if is_parser != parser {
            return Err(RuntimeError::WrongProgramKind {
                name: name.to_owned(),
                expected: if parser {
                    ProgramKind::Parser
                } else {
                    ProgramKind::Serializer
                },
                found: program.kind,
            });
        }
        Ok(program)
    }

    fn step(&mut self) -> Result<()> {
        if self.fuel == 0 {
            return Err(RuntimeError::ExecFuelExhausted(self.vm.limits.exec_fuel));
        }
        self.fuel -= 1;
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.vm.limits.recursion_limit {
            return Err(RuntimeError::RecursionLimitExceeded(self.depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn store(&mut self, name: &str, builder: &mut CellBuilder, value: &Value) -> Result<()> {
        let program = self.program(name, false)?;
        self.enter()?;
        tracing::trace!(program = %program.name, depth = self.depth, "store");

        let mut builders = vec![std::mem::take(builder)];
        for instr in &program.instrs {
            self.step()?;
            match instr {
                Instr::BeginCell { cell } => {
                    if builders.len() <= *cell {
                        builders.resize_with(*cell + 1, CellBuilder::new);
                    }
                }
                Instr::StoreHeader { cell, value } => {
                    slot(&mut builders, *cell, program, instr)?
                        .store_uint(u128::from(*value), HEADER_BITS)?;
                }
                Instr::Store { cell, field, op } => {
                    let v = field_value(program, value, field)?;
                    let b = slot(&mut builders, *cell, program, instr)?;
                    self.store_op(b, field, op, v)?;
                }
                Instr::EndCell { parent, child } => {
                    let done = std::mem::take(slot(&mut builders, *child, program, instr)?);
                    slot(&mut builders, *parent, program, instr)?.store_ref(done.end_cell())?;
                }
                Instr::CheckHeader { .. }
                | Instr::OpenCell { .. }
                | Instr::Load { .. }
                | Instr::Default { .. } => return Err(invalid(program, instr)),
            }
        }

        *builder = builders.swap_remove(0);
        self.depth -= 1;
        Ok(())
    }

    fn store_op(
        &mut self,
        b: &mut CellBuilder,
        field: &str,
        op: &FieldOp,
        v: &Value,
    ) -> Result<()> {
        match (op, v) {
            (FieldOp::Int(format), Value::Int(n)) => store_int(b, *format, n)?,
            (FieldOp::Bool, Value::Bool(x)) => b.store_bit(*x)?,
            (FieldOp::Address, Value::Address(a)) => b.store_address(a)?,
            (FieldOp::Bits(n), Value::Bits(data)) => b.store_bits(data, *n)?,
            (FieldOp::Ref(RefKind::String), Value::String(s)) => {
                b.store_ref(Cell::from_string(s)?)?;
            }
            (FieldOp::Ref(kind), Value::Cell(c)) if *kind != RefKind::String => {
                b.store_ref(c.clone())?;
            }
            (FieldOp::Dict, Value::Null) => b.store_bit(false)?,
            (FieldOp::Dict, Value::Cell(root)) => {
                b.store_bit(true)?;
                b.store_ref(root.clone())?;
            }
            (FieldOp::Struct { name, boxed }, Value::Struct(_)) => {
                if *boxed {
                    let mut child = CellBuilder::new();
                    self.store(&names::store(name), &mut child, v)?;
                    b.store_ref(child.end_cell())?;
                } else {
                    self.store(&names::store(name), b, v)?;
                }
            }
            (FieldOp::Optional { .. }, Value::Null) => b.store_bit(false)?,
            (FieldOp::Optional { inner, boxed }, _) => {
                b.store_bit(true)?;
                if *boxed {
                    let mut child = CellBuilder::new();
                    self.store_op(&mut child, field, inner, v)?;
                    b.store_ref(child.end_cell())?;
                } else {
                    self.store_op(b, field, inner, v)?;
                }
            }
            _ => {
                return Err(RuntimeError::ShapeMismatch {
                    field: field.to_owned(),
                    expected: op.to_string(),
                });
            }
        }
        Ok(())
    }

    fn load<'c>(&mut self, name: &str, slice: &mut CellSlice<'c>) -> Result<Value> {
        let program = self.program(name, true)?;
        self.enter()?;
        tracing::trace!(program = %program.name, depth = self.depth, "load");

        let mut slices = vec![*slice];
        let mut loaded: Vec<(String, Value)> = Vec::with_capacity(program.fields.len());
        for instr in &program.instrs {
            self.step()?;
            match instr {
                Instr::CheckHeader { cell, value } => {
                    let s = slot(&mut slices, *cell, program, instr)?;
                    let found = u32::try_from(s.load_uint(HEADER_BITS)?)
                        .map_err(|_| CellError::ValueOutOfRange { bits: HEADER_BITS })?;
                    if found != *value {
                        return Err(RuntimeError::OpcodeMismatch {
                            expected: *value,
                            found,
                        });
                    }
                }
                Instr::OpenCell { parent, child } => {
                    if *child != slices.len() {
                        return Err(invalid(program, instr));
                    }
                    let next = slot(&mut slices, *parent, program, instr)?.load_ref()?;
                    slices.push(next.parse());
                }
                Instr::Load { cell, field, op } => {
                    let s = slot(&mut slices, *cell, program, instr)?;
                    let v = self.load_op(s, op)?;
                    loaded.push((field.clone(), v));
                }
                Instr::Default { field, value } => {
                    let v = match value {
                        DefaultValue::Zero => Value::Int(BigInt::from(0)),
                        DefaultValue::False => Value::Bool(false),
                        DefaultValue::Null => Value::Null,
                    };
                    loaded.push((field.clone(), v));
                }
                Instr::BeginCell { .. }
                | Instr::StoreHeader { .. }
                | Instr::Store { .. }
                | Instr::EndCell { .. } => return Err(invalid(program, instr)),
            }
        }
        *slice = slices[0];

        let fields = program
            .fields
            .iter()
            .map(|name| {
                let pos = loaded.iter().position(|(k, _)| k == name).ok_or_else(|| {
                    RuntimeError::MissingField {
                        type_name: program.type_name.clone(),
                        field: name.clone(),
                    }
                })?;
                Ok(loaded.swap_remove(pos))
            })
            .collect::<Result<Vec<_>>>()?;

        self.depth -= 1;
        Ok(Value::Struct(fields))
    }

    fn load_op<'c>(&mut self, s: &mut CellSlice<'c>, op: &FieldOp) -> Result<Value> {
        let value = match op {
            FieldOp::Int(format) => Value::Int(load_int(s, *format)?),
            FieldOp::Bool => Value::Bool(s.load_bit()?),
            FieldOp::Address => Value::Address(s.load_address()?),
            FieldOp::Bits(n) => Value::Bits(s.load_bits(*n)?),
            FieldOp::Ref(RefKind::String) => Value::String(s.load_ref()?.read_string()?),
            FieldOp::Ref(_) => Value::Cell(s.load_ref()?.clone()),
            FieldOp::Dict => {
                if s.load_bit()? {
                    Value::Cell(s.load_ref()?.clone())
                } else {
                    Value::Null
                }
            }
            FieldOp::Struct { name, boxed: false } => self.load(&names::load(name), s)?,
            FieldOp::Struct { name, boxed: true } => {
                let cell = s.load_ref()?;
                self.load(&names::load(name), &mut cell.parse())?
            }
            FieldOp::Optional { inner, boxed } => {
                if !s.load_bit()? {
                    Value::Null
                } else if *boxed {
                    let cell = s.load_ref()?;
                    self.load_op(&mut cell.parse(), inner)?
                } else {
                    self.load_op(s, inner)?
                }
            }
        };
        Ok(value)
    }
}

fn slot<'a, T>(
    items: &'a mut [T],
    index: CellIndex,
    program: &Program,
    instr: &Instr,
) -> Result<&'a mut T> {
    items
        .get_mut(index)
        .ok_or_else(|| invalid(program, instr))
}

fn invalid(program: &Program, instr: &Instr) -> RuntimeError {
    RuntimeError::InvalidInstruction {
        program: program.name.clone(),
        instr: instr.to_string(),
    }
}

fn field_value<'a>(program: &Program, value: &'a Value, field: &str) -> Result<&'a Value> {
    let Value::Struct(_) = value else {
        return Err(RuntimeError::ShapeMismatch {
            field: program.type_name.clone(),
            expected: "struct".to_owned(),
        });
    };
    value.get(field).ok_or_else(|| RuntimeError::MissingField {
        type_name: program.type_name.clone(),
        field: field.to_owned(),
    })
}

fn unsigned(value: &BigInt, bits: u16) -> Result<BigUint> {
    value
        .to_biguint()
        .ok_or_else(|| CellError::ValueOutOfRange { bits }.into())
}

fn store_int(b: &mut CellBuilder, format: IntFormat, value: &BigInt) -> Result<()> {
    match format {
        IntFormat::Int(bits) => b.store_bigint(value, bits)?,
        IntFormat::Uint(bits) => b.store_biguint(&unsigned(value, bits)?, bits)?,
        IntFormat::VarInt(width) => b.store_var_int(value, width)?,
        IntFormat::VarUint(width) => {
            b.store_var_uint(&unsigned(value, 8 * width.max_bytes())?, width)?;
        }
    }
    Ok(())
}

fn load_int(s: &mut CellSlice<'_>, format: IntFormat) -> Result<BigInt> {
    Ok(match format {
        IntFormat::Int(bits) => s.load_bigint(bits)?,
        IntFormat::Uint(bits) => s.load_biguint(bits)?.into(),
        IntFormat::VarInt(width) => s.load_var_int(width)?,
        IntFormat::VarUint(width) => s.load_var_uint(width)?.into(),
    })
}
