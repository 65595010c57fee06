//! Downcall handles and call-buffer marshaling.

use std::fmt;

use log::debug;
use smallvec::SmallVec;
use strata_core::{MemoryError, Result};
use strata_layout::Layout;
use strata_memory::{Address, Region, Scope};

use crate::abi::{Abi, LinkerConfig};
use crate::descriptor::FunctionDescriptor;
use crate::symbols::SymbolLookup;

/// Placement of one value inside a call buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Byte offset from the start of the buffer.
    pub offset: u64,
    /// Size of the value in bytes.
    pub size: u64,
    /// Alignment of the slot in bytes.
    pub alignment: u64,
}

/// Where each argument, and then the return value, sits in a call buffer.
///
/// Every slot is aligned to the larger of its layout's alignment and the
/// word size. The return slot follows the last argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentFrame {
    args: SmallVec<[Slot; 6]>,
    ret: Option<Slot>,
    size: u64,
    alignment: u64,
}

fn align_up(value: u64, alignment: u64) -> Result<u64> {
    value
        .checked_add(alignment - 1)
        .map(|v| v & !(alignment - 1))
        .ok_or_else(|| MemoryError::invalid("call frame size overflows"))
}

impl ArgumentFrame {
    fn compute(descriptor: &FunctionDescriptor, word_bytes: u64) -> Result<ArgumentFrame> {
        let mut cursor = 0u64;
        let mut alignment = word_bytes;
        let mut place = |layout: &Layout| -> Result<Slot> {
            let slot_alignment = layout.bytes_alignment().max(word_bytes);
            let size = layout.bytes_size()?;
            let offset = align_up(cursor, slot_alignment)?;
            cursor = offset
                .checked_add(size)
                .ok_or_else(|| MemoryError::invalid("call frame size overflows"))?;
            alignment = alignment.max(slot_alignment);
            Ok(Slot {
                offset,
                size,
                alignment: slot_alignment,
            })
        };
        let args = descriptor
            .argument_layouts()
            .iter()
            .map(&mut place)
            .collect::<Result<SmallVec<[Slot; 6]>>>()?;
        let ret = descriptor.return_layout().map(&mut place).transpose()?;
        let size = align_up(cursor, alignment)?;
        Ok(ArgumentFrame {
            args,
            ret,
            size,
            alignment,
        })
    }

    /// Argument slots, in call order.
    pub fn argument_slots(&self) -> &[Slot] {
        &self.args
    }

    /// The return slot; `None` for void functions.
    pub fn return_slot(&self) -> Option<Slot> {
        self.ret
    }

    /// Total buffer size in bytes, rounded up to [`alignment`](Self::alignment).
    pub fn byte_size(&self) -> u64 {
        self.size
    }

    /// Alignment of the whole buffer in bytes.
    pub fn alignment(&self) -> u64 {
        self.alignment
    }
}

/// Builds [`NativeFunction`] handles under one explicit configuration.
#[derive(Clone, Debug)]
pub struct Linker {
    config: LinkerConfig,
}

impl Linker {
    /// A linker for `config`.
    pub fn new(config: LinkerConfig) -> Result<Linker> {
        config.validate()?;
        Ok(Linker { config })
    }

    /// The configuration this linker was built with.
    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Bind `descriptor` to the native code at `symbol`.
    ///
    /// The symbol must be a non-null off-heap address. Every layout must be
    /// sized, a whole number of bytes, non-empty, and not bare padding.
    pub fn downcall(&self, symbol: &Address, descriptor: FunctionDescriptor) -> Result<NativeFunction> {
        let raw = symbol
            .to_raw()
            .map_err(|_| MemoryError::invalid(format!("symbol {symbol} is not a native address")))?;
        if raw == 0 {
            return Err(MemoryError::invalid("symbol address is null"));
        }
        for (index, layout) in descriptor.argument_layouts().iter().enumerate() {
            check_layout(layout, &format!("argument {index}"))?;
        }
        if let Some(ret) = descriptor.return_layout() {
            check_layout(ret, "return value")?;
        }
        let frame = ArgumentFrame::compute(&descriptor, self.config.word_bytes)?;
        debug!(
            "linked {descriptor} at {raw:#x} ({}, {}-byte frame)",
            self.config.abi, frame.size
        );
        Ok(NativeFunction {
            symbol: raw,
            abi: self.config.abi,
            descriptor,
            frame,
        })
    }

    /// Resolve `name` through `symbols` and bind it.
    pub fn lookup_downcall(
        &self,
        symbols: &dyn SymbolLookup,
        name: &str,
        descriptor: FunctionDescriptor,
    ) -> Result<NativeFunction> {
        let symbol = symbols
            .lookup(name)
            .ok_or_else(|| MemoryError::invalid(format!("unknown symbol `{name}`")))?;
        self.downcall(&symbol, descriptor)
    }
}

fn check_layout(layout: &Layout, role: &str) -> Result<()> {
    if layout.is_padding() {
        return Err(MemoryError::invalid(format!(
            "{role} is padding-only ({layout})"
        )));
    }
    let size = layout
        .bytes_size()
        .map_err(|err| MemoryError::invalid(format!("{role} cannot be passed by value: {err}")))?;
    if size == 0 {
        return Err(MemoryError::invalid(format!("{role} is zero-sized ({layout})")));
    }
    Ok(())
}

/// A bound native function: symbol, signature, and call-buffer frame.
#[derive(Clone, Debug)]
pub struct NativeFunction {
    symbol: u64,
    abi: Abi,
    descriptor: FunctionDescriptor,
    frame: ArgumentFrame,
}

impl NativeFunction {
    /// Address of the native code.
    pub fn symbol(&self) -> Address {
        Address::of_raw(self.symbol)
    }

    /// Calling convention.
    pub fn abi(&self) -> Abi {
        self.abi
    }

    /// Signature.
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Call-buffer placement.
    pub fn frame(&self) -> &ArgumentFrame {
        &self.frame
    }

    /// Allocate a call buffer in `scope` and copy each argument region
    /// into its slot.
    ///
    /// The argument count and each region's size must match the
    /// signature exactly; otherwise invalid-argument. Every argument must
    /// be readable from this thread. All arguments are checked before the
    /// buffer is allocated, so a rejected call leaves `scope` untouched.
    /// The buffer lives as long as `scope`.
    pub fn marshal(&self, scope: &mut Scope, args: &[&Region]) -> Result<CallBuffer> {
        let slots = self.frame.argument_slots();
        if args.len() != slots.len() {
            return Err(MemoryError::invalid(format!(
                "{} expects {} arguments, got {}",
                self.descriptor,
                slots.len(),
                args.len()
            )));
        }
        for (index, (arg, slot)) in args.iter().zip(slots).enumerate() {
            if arg.byte_size() != slot.size {
                return Err(MemoryError::invalid(format!(
                    "argument {index} is {} bytes, signature expects {}",
                    arg.byte_size(),
                    slot.size
                )));
            }
            arg.check_readable()?;
        }
        let region = scope.allocate_bytes(self.frame.size, self.frame.alignment)?;
        for (arg, slot) in args.iter().zip(slots) {
            Address::copy(
                &arg.base_address(),
                &region.address_at(slot.offset as i64),
                slot.size as i64,
            )?;
        }
        Ok(CallBuffer {
            region,
            frame: self.frame.clone(),
        })
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.descriptor, self.symbol)
    }
}

/// A marshaled call buffer, allocated in a scope.
#[derive(Clone, Debug)]
pub struct CallBuffer {
    region: Region,
    frame: ArgumentFrame,
}

impl CallBuffer {
    /// The whole buffer.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The slot holding argument `index`.
    pub fn argument(&self, index: usize) -> Result<Region> {
        let slot = self
            .frame
            .argument_slots()
            .get(index)
            .ok_or_else(|| MemoryError::invalid(format!("no argument {index}")))?;
        self.region.as_slice(slot.offset, slot.size)
    }

    /// The slot the native side writes its result into.
    ///
    /// Unsupported for void functions.
    pub fn return_region(&self) -> Result<Region> {
        let slot = self
            .frame
            .return_slot()
            .ok_or_else(|| MemoryError::unsupported("return_region", "function returns void"))?;
        self.region.as_slice(slot.offset, slot.size)
    }

    /// Copy the return value out to `dst`.
    pub fn copy_return_to(&self, dst: &Address) -> Result<()> {
        let ret = self.return_region()?;
        Address::copy(&ret.base_address(), dst, ret.byte_size() as i64)
    }
}
