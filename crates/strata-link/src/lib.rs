//! Linking façade for Strata.
//!
//! Turns a layout-described function signature plus a resolved native
//! symbol into a [`NativeFunction`] handle that knows where each argument
//! lives in a call buffer. Marshaling copies argument regions into that
//! buffer through the checked [`Address::copy`](strata_memory::Address::copy);
//! no new safety logic lives here.
//!
//! The calling convention is never probed from the environment: callers
//! pick an [`Abi`] (or map their own target strings through
//! [`Abi::for_target`]) and pass it in a [`LinkerConfig`].
//!
//! Generating call trampolines and per-architecture register
//! classification are out of scope; the frame computed here is the plain
//! word-aligned argument block a trampoline would consume.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod abi;
pub mod descriptor;
pub mod linker;
pub mod symbols;

pub use abi::{Abi, LinkerConfig};
pub use descriptor::FunctionDescriptor;
pub use linker::{ArgumentFrame, CallBuffer, Linker, NativeFunction, Slot};
pub use symbols::{StaticSymbols, SymbolLookup};
