//! Function signatures described by layouts.

use std::fmt;

use strata_layout::Layout;

/// The argument and return layouts of a native function.
///
/// Renders as `(<args>)<ret>`, with `v` for a void return; the string is
/// stable and suitable as a cache key for generated call stubs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDescriptor {
    ret: Option<Layout>,
    args: Vec<Layout>,
}

impl FunctionDescriptor {
    /// A function returning `ret`.
    pub fn of(ret: Layout, args: impl IntoIterator<Item = Layout>) -> Self {
        Self {
            ret: Some(ret),
            args: args.into_iter().collect(),
        }
    }

    /// A function returning nothing.
    pub fn of_void(args: impl IntoIterator<Item = Layout>) -> Self {
        Self {
            ret: None,
            args: args.into_iter().collect(),
        }
    }

    /// The return layout, if any.
    pub fn return_layout(&self) -> Option<&Layout> {
        self.ret.as_ref()
    }

    /// The argument layouts, in call order.
    pub fn argument_layouts(&self) -> &[Layout] {
        &self.args
    }

    /// A copy with `extra` appended to the argument list.
    pub fn with_appended_args(&self, extra: impl IntoIterator<Item = Layout>) -> Self {
        let mut copy = self.clone();
        copy.args.extend(extra);
        copy
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for arg in &self.args {
            write!(f, "{arg}")?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}"),
            None => f.write_str("v"),
        }
    }
}
