//! The functional core: data binding rewrite and resource compilation.
pub mod compiler;
pub mod databinding;
pub mod declarations;

pub use compiler::{Aapt2Compiler, BuiltinCompiler, ResourceCompiler, compile_resources};
pub use databinding::{DataBindingRequest, process_data_bindings};
