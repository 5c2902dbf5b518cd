use serde::{Deserialize, Serialize};

/// Capacities of a [`Forth`](crate::Forth) VM.
///
/// Every buffer the interpreter uses is bounded by one of these; running
/// out is reported as an error on the offending line rather than by
/// growing further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForthParams {
    #[serde(default = "ForthParams::default_data_stack_elems")]
    pub data_stack_elems: usize,
    /// Nesting depth of colon definitions calling colon definitions.
    #[serde(default = "ForthParams::default_call_stack_elems")]
    pub call_stack_elems: usize,
    #[serde(default = "ForthParams::default_input_buf_elems")]
    pub input_buf_elems: usize,
    #[serde(default = "ForthParams::default_output_buf_elems")]
    pub output_buf_elems: usize,
    #[serde(default = "ForthParams::default_dict_entries")]
    pub dict_entries: usize,
    /// Cells of compiled code shared by all colon definitions.
    #[serde(default = "ForthParams::default_code_cells")]
    pub code_cells: usize,
    /// Addressable memory, in cells.
    #[serde(default = "ForthParams::default_memory_cells")]
    pub memory_cells: usize,
    /// First address handed out by `VARIABLE`. Addresses below it are free
    /// for direct use with `!` and `@`.
    #[serde(default = "ForthParams::default_variable_base")]
    pub variable_base: usize,
}

impl ForthParams {
    const fn default_data_stack_elems() -> usize {
        64
    }
    const fn default_call_stack_elems() -> usize {
        64
    }
    const fn default_input_buf_elems() -> usize {
        128
    }
    const fn default_output_buf_elems() -> usize {
        4096
    }
    const fn default_dict_entries() -> usize {
        256
    }
    const fn default_code_cells() -> usize {
        4096
    }
    const fn default_memory_cells() -> usize {
        64 * 1024
    }
    const fn default_variable_base() -> usize {
        1024
    }
}

impl Default for ForthParams {
    fn default() -> Self {
        Self {
            data_stack_elems: Self::default_data_stack_elems(),
            call_stack_elems: Self::default_call_stack_elems(),
            input_buf_elems: Self::default_input_buf_elems(),
            output_buf_elems: Self::default_output_buf_elems(),
            dict_entries: Self::default_dict_entries(),
            code_cells: Self::default_code_cells(),
            memory_cells: Self::default_memory_cells(),
            variable_base: Self::default_variable_base(),
        }
    }
}
