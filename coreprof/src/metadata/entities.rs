//! Reference entities accumulated from metadata records
//!
//! Entities are created by the first record that mentions their id and
//! enriched in place by later records with the same id. They are never
//! removed while a trace is loaded.

use serde::Serialize;

use coreprof_common::{
    AppDomainId, AssemblyId, ClassId, CodeRange, FunctionId, LineMapping, ModuleId, SourceFileId,
    SourceLineId,
};

#[derive(Debug, Clone, Serialize)]
pub struct AppDomain {
    pub id: AppDomainId,
    pub runtime_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub id: AssemblyId,
    pub domain_id: Option<AppDomainId>,
    pub module_id: Option<ModuleId>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub assembly_id: Option<AssemblyId>,
    pub base_address: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Class {
    pub id: ClassId,
    pub module_id: Option<ModuleId>,
    pub token: u64,
    pub name: Option<String>,
}

/// A managed function and its native code layout
#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub id: FunctionId,
    pub class_id: Option<ClassId>,
    pub module_id: Option<ModuleId>,
    pub token: u64,
    pub name: Option<String>,
    pub return_type: Option<String>,
    pub signature: Option<String>,
    /// Code regions in declaration order; offsets run across them
    pub code_ranges: Vec<CodeRange>,
    /// Sequence points sorted by native offset
    pub line_mappings: Vec<LineMapping>,
    /// Code came from the native image cache instead of the JIT
    pub cached: bool,
}

impl Function {
    pub(crate) fn new(id: FunctionId) -> Self {
        Self {
            id,
            class_id: None,
            module_id: None,
            token: 0,
            name: None,
            return_type: None,
            signature: None,
            code_ranges: Vec::new(),
            line_mappings: Vec::new(),
            cached: false,
        }
    }

    /// Offset of `ip` from the start of the function's code
    ///
    /// Code ranges are laid end to end in declaration order, so an address in
    /// the second range is offset by the size of the first.
    #[must_use]
    pub fn native_offset(&self, ip: u64) -> Option<u64> {
        let mut base = 0u64;
        for range in &self.code_ranges {
            if range.contains(ip) {
                return Some(base + (ip - range.start));
            }
            base = base.saturating_add(range.size);
        }
        None
    }

    /// Sequence point governing `offset`: the last one starting at or before it
    ///
    /// Hidden sequence points resolve to `None`.
    #[must_use]
    pub fn mapping_at(&self, offset: u64) -> Option<&LineMapping> {
        let index = self.line_mappings.partition_point(|m| m.native_offset <= offset);
        let mapping = self.line_mappings.get(index.checked_sub(1)?)?;
        mapping.is_visible().then_some(mapping)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub id: SourceFileId,
    pub name: String,
}

/// A line of source code referenced by samples
///
/// `id` stays [`UNDEFINED_SOURCE_LINE_ID`](coreprof_common::UNDEFINED_SOURCE_LINE_ID)
/// for declared lines until something references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    pub id: SourceLineId,
    pub function_id: FunctionId,
    pub file_id: Option<SourceFileId>,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use coreprof_common::HIDDEN_LINE_NUMBER;

    fn function_with_code() -> Function {
        let mut function = Function::new(FunctionId(1));
        function.code_ranges = vec![
            CodeRange { start: 0x1000, size: 0x20 },
            CodeRange { start: 0x8000, size: 0x10 },
        ];
        function.line_mappings = vec![
            LineMapping { native_offset: 0x0, line: 10, column: 1 },
            LineMapping { native_offset: 0x8, line: HIDDEN_LINE_NUMBER, column: 0 },
            LineMapping { native_offset: 0x10, line: 12, column: 5 },
            LineMapping { native_offset: 0x24, line: 20, column: 3 },
        ];
        function
    }

    #[test]
    fn test_native_offset_spans_ranges() {
        let function = function_with_code();
        assert_eq!(function.native_offset(0x1004), Some(0x4));
        assert_eq!(function.native_offset(0x8004), Some(0x24));
        assert_eq!(function.native_offset(0x5000), None);
    }

    #[test]
    fn test_mapping_uses_greatest_lower_bound() {
        let function = function_with_code();
        assert_eq!(function.mapping_at(0x0).map(|m| m.line), Some(10));
        assert_eq!(function.mapping_at(0x7).map(|m| m.line), Some(10));
        assert_eq!(function.mapping_at(0x10).map(|m| m.line), Some(12));
        assert_eq!(function.mapping_at(0x23).map(|m| m.line), Some(12));
        assert_eq!(function.mapping_at(0x30).map(|m| m.line), Some(20));
    }

    #[test]
    fn test_hidden_mapping_resolves_to_nothing() {
        let function = function_with_code();
        assert!(function.mapping_at(0x8).is_none());
        assert!(function.mapping_at(0xf).is_none());
    }

    #[test]
    fn test_no_mapping_before_first_offset() {
        let mut function = function_with_code();
        function.line_mappings.remove(0);
        assert!(function.mapping_at(0x2).is_none());
    }
}
