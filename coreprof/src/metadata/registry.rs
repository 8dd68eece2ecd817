//! Metadata registry
//!
//! Accumulates the referential data needed to interpret samples. Every
//! `register_*` call is an idempotent upsert keyed by internal id: a second
//! record with the same id updates the mutable fields of the existing entity
//! and never changes its identity, so ids held elsewhere (call-tree nodes,
//! samples) stay resolvable.
//!
//! # Source lines
//!
//! Lines reach the registry two ways: declared by `lin src` records, and
//! discovered by resolving an instruction pointer through a function's
//! sequence points. Both end up in one interned table with dense
//! [`SourceLineId`]s assigned on first reference. Interning the same
//! (function, line, column) twice returns the same id.

use std::borrow::Cow;
use std::collections::HashMap;

use coreprof_common::{
    AppDomainCreated, AppDomainId, AssemblyId, AssemblyLoaded, ClassId, ClassLoaded, CodeGroup,
    FunctionCode, FunctionId, FunctionNamed, ModuleId, ModuleLoaded, SourceFileId, SourceLineId,
    SourceLineInfo, UNDEFINED_SOURCE_LINE_ID,
};

use super::entities::{AppDomain, Assembly, Class, Function, Module, SourceFile, SourceLine};

/// Identity of an interned source line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub function_id: FunctionId,
    pub line: u32,
    pub column: u32,
}

/// Registry of functions, classes, modules, assemblies, files and lines
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    app_domains: HashMap<AppDomainId, AppDomain>,
    assemblies: HashMap<AssemblyId, Assembly>,
    modules: HashMap<ModuleId, Module>,
    classes: HashMap<ClassId, Class>,
    functions: HashMap<FunctionId, Function>,
    files: HashMap<SourceFileId, SourceFile>,

    /// `lin src` declarations by producer id
    declared_lines: HashMap<u64, SourceLine>,
    declared_index: HashMap<LineKey, u64>,
    function_files: HashMap<FunctionId, SourceFileId>,

    /// Interned lines, indexed by `SourceLineId`
    lines: Vec<SourceLine>,
    line_ids: HashMap<LineKey, SourceLineId>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Upserts
    // ------------------------------------------------------------------

    pub fn register_app_domain(&mut self, record: &AppDomainCreated) {
        let domain = self.app_domains.entry(record.id).or_insert_with(|| AppDomain {
            id: record.id,
            runtime_id: record.runtime_id,
            name: String::new(),
        });
        domain.runtime_id = record.runtime_id;
        domain.name.clone_from(&record.name);
    }

    pub fn register_assembly(&mut self, record: &AssemblyLoaded) {
        let assembly = self.assembly_entry(record.id);
        assembly.domain_id = Some(record.domain_id);
        assembly.module_id = Some(record.module_id);
        assembly.name.clone_from(&record.name);
    }

    pub fn register_module(&mut self, record: &ModuleLoaded) {
        let module = self.module_entry(record.id);
        module.assembly_id = Some(record.assembly_id);
        module.base_address = record.base_address;
        module.name.clone_from(&record.name);
    }

    pub fn attach_module(&mut self, module_id: ModuleId, assembly_id: AssemblyId) {
        self.module_entry(module_id).assembly_id = Some(assembly_id);
        let assembly = self.assembly_entry(assembly_id);
        assembly.module_id.get_or_insert(module_id);
    }

    pub fn register_class(&mut self, record: &ClassLoaded) {
        let class = self.class_entry(record.id);
        class.module_id = Some(record.module_id);
        class.token = record.token;
    }

    pub fn name_class(&mut self, id: ClassId, name: &str) {
        self.class_entry(id).name = Some(name.to_string());
    }

    /// Record compiled or cached code; replaces any previous code layout
    pub fn register_function_code(&mut self, code: &FunctionCode, cached: bool) {
        let function = self.function_entry(code.id);
        function.class_id = Some(code.class_id);
        function.module_id = Some(code.module_id);
        function.token = code.token;
        function.cached = cached;
        function.code_ranges.clear();
        function.line_mappings.clear();
        for group in &code.groups {
            match group {
                CodeGroup::Range(range) => function.code_ranges.push(*range),
                CodeGroup::Mapping(mapping) => function.line_mappings.push(*mapping),
            }
        }
        function.line_mappings.sort_by_key(|m| m.native_offset);
    }

    pub fn name_function(&mut self, record: &FunctionNamed) {
        let function = self.function_entry(record.id);
        function.name = Some(record.name.clone());
        function.return_type = Some(record.return_type.clone());
        function.signature = Some(record.signature.clone());
    }

    pub fn register_source_file(&mut self, id: SourceFileId, name: &str) {
        self.files.insert(id, SourceFile { id, name: name.to_string() });
    }

    /// Declare a line from a `lin src` record without interning it
    pub fn declare_source_line(&mut self, info: &SourceLineInfo) {
        let key = LineKey {
            function_id: info.function_id,
            line: info.start_line,
            column: info.start_column,
        };
        // Keep the interned id if this exact position was already referenced
        let id = self.line_ids.get(&key).copied().unwrap_or(UNDEFINED_SOURCE_LINE_ID);
        let line = SourceLine {
            id,
            function_id: info.function_id,
            file_id: Some(info.file_id),
            start_line: info.start_line,
            start_column: info.start_column,
            end_line: info.end_line,
            end_column: info.end_column,
        };
        if let Some(interned) = self.lines.get_mut(index_of(id)) {
            interned.file_id = line.file_id;
            interned.end_line = line.end_line;
            interned.end_column = line.end_column;
        }
        self.declared_lines.insert(info.id, line);
        self.declared_index.insert(key, info.id);
        self.function_files.insert(info.function_id, info.file_id);
    }

    // ------------------------------------------------------------------
    // Source line interning
    // ------------------------------------------------------------------

    /// Stable id for a source position, allocated on first use
    pub fn intern_line(&mut self, key: LineKey) -> SourceLineId {
        if let Some(&id) = self.line_ids.get(&key) {
            return id;
        }

        let id = SourceLineId(self.lines.len() as u64);
        let line = match self.declared_index.get(&key).and_then(|p| self.declared_lines.get_mut(p))
        {
            Some(declared) => {
                declared.id = id;
                declared.clone()
            }
            None => SourceLine {
                id,
                function_id: key.function_id,
                file_id: self.function_files.get(&key.function_id).copied(),
                start_line: key.line,
                start_column: key.column,
                end_line: key.line,
                end_column: key.column,
            },
        };
        self.lines.push(line);
        self.line_ids.insert(key, id);
        id
    }

    /// Intern a line declared by `lin src`, by producer id
    pub fn intern_declared_line(&mut self, producer_id: u64) -> Option<SourceLineId> {
        let declared = self.declared_lines.get(&producer_id)?;
        let key = LineKey {
            function_id: declared.function_id,
            line: declared.start_line,
            column: declared.start_column,
        };
        Some(self.intern_line(key))
    }

    /// Source position executing at `ip` inside `function_id`, if any
    #[must_use]
    pub fn resolve_ip(&self, function_id: FunctionId, ip: u64) -> Option<LineKey> {
        let function = self.functions.get(&function_id)?;
        let offset = function.native_offset(ip)?;
        let mapping = function.mapping_at(offset)?;
        Some(LineKey { function_id, line: mapping.line, column: mapping.column })
    }

    /// Resolve and intern the line executing at `ip`
    pub fn line_for_ip(&mut self, function_id: FunctionId, ip: u64) -> Option<SourceLineId> {
        let key = self.resolve_ip(function_id, ip)?;
        Some(self.intern_line(key))
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    #[must_use]
    pub fn app_domain(&self, id: AppDomainId) -> Option<&AppDomain> {
        self.app_domains.get(&id)
    }

    #[must_use]
    pub fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.assemblies.get(&id)
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(&id)
    }

    #[must_use]
    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(&id)
    }

    #[must_use]
    pub fn source_file(&self, id: SourceFileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    #[must_use]
    pub fn source_line(&self, id: SourceLineId) -> Option<&SourceLine> {
        self.lines.get(index_of(id))
    }

    /// Declared line by producer id (its `id` is undefined until interned)
    #[must_use]
    pub fn declared_line(&self, producer_id: u64) -> Option<&SourceLine> {
        self.declared_lines.get(&producer_id)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Display name of a function, with a placeholder for unknown ids
    #[must_use]
    pub fn function_name(&self, id: FunctionId) -> Cow<'_, str> {
        match self.functions.get(&id).and_then(|f| f.name.as_deref()) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("<unknown function {id}>")),
        }
    }

    /// Display name of a class, with a placeholder for unknown ids
    #[must_use]
    pub fn class_name(&self, id: ClassId) -> Cow<'_, str> {
        match self.classes.get(&id).and_then(|c| c.name.as_deref()) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("<unknown class {id}>")),
        }
    }

    /// File name of an interned line, if known
    #[must_use]
    pub fn line_file_name(&self, id: SourceLineId) -> Option<&str> {
        let file_id = self.source_line(id)?.file_id?;
        self.files.get(&file_id).map(|f| f.name.as_str())
    }

    // ------------------------------------------------------------------
    // Entry helpers
    // ------------------------------------------------------------------

    fn assembly_entry(&mut self, id: AssemblyId) -> &mut Assembly {
        self.assemblies.entry(id).or_insert_with(|| Assembly {
            id,
            domain_id: None,
            module_id: None,
            name: String::new(),
        })
    }

    fn module_entry(&mut self, id: ModuleId) -> &mut Module {
        self.modules.entry(id).or_insert_with(|| Module {
            id,
            assembly_id: None,
            base_address: 0,
            name: String::new(),
        })
    }

    fn class_entry(&mut self, id: ClassId) -> &mut Class {
        self.classes.entry(id).or_insert_with(|| Class { id, module_id: None, token: 0, name: None })
    }

    fn function_entry(&mut self, id: FunctionId) -> &mut Function {
        self.functions.entry(id).or_insert_with(|| Function::new(id))
    }
}

/// Table index of an interned id; the undefined sentinel maps past any table
fn index_of(id: SourceLineId) -> usize {
    usize::try_from(id.0).unwrap_or(usize::MAX)
}
