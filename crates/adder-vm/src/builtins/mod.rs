// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in types: native classes, their method tables and singletons.
//!
//! `bootstrap` builds the whole builtin world into a fresh heap: the
//! class objects with their `__bases__` chains and native method tables,
//! the shared singletons, the exception taxonomy, the builtins module
//! every program resolves global names against, and the interpreted
//! `next` wrapper generators dispatch through.

pub mod attrview;
pub mod dict;
pub mod file;
pub mod functions;
pub mod iterator;
pub mod list;
pub mod numeric;
pub mod slice;
pub mod string;

use crate::bytecode::BlockData;
use crate::bytecode::Instr;
use crate::heap::{CellId, Heap, Tracer};
use crate::value::{
    Attrs, CellKind, ClassData, FunctionData, LayoutData, ModuleData, NameTable, NativeData,
    NativeFn, ObjectData, Value, layout, set_own_attr,
};
use crate::vm::{Num, Raise, Vm};

/// Built-in classes, singletons and the builtins module, all rooted by
/// the VM.
pub struct Builtins {
    /// The `None` singleton.
    pub none: Value,
    /// The `True` singleton.
    pub true_: Value,
    /// The `False` singleton.
    pub false_: Value,
    /// The `NotImplemented` singleton.
    pub not_implemented: Value,
    /// Sentinel stored in declared-but-unassigned slots.
    pub uninitialized: Value,
    /// The root of the layout tree.
    pub empty_layout: CellId,

    pub object: CellId,
    pub type_class: CellId,
    pub int: CellId,
    pub float: CellId,
    pub bool_class: CellId,
    pub str_class: CellId,
    pub tuple: CellId,
    pub list: CellId,
    pub dict: CellId,
    pub set: CellId,
    pub slice: CellId,
    pub function: CellId,
    pub module: CellId,
    pub generator: CellId,
    pub file: CellId,
    pub attrview: CellId,
    pub iterator: CellId,
    pub none_class: CellId,
    pub not_implemented_class: CellId,

    pub exception: CellId,
    pub attribute_error: CellId,
    pub name_error: CellId,
    pub type_error: CellId,
    pub value_error: CellId,
    pub index_error: CellId,
    pub key_error: CellId,
    pub stop_iteration: CellId,
    pub assertion_error: CellId,
    pub runtime_error: CellId,
    pub not_implemented_error: CellId,
    pub os_error: CellId,
    pub import_error: CellId,
    pub syntax_error: CellId,

    /// The module global lookups fall back to.
    pub builtins_module: CellId,
}

impl Builtins {
    /// Visit every rooted reference.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        for value in [
            self.none,
            self.true_,
            self.false_,
            self.not_implemented,
            self.uninitialized,
        ] {
            tracer.visit_value(value);
        }
        for id in [
            self.empty_layout,
            self.object,
            self.type_class,
            self.int,
            self.float,
            self.bool_class,
            self.str_class,
            self.tuple,
            self.list,
            self.dict,
            self.set,
            self.slice,
            self.function,
            self.module,
            self.generator,
            self.file,
            self.attrview,
            self.iterator,
            self.none_class,
            self.not_implemented_class,
            self.exception,
            self.attribute_error,
            self.name_error,
            self.type_error,
            self.value_error,
            self.index_error,
            self.key_error,
            self.stop_iteration,
            self.assertion_error,
            self.runtime_error,
            self.not_implemented_error,
            self.os_error,
            self.import_error,
            self.syntax_error,
            self.builtins_module,
        ] {
            tracer.visit(id);
        }
    }
}

fn empty_attrs(empty_layout: CellId) -> Attrs {
    Attrs {
        layout: empty_layout,
        slots: Vec::new(),
    }
}

fn new_class(
    heap: &mut Heap,
    names: &mut NameTable,
    empty_layout: CellId,
    name: &str,
    bases: &[CellId],
) -> CellId {
    let class = heap.alloc(CellKind::Class(ClassData {
        name: name.to_owned(),
        attrs: empty_attrs(empty_layout),
        instance_layout: empty_layout,
    }));
    let bases_tuple = heap.alloc(CellKind::Tuple(
        bases.iter().map(|&base| Value::cell(base)).collect(),
    ));
    let bases_name = names.well_known().bases;
    set_own_attr(heap, class, bases_name, Value::cell(bases_tuple));
    class
}

fn add_method(
    heap: &mut Heap,
    names: &mut NameTable,
    class: CellId,
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    func: NativeFn,
) {
    let native = heap.alloc(CellKind::Native(NativeData {
        name,
        min_args,
        max_args,
        func,
    }));
    let interned = names.intern(name);
    set_own_attr(heap, class, interned, Value::cell(native));
}

fn bind(heap: &mut Heap, names: &mut NameTable, module: CellId, name: &str, value: Value) {
    let interned = names.intern(name);
    set_own_attr(heap, module, interned, value);
}

/// Build the builtin world into a fresh heap.
#[allow(clippy::too_many_lines)]
pub fn bootstrap(heap: &mut Heap, names: &mut NameTable) -> Builtins {
    let root_name = names.intern("");
    let empty_layout = heap.alloc(CellKind::Layout(LayoutData::new_root(root_name)));

    // Classes. `object` is the root of every base chain.
    let object = new_class(heap, names, empty_layout, "object", &[]);
    let type_class = new_class(heap, names, empty_layout, "type", &[object]);
    let int = new_class(heap, names, empty_layout, "int", &[object]);
    let float = new_class(heap, names, empty_layout, "float", &[object]);
    let bool_class = new_class(heap, names, empty_layout, "bool", &[int]);
    let str_class = new_class(heap, names, empty_layout, "str", &[object]);
    let tuple = new_class(heap, names, empty_layout, "tuple", &[object]);
    let list = new_class(heap, names, empty_layout, "list", &[object]);
    let dict = new_class(heap, names, empty_layout, "dict", &[object]);
    let set = new_class(heap, names, empty_layout, "set", &[object]);
    let slice = new_class(heap, names, empty_layout, "slice", &[object]);
    let function = new_class(heap, names, empty_layout, "function", &[object]);
    let module = new_class(heap, names, empty_layout, "module", &[object]);
    let generator = new_class(heap, names, empty_layout, "GeneratorIterator", &[object]);
    let file = new_class(heap, names, empty_layout, "file", &[object]);
    let attrview = new_class(heap, names, empty_layout, "attrview", &[object]);
    let iterator = new_class(heap, names, empty_layout, "iterator", &[object]);
    let none_class = new_class(heap, names, empty_layout, "NoneType", &[object]);
    let not_implemented_class =
        new_class(heap, names, empty_layout, "NotImplementedType", &[object]);

    // The exception taxonomy.
    let exception = new_class(heap, names, empty_layout, "Exception", &[object]);
    let mut exc = |heap: &mut Heap, names: &mut NameTable, name: &str| {
        new_class(heap, names, empty_layout, name, &[exception])
    };
    let attribute_error = exc(heap, names, "AttributeError");
    let name_error = exc(heap, names, "NameError");
    let type_error = exc(heap, names, "TypeError");
    let value_error = exc(heap, names, "ValueError");
    let index_error = exc(heap, names, "IndexError");
    let key_error = exc(heap, names, "KeyError");
    let stop_iteration = exc(heap, names, "StopIteration");
    let assertion_error = exc(heap, names, "AssertionError");
    let runtime_error = exc(heap, names, "RuntimeError");
    let not_implemented_error = exc(heap, names, "NotImplementedError");
    let os_error = exc(heap, names, "OSError");
    let import_error = exc(heap, names, "ImportError");
    let syntax_error = exc(heap, names, "SyntaxError");

    // Singletons.
    let none = Value::cell(heap.alloc(CellKind::Object(ObjectData {
        class: none_class,
        attrs: empty_attrs(empty_layout),
    })));
    let true_ = Value::cell(heap.alloc(CellKind::Object(ObjectData {
        class: bool_class,
        attrs: empty_attrs(empty_layout),
    })));
    let false_ = Value::cell(heap.alloc(CellKind::Object(ObjectData {
        class: bool_class,
        attrs: empty_attrs(empty_layout),
    })));
    let not_implemented = Value::cell(heap.alloc(CellKind::Object(ObjectData {
        class: not_implemented_class,
        attrs: empty_attrs(empty_layout),
    })));
    let uninitialized = Value::cell(heap.alloc(CellKind::Object(ObjectData {
        class: object,
        attrs: empty_attrs(empty_layout),
    })));

    // Numeric method tables, shared by int and float; bool inherits.
    for class in [int, float] {
        add_method(heap, names, class, "__add__", 2, Some(2), numeric::num_add);
        add_method(heap, names, class, "__sub__", 2, Some(2), numeric::num_sub);
        add_method(heap, names, class, "__mul__", 2, Some(2), numeric::num_mul);
        add_method(heap, names, class, "__div__", 2, Some(2), numeric::num_div);
        add_method(heap, names, class, "__floordiv__", 2, Some(2), numeric::num_floordiv);
        add_method(heap, names, class, "__mod__", 2, Some(2), numeric::num_mod);
        add_method(heap, names, class, "__pow__", 2, Some(2), numeric::num_pow);
        add_method(heap, names, class, "__or__", 2, Some(2), numeric::num_or);
        add_method(heap, names, class, "__xor__", 2, Some(2), numeric::num_xor);
        add_method(heap, names, class, "__and__", 2, Some(2), numeric::num_and);
        add_method(heap, names, class, "__lshift__", 2, Some(2), numeric::num_lshift);
        add_method(heap, names, class, "__rshift__", 2, Some(2), numeric::num_rshift);
        add_method(heap, names, class, "__lt__", 2, Some(2), numeric::num_lt);
        add_method(heap, names, class, "__le__", 2, Some(2), numeric::num_le);
        add_method(heap, names, class, "__gt__", 2, Some(2), numeric::num_gt);
        add_method(heap, names, class, "__ge__", 2, Some(2), numeric::num_ge);
        add_method(heap, names, class, "__eq__", 2, Some(2), numeric::num_eq);
        add_method(heap, names, class, "__ne__", 2, Some(2), numeric::num_ne);
        add_method(heap, names, class, "__pos__", 1, Some(1), numeric::num_pos);
        add_method(heap, names, class, "__neg__", 1, Some(1), numeric::num_neg);
        add_method(heap, names, class, "__invert__", 1, Some(1), numeric::num_invert);
        add_method(heap, names, class, "__hash__", 1, Some(1), numeric::num_hash);
        add_method(heap, names, class, "__str__", 1, Some(1), numeric::num_str);
        add_method(heap, names, class, "__repr__", 1, Some(1), numeric::num_repr);
    }
    add_method(heap, names, bool_class, "__str__", 1, Some(1), numeric::bool_str);
    add_method(heap, names, bool_class, "__repr__", 1, Some(1), numeric::bool_str);

    // Strings.
    add_method(heap, names, str_class, "__add__", 2, Some(2), string::str_add);
    add_method(heap, names, str_class, "__mul__", 2, Some(2), string::str_mul);
    add_method(heap, names, str_class, "__len__", 1, Some(1), string::str_len);
    add_method(heap, names, str_class, "__getitem__", 2, Some(2), string::str_getitem);
    add_method(heap, names, str_class, "__contains__", 2, Some(2), string::str_contains);
    add_method(heap, names, str_class, "__hash__", 1, Some(1), string::str_hash);
    add_method(heap, names, str_class, "__eq__", 2, Some(2), string::str_eq);
    add_method(heap, names, str_class, "__ne__", 2, Some(2), string::str_ne);
    add_method(heap, names, str_class, "__lt__", 2, Some(2), string::str_lt);
    add_method(heap, names, str_class, "__le__", 2, Some(2), string::str_le);
    add_method(heap, names, str_class, "__gt__", 2, Some(2), string::str_gt);
    add_method(heap, names, str_class, "__ge__", 2, Some(2), string::str_ge);
    add_method(heap, names, str_class, "__str__", 1, Some(1), string::str_str);
    add_method(heap, names, str_class, "__repr__", 1, Some(1), string::str_repr);
    add_method(heap, names, str_class, "__iter__", 1, Some(1), string::str_iter);

    // Tuples and lists share the sequence methods.
    for class in [tuple, list] {
        add_method(heap, names, class, "__len__", 1, Some(1), list::seq_len);
        add_method(heap, names, class, "__getitem__", 2, Some(2), list::seq_getitem);
        add_method(heap, names, class, "__contains__", 2, Some(2), list::seq_contains);
        add_method(heap, names, class, "__eq__", 2, Some(2), list::seq_eq);
        add_method(heap, names, class, "__ne__", 2, Some(2), list::seq_ne);
        add_method(heap, names, class, "__add__", 2, Some(2), list::seq_add);
        add_method(heap, names, class, "__mul__", 2, Some(2), list::seq_mul);
        add_method(heap, names, class, "__iter__", 1, Some(1), list::seq_iter);
    }
    add_method(heap, names, tuple, "__hash__", 1, Some(1), list::tuple_hash);
    add_method(heap, names, list, "append", 2, Some(2), list::list_append);
    add_method(heap, names, list, "__setitem__", 3, Some(3), list::list_setitem);
    add_method(heap, names, list, "__delitem__", 2, Some(2), list::list_delitem);
    add_method(heap, names, list, "__iadd__", 2, Some(2), list::list_iadd);

    // Dicts and sets.
    add_method(heap, names, dict, "__len__", 1, Some(1), dict::dict_len);
    add_method(heap, names, dict, "__getitem__", 2, Some(2), dict::dict_getitem);
    add_method(heap, names, dict, "__setitem__", 3, Some(3), dict::dict_setitem);
    add_method(heap, names, dict, "__delitem__", 2, Some(2), dict::dict_delitem);
    add_method(heap, names, dict, "__contains__", 2, Some(2), dict::dict_contains);
    add_method(heap, names, dict, "__iter__", 1, Some(1), dict::dict_iter);
    add_method(heap, names, dict, "get", 2, Some(3), dict::dict_get_method);
    add_method(heap, names, dict, "keys", 1, Some(1), dict::dict_keys);
    add_method(heap, names, set, "__len__", 1, Some(1), dict::dict_len);
    add_method(heap, names, set, "__contains__", 2, Some(2), dict::dict_contains);
    add_method(heap, names, set, "__iter__", 1, Some(1), dict::dict_iter);
    add_method(heap, names, set, "add", 2, Some(2), dict::set_add);
    add_method(heap, names, set, "remove", 2, Some(2), dict::set_remove);

    // Iterators, generators, exceptions, files, attribute views.
    add_method(heap, names, iterator, "next", 1, Some(1), iterator::iter_next);
    add_method(heap, names, iterator, "__iter__", 1, Some(1), iterator::iter_iter);
    add_method(heap, names, generator, "__iter__", 1, Some(1), functions::generator_iter);
    add_method(heap, names, exception, "__str__", 1, Some(1), functions::exception_str);
    add_method(heap, names, exception, "__repr__", 1, Some(1), functions::exception_repr);
    add_method(heap, names, file, "read", 1, Some(1), file::file_read);
    add_method(heap, names, file, "write", 2, Some(2), file::file_write);
    add_method(heap, names, file, "close", 1, Some(1), file::file_close);
    add_method(heap, names, attrview, "__getitem__", 2, Some(2), attrview::view_getitem);
    add_method(heap, names, attrview, "__setitem__", 3, Some(3), attrview::view_setitem);
    add_method(heap, names, attrview, "__delitem__", 2, Some(2), attrview::view_delitem);
    add_method(heap, names, attrview, "__contains__", 2, Some(2), attrview::view_contains);
    add_method(heap, names, attrview, "__len__", 1, Some(1), attrview::view_len);
    add_method(heap, names, attrview, "keys", 1, Some(1), attrview::view_keys);
    add_method(heap, names, none_class, "__str__", 1, Some(1), functions::none_str);
    add_method(heap, names, none_class, "__repr__", 1, Some(1), functions::none_str);
    add_method(heap, names, object, "__str__", 1, Some(1), functions::object_str);
    add_method(heap, names, object, "__repr__", 1, Some(1), functions::object_repr);

    // The builtins module.
    let builtins_module = heap.alloc(CellKind::Module(ModuleData {
        name: String::from("builtins"),
        attrs: empty_attrs(empty_layout),
    }));

    // The interpreted `next` wrapper for generators: one block that
    // reinstalls the generator frame and returns its delivery.
    let self_name = names.well_known().self_;
    let next_layout = layout::add_name(heap, empty_layout, self_name);
    let mut next_block = BlockData::new("<builtin>", next_layout, 1, false);
    next_block.append(Instr::ResumeGenerator);
    next_block.append(Instr::Return);
    let next_block = heap.alloc(CellKind::Block(next_block));
    let next_fn = heap.alloc(CellKind::Function(FunctionData {
        name: names.well_known().next,
        params: vec![self_name],
        block: next_block,
        defaults: Vec::new(),
        takes_rest: false,
        is_generator: false,
        env: None,
        module: builtins_module,
    }));
    let next_name = names.well_known().next;
    set_own_attr(heap, generator, next_name, Value::cell(next_fn));

    // Bind the builtin names every module sees.
    for (name, class) in [
        ("object", object),
        ("type", type_class),
        ("int", int),
        ("float", float),
        ("bool", bool_class),
        ("str", str_class),
        ("tuple", tuple),
        ("list", list),
        ("dict", dict),
        ("set", set),
        ("slice", slice),
        ("Exception", exception),
        ("AttributeError", attribute_error),
        ("NameError", name_error),
        ("TypeError", type_error),
        ("ValueError", value_error),
        ("IndexError", index_error),
        ("KeyError", key_error),
        ("StopIteration", stop_iteration),
        ("AssertionError", assertion_error),
        ("RuntimeError", runtime_error),
        ("NotImplementedError", not_implemented_error),
        ("OSError", os_error),
        ("ImportError", import_error),
        ("SyntaxError", syntax_error),
    ] {
        bind(heap, names, builtins_module, name, Value::cell(class));
    }
    bind(heap, names, builtins_module, "None", none);
    bind(heap, names, builtins_module, "True", true_);
    bind(heap, names, builtins_module, "False", false_);
    bind(heap, names, builtins_module, "NotImplemented", not_implemented);
    for (name, min, max, func) in [
        ("print", 0, None, functions::print_native as NativeFn),
        ("len", 1, Some(1), functions::len_native),
        ("repr", 1, Some(1), functions::repr_native),
        ("hasattr", 2, Some(2), functions::hasattr_native),
        ("isinstance", 2, Some(2), functions::isinstance_native),
        ("open", 1, Some(2), file::open_native),
    ] {
        let native = heap.alloc(CellKind::Native(NativeData {
            name,
            min_args: min,
            max_args: max,
            func,
        }));
        bind(heap, names, builtins_module, name, Value::cell(native));
    }

    Builtins {
        none,
        true_,
        false_,
        not_implemented,
        uninitialized,
        empty_layout,
        object,
        type_class,
        int,
        float,
        bool_class,
        str_class,
        tuple,
        list,
        dict,
        set,
        slice,
        function,
        module,
        generator,
        file,
        attrview,
        iterator,
        none_class,
        not_implemented_class,
        exception,
        attribute_error,
        name_error,
        type_error,
        value_error,
        index_error,
        key_error,
        stop_iteration,
        assertion_error,
        runtime_error,
        not_implemented_error,
        os_error,
        import_error,
        syntax_error,
        builtins_module,
    }
}

// --- Shared sequence helpers ---

/// Normalize a subscript into a position, wrapping negatives once.
pub(crate) fn seq_index(
    vm: &mut Vm,
    len: usize,
    value: Value,
    what: &str,
) -> Result<usize, Raise> {
    let index = match vm.as_num(value) {
        Some(Num::Int(index)) => index,
        Some(Num::Big(_)) => {
            let class = vm.builtins.index_error;
            return Err(vm.raise(class, format!("{what} out of range")));
        }
        _ => {
            let class = vm.builtins.type_error;
            return Err(vm.raise(class, format!("{what} must be an integer")));
        }
    };
    let length = len as i64;
    let wrapped = if index < 0 { index + length } else { index };
    if wrapped < 0 || wrapped >= length {
        let class = vm.builtins.index_error;
        return Err(vm.raise(class, format!("{what} out of range")));
    }
    Ok(wrapped as usize)
}

fn slice_bound(vm: &mut Vm, value: Value) -> Result<Option<i64>, Raise> {
    if value == vm.builtins.none {
        return Ok(None);
    }
    match vm.as_num(value) {
        Some(Num::Int(bound)) => Ok(Some(bound)),
        Some(Num::Big(big)) => {
            use num_traits::Signed;
            Ok(Some(if big.is_negative() { i64::MIN } else { i64::MAX }))
        }
        _ => {
            let class = vm.builtins.type_error;
            Err(vm.raise(class, "slice indices must be integers"))
        }
    }
}

/// The positions a slice selects over a sequence of `len`.
pub(crate) fn slice_positions(
    vm: &mut Vm,
    slice_id: CellId,
    len: usize,
) -> Result<Vec<usize>, Raise> {
    let CellKind::Slice(data) = vm.heap.get(slice_id) else {
        panic!("slice_positions on non-slice");
    };
    let data = *data;
    let step = slice_bound(vm, data.step)?.unwrap_or(1);
    if step == 0 {
        let class = vm.builtins.value_error;
        return Err(vm.raise(class, "slice step cannot be zero"));
    }
    let start = slice_bound(vm, data.start)?;
    let stop = slice_bound(vm, data.stop)?;
    let (start, stop, step) = slice::indices(start, stop, step, len as i64);
    let mut positions = Vec::new();
    let mut position = start;
    if step > 0 {
        while position < stop {
            positions.push(position as usize);
            position += step;
        }
    } else {
        while position > stop {
            positions.push(position as usize);
            position += step;
        }
    }
    Ok(positions)
}

// --- Builtin constructors ---

impl Vm {
    /// Construct a value of a builtin class, if `class` is one.
    pub(crate) fn construct_builtin(
        &mut self,
        class: CellId,
        args: &[Value],
    ) -> Result<Option<Value>, Raise> {
        if class == self.builtins.int {
            return self.construct_int(args).map(Some);
        }
        if class == self.builtins.float {
            return self.construct_float(args).map(Some);
        }
        if class == self.builtins.bool_class {
            let truth = args.first().is_some_and(|&value| self.is_true(value));
            return Ok(Some(self.bool_value(truth)));
        }
        if class == self.builtins.str_class {
            let text = match args.first() {
                Some(&value) => self.str_of(value)?,
                None => String::new(),
            };
            return Ok(Some(self.str_value(text)));
        }
        if class == self.builtins.tuple || class == self.builtins.list {
            let items = match args.first() {
                Some(&value) => self.iterate_values(value)?,
                None => Vec::new(),
            };
            let kind = if class == self.builtins.tuple {
                CellKind::Tuple(items)
            } else {
                CellKind::List(items)
            };
            return Ok(Some(Value::cell(self.heap.alloc(kind))));
        }
        if class == self.builtins.dict {
            let id = self.alloc(CellKind::Dict(dict::DictData::new()));
            return Ok(Some(Value::cell(id)));
        }
        if class == self.builtins.set {
            let id = self.alloc(CellKind::Set(dict::DictData::new()));
            let set_value = Value::cell(id);
            if let Some(&iterable) = args.first() {
                // Root the set and every pending item: filling it can
                // re-enter the interpreter through __hash__ and collect.
                let mark = self.heap.temp_mark();
                self.heap.push_temp_root(set_value);
                let items = match self.iterate_values(iterable) {
                    Ok(items) => items,
                    Err(raise) => {
                        self.heap.release_temp_roots(mark);
                        return Err(raise);
                    }
                };
                for &item in &items {
                    self.heap.push_temp_root(item);
                }
                for item in items {
                    let none = self.builtins.none;
                    if let Err(raise) = self.dict_insert(id, item, none) {
                        self.heap.release_temp_roots(mark);
                        return Err(raise);
                    }
                }
                self.heap.release_temp_roots(mark);
            }
            return Ok(Some(set_value));
        }
        if class == self.builtins.slice {
            let none = self.builtins.none;
            let slice = slice::SliceData {
                start: args.first().copied().unwrap_or(none),
                stop: args.get(1).copied().unwrap_or(none),
                step: args.get(2).copied().unwrap_or(none),
            };
            return Ok(Some(Value::cell(self.alloc(CellKind::Slice(slice)))));
        }
        if class == self.builtins.type_class {
            return match args.first() {
                Some(&value) => Ok(Some(Value::cell(self.type_of(value)))),
                None => {
                    let type_error = self.builtins.type_error;
                    Err(self.raise(type_error, "type() takes one argument"))
                }
            };
        }
        Ok(None)
    }

    fn construct_int(&mut self, args: &[Value]) -> Result<Value, Raise> {
        let Some(&value) = args.first() else {
            return Ok(Value::small_int(0));
        };
        match self.as_num(value) {
            Some(Num::Int(int)) => Ok(self.int_from_i64(int)),
            Some(Num::Big(big)) => Ok(self.int_from_big(big)),
            Some(Num::Float(float)) => Ok(self.int_from_i64(float.trunc() as i64)),
            None => {
                if let Some(id) = value.as_cell() {
                    if let CellKind::Str(text) = self.heap.get(id) {
                        let text = text.trim().to_owned();
                        if let Some(literal) = adder_core::parse_int_literal(
                            text.strip_prefix('-').unwrap_or(&text),
                            10,
                        ) {
                            let positive = self.int_value(literal);
                            if text.starts_with('-') {
                                return crate::builtins::numeric::num_neg(self, &[positive]);
                            }
                            return Ok(positive);
                        }
                        let class = self.builtins.value_error;
                        return Err(
                            self.raise(class, format!("invalid literal for int(): '{text}'"))
                        );
                    }
                }
                let type_name = self.type_name(value);
                let class = self.builtins.type_error;
                Err(self.raise(class, format!("int() argument must be a number, not '{type_name}'")))
            }
        }
    }

    fn construct_float(&mut self, args: &[Value]) -> Result<Value, Raise> {
        let Some(&value) = args.first() else {
            return Ok(self.float_value(0.0));
        };
        match self.as_num(value) {
            Some(Num::Int(int)) => Ok(self.float_value(int as f64)),
            Some(Num::Big(big)) => {
                use num_traits::ToPrimitive;
                Ok(self.float_value(big.to_f64().unwrap_or(f64::INFINITY)))
            }
            Some(Num::Float(_)) => Ok(value),
            None => {
                if let Some(id) = value.as_cell() {
                    if let CellKind::Str(text) = self.heap.get(id) {
                        if let Ok(parsed) = text.trim().parse::<f64>() {
                            return Ok(self.float_value(parsed));
                        }
                        let text = text.clone();
                        let class = self.builtins.value_error;
                        return Err(
                            self.raise(class, format!("invalid literal for float(): '{text}'"))
                        );
                    }
                }
                let type_name = self.type_name(value);
                let class = self.builtins.type_error;
                Err(self
                    .raise(class, format!("float() argument must be a number, not '{type_name}'")))
            }
        }
    }
}
