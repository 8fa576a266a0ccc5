//! External function bridge
//!
//! Library and runtime routines the interpreter cannot execute instruction by
//! instruction are intercepted by qualified name and run by a native shim.
//! Names follow the evaluator's function naming: `pkg.Func`, `pkg/path.Func`,
//! `(pkg.T).Method` and `(*pkg.T).Method`.

mod args;
mod atomic;
mod bytes;
pub mod marshal;
mod math;
mod reflect;
mod runtime;
mod syscall;

pub use args::Args;

use crate::config::BridgeConfig;
use crate::interp::{Frame, InterpResult, RuntimeError, Value};
use std::collections::HashMap;
use tracing::{trace, warn};

/// Native stand-in for an external function.
///
/// Receives the caller's frame for reentrant calls and the evaluated
/// arguments (receiver first for methods). Returns exactly one value: the
/// unit tuple, a single result, or a `Tuple` of results in order.
pub type ExternalFn = fn(&mut dyn Frame, &Args<'_>) -> InterpResult<Value>;

/// Registry entry
#[derive(Clone, Copy)]
pub struct External {
    pub name: &'static str,
    /// Parameter count of the emulated function, receiver included
    pub arity: usize,
    pub shim: ExternalFn,
}

impl External {
    /// Check the argument count and run the shim
    pub fn invoke(&self, frame: &mut dyn Frame, host: &Host, args: &[Value]) -> InterpResult<Value> {
        if args.len() != self.arity {
            return Err(RuntimeError::arity_mismatch(self.name, self.arity, args.len()));
        }
        (self.shim)(frame, &Args::new(self.name, args, host))
    }
}

impl std::fmt::Debug for External {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("External")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Host-side state visible to shims
#[derive(Debug)]
pub struct Host {
    pub config: BridgeConfig,
    gomaxprocs: std::cell::Cell<usize>,
}

impl Host {
    pub fn new(config: BridgeConfig) -> Self {
        let gomaxprocs = std::cell::Cell::new(config.initial_gomaxprocs());
        Host { config, gomaxprocs }
    }

    pub fn gomaxprocs(&self) -> usize {
        self.gomaxprocs.get()
    }

    /// Returns the previous setting; `n < 1` only queries
    pub fn set_gomaxprocs(&self, n: i64) -> usize {
        let prev = self.gomaxprocs.get();
        if n >= 1 {
            self.gomaxprocs.set(usize::try_from(n).unwrap_or(usize::MAX));
        }
        prev
    }
}

/// The table of external functions
///
/// Built once, then only read. The evaluator owns one and passes it to
/// wherever calls are resolved.
#[derive(Debug)]
pub struct Externals {
    table: HashMap<&'static str, External>,
    host: Host,
}

impl Default for Externals {
    fn default() -> Self {
        Self::new()
    }
}

impl Externals {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let mut externals = Externals {
            table: HashMap::new(),
            host: Host::new(config),
        };
        externals.register_all();
        externals
    }

    fn register(&mut self, name: &'static str, arity: usize, shim: ExternalFn) {
        let prev = self.table.insert(name, External { name, arity, shim });
        debug_assert!(prev.is_none(), "external {name} registered twice");
    }

    fn register_all(&mut self) {
        // Stack introspection
        self.register("(*runtime.Func).Entry", 1, runtime::func_entry);
        self.register("(*runtime.Func).FileLine", 2, runtime::func_file_line);
        self.register("(*runtime.Func).Name", 1, runtime::func_name);

        // Pooling
        self.register("(*sync.Pool).Get", 1, runtime::pool_get);
        self.register("(*sync.Pool).Put", 2, runtime::pool_put);

        // Reflection: values
        self.register("(reflect.Value).Bool", 1, reflect::value_bool);
        self.register("(reflect.Value).CanAddr", 1, reflect::value_can_addr);
        self.register("(reflect.Value).CanInterface", 1, reflect::value_can_interface);
        self.register("(reflect.Value).Elem", 1, reflect::value_elem);
        self.register("(reflect.Value).Field", 2, reflect::value_field);
        self.register("(reflect.Value).Float", 1, reflect::value_float);
        self.register("(reflect.Value).Index", 2, reflect::value_index);
        self.register("(reflect.Value).Int", 1, reflect::value_int);
        self.register("(reflect.Value).Interface", 1, reflect::value_interface);
        self.register("(reflect.Value).IsNil", 1, reflect::value_is_nil);
        self.register("(reflect.Value).IsValid", 1, reflect::value_is_valid);
        self.register("(reflect.Value).Kind", 1, reflect::value_kind);
        self.register("(reflect.Value).Len", 1, reflect::value_len);
        self.register("(reflect.Value).MapIndex", 2, reflect::value_map_index);
        self.register("(reflect.Value).MapKeys", 1, reflect::value_map_keys);
        self.register("(reflect.Value).NumField", 1, reflect::value_num_field);
        self.register("(reflect.Value).NumMethod", 1, reflect::value_num_method);
        self.register("(reflect.Value).Pointer", 1, reflect::value_pointer);
        self.register("(reflect.Value).Set", 2, reflect::value_set);
        self.register("(reflect.Value).String", 1, reflect::value_string);
        self.register("(reflect.Value).Type", 1, reflect::value_type);
        self.register("(reflect.Value).Uint", 1, reflect::value_uint);
        self.register("(reflect.error).Error", 1, reflect::error_error);

        // Reflection: types
        self.register("(reflect.rtype).Bits", 1, reflect::rtype_bits);
        self.register("(reflect.rtype).Elem", 1, reflect::rtype_elem);
        self.register("(reflect.rtype).Field", 2, reflect::rtype_field);
        self.register("(reflect.rtype).Kind", 1, reflect::rtype_kind);
        self.register("(reflect.rtype).NumField", 1, reflect::rtype_num_field);
        self.register("(reflect.rtype).NumMethod", 1, reflect::rtype_num_method);
        self.register("(reflect.rtype).NumOut", 1, reflect::rtype_num_out);
        self.register("(reflect.rtype).Out", 2, reflect::rtype_out);
        self.register("(reflect.rtype).Size", 1, reflect::rtype_size);
        self.register("(reflect.rtype).String", 1, reflect::rtype_string);

        // Byte and string scanning
        self.register("bytes.Equal", 2, bytes::equal);
        self.register("bytes.IndexByte", 2, bytes::index_byte);
        self.register("strings.IndexByte", 2, bytes::string_index_byte);
        self.register("hash/crc32.haveSSE42", 0, bytes::have_sse42);

        // Math
        self.register("math.Abs", 1, math::abs);
        self.register("math.Exp", 1, math::exp);
        self.register("math.Min", 2, math::min);
        self.register("math.Float32bits", 1, math::float32_bits);
        self.register("math.Float32frombits", 1, math::float32_from_bits);
        self.register("math.Float64bits", 1, math::float64_bits);
        self.register("math.Float64frombits", 1, math::float64_from_bits);

        // Reflection: package functions
        self.register("reflect.New", 1, reflect::new);
        self.register("reflect.TypeOf", 1, reflect::type_of);
        self.register("reflect.ValueOf", 1, reflect::value_of);
        self.register("reflect.init", 0, reflect::init);
        self.register("reflect.valueInterface", 2, reflect::value_interface_internal);

        // Runtime
        self.register("runtime.Breakpoint", 0, runtime::breakpoint);
        self.register("runtime.Caller", 1, runtime::caller);
        self.register("runtime.FuncForPC", 1, runtime::func_for_pc);
        self.register("runtime.GC", 0, runtime::gc);
        self.register("runtime.GOMAXPROCS", 1, runtime::gomaxprocs);
        self.register("runtime.Gosched", 0, runtime::gosched);
        self.register("runtime.NumCPU", 0, runtime::num_cpu);
        self.register("runtime.ReadMemStats", 1, runtime::read_mem_stats);
        self.register("runtime.SetFinalizer", 2, runtime::set_finalizer);
        self.register("runtime.getgoroot", 0, runtime::getgoroot);

        // Synchronization hooks
        self.register("sync.runtime_Syncsemcheck", 1, runtime::sync_semcheck);
        self.register("sync.runtime_registerPool", 1, runtime::register_pool);

        // Atomics (single host thread only)
        self.register("sync/atomic.AddInt32", 2, atomic::add::<i32>);
        self.register("sync/atomic.AddUint32", 2, atomic::add::<u32>);
        self.register("sync/atomic.AddInt64", 2, atomic::add::<i64>);
        self.register("sync/atomic.AddUint64", 2, atomic::add::<u64>);
        self.register("sync/atomic.CompareAndSwapInt32", 3, atomic::compare_and_swap::<i32>);
        self.register("sync/atomic.CompareAndSwapUint32", 3, atomic::compare_and_swap::<u32>);
        self.register("sync/atomic.CompareAndSwapInt64", 3, atomic::compare_and_swap::<i64>);
        self.register("sync/atomic.CompareAndSwapUint64", 3, atomic::compare_and_swap::<u64>);
        self.register("sync/atomic.LoadInt32", 1, atomic::load::<i32>);
        self.register("sync/atomic.LoadUint32", 1, atomic::load::<u32>);
        self.register("sync/atomic.LoadInt64", 1, atomic::load::<i64>);
        self.register("sync/atomic.LoadUint64", 1, atomic::load::<u64>);
        self.register("sync/atomic.StoreInt32", 2, atomic::store::<i32>);
        self.register("sync/atomic.StoreUint32", 2, atomic::store::<u32>);
        self.register("sync/atomic.StoreInt64", 2, atomic::store::<i64>);
        self.register("sync/atomic.StoreUint64", 2, atomic::store::<u64>);

        // Operating system
        self.register("syscall.Close", 1, syscall::close);
        self.register("syscall.Exit", 1, syscall::exit);
        self.register("syscall.Fstat", 2, syscall::fstat);
        self.register("syscall.Getpid", 0, syscall::getpid);
        self.register("syscall.Getwd", 0, syscall::getwd);
        self.register("syscall.Kill", 2, syscall::kill);
        self.register("syscall.Lstat", 2, syscall::lstat);
        self.register("syscall.Open", 3, syscall::open);
        self.register("syscall.ParseDirent", 3, syscall::parse_dirent);
        self.register("syscall.RawSyscall", 4, syscall::raw_syscall);
        self.register("syscall.Read", 2, syscall::read);
        self.register("syscall.ReadDirent", 2, syscall::read_dirent);
        self.register("syscall.Stat", 2, syscall::stat);
        self.register("syscall.Write", 2, syscall::write);

        // Time
        self.register("time.Sleep", 1, runtime::sleep);
        self.register("time.now", 0, runtime::now);
    }

    /// Exact-match lookup by qualified name
    pub fn lookup(&self, name: &str) -> Option<&External> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.host.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Run the shim registered under `name`
    pub fn dispatch(&self, name: &str, frame: &mut dyn Frame, args: &[Value]) -> InterpResult<Value> {
        match self.lookup(name) {
            Some(external) => {
                trace!(name, argc = args.len(), "external call");
                external.invoke(frame, &self.host, args)
            }
            None => {
                warn!(name, "call to unsupported external function");
                Err(RuntimeError::unsupported_external(name))
            }
        }
    }
}

/// Run a shim outside any evaluator
#[cfg(test)]
pub(crate) fn call_detached(shim: ExternalFn, values: &[Value]) -> InterpResult<Value> {
    let host = Host::new(BridgeConfig::default());
    shim(&mut crate::interp::DetachedFrame, &Args::new("test", values, &host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{DetachedFrame, ErrorKind};

    #[test]
    fn test_lookup_is_exact_match() {
        let externals = Externals::new();
        assert!(externals.lookup("bytes.Equal").is_some());
        assert!(externals.lookup("bytes.equal").is_none());
        assert!(externals.lookup("Equal").is_none());
        assert!(externals.lookup("(*sync.Pool).Get").is_some());
        assert!(externals.lookup("(sync.Pool).Get").is_none());
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let externals = Externals::new();
        let before = externals.len();
        for _ in 0..3 {
            let entry = externals.lookup("math.Min").unwrap();
            assert_eq!(entry.name, "math.Min");
            assert_eq!(entry.arity, 2);
        }
        assert!(externals.lookup("os.Pipe").is_none());
        assert!(externals.lookup("os.Pipe").is_none());
        assert_eq!(externals.len(), before);
    }

    #[test]
    fn test_table_size_and_keys() {
        let externals = Externals::new();
        assert_eq!(externals.len(), 98);
        assert!(!externals.is_empty());
        for name in externals.names() {
            assert_eq!(externals.lookup(name).unwrap().name, name);
        }
    }

    #[test]
    fn test_names_sorted() {
        let names = Externals::new().names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_dispatch_unsupported() {
        let externals = Externals::new();
        let err = externals
            .dispatch("os.Pipe", &mut DetachedFrame, &[])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedExternal);
        assert!(!err.is_internal());
    }

    #[test]
    fn test_dispatch_checks_arity() {
        let externals = Externals::new();
        let err = externals
            .dispatch("math.Abs", &mut DetachedFrame, &[])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.is_internal());
    }

    #[test]
    fn test_dispatch_runs_shim() {
        let externals = Externals::new();
        let result = externals
            .dispatch("math.Abs", &mut DetachedFrame, &[Value::Float64(-2.5)])
            .unwrap();
        assert_eq!(result, Value::Float64(2.5));
    }

    #[test]
    fn test_host_gomaxprocs() {
        let config = BridgeConfig {
            gomaxprocs: Some(4),
            ..BridgeConfig::default()
        };
        let host = Host::new(config);
        assert_eq!(host.set_gomaxprocs(0), 4);
        assert_eq!(host.set_gomaxprocs(2), 4);
        assert_eq!(host.gomaxprocs(), 2);
        assert_eq!(host.set_gomaxprocs(-1), 2);
    }
}
