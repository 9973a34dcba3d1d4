use fnv::{FnvHashMap, FnvHashSet};
use std::{fmt};
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Display, Formatter};
use std::marker::{PhantomData};
use std::mem::{take};
use std::ops::{Deref};
use std::rc::{Rc};
use super::class::{self, ClassStorage};
use super::code::{Func};
use super::error::{ZError, ZResult};
use super::journal::{Journal};
use super::members::{Members};
use super::namespace::{self, NsStorage};
use super::root::{Root};


//-------------------------------------------------------------------------------------------------
// ACTIVE_ENGINE
//-------------------------------------------------------------------------------------------------

thread_local! {
	static ACTIVE_ENGINE: RefCell<Option<Rc<EngineStorage>>> = RefCell::new(None);
}

#[inline(always)]
pub(crate) fn with_engine<R, F: FnOnce(&EngineStorage) -> R>(f: F) -> R {
	ACTIVE_ENGINE.with(|ref_cell| {
		let borrow = ref_cell.borrow();
		let rc = borrow.as_ref().expect(
			"no zjs engine is active; consider calling Runtime::run()"
		);

		f(&rc)
	})
}

//the panic primitive can be reached while no engine is active (for example, a FromVal
//conversion performed outside of run()), so it mustn't panic in that case
pub(crate) fn call_panic_hook(error: &ZError) {
	let hook = ACTIVE_ENGINE.with(|ref_cell| {
		match &*ref_cell.borrow() {
			Some(rc) => rc.panic_hook.borrow().clone(),
			None => None
		}
	});

	if let Some(hook) = hook {
		hook(error);
	}
}


//-------------------------------------------------------------------------------------------------
// EngineStorage, EngineBuilder and Engine
//-------------------------------------------------------------------------------------------------

///A callback invoked with every error produced by the panic primitive.
pub type PanicHook = Rc<dyn Fn(&ZError)>;

/**
Configuration options for constructing an [`Engine`](struct.Engine.html).

Most users will want `RuntimeBuilder` from the `zjs` crate instead, which also initializes
the standard modules.
*/
pub struct EngineBuilder {
	errors_verbose: bool,
	panic_hook: Option<PanicHook>
}

impl EngineBuilder {
	pub fn new() -> EngineBuilder {
		EngineBuilder {
			errors_verbose: true,
			panic_hook: None
		}
	}

	/**
	Sets the `errors_verbose` option, which defaults to `true`.

	When errors are verbose, an error raised while a namespace slot is being resolved records
	the fullname of every slot which was mid-resolution at the time.
	*/
	pub fn errors_verbose(self, errors_verbose: bool) -> EngineBuilder {
		EngineBuilder {
			errors_verbose,
			..self
		}
	}

	///Installs a panic hook. See [`zjs::set_panic_hook`](fn.set_panic_hook.html).
	pub fn panic_hook<F: Fn(&ZError) + 'static>(self, hook: F) -> EngineBuilder {
		EngineBuilder {
			panic_hook: Some(Rc::new(hook)),
			..self
		}
	}

	pub fn build(self) -> Engine {
		let engine = Engine::new();
		engine.0.errors_verbose.set(self.errors_verbose);
		*engine.0.panic_hook.borrow_mut() = self.panic_hook;
		engine
	}
}

impl Default for EngineBuilder {
	fn default() -> EngineBuilder {
		EngineBuilder::new()
	}
}

/**
The process-wide context which owns every namespace, class and symbol.

An `Engine` is inert until it's made *active* by calling [`run`](#method.run). For the
duration of that call, the free functions in this crate (`zjs::namespace`, `zjs::class`, and
so on) manipulate that engine. Multiple engines can coexist, but they share nothing.
*/
pub struct Engine(Rc<EngineStorage>);

pub(crate) struct EngineStorage {
	syms: RefCell<Vec<Rc<str>>>,
	syms_map: RefCell<FnvHashMap<Rc<str>, Sym>>,

	pub(crate) classes: RefCell<Vec<ClassStorage>>,
	pub(crate) namespaces: RefCell<Vec<NsStorage>>,
	pub(crate) root_class: Cell<Option<class::Class>>,
	pub(crate) none_fn: RefCell<Option<Root<Func>>>,

	//the module ledger. `modules` preserves registration order
	modules: RefCell<Vec<Rc<str>>>,
	modules_set: RefCell<FnvHashSet<Rc<str>>>,

	//the fullnames of the namespace slots currently being resolved, outermost first
	pub(crate) resolving: RefCell<Vec<Rc<str>>>,

	//one per namespace batch which is currently being added, innermost last
	pub(crate) journals: RefCell<Vec<Journal>>,

	panic_hook: RefCell<Option<PanicHook>>,
	errors_verbose: Cell<bool>
}

impl Engine {
	pub fn new() -> Engine {
		let engine = Engine(Rc::new(EngineStorage {
			syms: RefCell::new(Vec::new()),
			syms_map: RefCell::new(FnvHashMap::default()),

			classes: RefCell::new(Vec::new()),
			namespaces: RefCell::new(Vec::new()),
			root_class: Cell::new(None),
			none_fn: RefCell::new(None),

			modules: RefCell::new(Vec::new()),
			modules_set: RefCell::new(FnvHashSet::default()),

			resolving: RefCell::new(Vec::new()),
			journals: RefCell::new(Vec::new()),

			panic_hook: RefCell::new(None),
			errors_verbose: Cell::new(true)
		}));

		//the global namespace, the no-op super function and the root class must exist before
		//any user code runs. failure here is a bug in this crate, not a user error.
		engine.try_run(init_core).unwrap();

		engine
	}

	/**
	Establishes this engine as the active engine for the duration of `f`.

	If `f` returns an error, it's logged (on the `zjs` target, at the `error` level) and
	`None` is returned. Use [`try_run`](#method.try_run) to receive the error instead.
	*/
	pub fn run<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce() -> ZResult<R>
	{
		match self.try_run(f) {
			Ok(r) => Some(r),
			Err(error) => {
				log::error!(target: "zjs", "unhandled error in run() call: {}", error);
				None
			}
		}
	}

	///Establishes this engine as the active engine, returning the result of `f` unchanged.
	pub fn try_run<F, R>(&self, f: F) -> ZResult<R>
	where
		F: FnOnce() -> ZResult<R>
	{
		let old_active_engine = ACTIVE_ENGINE.with(|ref_cell| {
			ref_cell.replace(Some(self.0.clone()))
		});

		let _guard = Guard::new(|| {
			ACTIVE_ENGINE.with(|ref_cell| {
				ref_cell.replace(old_active_engine);
			});
		});

		f()
	}
}

impl Default for Engine {
	fn default() -> Engine {
		Engine::new()
	}
}

impl Drop for Engine {
	fn drop(&mut self) {
		//classes and namespaces can hold roots which point back into each other through rust
		//closures. we move the arenas out before dropping them, so that no RefCell is borrowed
		//while those destructors run.
		let classes = take(&mut *self.0.classes.borrow_mut());
		let namespaces = take(&mut *self.0.namespaces.borrow_mut());
		let journals = take(&mut *self.0.journals.borrow_mut());
		let none_fn = self.0.none_fn.borrow_mut().take();
		let panic_hook = self.0.panic_hook.borrow_mut().take();

		drop(classes);
		drop(namespaces);
		drop(journals);
		drop(none_fn);
		drop(panic_hook);
	}
}

fn init_core() -> ZResult<()> {
	namespace::alloc_global();

	with_engine(|engine| {
		*engine.none_fn.borrow_mut() = Some(Func::none());
	});

	let root = class::alloc_root_class()?;
	with_engine(|engine| engine.root_class.set(Some(root)));

	zjs::namespace_with("zjs", Members::new().def("Object", root))?;
	Ok(())
}


//-------------------------------------------------------------------------------------------------
// Guard
//-------------------------------------------------------------------------------------------------

//several operations (engine activation, the singleton construction flag, the resolution
//stack) must be restored when a function early-exits with an error or unwinds. Guard runs an
//arbitrary closure when it's dropped.
#[doc(hidden)]
pub struct Guard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Guard<F> {
	pub fn new(f: F) -> Guard<F> {
		Guard(Some(f))
	}
}

impl<F: FnOnce()> Drop for Guard<F> {
	fn drop(&mut self) {
		if let Some(f) = self.0.take() {
			f()
		}
	}
}


//-------------------------------------------------------------------------------------------------
// Sym, ToSym
//-------------------------------------------------------------------------------------------------

/**
An interned member name.

Symbols are represented by a small `Copy` type (a 32-bit integer id). To convert a string
into a symbol, call [`zjs::sym`](fn.sym.html).

A valid symbol name is non-empty and doesn't contain a `.`, because the `.` separates the
segments of a dotted path.
*/

//the PhantomData is used to ensure that Syms are !Send and !Sync
#[derive(PartialEq, Eq, Hash, Copy, Clone)]
pub struct Sym(pub(crate) u32, pub(crate) PhantomData<*mut ()>);

impl Sym {
	///Returns the name of the symbol.
	pub fn name(&self) -> Rc<str> {
		with_engine(|engine| {
			Rc::clone(&engine.syms.borrow()[self.0 as usize])
		})
	}
}

impl Display for Sym {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(&self.name())
	}
}

impl Debug for Sym {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Sym({})", self.name())
	}
}

/**
A type which can be converted to a [`Sym`](struct.Sym.html).

This makes APIs more ergonomic: a generic `S: ToSym` argument accepts either a symbol or a
string.
*/
pub trait ToSym {
	fn to_sym(&self) -> ZResult<Sym>;
}

impl<T> ToSym for T
where
	T: Deref,
	T::Target: ToSym
{
	fn to_sym(&self) -> ZResult<Sym> {
		(**self).to_sym()
	}
}

impl ToSym for Sym {
	fn to_sym(&self) -> ZResult<Sym> {
		Ok(*self)
	}
}

impl ToSym for str {
	fn to_sym(&self) -> ZResult<Sym> {
		zjs::sym(self)
	}
}


//-------------------------------------------------------------------------------------------------
// the zjs module
//-------------------------------------------------------------------------------------------------

/**
The free functions which manipulate the active engine.

Everything in this module is re-exported at the crate root, so these are normally invoked
as `zjs::namespace(..)`, `zjs::class(..)` and so on.
*/
pub mod zjs {
	use super::*;
	use crate::base;
	use crate::class::{Base, Class};
	use crate::code::{self, Call};
	use crate::meta::{self, Meta};
	use crate::mixin as mixin_engine;
	use crate::namespace::{Namespace};
	use crate::val::{Val};

	//---------------------------------------------------------------------------------------------
	// syms
	//---------------------------------------------------------------------------------------------

	///Interns a member name.
	pub fn sym(name: &str) -> ZResult<Sym> {
		ensure!(is_valid_sym(name), WrongType, "invalid sym '{}'", name);

		with_engine(|engine| {
			let mut syms_map = engine.syms_map.borrow_mut();
			if let Some(sym) = syms_map.get(name) {
				Ok(*sym)
			} else {
				let name = Rc::<str>::from(name);

				let mut syms = engine.syms.borrow_mut();
				syms.push(name.clone());

				//we panic rather than returning an Err here, because we consider running out of
				//Syms to be an unrecoverable error, similar to out-of-memory
				assert!(syms.len() - 1 <= u32::MAX as usize, "program requires too many symbols");

				let sym = Sym((syms.len() - 1) as u32, PhantomData);
				syms_map.insert(name, sym);

				Ok(sym)
			}
		})
	}

	///Returns `true` if `name` could be passed to [`zjs::sym`](fn.sym.html).
	pub fn is_valid_sym(name: &str) -> bool {
		!name.is_empty() && !name.contains('.') && !name.chars().any(char::is_whitespace)
	}

	//---------------------------------------------------------------------------------------------
	// namespaces
	//---------------------------------------------------------------------------------------------

	///Returns the global namespace, whose fullname is the empty string.
	pub fn global() -> Namespace {
		Namespace::global()
	}

	/**
	Ensures that every segment of the dotted path `path` exists as a namespace below the global
	namespace, and returns the innermost one.

	Calling this twice with the same path returns the same `Namespace` both times.
	*/
	pub fn namespace(path: &str) -> ZResult<Namespace> {
		Namespace::global().namespace(path)
	}

	///Declares the namespace `path`, then registers `members` in it.
	pub fn namespace_with(path: &str, members: Members) -> ZResult<Namespace> {
		Namespace::global().namespace_with(path, members)
	}

	///Resolves a dotted path, starting from the global namespace.
	pub fn lookup(path: &str) -> ZResult<Val> {
		Namespace::global().lookup(path)
	}

	///Resolves a dotted path, returning `None` rather than failing if it's unbound.
	pub fn lookup_opt(path: &str) -> ZResult<Option<Val>> {
		Namespace::global().lookup_opt(path)
	}

	//---------------------------------------------------------------------------------------------
	// classes and mixins
	//---------------------------------------------------------------------------------------------

	///Returns the system root class, `zjs.Object`.
	pub fn root_class() -> Class {
		with_engine(|engine| {
			engine.root_class.get().expect("the root class is allocated during Engine::new()")
		})
	}

	///Builds a class which derives from the root class.
	pub fn class(members: Members) -> ZResult<Class> {
		class::build_class(Base::Default, members)
	}

	/**
	Builds a class with an explicit base.

	The base may be a `Class`, `None` (for a class with no base at all), or a `&str` naming
	a class in the namespace where this class will be registered. A textual base is resolved
	when the namespace slot which holds the new class is resolved.
	*/
	pub fn class_from<B: Into<Base>>(base: B, members: Members) -> ZResult<Class> {
		class::build_class(base.into(), members)
	}

	/**
	Mixes `members` into a class or an object.

	`tag` labels the installed functions' metadata, which is useful for diagnostics.
	*/
	pub fn mixin(target: &Val, tag: &str, members: Members) -> ZResult<()> {
		mixin_engine::mixin_val(target, tag, members)
	}

	//---------------------------------------------------------------------------------------------
	// functions
	//---------------------------------------------------------------------------------------------

	///Wraps a Rust closure as a ZJS function.
	pub fn func<F>(f: F) -> Val
	where
		F: Fn(&Call) -> ZResult<Val> + 'static
	{
		Val::Fn(Func::new(f))
	}

	/**
	Sets a function's chain priority, returning the function.

	When several versions of the same method are mixed into one class, the version with the
	highest priority runs first. The default priority is `0`.
	*/
	pub fn priority(priority: i32, func: Val) -> ZResult<Val> {
		ensure!(func.is_fn(), WrongType, "expected a fn, received {}", func.a_type_name());
		Ok(meta::add_meta(&func, Meta { priority: Some(priority), ..Meta::default() }))
	}

	///Returns a function which always invokes `func` with `receiver` as `this`.
	pub fn bind<T: Into<Val>>(func: &Root<Func>, receiver: T) -> Root<Func> {
		code::bind(func, receiver.into())
	}

	///Returns a function which invokes `func` with `args` prepended to its arguments.
	pub fn head(func: &Root<Func>, args: &[Val]) -> Root<Func> {
		code::head(func, args)
	}

	///Returns a function which invokes `func` with `args` appended to its arguments.
	pub fn tail(func: &Root<Func>, args: &[Val]) -> Root<Func> {
		code::tail(func, args)
	}

	///Returns the shared no-op function which is used when a super call has no target.
	pub fn none() -> Root<Func> {
		with_engine(|engine| {
			engine.none_fn.borrow().clone().expect("allocated during Engine::new()")
		})
	}

	//---------------------------------------------------------------------------------------------
	// metadata
	//---------------------------------------------------------------------------------------------

	/**
	Returns a copy of a value's metadata.

	Unless `no_create` is set, an empty record is attached the first time metadata is requested
	for a function, object, class or namespace. Other values can't carry metadata, so this
	always returns `None` for them.
	*/
	pub fn get_meta(val: &Val, no_create: bool) -> Option<Meta> {
		meta::get_meta(val, no_create)
	}

	/**
	Merges every `Some` field of `partial` into a value's metadata, then returns the value.

	Values which can't carry metadata are returned unchanged.
	*/
	pub fn add_meta(val: &Val, partial: Meta) -> Val {
		meta::add_meta(val, partial)
	}

	//---------------------------------------------------------------------------------------------
	// super calls
	//---------------------------------------------------------------------------------------------

	/**
	Returns the super method of the currently-executing method: the next entry in its
	override chain, or its base class's version, or [`zjs::none`](fn.none.html).

	Rust has no caller introspection, so the current method is identified by its `Call`.
	*/
	pub fn super_fn(call: &Call) -> Root<Func> {
		base::resolve_super(call.callee())
	}

	///Invokes the super method on `receiver`, passing along the current call's arguments.
	pub fn call_super<T: Into<Val>>(call: &Call, receiver: T) -> ZResult<Val> {
		base::resolve_super(call.callee()).call(&receiver.into(), call.args())
	}

	///Invokes the super method on `receiver` with an explicit argument list.
	pub fn apply_super<T: Into<Val>>(call: &Call, receiver: T, args: &[Val]) -> ZResult<Val> {
		base::resolve_super(call.callee()).call(&receiver.into(), args)
	}

	//---------------------------------------------------------------------------------------------
	// the module ledger
	//---------------------------------------------------------------------------------------------

	///Records that the module `path` has been declared. Re-registering is harmless.
	pub fn register_module(path: &str) {
		with_engine(|engine| {
			let mut modules_set = engine.modules_set.borrow_mut();
			if !modules_set.contains(path) {
				log::debug!(target: "zjs", "registered module {}", path);

				let path = Rc::<str>::from(path);
				modules_set.insert(path.clone());
				engine.modules.borrow_mut().push(path);
			}
		})
	}

	///Fails with `MissingRequiredModule` unless the module `path` has been registered.
	pub fn require_module(path: &str) -> ZResult<()> {
		ensure!(has_module(path), MissingRequiredModule,
		        "the module '{}' is required, but it has not been registered", path);
		Ok(())
	}

	pub fn has_module(path: &str) -> bool {
		with_engine(|engine| engine.modules_set.borrow().contains(path))
	}

	///Returns every registered module, in registration order.
	pub fn modules() -> Vec<Rc<str>> {
		with_engine(|engine| engine.modules.borrow().clone())
	}

	//---------------------------------------------------------------------------------------------
	// diagnostics
	//---------------------------------------------------------------------------------------------

	/**
	Installs (or, given `None`, removes) the active engine's panic hook.

	Every error raised by this crate is passed to the hook before it's returned, which makes
	the hook a convenient place for a breakpoint or for structured logging.
	*/
	pub fn set_panic_hook(hook: Option<PanicHook>) {
		with_engine(|engine| {
			*engine.panic_hook.borrow_mut() = hook;
		})
	}

	pub fn errors_verbose() -> bool {
		with_engine(|engine| engine.errors_verbose.get())
	}

	pub fn set_errors_verbose(errors_verbose: bool) {
		with_engine(|engine| engine.errors_verbose.set(errors_verbose))
	}
}
