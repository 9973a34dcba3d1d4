#![forbid(unsafe_code)]

use zjs::{Engine, EngineBuilder, ZError, ZResult};

mod enums;
mod singleton;

pub use self::enums::{enumeration, EnumEntry};
pub use self::singleton::{singleton};

/**
The ZJS object system.

`Runtime` owns every namespace, class and symbol, along with the module ledger and the
standard modules (`zjs.core`, `zjs.enum` and `zjs.singleton`).

To manipulate a `Runtime`, you don't call methods on it directly. Instead, use the
[`run` method](#method.run) to establish it as the "active runtime", then use this crate's
global functions and methods to interact with it.

If you attempt to use namespaces, classes or symbols without an active runtime, it will
almost always panic.

It's possible for multiple `Runtimes` to coexist. Each runtime is strictly isolated from the
others: they don't share namespaces, classes or symbols.
*/

//a Runtime is just a thin wrapper for an Engine which has been initialized with the stdlib
pub struct Runtime(Engine);

impl Runtime {
	/**
	Construct a `Runtime` with default settings.

	To construct a custom `Runtime`, use [`RuntimeBuilder`](struct.RuntimeBuilder.html)
	instead.
	*/
	pub fn new() -> Runtime {
		RuntimeBuilder::new().build()
	}

	fn with_engine(engine: Engine) -> Runtime {
		//the standard modules only register themselves, so this can't fail
		engine.try_run(init_stdlib).unwrap();

		Runtime(engine)
	}

	/**
	Establish this `Runtime` as the active runtime.

	For the duration of the `f` closure, any calls to global functions like
	[`zjs::namespace`](fn.namespace.html) or [`zjs::class`](fn.class.html) will manipulate
	this `Runtime`.

	If `f` returns an error, it's logged and `None` is returned.
	*/
	pub fn run<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce() -> ZResult<R>
	{
		self.0.run(f)
	}

	///Like [`run`](#method.run), but returns the error rather than logging it.
	pub fn try_run<F, R>(&self, f: F) -> ZResult<R>
	where
		F: FnOnce() -> ZResult<R>
	{
		self.0.try_run(f)
	}
}

impl Default for Runtime {
	fn default() -> Runtime {
		Runtime::new()
	}
}

/**
Configuration options for constructing a [`Runtime`](struct.Runtime.html).
*/
pub struct RuntimeBuilder {
	engine_builder: EngineBuilder
}

impl RuntimeBuilder {
	pub fn new() -> RuntimeBuilder {
		RuntimeBuilder {
			engine_builder: EngineBuilder::new()
		}
	}

	/**
	Sets the `errors_verbose` configuration option, which defaults to `true`.

	When `errors_verbose` is `true`, an error which occurs while a namespace slot is being
	resolved records the fullname of each slot which was mid-resolution.
	*/
	pub fn errors_verbose(self, errors_verbose: bool) -> RuntimeBuilder {
		RuntimeBuilder {
			engine_builder: self.engine_builder.errors_verbose(errors_verbose)
		}
	}

	///Installs a callback which receives every error produced by the runtime.
	pub fn panic_hook<F: Fn(&ZError) + 'static>(self, hook: F) -> RuntimeBuilder {
		RuntimeBuilder {
			engine_builder: self.engine_builder.panic_hook(hook)
		}
	}

	///Construct a `Runtime` with these settings.
	pub fn build(self) -> Runtime {
		Runtime::with_engine(self.engine_builder.build())
	}
}

impl Default for RuntimeBuilder {
	fn default() -> RuntimeBuilder {
		RuntimeBuilder::new()
	}
}

fn init_stdlib() -> ZResult<()> {
	zjs::register_module("zjs.core");

	enums::init()?;
	singleton::init()?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standard_modules_are_registered() {
		let runtime = Runtime::new();
		runtime.run(|| {
			let modules: Vec<String> = zjs::modules().iter().map(|m| m.to_string()).collect();
			assert_eq!(modules, vec!["zjs.core", "zjs.enum", "zjs.singleton"]);

			zjs::require_module("zjs.enum")?;
			assert!(zjs::require_module("app.missing").is_err());
			Ok(())
		}).unwrap();
	}
}
