use std::error::{Error};
use std::fmt::{self, Debug, Display, Formatter};
use super::engine::{call_panic_hook};


//-------------------------------------------------------------------------------------------------
// ErrorKind
//-------------------------------------------------------------------------------------------------

/**
The category of a [`ZError`](struct.ZError.html).

Every error raised by this crate is a programmer error, detected synchronously at the point
where a namespace, class or object is being manipulated. The kind is there so that callers
(and tests) can tell them apart without parsing the message.
*/

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	///A name was registered twice without an override, replace or overwrite marker.
	NamespaceConflict,

	///An `overriding` marker was used without an existing function to override.
	CannotOverride,

	///A `replace` marker was used without an existing member to replace.
	CannotReplace,

	///A forward reference revisited a name which was still being resolved.
	ReferenceCycle,

	///A class with unimplemented abstract members was constructed.
	AbstractInstantiation,

	///An enum class was constructed after its constants were sealed.
	CannotInstantiateEnum,

	///A singleton class was constructed outside of `getInstance`.
	CannotInstantiateSingleton,

	///A module was required before it had been registered.
	MissingRequiredModule,

	///An enum lookup table was built over a column which contains duplicates.
	NonInvertibleMapping,

	///A dotted path, or a member name, did not resolve to anything.
	UnknownName,

	///A class was used before its textual base class had been resolved.
	Unfinished,

	///A value did not have the expected type.
	WrongType,

	Other
}

impl ErrorKind {
	pub fn name(self) -> &'static str {
		match self {
			ErrorKind::NamespaceConflict => "NamespaceConflict",
			ErrorKind::CannotOverride => "CannotOverride",
			ErrorKind::CannotReplace => "CannotReplace",
			ErrorKind::ReferenceCycle => "ReferenceCycle",
			ErrorKind::AbstractInstantiation => "AbstractInstantiation",
			ErrorKind::CannotInstantiateEnum => "CannotInstantiateEnum",
			ErrorKind::CannotInstantiateSingleton => "CannotInstantiateSingleton",
			ErrorKind::MissingRequiredModule => "MissingRequiredModule",
			ErrorKind::NonInvertibleMapping => "NonInvertibleMapping",
			ErrorKind::UnknownName => "UnknownName",
			ErrorKind::Unfinished => "Unfinished",
			ErrorKind::WrongType => "WrongType",
			ErrorKind::Other => "Other"
		}
	}
}

impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}


//-------------------------------------------------------------------------------------------------
// ZError, ZResult
//-------------------------------------------------------------------------------------------------

///The error type returned by every fallible operation in this crate.
pub struct ZError {
	kind: ErrorKind,
	message: String,

	//one line per enclosing namespace slot that was being resolved when the error occurred,
	//innermost first. only populated when the engine's errors are verbose.
	context: Vec<String>
}

///A type alias for `Result<T, ZError>`.
pub type ZResult<T> = Result<T, ZError>;

impl ZError {
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn is(&self, kind: ErrorKind) -> bool {
		self.kind == kind
	}

	pub fn context(&self) -> &[String] {
		&self.context
	}

	pub(crate) fn push_context(&mut self, line: String) {
		self.context.push(line);
	}
}

impl Display for ZError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{}: {}", self.kind, self.message)?;
		for line in &self.context {
			write!(f, "\n    {}", line)?;
		}

		Ok(())
	}
}

impl Debug for ZError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "ZError({:?}, {:?})", self.kind, self.message)
	}
}

impl Error for ZError { }

/**
The panic primitive.

Every error produced by this crate, including those produced by the
[`bail!`](macro.bail.html), [`ensure!`](macro.ensure.html) and [`error!`](macro.error.html)
macros, is constructed by this function. It emits a `debug` record on the `zjs::panic` log
target and passes the error to the active engine's panic hook (see
[`zjs::set_panic_hook`](fn.set_panic_hook.html)) before returning it.
*/
pub fn raise(kind: ErrorKind, message: String) -> ZError {
	let error = ZError { kind, message, context: Vec::new() };

	log::debug!(target: "zjs::panic", "{}", error);
	call_panic_hook(&error);

	error
}


//-------------------------------------------------------------------------------------------------
// error!(), bail!(), ensure!()
//-------------------------------------------------------------------------------------------------

/**
Constructs a [`ZError`](struct.ZError.html).

The first argument may optionally be the name of an [`ErrorKind`](enum.ErrorKind.html)
variant; it defaults to `Other`. The rest of the input is passed to `format!`.

```ignore
let err = error!(CannotReplace, "no member {} to replace", name);
```
*/
#[macro_export]
macro_rules! error {
	($kind:ident, $($arg:tt)+) => (
		$crate::raise($crate::ErrorKind::$kind, format!($($arg)+))
	);
	($($arg:tt)+) => (
		$crate::raise($crate::ErrorKind::Other, format!($($arg)+))
	);
}

///Returns early with an [`error!`](macro.error.html).
#[macro_export]
macro_rules! bail {
	($($arg:tt)+) => (
		return Err($crate::error!($($arg)+))
	);
}

///Returns early with an [`error!`](macro.error.html) if the condition is `false`.
#[macro_export]
macro_rules! ensure {
	($cond:expr) => (
		if !$cond {
			$crate::bail!("assertion failed: {}", stringify!($cond))
		}
	);
	($cond:expr, $($arg:tt)+) => (
		if !$cond {
			$crate::bail!($($arg)+)
		}
	);
}
