use std::rc::{Rc};
use super::error::{ZResult};
use super::val::{Val};

/*
a Members value is the ordered member map which is handed to Namespace::add, zjs::class,
zjs::mixin and the stdlib's enum and singleton facilities. it's a flat list of entries, each
of which is either a named member (with a registration mode and a static flag) or a
conditional directive which expands into another Members when it's evaluated.

names are stored as strings rather than Syms, so that a Members can be assembled before any
engine is active. they're interned when the Members is consumed.
*/


//-------------------------------------------------------------------------------------------------
// Members
//-------------------------------------------------------------------------------------------------

/**
An ordered set of members, used to populate namespaces, classes and objects.

```ignore
let members = Members::new()
	.def("greet", zjs::func(|_| Ok(Val::from("hello"))))
	.stat("create", zjs::func(create))
	.abstract_meth("render")
	.when(|| Ok(zjs::has_module("app.debug")), Members::new()
		.def("trace", zjs::func(trace)));
```
*/

#[derive(Clone, Default)]
pub struct Members {
	pub(crate) entries: Vec<Entry>
}

#[derive(Clone)]
pub(crate) enum Entry {
	Member(MemberEntry),
	Directive(Directive)
}

#[derive(Clone)]
pub(crate) struct MemberEntry {
	pub(crate) name: Rc<str>,
	pub(crate) val: Val,
	pub(crate) mode: Mode,
	pub(crate) is_static: bool
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Mode {
	Plain,
	Override,
	Overwrite,
	Replace,
	Abstract
}

//the `?expr` and `=expr` directives, with their expressions replaced by rust closures
#[derive(Clone)]
pub(crate) enum Directive {
	When(Rc<dyn Fn() -> ZResult<bool>>, Source),
	Select(Rc<dyn Fn() -> ZResult<Val>>, Vec<(Rc<str>, Source)>)
}

#[derive(Clone)]
pub(crate) enum Source {
	Members(Members),
	Lazy(Rc<dyn Fn() -> ZResult<Members>>)
}

impl Members {
	pub fn new() -> Members {
		Members {
			entries: Vec::new()
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn member<T: Into<Val>>(mut self, name: &str, val: T, mode: Mode, is_static: bool) -> Members {
		self.entries.push(Entry::Member(MemberEntry {
			name: Rc::from(name),
			val: val.into(),
			mode,
			is_static
		}));
		self
	}

	///Adds a plain member. Registering a name which already exists is a `NamespaceConflict`.
	pub fn def<T: Into<Val>>(self, name: &str, val: T) -> Members {
		self.member(name, val, Mode::Plain, false)
	}

	///Adds a static member. Only meaningful for classes and objects.
	pub fn stat<T: Into<Val>>(self, name: &str, val: T) -> Members {
		self.member(name, val, Mode::Plain, true)
	}

	/**
	Adds a function which overrides an existing function of the same name.

	The existing function becomes the new function's super method. Fails with
	`CannotOverride` if there's no existing function, or if either value isn't a function.
	*/
	pub fn overriding<T: Into<Val>>(self, name: &str, val: T) -> Members {
		self.member(name, val, Mode::Override, false)
	}

	///Adds a member which unconditionally replaces any existing member of the same name.
	pub fn overwrite<T: Into<Val>>(self, name: &str, val: T) -> Members {
		self.member(name, val, Mode::Overwrite, false)
	}

	///Adds a member which replaces an existing member, failing with `CannotReplace` if absent.
	pub fn replace<T: Into<Val>>(self, name: &str, val: T) -> Members {
		self.member(name, val, Mode::Replace, false)
	}

	/**
	Declares an abstract instance method.

	A class with unimplemented abstract methods can't be constructed. Only meaningful for
	classes.
	*/
	pub fn abstract_meth(self, name: &str) -> Members {
		self.member(name, Val::Nil, Mode::Abstract, false)
	}

	/**
	Adds the `?expr` directive: `members` are spliced in if `pred` returns `true`.

	`pred` is evaluated when the directive is expanded, so it can inspect any namespace state
	which has already been registered.
	*/
	pub fn when<P>(mut self, pred: P, members: Members) -> Members
	where
		P: Fn() -> ZResult<bool> + 'static
	{
		self.entries.push(Entry::Directive(Directive::When(
			Rc::new(pred),
			Source::Members(members)
		)));
		self
	}

	///Like [`when`](#method.when), but the members are produced by a closure on demand.
	pub fn when_lazy<P, F>(mut self, pred: P, f: F) -> Members
	where
		P: Fn() -> ZResult<bool> + 'static,
		F: Fn() -> ZResult<Members> + 'static
	{
		self.entries.push(Entry::Directive(Directive::When(
			Rc::new(pred),
			Source::Lazy(Rc::new(f))
		)));
		self
	}

	/**
	Adds the `=expr` directive.

	When the directive is expanded, `key` is evaluated and its display string is used to pick
	a case from `selector`. If no case matches, the `"*"` case is used; if there's no `"*"`
	case either, the directive is discarded.
	*/
	pub fn select<K>(mut self, key: K, selector: Selector) -> Members
	where
		K: Fn() -> ZResult<Val> + 'static
	{
		self.entries.push(Entry::Directive(Directive::Select(Rc::new(key), selector.cases)));
		self
	}

	///Appends every entry of `other`.
	pub fn extend(mut self, other: Members) -> Members {
		self.entries.extend(other.entries);
		self
	}

	//splits the members into plain members and directives, preserving the order of each
	pub(crate) fn into_parts(self) -> (Vec<MemberEntry>, Vec<Directive>) {
		let mut plain = Vec::with_capacity(self.entries.len());
		let mut directives = Vec::new();

		for entry in self.entries {
			match entry {
				Entry::Member(member) => plain.push(member),
				Entry::Directive(directive) => directives.push(directive)
			}
		}

		(plain, directives)
	}
}


//-------------------------------------------------------------------------------------------------
// Selector
//-------------------------------------------------------------------------------------------------

///The table of cases for a [`Members::select`](struct.Members.html#method.select) directive.
#[derive(Clone, Default)]
pub struct Selector {
	cases: Vec<(Rc<str>, Source)>
}

impl Selector {
	pub fn new() -> Selector {
		Selector {
			cases: Vec::new()
		}
	}

	pub fn case(mut self, key: &str, members: Members) -> Selector {
		self.cases.push((Rc::from(key), Source::Members(members)));
		self
	}

	pub fn case_lazy<F>(mut self, key: &str, f: F) -> Selector
	where
		F: Fn() -> ZResult<Members> + 'static
	{
		self.cases.push((Rc::from(key), Source::Lazy(Rc::new(f))));
		self
	}

	///Adds the `"*"` case, which is chosen when no other case matches.
	pub fn fallback(self, members: Members) -> Selector {
		self.case("*", members)
	}
}
