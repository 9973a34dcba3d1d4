use fnv::{FnvHashMap};
use std::fmt::{self, Debug, Formatter};
use std::rc::{Rc};
use super::class;
use super::code::{Func};
use super::cond;
use super::engine::{with_engine, zjs, Guard, Sym, ToSym};
use super::error::{ZResult};
use super::journal;
use super::members::{MemberEntry, Members, Mode};
use super::meta::{Meta};
use super::val::{Val};

/*
a namespace is a named container in the dotted-path tree. its slots are filled in two phases.

first, every member of a batch is registered: the name is checked for conflicts (honouring the
overriding/overwrite/replace markers) and the value is stored in a Pending slot. nothing is
connected at this point, so a member may refer to a sibling which appears later in the batch.

second, each pending slot is resolved: the value is "connected" to its container, which gives
functions and classes their names, and resolves any textual base class. resolution can also
happen on demand, when a lookup reaches a pending slot; this is how forward references work.
revisiting a slot which is still mid-resolution is a ReferenceCycle.

if anything in a batch fails, every slot touched by the batch is restored.
*/


//-------------------------------------------------------------------------------------------------
// Namespace
//-------------------------------------------------------------------------------------------------

/**
A named container for classes, functions, values and sub-namespaces.

Namespaces live in the active engine's arena; a `Namespace` is a small `Copy` handle to one.
The global namespace has an empty fullname; every other namespace's fullname is its parent's
fullname and its own name, joined with a `.`.
*/

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(pub(crate) u32);

pub(crate) struct NsStorage {
	name: Option<Sym>,
	fullname: Rc<str>,
	parent: Option<Namespace>,
	subs: Vec<Namespace>,
	slots: FnvHashMap<Sym, Slot>,
	order: Vec<Sym>,
	adding: FnvHashMap<Sym, AddState>,
	pub(crate) meta: Option<Meta>
}

#[derive(Clone)]
enum Slot {
	Pending(Val),
	Resolved(Val)
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum AddState {
	Unvisited,
	InProgress
}

pub(crate) fn with_ns<R, F: FnOnce(&NsStorage) -> R>(ns: Namespace, f: F) -> R {
	with_engine(|engine| f(&engine.namespaces.borrow()[ns.0 as usize]))
}

pub(crate) fn with_ns_mut<R, F: FnOnce(&mut NsStorage) -> R>(ns: Namespace, f: F) -> R {
	with_engine(|engine| f(&mut engine.namespaces.borrow_mut()[ns.0 as usize]))
}

fn alloc(name: Option<Sym>, fullname: Rc<str>, parent: Option<Namespace>) -> Namespace {
	let storage = NsStorage {
		name,
		fullname: fullname.clone(),
		parent,
		subs: Vec::new(),
		slots: FnvHashMap::default(),
		order: Vec::new(),
		adding: FnvHashMap::default(),
		meta: Some(Meta {
			name,
			fullname: Some(fullname),
			..Meta::default()
		})
	};

	with_engine(|engine| {
		let mut namespaces = engine.namespaces.borrow_mut();
		namespaces.push(storage);
		Namespace((namespaces.len() - 1) as u32)
	})
}

//the global namespace always occupies the first arena slot
pub(crate) fn alloc_global() -> Namespace {
	alloc(None, Rc::from(""), None)
}

pub(crate) fn join_path(prefix: &str, name: &str) -> Rc<str> {
	if prefix.is_empty() {
		Rc::from(name)
	} else {
		Rc::from(format!("{}.{}", prefix, name))
	}
}

impl Namespace {
	pub fn global() -> Namespace {
		Namespace(0)
	}

	///The namespace's own name, or `None` for the global namespace.
	pub fn name(&self) -> Option<Sym> {
		with_ns(*self, |s| s.name)
	}

	///The dotted path from the global namespace, such as `"app.model"`.
	pub fn full_name(&self) -> Rc<str> {
		with_ns(*self, |s| s.fullname.clone())
	}

	pub fn parent(&self) -> Option<Namespace> {
		with_ns(*self, |s| s.parent)
	}

	///The namespace's direct sub-namespaces, in declaration order.
	pub fn subs(&self) -> Vec<Namespace> {
		with_ns(*self, |s| s.subs.clone())
	}

	///Every name bound in this namespace, in registration order.
	pub fn names(&self) -> Vec<Sym> {
		with_ns(*self, |s| s.order.clone())
	}

	pub fn has<S: ToSym>(&self, name: S) -> ZResult<bool> {
		let sym = name.to_sym()?;
		Ok(with_ns(*self, |s| s.slots.contains_key(&sym)))
	}

	/**
	Ensures that each segment of the dotted path `path` exists as a sub-namespace, and returns
	the innermost one. An empty path returns `self`.

	Fails with `NamespaceConflict` if a segment is already bound to something other than a
	namespace.
	*/
	pub fn namespace(&self, path: &str) -> ZResult<Namespace> {
		let mut ns = *self;
		if path.is_empty() {
			return Ok(ns)
		}

		for segment in path.split('.') {
			let sym = zjs::sym(segment)?;
			ns = match ns.resolve_slot(sym)? {
				Some(Val::Ns(sub)) => sub,
				Some(val) => {
					bail!(NamespaceConflict, "cannot declare the namespace {}: {} is already bound \
					      to {}", join_path(&ns.full_name(), path),
					      join_path(&ns.full_name(), segment), val.a_type_name())
				}
				None => {
					let fullname = join_path(&ns.full_name(), segment);
					let sub = alloc(Some(sym), fullname.clone(), Some(ns));

					with_ns_mut(ns, |s| {
						s.slots.insert(sym, Slot::Resolved(Val::Ns(sub)));
						s.order.push(sym);
						s.subs.push(sub);
					});

					log::debug!(target: "zjs::ns", "declared namespace {}", fullname);
					sub
				}
			};
		}

		Ok(ns)
	}

	///Declares the sub-namespace `path`, then registers `members` in it.
	pub fn namespace_with(&self, path: &str, members: Members) -> ZResult<Namespace> {
		let ns = self.namespace(path)?;
		ns.add(members)?;
		Ok(ns)
	}

	/**
	Registers a batch of members.

	Conditional directives are expanded first. Every plain member is then registered and, once
	the whole batch is registered, resolved. The batch is atomic: if any member fails, the
	namespace is left exactly as it was, and so is every class and function which the batch
	connected.
	*/
	pub fn add(&self, members: Members) -> ZResult<()> {
		let mut saved = Vec::<(Sym, Option<Slot>)>::new();

		journal::begin();
		let result = cond::flatten(members)
			.and_then(|entries| self.register_batch(entries, &mut saved))
			.and_then(|names| {
				for name in names {
					self.resolve_slot(name)?;
				}
				Ok(())
			});

		match result {
			Ok(()) => {
				journal::commit();
				with_ns_mut(*self, |s| {
					for (name, _) in &saved {
						s.adding.remove(name);
					}
				});

				log::trace!(target: "zjs::ns", "added {} members to {}", saved.len(),
				            self.display_name());
				Ok(())
			}
			Err(error) => {
				log::debug!(target: "zjs::ns", "rolling back a batch of {} members in {}",
				            saved.len(), self.display_name());

				journal::undo();
				self.rollback(saved);
				Err(error)
			}
		}
	}

	fn register_batch(
		&self,
		entries: Vec<MemberEntry>,
		saved: &mut Vec<(Sym, Option<Slot>)>
	) -> ZResult<Vec<Sym>> {
		let mut names = Vec::with_capacity(entries.len());

		for entry in entries {
			let name = zjs::sym(&entry.name)?;
			let val = self.prepare(name, entry)?;
			let previous = with_ns(*self, |s| s.slots.get(&name).cloned());

			with_ns_mut(*self, |s| {
				if previous.is_none() {
					s.order.push(name);
				}

				s.slots.insert(name, Slot::Pending(val));
				s.adding.insert(name, AddState::Unvisited);
			});

			saved.push((name, previous));
			names.push(name);
		}

		Ok(names)
	}

	//checks a single entry against the current contents of the namespace, and returns the value
	//which should be stored in its slot
	fn prepare(&self, name: Sym, entry: MemberEntry) -> ZResult<Val> {
		let MemberEntry { name: raw_name, val, mode, is_static } = entry;
		let path = || join_path(&self.full_name(), &raw_name);

		ensure!(!is_static, WrongType, "{}: static members can only be added to a class", path());

		let exists = with_ns(*self, |s| s.slots.contains_key(&name));

		match mode {
			Mode::Plain => {
				ensure!(!exists, NamespaceConflict, "{} is already defined", path());
				Ok(val)
			}
			Mode::Overwrite => Ok(val),
			Mode::Replace => {
				ensure!(exists, CannotReplace, "{} can't be replaced: it isn't defined", path());
				Ok(val)
			}
			Mode::Override => {
				let new_fn = match val {
					Val::Fn(func) => func,
					val => bail!(CannotOverride, "{} can't be overridden by {}", path(),
					             val.a_type_name())
				};

				let old_fn = match self.resolve_slot(name)? {
					Some(Val::Fn(func)) => func,
					Some(val) => bail!(CannotOverride, "{} can't be overridden: it's bound to {}",
					                   path(), val.a_type_name()),
					None => bail!(CannotOverride, "{} can't be overridden: it isn't defined", path())
				};

				let chained = Func::derive(&new_fn);
				chained.set_call_next(Some(old_fn));
				Ok(Val::Fn(chained))
			}
			Mode::Abstract => {
				bail!(WrongType, "{}: abstract members can only be declared in a class", path())
			}
		}
	}

	fn rollback(&self, saved: Vec<(Sym, Option<Slot>)>) {
		with_ns_mut(*self, |s| {
			for (name, previous) in saved.into_iter().rev() {
				match previous {
					Some(slot) => {
						s.slots.insert(name, slot);
					}
					None => {
						s.slots.remove(&name);
						s.order.retain(|n| *n != name);
					}
				}

				s.adding.remove(&name);
			}
		})
	}

	//resolves the slot `name` in this namespace only, without consulting the parent
	pub(crate) fn resolve_slot(&self, name: Sym) -> ZResult<Option<Val>> {
		let (slot, state) = with_ns(*self, |s| {
			(s.slots.get(&name).cloned(), s.adding.get(&name).copied())
		});

		let val = match slot {
			None => return Ok(None),
			Some(Slot::Resolved(val)) => return Ok(Some(val)),
			Some(Slot::Pending(val)) => val
		};

		let fullname = join_path(&self.full_name(), &name.name());

		if state == Some(AddState::InProgress) {
			let trail = with_engine(|engine| {
				let resolving = engine.resolving.borrow();
				let start = resolving.iter().position(|n| **n == *fullname).unwrap_or(0);
				let mut trail: Vec<&str> = resolving[start..].iter().map(|n| &**n).collect();
				trail.push(&fullname);

				trail.join(" -> ")
			});

			bail!(ReferenceCycle, "reference cycle detected: {}", trail)
		}

		with_ns_mut(*self, |s| s.adding.insert(name, AddState::InProgress));
		with_engine(|engine| engine.resolving.borrow_mut().push(fullname.clone()));
		let _guard = Guard::new(|| {
			with_engine(|engine| engine.resolving.borrow_mut().pop());
		});

		match connect(&val, *self, name, &fullname) {
			Ok(()) => {
				with_ns_mut(*self, |s| {
					s.slots.insert(name, Slot::Resolved(val.clone()));
					s.adding.remove(&name);
				});

				log::trace!(target: "zjs::ns", "resolved {}", fullname);
				Ok(Some(val))
			}
			Err(mut error) => {
				with_ns_mut(*self, |s| s.adding.insert(name, AddState::Unvisited));

				if zjs::errors_verbose() {
					error.push_context(format!("while resolving {}", fullname));
				}

				Err(error)
			}
		}
	}

	/**
	Returns the value bound to `name`, consulting the parent namespace (once) if this
	namespace has no such binding. A pending forward reference is resolved on the way.
	*/
	pub fn get<S: ToSym>(&self, name: S) -> ZResult<Option<Val>> {
		let sym = name.to_sym()?;
		if let Some(val) = self.resolve_slot(sym)? {
			return Ok(Some(val))
		}

		match self.parent() {
			Some(parent) => parent.resolve_slot(sym),
			None => Ok(None)
		}
	}

	/**
	Resolves a dotted path relative to this namespace.

	The first segment is looked up with [`get`](#method.get). Each later segment descends into
	a sub-namespace, a class's statics (including inherited statics) or an object's fields.
	An empty path returns the namespace itself.
	*/
	pub fn lookup_opt(&self, path: &str) -> ZResult<Option<Val>> {
		if path.is_empty() {
			return Ok(Some(Val::Ns(*self)))
		}

		let mut segments = path.split('.');
		let first = match segments.next() {
			Some(first) => first,
			None => return Ok(Some(Val::Ns(*self)))
		};

		let mut val = match self.get(first)? {
			Some(val) => val,
			None => return Ok(None)
		};

		for segment in segments {
			let sym = zjs::sym(segment)?;
			let next = match val {
				Val::Ns(ns) => ns.resolve_slot(sym)?,
				Val::Class(class) => class.static_lookup(sym),
				Val::Obj(ref obj) => obj.field(sym),
				_ => None
			};

			val = match next {
				Some(next) => next,
				None => return Ok(None)
			};
		}

		Ok(Some(val))
	}

	///Like [`lookup_opt`](#method.lookup_opt), but fails with `UnknownName` if the path is unbound.
	pub fn lookup(&self, path: &str) -> ZResult<Val> {
		match self.lookup_opt(path)? {
			Some(val) => Ok(val),
			None => bail!(UnknownName, "{} is not bound in {}", path, self.display_name())
		}
	}

	fn display_name(&self) -> String {
		let fullname = self.full_name();
		if fullname.is_empty() {
			"the global namespace".to_string()
		} else {
			format!("the namespace {}", fullname)
		}
	}
}

//gives a freshly-registered value its name, and performs any deferred work which depends on
//its container (resolving a class's textual base, connecting nested classes)
fn connect(val: &Val, ns: Namespace, name: Sym, fullname: &Rc<str>) -> ZResult<()> {
	match *val {
		Val::Fn(ref func) => {
			func.with_meta_mut(|meta| {
				meta.name = Some(name);
				meta.fullname = Some(fullname.clone());
				meta.namespace = Some(ns);
			});
		}
		Val::Class(class) => class::connect(class, ns, name, fullname)?,
		Val::Obj(_) => {
			let meta = Meta {
				name: Some(name),
				fullname: Some(fullname.clone()),
				namespace: Some(ns),
				..Meta::default()
			};

			zjs::add_meta(val, meta);
		}
		_ => ()
	}

	Ok(())
}

impl Debug for Namespace {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Namespace({})", self.full_name())
	}
}

#[cfg(test)]
mod tests {
	use crate::engine::{zjs, Engine};
	use crate::error::{ErrorKind};
	use super::*;

	fn constant(val: i32) -> Val {
		Val::Int(val)
	}

	#[test]
	fn namespaces_are_idempotent() {
		Engine::new().run(|| {
			let a = zjs::namespace("a.b.c")?;
			let b = zjs::namespace("a.b.c")?;
			assert_eq!(a, b);
			assert_eq!(&*a.full_name(), "a.b.c");

			let ab = zjs::namespace("a.b")?;
			assert_eq!(a.parent(), Some(ab));
			assert_eq!(ab.subs(), vec![a]);
			assert_eq!(ab.namespace("c")?, a);
			assert_eq!(ab.namespace("")?, ab);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn conflicts_and_markers() {
		Engine::new().run(|| {
			let ns = zjs::namespace_with("m", Members::new().def("x", constant(1)))?;

			let err = ns.add(Members::new().def("x", constant(2))).unwrap_err();
			assert!(err.is(ErrorKind::NamespaceConflict));

			ns.add(Members::new().overwrite("x", constant(3)))?;
			assert_eq!(ns.lookup("x")?, Val::Int(3));

			let err = ns.add(Members::new().replace("y", constant(4))).unwrap_err();
			assert!(err.is(ErrorKind::CannotReplace));

			ns.add(Members::new().replace("x", constant(5)))?;
			assert_eq!(ns.lookup("x")?, Val::Int(5));

			let err = ns.add(Members::new().overriding("x", zjs::func(|_| Ok(Val::Nil))))
				.unwrap_err();
			assert!(err.is(ErrorKind::CannotOverride));

			let err = zjs::namespace("m.x").unwrap_err();
			assert!(err.is(ErrorKind::NamespaceConflict));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn overriding_functions_chain_to_the_original() {
		Engine::new().run(|| {
			let ns = zjs::namespace_with("f", Members::new()
				.def("greet", zjs::func(|_| Ok(Val::from("hello")))))?;

			ns.add(Members::new().overriding("greet", zjs::func(|call| {
				let inner = call.base()?;
				Ok(Val::from(format!("{}, world", inner)))
			})))?;

			let greet = ns.lookup("greet")?.unwrap_fn();
			assert_eq!(greet.call_fn(&[])?.to_string(), "hello, world");
			assert_eq!(greet.full_name().as_deref(), Some("f.greet"));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn failed_batches_are_rolled_back() {
		Engine::new().run(|| {
			let ns = zjs::namespace_with("r", Members::new().def("a", constant(1)))?;

			let err = ns.add(Members::new()
				.def("b", constant(2))
				.overwrite("a", constant(10))
				.def("a", constant(3)))
				.unwrap_err();
			assert!(err.is(ErrorKind::NamespaceConflict));

			assert_eq!(ns.lookup("a")?, Val::Int(1));
			assert!(ns.lookup_opt("b")?.is_none());
			assert_eq!(ns.names(), vec![zjs::sym("a")?]);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn lookups_walk_to_the_parent_once() {
		Engine::new().run(|| {
			zjs::namespace_with("p", Members::new().def("shared", constant(7)))?;
			let child = zjs::namespace("p.q")?;
			let grandchild = zjs::namespace("p.q.r")?;

			assert_eq!(child.get("shared")?, Some(Val::Int(7)));
			assert_eq!(grandchild.get("shared")?, None);

			let err = zjs::lookup("p.missing").unwrap_err();
			assert!(err.is(ErrorKind::UnknownName));
			Ok(())
		}).unwrap();
	}
}
