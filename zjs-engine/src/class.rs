use fnv::{FnvHashMap};
use smallvec::{SmallVec};
use std::cell::{RefCell};
use std::fmt::{self, Debug, Formatter};
use std::rc::{Rc};
use super::engine::{with_engine, zjs, Sym, ToSym};
use super::error::{ZResult};
use super::journal;
use super::members::{Members};
use super::meta::{Meta};
use super::mixin::{self, Target};
use super::namespace::{self, Namespace};
use super::root::{Root};
use super::val::{Val};
use super::wrap::{FromVal, ToVal};

/*
classes live in the engine's arena, and a Class is a Copy handle into it. each class has a
prototype map (instance members), a statics map, an optional base class and the abstract names
which it declares. whether an abstract name is still unimplemented depends on the whole base
chain, so it's worked out whenever it's needed.

a class whose base was given as a name can't be finished until it's registered in a namespace,
because the name is resolved relative to that namespace. until then, its members (and any
mixins applied to it) are held in `pending`.

members are never written directly into a class's maps. everything goes through the mixin
engine, so that function members always become properly-linked chain entries.
*/


//-------------------------------------------------------------------------------------------------
// Base
//-------------------------------------------------------------------------------------------------

///The base of a class under construction. See [`zjs::class_from`](fn.class_from.html).
#[derive(Clone, Debug)]
pub enum Base {
	///The root class, `zjs.Object`.
	Default,

	///No base class at all.
	None,

	Class(Class),

	///A dotted path, resolved in the namespace where the class is registered.
	Named(Rc<str>)
}

impl From<Class> for Base {
	fn from(class: Class) -> Base {
		Base::Class(class)
	}
}

impl<'a> From<&'a str> for Base {
	fn from(name: &'a str) -> Base {
		Base::Named(Rc::from(name))
	}
}

impl From<Option<Class>> for Base {
	fn from(class: Option<Class>) -> Base {
		match class {
			Some(class) => Base::Class(class),
			None => Base::None
		}
	}
}


//-------------------------------------------------------------------------------------------------
// ClassStorage
//-------------------------------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct ClassStorage {
	pub(crate) meta: Option<Meta>,
	pub(crate) base: Option<Class>,
	pub(crate) proto: FnvHashMap<Sym, Val>,
	pub(crate) statics: FnvHashMap<Sym, Val>,
	pub(crate) abstracts: SmallVec<[Sym; 4]>,
	pending: Option<Pending>
}

#[derive(Clone)]
struct Pending {
	base_name: Rc<str>,
	members: Members,
	mixins: Vec<(Rc<str>, Members)>
}

pub(crate) fn with_class<R, F: FnOnce(&ClassStorage) -> R>(class: Class, f: F) -> R {
	with_engine(|engine| f(&engine.classes.borrow()[class.0 as usize]))
}

pub(crate) fn with_class_mut<R, F: FnOnce(&mut ClassStorage) -> R>(class: Class, f: F) -> R {
	with_engine(|engine| {
		let mut classes = engine.classes.borrow_mut();
		let storage = &mut classes[class.0 as usize];
		journal::record_class(engine, class, storage);
		f(storage)
	})
}

fn alloc() -> Class {
	let storage = ClassStorage {
		meta: None,
		base: None,
		proto: FnvHashMap::default(),
		statics: FnvHashMap::default(),
		abstracts: SmallVec::new(),
		pending: None
	};

	with_engine(|engine| {
		let mut classes = engine.classes.borrow_mut();
		classes.push(storage);
		Class((classes.len() - 1) as u32)
	})
}

pub(crate) fn build_class(base: Base, members: Members) -> ZResult<Class> {
	let base = match base {
		Base::Default => Some(zjs::root_class()),
		Base::None => None,
		Base::Class(base) => {
			ensure!(base.is_finished(), Unfinished, "{} can't be used as a base class: it has \
			        not been finished", base.display_name());
			Some(base)
		}
		Base::Named(base_name) => {
			let class = alloc();
			with_class_mut(class, |s| {
				s.pending = Some(Pending {
					base_name,
					members,
					mixins: Vec::new()
				});
			});

			return Ok(class)
		}
	};

	let class = alloc();
	finish(class, base, members)?;
	Ok(class)
}

fn finish(class: Class, base: Option<Class>, members: Members) -> ZResult<()> {
	with_class_mut(class, |s| {
		s.base = base;
		s.meta.get_or_insert_with(Meta::default).super_class = base;
	});

	mixin::apply(&Target::Class(class), None, members)
}

pub(crate) fn alloc_root_class() -> ZResult<Class> {
	let to_string = zjs::func(|call| {
		let class_name = match *call.this() {
			Val::Obj(ref obj) => obj.class().display_name(),
			Val::Class(class) => class.display_name(),
			ref val => Rc::from(val.type_name())
		};

		Ok(Val::from(format!("[object {}]", class_name)))
	});

	build_class(Base::None, Members::new().def("toString", to_string))
}

//invoked when a class is bound to a namespace slot, and that slot is resolved
pub(crate) fn connect(class: Class, ns: Namespace, name: Sym, fullname: &Rc<str>) -> ZResult<()> {
	//a class which is bound to more than one name keeps the first
	let first = with_class_mut(class, |s| {
		let meta = s.meta.get_or_insert_with(Meta::default);
		if meta.fullname.is_none() {
			meta.name = Some(name);
			meta.fullname = Some(fullname.clone());
			meta.namespace = Some(ns);
			true
		} else {
			false
		}
	});

	finish_pending(class, ns)?;

	if first {
		log::debug!(target: "zjs::class", "connected class {}", fullname);

		name_members(class, fullname);
		connect_nested(class, ns, fullname)?;
	}

	Ok(())
}

fn finish_pending(class: Class, ns: Namespace) -> ZResult<()> {
	let base_name = match with_class(class, |s| s.pending.as_ref().map(|p| p.base_name.clone())) {
		Some(base_name) => base_name,
		None => return Ok(())
	};

	let base = match ns.lookup_opt(&base_name)? {
		Some(Val::Class(base)) => base,
		Some(val) => bail!(WrongType, "the base class {} of {} is {}, not a class", base_name,
		                   class.display_name(), val.a_type_name()),
		None => bail!(UnknownName, "the base class {} of {} is not bound", base_name,
		              class.display_name())
	};

	ensure!(base.is_finished(), Unfinished, "the base class {} of {} has not been finished",
	        base_name, class.display_name());

	let pending = match with_class_mut(class, |s| s.pending.take()) {
		Some(pending) => pending,
		None => return Ok(())
	};

	finish(class, Some(base), pending.members)?;
	for (tag, members) in pending.mixins {
		mixin::apply(&Target::Class(class), Some(tag), members)?;
	}

	Ok(())
}

//gives a fullname to every member function which was installed before the class was named
fn name_members(class: Class, fullname: &str) {
	let members: Vec<(Sym, Val)> = with_class(class, |s| {
		s.proto.iter().chain(s.statics.iter()).map(|(k, v)| (*k, v.clone())).collect()
	});

	for (name, val) in members {
		if let Val::Fn(head) = val {
			let member_fullname = namespace::join_path(fullname, &name.name());

			let mut link = Some(head);
			while let Some(func) = link {
				let ours = func.with_meta_mut(|meta| {
					if meta.class == Some(class) && meta.fullname.is_none() {
						meta.fullname = Some(member_fullname.clone());
					}
					meta.class == Some(class)
				});

				link = if ours { func.call_next() } else { None };
			}
		}
	}
}

//nested classes (classes stored as statics) are named after their enclosing class
fn connect_nested(class: Class, ns: Namespace, fullname: &str) -> ZResult<()> {
	let nested: Vec<(Sym, Class)> = with_class(class, |s| {
		s.statics.iter().filter_map(|(k, v)| match *v {
			Val::Class(nested) => Some((*k, nested)),
			_ => None
		}).collect()
	});

	for (name, nested) in nested {
		let nested_fullname = namespace::join_path(fullname, &name.name());
		connect(nested, ns, name, &nested_fullname)?;
	}

	Ok(())
}


//-------------------------------------------------------------------------------------------------
// Class
//-------------------------------------------------------------------------------------------------

/**
The `class` primitive type.

Classes are created by [`zjs::class`](fn.class.html) or [`zjs::class_from`](fn.class_from.html),
and they live in the active engine's arena; a `Class` is a small `Copy` handle to one. A class
acquires its name when it's registered in a namespace.

Call [`construct`](#method.construct) to create an instance.
*/

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Class(pub(crate) u32);

impl Class {
	pub fn name(&self) -> Option<Sym> {
		with_class(*self, |s| s.meta.as_ref().and_then(|meta| meta.name))
	}

	pub fn full_name(&self) -> Option<Rc<str>> {
		with_class(*self, |s| s.meta.as_ref().and_then(|meta| meta.fullname.clone()))
	}

	///The class's fullname, or `"(anonymous)"` if it has never been registered.
	pub fn display_name(&self) -> Rc<str> {
		self.full_name().unwrap_or_else(|| Rc::from("(anonymous)"))
	}

	pub fn base(&self) -> Option<Class> {
		with_class(*self, |s| s.base)
	}

	/**
	Returns `false` for a class whose textual base hasn't been resolved yet; that is, a class
	which was built with a `&str` base but hasn't been registered in a namespace.
	*/
	pub fn is_finished(&self) -> bool {
		with_class(*self, |s| s.pending.is_none())
	}

	///Returns `true` if `self` is `ancestor`, or derives from it directly or indirectly.
	pub fn is_subclass_of(&self, ancestor: Class) -> bool {
		let mut cur = Some(*self);
		while let Some(class) = cur {
			if class == ancestor {
				return true
			}

			cur = class.base();
		}

		false
	}

	///Returns `true` if the class has at least one unimplemented abstract member.
	pub fn is_abstract(&self) -> bool {
		!self.abstract_members().is_empty()
	}

	/**
	The names of the class's unimplemented abstract members, including those declared by its
	base classes.

	This is computed on demand, so a member which is later mixed into a base class counts as
	implemented for every existing subclass.
	*/
	pub fn abstract_members(&self) -> Vec<Sym> {
		let mut declared = SmallVec::<[Sym; 4]>::new();

		let mut cur = Some(*self);
		while let Some(class) = cur {
			cur = with_class(class, |s| {
				for sym in &s.abstracts {
					if !declared.contains(sym) {
						declared.push(*sym);
					}
				}

				s.base
			});
		}

		declared.into_iter().filter(|sym| self.is_unimplemented(*sym)).collect()
	}

	//the nearest class which either defines or declares `name` decides
	fn is_unimplemented(&self, name: Sym) -> bool {
		let mut cur = Some(*self);
		while let Some(class) = cur {
			let (defined, declared, base) = with_class(class, |s| {
				(s.proto.contains_key(&name), s.abstracts.contains(&name), s.base)
			});

			if defined {
				return false
			}

			if declared {
				return true
			}

			cur = base;
		}

		false
	}

	//searches the prototype chain, starting with this class
	pub(crate) fn proto_lookup(&self, key: Sym) -> Option<Val> {
		let mut cur = Some(*self);
		while let Some(class) = cur {
			let (found, base) = with_class(class, |s| (s.proto.get(&key).cloned(), s.base));
			if found.is_some() {
				return found
			}

			cur = base;
		}

		None
	}

	//searches the statics of this class and its bases
	pub(crate) fn static_lookup(&self, key: Sym) -> Option<Val> {
		let mut cur = Some(*self);
		while let Some(class) = cur {
			let (found, base) = with_class(class, |s| (s.statics.get(&key).cloned(), s.base));
			if found.is_some() {
				return found
			}

			cur = base;
		}

		None
	}

	///Returns the instance member `key`, searching the base classes if necessary.
	pub fn get_member<S: ToSym>(&self, key: S) -> ZResult<Option<Val>> {
		Ok(self.proto_lookup(key.to_sym()?))
	}

	pub fn has_static<S: ToSym>(&self, key: S) -> ZResult<bool> {
		Ok(self.static_lookup(key.to_sym()?).is_some())
	}

	///Returns the static member `key`, searching the base classes if necessary.
	pub fn get_static<S: ToSym, T: FromVal>(&self, key: S) -> ZResult<T> {
		let sym = key.to_sym()?;
		match self.static_lookup(sym) {
			Some(val) => T::from_val(&val),
			None => bail!(UnknownName, "{} has no static member {}", self.display_name(), sym)
		}
	}

	///Invokes the static method `key`, with the class as `this`.
	pub fn call<S: ToSym>(&self, key: S, args: &[Val]) -> ZResult<Val> {
		let sym = key.to_sym()?;
		match self.static_lookup(sym) {
			Some(Val::Fn(func)) => func.call(&Val::Class(*self), args),
			Some(val) => bail!(WrongType, "{}.{} is {}, not a fn", self.display_name(), sym,
			                   val.a_type_name()),
			None => bail!(UnknownName, "{} has no static member {}", self.display_name(), sym)
		}
	}

	/**
	Creates an instance of the class, then invokes its `init` method (if any) with `args`.

	Fails with `AbstractInstantiation` if the class has unimplemented abstract members.
	*/
	pub fn construct(&self, args: &[Val]) -> ZResult<Root<Obj>> {
		ensure!(self.is_finished(), Unfinished, "{} can't be constructed: its base class has not \
		        been resolved", self.display_name());

		let abstracts = self.abstract_members();
		if !abstracts.is_empty() {
			let names: Vec<String> = abstracts.iter().map(|sym| sym.name().to_string()).collect();
			bail!(AbstractInstantiation, "cannot instantiate {}: it has unimplemented abstract \
			      members ({})", self.display_name(), names.join(", "))
		}

		let obj = Root::new(Obj {
			class: *self,
			fields: RefCell::new(FnvHashMap::default()),
			meta: RefCell::new(None)
		});

		match self.proto_lookup(zjs::sym("init")?) {
			Some(Val::Fn(init)) => {
				init.call(&Val::Obj(obj.clone()), args)?;
			}
			Some(val) => bail!(WrongType, "{}.init is {}, not a fn", self.display_name(),
			                   val.a_type_name()),
			None => ()
		}

		Ok(obj)
	}

	/**
	Mixes `members` into the class. Function members are linked into the class's existing
	override chains according to their priority.

	If the class is still waiting for its textual base to be resolved, the mixin is queued and
	applied once the class is finished.
	*/
	pub fn mixin(&self, tag: &str, members: Members) -> ZResult<()> {
		let tag = Rc::<str>::from(tag);

		let queued = with_class_mut(*self, |s| {
			match s.pending {
				Some(ref mut pending) => {
					pending.mixins.push((tag.clone(), members.clone()));
					true
				}
				None => false
			}
		});

		if queued {
			log::trace!(target: "zjs::class", "queued the mixin {} for {}", tag,
			            self.display_name());
			Ok(())
		} else {
			log::debug!(target: "zjs::class", "mixing {} into {}", tag, self.display_name());
			mixin::apply(&Target::Class(*self), Some(tag), members)
		}
	}
}

impl Debug for Class {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Class({})", self.display_name())
	}
}


//-------------------------------------------------------------------------------------------------
// Obj
//-------------------------------------------------------------------------------------------------

/**
The `obj` primitive type: an instance of a [`Class`](struct.Class.html).

An object's own fields shadow its class's instance members. Members mixed into an object with
[`mixin`](#method.mixin) are stored as fields.
*/

pub struct Obj {
	class: Class,
	pub(crate) fields: RefCell<FnvHashMap<Sym, Val>>,
	pub(crate) meta: RefCell<Option<Meta>>
}

impl Obj {
	pub fn class(&self) -> Class {
		self.class
	}

	///Returns `true` if the object's class is `class` or one of its subclasses.
	pub fn is(&self, class: Class) -> bool {
		self.class.is_subclass_of(class)
	}

	//an own field, falling back to the class's instance members
	pub(crate) fn field(&self, key: Sym) -> Option<Val> {
		let own = self.fields.borrow().get(&key).cloned();
		own.or_else(|| self.class.proto_lookup(key))
	}

	pub fn has<S: ToSym>(&self, key: S) -> ZResult<bool> {
		Ok(self.field(key.to_sym()?).is_some())
	}

	pub fn get<S: ToSym, T: FromVal>(&self, key: S) -> ZResult<T> {
		let sym = key.to_sym()?;
		match self.field(sym) {
			Some(val) => T::from_val(&val),
			None => bail!(UnknownName, "{} has no member {}", self.class.display_name(), sym)
		}
	}

	pub fn get_if_present<S: ToSym, T: FromVal>(&self, key: S) -> ZResult<Option<T>> {
		match self.field(key.to_sym()?) {
			Some(val) => Ok(Some(T::from_val(&val)?)),
			None => Ok(None)
		}
	}

	///Sets one of the object's own fields.
	pub fn set<S: ToSym, V: ToVal>(&self, key: S, val: V) -> ZResult<()> {
		let sym = key.to_sym()?;
		let val = val.to_val()?;
		self.fields.borrow_mut().insert(sym, val);
		Ok(())
	}
}

impl Root<Obj> {
	///Invokes the method `key`, with the object as `this`.
	pub fn call<S: ToSym>(&self, key: S, args: &[Val]) -> ZResult<Val> {
		let sym = key.to_sym()?;
		match self.field(sym) {
			Some(Val::Fn(func)) => func.call(&Val::Obj(self.clone()), args),
			Some(val) => bail!(WrongType, "{}.{} is {}, not a fn", self.class.display_name(),
			                   sym, val.a_type_name()),
			None => bail!(UnknownName, "{} has no member {}", self.class.display_name(), sym)
		}
	}

	/**
	Mixes `members` into this object alone.

	Both instance and static members are installed on the object itself. Their functions'
	super methods are found in the object's class, rather than its base class.
	*/
	pub fn mixin(&self, tag: &str, members: Members) -> ZResult<()> {
		log::debug!(target: "zjs::class", "mixing {} into an instance of {}", tag,
		            self.class.display_name());
		mixin::apply(&Target::Obj(self.clone()), Some(Rc::from(tag)), members)
	}
}

impl Debug for Obj {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Obj({})", self.class.display_name())
	}
}

#[cfg(test)]
mod tests {
	use crate::engine::{zjs, Engine};
	use crate::error::{ErrorKind};
	use super::*;

	#[test]
	fn classes_are_named_when_registered() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new())?;
			assert_eq!(&*class.display_name(), "(anonymous)");
			assert_eq!(class.base(), Some(zjs::root_class()));

			zjs::namespace_with("shapes", Members::new().def("Shape", class))?;
			assert_eq!(class.full_name().as_deref(), Some("shapes.Shape"));

			let obj = class.construct(&[])?;
			assert_eq!(obj.call("toString", &[])?.to_string(), "[object shapes.Shape]");
			assert!(obj.is(zjs::root_class()));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn textual_bases_resolve_in_the_registering_namespace() {
		Engine::new().run(|| {
			let derived = zjs::class_from("Base", Members::new()
				.def("kind", zjs::func(|_| Ok(Val::from("derived")))))?;
			assert!(!derived.is_finished());
			assert!(derived.construct(&[]).unwrap_err().is(ErrorKind::Unfinished));

			let base = zjs::class(Members::new().stat("origin", 1))?;
			zjs::namespace_with("geo", Members::new()
				.def("Derived", derived)
				.def("Base", base))?;

			assert!(derived.is_finished());
			assert_eq!(derived.base(), Some(base));
			assert_eq!(derived.get_static::<_, i32>("origin")?, 1);
			assert_eq!(zjs::lookup("geo.Derived.origin")?, Val::Int(1));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn abstract_members_block_construction() {
		Engine::new().run(|| {
			let shape = zjs::class(Members::new().abstract_meth("area"))?;
			assert!(shape.is_abstract());
			let err = shape.construct(&[]).unwrap_err();
			assert!(err.is(ErrorKind::AbstractInstantiation));

			let still_abstract = zjs::class_from(shape, Members::new())?;
			assert!(still_abstract.is_abstract());

			let square = zjs::class_from(shape, Members::new()
				.def("area", zjs::func(|_| Ok(Val::Int(4)))))?;
			assert!(!square.is_abstract());
			assert_eq!(square.construct(&[])?.call("area", &[])?, Val::Int(4));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn implementing_a_base_member_later_frees_its_subclasses() {
		Engine::new().run(|| {
			let shape = zjs::class(Members::new().abstract_meth("area"))?;
			let blob = zjs::class_from(shape, Members::new())?;
			assert!(blob.is_abstract());

			shape.mixin("area", Members::new().def("area", zjs::func(|_| Ok(Val::Int(0)))))?;
			assert!(!shape.is_abstract());
			assert!(!blob.is_abstract());
			assert_eq!(blob.construct(&[])?.call("area", &[])?, Val::Int(0));

			//a subclass may declare an inherited member abstract again
			let hole = zjs::class_from(blob, Members::new().abstract_meth("area"))?;
			assert_eq!(hole.abstract_members(), vec![zjs::sym("area")?]);
			assert!(hole.construct(&[]).unwrap_err().is(ErrorKind::AbstractInstantiation));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn init_receives_constructor_arguments() {
		Engine::new().run(|| {
			let point = zjs::class(Members::new()
				.def("init", zjs::func(|call| {
					let obj = call.this_obj()?;
					obj.set("x", call.arg::<i32>(0)?)?;
					obj.set("y", call.arg::<i32>(1)?)?;
					Ok(Val::Nil)
				})))?;

			let obj = point.construct(&[Val::Int(3), Val::Int(4)])?;
			assert_eq!(obj.get::<_, i32>("x")?, 3);
			assert_eq!(obj.get::<_, i32>("y")?, 4);
			assert!(obj.get::<_, i32>("z").unwrap_err().is(ErrorKind::UnknownName));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn nested_classes_take_their_parents_name() {
		Engine::new().run(|| {
			let inner = zjs::class(Members::new())?;
			let outer = zjs::class(Members::new().stat("Inner", inner))?;
			zjs::namespace_with("ui", Members::new().def("Outer", outer))?;

			assert_eq!(inner.full_name().as_deref(), Some("ui.Outer.Inner"));
			assert_eq!(zjs::lookup("ui.Outer.Inner")?, Val::Class(inner));
			Ok(())
		}).unwrap();
	}
}
