use std::rc::{Rc};
use super::class::{self, Class};
use super::code::{Func};
use super::engine::{Sym};
use super::journal;
use super::namespace::{self, Namespace};
use super::root::{Root};
use super::val::{Val};

/*
metadata records are attached lazily to the four kinds of value which can carry them. functions
and objects hold their record in a RefCell<Option<Meta>> field; classes and namespaces hold it
in their arena storage. nothing else can carry metadata.

a record is always handed out by value. mutation goes through add_meta, which merges every
Some field of a partial record into the stored one.
*/

/**
The metadata record attached to a function, object, class or namespace.

Every field is optional. Fields which this crate populates:

- `name`, `fullname` and `namespace` are set when the value is registered in a namespace
  (or, for methods, when they're installed into a class).
- `class`, `is_static`, `on_instance`, `tag` and `call_next` are set on each entry of a
  method's override chain.
- `super_class` is set on classes.
- `target` and `binding` are set on the functions returned by `zjs::bind`, `zjs::head`
  and `zjs::tail`.
- `priority` is set by `zjs::priority`.
*/

#[derive(Clone, Default)]
pub struct Meta {
	pub name: Option<Sym>,
	pub fullname: Option<Rc<str>>,
	pub namespace: Option<Namespace>,
	pub class: Option<Class>,
	pub is_static: Option<bool>,
	pub on_instance: Option<bool>,
	pub priority: Option<i32>,
	pub call_next: Option<Root<Func>>,
	pub super_class: Option<Class>,
	pub target: Option<Root<Func>>,
	pub binding: Option<Val>,
	pub tag: Option<Rc<str>>
}

impl Meta {
	///The chain priority, defaulting to `0`.
	pub fn priority(&self) -> i32 {
		self.priority.unwrap_or(0)
	}

	pub fn is_static(&self) -> bool {
		self.is_static.unwrap_or(false)
	}

	pub fn on_instance(&self) -> bool {
		self.on_instance.unwrap_or(false)
	}

	pub(crate) fn merge(&mut self, partial: Meta) {
		macro_rules! merge_fields {
			($($field:ident),+) => (
				$(
					if partial.$field.is_some() {
						self.$field = partial.$field;
					}
				)+
			);
		}

		merge_fields!(
			name, fullname, namespace, class, is_static, on_instance, priority,
			call_next, super_class, target, binding, tag
		);
	}
}

fn access(slot: &mut Option<Meta>, no_create: bool) -> Option<Meta> {
	if slot.is_none() && !no_create {
		*slot = Some(Meta::default());
	}

	slot.clone()
}

pub(crate) fn get_meta(val: &Val, no_create: bool) -> Option<Meta> {
	match *val {
		Val::Fn(ref func) => access(&mut func.meta.borrow_mut(), no_create),
		Val::Obj(ref obj) => access(&mut obj.meta.borrow_mut(), no_create),
		Val::Class(class) => class::with_class_mut(class, |storage| {
			access(&mut storage.meta, no_create)
		}),
		Val::Ns(ns) => namespace::with_ns_mut(ns, |storage| {
			access(&mut storage.meta, no_create)
		}),
		_ => None
	}
}

pub(crate) fn add_meta(val: &Val, partial: Meta) -> Val {
	fn merge_into(slot: &mut Option<Meta>, partial: Meta) {
		slot.get_or_insert_with(Meta::default).merge(partial)
	}

	match *val {
		Val::Fn(ref func) => {
			journal::record_func(func);
			merge_into(&mut func.meta.borrow_mut(), partial)
		}
		Val::Obj(ref obj) => {
			journal::record_obj(obj);
			merge_into(&mut obj.meta.borrow_mut(), partial)
		}
		Val::Class(class) => class::with_class_mut(class, |storage| {
			merge_into(&mut storage.meta, partial)
		}),
		Val::Ns(ns) => namespace::with_ns_mut(ns, |storage| {
			merge_into(&mut storage.meta, partial)
		}),
		_ => ()
	}

	val.clone()
}
