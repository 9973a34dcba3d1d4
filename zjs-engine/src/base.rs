use super::code::{Func};
use super::engine::{zjs};
use super::root::{Root};
use super::val::{Val};

/**
Finds the super method of `callee`.

In order of precedence:

1. the next entry in `callee`'s own override chain;
2. for a method mixed into a single object, the object's class's version (looking in statics
   or the prototype chain, as appropriate);
3. for a static method, the nearest base class's static of the same name;
4. for an instance method, the nearest base class's instance method of the same name;
5. otherwise, the no-op function [`zjs::none`](fn.none.html).

A found member which isn't a function is ignored, so the result is always callable.
*/
pub(crate) fn resolve_super(callee: &Root<Func>) -> Root<Func> {
	let meta = callee.meta();

	if let Some(next) = meta.call_next.clone() {
		return next
	}

	let (class, name) = match (meta.class, meta.name) {
		(Some(class), Some(name)) => (class, name),
		_ => return zjs::none()
	};

	let found = if meta.on_instance() {
		if meta.is_static() {
			class.static_lookup(name)
		} else {
			class.proto_lookup(name)
		}
	} else {
		match class.base() {
			Some(base) if meta.is_static() => base.static_lookup(name),
			Some(base) => base.proto_lookup(name),
			None => None
		}
	};

	match found {
		Some(Val::Fn(func)) => func,
		_ => zjs::none()
	}
}
