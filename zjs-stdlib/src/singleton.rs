use std::{i32};
use std::cell::{Cell, RefCell};
use std::rc::{Rc};
use zjs::{bail, Base, Class, Guard, Members, Obj, Root, Val, ZResult};

pub(crate) fn init() -> ZResult<()> {
	zjs::register_module("zjs.singleton");
	Ok(())
}

/**
Builds a class which has exactly one instance.

The instance is created by the first call to the class's static `getInstance` method, which
passes its arguments along to `init`. Every later call returns the same instance. Attempting
to construct the class in any other way fails with `CannotInstantiateSingleton`.

The base may be anything accepted by [`zjs::class_from`](fn.class_from.html).
*/
pub fn singleton<B: Into<Base>>(base: B, members: Members) -> ZResult<Class> {
	let class = zjs::class_from(base, members)?;

	let permitted = Rc::new(Cell::new(false));
	let instance = Rc::new(RefCell::new(None::<Root<Obj>>));

	let guard_init = {
		let permitted = permitted.clone();
		zjs::func(move |call| {
			if !permitted.get() {
				let name = match call.callee().meta().class {
					Some(class) => class.display_name(),
					None => Rc::from("(singleton)")
				};

				bail!(CannotInstantiateSingleton, "{} is a singleton: call {}.getInstance() \
				      instead of constructing it", name, name)
			}

			zjs::call_super(call, call.this().clone())
		})
	};

	let get_instance = zjs::func(move |call| {
		let existing = instance.borrow().clone();
		if let Some(obj) = existing {
			return Ok(Val::Obj(obj))
		}

		permitted.set(true);
		let obj = {
			let permitted = permitted.clone();
			let _guard = Guard::new(move || permitted.set(false));
			class.construct(call.args())?
		};

		log::debug!(target: "zjs::singleton", "created the instance of {}", class.display_name());

		*instance.borrow_mut() = Some(obj.clone());
		Ok(Val::Obj(obj))
	});

	class.mixin("singleton", Members::new()
		.def("init", zjs::priority(i32::MAX, guard_init)?)
		.stat("getInstance", get_instance))?;

	Ok(class)
}

#[cfg(test)]
mod tests {
	use zjs::{ErrorKind};
	use crate::{Runtime};
	use super::*;

	#[test]
	fn get_instance_is_memoized() {
		Runtime::new().run(|| {
			let config = singleton(Base::Default, Members::new()
				.def("init", zjs::func(|call| {
					call.this_obj()?.set("path", call.arg::<Val>(0)?)?;
					Ok(Val::Nil)
				})))?;

			let first = config.call("getInstance", &[Val::from("a.cfg")])?;
			let second = config.call("getInstance", &[Val::from("b.cfg")])?;
			assert_eq!(first, second);
			assert_eq!(first.unwrap_obj().get::<_, String>("path")?, "a.cfg");
			Ok(())
		}).unwrap();
	}

	#[test]
	fn direct_construction_fails() {
		Runtime::new().run(|| {
			let registry = singleton(Base::Default, Members::new())?;
			zjs::namespace_with("app", Members::new().def("Registry", registry))?;

			let err = registry.construct(&[]).unwrap_err();
			assert!(err.is(ErrorKind::CannotInstantiateSingleton));
			assert!(err.message().contains("app.Registry"));

			//the construction flag is cleared once getInstance returns
			registry.call("getInstance", &[])?;
			assert!(registry.construct(&[]).is_err());
			Ok(())
		}).unwrap();
	}
}
