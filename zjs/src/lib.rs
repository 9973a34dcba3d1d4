/*!
A class, mixin and namespace object system for dynamically-typed values.

ZJS organizes values into a tree of dotted-path namespaces. Classes are built from member sets,
may derive from a base class named before it exists, and can be extended at any time with
mixins, whose methods are linked into priority-ordered override chains. Enums and singletons
are built on top.

```ignore
use zjs::prelude::*;

let runtime = Runtime::new();
runtime.run(|| {
	let shape = zjs::class(Members::new().abstract_meth("area"))?;
	let square = zjs::class_from(shape, Members::new()
		.def("area", zjs::func(|call| {
			let side: i32 = call.this_obj()?.get("side")?;
			Ok(Val::Int(side * side))
		})))?;

	zjs::namespace_with("geo", Members::new()
		.def("Shape", shape)
		.def("Square", square))?;

	Ok(())
});
```
*/

pub use zjs_engine::*;

pub use zjs_stdlib::*;

pub mod prelude {
	/*!
	The prelude.

	Functions should still be invoked with their `zjs::` prefix.
	*/

	#[doc(no_inline)]
	pub use crate::{
		bail, ensure, error,

		Arr,
		Base,
		Call, Class,
		EnumEntry, ErrorKind,
		FromVal, Func,
		Members, Meta,
		Namespace,
		Obj,
		Root, Runtime, RuntimeBuilder,
		Selector, Sym,
		ToSym, ToVal,
		Val,
		ZError, ZResult
	};
}
