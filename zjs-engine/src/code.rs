use smallvec::{SmallVec};
use std::fmt::{self, Debug, Formatter};
use std::cell::{RefCell};
use std::rc::{Rc};
use super::base;
use super::class::{Class, Obj};
use super::engine::{Sym};
use super::error::{ZResult};
use super::journal;
use super::meta::{Meta};
use super::root::{Root};
use super::val::{Val};
use super::wrap::{FromVal};


//-------------------------------------------------------------------------------------------------
// Func
//-------------------------------------------------------------------------------------------------

/**
The `fn` primitive type: a callable value.

Functions are always stored behind a [`Root`](struct.Root.html), and they're compared by
identity. They're created by [`zjs::func`](fn.func.html), which wraps a Rust closure, or by
the adapters [`zjs::bind`](fn.bind.html), [`zjs::head`](fn.head.html) and
[`zjs::tail`](fn.tail.html).
*/

pub struct Func {
	body: Body,
	pub(crate) meta: RefCell<Option<Meta>>
}

type RustFn = Rc<dyn Fn(&Call) -> ZResult<Val>>;

#[derive(Clone)]
enum Body {
	Rust(RustFn),
	Bound(Root<Func>, Val),
	Head(Root<Func>, Rc<[Val]>),
	Tail(Root<Func>, Rc<[Val]>),
	None
}

impl Func {
	pub(crate) fn new<F>(f: F) -> Root<Func>
	where
		F: Fn(&Call) -> ZResult<Val> + 'static
	{
		Root::new(Func {
			body: Body::Rust(Rc::new(f)),
			meta: RefCell::new(None)
		})
	}

	pub(crate) fn none() -> Root<Func> {
		Root::new(Func {
			body: Body::None,
			meta: RefCell::new(None)
		})
	}

	//a fresh function with the same body and a copy of the original's metadata. each install
	//of a method into a class produces one of these, so that chain links are never shared.
	pub(crate) fn derive(src: &Root<Func>) -> Root<Func> {
		Root::new(Func {
			body: src.body.clone(),
			meta: RefCell::new(src.meta.borrow().clone())
		})
	}

	///Returns a copy of this function's metadata, or an empty record.
	pub fn meta(&self) -> Meta {
		self.meta.borrow().clone().unwrap_or_default()
	}

	pub fn name(&self) -> Option<Sym> {
		self.meta.borrow().as_ref().and_then(|meta| meta.name)
	}

	pub fn full_name(&self) -> Option<Rc<str>> {
		self.meta.borrow().as_ref().and_then(|meta| meta.fullname.clone())
	}

	pub fn priority(&self) -> i32 {
		self.meta.borrow().as_ref().map(|meta| meta.priority()).unwrap_or(0)
	}

	///The next entry in this function's override chain, if any.
	pub fn call_next(&self) -> Option<Root<Func>> {
		self.meta.borrow().as_ref().and_then(|meta| meta.call_next.clone())
	}

	///Returns `true` for the no-op function returned by [`zjs::none`](fn.none.html).
	pub fn is_none(&self) -> bool {
		matches!(self.body, Body::None)
	}
}

impl Root<Func> {
	pub(crate) fn with_meta_mut<R, F: FnOnce(&mut Meta) -> R>(&self, f: F) -> R {
		journal::record_func(self);
		f(self.meta.borrow_mut().get_or_insert_with(Meta::default))
	}

	pub(crate) fn set_call_next(&self, next: Option<Root<Func>>) {
		self.with_meta_mut(|meta| meta.call_next = next)
	}

	///Invokes the function with `receiver` as `this`.
	pub fn call(&self, receiver: &Val, args: &[Val]) -> ZResult<Val> {
		match self.body {
			Body::Rust(ref f) => {
				let call = Call {
					callee: self,
					receiver: receiver.clone(),
					args
				};

				f(&call)
			}
			Body::Bound(ref target, ref binding) => target.call(binding, args),
			Body::Head(ref target, ref head) => {
				let mut all = SmallVec::<[Val; 8]>::new();
				all.extend(head.iter().cloned());
				all.extend(args.iter().cloned());
				target.call(receiver, &all)
			}
			Body::Tail(ref target, ref tail) => {
				let mut all = SmallVec::<[Val; 8]>::new();
				all.extend(args.iter().cloned());
				all.extend(tail.iter().cloned());
				target.call(receiver, &all)
			}
			Body::None => Ok(Val::Nil)
		}
	}

	///Invokes the function with `nil` as `this`.
	pub fn call_fn(&self, args: &[Val]) -> ZResult<Val> {
		self.call(&Val::Nil, args)
	}
}

impl Debug for Func {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self.full_name() {
			Some(name) => write!(f, "Func({})", name),
			None => f.write_str("Func(anonymous)")
		}
	}
}


//-------------------------------------------------------------------------------------------------
// adapters
//-------------------------------------------------------------------------------------------------

fn adapter(target: &Root<Func>, body: Body, binding: Option<Val>) -> Root<Func> {
	let meta = Meta {
		name: target.name(),
		target: Some(target.clone()),
		binding,
		..Meta::default()
	};

	Root::new(Func {
		body,
		meta: RefCell::new(Some(meta))
	})
}

pub(crate) fn bind(target: &Root<Func>, receiver: Val) -> Root<Func> {
	adapter(target, Body::Bound(target.clone(), receiver.clone()), Some(receiver))
}

pub(crate) fn head(target: &Root<Func>, args: &[Val]) -> Root<Func> {
	adapter(target, Body::Head(target.clone(), Rc::from(args)), None)
}

pub(crate) fn tail(target: &Root<Func>, args: &[Val]) -> Root<Func> {
	adapter(target, Body::Tail(target.clone(), Rc::from(args)), None)
}


//-------------------------------------------------------------------------------------------------
// Call
//-------------------------------------------------------------------------------------------------

/**
The context of a function invocation, passed to every Rust closure wrapped by
[`zjs::func`](fn.func.html).

Besides the receiver and arguments, a `Call` identifies the function which is executing,
which is what [`zjs::super_fn`](fn.super_fn.html) and [`Call::base`](#method.base) use to find
the super method.
*/

pub struct Call<'a> {
	callee: &'a Root<Func>,
	receiver: Val,
	args: &'a [Val]
}

impl<'a> Call<'a> {
	///The function which is currently executing.
	pub fn callee(&self) -> &Root<Func> {
		self.callee
	}

	///The receiver, `this`.
	pub fn this(&self) -> &Val {
		&self.receiver
	}

	pub fn this_obj(&self) -> ZResult<Root<Obj>> {
		match self.receiver {
			Val::Obj(ref obj) => Ok(obj.clone()),
			ref val => bail!(WrongType, "expected this to be an obj, received {}", val.a_type_name())
		}
	}

	pub fn this_class(&self) -> ZResult<Class> {
		match self.receiver {
			Val::Class(class) => Ok(class),
			ref val => bail!(WrongType, "expected this to be a class, received {}", val.a_type_name())
		}
	}

	pub fn args(&self) -> &[Val] {
		self.args
	}

	pub fn arg_count(&self) -> usize {
		self.args.len()
	}

	///Converts the argument at `index`. A missing argument is treated as `nil`.
	pub fn arg<T: FromVal>(&self, index: usize) -> ZResult<T> {
		match self.args.get(index) {
			Some(val) => T::from_val(val),
			None => T::from_val(&Val::Nil)
		}
	}

	///Invokes the super method on `this`, passing along this call's arguments.
	pub fn base(&self) -> ZResult<Val> {
		base::resolve_super(self.callee).call(&self.receiver, self.args)
	}

	///Invokes the super method on `this` with an explicit argument list.
	pub fn base_with(&self, args: &[Val]) -> ZResult<Val> {
		base::resolve_super(self.callee).call(&self.receiver, args)
	}
}
