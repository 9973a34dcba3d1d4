use std::rc::{Rc};
use super::class::{Class, Obj};
use super::code::{Func};
use super::collections::{Arr};
use super::engine::{Sym};
use super::error::{ZResult};
use super::namespace::{Namespace};
use super::root::{Root};
use super::val::{Val};

/*
the ToVal and FromVal traits are user-facing. if the user has or wants a Val, they can invoke
these traits directly with say i32::from_val(&val) or my_i32.to_val(). most of the accessors
in this crate (Obj::get, Class::get_static, Call::arg and so on) are generic over one trait or
the other, so that callers can skip the round-trip through Val.

we want arguments to be autoderefed, so ToVal is blanket-implemented for references.
*/


//-------------------------------------------------------------------------------------------------
// ToVal
//-------------------------------------------------------------------------------------------------

/**
A type which can be converted to a ZJS value.

```ignore
obj.set("count", 10)?;
obj.set("label", "ten")?;
```
*/
pub trait ToVal {
	fn to_val(&self) -> ZResult<Val>;
}

impl<'a, T: ToVal + ?Sized> ToVal for &'a T {
	fn to_val(&self) -> ZResult<Val> {
		(**self).to_val()
	}
}

macro_rules! impl_to_val_infallible {
	($(($type:ty, |$self_:ident| $body:expr)),+) => (
		$(
			impl ToVal for $type {
				#[inline]
				fn to_val(&$self_) -> ZResult<Val> {
					Ok($body)
				}
			}
		)+
	);
}

impl_to_val_infallible!(
	(Val, |self| self.clone()),
	((), |self| Val::Nil),
	(bool, |self| Val::Bool(*self)),
	(i32, |self| Val::Int(*self)),
	(f32, |self| Val::Flo(*self)),
	(str, |self| Val::Str(Rc::from(self))),
	(String, |self| Val::Str(Rc::from(self.as_str()))),
	(Rc<str>, |self| Val::Str(Rc::clone(self))),
	(Sym, |self| Val::Sym(*self)),
	(Class, |self| Val::Class(*self)),
	(Namespace, |self| Val::Ns(*self)),
	(Root<Arr>, |self| Val::Arr(self.clone())),
	(Root<Func>, |self| Val::Fn(self.clone())),
	(Root<Obj>, |self| Val::Obj(self.clone()))
);

impl<T: ToVal> ToVal for Option<T> {
	fn to_val(&self) -> ZResult<Val> {
		match *self {
			Some(ref t) => t.to_val(),
			None => Ok(Val::Nil)
		}
	}
}

impl<T: ToVal> ToVal for Vec<T> {
	fn to_val(&self) -> ZResult<Val> {
		let mut vals = Vec::with_capacity(self.len());
		for item in self {
			vals.push(item.to_val()?);
		}

		Ok(Val::Arr(Root::new(Arr::from_vec(vals))))
	}
}

impl<T: ToVal> ToVal for [T] {
	fn to_val(&self) -> ZResult<Val> {
		let mut vals = Vec::with_capacity(self.len());
		for item in self {
			vals.push(item.to_val()?);
		}

		Ok(Val::Arr(Root::new(Arr::from_vec(vals))))
	}
}

macro_rules! impl_from_for_val {
	($($type:ty),+) => (
		$(
			impl From<$type> for Val {
				fn from(src: $type) -> Val {
					//infallible for every type listed here
					match src.to_val() {
						Ok(val) => val,
						Err(_) => unreachable!()
					}
				}
			}
		)+
	);
}

impl_from_for_val!(
	bool, i32, f32, &str, String, Rc<str>, Sym, Class, Namespace,
	Root<Arr>, Root<Func>, Root<Obj>
);


//-------------------------------------------------------------------------------------------------
// FromVal
//-------------------------------------------------------------------------------------------------

/**
A type which can be converted from a ZJS value.

```ignore
let count: i32 = obj.get("count")?;
let label: Rc<str> = obj.get("label")?;
```
*/
pub trait FromVal: Sized {
	fn from_val(val: &Val) -> ZResult<Self>;
}

macro_rules! impl_from_val {
	($(($type:ty, $variant:ident, $a_type_name:literal, |$inner:ident| $body:expr)),+) => (
		$(
			impl FromVal for $type {
				#[inline]
				fn from_val(val: &Val) -> ZResult<$type> {
					match *val {
						Val::$variant(ref $inner) => Ok($body),
						ref val => bail!(WrongType, "expected {}, received {}",
						                 $a_type_name, val.a_type_name())
					}
				}
			}
		)+
	);
}

impl_from_val!(
	(bool, Bool, "a bool", |b| *b),
	(i32, Int, "an int", |i| *i),
	(Rc<str>, Str, "a str", |st| Rc::clone(st)),
	(String, Str, "a str", |st| st.to_string()),
	(Sym, Sym, "a sym", |sym| *sym),
	(Class, Class, "a class", |class| *class),
	(Namespace, Ns, "a ns", |ns| *ns),
	(Root<Arr>, Arr, "an arr", |arr| arr.clone()),
	(Root<Func>, Fn, "a fn", |func| func.clone()),
	(Root<Obj>, Obj, "an obj", |obj| obj.clone())
);

impl FromVal for Val {
	#[inline]
	fn from_val(val: &Val) -> ZResult<Val> {
		Ok(val.clone())
	}
}

impl FromVal for () {
	#[inline]
	fn from_val(_val: &Val) -> ZResult<()> {
		Ok(())
	}
}

impl FromVal for f32 {
	fn from_val(val: &Val) -> ZResult<f32> {
		match *val {
			Val::Flo(f) => Ok(f),
			Val::Int(i) => Ok(i as f32),
			ref val => bail!(WrongType, "expected a num, received {}", val.a_type_name())
		}
	}
}

impl<T: FromVal> FromVal for Option<T> {
	fn from_val(val: &Val) -> ZResult<Option<T>> {
		match *val {
			Val::Nil => Ok(None),
			ref val => Ok(Some(T::from_val(val)?))
		}
	}
}

impl<T: FromVal> FromVal for Vec<T> {
	fn from_val(val: &Val) -> ZResult<Vec<T>> {
		match *val {
			Val::Arr(ref arr) => {
				let mut items = Vec::with_capacity(arr.len());
				for item in arr.to_vec().iter() {
					items.push(T::from_val(item)?);
				}
				Ok(items)
			}
			ref val => bail!(WrongType, "expected an arr, received {}", val.a_type_name())
		}
	}
}
