use std::fmt::{self, Debug, Display, Formatter};
use std::rc::{Rc};
use super::class::{Class, Obj};
use super::code::{Func};
use super::collections::{Arr};
use super::engine::{Sym};
use super::namespace::{Namespace};
use super::root::{Root};


//-------------------------------------------------------------------------------------------------
// Val
//-------------------------------------------------------------------------------------------------

/**
Any ZJS value.

Scalars (`Nil`, `Bool`, `Int`, `Flo`, `Str` and `Sym`) compare by value. Functions, objects
and arrays compare by identity. Classes and namespaces are arena handles, so they compare
equal when they name the same class or container.

Many functions in this crate provide automatic conversions to and from `Val`, using the
[`FromVal`](trait.FromVal.html) and [`ToVal`](trait.ToVal.html) traits.
*/

#[derive(Clone)]
pub enum Val {
	Nil,
	Bool(bool),
	Int(i32),
	Flo(f32),
	Str(Rc<str>),
	Sym(Sym),
	Arr(Root<Arr>),
	Fn(Root<Func>),
	Obj(Root<Obj>),
	Class(Class),
	Ns(Namespace),
}

impl Default for Val {
	fn default() -> Val {
		Val::Nil
	}
}

macro_rules! impl_val {
	($(($variant:ident, $type:ty, $type_name:literal, $a_type_name:literal, $is_type:ident,
	    $unwrap_type:ident)),+) => (
		impl Val {
			///Returns the name of this value's primitive type, such as `"nil"` or `"fn"`.
			pub fn type_name(&self) -> &'static str {
				match *self {
					Val::Nil => "nil",
					$(Val::$variant(_) => $type_name),+
				}
			}

			/**
			Returns the name of this value's primitive type, prefixed with the indefinite article,
			such as `"an arr"` or `"a fn"`.
			*/
			pub fn a_type_name(&self) -> &'static str {
				match *self {
					Val::Nil => "a nil",
					$(Val::$variant(_) => $a_type_name),+
				}
			}
		}

		impl Val {
			$(
				#[inline]
				pub fn $is_type(&self) -> bool {
					match *self {
						Val::$variant(_) => true,
						_ => false
					}
				}

				#[inline]
				pub fn $unwrap_type(self) -> $type {
					match self {
						Val::$variant(inner) => inner,
						_ => panic!("attempted to unwrap {} Val as {}", self.a_type_name(),
						            $a_type_name)
					}
				}
			)+
		}
	);
}

impl_val!(
	(Bool, bool, "bool", "a bool", is_bool, unwrap_bool),
	(Int, i32, "int", "an int", is_int, unwrap_int),
	(Flo, f32, "flo", "a flo", is_flo, unwrap_flo),
	(Str, Rc<str>, "str", "a str", is_str, unwrap_str),
	(Sym, Sym, "sym", "a sym", is_sym, unwrap_sym),
	(Arr, Root<Arr>, "arr", "an arr", is_arr, unwrap_arr),
	(Fn, Root<Func>, "fn", "a fn", is_fn, unwrap_fn),
	(Obj, Root<Obj>, "obj", "an obj", is_obj, unwrap_obj),
	(Class, Class, "class", "a class", is_class, unwrap_class),
	(Ns, Namespace, "ns", "a ns", is_ns, unwrap_ns)
);

impl Val {
	pub fn is_nil(&self) -> bool {
		matches!(*self, Val::Nil)
	}

	///Returns `true` if the value is anything other than `Nil` or `Bool(false)`.
	pub fn is_truthy(&self) -> bool {
		!self.is_falsy()
	}

	///Returns `true` if the value is `Nil` or `Bool(false)`.
	pub fn is_falsy(&self) -> bool {
		matches!(*self, Val::Nil | Val::Bool(false))
	}

	/**
	Returns `true` if this value can carry metadata: a function, object, class or namespace.

	See [`zjs::get_meta`](fn.get_meta.html).
	*/
	pub fn is_meta_carrier(&self) -> bool {
		matches!(*self, Val::Fn(_) | Val::Obj(_) | Val::Class(_) | Val::Ns(_))
	}
}

impl PartialEq for Val {
	fn eq(&self, other: &Val) -> bool {
		match (self, other) {
			(Val::Nil, Val::Nil) => true,
			(Val::Bool(a), Val::Bool(b)) => a == b,
			(Val::Int(a), Val::Int(b)) => a == b,
			(Val::Flo(a), Val::Flo(b)) => a == b,
			(Val::Int(a), Val::Flo(b)) | (Val::Flo(b), Val::Int(a)) => (*a as f32) == *b,
			(Val::Str(a), Val::Str(b)) => a == b,
			(Val::Sym(a), Val::Sym(b)) => a == b,
			(Val::Arr(a), Val::Arr(b)) => Root::ptr_eq(a, b),
			(Val::Fn(a), Val::Fn(b)) => Root::ptr_eq(a, b),
			(Val::Obj(a), Val::Obj(b)) => Root::ptr_eq(a, b),
			(Val::Class(a), Val::Class(b)) => a == b,
			(Val::Ns(a), Val::Ns(b)) => a == b,
			_ => false
		}
	}
}

//the display string is used as the key when a `select` directive picks one of its entries, so
//scalars must print exactly as a user would spell them in the table
impl Display for Val {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match *self {
			Val::Nil => f.write_str("nil"),
			Val::Bool(b) => write!(f, "{}", b),
			Val::Int(i) => write!(f, "{}", i),
			Val::Flo(fl) => write!(f, "{}", fl),
			Val::Str(ref st) => f.write_str(st),
			Val::Sym(sym) => write!(f, "{}", sym),
			Val::Arr(ref arr) => {
				f.write_str("[")?;
				for (i, item) in arr.to_vec().iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str("]")
			}
			Val::Fn(ref func) => match func.full_name() {
				Some(name) => write!(f, "#<fn:{}>", name),
				None => f.write_str("#<fn>")
			},
			Val::Obj(ref obj) => write!(f, "#<obj:{}>", obj.class().display_name()),
			Val::Class(class) => write!(f, "#<class:{}>", class.display_name()),
			Val::Ns(ns) => write!(f, "#<ns:{}>", ns.full_name())
		}
	}
}

impl Debug for Val {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match *self {
			Val::Str(ref st) => write!(f, "{:?}", st),
			_ => Display::fmt(self, f)
		}
	}
}
