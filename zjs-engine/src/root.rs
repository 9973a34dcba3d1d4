use std::fmt::{self, Debug, Formatter, Pointer};
use std::hash::{Hash, Hasher};
use std::ops::{Deref};
use std::rc::{Rc};

/**
A shared, reference-counted pointer to a function, object or array.

Cloning a `Root` is cheap, and produces a new reference to the same allocation. Two `Roots`
compare equal when they point to the same allocation, which is the identity semantics that
reference types have within this crate.

Classes and namespaces are not stored behind a `Root`: they live in the active engine's
arenas, and are represented by the small `Copy` handles [`Class`](struct.Class.html) and
[`Namespace`](struct.Namespace.html).
*/
pub struct Root<T>(Rc<T>);

impl<T> Root<T> {
	pub(crate) fn new(t: T) -> Root<T> {
		Root(Rc::new(t))
	}

	///Returns `true` if both `Roots` point to the same allocation.
	pub fn ptr_eq(root0: &Root<T>, root1: &Root<T>) -> bool {
		Rc::ptr_eq(&root0.0, &root1.0)
	}

	pub(crate) fn as_ptr(&self) -> *const T {
		Rc::as_ptr(&self.0)
	}
}

impl<T> Clone for Root<T> {
	fn clone(&self) -> Root<T> {
		Root(Rc::clone(&self.0))
	}
}

impl<T> Deref for Root<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T> PartialEq for Root<T> {
	fn eq(&self, other: &Root<T>) -> bool {
		Root::ptr_eq(self, other)
	}
}

impl<T> Eq for Root<T> { }

impl<T> Hash for Root<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.as_ptr().hash(state)
	}
}

impl<T> Pointer for Root<T> {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		Pointer::fmt(&self.as_ptr(), f)
	}
}

impl<T> Debug for Root<T> {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "Root({:p})", self.as_ptr())
	}
}
