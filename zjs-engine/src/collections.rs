use std::cell::{Cell, RefCell};
use std::iter::{FromIterator};
use super::error::{ZResult};
use super::root::{Root};
use super::val::{Val};
use super::wrap::{FromVal, ToVal};


//-------------------------------------------------------------------------------------------------
// Arr
//-------------------------------------------------------------------------------------------------

/**
The `arr` primitive type: a growable sequence of values.

Arrays are always stored behind a [`Root`](struct.Root.html). An arr can be frozen, after which
any attempt to mutate it fails. The enum facility uses this for its `values` sequence.
*/

pub struct Arr {
	items: RefCell<Vec<Val>>,
	frozen: Cell<bool>
}

impl Arr {
	pub(crate) fn from_vec(items: Vec<Val>) -> Arr {
		Arr {
			items: RefCell::new(items),
			frozen: Cell::new(false)
		}
	}

	pub fn len(&self) -> usize {
		self.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.borrow().is_empty()
	}

	pub fn get<T: FromVal>(&self, index: usize) -> ZResult<T> {
		let items = self.items.borrow();
		match items.get(index) {
			Some(val) => T::from_val(val),
			None => bail!("index {} is out of bounds for an arr of length {}", index, items.len())
		}
	}

	pub fn push<T: ToVal>(&self, item: T) -> ZResult<()> {
		ensure!(!self.frozen.get(), "attempted to mutate a frozen arr");

		let val = item.to_val()?;
		self.items.borrow_mut().push(val);
		Ok(())
	}

	pub fn set<T: ToVal>(&self, index: usize, item: T) -> ZResult<()> {
		ensure!(!self.frozen.get(), "attempted to mutate a frozen arr");

		let val = item.to_val()?;
		let mut items = self.items.borrow_mut();
		let len = items.len();
		match items.get_mut(index) {
			Some(slot) => *slot = val,
			None => bail!("index {} is out of bounds for an arr of length {}", index, len)
		}

		Ok(())
	}

	///Returns a copy of the arr's current contents.
	pub fn to_vec(&self) -> Vec<Val> {
		self.items.borrow().clone()
	}

	pub fn freeze(&self) {
		self.frozen.set(true)
	}

	pub fn is_frozen(&self) -> bool {
		self.frozen.get()
	}
}

impl FromIterator<Val> for Root<Arr> {
	fn from_iter<I: IntoIterator<Item = Val>>(iter: I) -> Root<Arr> {
		Root::new(Arr::from_vec(iter.into_iter().collect()))
	}
}
