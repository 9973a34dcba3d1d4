use fnv::{FnvHashMap};
use smallvec::{SmallVec};
use std::{i32, iter};
use std::cell::{RefCell};
use std::fmt::{Display};
use std::hash::{Hash};
use std::rc::{Rc};
use zjs::{bail, ensure, error, Arr, Call, Class, FromVal, Members, Obj, Root, Val, ZResult};

/*
an enum is an ordinary class whose instances are created up front, one per constant. each
constant has three fields: `id` (its position), `name` and `ordinal`. the class gains the
statics `values` (a frozen arr of every constant), `forEach`, `parseName`, `findByOrdinal` and
`getById`, plus one static per constant. once the constants exist, the class's `init` is
sealed by mixing in a highest-priority `init` which always fails.

the three lookups are memoized lazily: the first call performs a linear scan, and the second
call builds a map from the column's values to the constants. building the map fails if the
column contains a duplicate (which can only happen for ordinals).
*/

const FIELDS_PRIORITY: i32 = i32::MAX - 1;

pub(crate) fn init() -> ZResult<()> {
	zjs::register_module("zjs.enum");
	Ok(())
}

/**
An entry in the list passed to [`enumeration`](fn.enumeration.html).

A name may carry an explicit ordinal, as in `"HIGH=10"`. A `Members` entry is mixed into the
constant named by the preceding entry.
*/
#[derive(Clone)]
pub enum EnumEntry {
	Name(Rc<str>),
	Members(Members)
}

impl<'a> From<&'a str> for EnumEntry {
	fn from(name: &'a str) -> EnumEntry {
		EnumEntry::Name(Rc::from(name))
	}
}

impl From<String> for EnumEntry {
	fn from(name: String) -> EnumEntry {
		EnumEntry::Name(Rc::from(name))
	}
}

impl From<Members> for EnumEntry {
	fn from(members: Members) -> EnumEntry {
		EnumEntry::Members(members)
	}
}

struct Constant {
	name: Rc<str>,
	ordinal: i32,
	members: Option<Members>
}

fn parse_entries(entries: Vec<EnumEntry>) -> ZResult<Vec<Constant>> {
	let mut constants: Vec<Constant> = Vec::with_capacity(entries.len());
	//None once the previous ordinal was i32::MAX
	let mut next_ordinal = Some(0i32);

	for entry in entries {
		match entry {
			EnumEntry::Name(text) => {
				let (name, ordinal) = match text.find('=') {
					Some(i) => {
						let ordinal_text = text[i + 1..].trim();
						let ordinal = ordinal_text.parse::<i32>().map_err(|_| {
							error!(WrongType, "invalid ordinal '{}' for the enum constant {}",
							       ordinal_text, text[..i].trim())
						})?;

						(text[..i].trim(), ordinal)
					}
					None => match next_ordinal {
						Some(ordinal) => (text.trim(), ordinal),
						None => bail!(WrongType, "the enum constant {} would follow ordinal {}, which \
						              has no successor", text.trim(), i32::MAX)
					}
				};

				ensure!(zjs::is_valid_sym(name), WrongType, "invalid enum constant name '{}'", name);
				ensure!(!constants.iter().any(|c| &*c.name == name), NamespaceConflict,
				        "the enum constant {} is declared more than once", name);

				next_ordinal = ordinal.checked_add(1);
				constants.push(Constant {
					name: Rc::from(name),
					ordinal,
					members: None
				});
			}
			EnumEntry::Members(members) => {
				match constants.last_mut() {
					Some(constant) => {
						constant.members = Some(match constant.members.take() {
							Some(prev) => prev.extend(members),
							None => members
						});
					}
					None => bail!(WrongType, "an enum's first entry must be a constant name")
				}
			}
		}
	}

	Ok(constants)
}

//the display name of the class which installed the currently-executing static
fn owner_name(call: &Call) -> Rc<str> {
	match call.callee().meta().class {
		Some(class) => class.display_name(),
		None => Rc::from("(enum)")
	}
}


//-------------------------------------------------------------------------------------------------
// memoized inverse lookups
//-------------------------------------------------------------------------------------------------

enum Memo<K> {
	Unused,
	Scanned,
	Mapped(FnvHashMap<K, Val>)
}

struct Inverse<K> {
	column: &'static str,
	values: Root<Arr>,
	memo: RefCell<Memo<K>>
}

impl<K: FromVal + Hash + Eq + Display> Inverse<K> {
	fn new(column: &'static str, values: &Root<Arr>) -> Rc<Inverse<K>> {
		Rc::new(Inverse {
			column,
			values: values.clone(),
			memo: RefCell::new(Memo::Unused)
		})
	}

	fn find(&self, key: &K, owner: &str) -> ZResult<Val> {
		if let Memo::Mapped(ref map) = *self.memo.borrow() {
			return Ok(map.get(key).cloned().unwrap_or(Val::Nil))
		}

		let first_call = matches!(*self.memo.borrow(), Memo::Unused);
		if first_call {
			*self.memo.borrow_mut() = Memo::Scanned;

			for val in self.values.to_vec() {
				let constant = Root::<Obj>::from_val(&val)?;
				if constant.get::<_, K>(self.column)? == *key {
					return Ok(val)
				}
			}

			return Ok(Val::Nil)
		}

		let mut map = FnvHashMap::default();
		for val in self.values.to_vec() {
			let constant = Root::<Obj>::from_val(&val)?;
			let column_val = constant.get::<_, K>(self.column)?;

			if map.contains_key(&column_val) {
				bail!(NonInvertibleMapping, "{}: the value {} appears more than once in the {} \
				      column", owner, column_val, self.column)
			}

			map.insert(column_val, val);
		}

		log::trace!(target: "zjs::enum", "built the {} lookup table for {}", self.column, owner);

		let found = map.get(key).cloned().unwrap_or(Val::Nil);
		*self.memo.borrow_mut() = Memo::Mapped(map);
		Ok(found)
	}
}

fn lookup_fn<K>(inverse: Rc<Inverse<K>>) -> Val
where
	K: FromVal + Hash + Eq + Display + 'static
{
	zjs::func(move |call| {
		let key = call.arg::<K>(0)?;
		inverse.find(&key, &owner_name(call))
	})
}


//-------------------------------------------------------------------------------------------------
// enumeration()
//-------------------------------------------------------------------------------------------------

/**
Builds an enum class.

Each entry is either a constant name (optionally with an explicit ordinal, `"NAME=int"`), or a
`Members` which is mixed into the preceding constant alone. Ordinals default to one more than
the previous constant's ordinal, starting from `0`. `members` is mixed into the class itself.

Fails with `NamespaceConflict` if a name appears twice. Once this function returns, any
attempt to construct the class fails with `CannotInstantiateEnum`.

```ignore
let priority = zjs::enumeration(vec![
	EnumEntry::from("LOW"),
	EnumEntry::from("HIGH=10"),
	EnumEntry::from(Members::new().def("urgent", zjs::func(|_| Ok(Val::Bool(true)))))
], Members::new())?;

zjs::namespace_with("app", Members::new().def("Priority", priority))?;
```
*/
pub fn enumeration<I, E>(entries: I, members: Members) -> ZResult<Class>
where
	I: IntoIterator<Item = E>,
	E: Into<EnumEntry>
{
	let constants = parse_entries(entries.into_iter().map(Into::into).collect())?;
	let values: Root<Arr> = iter::empty::<Val>().collect();

	let for_each = {
		let values = values.clone();
		zjs::func(move |call| {
			let callback = call.arg::<Root<zjs::Func>>(0)?;
			for (i, val) in values.to_vec().into_iter().enumerate() {
				callback.call_fn(&[val, Val::Int(i as i32)])?;
			}

			Ok(Val::Nil)
		})
	};

	let class = zjs::class(Members::new()
		.def("init", zjs::priority(FIELDS_PRIORITY, zjs::func(|call| {
			let this = call.this_obj()?;
			this.set("id", call.arg::<Val>(0)?)?;
			this.set("name", call.arg::<Val>(1)?)?;
			this.set("ordinal", call.arg::<Val>(2)?)?;
			call.base_with(&[])
		}))?)
		.def("toString", zjs::func(|call| call.this_obj()?.get::<_, Val>("name")))
		.stat("values", values.clone())
		.stat("forEach", for_each)
		.stat("parseName", lookup_fn(Inverse::<Rc<str>>::new("name", &values)))
		.stat("findByOrdinal", lookup_fn(Inverse::<i32>::new("ordinal", &values)))
		.stat("getById", lookup_fn(Inverse::<i32>::new("id", &values)))
		.extend(members))?;

	let mut statics = Members::new();
	let mut instances = SmallVec::<[Root<Obj>; 16]>::new();

	for (id, constant) in constants.into_iter().enumerate() {
		let args = [Val::Int(id as i32), Val::Str(constant.name.clone()), Val::Int(constant.ordinal)];
		let instance = class.construct(&args)?;

		if let Some(members) = constant.members {
			instance.mixin(&constant.name, members)?;
		}

		statics = statics.stat(&constant.name, instance.clone());
		instances.push(instance);
	}

	for instance in instances {
		values.push(instance)?;
	}
	values.freeze();

	class.mixin("constants", statics)?;
	class.mixin("sealed", Members::new()
		.def("init", zjs::priority(i32::MAX, zjs::func(|call| {
			bail!(CannotInstantiateEnum, "{} is an enum, so it can't be instantiated",
			      owner_name(call))
		}))?))?;

	log::debug!(target: "zjs::enum", "built an enum with {} constants", values.len());
	Ok(class)
}

#[cfg(test)]
mod tests {
	use zjs::{ErrorKind};
	use crate::{Runtime};
	use super::*;

	fn color() -> ZResult<Class> {
		enumeration(vec!["RED", "GREEN", "BLUE"], Members::new())
	}

	#[test]
	fn constants_have_ids_names_and_ordinals() {
		Runtime::new().run(|| {
			let color = color()?;
			zjs::namespace_with("paint", Members::new().def("Color", color))?;

			let values = color.get_static::<_, Root<Arr>>("values")?;
			assert_eq!(values.len(), 3);
			assert!(values.is_frozen());

			let green = color.get_static::<_, Root<Obj>>("GREEN")?;
			assert_eq!(green.get::<_, i32>("id")?, 1);
			assert_eq!(green.get::<_, i32>("ordinal")?, 1);
			assert_eq!(green.call("toString", &[])?.to_string(), "GREEN");
			assert_eq!(zjs::lookup("paint.Color.BLUE")?, values.get::<Val>(2)?);

			let err = color.construct(&[]).unwrap_err();
			assert!(err.is(ErrorKind::CannotInstantiateEnum));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn explicit_ordinals_and_per_constant_members() {
		Runtime::new().run(|| {
			let level = enumeration(vec![
				EnumEntry::from("LOW"),
				EnumEntry::from("HIGH = 10"),
				EnumEntry::from(Members::new().def("urgent", zjs::func(|_| Ok(Val::Bool(true))))),
				EnumEntry::from("HIGHER")
			], Members::new().def("urgent", zjs::func(|_| Ok(Val::Bool(false)))))?;

			let ordinals: Vec<i32> = level.get_static::<_, Vec<Root<Obj>>>("values")?
				.iter().map(|c| c.get::<_, i32>("ordinal")).collect::<ZResult<_>>()?;
			assert_eq!(ordinals, vec![0, 10, 11]);

			let low = level.get_static::<_, Root<Obj>>("LOW")?;
			let high = level.get_static::<_, Root<Obj>>("HIGH")?;
			assert_eq!(low.call("urgent", &[])?, Val::Bool(false));
			assert_eq!(high.call("urgent", &[])?, Val::Bool(true));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn duplicate_names_are_rejected() {
		Runtime::new().run(|| {
			let err = enumeration(vec!["A", "B", "A"], Members::new()).unwrap_err();
			assert!(err.is(ErrorKind::NamespaceConflict));

			let err = enumeration(vec!["A=x"], Members::new()).unwrap_err();
			assert!(err.is(ErrorKind::WrongType));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn ordinals_do_not_wrap_around() {
		Runtime::new().run(|| {
			let last = enumeration(vec!["A=2147483647"], Members::new())?;
			let a = last.get_static::<_, Root<Obj>>("A")?;
			assert_eq!(a.get::<_, i32>("ordinal")?, i32::MAX);

			let err = enumeration(vec!["A=2147483647", "B"], Members::new()).unwrap_err();
			assert!(err.is(ErrorKind::WrongType));

			let reset = enumeration(vec!["A=2147483647", "B=-5", "C"], Members::new())?;
			let c = reset.get_static::<_, Root<Obj>>("C")?;
			assert_eq!(c.get::<_, i32>("ordinal")?, -4);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn lookups_are_memoized() {
		Runtime::new().run(|| {
			let color = color()?;

			let blue = color.call("parseName", &[Val::from("BLUE")])?;
			assert_eq!(blue, color.get_static::<_, Val>("BLUE")?);
			assert_eq!(color.call("parseName", &[Val::from("BLUE")])?, blue);
			assert_eq!(color.call("parseName", &[Val::from("PINK")])?, Val::Nil);

			assert_eq!(color.call("getById", &[Val::Int(0)])?,
			           color.get_static::<_, Val>("RED")?);
			assert_eq!(color.call("findByOrdinal", &[Val::Int(2)])?, blue);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn duplicate_ordinals_cannot_be_inverted() {
		Runtime::new().run(|| {
			let aliased = enumeration(vec!["A=1", "B=1"], Members::new())?;

			//the first call is a linear scan, which finds the first match
			let a = aliased.call("findByOrdinal", &[Val::Int(1)])?;
			assert_eq!(a, aliased.get_static::<_, Val>("A")?);

			let err = aliased.call("findByOrdinal", &[Val::Int(1)]).unwrap_err();
			assert!(err.is(ErrorKind::NonInvertibleMapping));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn for_each_visits_every_constant_in_order() {
		Runtime::new().run(|| {
			let color = color()?;
			let seen: Root<Arr> = iter::empty::<Val>().collect();

			let collector = {
				let seen = seen.clone();
				zjs::func(move |call| {
					let constant = call.arg::<Root<Obj>>(0)?;
					seen.push(format!("{}:{}", call.arg::<i32>(1)?, constant.get::<_, Val>("name")?))?;
					Ok(Val::Nil)
				})
			};

			color.call("forEach", &[collector])?;
			assert_eq!(seen.get::<String>(0)?, "0:RED");
			assert_eq!(seen.get::<String>(2)?, "2:BLUE");
			Ok(())
		}).unwrap();
	}
}
